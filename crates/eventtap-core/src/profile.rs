//! Tap profiles: named configurations stored as YAML or JSON.

use crate::{ProfileError, TapConfiguration, TapResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapProfile {
    pub name: String,
    pub tap: TapConfiguration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProfileFormat {
    Yaml,
    Json,
}

fn format_for(path: &Path) -> Result<ProfileFormat, ProfileError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => Ok(ProfileFormat::Yaml),
        Some("json") => Ok(ProfileFormat::Json),
        _ => Err(ProfileError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Get the app data directory for eventtap.
pub fn get_app_data_dir() -> PathBuf {
    let base = dirs_next::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("eventtap")
}

/// Get the profiles directory.
pub fn get_profiles_dir() -> PathBuf {
    get_app_data_dir().join("profiles")
}

/// Load and validate a profile. The format follows the file extension.
pub fn load_profile(path: &Path) -> TapResult<TapProfile> {
    let format = format_for(path)?;
    let text = fs::read_to_string(path).map_err(ProfileError::from)?;
    let profile: TapProfile = match format {
        ProfileFormat::Yaml => serde_yaml::from_str(&text).map_err(ProfileError::from)?,
        ProfileFormat::Json => serde_json::from_str(&text).map_err(ProfileError::from)?,
    };
    profile.tap.validate()?;

    debug!(?path, name = %profile.name, "Loaded profile");
    Ok(profile)
}

/// Save a profile, creating parent directories as needed.
pub fn save_profile(profile: &TapProfile, path: &Path) -> TapResult<()> {
    let text = match format_for(path)? {
        ProfileFormat::Yaml => serde_yaml::to_string(profile).map_err(ProfileError::from)?,
        ProfileFormat::Json => serde_json::to_string_pretty(profile).map_err(ProfileError::from)?,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(ProfileError::from)?;
    }
    fs::write(path, text).map_err(ProfileError::from)?;

    info!(?path, "Saved profile");
    Ok(())
}

/// Profile files in `dir`, sorted by file name.
pub fn list_profiles(dir: &Path) -> TapResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(vec![]);
    }

    let mut profiles = Vec::new();
    for entry in fs::read_dir(dir).map_err(ProfileError::from)? {
        let path = entry.map_err(ProfileError::from)?.path();
        if format_for(&path).is_ok() {
            profiles.push(path);
        }
    }

    profiles.sort();
    Ok(profiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventCategory, EventMask, ProcessSerialNumber, TapError, TapPlacement};

    fn profile() -> TapProfile {
        TapProfile {
            name: "keys".into(),
            tap: TapConfiguration::for_process(
                ProcessSerialNumber::new(0, 4242),
                EventMask::from_categories([EventCategory::KeyDown, EventCategory::KeyUp]),
            )
            .passive(true),
        }
    }

    #[test]
    fn test_yaml_and_json_profiles() {
        let dir = tempfile::tempdir().unwrap();
        for file in ["keys.yaml", "keys.json"] {
            let path = dir.path().join(file);
            save_profile(&profile(), &path).unwrap();
            assert_eq!(load_profile(&path).unwrap(), profile());
        }
        assert_eq!(list_profiles(dir.path()).unwrap().len(), 2);
    }

    #[test]
    fn test_uncategorized_mask_bits_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let profile = TapProfile {
            name: "raw".into(),
            tap: TapConfiguration::global(TapPlacement::Session, EventMask::from_bits(1 << 9)),
        };
        for file in ["raw.yaml", "raw.json"] {
            let path = dir.path().join(file);
            save_profile(&profile, &path).unwrap();
            let loaded = load_profile(&path).unwrap();
            assert_eq!(loaded, profile);
            assert!(loaded.tap.requested_mask.contains_raw(9));
        }
    }

    #[test]
    fn test_invalid_profile_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(
            &path,
            "name: bad\ntap:\n  placement: hid\n  events: [key_down]\n  target_process: { high: 0, low: 9 }\n",
        )
        .unwrap();
        assert!(matches!(
            load_profile(&path),
            Err(TapError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_unknown_extension() {
        let path = Path::new("profile.toml");
        assert!(matches!(
            load_profile(path),
            Err(TapError::Profile(ProfileError::UnsupportedFormat(_)))
        ));
    }

    #[test]
    fn test_missing_dir_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_profiles(&dir.path().join("absent")).unwrap().is_empty());
    }
}
