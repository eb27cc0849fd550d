//! `tapctl watch`: a passive tap that prints what it sees.

use crate::render;
use anyhow::{anyhow, Context, Result};
use core_foundation::runloop::{kCFRunLoopDefaultMode, CFRunLoop};
use crossbeam_channel::{bounded, Sender};
use eventtap_core::{
    load_profile, DelegateAdapter, Disposition, EventCategory, EventMask, SharedProvider,
    TapConfiguration, TapManager, TapPlacement,
};
use eventtap_platform::MacBackend;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

fn configuration(profile: Option<&Path>) -> Result<TapConfiguration> {
    let configuration = match profile {
        Some(path) => {
            let profile = load_profile(path)
                .with_context(|| format!("failed to load profile {}", path.display()))?;
            info!(name = %profile.name, "using profile");
            profile.tap
        }
        None => TapConfiguration::global(TapPlacement::Session, EventMask::all_known()),
    };
    Ok(configuration.passive(true))
}

fn is_keyboard(category: EventCategory) -> bool {
    matches!(
        category,
        EventCategory::KeyDown | EventCategory::KeyUp | EventCategory::FlagsChanged
    )
}

/// Handlers that forward a summary of every event to `lines`.
fn forwarding(lines: Sender<String>) -> DelegateAdapter<MacBackend> {
    let adapter = DelegateAdapter::<MacBackend>::new();
    for category in EventCategory::ALL {
        let lines = lines.clone();
        if category == EventCategory::TapDisabledByTimeout {
            adapter.set_handler(category, move |tap, _event, _proxy| {
                warn!(tap = tap.id(), "tap timed out, re-enabling");
                if let Err(e) = tap.enable() {
                    warn!(error = %e, "failed to re-enable tap");
                }
                let _ = lines.try_send(render::event_summary(category.raw(), (0.0, 0.0), None));
                Disposition::Continue
            });
            continue;
        }
        adapter.set_handler(category, move |_tap, event, _proxy| {
            let keycode = is_keyboard(category).then(|| event.keycode());
            let line = render::event_summary(category.raw(), event.location(), keycode);
            let _ = lines.try_send(line);
            Disposition::Continue
        });
    }
    adapter.set_unknown(move |_tap, event, raw, _proxy| {
        let _ = lines.try_send(render::event_summary(raw, event.location(), None));
        Disposition::Continue
    });
    adapter
}

pub fn run(
    manager: &TapManager<MacBackend>,
    profile: Option<&Path>,
    seconds: Option<u64>,
) -> Result<()> {
    let configuration = configuration(profile)?;

    let (tx, rx) = bounded::<String>(1024);
    let printer = thread::spawn(move || {
        for line in rx {
            println!("{line}");
        }
    });

    let provider: SharedProvider<MacBackend> = forwarding(tx).into_shared();
    let run_loop = CFRunLoop::get_current();
    let tap = manager
        .create(configuration, &run_loop, Some(provider))
        .context("failed to create tap")?;
    tap.enable()?;
    info!(tap = tap.id(), granted = %tap.granted_mask(), "watching events");

    match seconds {
        Some(seconds) => {
            let _ = CFRunLoop::run_in_mode(
                unsafe { kCFRunLoopDefaultMode },
                Duration::from_secs(seconds),
                false,
            );
        }
        None => CFRunLoop::run_current(),
    }

    tap.destroy()?;
    // Last owner: releases the provider and with it every sender.
    drop(tap);
    printer
        .join()
        .map_err(|_| anyhow!("printer thread panicked"))?;
    Ok(())
}
