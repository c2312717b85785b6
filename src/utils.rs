// Copyright (c) 2025 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use signal_hook::{
    consts::signal::{SIGINT, SIGQUIT, SIGTERM},
    iterator::{Signals, SignalsInfo},
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tracing::info;

/// Set up handlers for various termination signals.
///
/// Currently we handle:
///   - [SIGINT] - `Ctrl-C`
///   - [SIGTERM] - `kill -15` from shell or systemd etc
///   - [SIGQUIT] - `Ctrl-\`. This normally creates a core dump, but here we just exit cleanly.
pub(crate) fn setup_signal_handler(quit: Arc<AtomicBool>) {
    // Signals to listen for
    let listen: [i32; 3] = [SIGINT, SIGTERM, SIGQUIT];
    let mut signals: SignalsInfo = Signals::new(&listen).expect("Error setting up signal handlers");

    // Spawn a dedicated thread that listens for signals.
    std::thread::spawn(move || {
        for sig in signals.forever() {
            match sig {
                SIGINT => info!("Received SIGINT (Ctrl-C), shutting down..."),
                SIGTERM => info!("Received SIGTERM (kill -15), shutting down..."),
                SIGQUIT => info!("Received SIGQUIT (Ctrl-\\), shutting down..."),
                _ => {}
            }

            // Tell the rest of the program to exit.
            quit.store(true, Ordering::Relaxed);
        }
    });
}

/// Parse a floating point number into a Duration.
pub(crate) fn parse_float_into_duration(arg: &str) -> Result<Duration, String> {
    match arg.parse::<f64>() {
        Ok(secs) if secs > 0.0 => {
            let millis = (secs * 1000.0).round() as u64;
            Ok(Duration::from_millis(millis))
        }
        _ => Err(format!("Invalid time value: {arg}")),
    }
}
