// Copyright (c) 2025 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(dead_code)]

mod args;
mod controller;
mod ether;
mod flows;
mod simplecolor;
mod slices;
mod statswin;
mod structs;
mod tabulator;
mod telemetry;
mod utils;

use crate::{
    args::SliceConfig,
    controller::{QuantumController, TickOutcome},
    flows::FlowTable,
    simplecolor::{bold, grn, red, yel},
    slices::SliceRegistry,
    tabulator::tabulate_with_missing,
    telemetry::{TelemetryHub, report_loop},
    utils::setup_signal_handler,
};
use futures::future::join_all;
use std::{
    process,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::{
    net::UdpSocket,
    time::{self, Instant, Interval},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_TICK: Duration = Duration::from_millis(200); // 5 Hz

////////////////////////////////////////////////////////////////////////////////

/// Initialize the tracing subscriber. RUST_LOG overrides the verbosity flags.
fn setup_logging(verbose: bool, debug: bool) {
    let default_filter: &str = if debug {
        "sliceman=trace"
    } else if verbose {
        "sliceman=debug"
    } else {
        "sliceman=info"
    };
    let filter: EnvFilter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Drive the controller at the configured interval.
///
/// Ticks run strictly sequentially on this task, so a tick can never
/// overlap a previous one. Deadlines that pass while a tick is running
/// are skipped, not queued.
async fn control_loop(ctl: Arc<QuantumController>, every: Duration, quit: Arc<AtomicBool>) {
    let mut ticker: Interval = time::interval(DEFAULT_TICK.min(every));
    let mut next_tick: Instant = Instant::now();

    while !quit.load(Ordering::Relaxed) {
        ticker.tick().await;
        if Instant::now() < next_tick {
            continue;
        }

        let outcome: TickOutcome = ctl.tick();
        if outcome.commands > 0 {
            info!(
                "adapted {} slice(s) across {} access point(s)",
                outcome.commands, outcome.evaluated
            );
        }

        next_tick += every;
        let now: Instant = Instant::now();
        while next_tick <= now {
            next_tick += every;
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Colorize a mean RSSI value by signal quality.
fn rssi_cell(mean: Option<f64>) -> Option<String> {
    mean.map(|v: f64| {
        let text: String = format!("{v:.1}");
        match v {
            v if v >= -65.0 => grn(text).build(),
            v if v >= -75.0 => yel(text).build(),
            _ => red(text).build(),
        }
    })
}

/// Print the final slice and station-signal tables.
fn print_summary(registry: &SliceRegistry, hub: &TelemetryHub) {
    let slice_rows: Vec<Vec<Option<String>>> = registry
        .summary()
        .into_iter()
        .map(|(wtp, dscp, quantum)| {
            vec![
                Some(wtp.to_string()),
                Some(dscp.to_string()),
                Some(quantum.to_string()),
            ]
        })
        .collect();
    if !slice_rows.is_empty() {
        println!("{}", bold("Slice configuration:"));
        for line in tabulate_with_missing(slice_rows, Some(&["WTP", "DSCP", "quantum"][..]), "-") {
            println!("{line}");
        }
    }

    let signal_rows: Vec<Vec<Option<String>>> = hub
        .signal_summary()
        .into_iter()
        .map(|(wtp, sta, stats)| {
            vec![
                Some(wtp.to_string()),
                Some(sta.to_string()),
                Some(stats.count.to_string()),
                rssi_cell(stats.mean),
                stats.median.map(|v: f64| format!("{v:.1}")),
                stats.stdev.map(|v: f64| format!("{v:.2}")),
            ]
        })
        .collect();
    if !signal_rows.is_empty() {
        println!();
        println!("{}", bold("Station signal (dBm):"));
        let hdrs: [&str; 6] = ["WTP", "STA", "samples", "mean", "median", "stdev"];
        for line in tabulate_with_missing(signal_rows, Some(&hdrs[..]), "-") {
            println!("{line}");
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

#[tokio::main(worker_threads = 4)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let conf: SliceConfig = SliceConfig::parse();
    setup_logging(conf.verbose, conf.debug);

    // The flow descriptor is mandatory startup state: a controller with
    // no declared slices has nothing to adapt.
    let table: FlowTable = match FlowTable::load(&conf.flows) {
        Ok(table) => table,
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    };
    info!("loaded {} flow(s) from '{}'", table.len(), conf.flows.display());

    let registry: Arc<SliceRegistry> = Arc::new(SliceRegistry::new(
        conf.min_quantum,
        conf.max_quantum,
        table.slice_defaults().clone(),
    ));
    let hub: Arc<TelemetryHub> = Arc::new(TelemetryHub::new(conf.window as usize));
    let ctl: Arc<QuantumController> = Arc::new(QuantumController::new(
        conf.tenant.clone(),
        conf.rates(),
        Arc::new(table),
        hub.clone(),
        hub.clone(),
        registry.clone(),
    )?);

    let sock: UdpSocket = UdpSocket::bind(conf.listen).await?;
    info!("listening for telemetry reports on {}", conf.listen);

    let quit: Arc<AtomicBool> = Arc::new(AtomicBool::new(false));
    setup_signal_handler(quit.clone());

    let tasks = vec![
        tokio::spawn(report_loop(sock, hub.clone(), quit.clone())),
        tokio::spawn(control_loop(ctl, conf.every, quit.clone())),
    ];
    info!(
        "slice manager for tenant {} is online (tick interval {:?})",
        conf.tenant, conf.every
    );

    join_all(tasks).await;

    // Final state report after the loops have wound down
    print_summary(&registry, &hub);
    Ok(())
}
