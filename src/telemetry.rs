// Copyright (c) 2025 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    controller::{AssocProvider, DelayProvider},
    ether::{Dscp, EtherAddr},
    statswin::{StatsRegistry, WindowStats},
    structs::{AssocSnapshot, CtlError, DelaySnapshot, FlowId},
};
use itertools::Itertools;
use parking_lot::RwLock;
use serde::Deserialize;
use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// Telemetry report pushed by an access-point agent. One JSON object per
/// datagram, e.g.:
///
/// `{"type":"queue_delay","wtp":"00:0d:b9:2f:56:64","dscp":"0x40","delay_ms":8.5}`
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Report {
    /// Queueing-delay sample for one slice (milliseconds).
    QueueDelay {
        wtp: EtherAddr,
        dscp: Dscp,
        delay_ms: f64,
    },
    /// Signal strength sample for one associated station (dBm).
    Rssi {
        wtp: EtherAddr,
        sta: EtherAddr,
        rssi: f64,
    },
    /// (Re)association of a station, with its active flow ids.
    Assoc {
        wtp: EtherAddr,
        sta: EtherAddr,
        #[serde(default)]
        flows: Vec<FlowId>,
    },
    /// Station left its access point.
    Disassoc { wtp: EtherAddr, sta: EtherAddr },
}

/// Station membership bookkeeping. A station is associated with at most
/// one access point at a time; a new assoc report moves it.
#[derive(Debug, Default)]
struct AssocState {
    stations: HashMap<EtherAddr, HashSet<EtherAddr>>,
    flows_of: HashMap<EtherAddr, HashSet<FlowId>>,
    wtp_of: HashMap<EtherAddr, EtherAddr>,
}

impl AssocState {
    fn associate(&mut self, wtp: EtherAddr, sta: EtherAddr, flows: Vec<FlowId>) {
        if let Some(old_wtp) = self.wtp_of.insert(sta, wtp) {
            if old_wtp != wtp {
                if let Some(set) = self.stations.get_mut(&old_wtp) {
                    set.remove(&sta);
                    if set.is_empty() {
                        self.stations.remove(&old_wtp);
                    }
                }
            }
        }
        self.stations.entry(wtp).or_default().insert(sta);
        self.flows_of.insert(sta, flows.into_iter().collect());
    }

    fn disassociate(&mut self, wtp: &EtherAddr, sta: &EtherAddr) {
        if let Some(set) = self.stations.get_mut(wtp) {
            set.remove(sta);
            if set.is_empty() {
                self.stations.remove(wtp);
            }
        }
        self.flows_of.remove(sta);
        self.wtp_of.remove(sta);
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Shared telemetry state: sliding delay windows per slice, signal
/// windows per station, and the association map. Written by the report
/// loop, read by the controller through the provider traits. Lock scope
/// is one report or one snapshot build.
pub struct TelemetryHub {
    delay: RwLock<StatsRegistry<(EtherAddr, Dscp)>>,
    rssi: RwLock<StatsRegistry<(EtherAddr, EtherAddr)>>,
    assoc: RwLock<AssocState>,
    reports: AtomicU64,
}

impl TelemetryHub {
    /// Create a hub whose windows keep `window` samples per key.
    pub fn new(window: usize) -> Self {
        Self {
            delay: RwLock::new(StatsRegistry::new(window)),
            rssi: RwLock::new(StatsRegistry::new(window)),
            assoc: RwLock::new(AssocState::default()),
            reports: AtomicU64::new(0),
        }
    }

    /// Fold one report into the shared state. Every report counts for
    /// feed liveness, even if its sample is unusable.
    pub fn ingest(&self, report: Report) {
        self.reports.fetch_add(1, Ordering::Relaxed);
        match report {
            Report::QueueDelay { wtp, dscp, delay_ms } => {
                if !delay_ms.is_finite() {
                    warn!(%wtp, %dscp, "non-finite delay sample dropped");
                    return;
                }
                self.delay.write().observe((wtp, dscp), delay_ms);
            }
            Report::Rssi { wtp, sta, rssi } => {
                if !rssi.is_finite() {
                    warn!(%wtp, %sta, "non-finite rssi sample dropped");
                    return;
                }
                self.rssi.write().observe((wtp, sta), rssi);
            }
            Report::Assoc { wtp, sta, flows } => {
                self.assoc.write().associate(wtp, sta, flows);
            }
            Report::Disassoc { wtp, sta } => {
                self.assoc.write().disassociate(&wtp, &sta);
            }
        }
    }

    pub fn reports_seen(&self) -> u64 {
        self.reports.load(Ordering::Relaxed)
    }

    /// The feed counts as online once any report has been ingested.
    fn online(&self, what: &str) -> Result<(), CtlError> {
        if self.reports_seen() == 0 {
            return Err(CtlError::DependencyUnavailable(what.into()));
        }
        Ok(())
    }

    /// Per-station signal statistics, sorted, for the shutdown summary.
    pub fn signal_summary(&self) -> Vec<(EtherAddr, EtherAddr, WindowStats)> {
        self.rssi
            .read()
            .iter()
            .map(|((wtp, sta), w)| (*wtp, *sta, w.stats()))
            .sorted_by_key(|(wtp, sta, _)| (*wtp, *sta))
            .collect()
    }
}

impl DelayProvider for TelemetryHub {
    fn delay_stats(&self) -> Result<DelaySnapshot, CtlError> {
        self.online("delay statistics feed")?;
        let reg = self.delay.read();
        Ok(DelaySnapshot {
            slices: reg.iter().map(|(key, w)| (*key, w.stats())).collect(),
        })
    }
}

impl AssocProvider for TelemetryHub {
    fn associations(&self) -> Result<AssocSnapshot, CtlError> {
        self.online("association feed")?;
        let state = self.assoc.read();
        Ok(AssocSnapshot {
            stations: state.stations.clone(),
            flows_of: state.flows_of.clone(),
        })
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Receive telemetry datagrams until the quit flag is raised. Malformed
/// datagrams are logged and dropped; they never stop the loop.
pub async fn report_loop(sock: UdpSocket, hub: Arc<TelemetryHub>, quit: Arc<AtomicBool>) {
    let mut buf: [u8; 2048] = [0; 2048];

    while !quit.load(Ordering::Relaxed) {
        // short timeout so the quit flag gets polled
        let recv = tokio::time::timeout(Duration::from_millis(250), sock.recv_from(&mut buf)).await;
        match recv {
            Err(_) => continue,
            Ok(Err(e)) => {
                warn!("report socket error: {e}");
            }
            Ok(Ok((len, src))) => match serde_json::from_slice::<Report>(&buf[..len]) {
                Ok(report) => {
                    debug!(%src, ?report, "telemetry report");
                    hub.ingest(report);
                }
                Err(e) => warn!(%src, "malformed report dropped: {e}"),
            },
        }
    }
}
