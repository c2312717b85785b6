// Copyright (c) 2025 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ether::{Dscp, EtherAddr},
    statswin::WindowStats,
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
};

/// Numeric flow identifier, as assigned in the flow descriptor file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowId(pub u32);

impl Display for FlowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Traffic class of a flow. QoS flows carry a queueing-delay budget,
/// best-effort flows absorb the quantum adjustments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficClass {
    Qos,
    Be,
}

/// One declared flow: its slice marker, class and requirements.
#[derive(Clone, Debug, Deserialize)]
pub struct FlowEntry {
    pub dscp: Dscp,
    pub class: TrafficClass,
    #[serde(default)]
    pub req_queue_delay_ms: Option<u32>,
    #[serde(default)]
    pub req_throughput_mbps: Option<f64>,
}

/// Active-flow classification for one tick. Replaced wholesale on every
/// fetch; the controller never merges consecutive snapshots.
#[derive(Clone, Debug, Default)]
pub struct FlowSnapshot {
    pub flows: HashMap<FlowId, FlowEntry>,
}

impl FlowSnapshot {
    pub fn get(&self, id: &FlowId) -> Option<&FlowEntry> {
        self.flows.get(id)
    }

    /// Ids of all QoS flows in the snapshot.
    pub fn qos_ids(&self) -> HashSet<FlowId> {
        self.ids_of(TrafficClass::Qos)
    }

    /// Ids of all best-effort flows in the snapshot.
    pub fn best_effort_ids(&self) -> HashSet<FlowId> {
        self.ids_of(TrafficClass::Be)
    }

    fn ids_of(&self, class: TrafficClass) -> HashSet<FlowId> {
        self.flows
            .iter()
            .filter(|(_, e)| e.class == class)
            .map(|(id, _)| *id)
            .collect()
    }
}

/// Station association state for one tick: which stations sit on which
/// access point, and which flows belong to which station.
#[derive(Clone, Debug, Default)]
pub struct AssocSnapshot {
    pub stations: HashMap<EtherAddr, HashSet<EtherAddr>>,
    pub flows_of: HashMap<EtherAddr, HashSet<FlowId>>,
}

impl AssocSnapshot {
    /// Flows active at `wtp`, resolved through the station linkage:
    /// union of the flow sets of every station associated with it.
    pub fn flows_at(&self, wtp: &EtherAddr) -> HashSet<FlowId> {
        let mut flows: HashSet<FlowId> = HashSet::new();
        if let Some(stas) = self.stations.get(wtp) {
            for sta in stas {
                if let Some(ids) = self.flows_of.get(sta) {
                    flows.extend(ids.iter().copied());
                }
            }
        }
        flows
    }
}

/// Smoothed queueing-delay statistics per (access point, slice) for one
/// tick. Values are milliseconds.
#[derive(Clone, Debug, Default)]
pub struct DelaySnapshot {
    pub slices: HashMap<(EtherAddr, Dscp), WindowStats>,
}

impl DelaySnapshot {
    /// Access points present in the snapshot, sorted and deduplicated.
    /// This is the set the controller evaluates each tick.
    pub fn wtps(&self) -> Vec<EtherAddr> {
        self.slices
            .keys()
            .map(|(wtp, _)| *wtp)
            .sorted()
            .dedup()
            .collect()
    }

    pub fn stats(&self, wtp: &EtherAddr, dscp: &Dscp) -> Option<WindowStats> {
        self.slices.get(&(*wtp, *dscp)).copied()
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Quantum-change command proposed by the controller and committed by
/// the configuration sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetQuantum {
    pub wtp: EtherAddr,
    pub dscp: Dscp,
    pub quantum: u32,
}

impl Display for SetQuantum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "slice {} @ {} -> quantum {}", self.dscp, self.wtp, self.quantum)
    }
}

/// Outcome of the delay-budget check for one access point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Compliance {
    Met,
    Violated {
        flow: FlowId,
        dscp: Dscp,
        median_ms: f64,
        budget_ms: u32,
    },
}

impl Compliance {
    #[inline]
    pub fn is_met(&self) -> bool {
        matches!(self, Compliance::Met)
    }
}

impl Display for Compliance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compliance::Met => write!(f, "requirements met"),
            Compliance::Violated { flow, dscp, median_ms, budget_ms } => write!(
                f,
                "flow {flow} ({dscp}): median {median_ms:.1}ms over budget {budget_ms}ms"
            ),
        }
    }
}

/// Controller error taxonomy.
///
/// Insufficient samples is deliberately NOT an error: statistics below 2
/// samples are absent values ([WindowStats] with None fields) and the
/// compliance policy treats them as no-information.
#[derive(Debug, thiserror::Error)]
pub enum CtlError {
    /// A parameter failed validation at startup. Fatal before the first tick.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A snapshot provider or sink has no data this tick. The affected
    /// evaluation is skipped and retried on the next tick.
    #[error("{0} is not online")]
    DependencyUnavailable(String),

    /// The configuration sink refused a quantum change. Logged; remaining
    /// commands of the tick still go through.
    #[error("slice config rejected for {dscp} @ {wtp}: {reason}")]
    SinkRejected {
        wtp: EtherAddr,
        dscp: Dscp,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(s: &str) -> EtherAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_flows_at_union() {
        let wtp: EtherAddr = mac("00:0d:b9:2f:56:64");
        let sta1: EtherAddr = mac("d8:ce:3a:00:00:01");
        let sta2: EtherAddr = mac("d8:ce:3a:00:00:02");

        let mut snap: AssocSnapshot = AssocSnapshot::default();
        snap.stations.insert(wtp, HashSet::from([sta1, sta2]));
        snap.flows_of.insert(sta1, HashSet::from([FlowId(1), FlowId(2)]));
        snap.flows_of.insert(sta2, HashSet::from([FlowId(2), FlowId(3)]));

        let flows: HashSet<FlowId> = snap.flows_at(&wtp);
        assert_eq!(flows, HashSet::from([FlowId(1), FlowId(2), FlowId(3)]));

        // unknown WTP -> no flows
        assert!(snap.flows_at(&mac("00:0d:b9:2f:56:65")).is_empty());
    }

    #[test]
    fn test_delay_snapshot_wtps_sorted_dedup() {
        let wtp1: EtherAddr = mac("00:0d:b9:2f:56:64");
        let wtp2: EtherAddr = mac("00:0d:b9:2f:56:65");
        let dscp1: Dscp = "0x00".parse().unwrap();
        let dscp2: Dscp = "0x40".parse().unwrap();

        let mut snap: DelaySnapshot = DelaySnapshot::default();
        snap.slices.insert((wtp2, dscp1), Default::default());
        snap.slices.insert((wtp1, dscp1), Default::default());
        snap.slices.insert((wtp1, dscp2), Default::default());

        assert_eq!(snap.wtps(), vec![wtp1, wtp2]);
    }

    #[test]
    fn test_flow_snapshot_class_sets() {
        let mut snap: FlowSnapshot = FlowSnapshot::default();
        snap.flows.insert(
            FlowId(1),
            FlowEntry {
                dscp: "0x40".parse().unwrap(),
                class: TrafficClass::Qos,
                req_queue_delay_ms: Some(10),
                req_throughput_mbps: None,
            },
        );
        snap.flows.insert(
            FlowId(2),
            FlowEntry {
                dscp: "0x00".parse().unwrap(),
                class: TrafficClass::Be,
                req_queue_delay_ms: None,
                req_throughput_mbps: None,
            },
        );

        assert_eq!(snap.qos_ids(), HashSet::from([FlowId(1)]));
        assert_eq!(snap.best_effort_ids(), HashSet::from([FlowId(2)]));
    }
}
