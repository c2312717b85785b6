// Copyright (c) 2025 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ether::{Dscp, EtherAddr},
    structs::{
        AssocSnapshot, Compliance, CtlError, DelaySnapshot, FlowId, FlowSnapshot, SetQuantum,
        TrafficClass,
    },
};
use itertools::Itertools;
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, warn};

/// Active-flow classification source (spec: per-tick flow snapshot).
pub trait FlowProvider: Send + Sync {
    fn active_flows(&self) -> Result<FlowSnapshot, CtlError>;
}

/// Station association source.
pub trait AssocProvider: Send + Sync {
    fn associations(&self) -> Result<AssocSnapshot, CtlError>;
}

/// Smoothed queueing-delay statistics source.
pub trait DelayProvider: Send + Sync {
    fn delay_stats(&self) -> Result<DelaySnapshot, CtlError>;
}

/// Configuration sink. Owns the authoritative per-slice quantum; the
/// controller only reads it and proposes changes.
pub trait SliceSink: Send + Sync {
    fn quantum_of(&self, wtp: &EtherAddr, dscp: &Dscp) -> Result<u32, CtlError>;
    fn apply(&self, cmd: &SetQuantum) -> Result<(), CtlError>;
}

////////////////////////////////////////////////////////////////////////////////

/// Quantum adaptation parameters. Immutable after controller construction.
#[derive(Debug, Clone, Copy)]
pub struct RateParams {
    pub minimum_quantum: u32,
    pub maximum_quantum: u32,
    pub increase_rate: f64,
    pub decrease_rate: f64,
}

impl RateParams {
    /// Range-check all parameters. The rates are independent knobs: a
    /// deployment may well grow slowly and shrink fast, or vice versa.
    pub fn validate(&self) -> Result<(), CtlError> {
        if self.minimum_quantum == 0 {
            return Err(CtlError::InvalidConfiguration(
                "minimum_quantum must be > 0".into(),
            ));
        }
        if self.minimum_quantum >= self.maximum_quantum {
            return Err(CtlError::InvalidConfiguration(format!(
                "minimum_quantum {} must be below maximum_quantum {}",
                self.minimum_quantum, self.maximum_quantum
            )));
        }
        for (name, rate) in [
            ("quantum_increase_rate", self.increase_rate),
            ("quantum_decrease_rate", self.decrease_rate),
        ] {
            // NaN fails this check as well
            if !(rate > 0.0 && rate <= 1.0) {
                return Err(CtlError::InvalidConfiguration(format!(
                    "{name} must be within (0, 1], got {rate}"
                )));
            }
        }
        Ok(())
    }

    /// Propose the next quantum for a best-effort slice. Grows on a
    /// compliant access point, shrinks on a non-compliant one. Rounding
    /// is half-away-from-zero (`f64::round`), then the result is clamped
    /// to the configured bounds.
    pub fn adapt(&self, current: u32, compliant: bool) -> u32 {
        if compliant {
            let adapted: u32 = (current as f64 * (1.0 + self.increase_rate)).round() as u32;
            adapted.min(self.maximum_quantum)
        } else {
            let adapted: u32 = (current as f64 * (1.0 - self.decrease_rate)).round() as u32;
            adapted.max(self.minimum_quantum)
        }
    }
}

/// Per-tick bookkeeping, for logs and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// Access points whose evaluation ran to completion.
    pub evaluated: usize,
    /// Access points skipped on a per-WTP error (retried next tick).
    pub skipped: usize,
    /// Quantum changes committed to the sink.
    pub commands: usize,
    /// Quantum changes the sink refused.
    pub rejected: usize,
}

////////////////////////////////////////////////////////////////////////////////

/// The quantum adaptation control loop. Stateless across ticks: every
/// decision derives only from the snapshots fetched in that tick and the
/// sink's authoritative quantum values.
pub struct QuantumController {
    tenant: String,
    params: RateParams,
    flows: Arc<dyn FlowProvider>,
    assoc: Arc<dyn AssocProvider>,
    delay: Arc<dyn DelayProvider>,
    sink: Arc<dyn SliceSink>,
}

impl QuantumController {
    pub fn new(
        tenant: impl Into<String>,
        params: RateParams,
        flows: Arc<dyn FlowProvider>,
        assoc: Arc<dyn AssocProvider>,
        delay: Arc<dyn DelayProvider>,
        sink: Arc<dyn SliceSink>,
    ) -> Result<Self, CtlError> {
        params.validate()?;
        Ok(Self {
            tenant: tenant.into(),
            params,
            flows,
            assoc,
            delay,
            sink,
        })
    }

    pub fn params(&self) -> &RateParams {
        &self.params
    }

    /// One control-loop pass over every access point present in the delay
    /// statistics snapshot. A provider failure skips the whole tick (all
    /// snapshots are required); per-WTP failures skip only that WTP.
    pub fn tick(&self) -> TickOutcome {
        let mut outcome: TickOutcome = TickOutcome::default();

        // Whole, consistent snapshots, fetched once. Every decision below
        // derives from these three values; nothing is re-fetched mid-tick.
        let (flows, assoc, delay) = match self.fetch_snapshots() {
            Ok(snapshots) => snapshots,
            Err(e) => {
                warn!(tenant = %self.tenant, "tick skipped: {e}");
                return outcome;
            }
        };

        for wtp in delay.wtps() {
            match self.evaluate_wtp(&wtp, &flows, &assoc, &delay) {
                Ok(commands) => {
                    outcome.evaluated += 1;
                    for cmd in &commands {
                        match self.sink.apply(cmd) {
                            Ok(()) => outcome.commands += 1,
                            Err(e) => {
                                // no retry, no rollback: next tick re-reads
                                // the sink's actual state
                                outcome.rejected += 1;
                                warn!("{e}");
                            }
                        }
                    }
                }
                Err(e) => {
                    outcome.skipped += 1;
                    warn!(wtp = %wtp, "evaluation skipped: {e}");
                }
            }
        }

        debug!(
            tenant = %self.tenant,
            evaluated = outcome.evaluated,
            skipped = outcome.skipped,
            commands = outcome.commands,
            rejected = outcome.rejected,
            "tick done"
        );
        outcome
    }

    fn fetch_snapshots(
        &self,
    ) -> Result<(FlowSnapshot, AssocSnapshot, DelaySnapshot), CtlError> {
        Ok((
            self.flows.active_flows()?,
            self.assoc.associations()?,
            self.delay.delay_stats()?,
        ))
    }

    /// Decide the quantum changes for one access point. The full command
    /// list is computed before anything is committed, so a failure here
    /// leaves no partial decision behind.
    fn evaluate_wtp(
        &self,
        wtp: &EtherAddr,
        flows: &FlowSnapshot,
        assoc: &AssocSnapshot,
        delay: &DelaySnapshot,
    ) -> Result<Vec<SetQuantum>, CtlError> {
        let active: HashSet<FlowId> = assoc.flows_at(wtp);
        let compliance: Compliance = check_compliance(wtp, &active, flows, delay);
        debug!(wtp = %wtp, "{compliance}");

        // Best-effort slices active at this access point. A flow id with
        // no entry in the flow snapshot is stale linkage and is ignored.
        let be_ids: HashSet<FlowId> = flows.best_effort_ids();
        let be_dscps: Vec<Dscp> = active
            .iter()
            .filter(|id| be_ids.contains(id))
            .filter_map(|id| flows.get(id).map(|e| e.dscp))
            .sorted()
            .dedup()
            .collect();

        let compliant: bool = compliance.is_met();
        let mut commands: Vec<SetQuantum> = Vec::new();
        for dscp in be_dscps {
            let current: u32 = self.sink.quantum_of(wtp, &dscp)?;
            let adapted: u32 = self.params.adapt(current, compliant);
            if adapted != current {
                commands.push(SetQuantum {
                    wtp: *wtp,
                    dscp,
                    quantum: adapted,
                });
            }
        }
        Ok(commands)
    }
}

/// Delay-budget check for one access point: non-compliant if any active
/// QoS flow's slice shows a median queueing delay over the flow's budget.
/// No active QoS flows, or windows without enough samples for a median,
/// count as compliant (no information carries no penalty).
fn check_compliance(
    wtp: &EtherAddr,
    active: &HashSet<FlowId>,
    flows: &FlowSnapshot,
    delay: &DelaySnapshot,
) -> Compliance {
    for id in active.iter().sorted() {
        let Some(entry) = flows.get(id) else {
            continue;
        };
        if entry.class != TrafficClass::Qos {
            continue;
        }
        // budget presence is enforced at descriptor load
        let Some(budget) = entry.req_queue_delay_ms else {
            continue;
        };
        let median: Option<f64> = delay.stats(wtp, &entry.dscp).and_then(|s| s.median);
        if let Some(median_ms) = median {
            if median_ms > budget as f64 {
                return Compliance::Violated {
                    flow: *id,
                    dscp: entry.dscp,
                    median_ms,
                    budget_ms: budget,
                };
            }
        }
    }
    Compliance::Met
}

////////////////////////////////////////////////////////////////////////////////
