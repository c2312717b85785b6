// Copyright (c) 2025 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    controller::SliceSink,
    ether::{Dscp, EtherAddr},
    structs::{CtlError, SetQuantum},
};
use itertools::Itertools;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::info;

/// Authoritative slice configuration: the quantum of every
/// (access point, class marker) pair. Slices are instantiated lazily on
/// first access from the descriptor's per-class default quantum.
///
/// Invariant: a committed quantum is always within [minimum, maximum].
pub struct SliceRegistry {
    minimum: u32,
    maximum: u32,
    defaults: HashMap<Dscp, u32>,
    slices: RwLock<HashMap<(EtherAddr, Dscp), u32>>,
}

impl SliceRegistry {
    /// Defaults outside the configured bounds are clamped at seed time so
    /// the invariant holds from the first read.
    pub fn new(minimum: u32, maximum: u32, defaults: HashMap<Dscp, u32>) -> Self {
        Self {
            minimum,
            maximum,
            defaults,
            slices: RwLock::new(HashMap::new()),
        }
    }

    /// Current slice table, sorted, for the shutdown summary.
    pub fn summary(&self) -> Vec<(EtherAddr, Dscp, u32)> {
        self.slices
            .read()
            .iter()
            .map(|((wtp, dscp), q)| (*wtp, *dscp, *q))
            .sorted_by_key(|(wtp, dscp, _)| (*wtp, *dscp))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.read().is_empty()
    }
}

impl SliceSink for SliceRegistry {
    fn quantum_of(&self, wtp: &EtherAddr, dscp: &Dscp) -> Result<u32, CtlError> {
        if let Some(q) = self.slices.read().get(&(*wtp, *dscp)).copied() {
            return Ok(q);
        }
        let default: u32 = self
            .defaults
            .get(dscp)
            .copied()
            .ok_or_else(|| CtlError::DependencyUnavailable(format!("slice {dscp}")))?;
        let seeded: u32 = default.clamp(self.minimum, self.maximum);
        Ok(*self.slices.write().entry((*wtp, *dscp)).or_insert(seeded))
    }

    fn apply(&self, cmd: &SetQuantum) -> Result<(), CtlError> {
        if !self.defaults.contains_key(&cmd.dscp) {
            return Err(CtlError::SinkRejected {
                wtp: cmd.wtp,
                dscp: cmd.dscp,
                reason: "undeclared slice".into(),
            });
        }
        if cmd.quantum < self.minimum || cmd.quantum > self.maximum {
            return Err(CtlError::SinkRejected {
                wtp: cmd.wtp,
                dscp: cmd.dscp,
                reason: format!(
                    "quantum {} outside [{}, {}]",
                    cmd.quantum, self.minimum, self.maximum
                ),
            });
        }
        self.slices.write().insert((cmd.wtp, cmd.dscp), cmd.quantum);
        info!("committed: {cmd}");
        Ok(())
    }
}
