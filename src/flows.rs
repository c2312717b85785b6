// Copyright (c) 2025 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    controller::FlowProvider,
    ether::Dscp,
    structs::{CtlError, FlowEntry, FlowId, FlowSnapshot, TrafficClass},
};
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

/// On-disk shape of the flow descriptor file:
///
/// ```json
/// {
///     "slices": { "0x00": 12000, "0x40": 12000 },
///     "flows": {
///         "1": { "dscp": "0x40", "class": "qos", "req_queue_delay_ms": 10 },
///         "2": { "dscp": "0x00", "class": "be" }
///     }
/// }
/// ```
///
/// `slices` declares the known class markers and their initial quantum.
#[derive(Debug, Deserialize)]
struct FlowsFile {
    slices: HashMap<Dscp, u32>,
    flows: HashMap<FlowId, FlowEntry>,
}

/// Validated flow declarations loaded at startup. Serves as the static
/// variant of the flow classification provider: every tick gets a fresh
/// copy of the same declarations.
#[derive(Debug)]
pub struct FlowTable {
    snapshot: FlowSnapshot,
    defaults: HashMap<Dscp, u32>,
}

impl FlowTable {
    /// Load and validate a flow descriptor file. Any problem here is fatal:
    /// the controller must not start with a half-usable flow table.
    pub fn load(path: &Path) -> Result<Self, CtlError> {
        let raw: String = fs::read_to_string(path).map_err(|e| {
            CtlError::InvalidConfiguration(format!(
                "cannot read flow descriptor '{}': {e}",
                path.display()
            ))
        })?;
        let file: FlowsFile = serde_json::from_str(&raw).map_err(|e| {
            CtlError::InvalidConfiguration(format!(
                "invalid flow descriptor '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_parts(file.slices, file.flows)
    }

    fn from_parts(
        defaults: HashMap<Dscp, u32>,
        flows: HashMap<FlowId, FlowEntry>,
    ) -> Result<Self, CtlError> {
        for (id, entry) in &flows {
            if entry.class == TrafficClass::Qos && entry.req_queue_delay_ms.is_none() {
                return Err(CtlError::InvalidConfiguration(format!(
                    "QoS flow {id} has no req_queue_delay_ms"
                )));
            }
            if !defaults.contains_key(&entry.dscp) {
                return Err(CtlError::InvalidConfiguration(format!(
                    "flow {id} references undeclared slice {}",
                    entry.dscp
                )));
            }
        }
        Ok(Self {
            snapshot: FlowSnapshot { flows },
            defaults,
        })
    }

    /// Declared slices and their initial quantum (seeds the slice registry).
    pub fn slice_defaults(&self) -> &HashMap<Dscp, u32> {
        &self.defaults
    }

    pub fn len(&self) -> usize {
        self.snapshot.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.flows.is_empty()
    }
}

impl FlowProvider for FlowTable {
    fn active_flows(&self) -> Result<FlowSnapshot, CtlError> {
        Ok(self.snapshot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTOR: &str = r#"{
        "slices": { "0x00": 12000, "0x40": 12000 },
        "flows": {
            "1": { "dscp": "0x40", "class": "qos",
                   "req_queue_delay_ms": 10, "req_throughput_mbps": 1.0 },
            "2": { "dscp": "0x00", "class": "be" }
        }
    }"#;

    fn parse(descriptor: &str) -> Result<FlowTable, CtlError> {
        let file: FlowsFile = serde_json::from_str(descriptor)
            .map_err(|e| CtlError::InvalidConfiguration(e.to_string()))?;
        FlowTable::from_parts(file.slices, file.flows)
    }

    #[test]
    fn test_parse_descriptor() {
        let table: FlowTable = parse(DESCRIPTOR).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.slice_defaults().len(), 2);

        let snap: FlowSnapshot = table.active_flows().unwrap();
        let qos: &FlowEntry = snap.get(&FlowId(1)).unwrap();
        assert_eq!(qos.class, TrafficClass::Qos);
        assert_eq!(qos.req_queue_delay_ms, Some(10));
        assert_eq!(qos.dscp, "0x40".parse().unwrap());

        let be: &FlowEntry = snap.get(&FlowId(2)).unwrap();
        assert_eq!(be.class, TrafficClass::Be);
        assert!(be.req_queue_delay_ms.is_none());
    }

    #[test]
    fn test_qos_flow_needs_budget() {
        let descriptor: &str = r#"{
            "slices": { "0x40": 12000 },
            "flows": { "1": { "dscp": "0x40", "class": "qos" } }
        }"#;
        let err: CtlError = parse(descriptor).unwrap_err();
        assert!(matches!(err, CtlError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_undeclared_slice_rejected() {
        let descriptor: &str = r#"{
            "slices": { "0x00": 12000 },
            "flows": { "1": { "dscp": "0x40", "class": "be" } }
        }"#;
        let err: CtlError = parse(descriptor).unwrap_err();
        assert!(matches!(err, CtlError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(parse("{ not json").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err: CtlError = FlowTable::load(Path::new("/nonexistent/flows.json")).unwrap_err();
        assert!(matches!(err, CtlError::InvalidConfiguration(_)));
    }
}
