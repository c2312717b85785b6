// Copyright (c) 2025 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

/// 48-bit Ethernet (MAC) address. Identifies both access points (WTP)
/// and client stations (LVAP) on the wireless side.
///
/// Supported formats:
/// - Colon separated: 00:0d:b9:2f:56:64
/// - Dash separated: 00-0d-b9-2f-56-64
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EtherAddr([u8; 6]);

impl EtherAddr {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for EtherAddr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sep: char = if s.contains('-') { '-' } else { ':' };
        let parts: Vec<&str> = s.trim().split(sep).collect();
        if parts.len() != 6 {
            return Err(format!("Invalid MAC address: {s}"));
        }

        let mut octets: [u8; 6] = [0; 6];
        for (i, part) in parts.iter().enumerate() {
            octets[i] = u8::from_str_radix(part, 16)
                .map_err(|_| format!("Invalid octet '{part}' in MAC address: {s}"))?;
        }
        Ok(EtherAddr(octets))
    }
}

impl Display for EtherAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let o: [u8; 6] = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl TryFrom<String> for EtherAddr {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EtherAddr> for String {
    fn from(addr: EtherAddr) -> String {
        addr.to_string()
    }
}

////////////////////////////////////////////////////////////////////////////////

/// DSCP class marker. One DSCP identifies one traffic class, and thereby
/// one slice per access point. Stored in ToS-byte notation (DSCP in the
/// upper 6 bits, ECN bits clear), which is what descriptor files use.
///
/// Supported formats:
/// - Hex with prefix: 0x40 (descriptor file notation)
/// - Plain decimal: 184
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Dscp(u8);

impl Dscp {
    /// Validated constructor. The two low (ECN) bits must be clear.
    pub fn from_value(value: u8) -> Result<Self, String> {
        if value & 0x03 != 0 {
            return Err(format!("Invalid DSCP marker (ECN bits set): {value:#04x}"));
        }
        Ok(Dscp(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl FromStr for Dscp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s: &str = s.trim();
        let value: u8 = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => {
                u8::from_str_radix(hex, 16).map_err(|_| format!("Invalid DSCP: {s}"))?
            }
            None => s.parse().map_err(|_| format!("Invalid DSCP: {s}"))?,
        };
        Dscp::from_value(value)
    }
}

impl Display for Dscp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

impl TryFrom<String> for Dscp {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Dscp> for String {
    fn from(dscp: Dscp) -> String {
        dscp.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mac_colon() {
        let addr: EtherAddr = "00:0d:b9:2f:56:64".parse().unwrap();
        assert_eq!(addr.octets(), [0x00, 0x0d, 0xb9, 0x2f, 0x56, 0x64]);
        assert_eq!(addr.to_string(), "00:0d:b9:2f:56:64");
    }

    #[test]
    fn test_parse_mac_dash() {
        let addr: EtherAddr = "A0-B1-C2-D3-E4-F5".parse().unwrap();
        assert_eq!(addr.to_string(), "a0:b1:c2:d3:e4:f5");
    }

    #[test]
    fn test_parse_mac_invalid() {
        assert!("00:0d:b9:2f:56".parse::<EtherAddr>().is_err());
        assert!("00:0d:b9:2f:56:zz".parse::<EtherAddr>().is_err());
        assert!("not a mac".parse::<EtherAddr>().is_err());
    }

    #[test]
    fn test_parse_dscp() {
        assert_eq!("0x40".parse::<Dscp>().unwrap().value(), 0x40);
        assert_eq!("0X08".parse::<Dscp>().unwrap().value(), 0x08);
        assert_eq!("184".parse::<Dscp>().unwrap().value(), 0xb8);
        assert_eq!("0xB8".parse::<Dscp>().unwrap().to_string(), "0xb8");
    }

    #[test]
    fn test_parse_dscp_invalid() {
        assert!("0x41".parse::<Dscp>().is_err());
        assert!("47".parse::<Dscp>().is_err());
        assert!("0xzz".parse::<Dscp>().is_err());
        assert!(Dscp::from_value(0x40).is_ok());
        assert!(Dscp::from_value(0x42).is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let addr: EtherAddr = "00:0d:b9:2f:56:64".parse().unwrap();
        let json: String = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"00:0d:b9:2f:56:64\"");
        assert_eq!(serde_json::from_str::<EtherAddr>(&json).unwrap(), addr);

        let dscp: Dscp = "0x38".parse().unwrap();
        let json: String = serde_json::to_string(&dscp).unwrap();
        assert_eq!(json, "\"0x38\"");
        assert_eq!(serde_json::from_str::<Dscp>(&json).unwrap(), dscp);
    }
}
