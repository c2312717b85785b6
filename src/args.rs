// Copyright (c) 2025 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{controller::RateParams, utils::parse_float_into_duration};
use clap::{Parser, crate_authors, crate_description, crate_name, crate_version, value_parser};
use std::{net::SocketAddr, path::PathBuf, process, time::Duration};

/// Parse a fractional rate. Valid rates are within (0, 1].
fn parse_rate(arg: &str) -> Result<f64, String> {
    match arg.parse::<f64>() {
        Ok(rate) if rate > 0.0 && rate <= 1.0 => Ok(rate),
        _ => Err(format!("Invalid rate (expected 0 < rate <= 1): {arg}")),
    }
}

/// Configuration struct for the program.
#[derive(Parser, Debug, Clone)]
#[command(name = crate_name!(), version = crate_version!(), author = crate_authors!(), about = crate_description!())]
pub(crate) struct SliceConfig {
    #[arg(
        long,
        short = 't',
        value_name = "ID",
        required = true,
        help = "Tenant (scope) identifier"
    )]
    pub tenant: String,

    #[arg(
        long,
        short = 'e',
        value_name = "SECS",
        required = false,
        value_parser = parse_float_into_duration,
        default_value = "5",
        help = "Control loop interval"
    )]
    pub every: Duration,

    #[arg(
        long,
        value_name = "NUM",
        required = true,
        value_parser = value_parser!(u32).range(1..),
        help = "Quantum floor for best-effort slices"
    )]
    pub min_quantum: u32,

    #[arg(
        long,
        value_name = "NUM",
        required = false,
        default_value = "12000",
        help = "Quantum ceiling for best-effort slices"
    )]
    pub max_quantum: u32,

    #[arg(
        long,
        value_name = "RATE",
        required = true,
        value_parser = parse_rate,
        help = "Fractional quantum growth on a compliant access point"
    )]
    pub increase_rate: f64,

    #[arg(
        long,
        value_name = "RATE",
        required = true,
        value_parser = parse_rate,
        help = "Fractional quantum shrink on a non-compliant access point"
    )]
    pub decrease_rate: f64,

    #[arg(
        long,
        value_name = "PATH",
        required = false,
        default_value = "flows.json",
        help = "Flow descriptor file"
    )]
    pub flows: PathBuf,

    #[arg(
        long,
        value_name = "ADDR",
        required = false,
        default_value = "0.0.0.0:7744",
        help = "UDP socket address for telemetry reports"
    )]
    pub listen: SocketAddr,

    #[arg(
        long,
        short = 'w',
        value_name = "NUM",
        required = false,
        value_parser = value_parser!(u32).range(2..=3600),
        default_value = "10",
        help = "Statistics window size (samples per tracked key)"
    )]
    pub window: u32,

    #[arg(long, short = 'v', help = "Increase output verbosity")]
    pub verbose: bool,

    #[arg(long, help = "Print debug information where applicable")]
    pub debug: bool,
}

impl SliceConfig {
    /// Parses command line arguments and returns a [SliceConfig] struct.
    pub fn parse() -> SliceConfig {
        let mut config: SliceConfig = <SliceConfig as Parser>::parse();

        // Cross-field validation is fatal before the first tick.
        if let Err(e) = config.rates().validate() {
            eprintln!("{e}");
            process::exit(1);
        }

        // clamp the loop interval between 500ms and 60s
        config.every = match config.every {
            d if d < Duration::from_millis(500) => Duration::from_millis(500),
            d if d > Duration::from_secs(60) => Duration::from_secs(60),
            d => d,
        };

        config
    }

    /// Adaptation parameters handed to the controller.
    pub fn rates(&self) -> RateParams {
        RateParams {
            minimum_quantum: self.min_quantum,
            maximum_quantum: self.max_quantum,
            increase_rate: self.increase_rate,
            decrease_rate: self.decrease_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("0.1").unwrap(), 0.1);
        assert_eq!(parse_rate("1").unwrap(), 1.0);
        assert!(parse_rate("0").is_err());
        assert!(parse_rate("1.5").is_err());
        assert!(parse_rate("-0.1").is_err());
        assert!(parse_rate("abc").is_err());
    }

    #[test]
    fn test_minimal_command_line() {
        let config: SliceConfig = SliceConfig::try_parse_from([
            "sliceman",
            "--tenant",
            "52313ecb-9d00-4b7d-b873-b55d3d9ada26",
            "--min-quantum",
            "450",
            "--increase-rate",
            "0.1",
            "--decrease-rate",
            "0.2",
        ])
        .unwrap();

        assert_eq!(config.every, Duration::from_secs(5));
        assert_eq!(config.max_quantum, 12000);
        assert_eq!(config.window, 10);
        assert!(config.rates().validate().is_ok());
    }

    #[test]
    fn test_missing_mandatory_args() {
        assert!(SliceConfig::try_parse_from(["sliceman", "--tenant", "t"]).is_err());
    }
}
