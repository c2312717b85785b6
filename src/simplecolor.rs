// Copyright (c) 2025 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ANSI color codes and string coloring helpers for the summary tables.
//! A from-scratch implementation without external crates like
//! `termcolor` or `ansi_term`; only the handful of styles the summary
//! printer needs.

use std::fmt;

// ANSI control codes as constants
const ANSI_BEG: &str = "\x1b[";
const ANSI_SEP: char = ';';
const ANSI_END: char = 'm';
const ANSI_BOLD: u8 = 1;

/// Full ANSI clear string for convenience
pub const CLR: &str = "\x1b[0m";

/// ANSI color codes (foreground)
#[derive(Clone, Copy, Debug)]
pub enum AnsiColor {
    Red = 31,
    Green = 32,
    Yellow = 33,
}

/// Struct for building ANSI-formatted strings (to support combining)
#[derive(Clone, Debug)]
pub struct AnsiString {
    text: String,
    codes: Vec<u8>,
}

impl AnsiString {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            codes: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: u8) -> Self {
        self.codes.push(code);
        self
    }

    pub fn with_fg(mut self, color: AnsiColor) -> Self {
        self.codes.push(color as u8);
        self
    }

    pub fn build(&self) -> String {
        if self.codes.is_empty() {
            return self.text.clone();
        }
        let codes_str = self
            .codes
            .iter()
            .map(|&c| c.to_string())
            .collect::<Vec<_>>()
            .join(&ANSI_SEP.to_string());
        format!("{ANSI_BEG}{codes_str}{ANSI_END}{}{CLR}", self.text)
    }
}

impl fmt::Display for AnsiString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.build())
    }
}

//////// Convenience functions for the styles the summary uses ////////

#[inline]
pub fn bold(text: impl Into<String>) -> AnsiString {
    AnsiString::new(text).with_code(ANSI_BOLD)
}
#[inline]
pub fn red(text: impl Into<String>) -> AnsiString {
    AnsiString::new(text).with_fg(AnsiColor::Red)
}
#[inline]
pub fn grn(text: impl Into<String>) -> AnsiString {
    AnsiString::new(text).with_fg(AnsiColor::Green)
}
#[inline]
pub fn yel(text: impl Into<String>) -> AnsiString {
    AnsiString::new(text).with_fg(AnsiColor::Yellow)
}
