// Copyright (c) 2025 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt::Display;

lazy_static! {
    /// Regex to match ANSI escape codes
    static ref ANSI_RX: Regex = Regex::new(r"\x1b\[[0-9;]*m").unwrap();
}

/// Return the visible length of a string, ignoring ANSI escape codes
#[inline]
fn visible_len(s: &str) -> usize {
    ANSI_RX.replace_all(s, "").chars().count()
}

/// Format a collection of rows as a table for printing. Cells are
/// Option values; None is rendered as the `missing` string (window
/// statistics below 2 samples have no value to show).
///
/// ## Arguments
/// * `data` - Iterator of rows (each row is an iterator of optional items)
/// * `headers` - Optional slice of column headers
/// * `missing` - String to print in place of None values
///
/// ## Returns
///   * Vec of Strings containing the formatted table
pub fn tabulate_with_missing<I, R, T>(
    data: I,
    headers: Option<&[&str]>,
    missing: &str,
) -> Vec<String>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = Option<T>>,
    T: Display,
{
    let mut rows: Vec<Vec<String>> = Vec::new();

    if let Some(hdrs) = headers {
        rows.push(hdrs.iter().map(|h: &&str| h.to_string()).collect());
    }
    for row in data {
        rows.push(
            row.into_iter()
                .map(|item| match item {
                    Some(val) => val.to_string(),
                    None => missing.to_string(),
                })
                .collect(),
        );
    }
    if rows.is_empty() || (headers.is_some() && rows.len() == 1) {
        return Vec::new();
    }

    // Find the maximum width needed for each column (based on visible lengths)
    let columns: usize = rows.iter().map(|row: &Vec<String>| row.len()).max().unwrap_or(1);
    let mut widths: Vec<usize> = vec![0; columns];
    for row in &rows {
        for (i, item) in row.iter().enumerate() {
            widths[i] = widths[i].max(visible_len(item));
        }
    }

    let format_row = |row: &[String]| -> String {
        let mut items: Vec<String> = Vec::new();
        for (i, item) in row.iter().enumerate() {
            let pad: String = " ".repeat(widths[i].saturating_sub(visible_len(item)));
            items.push(format!("{item}{pad}"));
        }
        items.join(" | ")
    };

    let mut out: Vec<String> = Vec::new();
    let start_index: usize = if headers.is_some() {
        // Format headers with a separator line
        out.push(format_row(&rows[0]));
        let separator: String = widths
            .iter()
            .map(|w: &usize| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-");
        out.push(separator);
        1
    } else {
        0
    };

    for row in &rows[start_index..] {
        out.push(format_row(row));
    }
    out
}
