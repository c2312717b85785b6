// Copyright (c) 2025 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{
    cmp::max,
    collections::{HashMap, VecDeque},
    hash::Hash,
};

/// Bounded FIFO window over the last N samples of one tracked key.
///
/// Statistics are recomputed exactly from the windowed samples on every
/// call: at these window sizes a full pass is cheaper than maintaining
/// incremental sums, and there is no accumulated floating-point drift.
/// Mean, median and stdev are undefined (None) below 2 samples.
#[derive(Debug)]
pub struct SampleWindow {
    cap: usize,
    buf: VecDeque<f64>,
}

impl SampleWindow {
    /// Create a new SampleWindow with capacity `cap` (clamped to 2 minimum).
    pub fn new(cap: usize) -> Self {
        let cap: usize = max(cap, 2);
        Self {
            cap,
            buf: VecDeque::with_capacity(cap),
        }
    }

    /// Push a new sample, evicting the oldest if full.
    /// Non-finite values (NaN, infinite) are dropped.
    pub fn push(&mut self, val: f64) {
        if !val.is_finite() {
            return;
        }
        if self.buf.len() == self.cap {
            self.buf.pop_front();
        }
        self.buf.push_back(val);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn maxlen(&self) -> usize {
        self.cap
    }

    /// Latest sample.
    pub fn last(&self) -> Option<f64> {
        self.buf.back().copied()
    }

    /// Arithmetic mean of the windowed samples.
    pub fn mean(&self) -> Option<f64> {
        if self.buf.len() < 2 {
            return None;
        }
        Some(self.buf.iter().sum::<f64>() / self.buf.len() as f64)
    }

    /// Median of the windowed samples (average of the two middle
    /// elements for even-length windows).
    pub fn median(&self) -> Option<f64> {
        let n: usize = self.buf.len();
        if n < 2 {
            return None;
        }
        let mut sorted: Vec<f64> = self.buf.iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid: usize = n / 2;
        if n % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        } else {
            Some(sorted[mid])
        }
    }

    /// Sample standard deviation (N-1 divisor) of the windowed samples.
    pub fn stdev(&self) -> Option<f64> {
        let n: usize = self.buf.len();
        if n < 2 {
            return None;
        }
        let mean: f64 = self.buf.iter().sum::<f64>() / n as f64;
        let var: f64 = self
            .buf
            .iter()
            .map(|&x: &f64| (x - mean).powi(2))
            .sum::<f64>()
            / (n as f64 - 1.0);
        Some(var.sqrt())
    }

    /// All statistics of the window as one value object.
    pub fn stats(&self) -> WindowStats {
        WindowStats {
            count: self.len(),
            mean: self.mean(),
            median: self.median(),
            stdev: self.stdev(),
        }
    }
}

/// Point-in-time statistics of one [SampleWindow]. The three statistics
/// are absent (not zero!) while the window holds fewer than 2 samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowStats {
    pub count: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub stdev: Option<f64>,
}

////////////////////////////////////////////////////////////////////////////////

/// Keyed collection of [SampleWindow]s sharing one capacity. Windows are
/// created lazily on the first sample for a new key and only ever mutated
/// through [observe](StatsRegistry::observe).
#[derive(Debug)]
pub struct StatsRegistry<K> {
    cap: usize,
    windows: HashMap<K, SampleWindow>,
}

impl<K: Eq + Hash> StatsRegistry<K> {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            windows: HashMap::new(),
        }
    }

    /// Append `value` to the window for `key`, creating it if absent.
    pub fn observe(&mut self, key: K, value: f64) {
        self.windows
            .entry(key)
            .or_insert_with(|| SampleWindow::new(self.cap))
            .push(value);
    }

    /// Read-only statistics for `key`. An unseen key reports a zero count
    /// with all statistics absent.
    pub fn snapshot(&self, key: &K) -> WindowStats {
        self.windows
            .get(key)
            .map(|w: &SampleWindow| w.stats())
            .unwrap_or_default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &SampleWindow)> {
        self.windows.iter()
    }
}
