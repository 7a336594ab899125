// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outcome tallies for flood simulation.

use lead_intake::{error::IntakeError, intake::SubmissionReceipt};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Counts submission outcomes over a run.
#[derive(Debug, Default)]
pub struct FloodMetrics {
    start_time: Option<Instant>,
    end_time: Option<Instant>,
    outcomes: HashMap<&'static str, usize>,
    accepted_per_client: HashMap<String, usize>,
}

impl FloodMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Record one submission result for `client`.
    pub fn record(&mut self, client: &str, result: &Result<SubmissionReceipt, IntakeError>) {
        let outcome = match result {
            Ok(_) => {
                *self
                    .accepted_per_client
                    .entry(client.to_string())
                    .or_insert(0) += 1;
                "accepted"
            }
            Err(e) => e.outcome(),
        };
        *self.outcomes.entry(outcome).or_insert(0) += 1;
    }

    pub fn total(&self) -> usize {
        self.outcomes.values().sum()
    }

    pub fn count(&self, outcome: &str) -> usize {
        self.outcomes.get(outcome).copied().unwrap_or(0)
    }

    /// Most submissions accepted for any single client.
    pub fn max_accepted_per_client(&self) -> usize {
        self.accepted_per_client.values().copied().max().unwrap_or(0)
    }

    pub fn duration(&self) -> Duration {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    pub fn block_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (total - self.count("accepted")) as f64 / total as f64
    }
}
