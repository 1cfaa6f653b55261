//! Search results tracking

use crate::ir::Pipeline;
use crate::transform::{TransformKind, TransformRecord};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// What one search round found.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    /// Round number, starting at 1
    pub round: usize,
    /// Candidates scored this round
    pub candidates: usize,
    /// Running minimum when the round started
    pub start_cost: f64,
    /// Transformation committed at the end of the round, if any
    pub chosen: Option<TransformRecord>,
    /// Cost of the chosen candidate
    pub chosen_cost: Option<f64>,
}

/// Result of a layout search.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// The pipeline after every committed transformation
    pub pipeline: Pipeline,
    /// Committed transformations, in order
    pub schedule: Vec<TransformRecord>,
    /// Cost of the input pipeline
    pub baseline_cost: f64,
    /// Running minimum when the search stopped
    pub final_cost: f64,
    /// Rounds executed
    pub rounds: usize,
    /// Per-round details
    pub history: Vec<RoundSummary>,
}

impl SearchOutcome {
    /// Outcome of a search that changed nothing.
    pub fn unchanged(pipeline: Pipeline, cost: f64) -> Self {
        Self {
            pipeline,
            schedule: Vec::new(),
            baseline_cost: cost,
            final_cost: cost,
            rounds: 0,
            history: Vec::new(),
        }
    }

    /// Whether the original layout was kept.
    pub fn is_original(&self) -> bool {
        self.schedule.is_empty()
    }

    /// Schedule entries as `kind->stage` strings.
    pub fn schedule_labels(&self) -> Vec<String> {
        self.schedule.iter().map(|r| r.to_string()).collect()
    }

    /// How many times `kind` was committed.
    pub fn count_of(&self, kind: TransformKind) -> usize {
        self.schedule.iter().filter(|r| r.kind == kind).count()
    }

    /// Serialize the outcome as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Plain-text summary report.
    pub fn report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Layout Search Summary ===");
        let _ = writeln!(out, "Rounds: {}", self.rounds);
        let _ = writeln!(out, "Baseline cost: {:.6}", self.baseline_cost);
        if self.is_original() {
            let _ = writeln!(out, "Original layout kept");
            return out;
        }

        let _ = writeln!(out, "Final cost: {:.6}", self.final_cost);
        let _ = writeln!(out);
        let _ = writeln!(out, "{:<6} {:<28} {:>10} {:>14}", "Round", "Transform", "Scored", "Cost");
        let _ = writeln!(out, "{}", "-".repeat(61));
        for summary in &self.history {
            let chosen = summary
                .chosen
                .as_ref()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string());
            let cost = summary
                .chosen_cost
                .map(|c| format!("{:.6}", c))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "{:<6} {:<28} {:>10} {:>14}",
                summary.round, chosen, summary.candidates, cost
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Schedule: {}", self.schedule_labels().join(" "));
        out
    }
}
