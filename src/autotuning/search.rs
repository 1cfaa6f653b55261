//! Greedy layout search

use super::{SearchConfig, SearchOutcome, RoundSummary, SplitCostTracking};
use crate::analysis::CostModel;
use crate::ir::Pipeline;
use crate::transform::{apply_transform, TransformKind, TransformRecord};
use log::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Phases of the search state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchState {
    /// Scoring the input pipeline
    Evaluating,
    /// Trying every (kind, leaf input) pair against the baseline
    Searching,
    /// Making the round's best candidate the new baseline
    Committing,
    /// No candidate improved, or the round cap was hit
    Done,
}

/// A transformed copy of the baseline and its cost.
struct Candidate {
    record: TransformRecord,
    pipeline: Pipeline,
    cost: f64,
}

/// Greedy search over data-layout transformations.
///
/// Each round applies every transformation kind to every leaf input of the
/// current baseline, keeps the cheapest copy that beats the running
/// minimum, and commits it. The search stops after a round without
/// improvement.
#[derive(Debug, Default)]
pub struct LayoutSearch {
    config: SearchConfig,
    model: CostModel,
}

impl LayoutSearch {
    /// Search with `config` and the default cost model.
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            model: CostModel::new(),
        }
    }

    /// Score candidates with `model` instead of the default one.
    pub fn with_model(mut self, model: CostModel) -> Self {
        self.model = model;
        self
    }

    /// The search configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// The cost model scoring candidates.
    pub fn model(&self) -> &CostModel {
        &self.model
    }

    /// Run the search on a copy of `pipeline`.
    ///
    /// Never fails: without an improving candidate the outcome holds the
    /// input pipeline and an empty schedule.
    pub fn run(&self, pipeline: &Pipeline) -> SearchOutcome {
        if !self.config.enabled {
            debug!("layout search disabled");
            let cost = self.model.layout_cost(pipeline);
            return SearchOutcome::unchanged(pipeline.clone(), cost);
        }

        let mut state = SearchState::Evaluating;
        let mut baseline = pipeline.clone();
        let mut baseline_cost = 0.0;
        let mut min_cost = 0.0;
        let mut pending: Option<Candidate> = None;
        let mut schedule = Vec::new();
        let mut history = Vec::new();
        let mut rounds = 0;

        while state != SearchState::Done {
            state = match state {
                SearchState::Evaluating => {
                    baseline_cost = self.model.layout_cost(&baseline);
                    min_cost = baseline_cost;
                    debug!("baseline layout cost {:.6}", baseline_cost);
                    SearchState::Searching
                }
                SearchState::Searching => {
                    if rounds >= self.config.max_rounds {
                        warn!("layout search stopped after {} rounds", rounds);
                        SearchState::Done
                    } else {
                        rounds += 1;
                        let (best, round_min, scored) = self.search_round(&baseline, min_cost);
                        history.push(RoundSummary {
                            round: rounds,
                            candidates: scored,
                            start_cost: min_cost,
                            chosen: best.as_ref().map(|c| c.record.clone()),
                            chosen_cost: best.as_ref().map(|c| c.cost),
                        });
                        min_cost = round_min;
                        match best {
                            Some(candidate) => {
                                pending = Some(candidate);
                                SearchState::Committing
                            }
                            None => SearchState::Done,
                        }
                    }
                }
                SearchState::Committing => {
                    if let Some(candidate) = pending.take() {
                        if self.config.debug {
                            info!(
                                "round {}: {} (cost {:.6})",
                                rounds, candidate.record, candidate.cost
                            );
                        }
                        baseline = candidate.pipeline;
                        schedule.push(candidate.record);
                    }
                    SearchState::Searching
                }
                SearchState::Done => SearchState::Done,
            };
        }

        let outcome = SearchOutcome {
            pipeline: baseline,
            schedule,
            baseline_cost,
            final_cost: min_cost,
            rounds,
            history,
        };
        if self.config.debug {
            if outcome.is_original() {
                info!("original layout kept");
            } else {
                info!("best schedule: {}", outcome.schedule_labels().join(" "));
                info!("min cost: {:.6}", outcome.final_cost);
            }
        }
        outcome
    }

    /// One round: pick the first candidate, in search order, that beats
    /// the running minimum. Returns the winner, the updated minimum and
    /// the number of candidates scored.
    fn search_round(&self, baseline: &Pipeline, start_min: f64) -> (Option<Candidate>, f64, usize) {
        let candidates = self.candidates(baseline);
        let scored = candidates.len();

        let mut best = None;
        let mut running_min = start_min;
        for candidate in candidates {
            if candidate.cost < running_min {
                let stale = candidate.record.kind == TransformKind::SplitY
                    && self.config.split_tracking == SplitCostTracking::Reference;
                if !stale {
                    running_min = candidate.cost;
                }
                best = Some(candidate);
            }
        }
        (best, running_min, scored)
    }

    /// Every (kind, leaf input) pair in search order.
    fn jobs(&self, baseline: &Pipeline) -> Vec<(TransformKind, String)> {
        let leaves = baseline.leaf_inputs();
        TransformKind::SEARCH_ORDER
            .iter()
            .flat_map(|kind| leaves.iter().map(move |leaf| (*kind, leaf.clone())))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn candidates(&self, baseline: &Pipeline) -> Vec<Candidate> {
        self.jobs(baseline)
            .into_iter()
            .filter_map(|(kind, leaf)| self.score(baseline, kind, &leaf))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn candidates(&self, baseline: &Pipeline) -> Vec<Candidate> {
        let scored: Vec<Option<Candidate>> = self
            .jobs(baseline)
            .into_par_iter()
            .map(|(kind, leaf)| self.score(baseline, kind, &leaf))
            .collect();
        scored.into_iter().flatten().collect()
    }

    /// Apply `kind` to `leaf` on a copy of the baseline and score it.
    fn score(&self, baseline: &Pipeline, kind: TransformKind, leaf: &str) -> Option<Candidate> {
        let transform = kind.instantiate(self.config.split_factor);
        let mut copy = baseline.clone();
        match apply_transform(&mut copy, leaf, transform.as_ref()) {
            Ok(record) => {
                let cost = self.model.layout_cost(&copy);
                debug!("candidate {}: cost {:.6}", record, cost);
                Some(Candidate {
                    record,
                    pipeline: copy,
                    cost,
                })
            }
            Err(e) => {
                debug!("skipping {} on '{}': {}", kind, leaf, e);
                None
            }
        }
    }
}
