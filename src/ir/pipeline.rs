//! The pipeline graph: stages reachable from a set of outputs.

use crate::ir::stage::{Definition, Stage};
use crate::utils::errors::{PipelineError, PipelineErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A producer/consumer graph of named stages.
///
/// Stages are kept in name order so every traversal is deterministic.
/// Cloning a pipeline yields an independent deep copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    outputs: Vec<String>,
    stages: BTreeMap<String, Stage>,
}

impl Pipeline {
    /// Build a pipeline from its output names and stage set.
    ///
    /// Stages unreachable from the outputs are dropped.
    pub fn new(
        outputs: Vec<String>,
        stages: impl IntoIterator<Item = Stage>,
    ) -> Result<Self, PipelineError> {
        let mut map = BTreeMap::new();
        for stage in stages {
            if stage.domain().len() != stage.dimensions() {
                return Err(PipelineError::new(
                    format!(
                        "stage '{}' has {} arguments but {} domain ranges",
                        stage.name(),
                        stage.dimensions(),
                        stage.domain().len()
                    ),
                    PipelineErrorKind::DomainMismatch,
                ));
            }
            if let Some(previous) = map.insert(stage.name().to_string(), stage) {
                return Err(PipelineError::new(
                    format!("stage '{}' is defined twice", previous.name()),
                    PipelineErrorKind::DuplicateStage,
                ));
            }
        }

        if outputs.is_empty() {
            return Err(PipelineError::new(
                "pipeline has no outputs",
                PipelineErrorKind::NoOutputs,
            ));
        }
        for output in &outputs {
            if !map.contains_key(output) {
                return Err(PipelineError::new(
                    format!("output '{}' is not a stage", output),
                    PipelineErrorKind::UnknownOutput,
                ));
            }
        }

        let mut pipeline = Self {
            outputs,
            stages: map,
        };
        pipeline.retain_reachable();
        Ok(pipeline)
    }

    /// Output stage names, in declaration order.
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Stage named `name`.
    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.get(name)
    }

    /// Whether a stage named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.stages.contains_key(name)
    }

    /// All stages in name order.
    pub fn stages(&self) -> impl Iterator<Item = &Stage> {
        self.stages.values()
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the pipeline has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub(crate) fn stages_mut(&mut self) -> impl Iterator<Item = &mut Stage> {
        self.stages.values_mut()
    }

    pub(crate) fn insert_stage(&mut self, stage: Stage) {
        self.stages.insert(stage.name().to_string(), stage);
    }

    /// Names of the stages reachable from the outputs.
    pub fn environment(&self) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut worklist: Vec<&str> = self.outputs.iter().map(String::as_str).collect();
        while let Some(name) = worklist.pop() {
            let Some(stage) = self.stages.get(name) else {
                continue;
            };
            if !seen.insert(name.to_string()) {
                continue;
            }
            for callee in stage.callees() {
                if self.stages.contains_key(callee) && !seen.contains(callee) {
                    worklist.push(callee);
                }
            }
        }
        seen
    }

    /// Drop every stage the outputs can no longer reach.
    pub fn retain_reachable(&mut self) {
        let reachable = self.environment();
        self.stages.retain(|name, _| reachable.contains(name));
    }

    /// Stages that read no other stage but are read by at least one.
    ///
    /// These are the sources of data whose layout the search may change.
    /// Returned in name order.
    pub fn leaf_inputs(&self) -> Vec<String> {
        self.stages
            .values()
            .filter(|stage| {
                stage
                    .callees()
                    .iter()
                    .all(|callee| !self.stages.contains_key(*callee))
            })
            .filter(|stage| {
                self.stages
                    .values()
                    .any(|other| other.name() != stage.name() && other.calls(stage.name()))
            })
            .map(|stage| stage.name().to_string())
            .collect()
    }

    /// Every definition of another stage that reads `target`, paired with
    /// the name of the stage owning it.
    pub fn consumers_of(&self, target: &str) -> Vec<(&Definition, &str)> {
        let mut consumers = Vec::new();
        for stage in self.stages.values() {
            if stage.name() == target {
                continue;
            }
            for def in stage.definitions() {
                if def.calls(target) {
                    consumers.push((def, stage.name()));
                }
            }
        }
        consumers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::expr::Expr;
    use crate::ir::stage::Interval;

    fn dom2() -> Vec<Interval> {
        vec![Interval::new(0, 15), Interval::new(0, 15)]
    }

    fn xy() -> Vec<Expr> {
        vec![Expr::var("x"), Expr::var("y")]
    }

    fn diamond() -> Pipeline {
        let a = Stage::pure("a", &["x", "y"], dom2(), Expr::add(Expr::var("x"), Expr::var("y")));
        let b = Stage::pure("b", &["x", "y"], dom2(), Expr::mul(Expr::var("x"), Expr::int(2)));
        let mid = Stage::pure(
            "mid",
            &["x", "y"],
            dom2(),
            Expr::add(Expr::call("a", xy()), Expr::int(1)),
        );
        let out = Stage::pure(
            "out",
            &["x", "y"],
            dom2(),
            Expr::add(Expr::call("mid", xy()), Expr::call("b", xy())),
        );
        let unused = Stage::pure("unused", &["x"], vec![Interval::new(0, 3)], Expr::var("x"));
        Pipeline::new(vec!["out".into()], vec![a, b, mid, out, unused]).unwrap()
    }

    #[test]
    fn test_unreachable_stages_dropped() {
        let p = diamond();
        assert!(!p.contains("unused"));
        assert_eq!(p.len(), 4);
    }

    #[test]
    fn test_leaf_inputs() {
        let p = diamond();
        assert_eq!(p.leaf_inputs(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_consumers_of() {
        let p = diamond();
        let consumers = p.consumers_of("a");
        assert_eq!(consumers.len(), 1);
        assert_eq!(consumers[0].1, "mid");
    }

    #[test]
    fn test_unknown_output_rejected() {
        let a = Stage::pure("a", &["x"], vec![Interval::new(0, 1)], Expr::var("x"));
        let err = Pipeline::new(vec!["nope".into()], vec![a]).unwrap_err();
        assert_eq!(err.kind, PipelineErrorKind::UnknownOutput);
    }

    #[test]
    fn test_domain_mismatch_rejected() {
        let a = Stage::pure("a", &["x", "y"], vec![Interval::new(0, 1)], Expr::var("x"));
        let err = Pipeline::new(vec!["a".into()], vec![a]).unwrap_err();
        assert_eq!(err.kind, PipelineErrorKind::DomainMismatch);
    }

    #[test]
    fn test_clone_is_independent() {
        let p = diamond();
        let mut copy = p.clone();
        copy.insert_stage(Stage::pure("extra", &["x"], vec![Interval::new(0, 1)], Expr::var("x")));
        assert!(!p.contains("extra"));
        assert!(copy.contains("extra"));
    }
}
