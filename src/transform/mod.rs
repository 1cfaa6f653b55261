//! Data-layout transformations.
//!
//! A transformation replaces a producer stage with a relaid-out copy and
//! rewrites every call site so consumers read the copy at the equivalent
//! coordinate.

pub mod rewriter;
pub mod driver;
pub mod interleave;
pub mod reorder;
pub mod split;

pub use driver::apply_transform;
pub use interleave::Interleave;
pub use reorder::Reorder;
pub use rewriter::CallRewriter;
pub use split::SplitY;

use crate::ir::{Definition, Expr, Interval, Stage};
use crate::utils::errors::{TransformError, TransformErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The layout transformations the search may choose from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformKind {
    /// Move the last dimension to the front.
    Interleave,
    /// Swap the first two dimensions.
    Reorder,
    /// Split the second dimension by a factor.
    SplitY,
}

impl TransformKind {
    /// Order in which a search round tries the kinds. Earlier kinds win
    /// ties.
    pub const SEARCH_ORDER: [TransformKind; 3] = [
        TransformKind::Interleave,
        TransformKind::Reorder,
        TransformKind::SplitY,
    ];

    /// Suffix appended to the target name to name the replacement stage.
    pub fn name(&self) -> &'static str {
        match self {
            TransformKind::Interleave => "Interleave",
            TransformKind::Reorder => "Reorder",
            TransformKind::SplitY => "SplitY",
        }
    }

    /// Lower-case label used in schedules and reports.
    pub fn label(&self) -> &'static str {
        match self {
            TransformKind::Interleave => "interleave",
            TransformKind::Reorder => "reorder",
            TransformKind::SplitY => "split_y",
        }
    }

    /// Build the transformation for this kind.
    pub fn instantiate(&self, split_factor: i64) -> Box<dyn LayoutTransform> {
        match self {
            TransformKind::Interleave => Box::new(Interleave),
            TransformKind::Reorder => Box::new(Reorder),
            TransformKind::SplitY => Box::new(SplitY::new(split_factor)),
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One layout transformation.
pub trait LayoutTransform: Send + Sync {
    /// Which kind of transformation this is.
    fn kind(&self) -> TransformKind;

    /// Name appended to the target to form the replacement's name.
    fn name(&self) -> &str {
        self.kind().name()
    }

    /// Build the replacement stage `name` holding `target` in the new
    /// layout.
    fn build_replacement(&self, target: &Stage, name: &str) -> Result<Stage, TransformError>;

    /// Map the coordinates of a call to the target onto the replacement.
    fn rewrite_args(&self, args: &mut Vec<Expr>);
}

/// A transformation applied to a stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransformRecord {
    /// Transformation applied.
    pub kind: TransformKind,
    /// Stage it was applied to.
    pub stage: String,
}

impl TransformRecord {
    /// Record of `kind` applied to `stage`.
    pub fn new(kind: TransformKind, stage: impl Into<String>) -> Self {
        Self {
            kind,
            stage: stage.into(),
        }
    }
}

impl fmt::Display for TransformRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.kind, self.stage)
    }
}

fn require_dims(target: &Stage, min: usize, kind: TransformKind) -> Result<(), TransformError> {
    if target.dimensions() < min {
        return Err(TransformError::new(
            format!(
                "stage '{}' has {} dimension(s), needs at least {}",
                target.name(),
                target.dimensions(),
                min
            ),
            TransformErrorKind::NotApplicable,
            kind.name(),
        ));
    }
    Ok(())
}

/// Build a relaid-out copy of `target`.
///
/// Every definition keeps its reduction domain and loops over its
/// reduction variables first, then over `args` in storage order. Bodies
/// pass through `substitute`; reads of the target itself (update
/// definitions) are redirected to the copy.
fn relayout<T: LayoutTransform + ?Sized>(
    target: &Stage,
    name: &str,
    args: Vec<String>,
    domain: Vec<Interval>,
    substitute: impl Fn(&Expr) -> Expr,
    transform: &T,
) -> Stage {
    let rewriter = CallRewriter::new(target.name(), name, |call_args: &mut Vec<Expr>| {
        transform.rewrite_args(call_args)
    });

    let mut definitions = target.definitions().iter().map(|def| {
        let mut loop_vars: Vec<String> = def.reduction().iter().map(|r| r.name.clone()).collect();
        loop_vars.extend(args.iter().cloned());
        let values = def
            .values()
            .iter()
            .map(|value| rewriter.rewrite(&substitute(value)))
            .collect();
        Definition::with_reduction(loop_vars, values, def.reduction().to_vec())
    });

    // A stage always has its base definition.
    let base = definitions
        .next()
        .unwrap_or_else(|| Definition::new(args.clone(), Vec::new()));
    let mut stage = Stage::new(name, args.clone(), domain, base);
    for update in definitions {
        stage.push_update(update);
    }
    stage
}

/// Relayout by permuting storage dimensions: dimension `i` of the copy is
/// dimension `perm[i]` of the target.
fn permute<T: LayoutTransform + ?Sized>(
    target: &Stage,
    name: &str,
    perm: &[usize],
    transform: &T,
) -> Stage {
    let args = perm.iter().map(|&i| target.args()[i].clone()).collect();
    let domain = perm.iter().map(|&i| target.domain()[i]).collect();
    relayout(target, name, args, domain, Expr::clone, transform)
}
