//! Swap the first two storage dimensions of a stage.

use crate::ir::{Expr, Stage};
use crate::transform::{permute, require_dims, LayoutTransform, TransformKind};
use crate::utils::errors::TransformError;

/// `t(a, b, rest..)` becomes `tReorder(b, a, rest..)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reorder;

impl LayoutTransform for Reorder {
    fn kind(&self) -> TransformKind {
        TransformKind::Reorder
    }

    fn build_replacement(&self, target: &Stage, name: &str) -> Result<Stage, TransformError> {
        require_dims(target, 2, self.kind())?;
        let mut perm: Vec<usize> = (0..target.dimensions()).collect();
        perm.swap(0, 1);
        Ok(permute(target, name, &perm, self))
    }

    fn rewrite_args(&self, args: &mut Vec<Expr>) {
        if args.len() >= 2 {
            args.swap(0, 1);
        }
    }
}
