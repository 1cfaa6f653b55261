//! Move the last storage dimension to the front.
//!
//! For a planar `t(x, y, c)` this stores the channels of a pixel next to
//! each other: `tInterleave(c, x, y)`.

use crate::ir::{Expr, Stage};
use crate::transform::{permute, require_dims, LayoutTransform, TransformKind};
use crate::utils::errors::TransformError;

/// Rotates the storage dimensions right by one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Interleave;

impl LayoutTransform for Interleave {
    fn kind(&self) -> TransformKind {
        TransformKind::Interleave
    }

    fn build_replacement(&self, target: &Stage, name: &str) -> Result<Stage, TransformError> {
        require_dims(target, 2, self.kind())?;
        let mut perm: Vec<usize> = (0..target.dimensions()).collect();
        perm.rotate_right(1);
        Ok(permute(target, name, &perm, self))
    }

    fn rewrite_args(&self, args: &mut Vec<Expr>) {
        if args.len() >= 2 {
            args.rotate_right(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Interval;

    #[test]
    fn test_channels_first() {
        let stage = Stage::pure(
            "img",
            &["x", "y", "c"],
            vec![Interval::new(0, 63), Interval::new(0, 47), Interval::new(0, 2)],
            Expr::mul(Expr::var("x"), Expr::var("y")),
        );
        let copy = Interleave.build_replacement(&stage, "imgInterleave").unwrap();
        assert_eq!(copy.args(), ["c", "x", "y"]);
        assert_eq!(
            copy.domain(),
            [Interval::new(0, 2), Interval::new(0, 63), Interval::new(0, 47)]
        );
        assert_eq!(copy.definitions()[0].innermost(), Some("c"));
    }

    #[test]
    fn test_rewrite_args() {
        let mut args = vec![Expr::var("x"), Expr::var("y"), Expr::int(1)];
        Interleave.rewrite_args(&mut args);
        assert_eq!(args, vec![Expr::int(1), Expr::var("x"), Expr::var("y")]);
    }

    #[test]
    fn test_two_dimensions_swap() {
        let mut args = vec![Expr::var("x"), Expr::var("y")];
        Interleave.rewrite_args(&mut args);
        assert_eq!(args, vec![Expr::var("y"), Expr::var("x")]);
    }
}
