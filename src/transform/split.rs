//! Split the second storage dimension into an inner and an outer part.

use crate::ir::{Expr, Interval, Stage};
use crate::transform::{relayout, require_dims, LayoutTransform, TransformKind};
use crate::utils::errors::{TransformError, TransformErrorKind};

/// Default split factor.
pub const DEFAULT_SPLIT_FACTOR: i64 = 2;

/// `t(a, b, rest..)` becomes `tSplitY(a, b % F, b / F, rest..)`, with the
/// remainder spelled `b - (b / F) * F`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitY {
    factor: i64,
}

impl Default for SplitY {
    fn default() -> Self {
        Self::new(DEFAULT_SPLIT_FACTOR)
    }
}

impl SplitY {
    /// Split by `factor`. Factors below 2 are rejected when applied.
    pub fn new(factor: i64) -> Self {
        Self { factor }
    }

    /// The split factor.
    pub fn factor(&self) -> i64 {
        self.factor
    }
}

impl LayoutTransform for SplitY {
    fn kind(&self) -> TransformKind {
        TransformKind::SplitY
    }

    fn build_replacement(&self, target: &Stage, name: &str) -> Result<Stage, TransformError> {
        require_dims(target, 2, self.kind())?;
        if self.factor < 2 {
            return Err(TransformError::new(
                format!("split factor must be at least 2, got {}", self.factor),
                TransformErrorKind::InvalidParameter,
                self.name(),
            ));
        }

        let f = self.factor;
        let y = &target.args()[1];
        let inner = format!("{}_inner", y);
        let outer = format!("{}_outer", y);

        let mut args = target.args().to_vec();
        args[1] = inner.clone();
        args.insert(2, outer.clone());

        let y_range = target.domain()[1];
        let mut domain = target.domain().to_vec();
        domain[1] = Interval::new(0, f - 1);
        domain.insert(
            2,
            Interval::new(y_range.min.div_euclid(f), y_range.max.div_euclid(f)),
        );

        // y = y_outer * F + y_inner
        let rebuilt = Expr::add(Expr::mul(Expr::var(outer), Expr::int(f)), Expr::var(inner));
        Ok(relayout(
            target,
            name,
            args,
            domain,
            |value| value.substitute(y, &rebuilt),
            self,
        ))
    }

    fn rewrite_args(&self, args: &mut Vec<Expr>) {
        if args.len() < 2 {
            return;
        }
        let f = Expr::int(self.factor);
        let b = args[1].clone();
        let quotient = Expr::div(b.clone(), f.clone());
        let remainder = Expr::sub(b, Expr::mul(quotient.clone(), f));
        args[1] = remainder;
        args.insert(2, quotient);
    }
}
