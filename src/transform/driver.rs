//! Applying a layout transformation to a pipeline.

use crate::ir::{Expr, Pipeline};
use crate::transform::{CallRewriter, LayoutTransform, TransformRecord};
use crate::utils::errors::{TransformError, TransformErrorKind};
use log::{debug, warn};

/// Replace `target` in `pipeline` with a relaid-out copy and redirect its
/// readers to the copy.
///
/// On error the pipeline is left untouched.
pub fn apply_transform(
    pipeline: &mut Pipeline,
    target: &str,
    transform: &dyn LayoutTransform,
) -> Result<TransformRecord, TransformError> {
    if !pipeline.environment().contains(target) {
        warn!("cannot {} '{}': no such stage", transform.kind(), target);
        return Err(TransformError::new(
            format!("stage '{}' is not in the pipeline", target),
            TransformErrorKind::StageNotFound,
            transform.name(),
        ));
    }

    let replacement_name = format!("{}{}", target, transform.name());
    if pipeline.contains(&replacement_name) {
        return Err(TransformError::new(
            format!("stage '{}' already exists", replacement_name),
            TransformErrorKind::NameCollision,
            transform.name(),
        ));
    }

    let original = match pipeline.stage(target) {
        Some(stage) => stage.clone(),
        None => {
            return Err(TransformError::new(
                format!("stage '{}' is not in the pipeline", target),
                TransformErrorKind::StageNotFound,
                transform.name(),
            ))
        }
    };
    let replacement = transform.build_replacement(&original, &replacement_name)?;

    let rewriter = CallRewriter::new(target, &replacement_name, |args: &mut Vec<Expr>| {
        transform.rewrite_args(args)
    });
    for stage in pipeline.stages_mut() {
        rewriter.rewrite_stage(stage);
    }

    pipeline.insert_stage(replacement);
    pipeline.retain_reachable();

    match rewriter.rewritten() {
        0 => debug!(
            "{} '{}': no call site redirected, pipeline unchanged",
            transform.kind(),
            target
        ),
        n => debug!(
            "{} '{}' -> '{}': {} call site(s) redirected",
            transform.kind(),
            target,
            replacement_name,
            n
        ),
    }
    Ok(TransformRecord::new(transform.kind(), target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Interval, Stage};
    use crate::transform::{Interleave, Reorder, TransformKind};

    fn xy() -> Vec<Expr> {
        vec![Expr::var("x"), Expr::var("y")]
    }

    fn sample() -> Pipeline {
        let dom = vec![Interval::new(0, 7), Interval::new(0, 3)];
        let a = Stage::pure("A", &["x", "y"], dom.clone(), Expr::add(Expr::var("x"), Expr::var("y")));
        let b = Stage::pure("B", &["x", "y"], dom.clone(), Expr::mul(Expr::var("x"), Expr::var("y")));
        let c = Stage::pure(
            "C",
            &["x", "y"],
            dom.clone(),
            Expr::add(Expr::call("B", xy()), Expr::int(1)),
        );
        let out = Stage::pure(
            "out",
            &["x", "y"],
            dom,
            Expr::add(
                Expr::mul(Expr::call("A", xy()), Expr::int(2)),
                Expr::call("C", xy()),
            ),
        );
        Pipeline::new(vec!["out".into()], vec![a, b, c, out]).unwrap()
    }

    #[test]
    fn test_unknown_stage_is_noop() {
        let mut pipeline = sample();
        let before = pipeline.clone();
        let err = apply_transform(&mut pipeline, "nope", &Reorder).unwrap_err();
        assert_eq!(err.kind, TransformErrorKind::StageNotFound);
        assert_eq!(pipeline, before);
    }

    #[test]
    fn test_reorder_replaces_target() {
        let mut pipeline = sample();
        let record = apply_transform(&mut pipeline, "A", &Reorder).unwrap();
        assert_eq!(record, TransformRecord::new(TransformKind::Reorder, "A"));
        assert!(!pipeline.contains("A"));
        let copy = pipeline.stage("AReorder").unwrap();
        assert_eq!(copy.args(), ["y".to_string(), "x".to_string()]);
        assert_eq!(copy.domain(), [Interval::new(0, 3), Interval::new(0, 7)]);

        let out = pipeline.stage("out").unwrap();
        assert_eq!(
            out.definitions()[0].values()[0].to_string(),
            "AReorder(y, x) * 2 + C(x, y)"
        );
    }

    #[test]
    fn test_interleave_then_reorder_leaves_third_stage() {
        let mut pipeline = sample();
        let c_before = pipeline.stage("C").unwrap().clone();

        apply_transform(&mut pipeline, "A", &Interleave).unwrap();
        apply_transform(&mut pipeline, "B", &Reorder).unwrap();

        assert!(pipeline.contains("AInterleave"));
        assert!(pipeline.contains("BReorder"));
        assert!(!pipeline.contains("A"));
        assert!(!pipeline.contains("B"));
        // C itself is not a target; only its read of B changed
        let c_after = pipeline.stage("C").unwrap();
        assert_eq!(c_after.args(), c_before.args());
        assert_eq!(c_after.domain(), c_before.domain());
        assert_eq!(
            c_after.definitions()[0].values()[0].to_string(),
            "BReorder(y, x) + 1"
        );
    }

    #[test]
    fn test_root_read_is_not_redirected() {
        // out(x, y) = A(y, x): the only read is the whole right-hand side
        let a = Stage::pure(
            "A",
            &["x", "y"],
            vec![Interval::new(0, 7), Interval::new(0, 3)],
            Expr::var("x"),
        );
        let out = Stage::pure(
            "out",
            &["x", "y"],
            vec![Interval::new(0, 3), Interval::new(0, 7)],
            Expr::call("A", vec![Expr::var("y"), Expr::var("x")]),
        );
        let mut pipeline = Pipeline::new(vec!["out".into()], vec![a, out]).unwrap();
        let before = pipeline.clone();
        let record = apply_transform(&mut pipeline, "A", &Reorder).unwrap();
        assert_eq!(record, TransformRecord::new(TransformKind::Reorder, "A"));
        assert_eq!(pipeline, before);
        assert!(!pipeline.contains("AReorder"));
    }

    #[test]
    fn test_name_collision() {
        let dom = vec![Interval::new(0, 7), Interval::new(0, 3)];
        let a = Stage::pure("A", &["x", "y"], dom.clone(), Expr::var("x"));
        let taken = Stage::pure("AReorder", &["x", "y"], dom.clone(), Expr::var("y"));
        let out = Stage::pure(
            "out",
            &["x", "y"],
            dom,
            Expr::add(Expr::call("A", xy()), Expr::call("AReorder", xy())),
        );
        let mut pipeline = Pipeline::new(vec!["out".into()], vec![a, taken, out]).unwrap();
        let before = pipeline.clone();
        let err = apply_transform(&mut pipeline, "A", &Reorder).unwrap_err();
        assert_eq!(err.kind, TransformErrorKind::NameCollision);
        assert_eq!(pipeline, before);
    }

    #[test]
    fn test_too_few_dimensions() {
        let a = Stage::pure("A", &["x"], vec![Interval::new(0, 7)], Expr::var("x"));
        let out = Stage::pure(
            "out",
            &["x"],
            vec![Interval::new(0, 7)],
            Expr::add(Expr::call("A", vec![Expr::var("x")]), Expr::int(1)),
        );
        let mut pipeline = Pipeline::new(vec!["out".into()], vec![a, out]).unwrap();
        let before = pipeline.clone();
        let err = apply_transform(&mut pipeline, "A", &Reorder).unwrap_err();
        assert_eq!(err.kind, TransformErrorKind::NotApplicable);
        assert_eq!(pipeline, before);
    }
}
