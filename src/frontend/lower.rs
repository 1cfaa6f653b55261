//! Semantic checks and lowering from the AST to a [`Pipeline`].

use crate::frontend::ast;
use crate::ir::{self, Definition, Interval, Pipeline, ReductionVar, Stage};
use crate::utils::errors::{LayoutResult, SemanticError, SemanticErrorKind};
use crate::utils::location::Span;
use log::trace;
use std::collections::{HashMap, HashSet};

/// Check a parsed program and build its pipeline.
pub fn lower(program: &ast::Program) -> LayoutResult<Pipeline> {
    let mut lowerer = Lowerer::new(program)?;
    for item in &program.items {
        match item {
            ast::Item::Func(func) => lowerer.lower_func(func)?,
            ast::Item::Update(update) => lowerer.lower_update(update)?,
            ast::Item::Output(output) => lowerer.lower_output(output)?,
        }
    }
    let Lowerer { stages, outputs, .. } = lowerer;
    Ok(Pipeline::new(outputs, stages)?)
}

/// What calls need to know about a stage.
struct Signature {
    arity: usize,
    values: usize,
}

struct Lowerer {
    signatures: HashMap<String, Signature>,
    /// Argument names of every stage
    pure_vars: HashSet<String>,
    /// Reduction variables declared so far
    reduction_vars: HashMap<String, Interval>,
    stages: Vec<Stage>,
    index: HashMap<String, usize>,
    outputs: Vec<String>,
}

impl Lowerer {
    /// Collect every stage signature so calls may refer forward.
    fn new(program: &ast::Program) -> Result<Self, SemanticError> {
        let mut signatures = HashMap::new();
        let mut pure_vars = HashSet::new();
        for func in program.funcs() {
            if signatures.contains_key(&func.name.name) {
                return Err(error(
                    format!("stage '{}' is defined twice", func.name.name),
                    func.name.span,
                    SemanticErrorKind::DuplicateDefinition,
                ));
            }
            let mut seen = HashSet::new();
            for arg in &func.args {
                if !seen.insert(arg.name.as_str()) {
                    return Err(error(
                        format!("argument '{}' repeated in '{}'", arg.name, func.name.name),
                        arg.span,
                        SemanticErrorKind::DuplicateDefinition,
                    ));
                }
                pure_vars.insert(arg.name.clone());
            }
            signatures.insert(
                func.name.name.clone(),
                Signature {
                    arity: func.args.len(),
                    values: func.values.len(),
                },
            );
        }
        Ok(Self {
            signatures,
            pure_vars,
            reduction_vars: HashMap::new(),
            stages: Vec::new(),
            index: HashMap::new(),
            outputs: Vec::new(),
        })
    }

    fn lower_func(&mut self, func: &ast::FuncDecl) -> Result<(), SemanticError> {
        if func.domain.len() != func.args.len() {
            return Err(error(
                format!(
                    "stage '{}' has {} argument(s) but {} range(s)",
                    func.name.name,
                    func.args.len(),
                    func.domain.len()
                ),
                func.span,
                SemanticErrorKind::InvalidBounds,
            ));
        }
        let domain = func
            .domain
            .iter()
            .map(check_range)
            .collect::<Result<Vec<_>, _>>()?;

        let args: Vec<String> = func.args.iter().map(|a| a.name.clone()).collect();
        let order = resolve_order(func.order.as_deref(), &args, func.span)?;
        let values = self.lower_values(&func.values, &args)?;

        trace!("lowered stage '{}' with order {:?}", func.name.name, order);
        self.index.insert(func.name.name.clone(), self.stages.len());
        self.stages.push(Stage::new(
            func.name.name.clone(),
            args,
            domain,
            Definition::new(order, values),
        ));
        Ok(())
    }

    fn lower_update(&mut self, update: &ast::UpdateDecl) -> Result<(), SemanticError> {
        let Some(&idx) = self.index.get(&update.name.name) else {
            return Err(error(
                format!("update of undefined stage '{}'", update.name.name),
                update.name.span,
                SemanticErrorKind::UndefinedStage,
            ));
        };
        let args = self.stages[idx].args().to_vec();

        let mut reduction = Vec::with_capacity(update.reduction.len());
        for rvar in &update.reduction {
            let name = &rvar.name.name;
            let range = check_range(&rvar.range)?;
            let clash = self.pure_vars.contains(name)
                || reduction.iter().any(|r: &ReductionVar| &r.name == name)
                || self.reduction_vars.get(name).is_some_and(|r| *r != range);
            if clash {
                return Err(error(
                    format!("reduction variable '{}' is already declared", name),
                    rvar.name.span,
                    SemanticErrorKind::DuplicateDefinition,
                ));
            }
            self.reduction_vars.insert(name.clone(), range);
            reduction.push(ReductionVar::new(name.clone(), range));
        }

        let mut vars: Vec<String> = reduction.iter().map(|r| r.name.clone()).collect();
        vars.extend(args.iter().cloned());
        let order = resolve_order(update.order.as_deref(), &vars, update.span)?;
        let values = self.lower_values(&update.values, &vars)?;

        let expected = self.stages[idx].definitions()[0].values().len();
        if values.len() != expected {
            return Err(error(
                format!(
                    "update of '{}' has {} value(s), the stage has {}",
                    update.name.name,
                    values.len(),
                    expected
                ),
                update.span,
                SemanticErrorKind::ArityMismatch,
            ));
        }

        self.stages[idx].push_update(Definition::with_reduction(order, values, reduction));
        Ok(())
    }

    fn lower_output(&mut self, output: &ast::OutputDecl) -> Result<(), SemanticError> {
        for name in &output.names {
            if !self.signatures.contains_key(&name.name) {
                return Err(error(
                    format!("output '{}' is not a stage", name.name),
                    name.span,
                    SemanticErrorKind::UndefinedStage,
                ));
            }
            if !self.outputs.contains(&name.name) {
                self.outputs.push(name.name.clone());
            }
        }
        Ok(())
    }

    fn lower_values(
        &self,
        values: &[ast::Expr],
        scope: &[String],
    ) -> Result<Vec<ir::Expr>, SemanticError> {
        values.iter().map(|v| self.lower_expr(v, scope)).collect()
    }

    fn lower_expr(&self, expr: &ast::Expr, scope: &[String]) -> Result<ir::Expr, SemanticError> {
        match &expr.kind {
            ast::ExprKind::Int(v) => Ok(ir::Expr::Int(*v)),
            ast::ExprKind::Float(v) => Ok(ir::Expr::Float(*v)),
            ast::ExprKind::Var(name) => {
                if scope.iter().any(|s| s == name) {
                    Ok(ir::Expr::var(name.clone()))
                } else {
                    Err(error(
                        format!("unknown variable '{}'", name),
                        expr.span,
                        SemanticErrorKind::UndefinedVariable,
                    ))
                }
            }
            ast::ExprKind::Neg(operand) => Ok(match self.lower_expr(operand, scope)? {
                ir::Expr::Int(v) => ir::Expr::Int(-v),
                ir::Expr::Float(v) => ir::Expr::Float(-v),
                other => ir::Expr::sub(ir::Expr::int(0), other),
            }),
            ast::ExprKind::Binary { op, left, right } => Ok(ir::Expr::binary(
                *op,
                self.lower_expr(left, scope)?,
                self.lower_expr(right, scope)?,
            )),
            ast::ExprKind::Call { name, args } => {
                let Some(signature) = self.signatures.get(name) else {
                    return Err(error(
                        format!("call to undefined stage '{}'", name),
                        expr.span,
                        SemanticErrorKind::UndefinedStage,
                    ));
                };
                if signature.arity != args.len() {
                    return Err(error(
                        format!(
                            "'{}' takes {} argument(s), {} given",
                            name,
                            signature.arity,
                            args.len()
                        ),
                        expr.span,
                        SemanticErrorKind::ArityMismatch,
                    ));
                }
                if signature.values != 1 {
                    return Err(error(
                        format!("'{}' yields {} values and cannot be read directly", name, signature.values),
                        expr.span,
                        SemanticErrorKind::ArityMismatch,
                    ));
                }
                let args = args
                    .iter()
                    .map(|a| self.lower_expr(a, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ir::Expr::call(name.clone(), args))
            }
            ast::ExprKind::Grouped(inner) => self.lower_expr(inner, scope),
        }
    }
}

fn check_range(range: &ast::RangeLit) -> Result<Interval, SemanticError> {
    if range.min > range.max {
        return Err(error(
            format!("empty range [{}, {}]", range.min, range.max),
            range.span,
            SemanticErrorKind::InvalidBounds,
        ));
    }
    Ok(Interval::new(range.min, range.max))
}

/// An explicit order must name every variable exactly once.
fn resolve_order(
    order: Option<&[ast::Ident]>,
    vars: &[String],
    span: Span,
) -> Result<Vec<String>, SemanticError> {
    let Some(order) = order else {
        return Ok(vars.to_vec());
    };
    let names: Vec<String> = order.iter().map(|i| i.name.clone()).collect();
    let unique: HashSet<&String> = names.iter().collect();
    let permutation = names.len() == vars.len()
        && unique.len() == names.len()
        && names.iter().all(|n| vars.contains(n));
    if !permutation {
        return Err(error(
            format!(
                "loop order [{}] is not a permutation of [{}]",
                names.join(", "),
                vars.join(", ")
            ),
            order.first().map(|i| i.span).unwrap_or(span),
            SemanticErrorKind::InvalidLoopOrder,
        ));
    }
    Ok(names)
}

fn error(message: String, span: Span, kind: SemanticErrorKind) -> SemanticError {
    SemanticError {
        message,
        span,
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{Lexer, Parser};
    use crate::utils::errors::LayoutError;

    fn lower_source(source: &str) -> LayoutResult<Pipeline> {
        let program = Parser::new(Lexer::new(source))?.parse_program()?;
        lower(&program)
    }

    fn semantic_kind(source: &str) -> SemanticErrorKind {
        match lower_source(source) {
            Err(LayoutError::Semantic(e)) => e.kind,
            other => panic!("expected semantic error, got {:?}", other),
        }
    }

    const GEMM: &str = r#"
        func A(k, y) in [0, 63], [0, 63] = k + y;
        func B(x, k) in [0, 63], [0, 63] = x * k;
        func C(x, y) in [0, 63], [0, 63] = 0;
        update C reduce r in [0, 63] = C(x, y) + A(r, y) * B(x, r);
        output C;
    "#;

    #[test]
    fn test_lower_gemm() {
        let pipeline = lower_source(GEMM).unwrap();
        assert_eq!(pipeline.len(), 3);
        let c = pipeline.stage("C").unwrap();
        assert_eq!(c.definitions().len(), 2);
        let update = &c.definitions()[1];
        assert_eq!(update.loop_vars(), ["r", "x", "y"]);
        assert_eq!(update.reduction()[0].range, Interval::new(0, 63));
        assert_eq!(pipeline.leaf_inputs(), ["A", "B"]);
    }

    #[test]
    fn test_explicit_order() {
        let pipeline = lower_source(
            "func a(x, y) in [0, 3], [0, 3] order y, x = x;\noutput a;",
        )
        .unwrap();
        let def = &pipeline.stage("a").unwrap().definitions()[0];
        assert_eq!(def.innermost(), Some("y"));
    }

    #[test]
    fn test_negative_literals_fold() {
        let pipeline = lower_source("func a(x) in [0, 3] = -2 * x + -(x);\noutput a;").unwrap();
        let value = &pipeline.stage("a").unwrap().definitions()[0].values()[0];
        assert_eq!(value.to_string(), "-2 * x + (0 - x)");
    }

    #[test]
    fn test_unreachable_stage_dropped() {
        let pipeline = lower_source(
            "func a(x) in [0, 3] = x;\nfunc b(x) in [0, 3] = x;\noutput b;",
        )
        .unwrap();
        assert!(!pipeline.contains("a"));
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            semantic_kind("func a(x) in [0, 3] = b(x);\noutput a;"),
            SemanticErrorKind::UndefinedStage
        );
        assert_eq!(
            semantic_kind("func a(x) in [0, 3] = x;\nfunc a(y) in [0, 3] = y;\noutput a;"),
            SemanticErrorKind::DuplicateDefinition
        );
        assert_eq!(
            semantic_kind("func a(x) in [0, 3] = x;\nfunc b(x) in [0, 3] = a(x, x);\noutput b;"),
            SemanticErrorKind::ArityMismatch
        );
        assert_eq!(
            semantic_kind("func a(x, y) in [0, 3], [0, 3] order x, x = x;\noutput a;"),
            SemanticErrorKind::InvalidLoopOrder
        );
        assert_eq!(
            semantic_kind("func a(x) in [3, 0] = x;\noutput a;"),
            SemanticErrorKind::InvalidBounds
        );
        assert_eq!(
            semantic_kind("func a(x) in [0, 3] = z;\noutput a;"),
            SemanticErrorKind::UndefinedVariable
        );
        assert_eq!(
            semantic_kind("update a = 1;\nfunc a(x) in [0, 3] = x;\noutput a;"),
            SemanticErrorKind::UndefinedStage
        );
        assert_eq!(
            semantic_kind("func a(x) in [0, 3] = x;\nupdate a reduce x in [0, 1] = a(x);\noutput a;"),
            SemanticErrorKind::DuplicateDefinition
        );
    }

    #[test]
    fn test_missing_output() {
        match lower_source("func a(x) in [0, 3] = x;") {
            Err(LayoutError::Pipeline(e)) => {
                assert_eq!(e.kind, crate::utils::errors::PipelineErrorKind::NoOutputs)
            }
            other => panic!("expected pipeline error, got {:?}", other),
        }
    }
}
