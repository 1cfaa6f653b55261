//! Printing pipelines back in the description language.
//!
//! Output re-parses to an equal pipeline. Long definitions wrap after `=`
//! and between values.

use crate::ir::{Definition, Pipeline, Stage};
use pretty::{BoxAllocator, DocAllocator, DocBuilder};
use std::collections::HashSet;

/// Default line width for pretty printing.
pub const DEFAULT_WIDTH: usize = 80;

type Doc<'a> = DocBuilder<'a, BoxAllocator>;

/// A value printable in the description language.
pub trait PrettyPrint {
    /// Document for this value.
    fn to_doc<'a>(&self, alloc: &'a BoxAllocator) -> Doc<'a>;

    /// Pretty print to a string with the given width.
    fn pretty_print(&self, width: usize) -> String {
        let doc = self.to_doc(&BoxAllocator);
        let mut output = String::new();
        // Writing into a String cannot fail.
        let _ = doc.into_doc().render_fmt(width, &mut output);
        output
    }

    /// Pretty print with default width.
    fn pretty(&self) -> String {
        self.pretty_print(DEFAULT_WIDTH)
    }
}

impl PrettyPrint for Stage {
    fn to_doc<'a>(&self, alloc: &'a BoxAllocator) -> Doc<'a> {
        let mut defs = self.definitions().iter();
        let mut doc = match defs.next() {
            Some(base) => definition(alloc, base_header(self, base), base),
            None => alloc.nil(),
        };
        for update in defs {
            doc = doc
                .append(alloc.hardline())
                .append(definition(alloc, update_header(self, update), update));
        }
        doc
    }
}

impl PrettyPrint for Pipeline {
    fn to_doc<'a>(&self, alloc: &'a BoxAllocator) -> Doc<'a> {
        let mut doc = alloc.nil();
        for name in producer_order(self) {
            if let Some(stage) = self.stage(&name) {
                doc = doc.append(stage.to_doc(alloc)).append(alloc.hardline());
            }
        }
        doc.append(alloc.text(format!("output {};", self.outputs().join(", "))))
            .append(alloc.hardline())
    }
}

/// Print `pipeline` in the description language.
pub fn print_pipeline(pipeline: &Pipeline) -> String {
    pipeline.pretty()
}

/// `header = v0, v1;`, breaking after `=` when it does not fit.
fn definition<'a>(alloc: &'a BoxAllocator, header: String, def: &Definition) -> Doc<'a> {
    let values = alloc.intersperse(
        def.values().iter().map(|v| alloc.text(v.to_string())),
        alloc.text(",").append(alloc.line()),
    );
    alloc
        .text(header)
        .append(alloc.text(" ="))
        .append(alloc.line().append(values).nest(4))
        .append(alloc.text(";"))
        .group()
}

fn base_header(stage: &Stage, base: &Definition) -> String {
    let mut header = format!("func {}({})", stage.name(), stage.args().join(", "));
    if !stage.domain().is_empty() {
        let ranges: Vec<String> = stage.domain().iter().map(|r| r.to_string()).collect();
        header.push_str(&format!(" in {}", ranges.join(", ")));
    }
    push_order(&mut header, base, stage.args().to_vec());
    header
}

fn update_header(stage: &Stage, update: &Definition) -> String {
    let mut header = format!("update {}", stage.name());
    if !update.reduction().is_empty() {
        let rvars: Vec<String> = update
            .reduction()
            .iter()
            .map(|r| format!("{} in {}", r.name, r.range))
            .collect();
        header.push_str(&format!(" reduce {}", rvars.join(", ")));
    }
    let mut default: Vec<String> = update.reduction().iter().map(|r| r.name.clone()).collect();
    default.extend(stage.args().iter().cloned());
    push_order(&mut header, update, default);
    header
}

/// Spell out the loop order only when it differs from the default.
fn push_order(header: &mut String, def: &Definition, default: Vec<String>) {
    let order = def.loop_vars();
    if order != default {
        header.push_str(&format!(" order {}", order.join(", ")));
    }
}

/// Stage names with every producer before its consumers.
fn producer_order(pipeline: &Pipeline) -> Vec<String> {
    fn visit(pipeline: &Pipeline, name: &str, seen: &mut HashSet<String>, order: &mut Vec<String>) {
        if !seen.insert(name.to_string()) {
            return;
        }
        if let Some(stage) = pipeline.stage(name) {
            for callee in stage.callees() {
                visit(pipeline, callee, seen, order);
            }
            order.push(name.to_string());
        }
    }

    let mut seen = HashSet::new();
    let mut order = Vec::new();
    for output in pipeline.outputs() {
        visit(pipeline, output, &mut seen, &mut order);
    }
    order
}
