//! Named row filters and cut-flow bookkeeping.

use std::fmt;

use crate::error::Result;
use crate::expr::Expr;
use crate::table::EventTable;

/// One named filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cut {
    /// Human-readable description shown in cut-flow reports.
    pub name: String,
    /// Boolean expression over event columns.
    pub expr: String,
}

impl Cut {
    /// Create a cut; an empty name falls back to the expression text.
    pub fn new(expr: impl Into<String>, name: impl Into<String>) -> Self {
        let expr = expr.into();
        let name = name.into();
        let name = if name.is_empty() { expr.clone() } else { name };
        Self { name, expr }
    }
}

/// Conjunction of cuts. An event is selected when every cut is true.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    cuts: Vec<Cut>,
}

impl Selection {
    /// Selection accepting every event.
    pub fn all() -> Self {
        Self::default()
    }

    /// Append a filter.
    pub fn filter(mut self, expr: impl Into<String>, name: impl Into<String>) -> Self {
        self.cuts.push(Cut::new(expr, name));
        self
    }

    /// The cuts in application order.
    pub fn cuts(&self) -> &[Cut] {
        &self.cuts
    }

    /// `true` when no cut is applied.
    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    /// Evaluate the selection mask over `table` and record the cut flow.
    pub fn evaluate(&self, table: &EventTable) -> Result<(Vec<bool>, CutFlow)> {
        let n = table.n_rows();
        let mut mask = vec![true; n];
        let mut steps = Vec::with_capacity(self.cuts.len());
        let mut remaining = n as u64;

        for cut in &self.cuts {
            let values = Expr::compile(&cut.expr)?.eval_table(table)?;
            let all = remaining;
            for (m, v) in mask.iter_mut().zip(&values) {
                if *m && *v == 0.0 {
                    *m = false;
                    remaining -= 1;
                }
            }
            steps.push(CutFlowStep { name: cut.name.clone(), all, pass: remaining });
        }

        Ok((mask, CutFlow { total: n as u64, steps }))
    }
}

/// Pass counts of one cut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutFlowStep {
    /// Cut description.
    pub name: String,
    /// Events reaching this cut.
    pub all: u64,
    /// Events passing this cut.
    pub pass: u64,
}

impl CutFlowStep {
    /// Fraction of events reaching this cut that pass it, in percent.
    pub fn efficiency(&self) -> f64 {
        if self.all == 0 { 0.0 } else { 100.0 * self.pass as f64 / self.all as f64 }
    }
}

/// Sequential cut-flow of a selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CutFlow {
    /// Events before any cut.
    pub total: u64,
    /// One entry per cut, in application order.
    pub steps: Vec<CutFlowStep>,
}

impl CutFlow {
    /// Events passing every cut.
    pub fn selected(&self) -> u64 {
        self.steps.last().map_or(self.total, |s| s.pass)
    }
}

impl fmt::Display for CutFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            let cumulative =
                if self.total == 0 { 0.0 } else { 100.0 * step.pass as f64 / self.total as f64 };
            writeln!(
                f,
                "{:<50} pass={:<10} all={:<10} -- eff={:.2} % cumulative eff={:.2} %",
                step.name,
                step.pass,
                step.all,
                step.efficiency(),
                cumulative
            )?;
        }
        Ok(())
    }
}
