//! Binning registry: variable name → [`BinSpec`], in authored order.

use std::collections::HashMap;

use qs_core::{Error, Result};
use qs_frame::UniformAxis;
use serde::{Deserialize, Serialize};

/// Fixed-width binning of one variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinSpec {
    /// Number of bins.
    pub count: usize,
    /// Lower edge of the first bin.
    pub lower: f64,
    /// Upper edge of the last bin.
    pub upper: f64,
}

impl BinSpec {
    /// Validated constructor: `count > 0`, finite edges, `lower < upper`.
    pub fn new(count: usize, lower: f64, upper: f64) -> Result<Self> {
        let spec = Self { count, lower, upper };
        spec.validate()?;
        Ok(spec)
    }

    /// Check the invariants of a deserialized spec.
    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            return Err(Error::Validation("bin count must be positive".into()));
        }
        if !(self.lower.is_finite() && self.upper.is_finite()) {
            return Err(Error::Validation(format!(
                "bin edges must be finite: [{}, {}]",
                self.lower, self.upper
            )));
        }
        if self.lower >= self.upper {
            return Err(Error::Validation(format!(
                "lower edge {} must be below upper edge {}",
                self.lower, self.upper
            )));
        }
        Ok(())
    }

    /// Bin width.
    pub fn width(&self) -> f64 {
        (self.upper - self.lower) / self.count as f64
    }

    /// Bin edges (length `count + 1`).
    pub fn edges(&self) -> Vec<f64> {
        let w = self.width();
        (0..=self.count).map(|i| self.lower + w * i as f64).collect()
    }

    /// Axis handed to the event engine.
    pub fn to_axis(&self) -> Result<UniformAxis> {
        UniformAxis::new(self.count, self.lower, self.upper)
            .map_err(|e| Error::Validation(e.to_string()))
    }
}

/// One registered variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    /// Column name or expression.
    pub name: String,
    /// Binning.
    pub spec: BinSpec,
    /// Axis title; the name is used when absent.
    pub title: Option<String>,
}

/// Ordered variable → binning table.
///
/// Iteration follows registration order, which is the order variables were
/// written in the configuration.
#[derive(Debug, Clone, Default)]
pub struct BinningRegistry {
    entries: Vec<VariableDef>,
    index: HashMap<String, usize>,
}

impl BinningRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a variable. A name can be registered once.
    pub fn register(&mut self, name: impl Into<String>, spec: BinSpec) -> Result<()> {
        self.register_titled(name, spec, None)
    }

    /// Register a variable with a display title.
    pub fn register_titled(
        &mut self,
        name: impl Into<String>,
        spec: BinSpec,
        title: Option<String>,
    ) -> Result<()> {
        let name = name.into();
        spec.validate().map_err(|e| Error::Validation(format!("variable '{name}': {e}")))?;
        if self.index.contains_key(&name) {
            return Err(Error::Validation(format!("variable '{name}' registered twice")));
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push(VariableDef { name, spec, title });
        Ok(())
    }

    /// Binning of `variable`.
    pub fn lookup(&self, variable: &str) -> Result<BinSpec> {
        self.get(variable).map(|d| d.spec)
    }

    /// Full definition of `variable`.
    pub fn get(&self, variable: &str) -> Result<&VariableDef> {
        self.index
            .get(variable)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| Error::UnknownVariable(variable.to_string()))
    }

    /// Display title of `variable`.
    pub fn title(&self, variable: &str) -> Result<&str> {
        let def = self.get(variable)?;
        Ok(def.title.as_deref().unwrap_or(&def.name))
    }

    /// Definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &VariableDef> {
        self.entries.iter()
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
