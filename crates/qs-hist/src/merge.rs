//! Bin-wise sums of histograms into composite processes.

use qs_core::{Error, Result};

use crate::histogram::{HistKey, Histogram};
use crate::process::CompositeProcess;
use crate::region::Sign;
use crate::store::HistogramStore;

/// Element-wise sum of `parts` under `key`.
///
/// Bin contents, `sumw2`, under/overflow and entries are all summed. The
/// binning of the first part is kept.
pub fn sum_histograms(key: HistKey, parts: &[&Histogram]) -> Result<Histogram> {
    let Some(first) = parts.first() else {
        return Err(Error::Validation(format!("nothing to sum for '{}'", key.process)));
    };
    let context = format!("sum into '{}'", key.process);
    let mut out = Histogram::zeros(key, first.spec);
    for part in parts {
        out.check_compatible(part, &context)?;
        for (acc, v) in out.bin_content.iter_mut().zip(&part.bin_content) {
            *acc += v;
        }
        for (acc, v) in out.sumw2.iter_mut().zip(&part.sumw2) {
            *acc += v;
        }
        out.underflow += part.underflow;
        out.overflow += part.overflow;
        out.entries += part.entries;
    }
    Ok(out)
}

/// Sum the store's `members` histograms of `variable` in `sign` into a new
/// histogram keyed by `composite`. The members are left untouched.
pub fn merge(
    store: &HistogramStore,
    composite: &str,
    members: &[String],
    variable: &str,
    sign: Sign,
) -> Result<Histogram> {
    if members.is_empty() {
        return Err(Error::Validation(format!("composite '{composite}' has no members")));
    }
    let parts = members
        .iter()
        .map(|m| store.get(&HistKey::new(m.as_str(), sign, variable)))
        .collect::<Result<Vec<_>>>()?;
    let merged = sum_histograms(HistKey::new(composite, sign, variable), &parts)?;
    tracing::debug!(composite, members = members.len(), variable, %sign, "merged composite");
    Ok(merged)
}

/// Histogram of `label`, which is either stored directly or the name of a
/// composite built from stored members.
pub fn resolve(
    store: &HistogramStore,
    composites: &[CompositeProcess],
    label: &str,
    variable: &str,
    sign: Sign,
) -> Result<Histogram> {
    let key = HistKey::new(label, sign, variable);
    if store.contains(&key) {
        return store.get(&key).cloned();
    }
    match composites.iter().find(|c| c.name == label) {
        Some(c) => merge(store, &c.name, &c.members, variable, sign),
        None => Err(Error::MissingKey(store.name_of(&key))),
    }
}
