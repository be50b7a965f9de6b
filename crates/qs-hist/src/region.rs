//! Signal/control region selections.
//!
//! A region is the baseline selection refined by the sign of the charge
//! product and, for simulated processes, by the truth-match label. Both
//! refinements append cuts, so the order in which they are applied does not
//! change which events are selected.

use qs_frame::Selection;
use serde::{Deserialize, Serialize};

/// Charge-product class of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sign {
    /// `q1 * q2 < 0`: the signal region.
    Opposite,
    /// Every event not in [`Sign::Opposite`], including `q1 * q2 == 0` and
    /// missing charges: the control region for the QCD estimate.
    Same,
}

impl Sign {
    /// Both classes, signal region first.
    pub const ALL: [Sign; 2] = [Sign::Opposite, Sign::Same];

    /// Lower-case name used in logs and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Sign::Opposite => "opposite",
            Sign::Same => "same",
        }
    }
}

impl std::fmt::Display for Sign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generator-level match of the hadronic tau candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruthMatch {
    /// Matched to a genuine tau.
    Genuine,
    /// Misidentified lepton or jet.
    Misidentified,
    /// No truth requirement. The only legal label for observed data.
    #[default]
    None,
}

/// Columns holding the two candidate charges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeColumns(pub String, pub String);

impl Default for ChargeColumns {
    fn default() -> Self {
        Self("q_1".into(), "q_2".into())
    }
}

/// Builds region selections from the charge and truth columns.
#[derive(Debug, Clone)]
pub struct RegionSelector {
    charges: ChargeColumns,
    truth_column: String,
}

impl Default for RegionSelector {
    fn default() -> Self {
        Self::new(ChargeColumns::default(), "gen_match")
    }
}

impl RegionSelector {
    /// Selector over the given columns.
    pub fn new(charges: ChargeColumns, truth_column: impl Into<String>) -> Self {
        Self { charges, truth_column: truth_column.into() }
    }

    /// Charge-product condition for `sign`.
    pub fn sign_cut(&self, sign: Sign) -> String {
        let ChargeColumns(q1, q2) = &self.charges;
        match sign {
            Sign::Opposite => format!("{q1}*{q2} < 0"),
            Sign::Same => format!("!({q1}*{q2} < 0)"),
        }
    }

    /// `base` refined to the events of one sign class.
    pub fn select(&self, base: &Selection, sign: Sign) -> Selection {
        let name = match sign {
            Sign::Opposite => "Require opposite charge for signal region",
            Sign::Same => "Control region for QCD estimation",
        };
        base.clone().filter(self.sign_cut(sign), name)
    }

    /// `selection` restricted by a truth-match label.
    pub fn apply_truth_match(&self, selection: Selection, label: TruthMatch) -> Selection {
        let col = &self.truth_column;
        match label {
            TruthMatch::Genuine => {
                selection.filter(format!("{col} == 1"), "Genuine tau (truth matched)")
            }
            TruthMatch::Misidentified => {
                selection.filter(format!("{col} == 0"), "Misidentified tau (not truth matched)")
            }
            TruthMatch::None => selection,
        }
    }

    /// Full region selection: `base`, sign cut, then truth match.
    pub fn region(&self, base: &Selection, sign: Sign, label: TruthMatch) -> Selection {
        self.apply_truth_match(self.select(base, sign), label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qs_frame::EventTable;

    fn events() -> EventTable {
        EventTable::from_columns(vec![
            ("q_1".into(), vec![1.0, -1.0, 1.0, -1.0, 0.0, 1.0, f64::NAN]),
            ("q_2".into(), vec![-1.0, -1.0, 1.0, 1.0, 1.0, -1.0, 1.0]),
            ("gen_match".into(), vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0]),
            ("mt_1".into(), vec![10.0, 5.0, 15.0, 30.0, 2.0, 12.0, 8.0]),
        ])
        .unwrap()
    }

    fn base() -> Selection {
        Selection::all().filter("mt_1<20", "Muon transverse mass cut for W+jets suppression")
    }

    #[test]
    fn signs_partition_the_baseline() {
        let sel = RegionSelector::default();
        let t = events();
        let (os, _) = sel.select(&base(), Sign::Opposite).evaluate(&t).unwrap();
        let (ss, _) = sel.select(&base(), Sign::Same).evaluate(&t).unwrap();
        let (all, _) = base().evaluate(&t).unwrap();
        for i in 0..t.n_rows() {
            assert_eq!(os[i] || ss[i], all[i]);
            assert!(!(os[i] && ss[i]));
        }
        // zero charge product belongs to the control region
        assert!(ss[4]);
        // so does a null (NaN) charge
        assert!(all[6] && ss[6] && !os[6]);
    }

    #[test]
    fn truth_match_is_order_independent() {
        let sel = RegionSelector::default();
        let t = events();
        let a = sel.apply_truth_match(sel.select(&base(), Sign::Opposite), TruthMatch::Genuine);
        let b = sel.select(
            &sel.apply_truth_match(base(), TruthMatch::Genuine),
            Sign::Opposite,
        );
        assert_eq!(a.evaluate(&t).unwrap().0, b.evaluate(&t).unwrap().0);
        assert_eq!(a.evaluate(&t).unwrap().0, vec![true, false, false, false, false, false, false]);
    }

    #[test]
    fn none_is_identity() {
        let sel = RegionSelector::default();
        let s = sel.select(&base(), Sign::Same);
        assert_eq!(sel.apply_truth_match(s.clone(), TruthMatch::None), s);
        let m = sel.region(&base(), Sign::Opposite, TruthMatch::Misidentified);
        assert_eq!(m.cuts().last().unwrap().expr, "gen_match == 0");
    }

    #[test]
    fn custom_charge_columns() {
        let sel = RegionSelector::new(ChargeColumns("qa".into(), "qb".into()), "match");
        assert_eq!(sel.sign_cut(Sign::Same), "!(qa*qb < 0)");
    }
}
