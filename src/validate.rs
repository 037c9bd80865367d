//! Totals cross-check
//!
//! Compares totals computed from detail rows with the totals a summary
//! sheet claims, per key, within a relative tolerance.

use crate::report::xlsx::SheetOut;
use crate::table::{BoundTable, CellValue};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TotalCheck {
    Ok { calculated: f64, expected: f64 },
    Mismatch { calculated: f64, expected: f64 },
    /// The key has no expected total
    Missing { calculated: f64 },
}

impl TotalCheck {
    pub fn is_ok(&self) -> bool {
        matches!(self, TotalCheck::Ok { .. })
    }
}

impl fmt::Display for TotalCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TotalCheck::Ok { calculated, expected } => {
                write!(f, "✔ calculated {:.2} vs expected {:.2}", calculated, expected)
            }
            TotalCheck::Mismatch { calculated, expected } => {
                write!(f, "⚠ calculated {:.2} vs expected {:.2}", calculated, expected)
            }
            TotalCheck::Missing { calculated } => {
                write!(f, "⚠ calculated {:.2}, no expected total", calculated)
            }
        }
    }
}

/// `|a - b| <= rel_tol * max(|a|, |b|)`
pub fn is_close(a: f64, b: f64, rel_tol: f64) -> bool {
    a == b || (a - b).abs() <= rel_tol * a.abs().max(b.abs())
}

/// Check every calculated key against `expected`, keys sorted.
pub fn cross_check(
    calculated: &HashMap<String, f64>,
    expected: &HashMap<String, f64>,
    rel_tol: f64,
) -> Vec<(String, TotalCheck)> {
    let sorted: BTreeMap<&String, &f64> = calculated.iter().collect();
    sorted
        .into_iter()
        .map(|(key, &calc)| {
            let check = match expected.get(key) {
                None => TotalCheck::Missing { calculated: calc },
                Some(&exp) if is_close(calc, exp, rel_tol) => TotalCheck::Ok {
                    calculated: calc,
                    expected: exp,
                },
                Some(&exp) => TotalCheck::Mismatch {
                    calculated: calc,
                    expected: exp,
                },
            };
            (key.clone(), check)
        })
        .collect()
}

/// Summary-sheet totals: the name in `name_col`, one amount per `value_cols`
/// entry. Rows with a blank name, a "total"/"projeto" label or a non-numeric
/// amount are skipped; repeated names accumulate.
pub fn summary_totals(grid: &[Vec<CellValue>], name_col: usize, value_cols: &[usize]) -> HashMap<String, Vec<f64>> {
    let mut totals: HashMap<String, Vec<f64>> = HashMap::new();

    for row in grid {
        let name = row.get(name_col).map(CellValue::as_text).unwrap_or_default();
        if name.is_empty() || matches!(name.to_lowercase().as_str(), "total" | "projeto") {
            continue;
        }
        let values: Option<Vec<f64>> = value_cols
            .iter()
            .map(|c| row.get(*c).and_then(CellValue::as_number))
            .collect();
        let Some(values) = values else { continue };

        let entry = totals.entry(name).or_insert_with(|| vec![0.0; value_cols.len()]);
        for (acc, v) in entry.iter_mut().zip(values) {
            *acc += v;
        }
    }
    totals
}

/// Sum values of `source` keyed by a member, onto the groups that list it.
pub fn roll_up(groups: &BTreeMap<String, Vec<String>>, source: &HashMap<String, f64>) -> HashMap<String, f64> {
    groups
        .iter()
        .map(|(group, members)| {
            let sum: f64 = members.iter().filter_map(|m| source.get(m)).sum();
            (group.clone(), sum)
        })
        .collect()
}

/// Projects listed under each group value (e.g. research line -> projects),
/// in first-seen order.
pub fn group_members(bound: &BoundTable<'_>, group_field: &str, member_field: &str) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for row in bound.rows() {
        let group = bound.text(row, group_field);
        let member = bound.text(row, member_field);
        if group.is_empty() || member.is_empty() {
            continue;
        }
        let members = groups.entry(group).or_default();
        if !members.contains(&member) {
            members.push(member);
        }
    }
    groups
}

/// Sum of one output column per key column value.
pub fn sheet_totals(sheet: &SheetOut, key_header: &str, value_header: &str) -> HashMap<String, f64> {
    let mut totals = HashMap::new();
    let key_idx = sheet.headers.iter().position(|h| h == key_header);
    let value_idx = sheet.headers.iter().position(|h| h == value_header);
    let (Some(key_idx), Some(value_idx)) = (key_idx, value_idx) else {
        return totals;
    };

    for row in &sheet.rows {
        let key = row.get(key_idx).map(CellValue::as_text).unwrap_or_default();
        if key.is_empty() {
            continue;
        }
        let value = row.get(value_idx).and_then(CellValue::as_number).unwrap_or(0.0);
        *totals.entry(key).or_insert(0.0) += value;
    }
    totals
}
