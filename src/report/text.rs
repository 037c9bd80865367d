//! Plain-text record blocks driven by a `TextProfile`

use crate::error::Result;
use crate::table::{BoundTable, Table};
use docrecon_common::{Reconciler, TextProfile};
use tracing::debug;

const SEPARATOR_WIDTH: usize = 30;

/// Render every record of `table`, optionally restricted to one project.
/// All profile columns must reconcile against the sheet headers.
pub fn render(
    profile: &TextProfile,
    table: &Table,
    reconciler: &Reconciler,
    project: Option<&str>,
) -> Result<String> {
    let bound = table.require(reconciler, &profile.expected_columns)?;
    Ok(render_bound(profile, &bound, project))
}

pub fn render_bound(profile: &TextProfile, bound: &BoundTable<'_>, project: Option<&str>) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut counter = 1;

    for row in bound.rows() {
        if let (Some(wanted), Some(column)) = (project, profile.project_column.as_deref()) {
            if bound.text(row, column) != wanted.trim() {
                continue;
            }
        }
        if bound.text(row, &profile.required_column).is_empty() {
            continue;
        }

        out.push(profile.record_title.replace("{n}", &counter.to_string()));
        for line in &profile.lines {
            if let Some(cond) = &line.when {
                if !cond.holds(&bound.text(row, &cond.column)) {
                    continue;
                }
            }
            let value = if profile.numeric_columns.contains(&line.column) {
                format_number(bound.number(row, &line.column).unwrap_or(0.0))
            } else {
                bound.text(row, &line.column)
            };
            out.push(format!("{}: {}", line.label, value));
        }
        out.push("-".repeat(SEPARATOR_WIDTH));
        counter += 1;
    }

    debug!("profile '{}': {} records rendered", profile.name, counter - 1);

    if out.is_empty() {
        profile.empty_message.clone()
    } else {
        out.join("\n")
    }
}

/// Distinct project names of the profile's project column, sorted.
pub fn projects(profile: &TextProfile, bound: &BoundTable<'_>) -> Vec<String> {
    profile
        .project_column
        .as_deref()
        .map(|column| bound.distinct(column))
        .unwrap_or_default()
}

/// Two decimals; zero renders as blank.
fn format_number(value: f64) -> String {
    if value == 0.0 {
        String::new()
    } else {
        format!("{:.2}", value)
    }
}
