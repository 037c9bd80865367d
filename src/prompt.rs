//! Interactive choices (dialoguer)

use crate::error::{ReconError, Result};
use dialoguer::Select;

pub const ALL_RECORDS: &str = "List ALL records";

/// Ask which project to show. `None` means every record.
pub fn pick_project(projects: &[String]) -> Result<Option<String>> {
    let items = menu_items(projects);

    let choice = Select::new()
        .with_prompt("Project")
        .items(&items)
        .default(0)
        .interact()
        .map_err(|e| ReconError::Prompt(e.to_string()))?;

    Ok(selection(projects, choice))
}

fn menu_items(projects: &[String]) -> Vec<&str> {
    std::iter::once(ALL_RECORDS)
        .chain(projects.iter().map(String::as_str))
        .collect()
}

fn selection(projects: &[String], choice: usize) -> Option<String> {
    choice.checked_sub(1).and_then(|i| projects.get(i)).cloned()
}
