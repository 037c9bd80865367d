pub mod aggregate;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod forms;
pub mod prompt;
pub mod report;
pub mod table;
pub mod validate;

pub use docrecon_common::{reconcile, MatchKind, Reconciler, Reconciliation, Scorer};
