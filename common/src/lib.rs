//! docrecon shared core
//!
//! Label reconciliation: maps the logical field names an application needs
//! onto the headers/captions a document actually has.

pub mod error;
pub mod index;
pub mod normalize;
pub mod profile;
pub mod reconcile;
pub mod similarity;

pub use error::{Error, Result};
pub use index::LabelIndex;
pub use normalize::{normalize, normalize_opt};
pub use profile::{Condition, HeaderSpec, ProfileLine, TextProfile};
pub use reconcile::{reconcile, FieldMatch, MatchKind, Reconciler, Reconciliation, DEFAULT_FUZZY_THRESHOLD};
pub use similarity::Scorer;
