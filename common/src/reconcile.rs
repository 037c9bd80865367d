//! Label reconciliation
//!
//! Maps expected logical field names onto the raw headers/captions that an
//! input document actually carries.
//!
//! ## Passes
//! 1. Exact / containment: equal normalized forms win outright; otherwise the
//!    tightest substring relation (either direction) is taken.
//! 2. Fuzzy: only for fields left over by pass 1, only against labels pass 1
//!    did not claim, gated by a 0-100 similarity threshold.
//!
//! A raw label is claimed by at most one field. Every expected field ends up
//! either mapped or unresolved.

use crate::normalize::{char_len, normalize};
use crate::similarity::Scorer;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Default fuzzy threshold (0-100).
pub const DEFAULT_FUZZY_THRESHOLD: u8 = 80;

/// How a field was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Containment,
    Fuzzy,
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchKind::Exact => write!(f, "exact"),
            MatchKind::Containment => write!(f, "containment"),
            MatchKind::Fuzzy => write!(f, "fuzzy"),
        }
    }
}

/// One resolved logical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMatch {
    /// Logical field as supplied by the caller
    pub field: String,
    /// Raw label exactly as it appears in the document
    pub label: String,
    /// Position of the claimed label in the supplied labels. Distinguishes
    /// repeated header texts.
    pub label_index: usize,
    pub kind: MatchKind,
    /// Similarity of the normalized pair under the configured scorer
    pub score: u8,
}

/// Result of one reconciliation call.
///
/// `matches` follows the order of the expected fields, as does `unresolved`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    matches: Vec<FieldMatch>,
    unresolved: Vec<String>,
}

impl Reconciliation {
    pub fn matches(&self) -> &[FieldMatch] {
        &self.matches
    }

    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// Raw label resolved for a logical field.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.get_match(field).map(|m| m.label.as_str())
    }

    pub fn get_match(&self, field: &str) -> Option<&FieldMatch> {
        self.matches.iter().find(|m| m.field == field)
    }

    /// Position of the label resolved for a logical field.
    pub fn label_index(&self, field: &str) -> Option<usize> {
        self.get_match(field).map(|m| m.label_index)
    }

    /// Logical field -> raw label.
    pub fn mapping(&self) -> HashMap<String, String> {
        self.matches
            .iter()
            .map(|m| (m.field.clone(), m.label.clone()))
            .collect()
    }

    pub fn into_parts(self) -> (HashMap<String, String>, Vec<String>) {
        let mapping = self.mapping();
        (mapping, self.unresolved)
    }
}

/// Configured matcher. Cheap to copy; holds no state between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciler {
    pub threshold: u8,
    pub scorer: Scorer,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_FUZZY_THRESHOLD,
            scorer: Scorer::default(),
        }
    }
}

/// Raw label with its normalized form computed once per call.
struct Candidate<'a> {
    raw: &'a str,
    normalized: String,
    len: usize,
}

/// Expected field with its normalized form.
struct Wanted<'a> {
    raw: &'a str,
    normalized: String,
    len: usize,
}

impl Reconciler {
    pub fn new(threshold: u8) -> Self {
        Self {
            threshold: threshold.min(100),
            ..Self::default()
        }
    }

    pub fn with_scorer(mut self, scorer: Scorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Reconcile raw labels against expected fields. Never fails.
    pub fn reconcile<R, F>(&self, raw_labels: &[R], expected_fields: &[F]) -> Reconciliation
    where
        R: AsRef<str>,
        F: AsRef<str>,
    {
        let candidates: Vec<Candidate> = raw_labels
            .iter()
            .map(|r| {
                let normalized = normalize(r.as_ref());
                let len = char_len(&normalized);
                Candidate { raw: r.as_ref(), normalized, len }
            })
            .collect();

        // A logical field appears at most once in the output
        let names: Vec<&str> = expected_fields.iter().map(|f| f.as_ref()).collect();
        let mut seen = HashSet::new();
        let wanted: Vec<Wanted> = names
            .into_iter()
            .filter(|f| seen.insert(*f))
            .map(|f| {
                let normalized = normalize(f);
                let len = char_len(&normalized);
                Wanted { raw: f, normalized, len }
            })
            .collect();

        let mut claimed = vec![false; candidates.len()];
        let mut resolved: Vec<(usize, FieldMatch)> = Vec::new();

        let residual = self.first_pass(&candidates, &wanted, &mut claimed, &mut resolved);
        debug!(
            resolved = resolved.len(),
            residual = residual.len(),
            "exact/containment pass finished"
        );

        let unresolved_idx = if residual.is_empty() {
            residual
        } else {
            let left = self.fuzzy_pass(&candidates, &wanted, &residual, &mut claimed, &mut resolved);
            debug!(unresolved = left.len(), threshold = self.threshold, "fuzzy pass finished");
            left
        };

        resolved.sort_by_key(|(idx, _)| *idx);

        Reconciliation {
            matches: resolved.into_iter().map(|(_, m)| m).collect(),
            unresolved: unresolved_idx
                .into_iter()
                .map(|i| wanted[i].raw.to_string())
                .collect(),
        }
    }

    /// Exact match first, then the closest-length containment candidate.
    /// Returns indices of fields still unresolved, in order.
    fn first_pass(
        &self,
        candidates: &[Candidate],
        wanted: &[Wanted],
        claimed: &mut [bool],
        resolved: &mut Vec<(usize, FieldMatch)>,
    ) -> Vec<usize> {
        let mut residual = Vec::new();

        for (field_idx, field) in wanted.iter().enumerate() {
            if field.normalized.is_empty() {
                residual.push(field_idx);
                continue;
            }

            let exact = candidates
                .iter()
                .enumerate()
                .find(|(i, c)| !claimed[*i] && c.normalized == field.normalized)
                .map(|(i, _)| (i, MatchKind::Exact));

            // min_by_key keeps the first of equal keys, so ties go to supply order
            let chosen = exact.or_else(|| {
                candidates
                    .iter()
                    .enumerate()
                    .filter(|(i, c)| {
                        !claimed[*i]
                            && !c.normalized.is_empty()
                            && (c.normalized.contains(&field.normalized)
                                || field.normalized.contains(&c.normalized))
                    })
                    .min_by_key(|(_, c)| c.len.abs_diff(field.len))
                    .map(|(i, _)| (i, MatchKind::Containment))
            });

            match chosen {
                Some((label_idx, kind)) => {
                    claimed[label_idx] = true;
                    let candidate = &candidates[label_idx];
                    let score = match kind {
                        MatchKind::Exact => 100,
                        _ => self.scorer.score(&field.normalized, &candidate.normalized),
                    };
                    debug!(field = field.raw, label = candidate.raw, %kind, "field resolved");
                    resolved.push((
                        field_idx,
                        FieldMatch {
                            field: field.raw.to_string(),
                            label: candidate.raw.to_string(),
                            label_index: label_idx,
                            kind,
                            score,
                        },
                    ));
                }
                None => residual.push(field_idx),
            }
        }

        residual
    }

    /// Best-score assignment over the labels the first pass left free.
    ///
    /// Pairs are taken in descending score order (ties: earlier field, then
    /// earlier label), so an assignment made at a given threshold never
    /// depends on pairs below it. Unlike the first pass, an earlier field does
    /// not beat a later one whose candidate scores higher; raising the
    /// threshold can then only drop matches, never move a label.
    fn fuzzy_pass(
        &self,
        candidates: &[Candidate],
        wanted: &[Wanted],
        residual: &[usize],
        claimed: &mut [bool],
        resolved: &mut Vec<(usize, FieldMatch)>,
    ) -> Vec<usize> {
        let mut pairs: Vec<(u8, usize, usize)> = Vec::new();
        for &field_idx in residual {
            let field = &wanted[field_idx];
            if field.normalized.is_empty() {
                continue;
            }
            for (label_idx, candidate) in candidates.iter().enumerate() {
                if claimed[label_idx] || candidate.normalized.is_empty() {
                    continue;
                }
                let score = self.scorer.score(&field.normalized, &candidate.normalized);
                if score >= self.threshold {
                    pairs.push((score, field_idx, label_idx));
                }
            }
        }

        pairs.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

        let mut done: HashSet<usize> = HashSet::new();
        for (score, field_idx, label_idx) in pairs {
            if done.contains(&field_idx) || claimed[label_idx] {
                continue;
            }
            claimed[label_idx] = true;
            done.insert(field_idx);

            let field = &wanted[field_idx];
            let candidate = &candidates[label_idx];
            debug!(field = field.raw, label = candidate.raw, score, "field resolved by fuzzy match");
            resolved.push((
                field_idx,
                FieldMatch {
                    field: field.raw.to_string(),
                    label: candidate.raw.to_string(),
                    label_index: label_idx,
                    kind: MatchKind::Fuzzy,
                    score,
                },
            ));
        }

        residual
            .iter()
            .copied()
            .filter(|idx| !done.contains(idx))
            .collect()
    }
}

/// Reconcile with the default scorer.
///
/// # Arguments
/// * `raw_labels` - headers/captions present in the document, in document order
/// * `expected_fields` - logical names, earlier ones win contention
/// * `fuzzy_threshold` - 0-100, values above 100 are clamped
pub fn reconcile<R, F>(raw_labels: &[R], expected_fields: &[F], fuzzy_threshold: u8) -> Reconciliation
where
    R: AsRef<str>,
    F: AsRef<str>,
{
    Reconciler::new(fuzzy_threshold).reconcile(raw_labels, expected_fields)
}
