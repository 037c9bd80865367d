//! Caption index for form-like documents
//!
//! Built once per document so that value lookups by caption are a single hash
//! probe instead of a scan over every table row.

use crate::normalize::normalize;
use crate::reconcile::{Reconciler, Reconciliation};
use std::collections::HashMap;

/// Normalized caption -> value, keeping the raw captions in document order.
#[derive(Debug, Clone, Default)]
pub struct LabelIndex {
    captions: Vec<String>,
    values: HashMap<String, String>,
}

impl LabelIndex {
    /// Build from (caption, value) pairs. The first occurrence of a caption wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut index = Self::default();
        for (caption, value) in pairs {
            index.insert(caption.into(), value.into());
        }
        index
    }

    fn insert(&mut self, caption: String, value: String) {
        let key = normalize(&caption);
        if key.is_empty() || self.values.contains_key(&key) {
            return;
        }
        self.values.insert(key, value);
        self.captions.push(caption);
    }

    /// Raw captions, in the order they were first seen.
    pub fn captions(&self) -> &[String] {
        &self.captions
    }

    /// Value for a caption, compared after normalization.
    pub fn get(&self, caption: &str) -> Option<&str> {
        self.values.get(&normalize(caption)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reconcile the index captions against logical fields.
    pub fn reconcile<F: AsRef<str>>(&self, reconciler: &Reconciler, fields: &[F]) -> Reconciliation {
        reconciler.reconcile(self.captions.as_slice(), fields)
    }

    /// Values keyed by logical field, plus the fields that found no caption.
    pub fn lookup<F: AsRef<str>>(
        &self,
        reconciler: &Reconciler,
        fields: &[F],
    ) -> (HashMap<String, String>, Vec<String>) {
        let reconciliation = self.reconcile(reconciler, fields);
        let values = reconciliation
            .matches()
            .iter()
            .filter_map(|m| self.get(&m.label).map(|v| (m.field.clone(), v.to_string())))
            .collect();
        (values, reconciliation.unresolved().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LabelIndex {
        LabelIndex::from_pairs([
            ("TRL Inicial:", "TRL 3"),
            ("TRL Final:", "TRL 6"),
            ("Data de início (dia/mês/ano):", "01/02/2024"),
            ("trl inicial:", "ignored duplicate"),
            ("", "no caption"),
        ])
    }

    #[test]
    fn test_get_is_case_and_space_insensitive() {
        let index = sample();
        assert_eq!(index.get("  trl inicial: "), Some("TRL 3"));
        assert_eq!(index.get("TRL FINAL:"), Some("TRL 6"));
        assert_eq!(index.get("TRL"), None);
    }

    #[test]
    fn test_first_caption_wins_and_blank_dropped() {
        let index = sample();
        assert_eq!(index.len(), 3);
        assert_eq!(index.captions()[0], "TRL Inicial:");
    }

    #[test]
    fn test_lookup_by_logical_field() {
        let index = sample();
        let (values, missing) = index.lookup(&Reconciler::default(), &["TRL Inicial", "Data de início", "ODS"]);
        assert_eq!(values.get("TRL Inicial").map(String::as_str), Some("TRL 3"));
        assert_eq!(values.get("Data de início").map(String::as_str), Some("01/02/2024"));
        assert_eq!(missing, vec!["ODS".to_string()]);
    }
}
