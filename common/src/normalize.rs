//! Label normalization
//!
//! Canonical form used to decide whether two labels are the same identity:
//! lower-cased, surrounding whitespace removed. Nothing else is touched, so
//! accents and punctuation inside the label still count.

/// Canonical form of a label.
///
/// Empty input maps to the empty string. Idempotent.
pub fn normalize(label: &str) -> String {
    label.to_lowercase().trim().to_string()
}

/// Canonical form of a label that may be absent (e.g. a non-text header cell).
pub fn normalize_opt(label: Option<&str>) -> String {
    label.map(normalize).unwrap_or_default()
}

/// Character length of an already-normalized label.
pub(crate) fn char_len(label: &str) -> usize {
    label.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_case_and_whitespace() {
        assert_eq!(normalize("  Nome Completo \t"), "nome completo");
        assert_eq!(normalize("CPF "), "cpf");
    }

    #[test]
    fn test_normalize_keeps_inner_text() {
        assert_eq!(normalize("TITULAÇÃO"), "titulação");
        assert_eq!(normalize("Valor  (R$)"), "valor  (r$)");
    }

    #[test]
    fn test_normalize_empty_and_absent() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize_opt(None), "");
        assert_eq!(normalize_opt(Some(" A ")), "a");
    }

    #[test]
    fn test_normalize_idempotent() {
        for label in ["  Data de início: ", "ÁREA DO PROJETO", "x", "", "\u{a0}ODS\u{a0}"] {
            let once = normalize(label);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_char_len_counts_chars() {
        assert_eq!(char_len("função"), 6);
    }
}
