//! Field layouts for fixed-structure forms
//!
//! Some answers sit at known table positions, others next to a caption that
//! drifts between template revisions. A layout lists both kinds and the
//! order of the output columns.

use super::{FormDocument, FormRecord};
use docrecon_common::Reconciler;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

lazy_static! {
    static ref DIGITS: Regex = Regex::new(r"\d+").unwrap();
}

/// Answer at a fixed (table, row, col) position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionalField {
    pub field: String,
    pub table: usize,
    pub row: usize,
    pub col: usize,
}

/// Answer in the cell right of a caption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionedField {
    pub field: String,
    pub caption: String,
    /// Keep only the first run of digits ("TRL 4 - validado" -> "4")
    #[serde(default)]
    pub digits_only: bool,
}

/// Answers of every row in one table whose caption contains a marker,
/// joined into one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedField {
    pub field: String,
    pub table: usize,
    pub caption_contains: String,
    pub separator: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormLayout {
    pub name: String,
    /// Output columns in order. The first one receives the document name.
    pub columns: Vec<String>,
    #[serde(default)]
    pub positional: Vec<PositionalField>,
    #[serde(default)]
    pub captioned: Vec<CaptionedField>,
    #[serde(default)]
    pub listed: Vec<ListedField>,
}

impl FormLayout {
    /// Research-line term sheet ("TA"). Checkbox answers are not read and
    /// stay blank.
    pub fn research_line() -> Self {
        let positional = [
            ("Nome do Projeto", 0, 1),
            ("Descrição do Projeto", 2, 0),
            ("Justificativa TRL", 5, 0),
            ("Elemento Inovador", 9, 0),
            ("Barreiras/Desafios", 10, 0),
            ("Metodologias", 11, 0),
            ("Atividades Ano-Base", 14, 0),
            ("Informações complementares", 15, 0),
            ("Resultado Econômico", 16, 0),
            ("Resultado de inovação", 17, 0),
            ("Justificativa ODS", 19, 0),
            ("Alinhamento Políticas (Justificativa)", 20, 0),
        ]
        .iter()
        .map(|(field, table, row)| PositionalField {
            field: field.to_string(),
            table: *table,
            row: *row,
            col: 0,
        })
        .collect();

        let captioned = [
            ("TRL Inicial", "TRL Inicial:", true),
            ("TRL Final", "TRL Final:", true),
            ("Data de início", "Data de início (dia/mês/ano):", false),
            ("Data de término", "Data de término (dia/mês/ano):", false),
        ]
        .iter()
        .map(|(field, caption, digits_only)| CaptionedField {
            field: field.to_string(),
            caption: caption.to_string(),
            digits_only: *digits_only,
        })
        .collect();

        let columns = [
            "Linha de Pesquisa",
            "Nome do Projeto",
            "Descrição do Projeto",
            "Classificação (PB, PA, DE)",
            "Área do projeto",
            "Palavras-chave",
            "Natureza",
            "Elemento Inovador",
            "Barreiras/Desafios",
            "Metodologias",
            "Atividade Contínua",
            "Data de início",
            "Data de término",
            "Atividades Ano-Base",
            "Informações complementares",
            "Resultado Econômico",
            "Resultado de inovação",
            "TRL Inicial",
            "TRL Final",
            "Justificativa TRL",
            "ODS",
            "Justificativa ODS",
            "Alinhamento Políticas (Sim/Não)",
            "Alinhamento Políticas (Justificativa)",
        ];

        Self {
            name: "research_line".into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            positional,
            captioned,
            listed: vec![ListedField {
                field: "Palavras-chave".into(),
                table: 8,
                caption_contains: "Palavra-chave".into(),
                separator: ", ".into(),
            }],
        }
    }

    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl FormDocument {
    /// Fill a layout from this document. Captions are reconciled, so small
    /// wording changes in the form still find their answer.
    pub fn apply(&self, layout: &FormLayout, reconciler: &Reconciler) -> FormRecord {
        let mut values: HashMap<String, String> = HashMap::new();

        if let Some(first) = layout.columns.first() {
            values.insert(first.clone(), self.name.clone());
        }

        for p in &layout.positional {
            if let Some(text) = self.cell(p.table, p.row, p.col) {
                values.insert(p.field.clone(), text.trim().to_string());
            }
        }

        let captions: Vec<&str> = layout.captioned.iter().map(|c| c.caption.as_str()).collect();
        let (found, unresolved) = self.index().lookup(reconciler, captions.as_slice());
        for c in &layout.captioned {
            if let Some(raw) = found.get(&c.caption) {
                let value = if c.digits_only {
                    DIGITS.find(raw).map(|m| m.as_str().to_string()).unwrap_or_default()
                } else {
                    raw.trim().to_string()
                };
                values.insert(c.field.clone(), value);
            }
        }

        for l in &layout.listed {
            let marker = l.caption_contains.to_lowercase();
            let items: Vec<&str> = self
                .rows(l.table)
                .filter(|row| row.len() > 1 && row[0].to_lowercase().contains(&marker))
                .map(|row| row[1].trim())
                .filter(|v| !v.is_empty())
                .collect();
            values.insert(l.field.clone(), items.join(&l.separator));
        }

        // Report unresolved fields by output name rather than caption
        let unresolved = layout
            .captioned
            .iter()
            .filter(|c| unresolved.contains(&c.caption))
            .map(|c| c.field.clone())
            .collect();

        FormRecord {
            name: self.name.clone(),
            fields: layout.columns.clone(),
            values,
            unresolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term_sheet() -> FormDocument {
        let mut tables: Vec<Vec<Vec<String>>> = vec![vec![vec!["-".to_string()]]; 21];
        tables[0] = vec![vec!["Nome do projeto".into()], vec!["Sensor de solo".into()]];
        tables[2] = vec![vec![" Mede umidade ".into()]];
        tables[4] = vec![
            vec!["TRL inicial".into(), "TRL 3 - prova de conceito".into()],
            vec!["TRL final:".into(), "nível 6".into()],
        ];
        tables[7] = vec![vec!["Data de início (dia/mes/ano):".into(), "01/02/2024".into()]];
        tables[8] = vec![
            vec!["Palavra-chave 1".into(), "solo".into()],
            vec!["Palavra-chave 2".into(), "".into()],
            vec!["Palavra-chave 3".into(), "IoT".into()],
            vec!["Outro".into(), "x".into()],
        ];
        FormDocument::from_tables("LP Agro", tables)
    }

    #[test]
    fn test_research_line_layout() {
        let record = term_sheet().apply(&FormLayout::research_line(), &Reconciler::default());

        assert_eq!(record.get("Linha de Pesquisa"), Some("LP Agro"));
        assert_eq!(record.get("Nome do Projeto"), Some("Sensor de solo"));
        assert_eq!(record.get("Descrição do Projeto"), Some("Mede umidade"));
        assert_eq!(record.get("TRL Inicial"), Some("3"));
        assert_eq!(record.get("TRL Final"), Some("6"));
        assert_eq!(record.get("Data de início"), Some("01/02/2024"));
        assert_eq!(record.get("Palavras-chave"), Some("solo, IoT"));
        assert_eq!(record.unresolved, vec!["Data de término".to_string()]);

        let row = record.row();
        assert_eq!(row.len(), 24);
        assert_eq!(row[3], "");
    }

    #[test]
    fn test_layout_from_json() {
        let layout = FormLayout::from_json(
            r#"{"name": "mini", "columns": ["Doc", "Total"],
                "captioned": [{"field": "Total", "caption": "Valor total"}]}"#,
        )
        .unwrap();
        let doc = FormDocument::from_tables("d", vec![vec![vec!["VALOR TOTAL:".into(), "R$ 10".into()]]]);
        let record = doc.apply(&layout, &Reconciler::default());
        assert_eq!(record.row(), vec!["d", "R$ 10"]);
        assert!(record.unresolved.is_empty());
    }
}
