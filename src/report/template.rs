//! Fill a template's header layout with records keyed by logical names
//!
//! The template's header captions are the raw labels; record keys are the
//! logical fields. Each record key is reconciled onto a header once per fill,
//! then every record becomes one row in header order.

use super::xlsx::SheetOut;
use crate::error::Result;
use crate::forms::FormRecord;
use crate::table::{load_grid, CellValue};
use docrecon_common::{Reconciler, Reconciliation};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Ordered (key, value) pairs.
pub type Record = Vec<(String, CellValue)>;

/// Header captions of one template sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub sheet: String,
    pub headers: Vec<String>,
}

impl Template {
    /// Read the header row (0-based) of `sheet`. Captions are trimmed only.
    pub fn read(bytes: &[u8], sheet: &str, header_row: usize) -> Result<Self> {
        let grid = load_grid(bytes, sheet)?;
        let headers: Vec<String> = grid
            .get(header_row)
            .map(|row| row.iter().map(|c| c.to_string().trim().to_string()).collect())
            .unwrap_or_default();

        // Trailing blank captions carry no column
        let width = headers.iter().rposition(|h| !h.is_empty()).map_or(0, |i| i + 1);
        Ok(Self {
            sheet: sheet.to_string(),
            headers: headers.into_iter().take(width).collect(),
        })
    }
}

/// Result of a fill: the output sheet plus how record keys were placed.
#[derive(Debug, Clone)]
pub struct Filled {
    pub sheet: SheetOut,
    pub reconciliation: Reconciliation,
}

/// Lay `records` out under the template headers. Headers no key maps to stay
/// blank; keys without a header are reported as unresolved.
pub fn fill(template: &Template, records: &[Record], reconciler: &Reconciler) -> Filled {
    let mut keys: Vec<&str> = Vec::new();
    for (key, _) in records.iter().flatten() {
        if !keys.contains(&key.as_str()) {
            keys.push(key);
        }
    }

    let reconciliation = reconciler.reconcile(template.headers.as_slice(), keys.as_slice());
    for key in reconciliation.unresolved() {
        warn!("no column in '{}' for '{}'", template.sheet, key);
    }

    // header position -> record key
    let placement: HashMap<usize, &str> = reconciliation
        .matches()
        .iter()
        .map(|m| (m.label_index, m.field.as_str()))
        .collect();
    debug!("{} of {} keys placed in '{}'", placement.len(), keys.len(), template.sheet);

    let mut sheet = SheetOut::new(template.sheet.clone(), template.headers.clone());
    for record in records {
        let row = (0..template.headers.len())
            .map(|idx| {
                placement
                    .get(&idx)
                    .and_then(|key| record.iter().find(|(k, _)| k == key))
                    .map(|(_, v)| v.clone())
                    .unwrap_or(CellValue::Empty)
            })
            .collect();
        sheet.push(row);
    }

    Filled {
        sheet,
        reconciliation,
    }
}

/// Records from extracted forms, numbered from 1 under `counter_key`.
pub fn records_from_forms(forms: &[FormRecord], counter_key: Option<&str>) -> Vec<Record> {
    forms
        .iter()
        .enumerate()
        .map(|(i, form)| {
            let mut record: Record = Vec::new();
            if let Some(key) = counter_key {
                record.push((key.to_string(), CellValue::Number((i + 1) as f64)));
            }
            record.extend(form.fields.iter().map(|f| {
                let value = form.get(f).unwrap_or_default();
                let cell = if value.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(value.to_string())
                };
                (f.clone(), cell)
            }));
            record
        })
        .collect()
}

/// Records from an output sheet, keyed by its headers.
pub fn records_from_sheet(sheet: &SheetOut) -> Vec<Record> {
    sheet
        .rows
        .iter()
        .map(|row| {
            sheet
                .headers
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect()
        })
        .collect()
}

/// Records from a JSON array of flat objects.
pub fn records_from_json(json: &str) -> Result<Vec<Record>> {
    let items: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(json)?;
    Ok(items
        .into_iter()
        .map(|obj| obj.into_iter().map(|(k, v)| (k, json_cell(v))).collect())
        .collect())
}

fn json_cell(value: serde_json::Value) -> CellValue {
    match value {
        serde_json::Value::Null => CellValue::Empty,
        serde_json::Value::Bool(b) => CellValue::Bool(b),
        serde_json::Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or_default(),
        serde_json::Value::String(s) if s.is_empty() => CellValue::Empty,
        serde_json::Value::String(s) => CellValue::Text(s),
        other => CellValue::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> Template {
        Template {
            sheet: "RH".into(),
            headers: vec![
                "#".into(),
                "Nome da atividade de PD&I (Nome do projeto igual no GERAL)".into(),
                "CPF".into(),
                "NOME".into(),
                "Total Horas (Anual)".into(),
                "Valor (R$)".into(),
            ],
        }
    }

    fn rec(pairs: &[(&str, CellValue)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_fill_places_keys_by_reconciliation() {
        let records = vec![
            rec(&[
                ("#", CellValue::Number(1.0)),
                ("projeto", CellValue::Text("Alfa".into())),
                ("cpf ", CellValue::Text("111".into())),
                ("Horas", CellValue::Number(8.0)),
                ("Sexo", CellValue::Text("F".into())),
            ]),
            rec(&[("cpf ", CellValue::Text("222".into()))]),
        ];

        let filled = fill(&template(), &records, &Reconciler::default());
        assert_eq!(filled.sheet.headers.len(), 6);
        assert_eq!(
            filled.sheet.rows[0],
            vec![
                CellValue::Number(1.0),
                CellValue::Text("Alfa".into()),
                CellValue::Text("111".into()),
                CellValue::Empty,
                CellValue::Number(8.0),
                CellValue::Empty,
            ]
        );
        assert_eq!(filled.sheet.rows[1][2], CellValue::Text("222".into()));
        assert_eq!(filled.sheet.rows[1][0], CellValue::Empty);
        assert_eq!(filled.reconciliation.unresolved(), ["Sexo".to_string()]);
    }

    #[test]
    fn test_fill_repeated_captions_keep_both_values() {
        let template = Template {
            sheet: "ST".into(),
            headers: vec!["Valor".into(), "Valor".into()],
        };
        let record: Record = vec![
            ("Valor".into(), CellValue::Number(1.0)),
            ("Valor Total".into(), CellValue::Number(2.0)),
        ];
        let filled = fill(&template, &[record], &Reconciler::default());

        assert!(filled.reconciliation.unresolved().is_empty());
        assert_eq!(filled.sheet.rows[0], vec![CellValue::Number(1.0), CellValue::Number(2.0)]);
    }

    #[test]
    fn test_records_from_json() {
        let records = records_from_json(r#"[{"CPF": "1", "Valor": 2.5, "Nota": null}]"#).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].contains(&("Valor".to_string(), CellValue::Number(2.5))));
        assert!(records[0].contains(&("Nota".to_string(), CellValue::Empty)));
    }

    #[test]
    fn test_records_from_sheet_and_forms() {
        let mut sheet = SheetOut::new("ST", vec!["CNPJ".into(), "VALOR".into()]);
        sheet.push(vec![CellValue::Text("9".into()), CellValue::Number(3.0)]);
        let records = records_from_sheet(&sheet);
        assert_eq!(records[0][1], ("VALOR".to_string(), CellValue::Number(3.0)));

        let form = FormRecord {
            name: "lp".into(),
            fields: vec!["A".into(), "B".into()],
            values: [("A".to_string(), "x".to_string())].into_iter().collect(),
            unresolved: vec![],
        };
        let records = records_from_forms(&[form], Some("#"));
        assert_eq!(records[0][0], ("#".to_string(), CellValue::Number(1.0)));
        assert_eq!(records[0][2], ("B".to_string(), CellValue::Empty));
    }
}
