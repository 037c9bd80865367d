//! Group-and-sum over bound tables
//!
//! A `GroupSpec` names logical fields: rows are filtered, grouped by the key
//! fields, numeric fields are summed and descriptive fields take the first
//! non-blank value seen in the group. Groups come out sorted by key.

use crate::error::{ReconError, Result};
use crate::report::xlsx::SheetOut;
use crate::table::{BoundTable, CellValue, Table};
use docrecon_common::normalize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Row predicate over one logical field. Text comparisons ignore case and
/// surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum Filter {
    Equals { field: String, value: String },
    NotEquals { field: String, value: String },
    /// Numeric value > 0 (non-numeric counts as 0)
    Positive { field: String },
    NonZero { field: String },
    NotContains { field: String, value: String },
}

impl Filter {
    pub fn field(&self) -> &str {
        match self {
            Filter::Equals { field, .. }
            | Filter::NotEquals { field, .. }
            | Filter::Positive { field }
            | Filter::NonZero { field }
            | Filter::NotContains { field, .. } => field,
        }
    }

    pub fn keep(&self, bound: &BoundTable<'_>, row: &[CellValue]) -> bool {
        match self {
            Filter::Equals { field, value } => normalize(&bound.text(row, field)) == normalize(value),
            Filter::NotEquals { field, value } => normalize(&bound.text(row, field)) != normalize(value),
            Filter::Positive { field } => bound.number(row, field).unwrap_or(0.0) > 0.0,
            Filter::NonZero { field } => bound.number(row, field).unwrap_or(0.0) != 0.0,
            Filter::NotContains { field, value } => {
                !normalize(&bound.text(row, field)).contains(&normalize(value))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub keys: Vec<String>,
    /// Fields taking the first non-blank value of the group
    #[serde(default)]
    pub firsts: Vec<String>,
    #[serde(default)]
    pub sums: Vec<String>,
    #[serde(default)]
    pub filters: Vec<Filter>,
}

/// One output group.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub keys: Vec<String>,
    pub firsts: Vec<String>,
    pub sums: Vec<f64>,
}

impl GroupSpec {
    /// Every logical field this grouping reads, without repeats.
    pub fn fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = Vec::new();
        let all = self
            .keys
            .iter()
            .chain(&self.firsts)
            .chain(&self.sums)
            .map(String::as_str)
            .chain(self.filters.iter().map(Filter::field));
        for field in all {
            if !fields.iter().any(|f| f == field) {
                fields.push(field.to_string());
            }
        }
        fields
    }

    /// Bind the fields to `table` and aggregate. All fields must resolve.
    pub fn apply(&self, table: &Table, reconciler: &docrecon_common::Reconciler) -> Result<Vec<Group>> {
        let bound = table.require(reconciler, &self.fields())?;
        Ok(self.aggregate(&bound))
    }

    pub fn aggregate(&self, bound: &BoundTable<'_>) -> Vec<Group> {
        let mut groups: BTreeMap<Vec<String>, Group> = BTreeMap::new();
        let mut skipped = 0usize;

        for row in bound.rows() {
            if !self.filters.iter().all(|f| f.keep(bound, row)) {
                continue;
            }

            let keys: Vec<String> = self.keys.iter().map(|k| bound.text(row, k)).collect();
            if keys.iter().any(String::is_empty) {
                skipped += 1;
                continue;
            }

            let group = groups.entry(keys.clone()).or_insert_with(|| Group {
                keys,
                firsts: vec![String::new(); self.firsts.len()],
                sums: vec![0.0; self.sums.len()],
            });

            for (slot, field) in group.firsts.iter_mut().zip(&self.firsts) {
                if slot.is_empty() {
                    *slot = bound.text(row, field);
                }
            }
            for (sum, field) in group.sums.iter_mut().zip(&self.sums) {
                *sum += bound.number(row, field).unwrap_or(0.0);
            }
        }

        debug!("{} groups, {} rows with blank keys skipped", groups.len(), skipped);

        groups
            .into_values()
            .map(|mut g| {
                g.sums.iter_mut().for_each(|s| *s = round2(*s));
                g
            })
            .collect()
    }

    /// Value of a logical field in a group, None when the grouping does not produce it.
    pub fn value(&self, group: &Group, field: &str) -> Option<CellValue> {
        if let Some(i) = self.keys.iter().position(|k| k == field) {
            return Some(CellValue::Text(group.keys[i].clone()));
        }
        if let Some(i) = self.firsts.iter().position(|k| k == field) {
            return Some(text_cell(&group.firsts[i]));
        }
        self.sums
            .iter()
            .position(|k| k == field)
            .map(|i| CellValue::Number(group.sums[i]))
    }
}

fn text_cell(s: &str) -> CellValue {
    if s.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(s.to_string())
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Output column: a header and the logical field it is filled from
/// (`None` leaves the column blank).
#[derive(Debug, Clone, PartialEq)]
pub struct OutputColumn {
    pub header: String,
    pub field: Option<String>,
}

impl OutputColumn {
    fn from(header: &str, field: &str) -> Self {
        Self {
            header: header.to_string(),
            field: Some(field.to_string()),
        }
    }

    fn blank(header: &str) -> Self {
        Self {
            header: header.to_string(),
            field: None,
        }
    }
}

/// Grouped rows laid out as an output sheet.
pub fn to_sheet(name: &str, spec: &GroupSpec, groups: &[Group], columns: &[OutputColumn]) -> SheetOut {
    let mut sheet = SheetOut::new(name, columns.iter().map(|c| c.header.clone()).collect());
    for group in groups {
        sheet.push(
            columns
                .iter()
                .map(|c| {
                    c.field
                        .as_deref()
                        .and_then(|f| spec.value(group, f))
                        .unwrap_or(CellValue::Empty)
                })
                .collect(),
        );
    }
    sheet
}

/// Research-line field shared by the valuation sheets
pub const LINE_FIELD: &str = "LINHA DE PESQUISA";

/// Built-in summaries of a valuation workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatePreset {
    /// Staff hours and incentive value per research line and CPF
    Staff,
    /// Third-party services per research line and provider CNPJ
    Services,
}

/// Everything needed to run one preset over a loaded table.
#[derive(Debug, Clone)]
pub struct AggregatePlan {
    pub output_sheet: String,
    pub spec: GroupSpec,
    pub columns: Vec<OutputColumn>,
}

impl AggregatePreset {
    pub fn all() -> [AggregatePreset; 2] {
        [AggregatePreset::Staff, AggregatePreset::Services]
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "rh" | "staff" => Some(AggregatePreset::Staff),
            "st" | "services" => Some(AggregatePreset::Services),
            _ => None,
        }
    }

    /// Sheet pattern, `*` suffix meaning prefix match.
    pub fn sheet_pattern(&self) -> &'static str {
        match self {
            AggregatePreset::Staff => "Timesheet_*",
            AggregatePreset::Services => "Serviços de Terceiros e Viagens",
        }
    }

    /// Group spec and output layout for `table`. The staff value column is
    /// the one whose header mentions "LEI DO BEM" without a question mark.
    pub fn plan(&self, table: &Table) -> Result<AggregatePlan> {
        match self {
            AggregatePreset::Staff => {
                let value_col = incentive_column(table).ok_or_else(|| ReconError::MissingColumns {
                    sheet: table.sheet.clone(),
                    columns: vec!["LEI DO BEM".to_string()],
                })?;
                let hours = "HORAS APROPRIADAS A HORAS ÚTEIS";

                Ok(AggregatePlan {
                    output_sheet: "RH".into(),
                    spec: GroupSpec {
                        keys: vec![LINE_FIELD.into(), "C.P.F.".into()],
                        firsts: vec!["PROJETO".into(), "NOME DO COLABORADOR".into(), "CARGO".into()],
                        sums: vec![hours.into(), value_col.clone()],
                        filters: vec![Filter::Positive { field: value_col.clone() }],
                    },
                    columns: vec![
                        OutputColumn::from("LP", LINE_FIELD),
                        OutputColumn::from("PROJETO", "PROJETO"),
                        OutputColumn::from("COLABORADOR", "NOME DO COLABORADOR"),
                        OutputColumn::from("CPF", "C.P.F."),
                        OutputColumn::from("CARGO", "CARGO"),
                        OutputColumn::from("HORAS", hours),
                        OutputColumn::from("VALOR TOTAL", &value_col),
                        OutputColumn::blank("DESCRIÇÃO DA ATIVIDADE"),
                    ],
                })
            }
            AggregatePreset::Services => Ok(AggregatePlan {
                output_sheet: "ST".into(),
                spec: GroupSpec {
                    keys: vec![LINE_FIELD.into(), "CNPJ PRESTADOR".into()],
                    firsts: vec!["PROJETO".into(), "RAZÃO SOCIAL PRESTADOR".into()],
                    sums: vec!["R$ FINAL".into()],
                    filters: vec![Filter::Equals {
                        field: "DESPESA VÁLIDA PARA O PIT?".into(),
                        value: "Sim".into(),
                    }],
                },
                columns: vec![
                    OutputColumn::from("LP", LINE_FIELD),
                    OutputColumn::from("PROJETO", "PROJETO"),
                    OutputColumn::from("RAZÃO SOCIAL PRESTADOR", "RAZÃO SOCIAL PRESTADOR"),
                    OutputColumn::from("CNPJ PRESTADOR", "CNPJ PRESTADOR"),
                    OutputColumn::from("VALOR TOTAL", "R$ FINAL"),
                    OutputColumn::blank("DESCRIÇÃO DA ATIVIDADE"),
                ],
            }),
        }
    }
}

impl std::fmt::Display for AggregatePreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregatePreset::Staff => write!(f, "rh"),
            AggregatePreset::Services => write!(f, "st"),
        }
    }
}

fn incentive_column(table: &Table) -> Option<String> {
    table
        .headers()
        .iter()
        .find(|h| h.to_uppercase().contains("LEI DO BEM") && !h.contains('?'))
        .cloned()
}

impl AggregatePlan {
    pub fn run(&self, table: &Table, reconciler: &docrecon_common::Reconciler) -> Result<SheetOut> {
        let groups = self.spec.apply(table, reconciler)?;
        Ok(to_sheet(&self.output_sheet, &self.spec, &groups, &self.columns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docrecon_common::Reconciler;

    fn t(s: &str) -> CellValue {
        CellValue::Text(s.into())
    }

    fn n(v: f64) -> CellValue {
        CellValue::Number(v)
    }

    fn timesheet() -> Table {
        Table::new(
            "Timesheet_2024",
            vec![
                "LINHA DE PESQUISA".into(),
                "PROJETO".into(),
                "NOME DO COLABORADOR".into(),
                "C.P.F.".into(),
                "CARGO".into(),
                "HORAS APROPRIADAS A HORAS ÚTEIS".into(),
                "ELEGÍVEL LEI DO BEM?".into(),
                "VALOR LEI DO BEM".into(),
            ],
            vec![
                vec![t("LP2"), t("P2"), t("Bia"), t("222"), t("Dev"), n(4.0), t("Sim"), n(100.0)],
                vec![t("LP1"), t("P1"), t("Ana"), t("111"), t("Eng"), n(1.111), t("Sim"), n(10.004)],
                vec![t("LP1"), t("P1"), t("Ana"), t("111"), t("Eng"), n(2.0), t("Sim"), n(20.0)],
                vec![t("LP1"), t("P1"), t("Caio"), t("333"), t("Est"), n(5.0), t("Não"), n(0.0)],
                vec![CellValue::Empty, t("P1"), t("Ana"), t("111"), t("Eng"), n(9.0), t("Sim"), n(9.0)],
            ],
        )
    }

    #[test]
    fn test_staff_preset_groups_and_rounds() {
        let table = timesheet();
        let plan = AggregatePreset::Staff.plan(&table).unwrap();
        assert_eq!(plan.spec.sums[1], "VALOR LEI DO BEM");

        let sheet = plan.run(&table, &Reconciler::default()).unwrap();
        assert_eq!(sheet.name, "RH");
        assert_eq!(sheet.headers[0], "LP");
        assert_eq!(sheet.rows.len(), 2);

        // sorted by (line, cpf); zero-value and blank-line rows dropped
        let first = &sheet.rows[0];
        assert_eq!(first[0], t("LP1"));
        assert_eq!(first[2], t("Ana"));
        assert_eq!(first[5], n(3.11));
        assert_eq!(first[6], n(30.0));
        assert_eq!(first[7], CellValue::Empty);
        assert_eq!(sheet.rows[1][0], t("LP2"));
    }

    #[test]
    fn test_staff_preset_needs_value_column() {
        let table = Table::new("Timesheet_x", vec!["LINHA DE PESQUISA".into()], vec![]);
        assert!(matches!(
            AggregatePreset::Staff.plan(&table),
            Err(ReconError::MissingColumns { .. })
        ));
    }

    #[test]
    fn test_filters() {
        let table = Table::new(
            "ST",
            vec!["CARGO".into(), "V".into()],
            vec![vec![t(" Estagiario "), n(-1.0)], vec![t("Dev"), t("abc")]],
        );
        let bound = table.bind(&Reconciler::default(), &["CARGO", "V"]);
        let rows: Vec<_> = bound.rows().collect();

        let not_intern = Filter::NotContains { field: "CARGO".into(), value: "estagiario".into() };
        assert!(!not_intern.keep(&bound, rows[0]));
        assert!(not_intern.keep(&bound, rows[1]));

        assert!(Filter::NonZero { field: "V".into() }.keep(&bound, rows[0]));
        assert!(!Filter::Positive { field: "V".into() }.keep(&bound, rows[0]));
        assert!(!Filter::NonZero { field: "V".into() }.keep(&bound, rows[1]));
        assert!(Filter::Equals { field: "CARGO".into(), value: "DEV".into() }.keep(&bound, rows[1]));
        assert!(Filter::NotEquals { field: "CARGO".into(), value: "DEV".into() }.keep(&bound, rows[0]));
    }

    #[test]
    fn test_first_takes_first_non_blank() {
        let table = Table::new(
            "x",
            vec!["K".into(), "NOME".into(), "V".into()],
            vec![
                vec![t("a"), CellValue::Empty, n(1.0)],
                vec![t("a"), t("Zé"), n(2.0)],
                vec![t("a"), t("Outro"), n(3.0)],
            ],
        );
        let spec = GroupSpec {
            keys: vec!["K".into()],
            firsts: vec!["NOME".into()],
            sums: vec!["V".into()],
            filters: vec![],
        };
        let groups = spec.apply(&table, &Reconciler::default()).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].firsts, vec!["Zé".to_string()]);
        assert_eq!(groups[0].sums, vec![6.0]);
    }

    #[test]
    fn test_fields_deduplicated() {
        let spec = GroupSpec {
            keys: vec!["A".into()],
            firsts: vec![],
            sums: vec!["B".into()],
            filters: vec![Filter::Positive { field: "B".into() }, Filter::NonZero { field: "C".into() }],
        };
        assert_eq!(spec.fields(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_filter_json() {
        let filter: Filter = serde_json::from_str(r#"{"op":"equals","field":"X","value":"Sim"}"#).unwrap();
        assert_eq!(filter, Filter::Equals { field: "X".into(), value: "Sim".into() });
    }
}
