//! Text report profiles
//!
//! A profile says which sheet to read, which logical columns it needs and how
//! each record is laid out as text. Built-in presets cover the four NewPiit
//! tabs; custom profiles come from JSON.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Logical project column shared by the RH / ST / MC tabs
pub const PROJECT_COLUMN: &str = "Nome da atividade de PD&I (Nome do projeto igual no GERAL)";

/// Where the header row of a sheet is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderSpec {
    /// Fixed 0-based row index
    Row(usize),
    /// First row (within the scan window) holding a cell equal to this keyword
    Keyword(String),
}

impl Default for HeaderSpec {
    fn default() -> Self {
        HeaderSpec::Row(0)
    }
}

/// Show a line only when `column` differs from `not_equals` (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub not_equals: String,
}

impl Condition {
    pub fn holds(&self, value: &str) -> bool {
        value.trim().to_lowercase() != self.not_equals.trim().to_lowercase()
    }
}

/// One `Label: value` line of a record block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileLine {
    pub label: String,
    pub column: String,
    #[serde(default)]
    pub when: Option<Condition>,
}

impl ProfileLine {
    fn new(label: &str, column: &str) -> Self {
        Self {
            label: label.into(),
            column: column.into(),
            when: None,
        }
    }

    fn unless(mut self, column: &str, value: &str) -> Self {
        self.when = Some(Condition {
            column: column.into(),
            not_equals: value.into(),
        });
        self
    }
}

/// Layout of a text report for one sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextProfile {
    pub name: String,
    pub sheet_name: String,
    #[serde(default)]
    pub header: HeaderSpec,
    /// Logical columns that must all reconcile before rendering
    pub expected_columns: Vec<String>,
    /// Logical column used for the optional project filter
    #[serde(default)]
    pub project_column: Option<String>,
    /// Block heading; `{n}` is replaced by the 1-based record counter
    pub record_title: String,
    /// Records whose value here is blank are skipped
    pub required_column: String,
    /// Columns rendered as numbers with two decimals (zero renders blank)
    #[serde(default)]
    pub numeric_columns: Vec<String>,
    pub lines: Vec<ProfileLine>,
    pub empty_message: String,
}

impl TextProfile {
    /// Built-in preset by name.
    pub fn from_preset(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "geral" | "projects" => Some(Self::geral_preset()),
            "rh" | "staff" => Some(Self::rh_preset()),
            "st" | "services" => Some(Self::st_preset()),
            "mc" | "materials" => Some(Self::mc_preset()),
            _ => None,
        }
    }

    /// Names accepted by [`TextProfile::from_preset`].
    pub fn preset_names() -> &'static [&'static str] {
        &["geral", "rh", "st", "mc"]
    }

    /// Preset by name, or an error listing the known ones.
    pub fn preset(name: &str) -> Result<Self> {
        Self::from_preset(name).ok_or_else(|| Error::UnknownPreset(name.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let profile: Self = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Every column the profile refers to must be among the expected columns.
    pub fn validate(&self) -> Result<()> {
        let known = |c: &str| self.expected_columns.iter().any(|e| e == c);
        let referenced = self
            .lines
            .iter()
            .flat_map(|l| {
                std::iter::once(l.column.as_str()).chain(l.when.iter().map(|w| w.column.as_str()))
            })
            .chain(std::iter::once(self.required_column.as_str()))
            .chain(self.project_column.as_deref())
            .chain(self.numeric_columns.iter().map(String::as_str));

        for column in referenced {
            if !known(column) {
                return Err(Error::Config(format!(
                    "profile '{}' refers to '{}' which is not an expected column",
                    self.name, column
                )));
            }
        }
        Ok(())
    }

    fn geral_preset() -> Self {
        const PROJECT: &str = "Nome da atividade de PD&I: ";
        const CONTINUOUS: &str = "A atividade é contínua (ciclo de vida maior que 1 ano)?  (Sim ou Não)";
        const POLICIES: &str =
            "Os projetos de PD&I da empresa se alinham com as políticas públicas nacionais? (Sim ou Não)";
        const START: &str = "Data de início: (formato dd/mm/aaaa)";
        const END: &str = "Previsão de término: (formato dd/mm/aaaa)";
        const BASE_YEAR: &str =
            "Caso a atividade/projeto seja continuada, informar Atividade de PD&I desenvolvida no ano-base";
        const ALIGNMENT: &str = "Alinhamento do Projeto com Políticas, Programas e Estratégias Governamentais";

        let expected = [
            PROJECT,
            "Descrição do Projeto:",
            "PB, PA ou DE:",
            "Área do Projeto:",
            "Palavras-Chave (Separadas por vírgula):",
            "Natureza (Produto, Processo ou Serviço):",
            "Destaque o elemento tecnologicamente novo ou inovador da atividade: ",
            "Qual a barreira ou desafio tecnológico superável: ",
            "Qual a metodologia / métodos utilizados: ",
            CONTINUOUS,
            START,
            END,
            BASE_YEAR,
            "Descrição Complementar: ",
            "Resultado Econômico:",
            "Resultado de Inovação:",
            "TRL Inicial",
            "TRL Final",
            "Justificativa TRL",
            "ODS",
            "Justificativa ODS",
            POLICIES,
            ALIGNMENT,
        ];

        let lines = vec![
            ProfileLine::new("Projeto", PROJECT),
            ProfileLine::new("Descrição do Projeto", "Descrição do Projeto:"),
            ProfileLine::new("PB, PA ou DE", "PB, PA ou DE:"),
            ProfileLine::new("Área do Projeto", "Área do Projeto:"),
            ProfileLine::new("Palavras-Chave", "Palavras-Chave (Separadas por vírgula):"),
            ProfileLine::new("Natureza", "Natureza (Produto, Processo ou Serviço):"),
            ProfileLine::new(
                "Elemento Novo",
                "Destaque o elemento tecnologicamente novo ou inovador da atividade: ",
            ),
            ProfileLine::new("Barreiras", "Qual a barreira ou desafio tecnológico superável: "),
            ProfileLine::new("Metodologia", "Qual a metodologia / métodos utilizados: "),
            ProfileLine::new("Atividade contínua?", CONTINUOUS),
            ProfileLine::new("Data de início", START).unless(CONTINUOUS, "Não"),
            ProfileLine::new("Previsão de término", END).unless(CONTINUOUS, "Não"),
            ProfileLine::new("Atividade de PD&I desenvolvida no ano-base", BASE_YEAR).unless(CONTINUOUS, "Não"),
            ProfileLine::new("Informações Complementares", "Descrição Complementar: "),
            ProfileLine::new("Resultado Econômico", "Resultado Econômico:"),
            ProfileLine::new("Resultado de Inovação", "Resultado de Inovação:"),
            ProfileLine::new("TRL Inicial", "TRL Inicial"),
            ProfileLine::new("TRL Final", "TRL Final"),
            ProfileLine::new("Justificativa TRL", "Justificativa TRL"),
            ProfileLine::new("ODS", "ODS"),
            ProfileLine::new("Justificativa ODS", "Justificativa ODS"),
            ProfileLine::new("Alinha-se às políticas públicas?", POLICIES),
            ProfileLine::new("Descrição alinhamento às Políticas Públicas", ALIGNMENT).unless(POLICIES, "Não"),
        ];

        Self {
            name: "geral".into(),
            sheet_name: "GERAL".into(),
            header: HeaderSpec::Row(9),
            expected_columns: expected.iter().map(|s| s.to_string()).collect(),
            project_column: Some(PROJECT.into()),
            record_title: "--- Projeto {n} ---".into(),
            required_column: PROJECT.into(),
            numeric_columns: Vec::new(),
            lines,
            empty_message: "Nenhum projeto encontrado para a seleção feita.".into(),
        }
    }

    fn rh_preset() -> Self {
        const ACTIVITY: &str = "Descreva as atividades realizadas pelo profissional (cargo, atividades exercidas e contribuições no projeto)";

        let expected = [
            PROJECT_COLUMN,
            "CPF",
            "NOME",
            "TITULAÇÃO",
            "FUNÇÃO",
            "SEXO",
            "Total Horas (Anual)",
            "DEDICAÇÃO",
            "Valor (R$)",
            ACTIVITY,
        ];

        let lines = vec![
            ProfileLine::new("Projeto", PROJECT_COLUMN),
            ProfileLine::new("CPF", "CPF"),
            ProfileLine::new("Nome", "NOME"),
            ProfileLine::new("Titulação", "TITULAÇÃO"),
            ProfileLine::new("Função", "FUNÇÃO"),
            ProfileLine::new("Sexo", "SEXO"),
            ProfileLine::new("Total Horas (Anual)", "Total Horas (Anual)"),
            ProfileLine::new("Dedicação", "DEDICAÇÃO"),
            ProfileLine::new("Valor", "Valor (R$)"),
            ProfileLine::new("Atividade", ACTIVITY),
        ];

        Self {
            name: "rh".into(),
            sheet_name: "RH".into(),
            header: HeaderSpec::Row(9),
            expected_columns: expected.iter().map(|s| s.to_string()).collect(),
            project_column: Some(PROJECT_COLUMN.into()),
            record_title: "Colaborador {n}".into(),
            required_column: "NOME".into(),
            numeric_columns: vec!["Total Horas (Anual)".into(), "Valor (R$)".into()],
            lines,
            empty_message: "Nenhum colaborador encontrado para a seleção feita.".into(),
        }
    }

    fn st_preset() -> Self {
        const SITUATION: &str = "Situação (Contratado, Em Execução, Terminado)";
        const RESEARCH_CENTER: &str =
            "Centro, departamento ou grupo de pesquisa da universidade/instituição de pesquisa contratada ";
        const EMBRAPII_CENTER: &str = "Centro, Departamento ou Grupo de Pesquisa (caso seja credenciada Embrapii)";
        const EMBRAPII_CODE: &str = "Código do projeto Embrapii (caso seja credenciada Embrapii)";

        let expected = [
            PROJECT_COLUMN,
            "TIPO",
            SITUATION,
            "Prestador de Serviço",
            "CNPJ/CPF",
            "Caracterizar o Serviço Realizado",
            "Valor Total",
            RESEARCH_CENTER,
            EMBRAPII_CENTER,
            EMBRAPII_CODE,
        ];

        let lines = vec![
            ProfileLine::new("Projeto", PROJECT_COLUMN),
            ProfileLine::new("Porte/Tipo de serviço", "TIPO"),
            ProfileLine::new("Situação", SITUATION),
            ProfileLine::new("Razão Social", "Prestador de Serviço"),
            ProfileLine::new("CNPJ/CPF", "CNPJ/CPF"),
            ProfileLine::new("Caracterização do Serviço Realizado", "Caracterizar o Serviço Realizado"),
            ProfileLine::new("Valor Total", "Valor Total"),
            ProfileLine::new(RESEARCH_CENTER.trim(), RESEARCH_CENTER),
            ProfileLine::new(EMBRAPII_CENTER, EMBRAPII_CENTER),
            ProfileLine::new(EMBRAPII_CODE, EMBRAPII_CODE),
        ];

        Self {
            name: "st".into(),
            sheet_name: "DISPÊNDIOS ST".into(),
            header: HeaderSpec::Row(9),
            expected_columns: expected.iter().map(|s| s.to_string()).collect(),
            project_column: Some(PROJECT_COLUMN.into()),
            record_title: "Dispêndio {n}".into(),
            required_column: "Prestador de Serviço".into(),
            numeric_columns: vec!["Valor Total".into()],
            lines,
            empty_message: "Nenhum dispêndio de Serviço de Terceiro e Viagens encontrado para a seleção feita."
                .into(),
        }
    }

    fn mc_preset() -> Self {
        let expected = [PROJECT_COLUMN, "Identificação do Material", "Descrição", "Valor Total"];

        let lines = vec![
            ProfileLine::new("Projeto", PROJECT_COLUMN),
            ProfileLine::new("Material", "Identificação do Material"),
            ProfileLine::new("Descrição", "Descrição"),
            ProfileLine::new("Valor Total", "Valor Total"),
        ];

        Self {
            name: "mc".into(),
            sheet_name: "DISPÊNDIOS MC".into(),
            header: HeaderSpec::Row(9),
            expected_columns: expected.iter().map(|s| s.to_string()).collect(),
            project_column: Some(PROJECT_COLUMN.into()),
            record_title: "Dispêndio MC {n}".into(),
            required_column: "Identificação do Material".into(),
            numeric_columns: vec!["Valor Total".into()],
            lines,
            empty_message: "Nenhum dispêndio de Material de Consumo encontrado para a seleção feita.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        for name in TextProfile::preset_names() {
            let profile = TextProfile::from_preset(name).unwrap();
            assert!(profile.validate().is_ok(), "preset {} invalid", name);
        }
    }

    #[test]
    fn test_preset_aliases() {
        assert_eq!(TextProfile::from_preset("RH").unwrap().sheet_name, "RH");
        assert_eq!(TextProfile::from_preset("services").unwrap().name, "st");
        assert!(TextProfile::from_preset("xyz").is_none());
        assert!(matches!(TextProfile::preset("xyz"), Err(Error::UnknownPreset(_))));
    }

    #[test]
    fn test_condition_case_insensitive() {
        let cond = Condition {
            column: "A".into(),
            not_equals: "Não".into(),
        };
        assert!(!cond.holds(" NÃO "));
        assert!(cond.holds("Sim"));
        assert!(cond.holds(""));
    }

    #[test]
    fn test_from_json_rejects_unknown_column() {
        let json = r#"{
            "name": "custom",
            "sheet_name": "Dados",
            "header": {"keyword": "NOME"},
            "expected_columns": ["NOME"],
            "record_title": "Item {n}",
            "required_column": "NOME",
            "lines": [{"label": "Cargo", "column": "CARGO"}],
            "empty_message": "vazio"
        }"#;
        assert!(matches!(TextProfile::from_json(json), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_json_custom_profile() {
        let json = r#"{
            "name": "custom",
            "sheet_name": "Dados",
            "header": {"keyword": "NOME"},
            "expected_columns": ["NOME", "CARGO"],
            "record_title": "Item {n}",
            "required_column": "NOME",
            "lines": [
                {"label": "Nome", "column": "NOME"},
                {"label": "Cargo", "column": "CARGO", "when": {"column": "NOME", "not_equals": "-"}}
            ],
            "empty_message": "vazio"
        }"#;
        let profile = TextProfile::from_json(json).unwrap();
        assert_eq!(profile.header, HeaderSpec::Keyword("NOME".into()));
        assert!(profile.project_column.is_none());
        assert_eq!(profile.lines[1].when.as_ref().unwrap().not_equals, "-");
    }
}
