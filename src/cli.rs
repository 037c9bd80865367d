use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docrecon")]
#[command(about = "Reconcile drifting spreadsheet headers and form captions, then report", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Fuzzy match threshold (0-100), overrides the config file
    #[arg(long, global = true, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub threshold: Option<u8>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile logical fields against raw labels or a sheet's headers
    Match {
        /// Logical fields, comma separated
        #[arg(short, long, value_delimiter = ',', required = true)]
        fields: Vec<String>,

        /// Raw labels, comma separated
        #[arg(short, long, value_delimiter = ',', conflicts_with = "workbook")]
        labels: Vec<String>,

        /// Read the raw labels from this workbook's header row
        #[arg(short, long)]
        workbook: Option<PathBuf>,

        #[command(flatten)]
        sheet: SheetArgs,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List sheets, or the headers of one sheet
    Inspect {
        #[arg(required = true)]
        workbook: PathBuf,

        #[command(flatten)]
        sheet: SheetArgs,
    },

    /// Render sheet records as text blocks
    Text {
        #[arg(required = true)]
        workbook: PathBuf,

        /// Built-in profile (geral/rh/st/mc)
        #[arg(short, long, default_value = "geral", conflicts_with = "profile_file")]
        profile: String,

        /// Custom profile (JSON)
        #[arg(long)]
        profile_file: Option<PathBuf>,

        /// Only records of this project
        #[arg(long, conflicts_with = "interactive")]
        project: Option<String>,

        /// Choose the project from a menu
        #[arg(short, long)]
        interactive: bool,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarize a valuation workbook into RH/ST (and LP from forms) sheets
    Aggregate {
        #[arg(required = true)]
        workbook: PathBuf,

        /// Presets to run (rh, st)
        #[arg(long, value_delimiter = ',', default_value = "rh,st")]
        presets: Vec<String>,

        /// Folder of research-line forms (.docx) for the LP sheet
        #[arg(long)]
        forms: Option<PathBuf>,

        /// Output workbook
        #[arg(short, long, default_value = "aggregated.xlsx")]
        output: PathBuf,

        /// Cross-check totals against the summary sheet
        #[arg(long)]
        check: bool,

        /// Summary sheet pattern (`*` suffix = prefix match)
        #[arg(long, default_value = "Resumo*")]
        summary_sheet: String,

        /// Skip the table cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Extract fields from a folder of form documents
    Forms {
        #[arg(required = true)]
        folder: PathBuf,

        /// Caption-reconciled fields, comma separated (default: research-line layout)
        #[arg(short, long, value_delimiter = ',', conflicts_with = "layout_file")]
        fields: Vec<String>,

        /// Custom layout (JSON)
        #[arg(long)]
        layout_file: Option<PathBuf>,

        /// Output file (.xlsx or .json)
        #[arg(short, long, default_value = "forms.xlsx")]
        output: PathBuf,
    },

    /// Fill a template sheet's columns with records
    Fill {
        /// Template workbook
        #[arg(short, long, required = true)]
        template: PathBuf,

        /// Template sheet
        #[arg(short, long, required = true)]
        sheet: String,

        /// 0-based template header row
        #[arg(long, default_value = "9")]
        header_row: usize,

        /// Records from a JSON array of objects
        #[arg(long, group = "source")]
        records: Option<PathBuf>,

        /// Records from a folder of research-line forms
        #[arg(long, group = "source")]
        forms: Option<PathBuf>,

        /// Records from an aggregate preset (rh/st) over this valuation workbook
        #[arg(long, group = "source", requires = "preset")]
        workbook: Option<PathBuf>,

        #[arg(long)]
        preset: Option<String>,

        /// Output workbook
        #[arg(short, long, default_value = "filled.xlsx")]
        output: PathBuf,
    },

    /// Table cache maintenance
    Cache {
        /// Delete the cache file
        #[arg(long)]
        clear: bool,

        /// Folder holding the cache (default: current)
        #[arg(short, long)]
        folder: Option<PathBuf>,

        /// Show cache information
        #[arg(long)]
        info: bool,
    },

    /// Show or edit settings
    Config {
        #[arg(long)]
        show: bool,

        /// Persist a new fuzzy threshold
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        set_threshold: Option<u8>,
    },
}

/// Which sheet to read and where its header is.
#[derive(clap::Args, Clone, Debug, Default)]
pub struct SheetArgs {
    /// Sheet name (`Prefix*` selects by prefix; default: first sheet)
    #[arg(long)]
    pub sheet_name: Option<String>,

    /// 0-based header row
    #[arg(long, conflicts_with = "keyword")]
    pub header_row: Option<usize>,

    /// Locate the header row by a cell equal to this keyword
    #[arg(long)]
    pub keyword: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_match_args() {
        let cli = Cli::parse_from([
            "docrecon", "--threshold", "70", "match", "--fields", "CPF,Nome", "--labels", " cpf ,NOME COMPLETO",
        ]);
        assert_eq!(cli.threshold, Some(70));
        match cli.command {
            Commands::Match { fields, labels, .. } => {
                assert_eq!(fields, vec!["CPF", "Nome"]);
                assert_eq!(labels, vec![" cpf ", "NOME COMPLETO"]);
            }
            _ => panic!("expected match"),
        }
    }

    #[test]
    fn test_threshold_range() {
        assert!(Cli::try_parse_from(["docrecon", "--threshold", "101", "config"]).is_err());
    }
}
