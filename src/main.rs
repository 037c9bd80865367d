use anyhow::{bail, Context, Result};
use clap::Parser;
use docrecon::aggregate::{AggregatePreset, LINE_FIELD};
use docrecon::cache::TableCache;
use docrecon::cli::{Cli, Commands, SheetArgs};
use docrecon::config::Config;
use docrecon::forms::{self, FormDocument, FormLayout, FormRecord};
use docrecon::report::{self, template, text, SheetOut, Template};
use docrecon::table::{self, CellValue, LoadOptions, SheetSelector};
use docrecon::{prompt, validate, Reconciler};
use docrecon_common::TextProfile;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load().context("failed to load config")?;
    let reconciler = config.reconciler(cli.threshold);

    match cli.command {
        Commands::Match { fields, labels, workbook, sheet, json } => {
            let labels = match workbook {
                Some(path) => {
                    let bytes = read_workbook(&path)?;
                    let sheet_name = resolve_sheet(&bytes, &sheet)?;
                    let table = table::load_table(&bytes, &sheet_name, &load_options(&sheet, &config))?;
                    table.headers().to_vec()
                }
                None => labels,
            };
            run_match(&reconciler, &labels, &fields, json)?;
        }

        Commands::Inspect { workbook, sheet } => {
            let bytes = read_workbook(&workbook)?;
            if sheet.sheet_name.is_none() && sheet.header_row.is_none() && sheet.keyword.is_none() {
                println!("Sheets in {}:", workbook.display());
                for name in table::sheet_names(&bytes)? {
                    println!("  {}", name);
                }
            } else {
                let sheet_name = resolve_sheet(&bytes, &sheet)?;
                let table = table::load_table(&bytes, &sheet_name, &load_options(&sheet, &config))?;
                println!("Headers of '{}' ({} data rows):", sheet_name, table.len());
                for (i, header) in table.headers().iter().enumerate() {
                    println!("  {:>3}: {}", i, header);
                }
            }
        }

        Commands::Text { workbook, profile, profile_file, project, interactive, output } => {
            let profile = match profile_file {
                Some(path) => TextProfile::from_file(&path)
                    .with_context(|| format!("failed to read profile {}", path.display()))?,
                None => TextProfile::preset(&profile)?,
            };
            run_text(&config, &reconciler, &workbook, &profile, project, interactive, output.as_deref())?;
        }

        Commands::Aggregate { workbook, presets, forms: forms_dir, output, check, summary_sheet, no_cache } => {
            let presets = presets
                .iter()
                .map(|p| AggregatePreset::parse(p).with_context(|| format!("unknown preset '{}'", p)))
                .collect::<Result<Vec<_>>>()?;
            let options = AggregateOptions {
                forms: forms_dir.as_deref(),
                output: &output,
                check,
                summary_sheet: &summary_sheet,
                use_cache: config.cache_enabled && !no_cache,
            };
            run_aggregate(&config, &reconciler, &workbook, &presets, &options)?;
        }

        Commands::Forms { folder, fields, layout_file, output } => {
            let layout = match layout_file {
                Some(path) => {
                    let json = std::fs::read_to_string(&path)
                        .with_context(|| format!("failed to read layout {}", path.display()))?;
                    Some(FormLayout::from_json(&json)?)
                }
                None if fields.is_empty() => Some(FormLayout::research_line()),
                None => None,
            };
            run_forms(&reconciler, &folder, layout.as_ref(), &fields, &output)?;
        }

        Commands::Fill { template: template_path, sheet, header_row, records, forms: forms_dir, workbook, preset, output } => {
            println!("📝 docrecon - template fill\n");

            println!("[1/3] Reading template...");
            let bytes = read_workbook(&template_path)?;
            let tpl = Template::read(&bytes, &sheet, header_row)?;
            println!("✔ {} columns in '{}'\n", tpl.headers.len(), tpl.sheet);

            println!("[2/3] Collecting records...");
            let records = if let Some(path) = records {
                let json = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read records {}", path.display()))?;
                template::records_from_json(&json)?
            } else if let Some(folder) = forms_dir {
                let form_records = extract_layout_folder(&reconciler, &folder, &FormLayout::research_line())?;
                template::records_from_forms(&form_records, Some("#"))
            } else if let Some(path) = workbook {
                let name = preset.unwrap_or_default();
                let preset = AggregatePreset::parse(&name).with_context(|| format!("unknown preset '{}'", name))?;
                let bytes = read_workbook(&path)?;
                let mut cache = TableCache::default();
                let sheet = aggregate_sheet(&config, &reconciler, &mut cache, &path, &bytes, preset)?;
                template::records_from_sheet(&sheet)
            } else {
                bail!("one of --records, --forms or --workbook is required");
            };
            println!("✔ {} records\n", records.len());

            println!("[3/3] Filling...");
            let filled = report::fill(&tpl, &records, &reconciler);
            report::write_workbook(&output, std::slice::from_ref(&filled.sheet))
                .with_context(|| format!("failed to write {}", output.display()))?;
            for key in filled.reconciliation.unresolved() {
                println!("  ⚠ no column for '{}'", key);
            }
            println!("✔ Saved: {}", output.display());
        }

        Commands::Cache { clear, folder, info } => {
            let target = folder.unwrap_or_else(|| PathBuf::from("."));
            let cache_path = TableCache::cache_path(&target);

            if info || !clear {
                if cache_path.exists() {
                    let cache = TableCache::load(&target);
                    println!("Cache:");
                    println!("  Path: {}", cache_path.display());
                    println!("  Tables: {}", cache.len());
                    if let Ok(meta) = std::fs::metadata(&cache_path) {
                        println!("  Size: {} bytes", meta.len());
                    }
                } else {
                    println!("No cache file: {}", cache_path.display());
                }
            }

            if clear {
                match TableCache::remove_file(&target) {
                    Ok(true) => println!("✔ Cache deleted: {}", cache_path.display()),
                    Ok(false) => println!("No cache file"),
                    Err(e) => println!("Failed to delete cache: {}", e),
                }
            }
        }

        Commands::Config { show, set_threshold } => {
            let mut config = config;

            if let Some(threshold) = set_threshold {
                config.set_threshold(threshold)?;
                println!("✔ Fuzzy threshold set to {}", threshold);
            }

            if show || set_threshold.is_none() {
                println!("Settings ({}):", Config::config_path()?.display());
                println!("  Fuzzy threshold: {}", config.fuzzy_threshold);
                println!("  Scorer: {}", config.scorer);
                println!("  Header keyword: {}", config.header_keyword);
                println!("  Header scan rows: {}", config.header_scan_rows);
                println!("  Total tolerance: {}", config.total_tolerance);
                println!("  Cache: {}", if config.cache_enabled { "on" } else { "off" });
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_workbook(path: &Path) -> Result<Vec<u8>> {
    table::read_bytes(path).with_context(|| format!("failed to read {}", path.display()))
}

fn resolve_sheet(bytes: &[u8], args: &SheetArgs) -> Result<String> {
    let names = table::sheet_names(bytes)?;
    match &args.sheet_name {
        Some(pattern) => Ok(SheetSelector::parse(pattern).resolve(&names)?),
        None => names.into_iter().next().context("workbook has no sheets"),
    }
}

fn load_options(args: &SheetArgs, config: &Config) -> LoadOptions {
    match (&args.keyword, args.header_row) {
        (Some(keyword), _) => LoadOptions::keyword(keyword.clone(), config.header_scan_rows),
        (None, Some(row)) => LoadOptions::row(row),
        (None, None) => LoadOptions::default(),
    }
}

fn run_match(reconciler: &Reconciler, labels: &[String], fields: &[String], json: bool) -> Result<()> {
    let result = reconciler.reconcile(labels, fields);

    if json {
        let mapping: HashMap<String, String> = result.mapping();
        let out = serde_json::json!({
            "mapping": mapping,
            "unresolved": result.unresolved(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Threshold {} ({})\n", reconciler.threshold, reconciler.scorer);
    for m in result.matches() {
        println!("✔ {} -> {}  [{} {}]", m.field, m.label, m.kind, m.score);
    }
    for field in result.unresolved() {
        println!("✘ {} (unresolved)", field);
    }
    println!("\n{} matched, {} unresolved", result.matches().len(), result.unresolved().len());
    Ok(())
}

fn run_text(
    config: &Config,
    reconciler: &Reconciler,
    workbook: &Path,
    profile: &TextProfile,
    project: Option<String>,
    interactive: bool,
    output: Option<&Path>,
) -> Result<()> {
    let bytes = read_workbook(workbook)?;
    let options = LoadOptions {
        header: profile.header.clone(),
        scan_rows: config.header_scan_rows,
    };
    let table = table::load_table(&bytes, &profile.sheet_name, &options)?;
    let bound = table.require(reconciler, &profile.expected_columns)?;

    let project = if interactive {
        prompt::pick_project(&text::projects(profile, &bound))?
    } else {
        project
    };

    let rendered = text::render_bound(profile, &bound, project.as_deref());
    match output {
        Some(path) => {
            std::fs::write(path, &rendered).with_context(|| format!("failed to write {}", path.display()))?;
            println!("✔ Saved: {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

struct AggregateOptions<'a> {
    forms: Option<&'a Path>,
    output: &'a Path,
    check: bool,
    summary_sheet: &'a str,
    use_cache: bool,
}

fn run_aggregate(
    config: &Config,
    reconciler: &Reconciler,
    workbook: &Path,
    presets: &[AggregatePreset],
    options: &AggregateOptions<'_>,
) -> Result<()> {
    println!("📊 docrecon - aggregate\n");
    let steps = presets.len() + 1 + usize::from(options.forms.is_some()) + usize::from(options.check);
    let mut step = 0;
    let mut next = || {
        step += 1;
        format!("[{}/{}]", step, steps)
    };

    let bytes = read_workbook(workbook)?;
    let cache_dir = workbook.parent().unwrap_or_else(|| Path::new("."));
    let mut cache = if options.use_cache {
        TableCache::load(cache_dir)
    } else {
        TableCache::default()
    };

    let mut sheets: Vec<SheetOut> = Vec::new();

    if let Some(folder) = options.forms {
        println!("{} Reading research-line forms...", next());
        let layout = FormLayout::research_line();
        let records = extract_layout_folder(reconciler, folder, &layout)?;
        let mut lp = SheetOut::new("LP", layout.columns.clone());
        for record in &records {
            lp.push(record.row().into_iter().map(text_cell).collect());
        }
        println!("✔ {} forms\n", records.len());
        sheets.push(lp);
    }

    for preset in presets {
        println!("{} Aggregating {}...", next(), preset);
        let sheet = aggregate_sheet(config, reconciler, &mut cache, workbook, &bytes, *preset)?;
        println!("✔ {} groups\n", sheet.rows.len());
        sheets.push(sheet);
    }

    if options.check {
        println!("{} Cross-checking totals...", next());
        check_totals(config, reconciler, &mut cache, workbook, &bytes, options.summary_sheet, &sheets)?;
        println!();
    }

    if options.use_cache {
        cache.save(cache_dir).context("failed to save table cache")?;
    }

    println!("{} Writing workbook...", next());
    report::write_workbook(options.output, &sheets)
        .with_context(|| format!("failed to write {}", options.output.display()))?;
    println!("✔ Saved: {}", options.output.display());
    Ok(())
}

fn aggregate_sheet(
    config: &Config,
    reconciler: &Reconciler,
    cache: &mut TableCache,
    workbook: &Path,
    bytes: &[u8],
    preset: AggregatePreset,
) -> Result<SheetOut> {
    let names = table::sheet_names(bytes)?;
    let sheet_name = SheetSelector::parse(preset.sheet_pattern()).resolve(&names)?;
    let options = LoadOptions::keyword(config.header_keyword.clone(), config.header_scan_rows);
    let table = cache.load_table(&workbook.display().to_string(), bytes, &sheet_name, &options)?;
    let plan = preset.plan(&table)?;
    Ok(plan.run(&table, reconciler)?)
}

/// Compare per-line totals of the RH/ST sheets with the summary sheet's
/// per-project totals rolled up through the timesheet's line -> project links.
fn check_totals(
    config: &Config,
    reconciler: &Reconciler,
    cache: &mut TableCache,
    workbook: &Path,
    bytes: &[u8],
    summary_pattern: &str,
    sheets: &[SheetOut],
) -> Result<()> {
    let names = table::sheet_names(bytes)?;
    let summary_name = SheetSelector::parse(summary_pattern).resolve(&names)?;
    let summary = validate::summary_totals(&table::load_grid(bytes, &summary_name)?, 2, &[4, 5]);

    let timesheet_name = SheetSelector::parse(AggregatePreset::Staff.sheet_pattern()).resolve(&names)?;
    let options = LoadOptions::keyword(config.header_keyword.clone(), config.header_scan_rows);
    let timesheet = cache.load_table(&workbook.display().to_string(), bytes, &timesheet_name, &options)?;
    let bound = timesheet.require(reconciler, &[LINE_FIELD, "PROJETO"])?;
    let lines = validate::group_members(&bound, LINE_FIELD, "PROJETO");

    // summary columns: RH amount, ST amount
    for (name, col) in [("RH", 0usize), ("ST", 1usize)] {
        let Some(sheet) = sheets.iter().find(|s| s.name == name) else {
            continue;
        };
        let calculated = validate::sheet_totals(sheet, "LP", "VALOR TOTAL");
        let per_project: HashMap<String, f64> = summary.iter().map(|(k, v)| (k.clone(), v[col])).collect();
        let expected = validate::roll_up(&lines, &per_project);

        for (line, check) in validate::cross_check(&calculated, &expected, config.total_tolerance) {
            println!("  {} {}: {}", name, line, check);
        }
    }
    Ok(())
}

fn run_forms(
    reconciler: &Reconciler,
    folder: &Path,
    layout: Option<&FormLayout>,
    fields: &[String],
    output: &Path,
) -> Result<()> {
    println!("📄 docrecon - forms\n");

    println!("[1/2] Extracting from {}...", folder.display());
    let records = match layout {
        Some(layout) => extract_layout_folder(reconciler, folder, layout)?,
        None => forms::extract_folder(folder, reconciler, fields)?,
    };
    println!("✔ {} forms\n", records.len());

    for record in records.iter().filter(|r| !r.unresolved.is_empty()) {
        println!("  ⚠ {}: not found {}", record.name, record.unresolved.join(", "));
    }

    println!("[2/2] Writing {}...", output.display());
    let is_json = output
        .extension()
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        let content = serde_json::to_string_pretty(&records)?;
        std::fs::write(output, content).with_context(|| format!("failed to write {}", output.display()))?;
    } else {
        let headers = records.first().map(|r| r.fields.clone()).unwrap_or_default();
        let mut sheet = SheetOut::new("Forms", std::iter::once("Document".to_string()).chain(headers).collect());
        for record in &records {
            let row = std::iter::once(record.name.clone()).chain(record.row()).map(text_cell).collect();
            sheet.push(row);
        }
        report::write_workbook(output, &[sheet]).with_context(|| format!("failed to write {}", output.display()))?;
    }
    println!("✔ Saved: {}", output.display());
    Ok(())
}

/// Apply a layout to every form of a folder, in parallel with a progress bar.
fn extract_layout_folder(reconciler: &Reconciler, folder: &Path, layout: &FormLayout) -> Result<Vec<FormRecord>> {
    let files = forms::scan_forms(folder)?;
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let records: Vec<FormRecord> = files
        .par_iter()
        .filter_map(|path| {
            let result = FormDocument::open(path).map(|doc| doc.apply(layout, reconciler));
            pb.inc(1);
            match result {
                Ok(record) => Some(record),
                Err(e) => {
                    pb.println(format!("  ⚠ skipping {}: {}", path.display(), e));
                    None
                }
            }
        })
        .collect();

    pb.finish_and_clear();
    Ok(records)
}

fn text_cell(value: String) -> CellValue {
    if value.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(value)
    }
}

