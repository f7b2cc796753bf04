//! Loadgrid CLI - workload matrix rendering for team planning

// Global invariants enforced:
// - CLI flags take precedence over config file values
// - Identical input and flags yield byte-for-byte identical output

use anyhow::Context;
use clap::{Parser, Subcommand};
use loadgrid_core::calendar::{self, CalendarKey};
use loadgrid_core::color::{ColorMappingEntry, ColorRamp};
use loadgrid_core::config::{self, ResolvedConfig};
use loadgrid_core::import;
use loadgrid_core::view::{Filters, SortDirection, SortKey, SortState, ViewState};
use loadgrid_core::{html, report, Identity, LoadRecord, Session};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "loadgrid")]
#[command(about = "Render monthly workload records as a filtered, sorted heatmap matrix")]
#[command(version = env!("LOADGRID_VERSION"))]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a workload matrix from records (JSON) or a plan export (CSV)
    Render {
        /// Path to a JSON array of load records, or a `.csv` plan
        input: PathBuf,

        /// Color mapping file: JSON list of {"id_map", "color_hex"} (overrides config file)
        #[arg(long)]
        colors: Option<PathBuf>,

        /// First displayed month, YYYYMM or "YYYY MM"
        #[arg(long)]
        from: Option<CalendarKey>,

        /// Last displayed month, YYYYMM or "YYYY MM"
        #[arg(long)]
        to: Option<CalendarKey>,

        /// Keep rows whose name contains this text
        #[arg(long)]
        name: Option<String>,

        /// Keep rows whose subject contains this text
        #[arg(long)]
        subject: Option<String>,

        /// Keep rows whose team contains this text
        #[arg(long)]
        team: Option<String>,

        /// Keep rows whose subject type contains this text
        #[arg(long = "type")]
        subject_type: Option<String>,

        /// Sort column: team, name, firstname, subject or type
        #[arg(long)]
        sort: Option<SortKey>,

        /// Sort descending
        #[arg(long)]
        descending: bool,

        /// Only show these person ids (repeatable)
        #[arg(long = "person")]
        persons: Vec<i64>,

        /// Group rows by person and subject ids instead of names
        #[arg(long)]
        by_id: bool,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Output file path (default: stdout; HTML defaults to loadgrid-report.html)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List month keys between two months, or the selectable months around today
    Months {
        #[arg(long, requires = "to")]
        from: Option<CalendarKey>,

        #[arg(long, requires = "from")]
        to: Option<CalendarKey>,
    },
    /// Validate or show configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without rendering
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, PartialEq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Html,
}

/// Render options collected from flags
struct RenderArgs {
    input: PathBuf,
    colors: Option<PathBuf>,
    from: Option<CalendarKey>,
    to: Option<CalendarKey>,
    filters: Filters,
    sort: Option<SortKey>,
    descending: bool,
    persons: Vec<i64>,
    by_id: bool,
    format: OutputFormat,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Render {
            input,
            colors,
            from,
            to,
            name,
            subject,
            team,
            subject_type,
            sort,
            descending,
            persons,
            by_id,
            format,
            output,
            config,
        } => handle_render(RenderArgs {
            input,
            colors,
            from,
            to,
            filters: Filters {
                name,
                subject,
                team,
                subject_type,
            },
            sort,
            descending,
            persons,
            by_id,
            format,
            output,
            config,
        })?,
        Commands::Months { from, to } => {
            let months = match (from, to) {
                // An inverted range lists nothing
                (Some(from), Some(to)) => calendar::range(from, to),
                _ => calendar::selectable_months(chrono::Local::now().date_naive())?,
            };
            for month in months {
                println!("{}", month);
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref());

                match resolved {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref())
                    .context("failed to load configuration")?;
                print_config(&resolved);
            }
        },
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_render(args: RenderArgs) -> anyhow::Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input does not exist: {}", args.input.display());
    }

    let project_root = std::env::current_dir()?;
    let resolved = config::load_and_resolve(&project_root, args.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(config_path) = &resolved.config_path {
        eprintln!("Using config: {}", config_path.display());
    }

    // CLI flags override config file values
    let (default_start, default_end) = match resolved.range {
        Some(range) => range,
        None => calendar::default_display_range(
            chrono::Local::now().date_naive(),
            resolved.horizon_months,
        )?,
    };
    let start = args.from.unwrap_or(default_start);
    let end = args.to.unwrap_or(default_end);

    let direction = if args.descending {
        SortDirection::Descending
    } else if args.sort.is_some() {
        SortDirection::Ascending
    } else {
        resolved.sort.direction
    };
    let sort = SortState {
        key: args.sort.unwrap_or(resolved.sort.key),
        direction,
    };

    let identity = if args.by_id {
        Identity::Id
    } else {
        resolved.identity
    };

    let ramp = match &args.colors {
        Some(path) => load_color_mapping(path)?.with_saturation_cap(resolved.ramp.saturation_cap()),
        None => resolved.ramp.clone(),
    };

    let records = load_records(&args.input)?;

    let mut state = ViewState::new(start, end);
    state.filters = args.filters.or(&resolved.filters);
    state.sort = sort;
    let mut session = Session::new(state).with_identity(identity);
    if !args.persons.is_empty() {
        session = session.with_scope(args.persons.iter().copied());
    }
    let view = session.refresh(&records);
    tracing::info!(
        rows = view.rows.len(),
        start = %start,
        end = %end,
        "matrix rendered"
    );

    match args.format {
        OutputFormat::Text => {
            write_or_print(args.output.as_deref(), &report::render_text(&view, Some(&ramp)))?
        }
        OutputFormat::Json => {
            write_or_print(args.output.as_deref(), &format!("{}\n", report::render_json(&view)))?
        }
        OutputFormat::Html => {
            let page = html::render_html_matrix(&view, &ramp).context("failed to color matrix")?;
            let output_path = args
                .output
                .unwrap_or_else(|| PathBuf::from("loadgrid-report.html"));
            write_report(&output_path, &page)?;
            eprintln!("HTML report written to: {}", output_path.display());
        }
    }

    Ok(())
}

/// Read records from a JSON array, or import them from a `.csv` plan
fn load_records(path: &Path) -> anyhow::Result<Vec<LoadRecord>> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        let plan = import::load_plan_file(path)?;
        for skipped in &plan.skipped {
            eprintln!(
                "Warning: skipped line {} ({} {} / {}): {}",
                skipped.line, skipped.name, skipped.firstname, skipped.subject, skipped.reason
            );
        }
        return Ok(plan.to_records(None));
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read records: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse records: {}", path.display()))
}

fn load_color_mapping(path: &Path) -> anyhow::Result<ColorRamp> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read color mapping: {}", path.display()))?;
    let entries: Vec<ColorMappingEntry> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse color mapping: {}", path.display()))?;
    ColorRamp::from_mapping(&entries)
        .with_context(|| format!("invalid color mapping: {}", path.display()))
}

fn write_or_print(output: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            write_report(path, content)?;
            eprintln!("Report written to: {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn write_report(path: &Path, content: &str) -> anyhow::Result<()> {
    use std::fs;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    // Atomic write (temp + rename pattern)
    let temp_path = temp_path_for(path);
    fs::write(&temp_path, content)
        .with_context(|| format!("Failed to write temporary file: {}", temp_path.display()))?;
    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temporary file to: {}", path.display()))?;

    Ok(())
}

/// Sibling temp file keeping the original extension (`report.html.tmp`)
fn temp_path_for(path: &Path) -> PathBuf {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => path.with_extension(format!("{}.tmp", ext)),
        None => path.with_extension("tmp"),
    }
}

fn print_config(resolved: &ResolvedConfig) {
    println!("Configuration:");
    if let Some(ref p) = resolved.config_path {
        println!("  Source: {}", p.display());
    } else {
        println!("  Source: defaults (no config file found)");
    }
    println!();
    println!("Colors:");
    for bp in resolved.ramp.breakpoints() {
        println!("  {:>4}: {}", bp.load, bp.color);
    }
    println!(
        "  saturation_cap: {}",
        resolved
            .ramp
            .saturation_cap()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    println!();
    println!("Range:");
    match resolved.range {
        Some((start, end)) => println!("  {} to {}", start, end),
        None => println!(
            "  current month + {} months",
            resolved.horizon_months
        ),
    }
    println!();
    println!("View:");
    println!(
        "  sort: {} {}",
        resolved.sort.key.as_str(),
        match resolved.sort.direction {
            SortDirection::Ascending => "ascending",
            SortDirection::Descending => "descending",
        }
    );
    println!(
        "  identity: {}",
        match resolved.identity {
            Identity::Name => "name",
            Identity::Id => "id",
        }
    );
    let filters = &resolved.filters;
    for (label, value) in [
        ("name", &filters.name),
        ("subject", &filters.subject),
        ("team", &filters.team),
        ("type", &filters.subject_type),
    ] {
        println!("  filter {}: {}", label, value.as_deref().unwrap_or("none"));
    }
}
