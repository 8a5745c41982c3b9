use clap::{Args, Parser, Subcommand, ValueEnum};
use rhna_ledger::config::{AnalysisConfig, AppConfig};
use rhna_ledger::error::AppError;
use rhna_ledger::telemetry;
use rhna_ledger::workflows::rhna::inventory::mark_inventory_sites;
use rhna_ledger::workflows::rhna::permits::{pipeline_permits, rhna_permits};
use rhna_ledger::workflows::rhna::report::{
    write_linked_sites_csv, write_permits_csv, write_summary_csv, write_summary_json,
    write_tax_linked_csv,
};
use rhna_ledger::workflows::rhna::{
    link_sites_to_parcels, link_tax_roll, ColumnPrefix, CycleWindow, LinkageOptions,
    PermitSummaryTable, RhnaCycle,
};
use rhna_ledger::workflows::sources::{
    load_inventory, load_sites, load_tax_roll, CsvSources, SourceCache,
};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "rhna-ledger",
    about = "Reconcile parcel and building-permit records against RHNA housing-element cycles",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize every permit touching a cycle window, per block-lot
    Pipeline(PipelineArgs),
    /// List or summarize the permits that count toward RHNA unit totals
    Permits(PermitArgs),
    /// Attach parcel geometry to a candidate-site (bluesky) table
    Sites(SiteArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// RHNA cycle number (3, 4 or 5)
    #[arg(long, default_value_t = 3)]
    cycle: u8,
    /// Column naming for the summary (pipeline or permit)
    #[arg(long)]
    prefix: Option<ColumnPrefix>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct PermitArgs {
    /// RHNA cycle number (3, 4 or 5)
    #[arg(long, default_value_t = 4)]
    cycle: u8,
    /// Keep every permit in the window instead of only unit-producing residential work
    #[arg(long)]
    all: bool,
    /// Emit the per block-lot summary instead of the permit list
    #[arg(long)]
    summary: bool,
    /// Column naming for the summary (pipeline or permit)
    #[arg(long)]
    prefix: Option<ColumnPrefix>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct SiteArgs {
    /// Candidate-site CSV keyed by MapBlkLot_Master
    #[arg(long)]
    bluesky: PathBuf,
    /// RHNA cycle number (3, 4 or 5)
    #[arg(long, default_value_t = 4)]
    cycle: u8,
    /// Regional site-inventory CSV used to flag listed sites
    #[arg(long)]
    inventory: Option<PathBuf>,
    /// Jurisdiction to select from the site inventory
    #[arg(long)]
    jurisdiction: Option<String>,
    /// Tax-roll CSV to join by identifier with a spatial fallback
    #[arg(long)]
    tax_roll: Option<PathBuf>,
    /// Skip recording backup parcels for ambiguous identifiers
    #[arg(long)]
    no_backups: bool,
}

fn main() {
    if let Err(err) = run_cli() {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    info!(?config.environment, "rhna ledger starting");

    let mut cache = SourceCache::new(CsvSources::from_config(&config.sources));
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Pipeline(args) => run_pipeline(args, &config.analysis, &mut cache, &mut out)?,
        Command::Permits(args) => run_permits(args, &config.analysis, &mut cache, &mut out)?,
        Command::Sites(args) => run_sites(args, &config.analysis, &mut cache, &mut out)?,
    }

    out.flush()?;
    Ok(())
}

fn run_pipeline<W: Write>(
    args: PipelineArgs,
    analysis: &AnalysisConfig,
    cache: &mut SourceCache<CsvSources>,
    out: W,
) -> Result<(), AppError> {
    let window = CycleWindow::for_cycle_number(args.cycle, RhnaCycle::Cycle3);
    let permits = pipeline_permits(cache.permits()?, &window);
    let table = PermitSummaryTable::build(&permits, args.prefix.unwrap_or(analysis.column_prefix));
    write_table(&table, args.format, out)
}

fn run_permits<W: Write>(
    args: PermitArgs,
    analysis: &AnalysisConfig,
    cache: &mut SourceCache<CsvSources>,
    out: W,
) -> Result<(), AppError> {
    let window = CycleWindow::for_cycle_number(args.cycle, RhnaCycle::Cycle4);
    let permits = rhna_permits(cache.permits()?, &window, !args.all);

    if args.summary {
        let table =
            PermitSummaryTable::build(&permits, args.prefix.unwrap_or(analysis.column_prefix));
        write_table(&table, args.format, out)
    } else {
        if args.format == OutputFormat::Json {
            warn!("permit listing is only available as CSV");
        }
        write_permits_csv(&permits, out)?;
        Ok(())
    }
}

fn run_sites<W: Write>(
    args: SiteArgs,
    analysis: &AnalysisConfig,
    cache: &mut SourceCache<CsvSources>,
    out: W,
) -> Result<(), AppError> {
    let sites = load_sites(&args.bluesky)?;
    let options = if args.no_backups {
        LinkageOptions {
            record_backups: false,
        }
    } else {
        analysis.linkage_options()
    };

    let parcels = cache.parcels()?;
    let mut linked = link_sites_to_parcels(parcels, &sites, args.cycle, options);

    if let Some(path) = &args.inventory {
        let inventory = load_inventory(path)?;
        let jurisdiction = args
            .jurisdiction
            .as_deref()
            .unwrap_or(&analysis.jurisdiction);
        mark_inventory_sites(&mut linked, &inventory, args.cycle, jurisdiction);
    }

    match &args.tax_roll {
        Some(path) => {
            let tax_roll = load_tax_roll(path)?;
            let rows = link_tax_roll(&linked, &tax_roll, parcels)?;
            write_tax_linked_csv(&rows, out)?;
        }
        None => write_linked_sites_csv(&linked, out)?,
    }
    Ok(())
}

fn write_table<W: Write>(
    table: &PermitSummaryTable,
    format: OutputFormat,
    out: W,
) -> Result<(), AppError> {
    match format {
        OutputFormat::Csv => write_summary_csv(table, out)?,
        OutputFormat::Json => write_summary_json(table, out)?,
    }
    Ok(())
}
