use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use cnpj_enricher::app::{App, ThreadPacer, prepare_store};
use cnpj_enricher::cnpj_ws::CnpjWsHttpClient;
use cnpj_enricher::config::{ConfigLoader, ConfigOverrides, ResolvedConfig};
use cnpj_enricher::domain::Cnpj;
use cnpj_enricher::error::EnrichError;
use cnpj_enricher::input::load_identifiers;
use cnpj_enricher::output::{ConsoleOutput, JsonOutput, OutputMode};
use cnpj_enricher::store::Store;

#[derive(Parser)]
#[command(name = "cnpj-enrich")]
#[command(about = "Enrich a spreadsheet of CNPJ numbers from the public registry into SQLite")]
#[command(version, author)]
struct Cli {
    /// Path to a JSON config file (default: ./cnpj-enrich.json when present)
    #[arg(long, global = true)]
    config: Option<String>,

    /// SQLite database file
    #[arg(long, global = true)]
    database: Option<String>,

    /// Print machine-readable JSON instead of progress lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Look up every CNPJ in the input and store the results (default)")]
    Run(RunArgs),
    #[command(about = "Show the stored record for one CNPJ")]
    Show(ShowArgs),
    #[command(about = "List every stored record")]
    List,
    #[command(about = "Create the database table if it does not exist")]
    InitDb,
}

#[derive(Args, Clone, Default)]
struct RunArgs {
    /// Input spreadsheet (xlsx, xls, xlsb, ods or csv)
    #[arg(long)]
    input: Option<String>,

    /// Header of the column holding the identifiers
    #[arg(long)]
    column: Option<String>,

    /// Worksheet name (default: first sheet)
    #[arg(long)]
    sheet: Option<String>,

    #[arg(long)]
    error_log: Option<String>,

    /// URL template; {cnpj} is replaced by the identifier
    #[arg(long)]
    api_url: Option<String>,

    /// Lookups per pacing window
    #[arg(long)]
    batch_size: Option<usize>,

    /// Seconds to pause after each batch
    #[arg(long)]
    pause_secs: Option<u64>,
}

#[derive(Args)]
struct ShowArgs {
    cnpj: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<EnrichError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &EnrichError) -> u8 {
    match error {
        EnrichError::InputRead { .. }
        | EnrichError::MissingColumn { .. }
        | EnrichError::ConfigRead(_)
        | EnrichError::ConfigParse(_)
        | EnrichError::InvalidConfig(_)
        | EnrichError::RecordNotFound(_) => 2,
        EnrichError::Persistence(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };
    let command = cli
        .command
        .unwrap_or_else(|| Commands::Run(RunArgs::default()));

    let run_args = match &command {
        Commands::Run(args) => args.clone(),
        _ => RunArgs::default(),
    };
    let overrides = ConfigOverrides {
        api_url: run_args.api_url,
        database: cli.database,
        input: run_args.input,
        column: run_args.column,
        sheet: run_args.sheet,
        error_log: run_args.error_log,
        batch_size: run_args.batch_size,
        pause_secs: run_args.pause_secs,
    };
    let config = ConfigLoader::resolve(cli.config.as_deref(), overrides)?;

    match command {
        Commands::Run(_) => run_enrich(&config, output_mode),
        Commands::Show(args) => run_show(&config, &args, output_mode),
        Commands::List => run_list(&config, output_mode),
        Commands::InitDb => {
            prepare_store(&Store::new(config.database.clone()))?;
            if matches!(output_mode, OutputMode::Human) {
                println!("table cnpj_info ready in {}", config.database);
            }
            Ok(())
        }
    }
}

fn run_enrich(config: &ResolvedConfig, output_mode: OutputMode) -> miette::Result<()> {
    let lookup = CnpjWsHttpClient::new(&config.api_url, config.request_timeout)?;
    let app = App::new(config, lookup, ThreadPacer);
    prepare_store(app.store())?;

    let identifiers = load_identifiers(&config.input, &config.column, config.sheet.as_deref())?;
    tracing::info!(count = identifiers.len(), input = %config.input, "loaded identifiers");

    match output_mode {
        OutputMode::Json => {
            let summary = app.run(&identifiers, &JsonOutput);
            JsonOutput::print_summary(&summary).into_diagnostic()?;
        }
        OutputMode::Human => {
            let summary = app.run(&identifiers, &ConsoleOutput);
            ConsoleOutput::print_summary(&summary);
            println!("{} records in {}", app.store().count()?, config.database);
            if summary.failed > 0 {
                println!("failures recorded in {}", config.error_log);
            }
        }
    }
    Ok(())
}

fn run_show(config: &ResolvedConfig, args: &ShowArgs, output_mode: OutputMode) -> miette::Result<()> {
    let store = Store::new(config.database.clone());
    let cnpj = Cnpj::normalized(&args.cnpj);
    if !store.exists() {
        return Err(EnrichError::RecordNotFound(cnpj.to_string()).into());
    }
    prepare_store(&store)?;
    let record = store
        .get(&cnpj)?
        .ok_or_else(|| EnrichError::RecordNotFound(cnpj.to_string()))?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_record(&record).into_diagnostic()?,
        OutputMode::Human => ConsoleOutput::print_record(&record),
    }
    Ok(())
}

fn run_list(config: &ResolvedConfig, output_mode: OutputMode) -> miette::Result<()> {
    let store = Store::new(config.database.clone());
    let records = if store.exists() {
        prepare_store(&store)?;
        store.list()?
    } else {
        Vec::new()
    };

    match output_mode {
        OutputMode::Json => JsonOutput::print_records(&records).into_diagnostic()?,
        OutputMode::Human => ConsoleOutput::print_records(&records),
    }
    Ok(())
}
