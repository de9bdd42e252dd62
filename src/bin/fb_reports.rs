use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use flybase_bulk_reports::app::{App, ExportSummary};
use flybase_bulk_reports::chado::PgChadoClient;
use flybase_bulk_reports::config::{ConfigLoader, ResolvedConfig};
use flybase_bulk_reports::domain::ReportFormat;
use flybase_bulk_reports::error::ReportError;
use flybase_bulk_reports::logging;
use flybase_bulk_reports::reports::{
    BestGeneSummary, ChemSynonyms, ClassicalAlleles, EnzymeGeneGroups, GeneSoAnnotations,
    InterproXrefs, Organisms, Paralogs, Report, TransgenicAlleles,
};

#[derive(Parser)]
#[command(name = "fb-reports")]
#[command(about = "Generate FlyBase bulk data reports from a chado database")]
#[command(version, author)]
struct Cli {
    /// JSON config file; unset values fall back to the environment.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// DEBUG-level logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(long, global = true, value_enum, default_value_t = ReportFormat::Tsv)]
    format: ReportFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Organisms with NCBI taxon ids and drosophilid flag")]
    Organisms,
    #[command(about = "D. melanogaster classical and insertion allele descriptions")]
    ClassicalAlleles,
    #[command(about = "Transgenic construct descriptions")]
    TransgenicAlleles,
    #[command(about = "Best available summary for each D. melanogaster gene")]
    BestGeneSummary(BestGeneSummaryArgs),
    #[command(about = "DIOPT paralogs among D. melanogaster genes")]
    Paralogs,
    #[command(about = "Sequence Ontology annotations of localized genes")]
    GeneSoAnnotations,
    #[command(about = "Gene InterPro signatures")]
    InterproXrefs,
    #[command(about = "Author synonyms of chemicals")]
    ChemSynonyms,
    #[command(about = "Enzyme gene groups with GO molecular function and EC data")]
    EnzymeGeneGroups,
}

#[derive(Args)]
struct BestGeneSummaryArgs {
    /// Alliance gene description file, relative to the input directory.
    #[arg(short, long)]
    input_filename: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<ReportError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ReportError) -> u8 {
    match error {
        ReportError::ConfigRead(_)
        | ReportError::ConfigParse(_)
        | ReportError::MissingSetting(_)
        | ReportError::InvalidSetting { .. } => 2,
        ReportError::Connect { .. } | ReportError::Query(_) => 3,
        _ => 1,
    }
}

fn select_report(command: &Commands, config: &ResolvedConfig) -> Box<dyn Report> {
    match command {
        Commands::Organisms => Box::new(Organisms),
        Commands::ClassicalAlleles => Box::new(ClassicalAlleles),
        Commands::TransgenicAlleles => Box::new(TransgenicAlleles),
        Commands::BestGeneSummary(args) => Box::new(BestGeneSummary::from_config(
            config,
            args.input_filename.as_deref(),
        )),
        Commands::Paralogs => Box::new(Paralogs),
        Commands::GeneSoAnnotations => Box::new(GeneSoAnnotations),
        Commands::InterproXrefs => Box::new(InterproXrefs),
        Commands::ChemSynonyms => Box::new(ChemSynonyms),
        Commands::EnzymeGeneGroups => Box::new(EnzymeGeneGroups),
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    let config = match ConfigLoader::resolve(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            if logging::init(&logging::fallback_log_path(), cli.verbose).is_ok() {
                error!(error = %err, "could not resolve configuration");
            }
            return Err(err.into());
        }
    };
    let report = select_report(&cli.command, &config);
    logging::init(&config.log_path(report.label()), cli.verbose)?;
    info!(
        report = report.label(),
        server = %config.connection.server,
        database = %config.database(),
        "started"
    );

    match export(config, report.as_ref(), cli.format) {
        Ok(summary) => {
            info!(
                report = summary.report,
                records = summary.records,
                path = %summary.path,
                "finished"
            );
            Ok(())
        }
        Err(err) => {
            error!(report = report.label(), error = %err, "report failed");
            Err(err.into())
        }
    }
}

fn export(
    config: ResolvedConfig,
    report: &dyn Report,
    format: ReportFormat,
) -> Result<ExportSummary, ReportError> {
    let chado = PgChadoClient::connect(&config.connection)?;
    let mut app = App::new(chado, config);
    let outcome = app.run(report, format);
    let closed = app.into_client().close();
    let summary = outcome?;
    closed?;
    Ok(summary)
}
