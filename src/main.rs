use clap::Parser;
use std::path::PathBuf;
use tracing::{info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use swmp_metab::config::ProcessingOptions;
use swmp_metab::decompose::{decompose, MonthlySeries};
use swmp_metab::io::{read_series, read_table, write_json};
use swmp_metab::metabolism::ecometab;
use swmp_metab::organize::organize;
use swmp_metab::solar::NoaaSunCalculator;
use swmp_metab::table::ObservationTable;

#[derive(Parser)]
#[command(name = "swmp-metab")]
#[command(about = "Organize SWMP station data and estimate ecosystem metabolism", long_about = None)]
struct Cli {
    /// Processing mode: 'organize' (filter, regrid and combine tables), 'metabolism' (organize, then daily metabolism), 'decompose' (monthly decomposition)
    #[arg(long)]
    mode: String,

    /// Input JSON files; observation tables, or one monthly series for 'decompose'
    #[arg(long, required = true, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Output JSON file
    #[arg(long)]
    output: PathBuf,

    /// Parameter to aggregate to monthly means when decomposing an observation table
    #[arg(long)]
    parameter: Option<String>,

    /// Report events separately instead of folding them into the seasonal component
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    events: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,swmp_metab=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    dotenvy::dotenv().ok();

    let options = ProcessingOptions::from_env()?;
    info!("Processing options: {:?}", options);

    match cli.mode.as_str() {
        "organize" => {
            let organized = organize(&load_tables(&cli.input)?, &options)?;
            write_json(&cli.output, &organized)?;
        }
        "metabolism" => {
            let organized = organize(&load_tables(&cli.input)?, &options)?;
            let metabolism = ecometab(&organized, &options, &NoaaSunCalculator::new())?;
            write_json(&cli.output, &metabolism)?;
        }
        "decompose" => {
            let input = cli.input.first().ok_or("--input is required for decompose mode")?;
            let series = match &cli.parameter {
                Some(parameter) => MonthlySeries::monthly_means(&read_table(input)?, parameter)?,
                None => read_series(input)?,
            };
            let components = decompose(
                &series,
                options.decomposition_type,
                options.centering,
                cli.events,
            )?;
            write_json(&cli.output, &components)?;
        }
        other => {
            return Err(format!(
                "Unknown mode '{other}': expected organize, metabolism or decompose"
            )
            .into())
        }
    }

    info!("Wrote {}", cli.output.display());
    Ok(())
}

#[instrument(skip(paths), fields(files = paths.len()))]
fn load_tables(paths: &[PathBuf]) -> Result<Vec<ObservationTable>, Box<dyn std::error::Error>> {
    let mut tables = Vec::with_capacity(paths.len());
    for path in paths {
        let table = read_table(path)?;
        info!(
            "Loaded {} rows for {} from {}",
            table.len(),
            table.station().code,
            path.display()
        );
        tables.push(table);
    }
    Ok(tables)
}
