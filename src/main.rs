use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use lead_pipeline::app::qualify_use_case::QualifyUseCase;
use lead_pipeline::config::{LeadConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use lead_pipeline::infra::json_output_adapter::{JsonFileSink, MemorySink};
use lead_pipeline::infra::json_source_adapter::JsonFileSource;
use lead_pipeline::{logging, observability};

#[derive(Parser)]
#[command(name = "lead_pipeline")]
#[command(about = "Normalize, deduplicate, classify and score scraped leads")]
#[command(version = "0.1.0")]
struct Cli {
    /// Config file (defaults to $LEAD_PIPELINE_CONFIG, then ./config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for rolling JSON logs
    #[arg(long, global = true, default_value = "logs")]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write the output files
    Run {
        /// Input files (JSON array or JSON Lines), one batch per file
        #[arg(long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
        /// Override the minimum qualifying fit score
        #[arg(long)]
        min_score: Option<f64>,
        /// Override the number of qualified leads to stop at
        #[arg(long)]
        target: Option<usize>,
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,
        #[arg(long, default_value = "leads")]
        prefix: String,
        /// Normalize input files concurrently
        #[arg(long)]
        parallel: bool,
        /// Write Prometheus metrics to this file when done
        #[arg(long)]
        metrics_out: Option<PathBuf>,
    },
    /// Validate the configuration and exit
    CheckConfig,
    /// Score every lead and print the results without writing files
    Score {
        #[arg(long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
    },
}

/// Resolve the config file: flag, then environment, then ./config.toml if
/// present, else built-in defaults
fn load_config(explicit: Option<PathBuf>) -> anyhow::Result<LeadConfig> {
    let path = explicit.or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));
    match path {
        Some(path) => {
            info!("Loading config from {}", path.display());
            Ok(LeadConfig::load(&path)?)
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            info!("Loading config from {}", DEFAULT_CONFIG_PATH);
            Ok(LeadConfig::load(DEFAULT_CONFIG_PATH)?)
        }
        None => {
            warn!("No config file found, using built-in defaults");
            Ok(LeadConfig::default())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let _guard = logging::init_logging(&cli.log_dir);

    match cli.command {
        Commands::Run {
            input,
            min_score,
            target,
            output_dir,
            prefix,
            parallel,
            metrics_out,
        } => {
            let span = tracing::info_span!("run", inputs = input.len());
            let _enter = span.enter();

            if let Err(e) = observability::init() {
                warn!("Metrics disabled: {}", e);
            }

            let mut config = load_config(cli.config)?;
            if let Some(min_score) = min_score {
                config.pipeline.min_score = min_score;
            }
            if let Some(target) = target {
                config.pipeline.target_total_leads = target;
            }
            config.validate()?;

            let source = Arc::new(JsonFileSource::new(input));
            let sink = Arc::new(JsonFileSink::new(&output_dir, prefix));
            let use_case = QualifyUseCase::new(source, sink, config).with_parallel(parallel);

            let (report, summary) = match use_case.run().await {
                Ok(result) => result,
                Err(e) => {
                    error!("Pipeline failed: {}", e);
                    return Err(e);
                }
            };

            println!("\nRun {}", report.run_id);
            println!("   Input records:   {}", summary.summary.total_records);
            println!("   Unique leads:    {}", summary.summary.unique_leads);
            println!(
                "   Qualified:       {} ({} business, {} developer)",
                summary.summary.qualified_leads, summary.summary.business_leads, summary.summary.developer_leads
            );
            println!("   Below threshold: {}", report.stats.below_threshold);
            println!("   Rejected:        {}", summary.summary.rejected_records);
            println!("   Unevaluated:     {}", report.stats.unevaluated);
            println!("   Output:          {}", output_dir.display());

            if let Some(path) = metrics_out {
                match observability::render() {
                    Some(text) => {
                        tokio::fs::write(&path, text).await?;
                        info!("Metrics written to {}", path.display());
                    }
                    None => warn!("Metrics recorder not installed; nothing written"),
                }
            }
        }
        Commands::CheckConfig => {
            let config = load_config(cli.config)?;
            config.validate()?;
            println!(
                "Configuration OK: {} industries, {} automation indicators, min_score {}, target {}",
                config.scoring.industry_scores.len(),
                config.scoring.automation_indicators.len(),
                config.pipeline.min_score,
                config.pipeline.target_total_leads
            );
        }
        Commands::Score { input } => {
            let config = load_config(cli.config)?;
            let source = Arc::new(JsonFileSource::new(input));
            let use_case = QualifyUseCase::new(source, Arc::new(MemorySink::new()), config);
            let report = use_case.score_all().await?;

            let mut scored: Vec<_> = report.qualified.iter().chain(report.below_threshold.iter()).collect();
            scored.sort_by(|a, b| b.fit_score.total_cmp(&a.fit_score));
            for lead in scored {
                println!(
                    "{:>5.2}  {:<6}  {:<9}  {}  ({})",
                    lead.fit_score,
                    lead.priority.as_str(),
                    lead.category().as_str(),
                    lead.name(),
                    lead.classified.lead.website
                );
            }
            for rejected in &report.rejected {
                println!("  --   rejected  {}: {}", rejected.reason, rejected.detail);
            }
        }
    }
    Ok(())
}
