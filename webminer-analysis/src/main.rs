//! webminer: web hit-count term association analysis

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use webminer_analysis::backends::format_query;
use webminer_analysis::config::LoadedConfig;
use webminer_analysis::report::{write_reports, AnalysisReport, OutputFormat};
use webminer_analysis::{logging, AnalysisProcessor, LoggingProgress};
use webminer_common::config::{resolve_config_path, CONFIG_ENV_VAR};

#[derive(Parser, Debug)]
#[command(name = "webminer", version, about)]
struct Args {
    /// Configuration file (defaults to $WEBMINER_CONFIG, then the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory reports are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Report format, repeatable (overrides [output] formats)
    #[arg(short, long = "format", value_enum)]
    formats: Vec<OutputFormat>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Print the query plan without contacting any backend
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR)
        .context("Failed to locate configuration file")?;
    let loaded = LoadedConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    logging::init(&loaded.config.logging, args.log_level.as_deref())
        .context("Failed to initialize logging")?;

    info!(config = %config_path.display(), "Loaded configuration, starting webminer");

    let settings = loaded.settings().context("Invalid analysis settings")?;
    let backends = loaded.backends().context("Failed to configure search backends")?;

    let mut processor = AnalysisProcessor::new(settings, backends);
    if let Some(tag_source) = loaded.tag_source().context("Failed to configure tag source")? {
        processor = processor.with_tag_source(tag_source);
    }

    if args.dry_run {
        print_plan(&processor)?;
        return Ok(());
    }

    let cancel_token = CancellationToken::new();
    let ctrl_c_token = cancel_token.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, cancelling after the current query");
            ctrl_c_token.cancel();
        }
    });

    let progress = LoggingProgress::new(cancel_token);
    let outcome = match processor.run(&progress).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_cancelled() => {
            info!("Processing cancelled by user, no report written");
            return Ok(());
        }
        Err(e) => return Err(e).context("Analysis failed"),
    };

    let report = AnalysisReport::from_outcome(&outcome);
    let output = &loaded.config.output;
    let dir = args.output_dir.unwrap_or_else(|| loaded.base_dir.join(&output.directory));
    let formats = if args.formats.is_empty() {
        output.formats.clone()
    } else {
        args.formats
    };

    let written = write_reports(&report, &dir, &output.file_stem, &formats)
        .context("Failed to write reports")?;
    for path in written {
        println!("{}", path.display());
    }

    Ok(())
}

fn print_plan(processor: &AnalysisProcessor) -> Result<()> {
    let settings = processor.settings();
    let plan = processor.plan().context("Invalid analysis settings")?;
    let sites = settings.effective_sites();

    println!("Scoring function: {}", settings.scoring_function);
    println!("    {}", settings.scoring_function.formula());
    for group in &plan.groups {
        println!();
        println!("{} ({} queries)", group.kind, group.queries.len());
        for query in &group.queries {
            for site in &sites {
                println!(
                    "    {}",
                    format_query(&query.terms, &settings.search_options, site.domain.as_deref())
                );
            }
        }
    }
    println!();
    println!(
        "Total submissions: {}",
        processor.submission_count().context("Invalid analysis settings")?
    );
    Ok(())
}
