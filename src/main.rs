use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::Context;
use tracing::{info, warn};

use job_funnel::config::FunnelConfig;
use job_funnel::pipeline::processor::FunnelPipeline;
use job_funnel::pipeline::rules::Classifier;
use job_funnel::report;
use job_funnel::source::JsonlMailSource;

fn main() -> anyhow::Result<()> {
    // Initialize tracing (stderr, so the report on stdout stays clean)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = FunnelConfig::from_env().context("Failed to load configuration")?;

    if config.self_address.is_empty() {
        warn!("FUNNEL_SELF_ADDRESS not set, self-sent mail will be counted");
    }

    let rules = config
        .keyword_ruleset()
        .context("Failed to load keyword ruleset")?;

    info!(
        applications = %config.applications_path.display(),
        meetings = %config.meetings_path.display(),
        after = ?config.after,
        "Starting funnel run"
    );

    let source = JsonlMailSource::new(&config.applications_path, &config.meetings_path);
    let pipeline = FunnelPipeline::new(
        Classifier::new(rules),
        config.funnel_settings(),
        config.self_address.clone(),
    );

    let report = pipeline
        .run(&source, config.after)
        .context("Failed to build funnel report")?;

    let mut writer: Box<dyn Write> = match &config.output_path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create report file {}", path.display()))?,
        )),
        None => Box::new(std::io::stdout().lock()),
    };

    report::emit(&report, config.report_format, &mut writer).context("Failed to write report")?;

    if let Some(path) = &config.output_path {
        info!(path = %path.display(), "Report written");
    }

    Ok(())
}
