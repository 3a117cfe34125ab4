use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use rctkit::analyser::logic::{balance_flow, missing_flow, run_pipeline};
use rctkit::config::PipelineConfig;
use rctkit::error::RctError;
use rctkit::report::tables;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "rctkit",
    version,
    about = "Balance checks and treatment effect estimates for randomized trials"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full analysis and write every artifact to the output directory
    Analyze(SourceArgs),
    /// Print the covariate balance table only
    Balance(SourceArgs),
    /// Print missing-value counts for the analysed columns
    Missing(SourceArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct SourceArgs {
    /// Dataset URL (http/https) or local CSV path. Overrides the config file.
    #[arg(short, long)]
    pub source: Option<String>,

    /// Directory for tables, plot, summary and run log
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Path to a JSON run configuration
    #[arg(long, env = "RCTKIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Remote fetch timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Decimal places in printed tables
    #[arg(long)]
    pub precision: Option<usize>,

    /// Treatment indicator column (0/1)
    #[arg(long)]
    pub treatment: Option<String>,

    /// Outcome column (0/1)
    #[arg(long)]
    pub outcome: Option<String>,

    /// Comma-separated covariate columns
    #[arg(long, value_delimiter = ',')]
    pub covariates: Option<Vec<String>>,

    /// Comma-separated covariates to treat as categorical
    #[arg(long, value_delimiter = ',')]
    pub categorical: Option<Vec<String>>,
}

impl SourceArgs {
    /// Builds the run configuration: config file first, flags on top.
    pub fn to_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => {
                let source = self.source.clone().ok_or_else(|| {
                    anyhow::anyhow!("No data source given: pass --source or --config")
                })?;
                PipelineConfig::new(source)
            }
        };

        if let Some(source) = &self.source {
            config.source.clone_from(source);
        }
        if let Some(output) = &self.output {
            config.output_dir.clone_from(output);
        }
        if let Some(timeout) = self.timeout {
            config.fetch_timeout_secs = timeout;
        }
        if let Some(precision) = self.precision {
            config.display_precision = precision;
        }
        if let Some(treatment) = &self.treatment {
            config.variables.treatment.clone_from(treatment);
        }
        if let Some(outcome) = &self.outcome {
            config.variables.outcome.clone_from(outcome);
        }
        if let Some(covariates) = &self.covariates {
            config.variables.covariates.clone_from(covariates);
        }
        if let Some(categorical) = &self.categorical {
            config.variables.categorical.clone_from(categorical);
        }

        config.validate()?;
        Ok(config)
    }
}

pub fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Analyze(args) => handle_analyze(&args),
        Commands::Balance(args) => handle_balance(&args),
        Commands::Missing(args) => handle_missing(&args),
    }
}

fn handle_analyze(args: &SourceArgs) -> Result<()> {
    let config = args.to_config()?;
    init_run_logging(&config.output_dir)?;

    let outcome = run_pipeline(&config).context("Analysis failed")?;
    let precision = config.display_precision;
    let results = &outcome.results;

    println!("Rows loaded: {}\n", results.n_rows);
    println!("{}", tables::render_missing_text(&results.missing));
    println!("{}", tables::render_balance_text(&results.balance, precision));
    println!("{}", tables::render_models_text(&results.effects, precision));

    for path in &outcome.artifacts {
        println!("Wrote {}", path.display());
    }
    if !outcome.output_errors.is_empty() {
        eprintln!(
            "{} artifact(s) could not be written; estimates above are complete:",
            outcome.output_errors.len()
        );
        for e in &outcome.output_errors {
            eprintln!("  {e}");
        }
    }
    println!("Finished in {:.2}s", outcome.duration.as_secs_f64());
    Ok(())
}

/// Logs into the results directory when it is writable, otherwise to the
/// console only. An unusable results directory must not stop estimation.
fn init_run_logging(output_dir: &Path) -> Result<()> {
    if let Err(e) = rctkit::logging::init(Some(output_dir)) {
        let problem = RctError::Output(format!("{e:#}"));
        eprintln!("{problem}; logging to the console only");
        rctkit::logging::init(None)?;
    }
    Ok(())
}

fn handle_balance(args: &SourceArgs) -> Result<()> {
    let config = args.to_config()?;
    rctkit::logging::init(None)?;

    let rows = balance_flow(&config).context("Balance check failed")?;
    println!(
        "{}",
        tables::render_balance_text(&rows, config.display_precision)
    );
    Ok(())
}

fn handle_missing(args: &SourceArgs) -> Result<()> {
    let config = args.to_config()?;
    rctkit::logging::init(None)?;

    let missing = missing_flow(&config).context("Missing-value report failed")?;
    println!("{}", tables::render_missing_text(&missing));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_defaults() -> Result<()> {
        let cli = Cli::try_parse_from([
            "rctkit",
            "analyze",
            "--source",
            "trial.csv",
            "--covariates",
            "age,sex",
            "--categorical",
            "sex",
            "--precision",
            "2",
        ])?;
        let Commands::Analyze(args) = cli.command else {
            panic!("Expected analyze command");
        };
        let config = args.to_config()?;
        assert_eq!(config.source, "trial.csv");
        assert_eq!(config.variables.covariates, vec!["age", "sex"]);
        assert_eq!(config.variables.categorical, vec!["sex"]);
        assert_eq!(config.variables.treatment, "w");
        assert_eq!(config.display_precision, 2);
        Ok(())
    }

    #[test]
    fn test_source_required_without_config() {
        let args = SourceArgs::default();
        assert!(args.to_config().is_err());
    }

    #[test]
    fn test_analyze_survives_unwritable_output() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let blocker = dir.path().join("results");
        std::fs::write(&blocker, "not a directory")?;

        let args = SourceArgs {
            source: Some("testdata/trial.csv".to_owned()),
            output: Some(blocker.clone()),
            ..Default::default()
        };
        handle_analyze(&args)?;
        assert!(blocker.is_file());
        Ok(())
    }
}
