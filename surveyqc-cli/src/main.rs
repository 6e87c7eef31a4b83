//! SurveyQC CLI: static analysis of survey definitions.
//!
//! Commands:
//! - `analyze`: path statistics plus a bot-mixture ROC sweep, written as a JSON report
//! - `paths`: list every traversal path and its length/entropy bounds

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use surveyqc_core::survey::{survey_from_json, Survey};
use surveyqc_core::{Classifier, PathEnumerator, RngHierarchy};
use surveyqc_runner::{run_static_analysis, AnalysisConfig, Report};

#[derive(Parser)]
#[command(
    name = "surveyqc",
    about = "SurveyQC CLI: path analysis and response quality control for branching surveys"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ClassifierArg {
    LogLikelihood,
    Entropy,
}

impl From<ClassifierArg> for Classifier {
    fn from(arg: ClassifierArg) -> Self {
        match arg {
            ClassifierArg::LogLikelihood => Classifier::LogLikelihood,
            ClassifierArg::Entropy => Classifier::Entropy,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the static analysis and write a JSON report.
    Analyze {
        /// Survey definition (JSON).
        #[arg(long)]
        survey: PathBuf,

        /// Analysis config (TOML). Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the configured classifier.
        #[arg(long, value_enum)]
        classifier: Option<ClassifierArg>,

        /// Override the batch size per mixture ratio.
        #[arg(long)]
        sample_size: Option<usize>,

        /// Override the step between bot ratios.
        #[arg(long)]
        granularity: Option<f64>,

        /// Override the bootstrap quantile.
        #[arg(long)]
        alpha: Option<f64>,

        /// Override the master seed.
        #[arg(long)]
        seed: Option<u64>,

        /// Run the sweep on a single thread.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Report output path.
        #[arg(long, default_value = "report.json")]
        output: PathBuf,

        /// Also write the ROC records as CSV.
        #[arg(long)]
        roc_csv: Option<PathBuf>,
    },
    /// Print every traversal path and the path statistics.
    Paths {
        /// Survey definition (JSON).
        #[arg(long)]
        survey: PathBuf,

        /// Seed for ALL-block draws and the average-length walks.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            survey,
            config,
            classifier,
            sample_size,
            granularity,
            alpha,
            seed,
            sequential,
            output,
            roc_csv,
        } => {
            let mut analysis = match config {
                Some(path) => AnalysisConfig::from_file(&path)?,
                None => AnalysisConfig::default(),
            };
            if let Some(c) = classifier {
                analysis.classifier = c.into();
            }
            if let Some(n) = sample_size {
                analysis.sample_size = n;
            }
            if let Some(g) = granularity {
                analysis.granularity = g;
            }
            if let Some(a) = alpha {
                analysis.alpha = a;
            }
            if let Some(s) = seed {
                analysis.seed = s;
            }
            if sequential {
                analysis.parallel = false;
            }
            run_analyze(&survey, &analysis, &output, roc_csv.as_deref())
        }
        Commands::Paths { survey, seed } => run_paths(&survey, seed),
    }
}

fn load_survey(path: &Path) -> Result<Survey> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read survey definition {}", path.display()))?;
    let survey = survey_from_json(&json)
        .with_context(|| format!("invalid survey definition {}", path.display()))?;
    log::debug!(
        "loaded survey {} with {} questions",
        survey.name(),
        survey.question_count()
    );
    Ok(survey)
}

fn run_analyze(
    survey_path: &Path,
    config: &AnalysisConfig,
    output: &Path,
    roc_csv: Option<&Path>,
) -> Result<()> {
    let survey = load_survey(survey_path)?;
    let report = run_static_analysis(&survey, config)?;

    print_summary(&report);
    report.write_json(output)?;
    println!("Report saved to: {}", output.display());
    if let Some(path) = roc_csv {
        report.write_roc_csv(path)?;
        println!("ROC records saved to: {}", path.display());
    }
    Ok(())
}

fn run_paths(survey_path: &Path, seed: u64) -> Result<()> {
    let survey = load_survey(survey_path)?;
    let enumerator = PathEnumerator::new(&survey);
    let paths = enumerator.paths()?;
    for (i, path) in paths.iter().enumerate() {
        let blocks: Vec<String> = path.blocks().iter().map(|b| b.to_string()).collect();
        println!("{:>4}: {}", i + 1, blocks.join(" -> "));
    }

    let mut rng = RngHierarchy::new(seed).rng_for("paths", 0);
    let stats =
        enumerator.statistics_for(&paths, &mut rng, surveyqc_core::paths::AVERAGE_LENGTH_WALKS)?;
    println!();
    println!("Paths:                {}", stats.path_count);
    println!("Min path length:      {}", stats.min_path_length);
    println!("Max path length:      {}", stats.max_path_length);
    println!("Average path length:  {:.2}", stats.average_path_length);
    println!("Max possible entropy: {:.3} bits", stats.max_possible_entropy);
    Ok(())
}

fn print_summary(report: &Report) {
    println!("=== {} ({:?}) ===", report.survey, report.config.classifier);
    println!(
        "Paths: {}  length {}..={}  avg {:.2}  max entropy {:.3} bits",
        report.path_count,
        report.min_path_length,
        report.max_path_length,
        report.average_path_length,
        report.max_possible_entropy
    );
    println!();
    println!("  bots   entropy     TP    FP    TN    FN");
    for r in &report.roc {
        println!(
            "  {:>4.2}  {:>8.3}  {:>5} {:>5} {:>5} {:>5}",
            r.bot_fraction,
            r.entropy,
            r.true_positive,
            r.false_positive,
            r.true_negative,
            r.false_negative
        );
    }
}
