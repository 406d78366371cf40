// SPDX-License-Identifier: PMPL-1.0-or-later

//! vulnsift: build a weakly-labelled vulnerability corpus, featurize it,
//! train a boosted-tree classifier and classify individual files.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vulnsift::config::PipelineConfig;
use vulnsift::report::{self, ModelBundle, ReportFormatter, ReportOutputFormat};
use vulnsift::{corpus, diagnostics, features, model, storage};

#[derive(Parser)]
#[command(name = "vulnsift")]
#[command(version)]
#[command(about = "Weakly-labelled vulnerability category classifier for source files")]
#[command(long_about = None)]
struct Cli {
    /// Pipeline configuration (YAML); defaults to ./dataset and ./models
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the source roots and write the labelled corpus
    Corpus,

    /// Fit the TF-IDF vectorizer and write the feature matrix
    Features,

    /// Train and evaluate the classifier
    Train,

    /// Corpus, features and train in sequence
    Run,

    /// Classify one file with the trained artifacts
    Classify {
        /// File to classify
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: ReportOutputFormat,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check source directories and artifacts
    Doctor,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = PipelineConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Corpus => run_corpus(&config)?,
        Commands::Features => run_features(&config)?,
        Commands::Train => run_train(&config)?,
        Commands::Run => {
            run_corpus(&config)?;
            run_features(&config)?;
            run_train(&config)?;
        }
        Commands::Classify {
            file,
            format,
            output,
        } => {
            let bundle = ModelBundle::load(&config)?;
            let detection = report::classify_file(&file, &bundle.detector())?;

            if let Some(output_path) = output {
                let rendered = format.serialize(&detection)?;
                storage::write_atomic(&output_path, rendered.as_bytes())?;
                println!("Report saved to: {}", output_path.display());
            } else if format == ReportOutputFormat::Text {
                ReportFormatter::new().print(&detection);
            } else {
                print!("{}", format.serialize(&detection)?);
            }
        }
        Commands::Doctor => diagnostics::run_doctor(&config)?,
    }

    Ok(())
}

fn run_corpus(config: &PipelineConfig) -> Result<()> {
    println!("{}", "[+] Building corpus".cyan());
    let build = corpus::run(config)?;
    corpus::print_summary(&build);
    println!(
        "\nCorpus saved to: {}",
        storage::ArtifactPaths::from_config(config).samples.display()
    );
    Ok(())
}

fn run_features(config: &PipelineConfig) -> Result<()> {
    println!("{}", "[+] Extracting TF-IDF features".cyan());
    let build = features::make_features(config)?;
    let paths = storage::ArtifactPaths::from_config(config);
    println!("  Samples:  {}", build.samples);
    println!("  Features: {}", build.columns);
    for (label, count) in &build.label_counts {
        println!("  {:18} {:>6}", label, count);
    }
    println!("\nFeatures saved to:   {}", paths.features.display());
    println!("Vectorizer saved to: {}", paths.vectorizer.display());
    Ok(())
}

fn run_train(config: &PipelineConfig) -> Result<()> {
    println!("{}", "[+] Training classifier".cyan());
    let outcome = model::train_model(config)?;
    model::print_outcome(&outcome);
    println!(
        "\nClassifier saved to: {}",
        storage::ArtifactPaths::from_config(config).classifier.display()
    );
    Ok(())
}
