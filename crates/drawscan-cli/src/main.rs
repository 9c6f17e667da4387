// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Drawscan — A4 conformance, scan quality, and layout analysis for scanned
// engineering drawings.
//
// Entry point. Parses arguments, initialises logging on stderr, runs one
// command, and prints its result as JSON on stdout.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};

use drawscan_core::error::Result;
use drawscan_core::{DrawingReport, EngineConfig};
use drawscan_vision::{DrawingAnalyzer, PdftoppmRasterizer};

#[derive(Parser, Debug)]
#[command(
    name = "drawscan",
    about = "Analyse scanned engineering drawings",
    long_about = "Classify scanned drawings against the A4 sheet, score their scan quality,\n\
                  enhance them onto the A4 grid, and extract layout features.\n\
                  \n\
                  Accepts PNG, JPEG, TIFF, and BMP rasters; PDF input needs --pdftoppm.",
    version
)]
struct Cli {
    /// JSON engine configuration; missing fields keep their defaults
    #[arg(short, long, global = true, value_name = "JSON")]
    config: Option<PathBuf>,

    /// Rasterize PDF input with pdftoppm (optionally at a custom path)
    #[arg(
        long,
        global = true,
        value_name = "PROGRAM",
        num_args = 0..=1,
        default_missing_value = "pdftoppm"
    )]
    pdftoppm: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log debug detail
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify the sheet size and score scan quality
    Analyze {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Enhance the drawing onto the A4 grid if it needs it
    Optimize {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Where to write the enhanced image (default: optimized_<name> beside the input)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Extract layout features
    Layout {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Include classified line segments, the border outline, and text blocks
        #[arg(long)]
        detailed: bool,
    },

    /// Compare the layouts of two drawings
    Compare {
        #[arg(value_name = "FIRST")]
        first: PathBuf,

        #[arg(value_name = "SECOND")]
        second: PathBuf,
    },
}

#[derive(Serialize)]
struct AnalyzeOutput {
    #[serde(flatten)]
    report: DrawingReport,
    needs_enhancement: bool,
}

#[derive(Serialize)]
struct OptimizeOutput<'a> {
    source: &'a Path,
    output: PathBuf,
    enhanced: bool,
}

#[derive(Serialize)]
struct CompareOutput {
    similarity: f64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "Command failed");
            eprintln!("drawscan: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let default_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn build_analyzer(cli: &Cli) -> Result<DrawingAnalyzer> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };

    let analyzer = DrawingAnalyzer::new(config)?;
    Ok(match &cli.pdftoppm {
        Some(program) => {
            info!(program = %program.display(), "PDF rasterization enabled");
            analyzer.with_rasterizer(PdftoppmRasterizer::with_program(program.clone()))
        }
        None => analyzer,
    })
}

/// Run the selected command and render its result as pretty JSON.
fn run(cli: &Cli) -> Result<String> {
    let analyzer = build_analyzer(cli)?;

    let json = match &cli.command {
        Command::Analyze { input } => {
            let report = analyzer.analyze(input)?;
            let needs_enhancement = analyzer.needs_enhancement(&report);
            serde_json::to_string_pretty(&AnalyzeOutput {
                report,
                needs_enhancement,
            })?
        }
        Command::Optimize { input, output } => {
            let written = analyzer.optimize(input, output.as_deref())?;
            serde_json::to_string_pretty(&OptimizeOutput {
                source: input,
                enhanced: written != *input,
                output: written,
            })?
        }
        Command::Layout { input, detailed } => {
            if *detailed {
                serde_json::to_string_pretty(&analyzer.analyze_layout(input)?)?
            } else {
                serde_json::to_string_pretty(&analyzer.extract_layout(input)?)?
            }
        }
        Command::Compare { first, second } => {
            let a = analyzer.extract_layout(first)?;
            let b = analyzer.extract_layout(second)?;
            serde_json::to_string_pretty(&CompareOutput {
                similarity: a.similarity(&b),
            })?
        }
    };
    Ok(json)
}
