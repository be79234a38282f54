//! uopsynth CLI: synthesize simulator uop tables from instruction characterizations.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "uopsynth", version, about = "Budgeted uop synthesis for x86 simulators")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate instruction, uop and functional-unit tables
    Generate {
        /// Policy file (TOML)
        #[arg(long)]
        config: PathBuf,
        /// Characterization document (XML)
        #[arg(long)]
        xml: PathBuf,
        /// Instruction string to internal code mapping (TOML)
        #[arg(long)]
        icode: PathBuf,
        /// Output file prefix
        #[arg(long, default_value = "full")]
        output: String,
        /// Also write a JSON quantization report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Check a policy file and summarize its families
    Validate {
        /// Policy file (TOML)
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate {
            config,
            xml,
            icode,
            output,
            report,
        } => commands::generate::run(&config, &xml, &icode, &output, report.as_deref()),

        Commands::Validate { config } => commands::validate::run(&config),
    }
}
