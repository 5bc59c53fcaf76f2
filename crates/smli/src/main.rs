//! smli - interactive read-eval-print front end for the `smlc` Standard ML
//! subset.
//!
//! Usage:
//!   smli                 # read from standard input, line-edited via rustyline
//!   smli a.sml b.sml      # feed each file through the same session, in order
//!
//! Accepted items print `val <name> : <type>` for every name bound (`it` for
//! a bare expression); rejected items print a diagnostic and move on to the
//! next item. Exit code is 0 unless a named input file or `--config` file
//! could not be read/parsed.

mod engine;

use clap::Parser as ClapParser;
use engine::{Engine, Outcome};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use smlc::config::SessionConfig;
use std::path::PathBuf;
use std::process;
use tracing::error;

#[derive(ClapParser)]
#[command(name = "smli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Interactive front end for the smlc Standard ML subset", long_about = None)]
struct Args {
    /// Source files to run; reads standard input interactively if none are given.
    files: Vec<PathBuf>,

    /// Raise logging verbosity (equivalent to RUST_LOG=debug).
    #[arg(short, long)]
    verbose: bool,

    /// TOML file declaring extra external values to preload (see
    /// `smlc::config::SessionConfig::from_toml_str`).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(msg) => {
            eprintln!("smli: {msg}");
            process::exit(1);
        }
    };

    let mut engine = Engine::with_config(config);
    let exit_code = if args.files.is_empty() {
        run_interactive(&mut engine);
        0
    } else {
        run_files(&mut engine, &args.files)
    };
    process::exit(exit_code);
}

fn load_config(path: Option<&std::path::Path>) -> Result<SessionConfig, String> {
    let Some(path) = path else {
        return Ok(SessionConfig::new());
    };
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read config file {}: {e}", path.display()))?;
    SessionConfig::from_toml_str(&source)
        .map_err(|e| format!("invalid config file {}: {e}", path.display()))
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();
}

fn run_files(engine: &mut Engine, files: &[PathBuf]) -> i32 {
    for path in files {
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                error!(file = %path.display(), error = %e, "failed to read input file");
                eprintln!("smli: could not read {}: {}", path.display(), e);
                return 1;
            }
        };
        engine.run_source(&source, print_outcome);
    }
    0
}

fn run_interactive(engine: &mut Engine) {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            error!(error = %e, "failed to start line editor");
            return;
        }
    };

    loop {
        let prompt = if engine.has_buffered_input() { "  " } else { "- " };
        match rl.readline(prompt) {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                print_outcome(engine.submit(&line));
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                error!(error = %e, "line editor error");
                break;
            }
        }
    }
}

fn print_outcome(outcome: Outcome) {
    match outcome {
        Outcome::Accepted(lines) => {
            for line in lines {
                println!("{line}");
            }
        }
        Outcome::Incomplete | Outcome::Empty => {}
        Outcome::Rejected(msg) => eprintln!("{msg}"),
    }
}
