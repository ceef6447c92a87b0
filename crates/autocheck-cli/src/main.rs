mod answer;
mod config;
mod session;

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::warn;

use autocheck_core::{CheckOptions, CheckResult, ProblemRef, Session};
use autocheck_expr::SamplingSimplifier;
use autocheck_tracker::{NotebookTracker, SharedCellLog};

use crate::answer::{parse_text, Interpretation};
use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "autocheck",
    version,
    about = "Check learner answers and give immediate feedback"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pass when |answer - expected| <= tolerance
    Absolute {
        #[command(flatten)]
        pair: AnswerPair,

        /// Absolute tolerance (default from config, 0 if unset)
        #[arg(short, long)]
        tolerance: Option<f64>,

        #[command(flatten)]
        problem: ProblemArgs,
    },

    /// Pass when |answer / expected - 1| <= tolerance
    Relative {
        #[command(flatten)]
        pair: AnswerPair,

        /// Relative tolerance (default from config, 1e-6 if unset)
        #[arg(short, long)]
        tolerance: Option<f64>,

        #[command(flatten)]
        problem: ProblemArgs,
    },

    /// Pass when both expressions are mathematically equivalent
    Symbolic {
        #[command(flatten)]
        pair: AnswerPair,

        #[command(flatten)]
        problem: ProblemArgs,
    },

    /// Read check requests as JSON lines from stdin
    Session {
        /// Show the expected answer after repeated wrong attempts
        #[arg(long)]
        show_answer: bool,

        /// Never report to the tracking server
        #[arg(long)]
        no_track: bool,
    },

    /// Show the active configuration
    Config,
}

#[derive(Args)]
struct AnswerPair {
    /// Expected value or expression
    #[arg(short, long, allow_hyphen_values = true)]
    expected: String,

    /// Learner's answer; empty or `...` means no answer
    #[arg(short, long, allow_hyphen_values = true, default_value = "")]
    answer: String,
}

#[derive(Args)]
struct ProblemArgs {
    /// Problem name (enables duplicate detection and tracking)
    #[arg(long)]
    name: Option<String>,

    /// Course identifier (required for tracking)
    #[arg(long)]
    course: Option<String>,

    /// Learning path
    #[arg(long)]
    lp: Option<String>,

    #[arg(long)]
    workbook: Option<String>,

    /// Show the expected answer after repeated wrong attempts
    #[arg(long)]
    show_answer: bool,

    /// Never report to the tracking server
    #[arg(long)]
    no_track: bool,
}

impl ProblemArgs {
    fn options(self) -> CheckOptions<'static> {
        let options = CheckOptions::for_problem(ProblemRef {
            name: self.name,
            course: self.course,
            lp: self.lp,
            workbook: self.workbook,
        });
        let options = if self.show_answer {
            options.show_answer(true)
        } else {
            options
        };
        if self.no_track {
            options.without_tracking()
        } else {
            options
        }
    }
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config()?;

    match cli.command {
        Commands::Absolute {
            pair,
            tolerance,
            problem,
        } => cmd_check(&cfg, problem, |session, options| {
            session.check_absolute(
                parse_text(&pair.expected, Interpretation::Numeric),
                parse_text(&pair.answer, Interpretation::Numeric),
                tolerance,
                options,
            )
        }),
        Commands::Relative {
            pair,
            tolerance,
            problem,
        } => cmd_check(&cfg, problem, |session, options| {
            session.check_relative(
                parse_text(&pair.expected, Interpretation::Numeric),
                parse_text(&pair.answer, Interpretation::Numeric),
                tolerance,
                options,
            )
        }),
        Commands::Symbolic { pair, problem } => cmd_check(&cfg, problem, |session, options| {
            session.check_symbolic(
                parse_text(&pair.expected, Interpretation::Symbolic),
                parse_text(&pair.answer, Interpretation::Symbolic),
                options,
            )
        }),
        Commands::Session {
            show_answer,
            no_track,
        } => cmd_session(&cfg, show_answer, no_track),
        Commands::Config => {
            cmd_config(&cfg);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Session with the configured settings, the sampling simplifier and, when
/// enabled, a tracker reading `cells`.
fn build_session(cfg: &Config, track: bool, cells: &SharedCellLog) -> Session<Vec<u8>> {
    let session = Session::new(Vec::new())
        .with_settings(cfg.session_settings())
        .with_simplifier(SamplingSimplifier::new());
    if !(track && cfg.tracking.enabled) {
        return session;
    }
    match NotebookTracker::connect(&cfg.tracking.settings(), cells.clone()) {
        Ok(tracker) => session.with_tracker(tracker),
        Err(e) => {
            warn!("tracking disabled: {e}");
            session
        }
    }
}

fn cmd_check(
    cfg: &Config,
    problem: ProblemArgs,
    check: impl FnOnce(&mut Session<Vec<u8>>, CheckOptions<'static>) -> CheckResult,
) -> Result<ExitCode> {
    let cells = SharedCellLog::new();
    let mut session = build_session(cfg, !problem.no_track, &cells);
    let count = cells
        .lock()
        .push_input(std::env::args().collect::<Vec<_>>().join(" "));

    let result = check(&mut session, problem.options());

    let feedback = std::mem::take(session.output_mut());
    let mut stdout = io::stdout();
    stdout.write_all(&feedback).context("writing feedback")?;
    stdout.flush()?;
    cells
        .lock()
        .set_output(count, String::from_utf8_lossy(&feedback).into_owned());

    Ok(if result.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_session(cfg: &Config, show_answer: bool, no_track: bool) -> Result<ExitCode> {
    let cells = SharedCellLog::new();
    let mut session = build_session(cfg, !no_track, &cells);
    if show_answer {
        let mut settings = session.settings().clone();
        settings.show_answer = true;
        session = session.with_settings(settings);
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    session::run(stdin.lock(), &mut stdout, &mut session, &cells)?;
    Ok(ExitCode::SUCCESS)
}

fn cmd_config(cfg: &Config) {
    println!("Config: {}", config::show_config_path());
    println!();
    println!("[tracking]");
    println!("  enabled = {}", cfg.tracking.enabled);
    println!("  url = {}", cfg.tracking.url);
    println!("  queue_capacity = {}", cfg.tracking.queue_capacity);
    println!("  timeout_ms = {}", cfg.tracking.timeout_ms);
    println!("  max_attempts = {}", cfg.tracking.max_attempts);
    println!("  initial_backoff_ms = {}", cfg.tracking.initial_backoff_ms);
    println!("  max_backoff_ms = {}", cfg.tracking.max_backoff_ms);
    println!();
    println!("[feedback]");
    println!("  reveal_after = {}", cfg.feedback.reveal_after);
    println!("  show_answer = {}", cfg.feedback.show_answer);
    println!();
    println!("[tolerance]");
    println!("  absolute = {}", cfg.tolerance.absolute);
    println!("  relative = {}", cfg.tolerance.relative);
}
