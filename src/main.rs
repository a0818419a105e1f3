// SPDX-License-Identifier: MIT
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

mod analysis;
mod config;
mod datasource;
mod game;
mod input;
mod recording;
mod sampler;
mod session;
mod tui;

use std::fs::File;
use std::io::{self, IsTerminal, Stdout, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::analysis::report::write_report;
use crate::analysis::{AnalysisResult, run_pass};
use crate::config::Settings;
use crate::datasource::session_id;
use crate::input::hook::TerminalHook;
use crate::recording::export::export_file;
use crate::recording::format::cli_report_file_name;
use crate::sampler::process::SysinfoProbe;
use crate::session::{Session, SessionSummary};
use crate::tui::app::{App, SessionStats};

const RENDER_INTERVAL: Duration = Duration::from_millis(100);
const HEADLESS_STATUS_INTERVAL: Duration = Duration::from_secs(5);
const DEBUG_LOG_NAME: &str = "gametrace_debug.log";

#[derive(Parser)]
#[command(
    name = "gametrace",
    about = "gametrace: gameplay input, state and performance logger"
)]
struct Cli {
    /// Settings file (JSON); missing keys keep their defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Default)]
struct Overrides {
    /// Sampling frequency in Hz
    #[arg(short, long)]
    frequency: Option<u32>,
    /// Directory for session logs and analysis reports
    #[arg(long)]
    log_dir: Option<PathBuf>,
    /// Buffered entries that trigger a flush
    #[arg(long)]
    flush_threshold: Option<usize>,
}

impl Overrides {
    fn apply(&self, settings: &mut Settings) {
        if let Some(hz) = self.frequency {
            settings.sampling.frequency_hz = hz;
        }
        if let Some(dir) = &self.log_dir {
            settings.buffer.log_dir.clone_from(dir);
        }
        if let Some(threshold) = self.flush_threshold {
            settings.buffer.flush_threshold = threshold;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Record a session without the dashboard (headless)
    Record {
        #[command(flatten)]
        overrides: Overrides,
        /// Stop after this many seconds (0 runs until interrupted)
        #[arg(long, default_value = "0")]
        duration: u64,
    },
    /// Record a session with the live dashboard
    Live {
        #[command(flatten)]
        overrides: Overrides,
        #[arg(long, default_value = "0")]
        duration: u64,
    },
    /// Analyze recorded sessions and print recommendations
    Analyze {
        /// Log directory (defaults to the configured one)
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// Where to write the analysis report
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export a session log to CSV
    Export {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// zstd-compress the CSV
        #[arg(long)]
        compress: bool,
    },
    /// Print the effective settings
    Config {
        #[command(flatten)]
        overrides: Overrides,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Record {
            overrides,
            duration,
        } => {
            let settings = load_settings(cli.config.as_deref(), &overrides)?;
            init_logging(cli.verbose, LogTarget::Stderr)?;
            cmd_record(settings, duration)
        }
        Commands::Live {
            overrides,
            duration,
        } => {
            let settings = load_settings(cli.config.as_deref(), &overrides)?;
            let log_dir = &settings.buffer.log_dir;
            std::fs::create_dir_all(log_dir)
                .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
            init_logging(cli.verbose, LogTarget::File(log_dir.join(DEBUG_LOG_NAME)))?;
            cmd_live(settings, duration)
        }
        Commands::Analyze { dir, output } => {
            let settings = load_settings(cli.config.as_deref(), &Overrides::default())?;
            init_logging(cli.verbose, LogTarget::Stderr)?;
            cmd_analyze(&settings, dir, output)
        }
        Commands::Export {
            input,
            output,
            compress,
        } => {
            init_logging(cli.verbose, LogTarget::Stderr)?;
            cmd_export(&input, &output, compress)
        }
        Commands::Config { overrides } => {
            let settings = load_settings(cli.config.as_deref(), &overrides)?;
            cmd_config(&settings)
        }
    }
}

// ---------------------------------------------------------------------------
// Settings and logging
// ---------------------------------------------------------------------------

fn load_settings(path: Option<&Path>, overrides: &Overrides) -> Result<Settings> {
    let mut settings = match path {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    overrides.apply(&mut settings);
    settings.validate().context("invalid settings")?;
    Ok(settings)
}

enum LogTarget {
    Stderr,
    /// The dashboard owns the terminal, so logs go to a file instead.
    File(PathBuf),
}

fn init_logging(verbose: bool, target: LogTarget) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));

    match target {
        LogTarget::Stderr => {
            // Input capture puts the terminal in raw mode, where a bare
            // newline does not return the cursor.
            let eol = if io::stderr().is_terminal() { "\r\n" } else { "\n" };
            builder.format(move |buf, record| {
                write!(
                    buf,
                    "[{} {:<5} {}] {}{eol}",
                    buf.timestamp_millis(),
                    record.level(),
                    record.target(),
                    record.args()
                )
            });
        }
        LogTarget::File(path) => {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
    }

    builder.try_init().context("failed to initialize logging")?;
    log::info!(
        "gametrace {} on {}/{} (stdin terminal: {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH,
        io::stdin().is_terminal()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Signal handling
// ---------------------------------------------------------------------------

fn install_signal_handler() -> Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))
        .context("failed to register SIGINT handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))
        .context("failed to register SIGTERM handler")?;
    Ok(shutdown)
}

// ---------------------------------------------------------------------------
// Terminal setup / teardown
// ---------------------------------------------------------------------------

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen)
        .context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("failed to create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared: session construction
// ---------------------------------------------------------------------------

fn start_session(
    settings: Settings,
    shutdown: Arc<AtomicBool>,
    quit_on_escape: bool,
) -> Result<Session> {
    let hook = TerminalHook::new(&settings.input, &settings.movement, Arc::clone(&shutdown))
        .quit_on_escape(quit_on_escape);
    let probe = SysinfoProbe::current().context("failed to open process metrics")?;
    Session::start(settings, Some(Box::new(hook)), Box::new(probe), shutdown)
}

fn duration_limit(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn print_summary(summary: &SessionSummary) {
    eprintln!(
        "Finished: {} ticks, {} entries written to {}",
        summary.ticks,
        summary.persisted,
        summary.log_path.display()
    );
    let recommendations = analysis::recommend::generate_recommendations(summary.analysis.as_ref());
    for recommendation in recommendations {
        eprintln!("  - {recommendation}");
    }
}

// ---------------------------------------------------------------------------
// Record subcommand
// ---------------------------------------------------------------------------

fn cmd_record(settings: Settings, duration_secs: u64) -> Result<()> {
    let shutdown = install_signal_handler()?;
    let max_duration = duration_limit(duration_secs);
    let mut session = start_session(settings, shutdown, false)?;

    // Raw mode is active while input is captured.
    eprint!(
        "Recording session {} to {} (Ctrl+C to stop) ...\r\n",
        session.metadata().session_id,
        session.log_path().display()
    );

    let start = Instant::now();
    let mut last_status = Instant::now();
    session.run(|s, _| {
        if let Some(max) = max_duration
            && start.elapsed() >= max
        {
            s.request_stop();
        }
        if last_status.elapsed() >= HEADLESS_STATUS_INTERVAL {
            print_recording_status(start.elapsed(), s);
            last_status = Instant::now();
        }
        Ok(())
    });

    let summary = session.stop()?;
    print_summary(&summary);
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn print_recording_status(elapsed: Duration, session: &Session) {
    let secs = elapsed.as_secs();
    let size = std::fs::metadata(session.log_path()).map_or(0, |m| m.len());
    eprint!(
        "  [{secs}s] {} ticks, {} buffered, {} saved, {:.1} KB\r\n",
        session.ticks(),
        session.buffer().len(),
        session.buffer().persisted(),
        size as f64 / 1024.0
    );
}

// ---------------------------------------------------------------------------
// Live subcommand
// ---------------------------------------------------------------------------

fn cmd_live(settings: Settings, duration_secs: u64) -> Result<()> {
    if !io::stdout().is_terminal() {
        bail!("the live dashboard needs a terminal; use `gametrace record` instead");
    }
    let shutdown = install_signal_handler()?;

    let mut terminal = setup_terminal()?;
    let result = run_live(&mut terminal, settings, shutdown, duration_limit(duration_secs));
    restore_terminal(&mut terminal)?;

    let summary = result?;
    print_summary(&summary);
    Ok(())
}

fn run_live(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    settings: Settings,
    shutdown: Arc<AtomicBool>,
    max_duration: Option<Duration>,
) -> Result<SessionSummary> {
    let mut session = start_session(settings.clone(), shutdown, true)?;
    let mut app = App::new(session.metadata().clone(), settings);

    let start = Instant::now();
    let mut last_draw: Option<Instant> = None;
    session.run(|s, entry| {
        if let Some(max) = max_duration
            && start.elapsed() >= max
        {
            s.request_stop();
        }

        app.update(
            entry,
            SessionStats {
                ticks: s.ticks(),
                buffered: s.buffer().len(),
                persisted: s.buffer().persisted(),
            },
        );
        if last_draw.is_none_or(|t| t.elapsed() >= RENDER_INTERVAL) {
            terminal
                .draw(|f| app.render(f))
                .context("failed to draw dashboard")?;
            last_draw = Some(Instant::now());
        }
        Ok(())
    });

    session.stop()
}

// ---------------------------------------------------------------------------
// Analyze subcommand
// ---------------------------------------------------------------------------

fn cmd_analyze(settings: &Settings, dir: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let dir = dir.unwrap_or_else(|| settings.buffer.log_dir.clone());
    let outcome = run_pass(&dir, &settings.keybinds);

    if let Some(result) = &outcome.result {
        print_analysis(result);
    }
    println!("Recommendations:");
    for recommendation in &outcome.recommendations {
        println!("  - {recommendation}");
    }

    let report_path = match (output, &outcome.result) {
        (Some(path), _) => path,
        (None, Some(_)) => dir.join(cli_report_file_name(&session_id(Utc::now()))),
        (None, None) => return Ok(()),
    };
    write_report(
        &report_path,
        Utc::now(),
        outcome.result.as_ref(),
        &outcome.recommendations,
    )?;
    println!("Report written to {}", report_path.display());
    Ok(())
}

fn print_analysis(result: &AnalysisResult) {
    let combat = &result.combat_effectiveness;
    let tactical = &result.tactical_profile;
    println!(
        "Analyzed {} entries from {} files ({} skipped)",
        result.entries_analyzed, result.files_loaded, result.files_skipped
    );
    println!("  Movement style:       {}", result.movement_style);
    println!("  Accuracy:             {:.2}", combat.accuracy);
    println!(
        "  Shots / hits:         {} / {}",
        combat.total_shots, combat.total_hits
    );
    println!("  Resource efficiency:  {:.2}", result.resource_efficiency);
    println!("  Aggression:           {:.2}", tactical.aggression_level);
    println!("  Positioning:          {}", tactical.preferred_positioning);
}

// ---------------------------------------------------------------------------
// Export subcommand
// ---------------------------------------------------------------------------

fn cmd_export(input: &Path, output: &Path, compress: bool) -> Result<()> {
    let count = export_file(input, output, compress)?;
    eprintln!("Exported {count} entries to {}", output.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Config subcommand
// ---------------------------------------------------------------------------

fn cmd_config(settings: &Settings) -> Result<()> {
    let json = serde_json::to_string_pretty(settings).context("failed to serialize settings")?;
    println!("{json}");
    Ok(())
}
