mod checksum;
mod cli;
mod depfile;
mod fingerprint;
mod stamper;

use cli::{ActionArgs, Cli, Command, LogLevel};
use fingerprint::{BuildConfig, Fingerprint};
use stamper::{Freshness, Stamper};
use std::fmt as stdfmt;
use std::io::{IsTerminal, stderr};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Event, Level, Subscriber, error, info};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt as tracing_fmt;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;

struct StampExitCode;

impl StampExitCode {
    /// Exit code used when the action must be rebuilt.
    fn stale() -> ExitCode {
        ExitCode::from(1)
    }

    /// Exit code used for other errors (I/O errors, malformed depfiles, etc.).
    fn any_error() -> ExitCode {
        ExitCode::from(255)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_level);

    if let Some(directory) = cli.directory
        && let Err(e) = std::env::set_current_dir(&directory)
    {
        error!(
            "Failed to change directory to {}: {}",
            directory.display(),
            e
        );
        return StampExitCode::any_error();
    }

    let result: anyhow::Result<ExitCode> = match cli.command {
        Command::Deps { depfile } => handle_deps(depfile),
        Command::Check { action } => handle_check(action),
        Command::Stamp { action, dry_run } => handle_stamp(action, dry_run),
        Command::Show { stamp } => handle_show(stamp),
    };

    match result {
        Ok(exit_code) => exit_code,
        Err(err) => {
            error!("{err:#}");
            StampExitCode::any_error()
        }
    }
}

fn stamper_from_args(action: ActionArgs) -> Stamper {
    let config = BuildConfig::new(action.mode, action.platform.as_deref());
    Stamper::new(action.stamp, config)
        .inputs(action.inputs)
        .depfiles(action.depfiles)
}

fn handle_deps(depfile: PathBuf) -> anyhow::Result<ExitCode> {
    let inputs = depfile::read_dependencies(&depfile)?;

    for input in &inputs {
        println!("{input}");
    }

    info!("{} lists {} inputs", depfile.display(), inputs.len());

    Ok(ExitCode::SUCCESS)
}

fn handle_check(action: ActionArgs) -> anyhow::Result<ExitCode> {
    let stamper = stamper_from_args(action);

    match stamper.check()? {
        Freshness::Fresh => {
            println!("fresh");
            Ok(ExitCode::SUCCESS)
        }
        Freshness::Stale(reason) => {
            println!("stale: {reason}");
            info!(
                "Rebuild needed, then run 'depstamp stamp' to record {}",
                stamper.stamp_path().display()
            );
            Ok(StampExitCode::stale())
        }
    }
}

fn handle_stamp(action: ActionArgs, dry_run: bool) -> anyhow::Result<ExitCode> {
    let stamper = stamper_from_args(action);

    if dry_run {
        let fingerprint = stamper.build_fingerprint()?;
        print!("{}", fingerprint.to_toml()?);
        info!("DRY RUN - {} was not written", stamper.stamp_path().display());
        return Ok(ExitCode::SUCCESS);
    }

    let fingerprint = stamper.write()?;
    info!("Stamped {} inputs", fingerprint.file_hashes().len());

    Ok(ExitCode::SUCCESS)
}

fn handle_show(stamp: PathBuf) -> anyhow::Result<ExitCode> {
    let fingerprint = Fingerprint::load(&stamp)?;

    let platform = match fingerprint.target_platform() {
        "" => "(unspecified)",
        p => p,
    };

    println!("Revision: {}", fingerprint.schema_version());
    println!("Build mode: {}", fingerprint.build_mode());
    println!("Target platform: {}", platform);
    println!("Inputs: {}", fingerprint.file_hashes().len());
    for (path, digest) in fingerprint.file_hashes() {
        println!("  {}  {}", digest, path);
    }

    Ok(ExitCode::SUCCESS)
}

fn log_filter(verbose: u8, log_level: Option<LogLevel>) -> EnvFilter {
    if let Some(level) = log_level {
        return EnvFilter::new(level.as_filter());
    }

    match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    }
}

fn init_tracing(verbose: u8, log_level: Option<LogLevel>) {
    let stderr_is_terminal = stderr().is_terminal();
    let formatter = EmojiFormatter { stderr_is_terminal };

    let fmt_layer = tracing_fmt::layer()
        .event_format(formatter)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(log_filter(verbose, log_level))
        .with(fmt_layer)
        .init();
}

struct EmojiFormatter {
    stderr_is_terminal: bool,
}

impl<S, N> FormatEvent<S, N> for EmojiFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> stdfmt::Result {
        if self.stderr_is_terminal {
            match *event.metadata().level() {
                Level::INFO => write!(writer, "ℹ️ ")?,
                Level::WARN => write!(writer, "⚠️  ")?,
                Level::ERROR => write!(writer, "❌️ ")?,
                _ => write!(writer, "🔍 ")?,
            }
        } else {
            match *event.metadata().level() {
                Level::DEBUG => writer.write_str("DEBUG: ")?,
                Level::INFO => writer.write_str("INFO: ")?,
                Level::WARN => writer.write_str("WARN: ")?,
                Level::ERROR => writer.write_str("ERROR: ")?,
                _ => writer.write_str("TRACE: ")?,
            }
        }

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
