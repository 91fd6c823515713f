//! Command-line runtime for the `jsonipc` tool.
//!
//! The runtime parses arguments, installs logging, connects to the peer and
//! runs one subcommand. It is written against generic output streams so tests
//! can drive it without spawning a process.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use jsonipc::{Capabilities, Client, Notification};
use jsonipc_config::{ClientSettings, default_endpoint};
use serde::Serialize;
use tracing::debug;

mod arguments;
mod cli;
mod errors;
mod telemetry;

#[cfg(all(test, unix))]
mod tests;

use arguments::parse_arguments;
use cli::{Cli, CliCommand};
use errors::AppError;

const CLI_TARGET: &str = "jsonipc::cli";

/// Runs the tool with the provided arguments and output streams.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => return report_usage(&error, stdout, stderr),
    };

    match execute(cli, stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            ExitCode::FAILURE
        }
    }
}

/// Help and version requests go to stdout and succeed; usage errors fail.
fn report_usage<W: Write, E: Write>(error: &clap::Error, stdout: &mut W, stderr: &mut E) -> ExitCode {
    let rendered = error.render();
    if error.use_stderr() {
        let _ = write!(stderr, "{rendered}");
        ExitCode::FAILURE
    } else {
        let _ = write!(stdout, "{rendered}");
        ExitCode::SUCCESS
    }
}

fn execute<W: Write>(cli: Cli, stdout: &mut W) -> Result<(), AppError> {
    telemetry::initialise(&cli.log_filter, cli.log_format)?;

    let endpoint = cli.socket.unwrap_or_else(default_endpoint);
    let mut settings = ClientSettings::new(endpoint);
    if let Some(seconds) = cli.timeout_secs {
        settings = settings.with_request_timeout(Duration::from_secs(seconds));
    }
    debug!(target: CLI_TARGET, endpoint = %settings.endpoint(), "connecting");

    match cli.command {
        CliCommand::Send { command, args } => {
            let client = Client::connect(&settings)?;
            let data = client.send(&command, parse_arguments(&args))?;
            client.stop();
            write_json_line(stdout, &data)
        }
        CliCommand::Watch { count } => watch(&settings, count, stdout),
        CliCommand::Capabilities => {
            let client = Client::connect(&settings)?;
            let capabilities = Capabilities::discover(&client)?;
            client.stop();
            write_json_line(stdout, &capabilities)
        }
    }
}

/// Prints notifications until `count` is reached or the peer goes away.
fn watch<W: Write>(
    settings: &ClientSettings,
    count: Option<usize>,
    stdout: &mut W,
) -> Result<(), AppError> {
    if count == Some(0) {
        return Ok(());
    }
    let (sender, receiver) = mpsc::channel::<Notification>();
    let client = Client::connect_with_handler(settings, sender)?;

    let mut printed = 0_usize;
    for notification in receiver.iter() {
        write_json_line(stdout, &notification)?;
        printed += 1;
        if count.is_some_and(|limit| printed >= limit) {
            break;
        }
    }
    debug!(target: CLI_TARGET, printed, "watch finished");
    client.stop();
    Ok(())
}

fn write_json_line<W: Write, T: Serialize + ?Sized>(stdout: &mut W, value: &T) -> Result<(), AppError> {
    serde_json::to_writer(&mut *stdout, value).map_err(AppError::Encode)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
