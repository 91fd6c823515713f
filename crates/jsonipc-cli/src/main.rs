//! Entry point for the `jsonipc` command-line tool.
//!
//! The binary delegates to [`jsonipc_cli::run`], which parses arguments,
//! installs logging, and talks to the configured peer.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    jsonipc_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
