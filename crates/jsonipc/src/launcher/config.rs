//! Description of how to start a peer process.

use std::ffi::OsString;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use jsonipc_config::IpcEndpoint;

/// Executable launched when none is configured.
pub const DEFAULT_EXECUTABLE: &str = "mpv";

/// Flag through which the peer learns its IPC endpoint.
pub const DEFAULT_IPC_FLAG: &str = "input-ipc-server";

/// Number of readiness probes before giving up.
pub const DEFAULT_READINESS_ATTEMPTS: u32 = 20;

/// Delay between readiness probes.
pub const DEFAULT_READINESS_INTERVAL: Duration = Duration::from_millis(100);

/// How to spawn a peer and tell it where to listen.
///
/// The peer is started as
/// `<executable> <extra args...> --<key>=<value>... --<ipc flag>=<address>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    executable: OsString,
    endpoint: IpcEndpoint,
    ipc_flag: String,
    options: Vec<(String, String)>,
    extra_args: Vec<OsString>,
    working_dir: Option<Utf8PathBuf>,
    readiness_attempts: u32,
    readiness_interval: Duration,
    quiet: bool,
}

impl LaunchConfig {
    /// Launches the default executable listening on `endpoint`.
    #[must_use]
    pub fn new(endpoint: IpcEndpoint) -> Self {
        Self {
            executable: OsString::from(DEFAULT_EXECUTABLE),
            endpoint,
            ipc_flag: DEFAULT_IPC_FLAG.to_owned(),
            options: Vec::new(),
            extra_args: Vec::new(),
            working_dir: None,
            readiness_attempts: DEFAULT_READINESS_ATTEMPTS,
            readiness_interval: DEFAULT_READINESS_INTERVAL,
            quiet: false,
        }
    }

    /// Replaces the executable.
    #[must_use]
    pub fn with_executable(mut self, executable: impl Into<OsString>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Replaces the name of the endpoint flag, given without leading dashes.
    #[must_use]
    pub fn with_ipc_flag(mut self, flag: impl Into<String>) -> Self {
        self.ipc_flag = flag.into();
        self
    }

    /// Adds a `--key=value` option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }

    /// Adds a verbatim argument placed before the options.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<OsString>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Runs the peer from `dir`.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Replaces the readiness polling schedule.
    #[must_use]
    pub const fn with_readiness(mut self, attempts: u32, interval: Duration) -> Self {
        self.readiness_attempts = attempts;
        self.readiness_interval = interval;
        self
    }

    /// Discards the peer's standard output and error when `quiet`.
    #[must_use]
    pub const fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Executable to run.
    #[must_use]
    pub fn executable(&self) -> &OsString {
        &self.executable
    }

    /// Endpoint the peer is told to listen on.
    #[must_use]
    pub const fn endpoint(&self) -> &IpcEndpoint {
        &self.endpoint
    }

    /// Working directory, if one was set.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Utf8Path> {
        self.working_dir.as_deref()
    }

    /// Number of readiness probes.
    #[must_use]
    pub const fn readiness_attempts(&self) -> u32 {
        self.readiness_attempts
    }

    /// Delay before each readiness probe.
    #[must_use]
    pub const fn readiness_interval(&self) -> Duration {
        self.readiness_interval
    }

    /// Returns true when the peer's output is discarded.
    #[must_use]
    pub const fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Arguments passed to the executable, excluding the program name.
    #[must_use]
    pub fn arguments(&self) -> Vec<OsString> {
        let mut arguments = self.extra_args.clone();
        arguments.extend(
            self.options
                .iter()
                .map(|(key, value)| OsString::from(format!("--{key}={value}"))),
        );
        arguments.push(OsString::from(format!(
            "--{}={}",
            self.ipc_flag,
            self.endpoint.peer_address()
        )));
        arguments
    }
}
