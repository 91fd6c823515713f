//! Command-line argument definitions.

use clap::{Parser, Subcommand};
use jsonipc_config::{DEFAULT_LOG_FILTER, IpcEndpoint, LogFormat};

/// Talks to a peer over the line-delimited JSON IPC protocol.
#[derive(Parser, Debug)]
#[command(name = "jsonipc", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Peer endpoint: a socket path, `unix:///path` or `tcp://host:port`.
    #[arg(long, env = "JSONIPC_SOCKET", value_name = "ENDPOINT")]
    pub(crate) socket: Option<IpcEndpoint>,
    /// Seconds to wait for each reply.
    #[arg(long, env = "JSONIPC_TIMEOUT_SECS", value_name = "SECONDS")]
    pub(crate) timeout_secs: Option<u64>,
    /// Tracing filter directives written to stderr.
    #[arg(long, env = "JSONIPC_LOG_FILTER", default_value = DEFAULT_LOG_FILTER)]
    pub(crate) log_filter: String,
    /// Log line format: `json` or `compact`.
    #[arg(long, env = "JSONIPC_LOG_FORMAT", default_value_t = LogFormat::Compact)]
    pub(crate) log_format: LogFormat,
    /// What to do once connected.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Subcommands of the tool.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Sends one command and prints the reply data as JSON.
    Send {
        /// Command name, for example `get_property`.
        command: String,
        /// Arguments, each parsed as JSON or else sent as a string.
        #[arg(
            value_name = "ARG",
            num_args = 0..,
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        args: Vec<String>,
    },
    /// Prints notifications as JSON lines until the peer disconnects.
    Watch {
        /// Stop after this many notifications.
        #[arg(long)]
        count: Option<usize>,
    },
    /// Prints the peer's advertised properties and commands.
    Capabilities,
}
