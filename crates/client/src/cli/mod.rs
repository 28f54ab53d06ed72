//! CLI command definitions.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line relying party for OpenID Connect providers.
///
/// The provider configuration is read from `OIDC_*` environment variables.
#[derive(Debug, Parser)]
#[command(name = "oidcrp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(long, default_value = "pretty")]
    pub format: OutputFormat,

    /// Suppress non-essential output.
    #[arg(long)]
    pub quiet: bool,

    /// Talk to a Mock IdP at this URL instead of discovering `OIDC_STS_SERVER`.
    #[cfg(feature = "mock")]
    #[arg(long, env = "OIDC_MOCK_IDP_URL")]
    pub mock_idp_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Raw JSON output.
    Json,
    /// Human-readable output.
    #[default]
    Pretty,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve whether a session exists for a URL.
    CheckAuth {
        /// Current URL, possibly a provider callback.
        url: String,
    },
    /// Print a fresh authorization URL.
    LoginUrl,
    /// Sign in interactively: open the URL, paste the callback URL back.
    Login {
        /// Keep the session alive and print auth events until Ctrl+C.
        #[arg(long)]
        watch: bool,
    },
    /// Report problems with the configuration.
    ValidateConfig,
    /// Run the Mock IdP server.
    #[cfg(feature = "mock")]
    MockIdp {
        /// Port to listen on.
        #[arg(long, short, default_value = "3001", env = "MOCK_IDP_PORT")]
        port: u16,
    },
}
