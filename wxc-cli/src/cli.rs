use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "WXC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging (API bodies are logged with credentials masked)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Component app id
    #[arg(long, env = "WX_COMPONENT_APP_ID", global = true)]
    pub app_id: Option<String>,

    /// Component app secret
    #[arg(long, env = "WX_COMPONENT_APP_SECRET", global = true, hide_env_values = true)]
    pub app_secret: Option<String>,

    /// Message verification token
    #[arg(long, env = "WX_COMPONENT_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// 43-character message encryption key
    #[arg(
        long,
        env = "WX_COMPONENT_ENCODING_AES_KEY",
        global = true,
        hide_env_values = true
    )]
    pub encoding_aes_key: Option<String>,

    /// Credential store backend
    #[arg(long, env = "WXC_STORE", global = true)]
    pub store: Option<StoreKind>,

    /// SQLite database URL for the sqlite store
    #[arg(long, env = "WXC_DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the push notification endpoint
    Serve {
        /// Listen address
        #[arg(short, long, env = "WXC_LISTEN")]
        listen: Option<String>,
    },

    /// Print the component access token, exchanging the ticket if needed
    Token {
        /// Give up after this many seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        /// Drop the cached token first
        #[arg(long)]
        refresh: bool,
    },

    /// Show whether a verify ticket is cached
    Ticket {
        /// Print the ticket value
        #[arg(long)]
        show: bool,
    },

    /// Print an authorization page URL
    AuthUrl {
        /// Where the platform redirects after authorization
        redirect_uri: String,

        /// 1 = official accounts, 2 = mini programs, 3 = both
        #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=3))]
        auth_type: u8,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Process-local, lost on exit
    Memory,
    /// SQLite file shared by every process pointing at it
    Sqlite,
}
