use clap::Parser;

use crate::types::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "gdrive-mirror",
    version,
    about = "Mirror a Google Drive folder tree into a local directory"
)]
pub struct Cli {
    /// Local directory to mirror into
    #[arg(short = 'd', long)]
    pub directory: String,

    /// Remote folder to start from, as a slash-separated path ("root" for the whole drive)
    #[arg(short = 'f', long, default_value = "root")]
    pub folder: String,

    /// Number of concurrent transfer workers (1-1000)
    #[arg(short = 'w', long, default_value_t = 16)]
    pub workers: u16,

    /// Maximum number of discovered files waiting for a worker
    #[arg(long, default_value_t = 10_000)]
    pub queue_capacity: usize,

    /// Entries requested per listing call (1-1000)
    #[arg(long, default_value_t = 1000)]
    pub page_size: u32,

    /// OAuth token file (JSON with an access_token field)
    #[arg(long, default_value = "token.json")]
    pub token_file: String,

    /// Access token to use instead of the token file.
    /// WARNING: passing via --access-token is visible in process listings.
    /// Prefer the GDRIVE_ACCESS_TOKEN environment variable instead.
    #[arg(long, env = "GDRIVE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Drive API base URL
    #[arg(long, default_value = crate::drive::DEFAULT_API_BASE)]
    pub api_base: String,

    /// Suffix for in-progress files, renamed away once complete
    #[arg(long, default_value = ".tmp")]
    pub temp_suffix: String,

    /// Max retries for folder listings and lookups (0 = no retries)
    #[arg(long, default_value_t = 2)]
    pub max_retries: u32,

    /// Initial retry delay in seconds
    #[arg(long, default_value_t = 5)]
    pub retry_delay: u64,

    /// Console log level (RUST_LOG overrides)
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Append-only log of attempted transfers
    #[arg(long, default_value = "transfers.log")]
    pub transfer_log: String,

    /// Append-only log of warnings and errors
    #[arg(long, default_value = "errors.log")]
    pub error_log: String,

    /// Disable the live status line
    #[arg(long)]
    pub no_progress_bar: bool,
}
