use std::path::PathBuf;
use std::time::Duration;

use anyhow::ensure;

use crate::download::MirrorConfig;
use crate::retry::RetryConfig;
use crate::types::LogLevel;

const MAX_WORKERS: u16 = 1000;
const MAX_PAGE_SIZE: u32 = 1000;

/// Validated application configuration.
pub struct Config {
    pub directory: PathBuf,
    pub folder: String,
    pub token_file: PathBuf,
    pub access_token: Option<String>,
    pub api_base: String,
    pub temp_suffix: String,
    pub transfer_log: PathBuf,
    pub error_log: PathBuf,

    pub queue_capacity: usize,
    pub retry_delay_secs: u64,
    pub page_size: u32,
    pub max_retries: u32,
    pub workers: u16,

    pub log_level: LogLevel,
    pub no_progress_bar: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("directory", &self.directory)
            .field("folder", &self.folder)
            .field("token_file", &self.token_file)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("api_base", &self.api_base)
            .field("workers", &self.workers)
            .field("queue_capacity", &self.queue_capacity)
            .finish_non_exhaustive()
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    pub fn from_cli(cli: crate::cli::Cli) -> anyhow::Result<Self> {
        ensure!(
            (1..=MAX_WORKERS).contains(&cli.workers),
            "--workers must be between 1 and {}, got {}",
            MAX_WORKERS,
            cli.workers
        );
        ensure!(cli.queue_capacity > 0, "--queue-capacity must be greater than 0");
        ensure!(
            (1..=MAX_PAGE_SIZE).contains(&cli.page_size),
            "--page-size must be between 1 and {}, got {}",
            MAX_PAGE_SIZE,
            cli.page_size
        );
        ensure!(!cli.temp_suffix.is_empty(), "--temp-suffix must not be empty");
        ensure!(
            !cli.temp_suffix.contains(['/', '\\']),
            "--temp-suffix must not contain path separators"
        );
        ensure!(!cli.directory.trim().is_empty(), "--directory must not be empty");

        Ok(Self {
            directory: expand_tilde(&cli.directory),
            folder: cli.folder,
            token_file: expand_tilde(&cli.token_file),
            access_token: cli.access_token,
            api_base: cli.api_base,
            temp_suffix: cli.temp_suffix,
            transfer_log: expand_tilde(&cli.transfer_log),
            error_log: expand_tilde(&cli.error_log),
            queue_capacity: cli.queue_capacity,
            retry_delay_secs: cli.retry_delay,
            page_size: cli.page_size,
            max_retries: cli.max_retries,
            workers: cli.workers,
            log_level: cli.log_level,
            no_progress_bar: cli.no_progress_bar,
        })
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            base_delay: Duration::from_secs(self.retry_delay_secs),
            ..RetryConfig::default()
        }
    }

    pub fn mirror(&self) -> MirrorConfig {
        MirrorConfig {
            directory: self.directory.clone(),
            folder: self.folder.clone(),
            workers: usize::from(self.workers),
            queue_capacity: self.queue_capacity,
            temp_suffix: self.temp_suffix.clone(),
            no_progress_bar: self.no_progress_bar,
        }
    }
}
