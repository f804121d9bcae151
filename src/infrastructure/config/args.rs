use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "stock-search",
    version,
    about = "Search stock photo providers from the terminal",
    long_about = None
)]
pub struct CliArgs {
    /// Search query.
    pub query: String,

    /// Number of result rounds to fetch (continuation pages included).
    #[arg(short, long, default_value_t = 1)]
    pub pages: usize,

    /// Prefetch the thumbnails of every result.
    #[arg(long)]
    pub thumbnails: bool,

    /// Download the first result at full resolution.
    #[arg(short, long)]
    pub download: bool,

    /// Add the downloaded photo to favourites.
    #[arg(long, requires = "download")]
    pub favourite: bool,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Maximum number of provider calls in flight.
    #[arg(long)]
    pub concurrent_limit: Option<usize>,

    /// Results wanted from the first round across providers.
    #[arg(long)]
    pub ideal_total: Option<usize>,

    /// Directory for downloaded attachments.
    #[arg(long, value_name = "PATH")]
    pub attachment_dir: Option<PathBuf>,
}
