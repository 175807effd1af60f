use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pagemask")]
#[command(about = "Redact matched regions on scanned document pages", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Merged predictions (JSON array of rows)
    #[arg(short, long)]
    pub predictions: PathBuf,

    /// Config file (JSON), must exist; without it ./pagemask.json is used when present
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the page images (overrides config)
    #[arg(long)]
    pub resource_dir: Option<PathBuf>,

    /// Page image extension including the dot (overrides config)
    #[arg(long)]
    pub image_extension: Option<String>,

    /// Document id for rows that carry none (default: predictions file stem)
    #[arg(long)]
    pub doc_id: Option<String>,

    /// Write bundles here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Re-read every emitted page and check the redacted regions
    #[arg(long)]
    pub verify: bool,
}
