use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;

/// Cross-check statement balances against a master ledger PDF and mark
/// every confirmed value.
#[derive(Debug, Parser)]
#[command(name = "ledgermark", version)]
pub struct Cli {
    /// Master ledger PDF to annotate.
    #[arg(long, short = 'm')]
    pub master: PathBuf,

    /// Positioned text of the master document (JSON layout index).
    #[arg(long, short = 'l')]
    pub layout: PathBuf,

    /// TOML configuration file.
    #[arg(long, short = 'c', env = "LEDGERMARK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Where to write the annotated master. Defaults to `Audit_<master>`
    /// next to the master.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Statement PDFs to reconcile.
    #[arg(required = true)]
    pub statements: Vec<PathBuf>,
}

// Not #[tokio::main]: the blocking HTTP client used for name lookups must be
// created and dropped outside the runtime.
fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let confirmed = commands::audit(&cli)?;
    println!("{confirmed} items confirmed");
    Ok(())
}
