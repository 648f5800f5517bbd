use anyhow::Result;
use clap::Parser;
use std::path::Path;

use credforce::cli::{self, Cli};
use credforce::SshCapability;

#[tokio::main]
async fn main() -> Result<()> {
    // USERS_FILE / PASSWORDS_FILE may come from a local .env
    cli::load_env_file(Path::new(".env"))?;

    let cli_args = Cli::parse();
    cli::run(cli_args, SshCapability::new()).await?;
    Ok(())
}
