//! Configure command - write a default configuration file.

use anyhow::bail;
use std::path::Path;
use vortaro_core::Config;

/// Run the configure command.
pub fn run(path: Option<&Path>) -> anyhow::Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::default_config_path()?,
    };

    if path.exists() {
        bail!("Configuration file already exists at {}", path.display());
    }

    Config::default().save_to(&path)?;
    println!("Wrote default configuration to {}", path.display());

    Ok(())
}
