//! Config file commands

use fwflasher_core::Config;
use std::path::Path;

/// Write the default configuration to a file
pub fn cmd_init(output: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if output.exists() && !force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            output.display()
        )
        .into());
    }

    Config::default().to_toml_file(output)?;
    println!("Wrote default configuration to {}", output.display());
    Ok(())
}

/// Print the effective configuration as TOML
pub fn cmd_show(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}
