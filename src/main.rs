//! fwflasher - Serial firmware flasher for ESP chips
//!
//! Watches the serial ports, picks up the bootloader, partition table, OTA
//! data and application images from an image directory, and runs esptool to
//! write them at the chip's fixed offsets.
//!
//! # Architecture
//!
//! The CLI is a thin front end. Port watching, image scanning and the flash
//! job itself live in `fwflasher-flash`, which hands snapshots and job
//! output back over channels; the CLI only renders them.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, ConfigCommands};
use fwflasher_core::Config;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match &cli.command {
        Commands::Ports => commands::ports::cmd_ports(),
        Commands::Watch { duration } => commands::ports::cmd_watch(config(&cli), *duration),
        Commands::List => commands::catalog::cmd_list(config(&cli)),
        Commands::Flash {
            port,
            bootloader,
            partitions,
            ota_data,
            app,
        } => commands::flash::cmd_flash(
            config(&cli),
            port.as_deref(),
            &commands::flash::BrowsedImages {
                bootloader: bootloader.clone(),
                partitions: partitions.clone(),
                ota_data: ota_data.clone(),
                app: app.clone(),
            },
        ),
        Commands::Chips => {
            commands::chips::list_chips();
            Ok(())
        }
        // Must work even when the existing file is broken, so no config load
        Commands::Config(ConfigCommands::Init { output, force }) => {
            commands::config::cmd_init(output, *force)
        }
        Commands::Config(ConfigCommands::Show) => commands::config::cmd_show(&config(&cli)),
    }
}

/// Effective configuration, exiting on error
fn config(cli: &Cli) -> Config {
    match load_config(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

/// Load the config file and apply command-line overrides
fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = Config::load(cli.config.as_deref())?;

    if let Some(chip) = &cli.chip {
        config.target.chip = chip.clone();
    }
    if let Some(baud) = cli.baud {
        config.target.baud = baud;
    }
    if let Some(dir) = &cli.bin_dir {
        config.catalog.directory = dir.clone();
    }
    if let Some(tool) = &cli.tool {
        config.tool.program = tool.clone();
    }

    config.validate()?;
    log::debug!(
        "Target {} at {} baud, images from {}",
        config.target.chip,
        config.target.baud,
        config.catalog.directory.display()
    );
    Ok(config)
}
