//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fwflasher")]
#[command(author, version, about = "ESP firmware flasher", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ./fwflasher.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the firmware images
    #[arg(long, global = true)]
    pub bin_dir: Option<PathBuf>,

    /// Target chip (e.g. esp32, esp32c3, esp32s3)
    #[arg(long, global = true)]
    pub chip: Option<String>,

    /// Serial baud rate
    #[arg(long, global = true)]
    pub baud: Option<u32>,

    /// Flashing tool to run (e.g. esptool.py, esptool)
    #[arg(long, global = true)]
    pub tool: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List attached serial ports
    Ports,

    /// Watch for serial ports being attached or removed
    Watch {
        /// Stop after this many seconds (runs until interrupted otherwise)
        #[arg(short, long)]
        duration: Option<u64>,
    },

    /// List firmware images found in the image directory
    List,

    /// Flash bootloader, partition table, OTA data and application
    Flash {
        /// Serial port (defaults to the first attached port)
        #[arg(short, long)]
        port: Option<String>,

        /// Bootloader image
        #[arg(long)]
        bootloader: Option<PathBuf>,

        /// Partition table image
        #[arg(long)]
        partitions: Option<PathBuf>,

        /// OTA data image (boot_app0)
        #[arg(long)]
        ota_data: Option<PathBuf>,

        /// Application image
        #[arg(long)]
        app: Option<PathBuf>,
    },

    /// List supported chips and their flash offsets
    Chips,

    /// Configuration file operations
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Config-related subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a config file with the default settings
    Init {
        /// Output path
        #[arg(short, long, default_value = "fwflasher.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}
