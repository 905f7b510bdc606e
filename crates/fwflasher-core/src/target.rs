//! Chip targets and flash offset tables
//!
//! Each supported chip family places the four images at fixed addresses.
//! The table is compiled in; only the chip id is configurable.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::image::ImageRole;

/// Flash offsets for each image role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashLayout {
    /// Bootloader offset
    pub bootloader: u32,
    /// Partition table offset
    pub partition_table: u32,
    /// OTA data offset
    pub ota_data: u32,
    /// Application offset
    pub application: u32,
}

impl FlashLayout {
    /// Create a layout
    pub const fn new(bootloader: u32, partition_table: u32, ota_data: u32, application: u32) -> Self {
        Self {
            bootloader,
            partition_table,
            ota_data,
            application,
        }
    }

    /// Offset for a role
    pub fn offset(&self, role: ImageRole) -> u32 {
        match role {
            ImageRole::Bootloader => self.bootloader,
            ImageRole::PartitionTable => self.partition_table,
            ImageRole::OtaData => self.ota_data,
            ImageRole::Application => self.application,
        }
    }
}

/// A supported chip
#[derive(Debug, Clone, Copy)]
pub struct ChipInfo {
    /// Identifier passed to esptool's `--chip`
    pub id: &'static str,
    /// Marketing name
    pub name: &'static str,
    /// Image offsets
    pub layout: FlashLayout,
}

const LAYOUT_BOOT_0X1000: FlashLayout = FlashLayout::new(0x1000, 0x8000, 0xe000, 0x10000);
const LAYOUT_BOOT_0X0: FlashLayout = FlashLayout::new(0x0, 0x8000, 0xe000, 0x10000);
const LAYOUT_BOOT_0X2000: FlashLayout = FlashLayout::new(0x2000, 0x8000, 0xe000, 0x10000);

/// Known chips
pub const CHIPS: &[ChipInfo] = &[
    ChipInfo { id: "esp32", name: "ESP32", layout: LAYOUT_BOOT_0X1000 },
    ChipInfo { id: "esp32s2", name: "ESP32-S2", layout: LAYOUT_BOOT_0X1000 },
    ChipInfo { id: "esp32s3", name: "ESP32-S3", layout: LAYOUT_BOOT_0X0 },
    ChipInfo { id: "esp32c2", name: "ESP32-C2", layout: LAYOUT_BOOT_0X0 },
    ChipInfo { id: "esp32c3", name: "ESP32-C3", layout: LAYOUT_BOOT_0X0 },
    ChipInfo { id: "esp32c6", name: "ESP32-C6", layout: LAYOUT_BOOT_0X0 },
    ChipInfo { id: "esp32h2", name: "ESP32-H2", layout: LAYOUT_BOOT_0X0 },
    ChipInfo { id: "esp32c5", name: "ESP32-C5", layout: LAYOUT_BOOT_0X2000 },
    ChipInfo { id: "esp32p4", name: "ESP32-P4", layout: LAYOUT_BOOT_0X2000 },
];

/// Look up a chip by id, ignoring case and dashes ("ESP32-C3" == "esp32c3")
pub fn find_chip(id: &str) -> Option<&'static ChipInfo> {
    let wanted: String = id
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    CHIPS.iter().find(|chip| chip.id == wanted)
}

/// esptool connection and write_flash settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChipTarget {
    /// Chip id (see [`CHIPS`])
    pub chip: String,
    /// Serial baud rate
    pub baud: u32,
    /// Reset mode before connecting
    pub before: String,
    /// Reset mode after flashing
    pub after: String,
    /// `--flash-mode`
    pub flash_mode: String,
    /// `--flash-freq`
    pub flash_freq: String,
    /// `--flash-size`
    pub flash_size: String,
    /// Compress data in transfer (`-z`)
    pub compress: bool,
}

impl Default for ChipTarget {
    fn default() -> Self {
        Self {
            chip: "esp32c3".to_string(),
            baud: 921_600,
            before: "default-reset".to_string(),
            after: "hard-reset".to_string(),
            flash_mode: "keep".to_string(),
            flash_freq: "keep".to_string(),
            flash_size: "keep".to_string(),
            compress: true,
        }
    }
}

impl ChipTarget {
    /// Chip table entry for this target
    pub fn chip_info(&self) -> Result<&'static ChipInfo> {
        find_chip(&self.chip).ok_or_else(|| Error::UnknownChip(self.chip.clone()))
    }

    /// Offset table for this target
    pub fn layout(&self) -> Result<FlashLayout> {
        Ok(self.chip_info()?.layout)
    }
}
