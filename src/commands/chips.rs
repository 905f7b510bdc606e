//! Chip listing

use fwflasher_core::{ImageRole, CHIPS};

/// List all supported chips with their image offsets
pub fn list_chips() {
    println!("Supported chips:");
    println!();
    println!(
        "{:<10} {:<10} {:>10} {:>10} {:>10} {:>12}",
        "Chip", "Name", "Bootloader", "Partitions", "OTA Data", "Application"
    );
    println!("{}", "-".repeat(67));

    for chip in CHIPS {
        let offset = |role| format!("{:#x}", chip.layout.offset(role));
        println!(
            "{:<10} {:<10} {:>10} {:>10} {:>10} {:>12}",
            chip.id,
            chip.name,
            offset(ImageRole::Bootloader),
            offset(ImageRole::PartitionTable),
            offset(ImageRole::OtaData),
            offset(ImageRole::Application),
        );
    }
}
