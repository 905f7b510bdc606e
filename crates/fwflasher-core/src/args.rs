//! esptool argument construction
//!
//! Produces the argument vector for one `write_flash` run:
//!
//! ```text
//! --chip <chip> --port <port> --baud <baud> --before <mode> --after <mode>
//! write_flash --flash-mode <m> --flash-freq <f> --flash-size <s> [-z]
//! <offset> <image> <offset> <image> ...
//! ```
//!
//! Offset/image pairs are sorted by ascending offset and image paths are made
//! absolute, so the tool does not depend on the working directory.

use std::ffi::OsString;

use crate::error::Result;
use crate::selection::FlashPlan;
use crate::target::ChipTarget;

/// Build the esptool arguments for a validated plan
pub fn build_args(plan: &FlashPlan, target: &ChipTarget) -> Result<Vec<OsString>> {
    let chip = target.chip_info()?;
    let layout = chip.layout;

    let mut pairs = plan
        .images
        .iter()
        .map(|entry| Ok((layout.offset(entry.role), std::path::absolute(&entry.path)?)))
        .collect::<Result<Vec<_>>>()?;
    pairs.sort_by_key(|(offset, _)| *offset);

    let mut args: Vec<OsString> = [
        "--chip",
        chip.id,
        "--port",
        plan.port.id.as_str(),
        "--baud",
        &target.baud.to_string(),
        "--before",
        target.before.as_str(),
        "--after",
        target.after.as_str(),
        "write_flash",
        "--flash-mode",
        target.flash_mode.as_str(),
        "--flash-freq",
        target.flash_freq.as_str(),
        "--flash-size",
        target.flash_size.as_str(),
    ]
    .into_iter()
    .map(OsString::from)
    .collect();

    if target.compress {
        args.push("-z".into());
    }

    for (offset, path) in pairs {
        args.push(format!("{:#x}", offset).into());
        args.push(path.into_os_string());
    }

    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageRole;
    use crate::port::{Port, PortSet};
    use crate::selection::FlashSelection;

    fn plan() -> FlashPlan {
        // Deliberately inserted out of offset order
        FlashSelection::new()
            .with_port(Port::new("/dev/ttyUSB0", ""))
            .with_image(ImageRole::Application, "app.bin")
            .with_image(ImageRole::OtaData, "ota.bin")
            .with_image(ImageRole::Bootloader, "boot.bin")
            .with_image(ImageRole::PartitionTable, "part.bin")
            .validate(&PortSet::from_ports([Port::new("/dev/ttyUSB0", "CP2102")]))
            .unwrap()
    }

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_header() {
        let args = strings(&build_args(&plan(), &ChipTarget::default()).unwrap());
        assert_eq!(
            &args[..18],
            [
                "--chip",
                "esp32c3",
                "--port",
                "/dev/ttyUSB0",
                "--baud",
                "921600",
                "--before",
                "default-reset",
                "--after",
                "hard-reset",
                "write_flash",
                "--flash-mode",
                "keep",
                "--flash-freq",
                "keep",
                "--flash-size",
                "keep",
                "-z",
            ]
        );
    }

    #[test]
    fn test_pairs_sorted_by_offset() {
        let args = strings(&build_args(&plan(), &ChipTarget::default()).unwrap());
        let pairs = &args[18..];
        assert_eq!(pairs.len(), 8);

        let offsets: Vec<&str> = pairs.iter().step_by(2).map(String::as_str).collect();
        assert_eq!(offsets, ["0x0", "0x8000", "0xe000", "0x10000"]);

        let files: Vec<&str> = pairs
            .iter()
            .skip(1)
            .step_by(2)
            .map(|p| p.rsplit(std::path::MAIN_SEPARATOR).next().unwrap())
            .collect();
        assert_eq!(files, ["boot.bin", "part.bin", "ota.bin", "app.bin"]);
        assert!(pairs
            .iter()
            .skip(1)
            .step_by(2)
            .all(|p| std::path::Path::new(p).is_absolute()));
    }

    #[test]
    fn test_no_compress_and_chip_offsets() {
        let target = ChipTarget {
            chip: "esp32".to_string(),
            compress: false,
            baud: 115_200,
            ..Default::default()
        };
        let args = strings(&build_args(&plan(), &target).unwrap());
        assert!(!args.contains(&"-z".to_string()));
        assert_eq!(args[5], "115200");
        assert_eq!(args[17], "0x1000");
    }

    #[test]
    fn test_chip_id_is_canonical() {
        let target = ChipTarget {
            chip: "ESP32-C3".to_string(),
            ..Default::default()
        };
        let args = strings(&build_args(&plan(), &target).unwrap());
        assert_eq!(args[1], "esp32c3");

        let target = ChipTarget {
            chip: "esp32_s3".to_string(),
            ..Default::default()
        };
        let args = strings(&build_args(&plan(), &target).unwrap());
        assert_eq!(args[1], "esp32s3");
    }
}
