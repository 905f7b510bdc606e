//! Firmware image roles and filename classification
//!
//! Role inference is a filename heuristic, not a parser. Markers are tested
//! in a fixed priority order and the first hit wins:
//!
//! | priority | marker       | role            |
//! |----------|--------------|-----------------|
//! | 1        | `bootloader` | Bootloader      |
//! | 2        | `partition`  | PartitionTable  |
//! | 3        | `boot_app0`  | OtaData         |
//! | -        | (none)       | Application     |
//!
//! Matching is case-insensitive and only looks at the file name.

use std::fmt;
use std::path::{Path, PathBuf};

/// Functional category of a firmware image
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImageRole {
    /// Second-stage bootloader
    Bootloader,
    /// Partition table
    PartitionTable,
    /// OTA data partition initializer (boot_app0)
    OtaData,
    /// Application image
    Application,
}

impl ImageRole {
    /// All roles, in classification priority order
    pub const ALL: [ImageRole; 4] = [
        ImageRole::Bootloader,
        ImageRole::PartitionTable,
        ImageRole::OtaData,
        ImageRole::Application,
    ];

    /// Short machine-friendly name
    pub fn name(self) -> &'static str {
        match self {
            Self::Bootloader => "bootloader",
            Self::PartitionTable => "partitions",
            Self::OtaData => "ota-data",
            Self::Application => "application",
        }
    }

    /// Display label
    pub fn label(self) -> &'static str {
        match self {
            Self::Bootloader => "Bootloader",
            Self::PartitionTable => "Partitions",
            Self::OtaData => "OTA Data",
            Self::Application => "Application",
        }
    }

    /// Filename marker, `None` for the catch-all role
    fn marker(self) -> Option<&'static str> {
        match self {
            Self::Bootloader => Some("bootloader"),
            Self::PartitionTable => Some("partition"),
            Self::OtaData => Some("boot_app0"),
            Self::Application => None,
        }
    }
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Filename-based role classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classifier {
    /// Recognize `boot_app0` images as OTA data
    ///
    /// When off, such files fall through to [`ImageRole::Application`].
    pub ota_data: bool,
}

impl Default for Classifier {
    fn default() -> Self {
        Self { ota_data: true }
    }
}

impl Classifier {
    /// Create a classifier
    pub fn new(ota_data: bool) -> Self {
        Self { ota_data }
    }

    /// Classify a bare file name
    pub fn classify(&self, file_name: &str) -> ImageRole {
        let lower = file_name.to_lowercase();
        ImageRole::ALL
            .into_iter()
            .filter(|role| self.ota_data || *role != ImageRole::OtaData)
            .find(|role| role.marker().is_some_and(|marker| lower.contains(marker)))
            .unwrap_or(ImageRole::Application)
    }

    /// Classify by the final path component
    pub fn classify_path(&self, path: &Path) -> ImageRole {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();
        self.classify(&name)
    }
}

/// A firmware image file assigned to a role
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryEntry {
    /// Path to the image (absolute once catalogued)
    pub path: PathBuf,
    /// Assigned role
    pub role: ImageRole,
}

impl BinaryEntry {
    /// Create a new entry
    pub fn new(path: impl Into<PathBuf>, role: ImageRole) -> Self {
        Self {
            path: path.into(),
            role,
        }
    }

    /// File name for display
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_basic() {
        let c = Classifier::default();
        assert_eq!(c.classify("bootloader.bin"), ImageRole::Bootloader);
        assert_eq!(c.classify("partitions.bin"), ImageRole::PartitionTable);
        assert_eq!(c.classify("boot_app0.bin"), ImageRole::OtaData);
        assert_eq!(c.classify("firmware.bin"), ImageRole::Application);
    }

    #[test]
    fn test_classify_case_insensitive() {
        let c = Classifier::default();
        assert_eq!(c.classify("ESP32C3-Bootloader.BIN"), ImageRole::Bootloader);
        assert_eq!(c.classify("Partition-Table.bin"), ImageRole::PartitionTable);
        assert_eq!(c.classify("BOOT_APP0.bin"), ImageRole::OtaData);
    }

    #[test]
    fn test_classify_priority() {
        let c = Classifier::default();
        // bootloader beats everything
        assert_eq!(c.classify("bootloader_partition.bin"), ImageRole::Bootloader);
        assert_eq!(c.classify("partition_bootloader.bin"), ImageRole::Bootloader);
        assert_eq!(c.classify("boot_app0_bootloader.bin"), ImageRole::Bootloader);
        // partition beats boot_app0
        assert_eq!(c.classify("boot_app0-partition.bin"), ImageRole::PartitionTable);
    }

    #[test]
    fn test_classify_ota_disabled() {
        let c = Classifier::new(false);
        assert_eq!(c.classify("boot_app0.bin"), ImageRole::Application);
        assert_eq!(c.classify("boot_app0_partition.bin"), ImageRole::PartitionTable);
    }

    #[test]
    fn test_classify_uses_file_name_only() {
        let c = Classifier::default();
        assert_eq!(
            c.classify_path(Path::new("/home/me/bootloader-builds/app.bin")),
            ImageRole::Application
        );
        assert_eq!(
            c.classify_path(Path::new("out/partitions.bin")),
            ImageRole::PartitionTable
        );
    }
}
