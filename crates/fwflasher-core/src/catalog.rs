//! Firmware image catalog
//!
//! [`BinaryCatalog`] watches one directory. Each [`scan`](BinaryCatalog::scan)
//! replaces the published [`Catalog`] snapshot with a fresh, classified
//! listing. Files picked by hand elsewhere on disk can be registered into a
//! role with [`register_browsed`](BinaryCatalog::register_browsed); they are
//! listed ahead of scanned files and survive rescans while they still exist.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::CatalogSettings;
use crate::error::{Error, Result};
use crate::image::{BinaryEntry, Classifier, ImageRole};

/// Classified image lists, one ordered list per role
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: BTreeMap<ImageRole, Vec<BinaryEntry>>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries for a role, in listing order
    pub fn entries(&self, role: ImageRole) -> &[BinaryEntry] {
        self.entries.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Append an entry to its role's list
    pub fn push(&mut self, entry: BinaryEntry) {
        self.entries.entry(entry.role).or_default().push(entry);
    }

    /// Put an entry at the front of its role's list, removing any older copy
    fn insert_front(&mut self, entry: BinaryEntry) {
        let list = self.entries.entry(entry.role).or_default();
        list.retain(|existing| existing.path != entry.path);
        list.insert(0, entry);
    }

    /// Check if a path is listed under a role
    pub fn contains(&self, role: ImageRole, path: &Path) -> bool {
        self.entries(role).iter().any(|entry| entry.path == path)
    }

    /// Total number of entries across all roles
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Check if no images are listed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over every role with its entries
    pub fn iter(&self) -> impl Iterator<Item = (ImageRole, &[BinaryEntry])> + '_ {
        ImageRole::ALL
            .into_iter()
            .map(move |role| (role, self.entries(role)))
    }

    /// Carry a previous selection over to this catalog
    ///
    /// Per role: keep the previous choice if it is still listed, otherwise
    /// fall back to the first entry, otherwise leave the role unselected.
    pub fn reconcile(&self, previous: &RoleSelection) -> RoleSelection {
        let mut next = RoleSelection::new();
        for (role, entries) in self.iter() {
            let kept = previous
                .get(role)
                .filter(|path| self.contains(role, path))
                .map(Path::to_path_buf);
            if let Some(path) = kept.or_else(|| entries.first().map(|e| e.path.clone())) {
                next.set(role, path);
            }
        }
        next
    }
}

/// The chosen file per role
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSelection {
    chosen: BTreeMap<ImageRole, PathBuf>,
}

impl RoleSelection {
    /// Create an empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Chosen path for a role
    pub fn get(&self, role: ImageRole) -> Option<&Path> {
        self.chosen.get(&role).map(PathBuf::as_path)
    }

    /// Choose a path for a role
    pub fn set(&mut self, role: ImageRole, path: impl Into<PathBuf>) {
        self.chosen.insert(role, path.into());
    }

    /// Clear a role's choice
    pub fn clear(&mut self, role: ImageRole) {
        self.chosen.remove(&role);
    }

    /// Check if every role has a choice
    pub fn is_complete(&self) -> bool {
        ImageRole::ALL.iter().all(|role| self.chosen.contains_key(role))
    }

    /// Iterate over chosen roles
    pub fn iter(&self) -> impl Iterator<Item = (ImageRole, &Path)> + '_ {
        self.chosen.iter().map(|(role, path)| (*role, path.as_path()))
    }
}

/// Directory-backed image catalog
#[derive(Debug, Clone)]
pub struct BinaryCatalog {
    directory: PathBuf,
    extension: String,
    classifier: Classifier,
    /// Browsed entries, most recent first
    browsed: Vec<BinaryEntry>,
    catalog: Catalog,
}

impl BinaryCatalog {
    /// Create a catalog for a directory
    ///
    /// `extension` may be given with or without the leading dot.
    pub fn new(directory: impl Into<PathBuf>, extension: &str, classifier: Classifier) -> Self {
        Self {
            directory: directory.into(),
            extension: extension.trim_start_matches('.').to_string(),
            classifier,
            browsed: Vec::new(),
            catalog: Catalog::new(),
        }
    }

    /// Create a catalog from the `[catalog]` config section
    pub fn from_settings(settings: &CatalogSettings) -> Self {
        Self::new(
            &settings.directory,
            &settings.extension,
            Classifier::new(settings.classify_ota_data),
        )
    }

    /// Watched directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Classifier in use
    pub fn classifier(&self) -> Classifier {
        self.classifier
    }

    /// Most recently published snapshot
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Rescan the directory and publish a new snapshot
    ///
    /// The directory is created if it does not exist yet. Only regular files
    /// whose name ends in the configured extension are listed, sorted by
    /// file name so repeated scans of an unchanged directory agree.
    pub fn scan(&mut self) -> Result<Catalog> {
        let dir_err = |source| Error::ImageDirectory {
            path: self.directory.clone(),
            source,
        };

        fs::create_dir_all(&self.directory).map_err(dir_err)?;
        let dir = std::path::absolute(&self.directory).map_err(dir_err)?;

        let suffix = format!(".{}", self.extension);
        let mut found = Vec::new();
        for entry in fs::read_dir(&dir).map_err(dir_err)? {
            let path = entry.map_err(dir_err)?.path();
            let matches = path
                .file_name()
                .is_some_and(|name| name.to_string_lossy().ends_with(&suffix));
            if matches && path.is_file() {
                found.push(path);
            }
        }
        found.sort();

        let mut catalog = Catalog::new();
        for path in found {
            let role = self.classifier.classify_path(&path);
            catalog.push(BinaryEntry::new(path, role));
        }

        self.browsed.retain(|entry| entry.path.is_file());
        for entry in self.browsed.iter().rev() {
            catalog.insert_front(entry.clone());
        }

        log::debug!(
            "Scanned {}: {} image(s)",
            dir.display(),
            catalog.len()
        );

        self.catalog = catalog.clone();
        Ok(catalog)
    }

    /// Register a file picked outside the directory scan
    ///
    /// With `role == None` the role is inferred from the file name. The file
    /// does not need to live in the watched directory or carry the image
    /// extension.
    pub fn register_browsed(&mut self, path: &Path, role: Option<ImageRole>) -> Result<Catalog> {
        let path = std::path::absolute(path)?;
        let role = role.unwrap_or_else(|| self.classifier.classify_path(&path));
        let entry = BinaryEntry::new(path, role);

        log::debug!("Registered {} as {}", entry.path.display(), role);

        self.browsed
            .retain(|e| !(e.path == entry.path && e.role == entry.role));
        self.browsed.insert(0, entry.clone());
        self.catalog.insert_front(entry);
        Ok(self.catalog.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"\xe9").unwrap();
        path
    }

    fn names(catalog: &Catalog, role: ImageRole) -> Vec<String> {
        catalog.entries(role).iter().map(BinaryEntry::file_name).collect()
    }

    #[test]
    fn test_scan_creates_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("bin");
        let mut cat = BinaryCatalog::new(&dir, "bin", Classifier::default());

        let snapshot = cat.scan().unwrap();
        assert!(dir.is_dir());
        assert!(snapshot.is_empty());

        // Second scan with the directory present is fine too
        assert!(cat.scan().unwrap().is_empty());
    }

    #[test]
    fn test_scan_classifies_and_filters() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        touch(dir, "firmware.bin");
        touch(dir, "bootloader.bin");
        touch(dir, "partitions.bin");
        touch(dir, "boot_app0.bin");
        touch(dir, "notes.txt");
        touch(dir, "app.BIN");
        fs::create_dir(dir.join("old.bin")).unwrap();

        let mut cat = BinaryCatalog::new(dir, ".bin", Classifier::default());
        let snapshot = cat.scan().unwrap();

        assert_eq!(names(&snapshot, ImageRole::Bootloader), ["bootloader.bin"]);
        assert_eq!(names(&snapshot, ImageRole::PartitionTable), ["partitions.bin"]);
        assert_eq!(names(&snapshot, ImageRole::OtaData), ["boot_app0.bin"]);
        assert_eq!(names(&snapshot, ImageRole::Application), ["firmware.bin"]);
        assert_eq!(snapshot.len(), 4);
        assert!(snapshot
            .entries(ImageRole::Application)
            .iter()
            .all(|e| e.path.is_absolute()));
    }

    #[test]
    fn test_scan_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        for name in ["b_app.bin", "a_app.bin", "bootloader_partition.bin", "c_partition.bin"] {
            touch(tmp.path(), name);
        }
        let mut cat = BinaryCatalog::new(tmp.path(), "bin", Classifier::default());
        let first = cat.scan().unwrap();
        let second = cat.scan().unwrap();
        assert_eq!(first, second);
        assert_eq!(names(&first, ImageRole::Application), ["a_app.bin", "b_app.bin"]);
        assert_eq!(names(&first, ImageRole::Bootloader), ["bootloader_partition.bin"]);
        assert_eq!(names(&first, ImageRole::PartitionTable), ["c_partition.bin"]);
    }

    #[test]
    fn test_register_browsed_goes_first_and_survives_rescan() {
        let tmp = TempDir::new().unwrap();
        let watched = tmp.path().join("bin");
        fs::create_dir(&watched).unwrap();
        touch(&watched, "app.bin");
        let elsewhere = touch(tmp.path(), "custom.img");

        let mut cat = BinaryCatalog::new(&watched, "bin", Classifier::default());
        cat.scan().unwrap();
        let snapshot = cat
            .register_browsed(&elsewhere, Some(ImageRole::Application))
            .unwrap();
        assert_eq!(names(&snapshot, ImageRole::Application), ["custom.img", "app.bin"]);

        let rescanned = cat.scan().unwrap();
        assert_eq!(names(&rescanned, ImageRole::Application), ["custom.img", "app.bin"]);

        fs::remove_file(&elsewhere).unwrap();
        let rescanned = cat.scan().unwrap();
        assert_eq!(names(&rescanned, ImageRole::Application), ["app.bin"]);
    }

    #[test]
    fn test_register_browsed_infers_role() {
        let tmp = TempDir::new().unwrap();
        let file = touch(tmp.path(), "my_bootloader.bin");
        let mut cat = BinaryCatalog::new(tmp.path().join("bin"), "bin", Classifier::default());
        let snapshot = cat.register_browsed(&file, None).unwrap();
        assert_eq!(names(&snapshot, ImageRole::Bootloader), ["my_bootloader.bin"]);
    }

    #[test]
    fn test_register_browsed_in_watched_dir_is_not_duplicated() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.bin");
        let b = touch(tmp.path(), "b.bin");
        let mut cat = BinaryCatalog::new(tmp.path(), "bin", Classifier::default());
        cat.scan().unwrap();
        cat.register_browsed(&b, None).unwrap();
        let snapshot = cat.scan().unwrap();
        assert_eq!(names(&snapshot, ImageRole::Application), ["b.bin", "a.bin"]);
    }

    #[test]
    fn test_reconcile_keeps_surviving_selection() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.bin");
        let b = touch(tmp.path(), "b.bin");
        touch(tmp.path(), "bootloader.bin");
        let mut cat = BinaryCatalog::new(tmp.path(), "bin", Classifier::default());
        let snapshot = cat.scan().unwrap();

        let mut previous = RoleSelection::new();
        previous.set(ImageRole::Application, std::path::absolute(&b).unwrap());
        previous.set(ImageRole::PartitionTable, tmp.path().join("gone.bin"));

        let next = snapshot.reconcile(&previous);
        assert_eq!(
            next.get(ImageRole::Application),
            Some(std::path::absolute(&b).unwrap().as_path())
        );
        assert!(next
            .get(ImageRole::Bootloader)
            .unwrap()
            .ends_with("bootloader.bin"));
        assert_eq!(next.get(ImageRole::PartitionTable), None);
        assert!(!next.is_complete());
    }

    #[test]
    fn test_reconcile_falls_back_to_first_entry() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.bin");
        let b = touch(tmp.path(), "b.bin");
        let mut cat = BinaryCatalog::new(tmp.path(), "bin", Classifier::default());
        cat.scan().unwrap();

        let mut previous = RoleSelection::new();
        previous.set(ImageRole::Application, std::path::absolute(&b).unwrap());
        fs::remove_file(&b).unwrap();

        let next = cat.scan().unwrap().reconcile(&previous);
        assert!(next.get(ImageRole::Application).unwrap().ends_with("a.bin"));
    }
}
