//! Flash selections and their validation

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::catalog::RoleSelection;
use crate::error::SelectionError;
use crate::image::{BinaryEntry, ImageRole};
use crate::port::{Port, PortSet};

/// What the operator picked: a port and one image per role
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlashSelection {
    /// Target port
    pub port: Option<Port>,
    /// Chosen image per role
    pub images: BTreeMap<ImageRole, BinaryEntry>,
}

impl FlashSelection {
    /// Create an empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a per-role choice
    pub fn from_roles(port: Option<Port>, chosen: &RoleSelection) -> Self {
        let images = chosen
            .iter()
            .map(|(role, path)| (role, BinaryEntry::new(path, role)))
            .collect();
        Self { port, images }
    }

    /// Set the target port
    pub fn with_port(mut self, port: Port) -> Self {
        self.port = Some(port);
        self
    }

    /// Choose a file for a role
    pub fn with_image(mut self, role: ImageRole, path: impl Into<PathBuf>) -> Self {
        self.images.insert(role, BinaryEntry::new(path, role));
        self
    }

    /// Check the selection against the current port snapshot
    ///
    /// Every role must be chosen and the port must be attached right now.
    pub fn validate(&self, ports: &PortSet) -> Result<FlashPlan, SelectionError> {
        let port = self.port.as_ref().ok_or(SelectionError::MissingPort)?;

        let images = ImageRole::ALL
            .iter()
            .map(|role| {
                self.images
                    .get(role)
                    .cloned()
                    .ok_or(SelectionError::MissingImage(*role))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let port = ports
            .get(&port.id)
            .cloned()
            .ok_or_else(|| SelectionError::UnknownPort(port.id.clone()))?;

        Ok(FlashPlan { port, images })
    }
}

/// A validated selection, ready to become a tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashPlan {
    /// Port as found in the snapshot
    pub port: Port,
    /// One entry per role, in role order
    pub images: Vec<BinaryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ports() -> PortSet {
        PortSet::from_ports([Port::new("/dev/ttyUSB0", "CP2102")])
    }

    fn full() -> FlashSelection {
        FlashSelection::new()
            .with_port(Port::new("/dev/ttyUSB0", ""))
            .with_image(ImageRole::Bootloader, "boot.bin")
            .with_image(ImageRole::PartitionTable, "part.bin")
            .with_image(ImageRole::OtaData, "ota.bin")
            .with_image(ImageRole::Application, "app.bin")
    }

    #[test]
    fn test_validate_ok() {
        let plan = full().validate(&ports()).unwrap();
        assert_eq!(plan.port.label, "CP2102");
        let roles: Vec<_> = plan.images.iter().map(|e| e.role).collect();
        assert_eq!(roles, ImageRole::ALL);
    }

    #[test]
    fn test_validate_missing_role() {
        for role in ImageRole::ALL {
            let mut selection = full();
            selection.images.remove(&role);
            assert_eq!(
                selection.validate(&ports()),
                Err(SelectionError::MissingImage(role))
            );
        }
    }

    #[test]
    fn test_validate_missing_port() {
        let mut selection = full();
        selection.port = None;
        assert_eq!(selection.validate(&ports()), Err(SelectionError::MissingPort));
    }

    #[test]
    fn test_validate_unknown_port() {
        let selection = full().with_port(Port::new("/dev/ttyACM9", ""));
        assert_eq!(
            selection.validate(&ports()),
            Err(SelectionError::UnknownPort("/dev/ttyACM9".to_string()))
        );
    }

    #[test]
    fn test_from_roles() {
        let mut chosen = RoleSelection::new();
        chosen.set(ImageRole::Application, "/srv/fw/app.bin");
        let selection = FlashSelection::from_roles(None, &chosen);
        assert_eq!(selection.images.len(), 1);
        assert_eq!(
            selection.images[&ImageRole::Application].path,
            PathBuf::from("/srv/fw/app.bin")
        );
    }
}
