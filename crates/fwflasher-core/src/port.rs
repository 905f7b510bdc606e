//! Serial port snapshots
//!
//! A [`PortSet`] is an immutable point-in-time listing of attached serial
//! devices. Two sets describe the same devices when their identifiers match;
//! labels are informational only.

use std::collections::BTreeSet;
use std::fmt;

/// An attached serial device
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Port {
    /// Device path (e.g., "/dev/ttyUSB0" or "COM3")
    pub id: String,
    /// Human-readable description
    pub label: String,
}

impl Port {
    /// Create a new port
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.label.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} - {}", self.id, self.label)
        }
    }
}

/// Ports in enumeration order, unique by identifier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortSet {
    ports: Vec<Port>,
}

impl PortSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set, keeping the first port seen for each identifier
    pub fn from_ports(ports: impl IntoIterator<Item = Port>) -> Self {
        let mut seen = BTreeSet::new();
        let ports = ports
            .into_iter()
            .filter(|port| seen.insert(port.id.clone()))
            .collect();
        Self { ports }
    }

    /// Ports in enumeration order
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Number of ports
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// Check if no ports are attached
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Look up a port by identifier
    pub fn get(&self, id: &str) -> Option<&Port> {
        self.ports.iter().find(|port| port.id == id)
    }

    /// Check if a port with this identifier is attached
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Identifier set used for change detection
    pub fn ids(&self) -> BTreeSet<&str> {
        self.ports.iter().map(|port| port.id.as_str()).collect()
    }

    /// Check if both snapshots list the same device identifiers
    pub fn same_devices(&self, other: &PortSet) -> bool {
        self.ids() == other.ids()
    }

    /// Iterate over ports
    pub fn iter(&self) -> std::slice::Iter<'_, Port> {
        self.ports.iter()
    }
}

impl<'a> IntoIterator for &'a PortSet {
    type Item = &'a Port;
    type IntoIter = std::slice::Iter<'a, Port>;

    fn into_iter(self) -> Self::IntoIter {
        self.ports.iter()
    }
}
