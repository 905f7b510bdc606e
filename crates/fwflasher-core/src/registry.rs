//! Serial device enumeration
//!
//! [`DeviceRegistry`] is the seam between the watcher and the host. The
//! production implementation asks the `serialport` crate; tests plug in
//! in-memory registries.

use serialport::SerialPortType;

use crate::error::Result;
use crate::port::{Port, PortSet};

/// Source of attached serial devices
pub trait DeviceRegistry: Send + Sync {
    /// List the currently attached devices
    fn enumerate(&self) -> Result<Vec<Port>>;

    /// Take a snapshot, falling back to `previous` if enumeration fails
    ///
    /// Enumeration errors are logged and swallowed so that a flaky platform
    /// call never takes down a caller polling in a loop.
    fn snapshot(&self, previous: &PortSet) -> PortSet {
        match self.enumerate() {
            Ok(ports) => PortSet::from_ports(ports),
            Err(e) => {
                log::warn!("{}; keeping previous port list", e);
                previous.clone()
            }
        }
    }
}

/// Host serial ports via the `serialport` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialRegistry;

impl SerialRegistry {
    /// Create a registry backed by the host's serial port API
    pub fn new() -> Self {
        Self
    }
}

impl DeviceRegistry for SerialRegistry {
    fn enumerate(&self) -> Result<Vec<Port>> {
        let ports = serialport::available_ports()?;
        log::trace!("Enumerated {} serial port(s)", ports.len());
        Ok(ports
            .into_iter()
            .map(|info| Port::new(info.port_name, describe(&info.port_type)))
            .collect())
    }
}

/// Human-readable label for a port type
fn describe(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => usb_label(
            usb.product.as_deref(),
            usb.manufacturer.as_deref(),
            usb.vid,
            usb.pid,
        ),
        SerialPortType::PciPort => "PCI serial".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth serial".to_string(),
        SerialPortType::Unknown => "n/a".to_string(),
    }
}

fn usb_label(product: Option<&str>, manufacturer: Option<&str>, vid: u16, pid: u16) -> String {
    match (product, manufacturer) {
        (Some(product), _) => product.to_string(),
        (None, Some(manufacturer)) => format!("{} USB serial", manufacturer),
        (None, None) => format!("USB VID:PID={:04X}:{:04X}", vid, pid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FlakyRegistry {
        fail: AtomicBool,
    }

    impl DeviceRegistry for FlakyRegistry {
        fn enumerate(&self) -> Result<Vec<Port>> {
            if self.fail.load(Ordering::SeqCst) {
                Err(Error::Io(std::io::Error::other("udev went away")))
            } else {
                Ok(vec![Port::new("/dev/ttyACM0", "USB JTAG/serial debug unit")])
            }
        }
    }

    #[test]
    fn test_snapshot_keeps_previous_on_error() {
        let registry = FlakyRegistry {
            fail: AtomicBool::new(false),
        };
        let first = registry.snapshot(&PortSet::new());
        assert_eq!(first.len(), 1);

        registry.fail.store(true, Ordering::SeqCst);
        let second = registry.snapshot(&first);
        assert_eq!(second, first);
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            usb_label(Some("CP2102 USB to UART Bridge Controller"), Some("Silicon Labs"), 0x10c4, 0xea60),
            "CP2102 USB to UART Bridge Controller"
        );
        assert_eq!(
            usb_label(None, Some("Silicon Labs"), 0x10c4, 0xea60),
            "Silicon Labs USB serial"
        );
        assert_eq!(usb_label(None, None, 0x303a, 0x1001), "USB VID:PID=303A:1001");
        assert_eq!(describe(&SerialPortType::Unknown), "n/a");
    }
}
