//! Serial port watcher
//!
//! A background thread polls a [`DeviceRegistry`] on a fixed interval and
//! publishes the new [`PortSet`] whenever the set of device identifiers
//! changes. Unchanged polls publish nothing.
//!
//! Stopping is cooperative: the stop flag is checked at the top of each
//! cycle, so the thread exits within one interval of [`PortWatcher::stop`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use fwflasher_core::{DeviceRegistry, PortSet};

use crate::error::{Error, Result};
use crate::subscribers::Subscribers;

struct Shared {
    registry: Box<dyn DeviceRegistry>,
    /// Serializes poll cycles; held across enumeration
    poll: Mutex<()>,
    /// Latest snapshot; only ever held briefly
    current: Mutex<PortSet>,
    subscribers: Subscribers<PortSet>,
    running: AtomicBool,
}

impl Shared {
    fn current(&self) -> MutexGuard<'_, PortSet> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// One poll cycle; returns true if a change was published
    fn poll(&self) -> bool {
        // Concurrent polls must not publish out of order
        let _poll = self.poll.lock().unwrap_or_else(PoisonError::into_inner);

        let previous = self.current().clone();
        let next = self.registry.snapshot(&previous);

        let changed = {
            let mut current = self.current();
            let changed = !next.same_devices(&current);
            // Labels may change without a device change; store them silently
            *current = next.clone();
            changed
        };
        if !changed {
            return false;
        }

        log::info!(
            "Serial ports changed: [{}]",
            next.iter()
                .map(|port| port.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.subscribers.publish(next);
        true
    }
}

/// Polls for serial port changes
pub struct PortWatcher {
    shared: Arc<Shared>,
    interval: Duration,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl PortWatcher {
    /// Create a stopped watcher
    pub fn new(registry: impl DeviceRegistry + 'static, interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Box::new(registry),
                poll: Mutex::new(()),
                current: Mutex::new(PortSet::new()),
                subscribers: Subscribers::new(),
                running: AtomicBool::new(false),
            }),
            interval,
            thread: Mutex::new(None),
        }
    }

    /// Poll interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Latest observed snapshot
    pub fn ports(&self) -> PortSet {
        self.shared.current().clone()
    }

    /// Receive every future change
    pub fn subscribe(&self) -> Receiver<PortSet> {
        self.shared.subscribers.subscribe()
    }

    /// Run one poll cycle on the calling thread
    ///
    /// Returns true if the port set changed (and a change was published).
    pub fn poll_now(&self) -> bool {
        self.shared.poll()
    }

    /// Check if the polling thread is running
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Start the polling thread; does nothing if already running
    pub fn start(&self) -> Result<()> {
        let mut thread = self.thread.lock().unwrap_or_else(PoisonError::into_inner);
        if thread.is_some() {
            return Ok(());
        }

        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let interval = self.interval;
        let handle = thread::Builder::new()
            .name("port-watcher".to_string())
            .spawn(move || {
                log::debug!("Port watcher started ({:?} interval)", interval);
                while shared.running.load(Ordering::Acquire) {
                    shared.poll();
                    thread::sleep(interval);
                }
                log::debug!("Port watcher stopped");
            })
            .map_err(|source| {
                self.shared.running.store(false, Ordering::Release);
                Error::Thread {
                    what: "port watcher",
                    source,
                }
            })?;

        *thread = Some(handle);
        Ok(())
    }

    /// Stop the polling thread and wait for it to exit
    ///
    /// Returns within one poll interval.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Release);
        let handle = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("Port watcher thread panicked");
            }
        }
    }
}

impl Drop for PortWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use fwflasher_core::{Error as CoreError, Port};
    use std::time::Instant;

    /// In-memory registry whose answer can be changed between polls
    #[derive(Clone, Default)]
    pub(crate) struct FakeRegistry {
        ports: Arc<Mutex<Option<Vec<Port>>>>,
    }

    impl FakeRegistry {
        pub(crate) fn with_ports(ids: &[&str]) -> Self {
            let registry = Self::default();
            registry.set(ids);
            registry
        }

        pub(crate) fn set(&self, ids: &[&str]) {
            self.set_ports(ids.iter().map(|id| Port::new(*id, "test")).collect());
        }

        pub(crate) fn set_ports(&self, ports: Vec<Port>) {
            *self.ports.lock().unwrap() = Some(ports);
        }

        /// Make enumeration fail until the next `set`
        pub(crate) fn fail(&self) {
            *self.ports.lock().unwrap() = None;
        }
    }

    impl DeviceRegistry for FakeRegistry {
        fn enumerate(&self) -> fwflasher_core::Result<Vec<Port>> {
            self.ports
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| CoreError::Io(std::io::Error::other("enumeration failed")))
        }
    }

    #[test]
    fn test_publishes_only_on_change() {
        let registry = FakeRegistry::with_ports(&["/dev/ttyUSB0"]);
        let watcher = PortWatcher::new(registry.clone(), Duration::from_millis(10));
        let rx = watcher.subscribe();

        assert!(watcher.poll_now());
        assert!(!watcher.poll_now());
        assert!(!watcher.poll_now());

        registry.set(&["/dev/ttyUSB0", "/dev/ttyACM0"]);
        assert!(watcher.poll_now());
        assert!(!watcher.poll_now());

        registry.set(&["/dev/ttyACM0"]);
        assert!(watcher.poll_now());

        let events: Vec<Vec<String>> = rx
            .try_iter()
            .map(|set| set.iter().map(|p| p.id.clone()).collect())
            .collect();
        assert_eq!(
            events,
            vec![
                vec!["/dev/ttyUSB0".to_string()],
                vec!["/dev/ttyUSB0".to_string(), "/dev/ttyACM0".to_string()],
                vec!["/dev/ttyACM0".to_string()],
            ]
        );
    }

    #[test]
    fn test_label_change_is_not_a_change() {
        let registry = FakeRegistry::default();
        registry.set_ports(vec![Port::new("COM3", "USB Serial")]);
        let watcher = PortWatcher::new(registry.clone(), Duration::from_millis(10));
        let rx = watcher.subscribe();
        assert!(watcher.poll_now());

        registry.set_ports(vec![Port::new("COM3", "CP2102 USB to UART")]);
        assert!(!watcher.poll_now());
        assert_eq!(rx.try_iter().count(), 1);
        assert_eq!(watcher.ports().get("COM3").unwrap().label, "CP2102 USB to UART");
    }

    #[test]
    fn test_enumeration_error_keeps_snapshot() {
        let registry = FakeRegistry::with_ports(&["/dev/ttyUSB0"]);
        let watcher = PortWatcher::new(registry.clone(), Duration::from_millis(10));
        let rx = watcher.subscribe();
        watcher.poll_now();

        registry.fail();
        assert!(!watcher.poll_now());
        assert!(watcher.ports().contains("/dev/ttyUSB0"));
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_thread_notices_changes_and_stops_promptly() {
        let registry = FakeRegistry::with_ports(&["/dev/ttyUSB0"]);
        let watcher = PortWatcher::new(registry.clone(), Duration::from_millis(20));
        let rx = watcher.subscribe();
        watcher.start().unwrap();
        assert!(watcher.is_running());

        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(first.contains("/dev/ttyUSB0"));

        registry.set(&["/dev/ttyUSB1"]);
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(second.contains("/dev/ttyUSB1"));

        let started = Instant::now();
        watcher.stop();
        assert!(!watcher.is_running());
        assert!(started.elapsed() < Duration::from_secs(2));

        // No more polling after stop
        registry.set(&["/dev/ttyUSB2"]);
        thread::sleep(Duration::from_millis(60));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_start_is_idempotent() {
        let watcher = PortWatcher::new(FakeRegistry::default(), Duration::from_millis(10));
        watcher.start().unwrap();
        watcher.start().unwrap();
        watcher.stop();
        watcher.stop();
    }

    struct SlowRegistry {
        delay: Duration,
    }

    impl DeviceRegistry for SlowRegistry {
        fn enumerate(&self) -> fwflasher_core::Result<Vec<Port>> {
            thread::sleep(self.delay);
            Ok(vec![Port::new("/dev/ttyUSB0", "slow")])
        }
    }

    #[test]
    fn test_snapshot_readable_during_enumeration() {
        let watcher = Arc::new(PortWatcher::new(
            SlowRegistry {
                delay: Duration::from_millis(800),
            },
            Duration::from_millis(10),
        ));

        let poller = {
            let watcher = Arc::clone(&watcher);
            thread::spawn(move || watcher.poll_now())
        };
        // Let the poller get into enumerate()
        thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        let ports = watcher.ports();
        assert!(started.elapsed() < Duration::from_millis(100));
        assert!(ports.is_empty());

        assert!(poller.join().unwrap());
        assert!(watcher.ports().contains("/dev/ttyUSB0"));
    }
}
