//! The orchestrator
//!
//! Owns the port watcher and the image catalog, and admits at most one
//! flash job at a time. A submission while a job is running is rejected,
//! never queued. When a job ends the slot is released first, then the port
//! snapshot and the catalog are refreshed, then the job's `Finished` event
//! is published.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fwflasher_core::{
    BinaryCatalog, BinaryEntry, Catalog, Config, DeviceRegistry, FlashSelection, ImageRole,
    Port, PortSet, RoleSelection, SelectionError, SerialRegistry,
};

use crate::error::Result;
use crate::job::{FlashJob, JobHandle, JobId, JobOutcome};
use crate::subscribers::Subscribers;
use crate::watcher::PortWatcher;

struct CatalogState {
    catalog: BinaryCatalog,
    selection: RoleSelection,
}

struct Inner {
    config: Config,
    watcher: PortWatcher,
    catalog: Mutex<CatalogState>,
    catalog_subscribers: Subscribers<Catalog>,
    active: Mutex<Option<JobId>>,
    next_id: AtomicU64,
}

impl Inner {
    fn catalog_state(&self) -> MutexGuard<'_, CatalogState> {
        self.catalog.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn active(&self) -> MutexGuard<'_, Option<JobId>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn refresh_catalog(&self) -> Result<Catalog> {
        let mut state = self.catalog_state();
        let snapshot = state.catalog.scan()?;
        state.selection = snapshot.reconcile(&state.selection);
        self.catalog_subscribers.publish(snapshot.clone());
        Ok(snapshot)
    }

    fn after_job(&self, outcome: &JobOutcome) {
        log::debug!("Job {} finished, refreshing ports and catalog", outcome.id);
        self.watcher.poll_now();
        if let Err(e) = self.refresh_catalog() {
            log::warn!("Failed to rescan images after job {}: {}", outcome.id, e);
        }
    }
}

/// Holds the active-job slot; releases it when dropped
struct ActiveSlot {
    inner: Arc<Inner>,
    id: JobId,
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        let mut active = self.inner.active();
        if *active == Some(self.id) {
            *active = None;
        }
    }
}

/// Coordinates port watching, the image catalog and flash jobs
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    /// Create an orchestrator using the host's serial ports
    pub fn new(config: Config) -> Result<Self> {
        Self::with_registry(config, SerialRegistry::new())
    }

    /// Create an orchestrator with a custom device registry
    ///
    /// Takes an initial port snapshot and scans the image directory. The
    /// watcher thread is not started; call [`Orchestrator::start`] for that.
    pub fn with_registry(config: Config, registry: impl DeviceRegistry + 'static) -> Result<Self> {
        config.validate()?;

        let watcher = PortWatcher::new(registry, config.watcher.interval());
        watcher.poll_now();

        let mut catalog = BinaryCatalog::from_settings(&config.catalog);
        let snapshot = catalog.scan()?;
        let selection = snapshot.reconcile(&RoleSelection::new());

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                watcher,
                catalog: Mutex::new(CatalogState { catalog, selection }),
                catalog_subscribers: Subscribers::new(),
                active: Mutex::new(None),
                next_id: AtomicU64::new(1),
            }),
        })
    }

    /// Start watching for port changes in the background
    pub fn start(&self) -> Result<()> {
        self.inner.watcher.start()
    }

    /// Stop the port watcher; a running job is not affected
    pub fn shutdown(&self) {
        self.inner.watcher.stop();
    }

    /// Effective configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Latest port snapshot
    pub fn ports(&self) -> PortSet {
        self.inner.watcher.ports()
    }

    /// Latest catalog snapshot
    pub fn catalog(&self) -> Catalog {
        self.inner.catalog_state().catalog.catalog().clone()
    }

    /// Current per-role choice
    pub fn selection(&self) -> RoleSelection {
        self.inner.catalog_state().selection.clone()
    }

    /// Choose a listed image for a role
    ///
    /// Returns false (and changes nothing) if the path is not listed for
    /// that role.
    pub fn select(&self, role: ImageRole, path: &Path) -> bool {
        let mut state = self.inner.catalog_state();
        if !state.catalog.catalog().contains(role, path) {
            return false;
        }
        state.selection.set(role, path);
        true
    }

    /// Add a file from outside the image directory and select it
    ///
    /// The role is inferred from the file name unless given.
    pub fn register_browsed(&self, path: &Path, role: Option<ImageRole>) -> Result<BinaryEntry> {
        let mut state = self.inner.catalog_state();
        let path = std::path::absolute(path).map_err(fwflasher_core::Error::from)?;
        let role = role.unwrap_or_else(|| state.catalog.classifier().classify_path(&path));

        let snapshot = state.catalog.register_browsed(&path, Some(role))?;
        state.selection.set(role, &path);
        self.inner.catalog_subscribers.publish(snapshot);

        Ok(BinaryEntry::new(path, role))
    }

    /// Refresh both the port snapshot and the catalog
    pub fn refresh(&self) -> Result<()> {
        self.inner.watcher.poll_now();
        self.inner.refresh_catalog()?;
        Ok(())
    }

    /// Rescan the image directory, keeping choices that are still listed
    pub fn refresh_catalog(&self) -> Result<Catalog> {
        self.inner.refresh_catalog()
    }

    /// Receive every port change
    pub fn subscribe_ports(&self) -> Receiver<PortSet> {
        self.inner.watcher.subscribe()
    }

    /// Receive every new catalog snapshot
    pub fn subscribe_catalog(&self) -> Receiver<Catalog> {
        self.inner.catalog_subscribers.subscribe()
    }

    /// Identifier of the running job, if any
    pub fn active_job(&self) -> Option<JobId> {
        *self.inner.active()
    }

    /// Selection made of the current per-role choice and a port
    pub fn build_selection(&self, port: Option<Port>) -> FlashSelection {
        FlashSelection::from_roles(port, &self.inner.catalog_state().selection)
    }

    /// Validate a selection and start flashing it
    ///
    /// Fails without side effects if a job is already running, a port or
    /// role is missing, or the port is not attached.
    pub fn submit_flash(&self, selection: &FlashSelection) -> Result<JobHandle> {
        let mut active = self.inner.active();
        if let Some(id) = *active {
            return Err(SelectionError::JobActive(id).into());
        }

        let plan = selection.validate(&self.inner.watcher.ports())?;
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let job = FlashJob::new(id, plan, &self.inner.config.tool, &self.inner.config.target)?;

        *active = Some(id);
        drop(active);
        let slot = ActiveSlot {
            inner: Arc::clone(&self.inner),
            id,
        };

        let inner = Arc::clone(&self.inner);
        job.spawn(move |outcome| {
            drop(slot);
            inner.after_job(outcome);
        })
    }
}
