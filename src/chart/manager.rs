//! Chart instance lifecycle: acquire on expansion, resize in place, release
//! deterministically. The drawing library sits behind `ChartBackend`.

use crate::Result;
use crate::chart::options::{self, ChartKind, ChartOptions, container_id};
use crate::run::{RecordId, RequestRecord};

use std::collections::{BTreeMap, BTreeSet};

/// The external chart library seam. `create` must return an instance already
/// sized to its container and observing container resizes.
pub trait ChartBackend {
    fn create(&mut self, container: &str, options: &ChartOptions) -> Result<Box<dyn ChartInstance>>;
}

/// One live chart. Implementations re-layout on `resize` (never re-create)
/// and tear down their resize observation in `dispose`.
pub trait ChartInstance {
    fn resize(&mut self);
    fn dispose(&mut self);
}

/// Scoped handle over one chart instance. Closing twice, or dropping after a
/// close, is a no-op; dropping an open handle disposes the instance.
pub struct ChartHandle {
    instance: Option<Box<dyn ChartInstance>>,
}

impl ChartHandle {
    fn new(instance: Box<dyn ChartInstance>) -> Self {
        Self {
            instance: Some(instance),
        }
    }

    pub fn resize(&mut self) {
        if let Some(instance) = &mut self.instance {
            instance.resize();
        }
    }

    pub fn close(&mut self) {
        if let Some(mut instance) = self.instance.take() {
            instance.dispose();
        }
    }
}

impl Drop for ChartHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Container-keyed chart ownership: exactly one instance per container.
pub struct ChartSlots {
    backend: Box<dyn ChartBackend>,
    open: BTreeMap<String, ChartHandle>,
}

impl ChartSlots {
    pub fn new(backend: Box<dyn ChartBackend>) -> Self {
        Self {
            backend,
            open: BTreeMap::new(),
        }
    }

    /// Open a chart in `container`, first releasing any instance the
    /// container already owns.
    pub fn open(&mut self, container: &str, options: &ChartOptions) -> Result<()> {
        self.close(container);
        let instance = self.backend.create(container, options)?;
        self.open
            .insert(container.to_string(), ChartHandle::new(instance));
        Ok(())
    }

    /// React to a container resize. Unknown containers are ignored.
    pub fn resize(&mut self, container: &str) {
        if let Some(handle) = self.open.get_mut(container) {
            handle.resize();
        }
    }

    pub fn resize_all(&mut self) {
        for handle in self.open.values_mut() {
            handle.resize();
        }
    }

    /// Release the container's instance. Closing an unknown or already
    /// closed container is a no-op.
    pub fn close(&mut self, container: &str) {
        if let Some(mut handle) = self.open.remove(container) {
            handle.close();
        }
    }

    pub fn close_all(&mut self) {
        let containers: Vec<String> = self.open.keys().cloned().collect();
        for container in containers {
            self.close(&container);
        }
    }

    pub fn is_open(&self, container: &str) -> bool {
        self.open.contains_key(container)
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }
}

/// Per-record chart driver: maps a record's detail region to the set of
/// containers it owns, acquiring on expansion and releasing when the region
/// goes away (collapse, filtered out, or table teardown).
pub struct RecordCharts {
    slots: ChartSlots,
    owners: BTreeMap<RecordId, Vec<String>>,
}

impl RecordCharts {
    pub fn new(backend: Box<dyn ChartBackend>) -> Self {
        Self {
            slots: ChartSlots::new(backend),
            owners: BTreeMap::new(),
        }
    }

    /// Acquire chart instances for a record's detail region. Kinds without
    /// chart-worthy data are skipped (the presentation renders a fallback for
    /// them, see `options::chart_fallbacks`). Re-acquiring releases the
    /// record's prior instances first.
    pub fn acquire_for(&mut self, identity: RecordId, record: &RequestRecord) -> Result<()> {
        self.release_for(identity);

        let mut containers: Vec<String> = Vec::new();
        for kind in ChartKind::ALL {
            let chart_options = match options::build_options(record, kind) {
                Ok(o) => o,
                Err(_) => continue,
            };
            let container = container_id(identity, kind);
            if let Err(err) = self.slots.open(&container, &chart_options) {
                // Leave nothing half-acquired for this record.
                for opened in &containers {
                    self.slots.close(opened);
                }
                return Err(err);
            }
            containers.push(container);
        }

        self.owners.insert(identity, containers);
        Ok(())
    }

    /// Release every instance owned by `identity`. Unknown identities are a
    /// no-op.
    pub fn release_for(&mut self, identity: RecordId) {
        if let Some(containers) = self.owners.remove(&identity) {
            for container in containers {
                self.slots.close(&container);
            }
        }
    }

    pub fn release_all(&mut self) {
        self.slots.close_all();
        self.owners.clear();
    }

    /// Release charts whose record is no longer in the visible view (the
    /// filter removed it while expanded).
    pub fn retain_visible(&mut self, visible: &BTreeSet<RecordId>) {
        let gone: Vec<RecordId> = self
            .owners
            .keys()
            .copied()
            .filter(|id| !visible.contains(id))
            .collect();
        for identity in gone {
            self.release_for(identity);
        }
    }

    pub fn notify_resized(&mut self, container: &str) {
        self.slots.resize(container);
    }

    pub fn resize_all(&mut self) {
        self.slots.resize_all();
    }

    pub fn has_charts(&self, identity: RecordId) -> bool {
        self.owners.contains_key(&identity)
    }

    pub fn open_count(&self) -> usize {
        self.slots.open_count()
    }
}
