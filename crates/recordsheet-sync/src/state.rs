use recordsheet_common::{InstanceId, KindId};
use recordsheet_schema::KindRegistry;
use rustc_hash::FxHashMap;

use crate::error::SyncError;
use crate::store::InstanceStore;

/// Direction of one sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Rows drive instances: parse cells and write fields.
    Download,
    /// Instances drive rows: encode fields and rewrite cells.
    Upload,
}

/// Per-run context threaded through the mapper and codec.
///
/// One state owns one run: it pins the mode, borrows the registry and the
/// store exclusively, and carries the identity cache that makes repeated
/// names within a run collide onto one instance. States are never reused
/// across runs; a later upload must not see a download's cache.
pub struct SyncState<'a, S: InstanceStore + ?Sized> {
    mode: SyncMode,
    registry: &'a KindRegistry,
    store: &'a mut S,
    seen: FxHashMap<(KindId, String), InstanceId>,
}

impl<'a, S: InstanceStore + ?Sized> SyncState<'a, S> {
    pub fn new(mode: SyncMode, registry: &'a KindRegistry, store: &'a mut S) -> Self {
        Self {
            mode,
            registry,
            store,
            seen: FxHashMap::default(),
        }
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// The registry shared by the whole run. Returned at the run lifetime so
    /// descriptors can be held across store mutations.
    pub fn registry(&self) -> &'a KindRegistry {
        self.registry
    }

    pub fn store(&self) -> &S {
        self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        self.store
    }

    /// The instance-provider capability: resolve a named instance, creating it
    /// when permitted. `existing` is a positional reuse hint the provider may
    /// honor or ignore.
    pub fn resolve_instance(
        &mut self,
        kind: KindId,
        name: &str,
        may_create: bool,
        existing: Option<InstanceId>,
    ) -> Result<Option<InstanceId>, SyncError> {
        self.store.resolve_or_create(kind, name, may_create, existing)
    }

    pub(crate) fn cached_instance(&self, kind: KindId, name: &str) -> Option<InstanceId> {
        self.seen.get(&(kind, name.to_owned())).copied()
    }

    pub(crate) fn register_instance(&mut self, kind: KindId, name: &str, id: InstanceId) {
        self.seen.insert((kind, name.to_owned()), id);
    }
}
