use std::sync::Arc;

use recordsheet_common::{InstanceId, KindId, Value};
use recordsheet_schema::KindRegistry;
use rustc_hash::FxHashMap;

use crate::error::SyncError;

/// Capability interface over the host-owned object store.
///
/// The engine never constructs record instances itself; everything goes
/// through this trait. Implementations must make `resolve_or_create` with
/// `may_create = false` idempotent for the same `(kind, name)` within a run.
/// Instance ids are only meaningful to the store that issued them.
pub trait InstanceStore {
    /// Resolve an instance by kind and display name.
    ///
    /// `existing` is a positional candidate from a backing array; a provider
    /// may prefer it over a fresh allocation when it cannot look names up.
    fn resolve_or_create(
        &mut self,
        kind: KindId,
        name: &str,
        may_create: bool,
        existing: Option<InstanceId>,
    ) -> Result<Option<InstanceId>, SyncError>;

    /// Every known instance of a kind, in stable order. Upload uses this to
    /// find instances the sheet does not carry yet.
    fn instances_of(&self, kind: KindId) -> Vec<InstanceId>;

    /// The human-readable name shown in identity cells.
    fn display_name(&self, id: InstanceId) -> &str;

    fn field(&self, id: InstanceId, slot: usize) -> Value;

    fn set_field(&mut self, id: InstanceId, slot: usize, value: Value) -> Result<(), SyncError>;

    /// Record the positional order of an instance. Stores apply this only to
    /// kinds that carry the ordering capability.
    fn set_order(&mut self, id: InstanceId, order: usize) -> Result<(), SyncError>;
}

/// One store-owned record instance.
#[derive(Debug, Clone)]
pub struct Instance {
    kind: KindId,
    name: String,
    order: Option<usize>,
    fields: Vec<Value>,
}

impl Instance {
    pub fn kind(&self) -> KindId {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn order(&self) -> Option<usize> {
        self.order
    }

    pub fn field(&self, slot: usize) -> &Value {
        &self.fields[slot]
    }

    pub fn fields(&self) -> &[Value] {
        &self.fields
    }
}

/// In-memory [`InstanceStore`] with a `(kind, name)` lookup table.
///
/// Fresh instances start with every field at its declared zero value. The
/// positional `existing` hint is ignored: named lookup always wins, matching
/// the behavior of a store that indexes its assets by name.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    registry: Arc<KindRegistry>,
    instances: Vec<Instance>,
    by_name: FxHashMap<(KindId, String), InstanceId>,
}

impl MemoryStore {
    pub fn new(registry: Arc<KindRegistry>) -> Self {
        Self {
            registry,
            instances: Vec::new(),
            by_name: FxHashMap::default(),
        }
    }

    /// Seed an instance directly, as a host would after loading its assets.
    pub fn insert(&mut self, kind: KindId, name: &str) -> InstanceId {
        let id = InstanceId(self.instances.len() as u32);
        self.instances.push(Instance {
            kind,
            name: name.to_owned(),
            order: None,
            fields: self.registry.kind(kind).zero_fields(),
        });
        self.by_name.insert((kind, name.to_owned()), id);
        id
    }

    pub fn lookup(&self, kind: KindId, name: &str) -> Option<InstanceId> {
        self.by_name.get(&(kind, name.to_owned())).copied()
    }

    pub fn get(&self, id: InstanceId) -> &Instance {
        &self.instances[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl InstanceStore for MemoryStore {
    fn resolve_or_create(
        &mut self,
        kind: KindId,
        name: &str,
        may_create: bool,
        _existing: Option<InstanceId>,
    ) -> Result<Option<InstanceId>, SyncError> {
        if let Some(found) = self.lookup(kind, name) {
            return Ok(Some(found));
        }
        if !may_create {
            return Ok(None);
        }
        Ok(Some(self.insert(kind, name)))
    }

    fn instances_of(&self, kind: KindId) -> Vec<InstanceId> {
        self.instances
            .iter()
            .enumerate()
            .filter(|(_, inst)| inst.kind == kind)
            .map(|(i, _)| InstanceId(i as u32))
            .collect()
    }

    fn display_name(&self, id: InstanceId) -> &str {
        &self.instances[id.0 as usize].name
    }

    fn field(&self, id: InstanceId, slot: usize) -> Value {
        self.instances[id.0 as usize].fields[slot].clone()
    }

    fn set_field(&mut self, id: InstanceId, slot: usize, value: Value) -> Result<(), SyncError> {
        self.instances[id.0 as usize].fields[slot] = value;
        Ok(())
    }

    fn set_order(&mut self, id: InstanceId, order: usize) -> Result<(), SyncError> {
        let instance = &mut self.instances[id.0 as usize];
        if self.registry.kind(instance.kind).ordered() {
            instance.order = Some(order);
        }
        Ok(())
    }
}
