//! Row segmentation and per-record parsing.
//!
//! Data rows are walked top to bottom and grouped into blocks: a block opens
//! at a row whose identity cell (the first cell of the mapping's span) is
//! non-empty and closes on the last row before the next opener. Nested child
//! mappings re-segment the same block rows against their own spans, so a
//! parent row can be followed by any number of child rows.
//!
//! During upload a backing array of already-known instances rides along,
//! indexed by row: a blank identity cell still opens a block when the row has
//! a positional candidate, and a following row with a candidate also closes
//! the current block. Both rules together realign reordered or unnamed rows
//! to their instances without repeating the identity text on every row.

use recordsheet_common::{Cell, InstanceId, Value};

use crate::codec;
use crate::error::SyncError;
use crate::mapping::FieldMapping;
use crate::state::{SyncMode, SyncState};
use crate::store::InstanceStore;

impl FieldMapping {
    /// Segment `rows` into blocks and parse each one. Returns the parsed
    /// instances in row order; these become the parent's array field for
    /// nested mappings.
    pub(crate) fn parse_rows<S: InstanceStore + ?Sized>(
        &self,
        rows: &mut [Vec<Cell>],
        backing: Option<&[InstanceId]>,
        state: &mut SyncState<'_, S>,
    ) -> Result<Vec<InstanceId>, SyncError> {
        let upload = state.mode() == SyncMode::Upload;
        let candidate_at =
            |row: usize| -> Option<InstanceId> { backing.and_then(|b| b.get(row)).copied() };

        let mut parsed = Vec::new();
        let mut open: Option<usize> = None;

        for i in 0..rows.len() {
            if !rows[i][self.start()].is_empty() || (upload && candidate_at(i).is_some()) {
                open = Some(i);
            }
            let Some(start) = open else { continue };

            let end_of_block = i + 1 >= rows.len()
                || !rows[i + 1][self.start()].is_empty()
                || (upload && candidate_at(i + 1).is_some());
            if !end_of_block {
                continue;
            }

            let name = rows[start][self.start()].text().to_owned();
            let candidate = candidate_at(start);
            let block = &mut rows[start..=i];
            if let Some(instance) = self.parse_single(block, i, &name, candidate, state)? {
                parsed.push(instance);
            }
            open = None;
        }

        Ok(parsed)
    }

    /// Parse one block of rows into one instance. `terminal_row` is the index
    /// of the block's last row within the enclosing segmentation and becomes
    /// the order value for kinds that carry one.
    fn parse_single<S: InstanceStore + ?Sized>(
        &self,
        rows: &mut [Vec<Cell>],
        terminal_row: usize,
        name: &str,
        candidate: Option<InstanceId>,
        state: &mut SyncState<'_, S>,
    ) -> Result<Option<InstanceId>, SyncError> {
        let registry = state.registry();
        let kind = registry.kind(self.kind());
        if self.accessors().is_empty() {
            tracing::warn!(kind = %kind.name(), name, "record block maps no columns");
        }

        let participates = self.identity_participates(registry);
        if participates {
            if let Some(cached) = state.cached_instance(self.kind(), name) {
                // Later sightings of a name are references, not
                // re-definitions: a download returns the first instance
                // without re-parsing the block.
                if state.mode() == SyncMode::Download {
                    return Ok(Some(cached));
                }
            }
        }

        let resolved = match state.mode() {
            SyncMode::Download => state.resolve_instance(self.kind(), name, true, candidate)?,
            SyncMode::Upload => match candidate {
                Some(found) => Some(found),
                None => state.resolve_instance(self.kind(), name, false, None)?,
            },
        };
        let Some(instance) = resolved else {
            tracing::warn!(kind = %kind.name(), name, "no instance for record block; rows left as-is");
            return Ok(None);
        };
        if participates && state.cached_instance(self.kind(), name).is_none() {
            state.register_instance(self.kind(), name, instance);
        }

        // Children first: each child re-segments the whole block against its
        // own span, backed by the instance's current array field.
        for (slot, child) in self.children() {
            let backing = ref_ids(&state.store().field(instance, *slot));
            let children = child.parse_rows(rows, Some(&backing), state)?;
            if state.mode() == SyncMode::Download {
                let refs = children.into_iter().map(Value::Ref).collect();
                state
                    .store_mut()
                    .set_field(instance, *slot, Value::Array(refs))?;
            }
        }

        // Flat fields live on the block's first row only.
        for (offset, accessor) in self.accessors().iter().enumerate() {
            let Some(slot) = *accessor else { continue };
            let field = kind.field(slot);
            let column = self.start() + offset;
            match state.mode() {
                SyncMode::Download => {
                    let text = rows[0][column].text().to_owned();
                    if let Some(value) = codec::decode(&field.ty, &text, state)? {
                        state.store_mut().set_field(instance, slot, value)?;
                    }
                }
                SyncMode::Upload => {
                    let value = state.store().field(instance, slot);
                    let text = codec::encode(&field.ty, &value, state);
                    rows[0][column].write(text);
                }
            }
        }

        state.store_mut().set_order(instance, terminal_row)?;
        Ok(Some(instance))
    }

    /// Build a fresh row for an instance the sheet does not carry yet. Every
    /// written cell is marked modified; the identity cell always ends up
    /// holding the display name.
    pub(crate) fn build_row<S: InstanceStore + ?Sized>(
        &self,
        instance: InstanceId,
        width: usize,
        state: &SyncState<'_, S>,
    ) -> Vec<Cell> {
        let kind = state.registry().kind(self.kind());
        let mut row = vec![Cell::default(); width];
        for (offset, accessor) in self.accessors().iter().enumerate() {
            let Some(slot) = *accessor else { continue };
            let field = kind.field(slot);
            let text = codec::encode(&field.ty, &state.store().field(instance, slot), state);
            row[self.start() + offset] = Cell::written(text);
        }
        row[self.start()] = Cell::written(Some(state.store().display_name(instance).to_owned()));
        row
    }
}

fn ref_ids(value: &Value) -> Vec<InstanceId> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Ref(id) => Some(*id),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
