//! Download/upload orchestration for one sheet region.

use recordsheet_common::Table;

use crate::error::SyncError;
use crate::mapping::{FieldMapping, build_mapping};
use crate::state::{SyncMode, SyncState};
use crate::store::InstanceStore;

/// Rows consumed by the schema parser before data begins.
pub const HEADER_ROWS: usize = 2;

/// Parse the table into record instances.
///
/// The header rows become the mapping tree, the data rows are segmented and
/// applied to the store. A header that resolves to no mapping is a logged
/// no-op; any real failure is wrapped with the root kind's name.
pub fn download<S: InstanceStore + ?Sized>(
    table: &mut Table,
    state: &mut SyncState<'_, S>,
) -> Result<(), SyncError> {
    debug_assert_eq!(state.mode(), SyncMode::Download);
    let Some((mapping, root_kind)) = prepare(table, state)? else {
        return Ok(());
    };
    mapping
        .parse_rows(&mut table.rows_mut()[HEADER_ROWS..], None, state)
        .map_err(|err| SyncError::Sheet {
            kind: root_kind,
            source: Box::new(err),
        })?;
    Ok(())
}

/// Serialize record instances back into the table.
///
/// Existing data rows are re-parsed in upload mode, which refreshes their
/// cells from the store and fills the identity cache with every instance the
/// sheet already carries. Every other instance of the root kind then gets a
/// freshly built row appended. Pre-existing rows keep their positions and
/// nothing is deleted.
pub fn upload<S: InstanceStore + ?Sized>(
    table: &mut Table,
    state: &mut SyncState<'_, S>,
) -> Result<(), SyncError> {
    debug_assert_eq!(state.mode(), SyncMode::Upload);
    let Some((mapping, root_kind)) = prepare(table, state)? else {
        return Ok(());
    };
    mapping
        .parse_rows(&mut table.rows_mut()[HEADER_ROWS..], None, state)
        .map_err(|err| SyncError::Sheet {
            kind: root_kind,
            source: Box::new(err),
        })?;

    let participates = mapping.identity_participates(state.registry());
    let width = table.width();
    for id in state.store().instances_of(mapping.kind()) {
        if participates {
            let name = state.store().display_name(id).to_owned();
            if state.cached_instance(mapping.kind(), &name).is_some() {
                continue;
            }
            state.register_instance(mapping.kind(), &name, id);
        }
        let row = mapping.build_row(id, width, state);
        table.push_row(row);
    }
    Ok(())
}

fn prepare<S: InstanceStore + ?Sized>(
    table: &Table,
    state: &SyncState<'_, S>,
) -> Result<Option<(FieldMapping, String)>, SyncError> {
    if table.row_count() < HEADER_ROWS {
        tracing::warn!(rows = table.row_count(), "table has no header rows; nothing to sync");
        return Ok(None);
    }
    let Some(mapping) = build_mapping(&table.rows()[0], &table.rows()[1], state.registry())? else {
        tracing::warn!("sheet header resolved to no mapping; nothing to sync");
        return Ok(None);
    };
    let root_kind = state.registry().kind(mapping.kind()).name().to_owned();
    Ok(Some((mapping, root_kind)))
}
