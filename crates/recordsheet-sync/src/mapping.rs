//! Field mapping tree and the two-row header parser.
//!
//! The first header row declares record kinds over column spans, the second
//! names one field per column. A span whose declaration reads `Kind` becomes
//! the root mapping; `Kind:ParentKind.ParentField` attaches a child mapping
//! under an array-valued field of an already-built parent span, so parent
//! spans must appear to the left of their children.

use recordsheet_common::{Cell, KindId};
use recordsheet_schema::{FieldType, KindRegistry};

use crate::error::SyncError;

/// Mapping of one record kind onto a contiguous column span.
#[derive(Debug)]
pub(crate) struct FieldMapping {
    kind: KindId,
    /// One accessor per span column; `None` marks a field name that did not
    /// resolve and is skipped everywhere downstream.
    accessors: Vec<Option<usize>>,
    start: usize,
    children: Vec<(usize, FieldMapping)>,
}

impl FieldMapping {
    pub(crate) fn kind(&self) -> KindId {
        self.kind
    }

    pub(crate) fn start(&self) -> usize {
        self.start
    }

    pub(crate) fn accessors(&self) -> &[Option<usize>] {
        &self.accessors
    }

    pub(crate) fn children(&self) -> &[(usize, FieldMapping)] {
        &self.children
    }

    /// Depth-first search for the mapping node of a kind.
    fn find_kind_mut(&mut self, kind: KindId) -> Option<&mut FieldMapping> {
        if self.kind == kind {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|(_, child)| child.find_kind_mut(kind))
    }

    /// A kind takes part in identity caching when its identity column maps to
    /// a resolved string field and names are declared unique.
    pub(crate) fn identity_participates(&self, registry: &KindRegistry) -> bool {
        let Some(Some(slot)) = self.accessors.first().copied() else {
            return false;
        };
        let kind = registry.kind(self.kind);
        kind.field(slot).ty == FieldType::Text && !kind.non_unique_names()
    }
}

/// Parse the two header rows into a mapping tree.
///
/// `Ok(None)` means a declared kind was unknown: the whole sheet is skipped
/// without error. Unresolvable parent declarations are schema errors and
/// abort with the root kind's name attached.
pub(crate) fn build_mapping(
    kind_row: &[Cell],
    field_row: &[Cell],
    registry: &KindRegistry,
) -> Result<Option<FieldMapping>, SyncError> {
    let mut root: Option<FieldMapping> = None;
    let mut open: Option<usize> = None;

    for i in 0..field_row.len() {
        if i < kind_row.len() && !kind_row[i].is_empty() {
            open = Some(i);
        }
        let Some(start) = open else { continue };

        // A span closes at the last column, before an unnamed column, or
        // before the next declaration.
        let boundary = i + 1 >= field_row.len()
            || field_row[i + 1].is_empty()
            || (i + 1 < kind_row.len() && !kind_row[i + 1].is_empty());
        if !boundary {
            continue;
        }

        let added = add_span(&mut root, kind_row[start].text(), start, i, field_row, registry);
        match added {
            Ok(true) => {}
            Ok(false) => return Ok(None),
            Err(err) => {
                // Schema errors carry the root kind as context when one was
                // already built.
                return Err(match root {
                    Some(ref mapping) => SyncError::Sheet {
                        kind: registry.kind(mapping.kind).name().to_owned(),
                        source: Box::new(err),
                    },
                    None => err,
                });
            }
        }
        open = None;
    }

    Ok(root)
}

fn add_span(
    root: &mut Option<FieldMapping>,
    declaration: &str,
    start: usize,
    end: usize,
    field_row: &[Cell],
    registry: &KindRegistry,
) -> Result<bool, SyncError> {
    let mut parts = declaration.splitn(2, ':');
    let kind_name = parts.next().unwrap_or("").trim();
    let Some(kind_id) = registry.resolve(kind_name) else {
        tracing::warn!(kind = %kind_name, "unknown kind declared in sheet header; sheet skipped");
        return Ok(false);
    };
    let kind = registry.kind(kind_id);

    let accessors: Vec<Option<usize>> = field_row[start..=end]
        .iter()
        .map(|cell| {
            let name = cell.text();
            let slot = kind.find_field(name);
            if slot.is_none() {
                tracing::warn!(kind = %kind.name(), field = %name, "field named in sheet header not found");
            }
            slot
        })
        .collect();

    let node = FieldMapping {
        kind: kind_id,
        accessors,
        start,
        children: Vec::new(),
    };

    let Some(nesting) = parts.next() else {
        // Top level: a later declaration replaces the root.
        *root = Some(node);
        return Ok(true);
    };

    let mut nested = nesting.splitn(2, '.');
    let parent_name = nested.next().unwrap_or("").trim();
    let parent_field = nested.next().unwrap_or("").trim();
    let Some(parent_id) = registry.resolve(parent_name) else {
        return Err(SyncError::UnknownParentKind {
            parent: parent_name.to_owned(),
        });
    };
    let Some(parent_node) = root.as_mut().and_then(|r| r.find_kind_mut(parent_id)) else {
        return Err(SyncError::ParentMappingMissing {
            parent: parent_name.to_owned(),
        });
    };

    let parent_kind = registry.kind(parent_id);
    match parent_kind.find_field(parent_field) {
        Some(slot) if parent_kind.field(slot).ty.is_array() => {
            parent_node.children.push((slot, node));
        }
        Some(_) => {
            tracing::warn!(
                kind = %parent_kind.name(),
                field = %parent_field,
                "parent field is not array-typed; child span ignored"
            );
        }
        None => {
            tracing::warn!(
                kind = %parent_kind.name(),
                field = %parent_field,
                "parent field not found; child span ignored"
            );
        }
    }
    Ok(true)
}
