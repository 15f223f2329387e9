//! Recordsheet sync engine.
//!
//! This crate links a [`recordsheet_schema::KindRegistry`] to the row grid of
//! one sheet region. The first two rows declare a forest of record kinds; the
//! engine parses them into a field-mapping tree, segments the data rows into
//! per-record blocks, and moves field values between cells and a host-owned
//! [`InstanceStore`] in either direction: [`download`] builds and refreshes
//! instances from rows, [`upload`] rewrites rows from instances and appends
//! rows for instances the sheet does not carry yet.

mod codec;
mod error;
mod mapper;
mod mapping;
mod sheet;
mod state;
mod store;

pub use codec::{decode, encode};
pub use error::SyncError;
pub use sheet::{HEADER_ROWS, download, upload};
pub use state::{SyncMode, SyncState};
pub use store::{Instance, InstanceStore, MemoryStore};
