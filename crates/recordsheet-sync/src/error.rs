use thiserror::Error;

/// Failures that abort a download or upload run.
///
/// Everything recoverable (unresolved field names, malformed cell text,
/// dangling references) is logged and skipped instead; only schema errors and
/// instance-store failures surface here.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Context wrapper naming the root kind of the sheet whose run failed.
    #[error("sync failed for sheet rooted at `{kind}`")]
    Sheet {
        kind: String,
        #[source]
        source: Box<SyncError>,
    },

    /// A child span named a parent kind the registry does not know.
    #[error("header declares a child span under unknown parent kind `{parent}`")]
    UnknownParentKind { parent: String },

    /// A child span's parent kind has no mapping node yet; parent spans must
    /// appear to the left of their children.
    #[error("no mapping for parent kind `{parent}` precedes its child span")]
    ParentMappingMissing { parent: String },

    /// The host instance store reported a failure.
    #[error("instance store failure")]
    Store {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl SyncError {
    /// Wrap a host-store failure.
    pub fn store(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        SyncError::Store {
            source: Box::new(source),
        }
    }
}
