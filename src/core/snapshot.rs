//! Snapshot fetching

use tracing::debug;

use super::session::Snapshot;
use crate::db::backend::{BackendError, SessionSource};

/// Take one point-in-time listing from the source.
///
/// The records keep the server's order. Any failure of the listing call is
/// returned unchanged for the caller to report as a connection error.
pub async fn fetch_snapshot(source: &dyn SessionSource) -> Result<Snapshot, BackendError> {
    let records = source.list_sessions().await?;
    debug!("Fetched snapshot with {} sessions", records.len());
    Ok(Snapshot::new(records))
}
