//! Lazy version history
//!
//! History is read in newest-first batches keyed by version number, so new
//! versions appended during a walk never shift or repeat earlier items.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, TryStreamExt, stream};
use tamarind_common::{Result, with_deadline};
use tamarind_persistence::entity::ConfigVersion;
use tamarind_persistence::{ConfigPersistence, HistoryCursor};

/// Restartable handle over one config's version history
#[derive(Clone)]
pub struct VersionHistory {
    persistence: Arc<dyn ConfigPersistence>,
    config_id: String,
    batch_size: usize,
    timeout: Duration,
}

impl fmt::Debug for VersionHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionHistory")
            .field("config_id", &self.config_id)
            .field("batch_size", &self.batch_size)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl VersionHistory {
    pub(crate) fn new(
        persistence: Arc<dyn ConfigPersistence>,
        config_id: String,
        batch_size: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            persistence,
            config_id,
            batch_size: batch_size.max(1),
            timeout,
        }
    }

    pub fn config_id(&self) -> &str {
        &self.config_id
    }

    /// Stream versions newest first, fetching one batch at a time
    ///
    /// Each call starts a fresh walk from the newest version.
    pub fn stream(&self) -> impl Stream<Item = Result<ConfigVersion>> + Send + '_ {
        stream::try_unfold(HistoryCursor::Start, move |cursor| async move {
            if cursor == HistoryCursor::Done {
                return Ok(None);
            }
            let batch = with_deadline(
                self.timeout,
                "config_version_batch",
                self.persistence
                    .config_version_batch(&self.config_id, cursor, self.batch_size),
            )
            .await?;

            let next = match batch.last() {
                Some(oldest) if batch.len() == self.batch_size && oldest.version_number > 1 => {
                    HistoryCursor::Before(oldest.version_number)
                }
                _ => HistoryCursor::Done,
            };
            Ok(Some((stream::iter(batch.into_iter().map(Ok)), next)))
        })
        .try_flatten()
    }

    /// Drain the whole history
    pub async fn collect_all(&self) -> Result<Vec<ConfigVersion>> {
        self.stream().try_collect().await
    }
}
