use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{error::AppResult, services::catalog::ShowCatalog};

/// Genre id to name lookup table
///
/// Built explicitly at startup and refreshed on a fixed interval by
/// [`GenreTable::spawn_refresh`]. A failed refresh keeps the previous table.
#[derive(Default)]
pub struct GenreTable {
    inner: RwLock<GenreSnapshot>,
}

#[derive(Default)]
struct GenreSnapshot {
    names: HashMap<i64, String>,
    loaded_at: Option<DateTime<Utc>>,
}

impl GenreTable {
    /// Creates a table from a known mapping
    pub fn from_map(names: HashMap<i64, String>) -> Self {
        Self {
            inner: RwLock::new(GenreSnapshot {
                names,
                loaded_at: Some(Utc::now()),
            }),
        }
    }

    /// Loads the table from the catalog.
    ///
    /// A catalog failure yields an empty table rather than an error; search keeps
    /// working without genre names until the next refresh succeeds.
    pub async fn load(catalog: &dyn ShowCatalog) -> Self {
        let table = Self::default();
        if let Err(e) = table.refresh(catalog).await {
            tracing::warn!(
                catalog = catalog.name(),
                error = %e,
                "Initial genre load failed, starting with an empty table"
            );
        }
        table
    }

    /// Replaces the table with the catalog's current genre list
    pub async fn refresh(&self, catalog: &dyn ShowCatalog) -> AppResult<usize> {
        let names = catalog.list_genres().await?;
        let count = names.len();

        let mut snapshot = self.inner.write().await;
        snapshot.names = names;
        snapshot.loaded_at = Some(Utc::now());

        tracing::info!(genres = count, catalog = catalog.name(), "Genre table refreshed");
        Ok(count)
    }

    /// Names for the given ids, in order, skipping ids the table does not know
    pub async fn names_for(&self, ids: &[i64]) -> Vec<String> {
        let snapshot = self.inner.read().await;
        ids.iter()
            .filter_map(|id| snapshot.names.get(id).cloned())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.names.len()
    }

    pub async fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.loaded_at
    }

    /// Refreshes `table` every `every` until the runtime shuts down
    pub fn spawn_refresh(
        table: Arc<GenreTable>,
        catalog: Arc<dyn ShowCatalog>,
        every: Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // The first tick completes immediately and the table was just loaded
            interval.tick().await;

            loop {
                interval.tick().await;
                if let Err(e) = table.refresh(catalog.as_ref()).await {
                    let genres = table.len().await;
                    let loaded_at = table.loaded_at().await;
                    tracing::warn!(
                        error = %e,
                        genres = genres,
                        loaded_at = ?loaded_at,
                        "Genre refresh failed, keeping previous table"
                    );
                }
            }
        })
    }
}
