//! Paged copy of objects from one class to another.

use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::client::WeaviateClient;
use crate::config::MigrationOptions;
use crate::error::Result;
use crate::retry::{with_retry, RetryConfig};

/// Counters for one copy run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopyStats {
    /// Objects read from the source.
    pub fetched: u64,
    /// Objects inserted into the destination.
    pub processed: u64,
    /// Objects that could not be inserted.
    pub failed: u64,
    /// Non-empty pages read.
    pub batches: u64,
}

impl CopyStats {
    /// Adds `other` into `self`.
    pub fn merge(&mut self, other: &CopyStats) {
        self.fetched += other.fetched;
        self.processed += other.processed;
        self.failed += other.failed;
        self.batches += other.batches;
    }
}

/// Copies objects page by page, inserting them one at a time.
#[derive(Debug, Clone)]
pub struct BatchCopier {
    batch_size: usize,
    sleep_between_batches: std::time::Duration,
    insert_retry: RetryConfig,
    fetch_retry: RetryConfig,
}

impl BatchCopier {
    /// Creates a copier from migration options.
    pub fn new(options: &MigrationOptions) -> Self {
        Self {
            batch_size: options.batch_size.max(1),
            sleep_between_batches: options.sleep_between_batches(),
            insert_retry: options.insert_retry.clone(),
            fetch_retry: options.fetch_retry.clone(),
        }
    }

    /// Copies every object of `source_class` into `dest_class`.
    ///
    /// Vectors are carried over only when `include_vector` is set; a
    /// destination with its own vectorizer re-embeds objects instead.
    ///
    /// # Errors
    ///
    /// Fails when a page cannot be fetched within the fetch retry budget.
    /// Insert failures are counted in the returned stats, not returned.
    pub async fn copy_class(
        &self,
        source: &WeaviateClient,
        source_class: &str,
        destination: &WeaviateClient,
        dest_class: &str,
        include_vector: bool,
    ) -> Result<CopyStats> {
        info!(
            "Migrating objects {} -> {}",
            source_class, dest_class
        );

        let mut stats = CopyStats::default();
        let mut offset = 0;
        let progress = create_spinner(dest_class);

        loop {
            let operation = format!("fetch {} at offset {}", source_class, offset);
            let objects = with_retry(&self.fetch_retry, &operation, || {
                source.list_objects(source_class, self.batch_size, offset)
            })
            .await?;

            if objects.is_empty() {
                break;
            }

            let page_len = objects.len();
            stats.fetched += page_len as u64;
            stats.batches += 1;

            for object in objects {
                let id = object
                    .id
                    .map_or_else(|| "<no id>".to_string(), |id| id.to_string());
                let insert = object.into_insert(dest_class, include_vector);
                let operation = format!("insert {}", id);

                match with_retry(&self.insert_retry, &operation, || {
                    destination.insert_object(&insert)
                })
                .await
                {
                    Ok(()) => stats.processed += 1,
                    Err(e) => {
                        stats.failed += 1;
                        warn!("Error inserting object {}: {}. Giving up.", id, e);
                    }
                }
                progress.inc(1);
            }

            info!(
                "Processed {} objects, failed {} objects.",
                stats.processed, stats.failed
            );

            if page_len < self.batch_size {
                break;
            }
            offset += self.batch_size;
            sleep(self.sleep_between_batches).await;
        }

        progress.finish_and_clear();
        Ok(stats)
    }
}

fn create_spinner(class: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg} {pos} objects")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(class.to_string());
    pb
}

#[cfg(test)]
#[path = "copier_tests.rs"]
mod tests;
