//! Migration pipeline orchestration.
//!
//! Three run modes share the same building blocks:
//!
//! - [`Pipeline::replicate`] recreates every class on the destination and
//!   copies all objects. The first schema-creation failure aborts the run.
//! - [`Pipeline::swap`] rebuilds one class through a temporary class.
//! - [`Pipeline::sync`] asks the decider about every class and swaps the ones
//!   that need it. A failing class is logged and skipped.

use std::time::Instant;
use tracing::{error, info, warn};

use crate::client::{DeleteOutcome, WeaviateClient};
use crate::config::{ClassPolicy, MigrationConfig};
use crate::copier::{BatchCopier, CopyStats};
use crate::decider::{evaluate, MigrationDecision};
use crate::error::Result;
use crate::schema::ClassSchema;
use crate::swap::{StagedSwap, SwapError};
use crate::transform::SchemaTransformer;

/// Migration statistics.
#[derive(Debug, Default, Clone)]
pub struct MigrationStats {
    /// Classes migrated.
    pub classes_migrated: u64,
    /// Classes the decider skipped.
    pub classes_skipped: u64,
    /// Classes abandoned after an error.
    pub classes_failed: u64,
    /// Object counters summed over every copy that ran.
    pub objects: CopyStats,
    /// Duration in seconds.
    pub duration_secs: f64,
}

impl MigrationStats {
    /// Calculate throughput (objects per second).
    #[must_use]
    pub fn throughput(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.objects.processed as f64 / self.duration_secs
        } else {
            0.0
        }
    }
}

/// Migration pipeline.
pub struct Pipeline {
    config: MigrationConfig,
    source: WeaviateClient,
    destination: WeaviateClient,
    embedding_destination: WeaviateClient,
}

impl Pipeline {
    /// Create a new migration pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedding key is not a valid header value.
    pub fn new(config: MigrationConfig) -> Result<Self> {
        let source = WeaviateClient::with_options(&config.source, &config.options);
        let destination =
            WeaviateClient::with_options(&config.destination.instance(), &config.options);

        let embedding_destination = match config.destination.embedding_api_key() {
            Some(key) => destination.clone().with_embedding_key(&key)?,
            None => {
                if config.needs_embedding_key() {
                    warn!(
                        "{} is not set; inserts into vectorized classes may fail",
                        config.destination.embedding_api_key_env
                    );
                }
                destination.clone()
            }
        };

        Ok(Self {
            config,
            source,
            destination,
            embedding_destination,
        })
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Destination client to insert through under `policy`.
    fn destination_for(&self, policy: &ClassPolicy) -> &WeaviateClient {
        if policy.vectorizer.embeds_on_insert() {
            &self.embedding_destination
        } else {
            &self.destination
        }
    }

    /// Fetches the source schemas for `only`, or every class when empty.
    ///
    /// # Errors
    ///
    /// Any failure here is fatal; there is nothing to migrate without a schema.
    pub async fn fetch_classes(&self, only: &[String]) -> Result<Vec<ClassSchema>> {
        info!("Fetching source schema from {}", self.source.base_url());
        if only.is_empty() {
            return self.source.get_schema().await;
        }
        let mut classes = Vec::with_capacity(only.len());
        for name in only {
            classes.push(self.source.get_class(name).await?);
        }
        Ok(classes)
    }

    /// Recreates every class on the destination, then copies all objects.
    ///
    /// # Errors
    ///
    /// Aborts on the first schema-creation or page-fetch failure.
    pub async fn replicate(&self, only: &[String]) -> Result<MigrationStats> {
        let start = Instant::now();
        let mut stats = MigrationStats::default();
        let classes = self.fetch_classes(only).await?;

        info!("Cleaning and applying schema to destination...");
        for schema in &classes {
            let policy = self.config.policy_for(&schema.class);
            match self.destination.delete_class(&schema.class).await {
                Ok(DeleteOutcome::Deleted) => info!("Deleted existing class {}", schema.class),
                Ok(DeleteOutcome::NotFound) => {}
                Err(e) => warn!("Could not delete {} on destination: {}", schema.class, e),
            }

            let transformed = SchemaTransformer::new(policy.vectorizer.clone()).transform(schema);
            self.destination.create_class(&transformed).await?;
            info!("Class {} created successfully.", schema.class);
        }

        let copier = BatchCopier::new(&self.config.options);
        for schema in &classes {
            let policy = self.config.policy_for(&schema.class);
            let copied = copier
                .copy_class(
                    &self.source,
                    &schema.class,
                    self.destination_for(policy),
                    &schema.class,
                    !policy.vectorizer.embeds_on_insert(),
                )
                .await?;
            stats.objects.merge(&copied);
            stats.classes_migrated += 1;
        }

        stats.duration_secs = start.elapsed().as_secs_f64();
        log_summary(&stats);
        Ok(stats)
    }

    /// Rebuilds `class` on the destination through a temporary class.
    ///
    /// # Errors
    ///
    /// Returns the error of the failed step.
    pub async fn swap(&self, class: &str) -> Result<MigrationStats> {
        let start = Instant::now();
        let mut stats = MigrationStats::default();
        let schema = self.source.get_class(class).await?;
        let policy = self.config.policy_for(class);

        let report = StagedSwap::new(
            &self.source,
            self.destination_for(policy),
            &self.config.options,
        )
        .run(&schema, policy)
        .await
        .map_err(|e| {
            error!("{}", e);
            e.source
        })?;

        stats.objects = report.to_final;
        stats.classes_migrated = 1;
        stats.duration_secs = start.elapsed().as_secs_f64();
        log_summary(&stats);
        Ok(stats)
    }

    /// Migrates every class the decider flags, continuing past failures.
    ///
    /// # Errors
    ///
    /// Only fails when the source schema cannot be fetched.
    pub async fn sync(&self, only: &[String]) -> Result<MigrationStats> {
        let start = Instant::now();
        let mut stats = MigrationStats::default();
        let classes = self.fetch_classes(only).await?;

        for schema in &classes {
            let class = schema.class.as_str();
            let policy = self.config.policy_for(class);

            let decision = match evaluate(&self.source, &self.destination, class, policy).await {
                Ok(decision) => decision,
                Err(e) => {
                    error!("Could not decide on {}: {}", class, e);
                    stats.classes_failed += 1;
                    continue;
                }
            };

            if !decision.needs_migration {
                info!("Skipping {}: {}", class, decision.reason);
                stats.classes_skipped += 1;
                continue;
            }
            info!("Migrating {}: {}", class, decision.reason);

            let swap = StagedSwap::new(
                &self.source,
                self.destination_for(policy),
                &self.config.options,
            );
            match swap.run(schema, policy).await {
                Ok(report) => {
                    stats.objects.merge(&report.to_final);
                    stats.classes_migrated += 1;
                }
                Err(SwapError { step, source, .. }) => {
                    error!("Abandoning {} at {}: {}", class, step, source);
                    stats.classes_failed += 1;
                }
            }
        }

        stats.duration_secs = start.elapsed().as_secs_f64();
        log_summary(&stats);
        Ok(stats)
    }

    /// Computes the decision for each class without writing anything.
    ///
    /// # Errors
    ///
    /// Fails when the source schema cannot be fetched. A class whose counts
    /// cannot be read carries its own error in the returned list.
    pub async fn plan(&self, only: &[String]) -> Result<Vec<(String, Result<MigrationDecision>)>> {
        let classes = self.fetch_classes(only).await?;
        let mut plan = Vec::with_capacity(classes.len());

        for schema in classes {
            let policy = self.config.policy_for(&schema.class);
            let decision = evaluate(&self.source, &self.destination, &schema.class, policy).await;
            if let Err(e) = &decision {
                warn!("Could not decide on {}: {}", schema.class, e);
            }
            plan.push((schema.class, decision));
        }

        Ok(plan)
    }
}

fn log_summary(stats: &MigrationStats) {
    info!(
        "Migration complete: {} classes migrated, {} skipped, {} failed; {} objects copied, {} failed in {:.2}s ({:.0} obj/sec)",
        stats.classes_migrated,
        stats.classes_skipped,
        stats.classes_failed,
        stats.objects.processed,
        stats.objects.failed,
        stats.duration_secs,
        stats.throughput()
    );
}
