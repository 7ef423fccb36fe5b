//! Staged swap: rebuild a class under new schema settings via a temporary class.
//!
//! Weaviate cannot change the vectorizer of an existing class, so the class
//! is staged into `<Class>_temp` with the corrected schema, the original is
//! dropped and recreated, and the data is copied back.

use std::fmt;
use tracing::{info, warn};

use crate::client::{DeleteOutcome, WeaviateClient};
use crate::config::{ClassPolicy, MigrationOptions};
use crate::copier::{BatchCopier, CopyStats};
use crate::error::Error;
use crate::schema::ClassSchema;
use crate::transform::SchemaTransformer;

/// Steps of the swap, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapStep {
    /// Drop a leftover temporary class.
    DeleteTemp,
    /// Create the temporary class with the transformed schema.
    CreateTemp,
    /// Copy source objects into the temporary class.
    CopyToTemp,
    /// Drop the final class.
    DeleteFinal,
    /// Recreate the final class with the transformed schema.
    CreateFinal,
    /// Copy objects from the temporary class into the final class.
    CopyToFinal,
    /// Drop the temporary class.
    CleanupTemp,
}

impl fmt::Display for SwapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DeleteTemp => "DELETE_TEMP",
            Self::CreateTemp => "CREATE_TEMP",
            Self::CopyToTemp => "COPY_TO_TEMP",
            Self::DeleteFinal => "DELETE_FINAL",
            Self::CreateFinal => "CREATE_FINAL",
            Self::CopyToFinal => "COPY_TO_FINAL",
            Self::CleanupTemp => "DELETE_TEMP",
        };
        f.write_str(name)
    }
}

/// Result of a completed swap.
#[derive(Debug, Clone, Default)]
pub struct SwapReport {
    /// Class that was swapped.
    pub class: String,
    /// Steps that ran, in order.
    pub steps: Vec<SwapStep>,
    /// Non-fatal cleanup failures.
    pub warnings: Vec<String>,
    /// Source to temporary copy.
    pub to_temp: CopyStats,
    /// Temporary to final copy.
    pub to_final: CopyStats,
}

/// Error raised by a swap, tagged with the step that failed.
#[derive(Debug, thiserror::Error)]
#[error("swap of '{}' failed at {step}: {source}", .report.class)]
pub struct SwapError {
    /// Step that failed.
    pub step: SwapStep,
    /// Underlying error.
    pub source: Error,
    /// Progress made before the failure.
    pub report: SwapReport,
}

/// Runs the staged swap for one class at a time.
pub struct StagedSwap<'a> {
    source: &'a WeaviateClient,
    destination: &'a WeaviateClient,
    copier: BatchCopier,
    options: &'a MigrationOptions,
}

impl<'a> StagedSwap<'a> {
    /// Creates an orchestrator over a source and destination instance.
    pub fn new(
        source: &'a WeaviateClient,
        destination: &'a WeaviateClient,
        options: &'a MigrationOptions,
    ) -> Self {
        Self {
            source,
            destination,
            copier: BatchCopier::new(options),
            options,
        }
    }

    /// Swaps `schema`'s class into place on the destination under `policy`.
    ///
    /// `DELETE_*` failures are recorded as warnings and the swap continues.
    /// `CREATE_*` and copy failures abort the swap for this class.
    pub async fn run(
        &self,
        schema: &ClassSchema,
        policy: &ClassPolicy,
    ) -> std::result::Result<SwapReport, SwapError> {
        let class = schema.class.as_str();
        let temp = self.options.temp_class_name(class);
        let transformer = SchemaTransformer::new(policy.vectorizer.clone());
        let include_vector = !policy.vectorizer.embeds_on_insert();

        let mut report = SwapReport {
            class: class.to_string(),
            ..SwapReport::default()
        };

        info!("Swapping {} via {}", class, temp);

        self.delete(&temp, SwapStep::DeleteTemp, &mut report).await;

        let temp_schema = transformer.transform_as(schema, &temp);
        if let Err(e) = self.destination.create_class(&temp_schema).await {
            return Err(fail(SwapStep::CreateTemp, e, report));
        }
        info!("Class {} created successfully.", temp);
        report.steps.push(SwapStep::CreateTemp);

        match self
            .copier
            .copy_class(self.source, class, self.destination, &temp, include_vector)
            .await
        {
            Ok(stats) => report.to_temp = stats,
            Err(e) => return Err(fail(SwapStep::CopyToTemp, e, report)),
        }
        report.steps.push(SwapStep::CopyToTemp);

        self.delete(class, SwapStep::DeleteFinal, &mut report).await;

        let final_schema = transformer.transform_as(schema, class);
        if let Err(e) = self.destination.create_class(&final_schema).await {
            return Err(fail(SwapStep::CreateFinal, e, report));
        }
        info!("Class {} created successfully.", class);
        report.steps.push(SwapStep::CreateFinal);

        match self
            .copier
            .copy_class(self.destination, &temp, self.destination, class, include_vector)
            .await
        {
            Ok(stats) => report.to_final = stats,
            Err(e) => return Err(fail(SwapStep::CopyToFinal, e, report)),
        }
        report.steps.push(SwapStep::CopyToFinal);

        self.delete(&temp, SwapStep::CleanupTemp, &mut report).await;

        info!(
            "Swap of {} done: {} objects copied, {} failed",
            class, report.to_final.processed, report.to_final.failed
        );
        Ok(report)
    }

    /// Best-effort class deletion; 404 counts as success.
    async fn delete(&self, class: &str, step: SwapStep, report: &mut SwapReport) {
        match self.destination.delete_class(class).await {
            Ok(DeleteOutcome::Deleted) => info!("Deleted class {}", class),
            Ok(DeleteOutcome::NotFound) => {}
            Err(e) => {
                let message = format!("could not delete {}: {}", class, e);
                warn!("{}", message);
                report.warnings.push(message);
            }
        }
        report.steps.push(step);
    }
}

fn fail(step: SwapStep, error: Error, report: SwapReport) -> SwapError {
    SwapError {
        step,
        source: error,
        report,
    }
}

#[cfg(test)]
#[path = "swap_tests.rs"]
mod tests;
