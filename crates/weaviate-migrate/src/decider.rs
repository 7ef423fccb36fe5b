//! Decides whether a class needs to be (re)migrated.

use tracing::debug;

use crate::client::WeaviateClient;
use crate::config::ClassPolicy;
use crate::error::{Error, Result};

/// Verdict for one class. Derived on every run, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationDecision {
    /// Whether the class should be migrated.
    pub needs_migration: bool,
    /// Human-readable reason.
    pub reason: String,
}

impl MigrationDecision {
    fn migrate(reason: impl Into<String>) -> Self {
        Self {
            needs_migration: true,
            reason: reason.into(),
        }
    }

    fn skip(reason: impl Into<String>) -> Self {
        Self {
            needs_migration: false,
            reason: reason.into(),
        }
    }
}

/// Inputs the decision is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassState {
    /// Objects in the source class.
    pub source_count: u64,
    /// Objects in the destination class (0 when it does not exist).
    pub destination_count: u64,
    /// Whether the destination vectorizer matches the policy. `None` when
    /// the policy does not enforce it or the destination class is absent.
    pub vectorizer_matches: Option<bool>,
}

/// Pure decision policy.
pub fn decide(state: &ClassState) -> MigrationDecision {
    if state.vectorizer_matches == Some(false) {
        return MigrationDecision::migrate("destination vectorizer does not match policy");
    }
    if state.destination_count > 0 {
        return MigrationDecision::skip(format!(
            "destination already has {} objects",
            state.destination_count
        ));
    }
    if state.source_count > 0 {
        return MigrationDecision::migrate(format!(
            "destination is empty, source has {} objects",
            state.source_count
        ));
    }
    MigrationDecision::skip("source is empty")
}

/// Object count of `class`, treating a missing class as empty.
pub async fn count_or_zero(client: &WeaviateClient, class: &str) -> Result<u64> {
    match client.count_objects(class).await {
        Ok(count) => Ok(count),
        Err(Error::ClassNotFound(_)) => Ok(0),
        Err(e) => Err(e),
    }
}

/// Gathers the counts (and, when enforced, the destination schema) for
/// `class` and applies [`decide`].
///
/// # Errors
///
/// Fails when a count query errors for any reason other than a missing class.
pub async fn evaluate(
    source: &WeaviateClient,
    destination: &WeaviateClient,
    class: &str,
    policy: &ClassPolicy,
) -> Result<MigrationDecision> {
    let destination_count = count_or_zero(destination, class).await?;
    let source_count = count_or_zero(source, class).await?;

    let vectorizer_matches = if policy.enforce_vectorizer {
        destination
            .find_class(class)
            .await?
            .map(|schema| policy.vectorizer.is_satisfied_by(&schema))
    } else {
        None
    };

    let state = ClassState {
        source_count,
        destination_count,
        vectorizer_matches,
    };
    debug!("{}: {:?}", class, state);

    Ok(decide(&state))
}
