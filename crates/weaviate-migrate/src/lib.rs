// Migration tool - pedantic lints relaxed for CLI ergonomics
#![allow(clippy::pedantic)]

//! # weaviate-migrate
//!
//! `weaviate-migrate` is a CLI tool and library for copying class schemas and
//! objects from one Weaviate instance to another, typically production to a
//! development box.
//!
//! Weaviate cannot change the vectorizer of an existing class. When a class
//! needs a different vectorizer on the destination, it is rebuilt through a
//! temporary class (see [`swap`]).
//!
//! ## Run Modes
//!
//! | Mode | Behaviour |
//! |------|-----------|
//! | `sync` | Decide per class, swap the ones that need it, skip failures |
//! | `replicate` | Recreate every class and copy everything; abort on failure |
//! | `swap` | Rebuild a single class through a temporary class |
//!
//! ## Configuration Example
//!
//! ```yaml
//! source:
//!   url: http://prod.example.com:8090
//!
//! destination:
//!   url: http://localhost:8095
//!   embedding_api_key_env: OPENAI_API_KEY
//!
//! options:
//!   batch_size: 100
//!
//! classes:
//!   ConstructionProducts:
//!     vectorizer:
//!       type: enabled
//!       module: text2vec-openai
//!     enforce_vectorizer: true
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod copier;
pub mod decider;
pub mod error;
pub mod pipeline;
pub mod retry;
pub mod schema;
pub mod swap;
pub mod transform;

pub use client::{DeleteOutcome, WeaviateClient};
pub use config::{ClassPolicy, MigrationConfig, MigrationOptions};
pub use copier::{BatchCopier, CopyStats};
pub use decider::MigrationDecision;
pub use error::{Error, Result};
pub use pipeline::{MigrationStats, Pipeline};
pub use schema::{ClassSchema, VectorizerTarget};
pub use swap::{StagedSwap, SwapReport, SwapStep};
pub use transform::SchemaTransformer;
