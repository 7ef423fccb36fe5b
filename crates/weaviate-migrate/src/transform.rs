//! Schema transformation applied before a class is created on the destination.

use serde_json::{json, Map, Value};

use crate::schema::{ClassSchema, VectorizerTarget, NO_VECTORIZER};

/// Rewrites class schemas for a given vectorizer target.
///
/// The transformation is pure and idempotent: `transform(transform(s)) ==
/// transform(s)`.
#[derive(Debug, Clone, Default)]
pub struct SchemaTransformer {
    target: VectorizerTarget,
}

impl SchemaTransformer {
    /// Creates a transformer producing schemas for `target`.
    pub fn new(target: VectorizerTarget) -> Self {
        Self { target }
    }

    /// The vectorizer target this transformer applies.
    pub fn target(&self) -> &VectorizerTarget {
        &self.target
    }

    /// Returns a copy of `schema` with the target vectorizer settings applied
    /// and legacy or conflicting keys removed.
    #[must_use]
    pub fn transform(&self, schema: &ClassSchema) -> ClassSchema {
        let mut out = schema.clone();

        match &self.target {
            VectorizerTarget::Disabled => {
                out.vectorizer = Some(NO_VECTORIZER.to_string());
                out.module_config = None;
            }
            VectorizerTarget::Enabled {
                module,
                vectorize_class_name,
            } => {
                out.vectorizer = Some(module.clone());
                let mut module_config = Map::new();
                module_config.insert(
                    module.clone(),
                    json!({ "vectorizeClassName": vectorize_class_name }),
                );
                out.module_config = Some(Value::Object(module_config));
            }
        }

        // Weaviate rejects these when the vectorizer changes under them.
        out.vector_index_config = None;
        out.vector_config = None;

        for prop in &mut out.properties {
            prop.module_config = None;
            prop.vector_config = None;
            prop.index_inverted = None;
        }

        out
    }

    /// Like [`transform`](Self::transform), then renames the class.
    #[must_use]
    pub fn transform_as(&self, schema: &ClassSchema, class_name: &str) -> ClassSchema {
        let mut out = self.transform(schema);
        out.class = class_name.to_string();
        out
    }
}
