//! Weaviate class schema and object types.
//!
//! Only the keys the migration touches are modelled as fields. Everything
//! else is carried through `extra` so a schema survives a fetch/create
//! round trip unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Vectorizer name Weaviate uses for classes without a vectorizer module.
pub const NO_VECTORIZER: &str = "none";

/// A class (collection) definition as returned by `GET /v1/schema/{class}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSchema {
    /// Class name.
    pub class: String,
    /// Vectorizer module name, `"none"` when disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vectorizer: Option<String>,
    /// Class-level module configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_config: Option<Value>,
    /// Vector index configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_index_config: Option<Value>,
    /// Named vector configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_config: Option<Value>,
    /// Property definitions.
    #[serde(default)]
    pub properties: Vec<Property>,
    /// All remaining keys, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClassSchema {
    /// Vectorizer name, treating a missing field as `"none"`.
    #[must_use]
    pub fn vectorizer_name(&self) -> &str {
        self.vectorizer.as_deref().unwrap_or(NO_VECTORIZER)
    }
}

/// A class property definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    /// Property name.
    pub name: String,
    /// Property-level module configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_config: Option<Value>,
    /// Property-level vector configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_config: Option<Value>,
    /// Deprecated; superseded by `indexFilterable` / `indexSearchable`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_inverted: Option<bool>,
    /// All remaining keys, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of `GET /v1/schema`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaList {
    /// All classes on the instance.
    #[serde(default)]
    pub classes: Vec<ClassSchema>,
}

/// Vectorizer setting a migrated class should end up with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VectorizerTarget {
    /// No vectorizer; vectors are copied from the source as-is.
    #[default]
    #[serde(rename = "none", alias = "disabled")]
    Disabled,
    /// A vectorizer module that embeds objects on insert.
    Enabled {
        /// Module name, e.g. `text2vec-openai`.
        #[serde(default = "default_module")]
        module: String,
        /// Whether the class name is part of the vectorized text.
        #[serde(default)]
        vectorize_class_name: bool,
    },
}

fn default_module() -> String {
    "text2vec-openai".to_string()
}

impl VectorizerTarget {
    /// The canonical OpenAI vectorizer with `vectorizeClassName=false`.
    #[must_use]
    pub fn openai() -> Self {
        Self::Enabled {
            module: default_module(),
            vectorize_class_name: false,
        }
    }

    /// Value the class `vectorizer` field must hold for this target.
    #[must_use]
    pub fn vectorizer_name(&self) -> &str {
        match self {
            Self::Disabled => NO_VECTORIZER,
            Self::Enabled { module, .. } => module,
        }
    }

    /// True when the destination generates embeddings itself, in which case
    /// source vectors are not copied.
    #[must_use]
    pub fn embeds_on_insert(&self) -> bool {
        matches!(self, Self::Enabled { .. })
    }

    /// True when `schema` already carries this vectorizer.
    #[must_use]
    pub fn is_satisfied_by(&self, schema: &ClassSchema) -> bool {
        schema.vectorizer_name() == self.vectorizer_name()
    }
}

/// An object as returned by `GET /v1/objects`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaviateObject {
    /// Owning class.
    pub class: String,
    /// Object identifier.
    #[serde(default)]
    pub id: Option<Uuid>,
    /// Property values.
    #[serde(default)]
    pub properties: Option<Value>,
    /// Embedding vector, present when requested with `include=vector`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
    /// Read-only metadata (`creationTimeUnix`, `lastUpdateTimeUnix`, ...).
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl WeaviateObject {
    /// Builds the insert payload for `class`, dropping server metadata.
    #[must_use]
    pub fn into_insert(self, class: &str, include_vector: bool) -> NewObject {
        NewObject {
            class: class.to_string(),
            id: self.id,
            properties: self.properties,
            vector: if include_vector { self.vector } else { None },
        }
    }
}

/// Body of `POST /v1/objects`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewObject {
    /// Destination class.
    pub class: String,
    /// Identifier carried over from the source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    /// Property values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
    /// Vector, omitted when the destination vectorizes on insert.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

/// Response of `GET /v1/objects`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ObjectList {
    #[serde(default)]
    pub objects: Vec<WeaviateObject>,
}
