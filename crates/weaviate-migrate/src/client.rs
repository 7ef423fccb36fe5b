//! HTTP client for the Weaviate REST and GraphQL endpoints.

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::{InstanceConfig, MigrationOptions};
use crate::error::{from_status, Error, Result};
use crate::schema::{ClassSchema, NewObject, ObjectList, SchemaList, WeaviateObject};

/// Default HTTP timeout for schema and fetch calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the embedding provider key on inserts.
pub const EMBEDDING_KEY_HEADER: &str = "X-OpenAI-Api-Key";

/// Outcome of a class deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The class existed and was removed.
    Deleted,
    /// The class did not exist.
    NotFound,
}

/// Creates a configured HTTP client with timeout.
#[must_use]
pub fn create_http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// A client bound to one Weaviate instance.
#[derive(Debug, Clone)]
pub struct WeaviateClient {
    base_url: String,
    client: Client,
    api_key: Option<String>,
    insert_headers: HeaderMap,
    insert_timeout: Duration,
}

impl WeaviateClient {
    /// Creates a client for `instance` with the default timeouts.
    pub fn new(instance: &InstanceConfig) -> Self {
        Self {
            base_url: instance.url.trim_end_matches('/').to_string(),
            client: create_http_client(DEFAULT_TIMEOUT),
            api_key: instance.api_key.clone(),
            insert_headers: HeaderMap::new(),
            insert_timeout: Duration::from_secs(60),
        }
    }

    /// Creates a client for `instance` with timeouts taken from `options`.
    pub fn with_options(instance: &InstanceConfig, options: &MigrationOptions) -> Self {
        let mut client = Self::new(instance);
        client.client = create_http_client(Duration::from_secs(options.request_timeout_secs));
        client.insert_timeout = Duration::from_secs(options.insert_timeout_secs);
        client
    }

    /// Sends `key` as `X-OpenAI-Api-Key` on every insert.
    ///
    /// # Errors
    ///
    /// Returns a config error if the key is not a valid header value.
    pub fn with_embedding_key(mut self, key: &str) -> Result<Self> {
        let mut value = HeaderValue::from_str(key)
            .map_err(|e| Error::Config(format!("invalid embedding API key: {}", e)))?;
        value.set_sensitive(true);
        self.insert_headers.insert(EMBEDDING_KEY_HEADER, value);
        Ok(self)
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let req = self.client.request(method, url);
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    /// Fetches every class schema (`GET /v1/schema`).
    pub async fn get_schema(&self) -> Result<Vec<ClassSchema>> {
        let response = self
            .request(Method::GET, &self.url("/v1/schema"))
            .send()
            .await?;
        let list: SchemaList = ensure_success(response, "get schema").await?.json().await?;
        Ok(list.classes)
    }

    /// Fetches one class schema (`GET /v1/schema/{class}`).
    pub async fn get_class(&self, class: &str) -> Result<ClassSchema> {
        self.find_class(class)
            .await?
            .ok_or_else(|| Error::ClassNotFound(class.to_string()))
    }

    /// Fetches one class schema, `None` when it does not exist.
    pub async fn find_class(&self, class: &str) -> Result<Option<ClassSchema>> {
        let response = self
            .request(Method::GET, &self.url(&format!("/v1/schema/{}", class)))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let schema = ensure_success(response, "get class").await?.json().await?;
        Ok(Some(schema))
    }

    /// Creates a class (`POST /v1/schema`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaCreate`] when the server rejects the schema.
    pub async fn create_class(&self, schema: &ClassSchema) -> Result<()> {
        let response = self
            .request(Method::POST, &self.url("/v1/schema"))
            .json(schema)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::SchemaCreate {
                class: schema.class.clone(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Deletes a class (`DELETE /v1/schema/{class}`). A missing class is not an error.
    pub async fn delete_class(&self, class: &str) -> Result<DeleteOutcome> {
        let response = self
            .request(Method::DELETE, &self.url(&format!("/v1/schema/{}", class)))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(DeleteOutcome::NotFound);
        }
        ensure_success(response, "delete class").await?;
        Ok(DeleteOutcome::Deleted)
    }

    /// Fetches one page of objects with their vectors.
    pub async fn list_objects(
        &self,
        class: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<WeaviateObject>> {
        let response = self
            .request(Method::GET, &self.url("/v1/objects"))
            .query(&[
                ("class", class.to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
                ("include", "vector".to_string()),
            ])
            .send()
            .await?;
        let list: ObjectList = ensure_success(response, "list objects").await?.json().await?;
        debug!(
            "Fetched {} objects from {} at offset {}",
            list.objects.len(),
            class,
            offset
        );
        Ok(list.objects)
    }

    /// Inserts one object (`POST /v1/objects`).
    pub async fn insert_object(&self, object: &NewObject) -> Result<()> {
        let response = self
            .request(Method::POST, &self.url("/v1/objects"))
            .headers(self.insert_headers.clone())
            .timeout(self.insert_timeout)
            .json(object)
            .send()
            .await?;
        ensure_success(response, "insert object").await?;
        Ok(())
    }

    /// Counts objects in `class` with an aggregate query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotFound`] when the class does not exist.
    pub async fn count_objects(&self, class: &str) -> Result<u64> {
        let query = serde_json::json!({ "query": aggregate_count_query(class) });
        let response = self
            .request(Method::POST, &self.url("/v1/graphql"))
            .json(&query)
            .send()
            .await?;
        let body: serde_json::Value = ensure_success(response, "aggregate count")
            .await?
            .json()
            .await?;
        parse_aggregate_count(&body, class)
    }
}

/// GraphQL query returning the object count of `class`.
pub fn aggregate_count_query(class: &str) -> String {
    format!("{{Aggregate{{{}{{meta{{count}}}}}}}}", class)
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

fn parse_aggregate_count(body: &serde_json::Value, class: &str) -> Result<u64> {
    if let Some(errors) = body.get("errors") {
        let errors: Vec<GraphQlError> = serde_json::from_value(errors.clone())?;
        if errors
            .iter()
            .any(|e| e.message.contains("Cannot query field"))
        {
            return Err(Error::ClassNotFound(class.to_string()));
        }
        if !errors.is_empty() {
            let joined = errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::GraphQl(joined));
        }
    }

    let groups = body
        .pointer(&format!("/data/Aggregate/{}", class))
        .and_then(|v| v.as_array())
        .ok_or_else(|| {
            Error::Extraction(format!("aggregate response for '{}' has no data", class))
        })?;

    // No groups means an empty class.
    Ok(groups
        .first()
        .and_then(|g| g.pointer("/meta/count"))
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0))
}

async fn ensure_success(response: Response, operation: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(from_status(status.as_u16(), body, operation))
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
