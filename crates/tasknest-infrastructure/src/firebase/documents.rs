//! Minimal Firestore REST client and typed-value helpers.
//!
//! Firestore wraps every field in a typed value (`{"stringValue": "..."}`,
//! `{"timestampValue": "..."}`, ...). Only the shapes tasknest writes are
//! handled here.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tasknest_core::config::FirebaseConfig;
use tasknest_core::error::Result;
use tasknest_core::task::{Task, TaskDraft, TaskStatus, TaskUpdate};

use super::error::{storage_error, transport_storage_error};

pub(crate) type Fields = Map<String, Value>;

/// A Firestore document as returned by the REST API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Document {
    /// Full resource name; the last path segment is the document id.
    pub name: String,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default)]
    pub create_time: Option<DateTime<Utc>>,
}

impl Document {
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    pub fn string(&self, field: &str) -> Option<&str> {
        self.fields.get(field)?.get("stringValue")?.as_str()
    }

    /// Reads a timestamp stored either as `timestampValue` or as an RFC 3339
    /// `stringValue`.
    pub fn timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        let value = self.fields.get(field)?;
        let raw = value
            .get("timestampValue")
            .or_else(|| value.get("stringValue"))?
            .as_str()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }
}

#[derive(Debug, Deserialize)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<Document>,
}

pub(crate) fn string_value(value: &str) -> Value {
    json!({ "stringValue": value })
}

pub(crate) fn bool_value(value: bool) -> Value {
    json!({ "booleanValue": value })
}

pub(crate) fn timestamp_value(value: DateTime<Utc>) -> Value {
    json!({ "timestampValue": value.to_rfc3339_opts(SecondsFormat::Micros, true) })
}

fn date_string(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Fields for a newly created task document.
pub(crate) fn task_fields(draft: &TaskDraft, owner_id: &str, now: DateTime<Utc>) -> Fields {
    let mut fields = Fields::new();
    fields.insert("name".into(), string_value(&draft.name));
    fields.insert("description".into(), string_value(&draft.description));
    fields.insert("deadline".into(), string_value(&date_string(draft.deadline)));
    fields.insert("status".into(), string_value(TaskStatus::Pending.as_str()));
    fields.insert("userId".into(), string_value(owner_id));
    fields.insert("createdAt".into(), timestamp_value(now));
    fields.insert("updatedAt".into(), timestamp_value(now));
    fields
}

/// Fields and update mask for a partial update. `updatedAt` is always part of it.
pub(crate) fn update_fields(update: &TaskUpdate, now: DateTime<Utc>) -> (Fields, Vec<&'static str>) {
    let mut fields = Fields::new();
    if let Some(name) = &update.name {
        fields.insert("name".into(), string_value(name));
    }
    if let Some(description) = &update.description {
        fields.insert("description".into(), string_value(description));
    }
    if let Some(deadline) = update.deadline {
        fields.insert("deadline".into(), string_value(&date_string(deadline)));
    }
    if let Some(status) = update.status {
        fields.insert("status".into(), string_value(status.as_str()));
    }
    fields.insert("updatedAt".into(), timestamp_value(now));

    let mut mask = update.field_names();
    mask.push("updatedAt");
    (fields, mask)
}

/// Decodes a task document. Missing timestamps fall back to the document's
/// create time, then to `now`.
pub(crate) fn task_from_document(doc: &Document, now: DateTime<Utc>) -> Task {
    let created_at = doc.timestamp("createdAt").or(doc.create_time).unwrap_or(now);
    Task {
        id: Some(doc.id().to_string()),
        name: doc.string("name").unwrap_or_default().to_string(),
        description: doc.string("description").unwrap_or_default().to_string(),
        deadline: doc
            .string("deadline")
            .and_then(|raw| NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d").ok())
            .unwrap_or_default(),
        status: doc
            .string("status")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default(),
        user_id: doc.string("userId").unwrap_or_default().to_string(),
        created_at,
        updated_at: doc.timestamp("updatedAt").unwrap_or(created_at),
    }
}

/// Thin wrapper over the Firestore documents endpoint.
#[derive(Debug, Clone)]
pub(crate) struct FirestoreClient {
    client: Client,
    documents_url: String,
}

impl FirestoreClient {
    pub fn new(client: Client, config: &FirebaseConfig) -> Self {
        let documents_url = format!(
            "{}/projects/{}/databases/(default)/documents",
            config.firestore_endpoint.trim_end_matches('/'),
            config.project_id
        );
        Self {
            client,
            documents_url,
        }
    }

    /// Creates a document with a generated id in `collection`.
    pub async fn create(&self, id_token: &str, collection: &str, fields: Fields) -> Result<Document> {
        let request = self
            .client
            .post(format!("{}/{}", self.documents_url, collection))
            .json(&json!({ "fields": fields }));
        self.send(request, id_token).await
    }

    /// Writes `fields` into the document at `path`.
    ///
    /// With `must_exist`, a missing document fails instead of being created.
    pub async fn patch(
        &self,
        id_token: &str,
        path: &str,
        fields: Fields,
        mask: &[&str],
        must_exist: bool,
    ) -> Result<Document> {
        let mut query: Vec<(&str, &str)> = mask
            .iter()
            .map(|field| ("updateMask.fieldPaths", *field))
            .collect();
        if must_exist {
            query.push(("currentDocument.exists", "true"));
        }

        let request = self
            .client
            .patch(format!("{}/{}", self.documents_url, path))
            .query(&query)
            .json(&json!({ "fields": fields }));
        self.send(request, id_token).await
    }

    /// Reads the document at `path`, `None` when absent.
    pub async fn get(&self, id_token: &str, path: &str) -> Result<Option<Document>> {
        let response = self
            .client
            .get(format!("{}/{}", self.documents_url, path))
            .bearer_auth(id_token)
            .send()
            .await
            .map_err(transport_storage_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::decode(response).await.map(Some)
    }

    /// Deletes the document at `path`. Fails when it does not exist.
    pub async fn delete(&self, id_token: &str, path: &str) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/{}", self.documents_url, path))
            .query(&[("currentDocument.exists", "true")])
            .bearer_auth(id_token)
            .send()
            .await
            .map_err(transport_storage_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(storage_error(status, &body))
    }

    /// Documents in `collection` whose `field` equals `value`, ordered by
    /// `order_by` descending.
    pub async fn query_equal(
        &self,
        id_token: &str,
        collection: &str,
        field: &str,
        value: &str,
        order_by: &str,
    ) -> Result<Vec<Document>> {
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field },
                        "op": "EQUAL",
                        "value": string_value(value),
                    }
                },
                "orderBy": [{
                    "field": { "fieldPath": order_by },
                    "direction": "DESCENDING",
                }],
            }
        });

        let request = self
            .client
            .post(format!("{}:runQuery", self.documents_url))
            .json(&body);
        let items: Vec<RunQueryItem> = self.send(request, id_token).await?;
        Ok(items.into_iter().filter_map(|item| item.document).collect())
    }

    async fn send<T>(&self, request: RequestBuilder, id_token: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = request
            .bearer_auth(id_token)
            .send()
            .await
            .map_err(transport_storage_error)?;
        Self::decode(response).await
    }

    async fn decode<T>(response: reqwest::Response) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(storage_error(status, &body));
        }
        response.json::<T>().await.map_err(transport_storage_error)
    }
}
