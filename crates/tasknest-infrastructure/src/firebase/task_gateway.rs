//! [`TaskGateway`] over the Firestore `tasks` collection.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tasknest_core::config::FirebaseConfig;
use tasknest_core::error::{Result, TasknestError};
use tasknest_core::task::{Task, TaskDraft, TaskGateway, TaskUpdate};

use super::documents::{FirestoreClient, task_fields, task_from_document, update_fields};
use super::identity::IdTokenSource;

const TASKS_COLLECTION: &str = "tasks";

/// Stores tasks as documents in the `tasks` collection, one per task, with
/// the owner's uid in `userId`.
pub struct FirestoreTaskGateway {
    client: FirestoreClient,
    tokens: Arc<dyn IdTokenSource>,
}

impl FirestoreTaskGateway {
    pub fn new(config: &FirebaseConfig, tokens: Arc<dyn IdTokenSource>) -> Self {
        Self {
            client: FirestoreClient::new(Client::new(), config),
            tokens,
        }
    }

    /// Every request runs as the signed-in user. Token problems surface as
    /// storage errors since they fail the storage call.
    async fn id_token(&self) -> Result<String> {
        self.tokens.id_token().await.map_err(|e| match e {
            TasknestError::NotAuthenticated => e,
            other => TasknestError::storage(other.to_string()),
        })
    }

    fn task_path(task_id: &str) -> Result<String> {
        if task_id.is_empty() || task_id.contains('/') {
            return Err(TasknestError::storage(format!("Invalid task id '{}'", task_id)));
        }
        Ok(format!("{}/{}", TASKS_COLLECTION, task_id))
    }
}

#[async_trait]
impl TaskGateway for FirestoreTaskGateway {
    async fn create(&self, draft: &TaskDraft, owner_id: &str) -> Result<Task> {
        let token = self.id_token().await?;
        let now = Utc::now();
        let doc = self
            .client
            .create(&token, TASKS_COLLECTION, task_fields(draft, owner_id, now))
            .await?;

        let task = task_from_document(&doc, now);
        tracing::debug!("Created task {:?} for {}", task.id, owner_id);
        Ok(task)
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Task>> {
        let token = self.id_token().await?;
        let docs = self
            .client
            .query_equal(&token, TASKS_COLLECTION, "userId", owner_id, "createdAt")
            .await?;

        let now = Utc::now();
        Ok(docs.iter().map(|doc| task_from_document(doc, now)).collect())
    }

    async fn update(&self, task_id: &str, update: &TaskUpdate) -> Result<()> {
        let path = Self::task_path(task_id)?;
        let token = self.id_token().await?;
        let (fields, mask) = update_fields(update, Utc::now());

        self.client.patch(&token, &path, fields, &mask, true).await?;
        Ok(())
    }

    async fn delete(&self, task_id: &str) -> Result<()> {
        let path = Self::task_path(task_id)?;
        let token = self.id_token().await?;
        self.client.delete(&token, &path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use tasknest_core::task::{TaskState, TaskStatus};
    use tokio::sync::RwLock;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DOCS: &str = "/projects/demo/databases/(default)/documents";

    struct StaticToken(Result<String>);

    #[async_trait]
    impl IdTokenSource for StaticToken {
        async fn id_token(&self) -> Result<String> {
            self.0.clone()
        }
    }

    fn gateway(server: &MockServer) -> FirestoreTaskGateway {
        gateway_with_token(server, Ok("tok".into()))
    }

    fn gateway_with_token(server: &MockServer, token: Result<String>) -> FirestoreTaskGateway {
        let config = FirebaseConfig {
            api_key: "k".into(),
            project_id: "demo".into(),
            firestore_endpoint: server.uri(),
            ..FirebaseConfig::default()
        };
        FirestoreTaskGateway::new(&config, Arc::new(StaticToken(token)))
    }

    fn doc(id: &str, name: &str, status: &str, created: &str) -> serde_json::Value {
        json!({
            "name": format!("projects/demo/databases/(default)/documents/tasks/{id}"),
            "fields": {
                "name": { "stringValue": name },
                "description": { "stringValue": "d" },
                "deadline": { "stringValue": "2030-01-02" },
                "status": { "stringValue": status },
                "userId": { "stringValue": "u1" },
                "createdAt": { "timestampValue": created },
                "updatedAt": { "timestampValue": created },
            }
        })
    }

    #[tokio::test]
    async fn test_create_returns_stored_task() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{DOCS}/tasks")))
            .and(header("authorization", "Bearer tok"))
            .and(body_partial_json(json!({
                "fields": {
                    "name": { "stringValue": "Buy milk" },
                    "status": { "stringValue": "Pending" },
                    "userId": { "stringValue": "u1" },
                }
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(doc("abc", "Buy milk", "Pending", "2030-01-01T00:00:00Z")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let draft = TaskDraft::new(
            "Buy milk",
            "2%",
            NaiveDate::from_ymd_opt(2030, 1, 2).unwrap(),
        );
        let task = gateway(&server).create(&draft, "u1").await.unwrap();

        assert_eq!(task.id.as_deref(), Some("abc"));
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.user_id, "u1");
    }

    #[tokio::test]
    async fn test_list_by_owner_keeps_query_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{DOCS}:runQuery")))
            .and(body_partial_json(json!({
                "structuredQuery": {
                    "where": { "fieldFilter": { "field": { "fieldPath": "userId" }, "op": "EQUAL" } },
                    "orderBy": [{ "field": { "fieldPath": "createdAt" }, "direction": "DESCENDING" }],
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "document": doc("new", "Newer", "Pending", "2030-01-02T00:00:00Z"), "readTime": "2030-01-03T00:00:00Z" },
                { "document": doc("old", "Older", "Completed", "2030-01-01T00:00:00Z"), "readTime": "2030-01-03T00:00:00Z" },
            ])))
            .mount(&server)
            .await;

        let tasks = gateway(&server).list_by_owner("u1").await.unwrap();

        let ids: Vec<_> = tasks.iter().filter_map(|t| t.id.as_deref()).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert_eq!(tasks[1].status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_list_with_no_matches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{DOCS}:runQuery")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{ "readTime": "2030-01-03T00:00:00Z" }])),
            )
            .mount(&server)
            .await;

        assert!(gateway(&server).list_by_owner("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_status_sends_mask_and_precondition() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(format!("{DOCS}/tasks/abc")))
            .and(query_param("updateMask.fieldPaths", "status"))
            .and(query_param("updateMask.fieldPaths", "updatedAt"))
            .and(query_param("currentDocument.exists", "true"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(doc("abc", "Buy milk", "Completed", "2030-01-01T00:00:00Z")),
            )
            .expect(1)
            .mount(&server)
            .await;

        gateway(&server)
            .update_status("abc", TaskStatus::Completed)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_missing_task_is_storage_error() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": 404, "message": "No document to update", "status": "NOT_FOUND" }
            })))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .update_status("gone", TaskStatus::Completed)
            .await
            .unwrap_err();
        assert!(err.is_storage());
    }

    #[tokio::test]
    async fn test_delete_missing_task_fails() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(format!("{DOCS}/tasks/present")))
            .and(query_param("currentDocument.exists", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("{DOCS}/tasks/gone")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let gateway = gateway(&server);
        gateway.delete("present").await.unwrap();
        assert!(gateway.delete("gone").await.unwrap_err().is_storage());
    }

    #[tokio::test]
    async fn test_sync_overwrites_local_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{DOCS}:runQuery")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "document": doc("remote", "Remote", "Pending", "2030-01-01T00:00:00Z") },
            ])))
            .mount(&server)
            .await;

        let state = RwLock::new(TaskState::in_memory());
        state.write().await.add_task(Task {
            id: None,
            name: "Local only".into(),
            ..Task::default()
        });

        let count = gateway(&server).sync("u1", &state).await.unwrap();

        assert_eq!(count, 1);
        let state = state.read().await;
        assert_eq!(state.tasks()[0].id.as_deref(), Some("remote"));
    }

    #[tokio::test]
    async fn test_without_session_nothing_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let gateway = gateway_with_token(&server, Err(TasknestError::NotAuthenticated));
        let err = gateway.list_by_owner("u1").await.unwrap_err();
        assert_eq!(err, TasknestError::NotAuthenticated);
    }

    #[tokio::test]
    async fn test_permission_denied_is_storage_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": 403, "message": "Missing or insufficient permissions.", "status": "PERMISSION_DENIED" }
            })))
            .mount(&server)
            .await;

        let err = gateway(&server).list_by_owner("u1").await.unwrap_err();
        assert!(err.is_storage());
        assert!(err.to_string().contains("PERMISSION_DENIED"));
    }
}
