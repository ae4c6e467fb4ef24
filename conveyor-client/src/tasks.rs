//! Task listing and acknowledgement endpoints

use reqwest::header::ACCEPT;
use uuid::Uuid;

use conveyor_core::domain::ack::TaskAck;
use conveyor_core::domain::task::Task;
use conveyor_core::domain::tenant::Tenant;
use conveyor_core::dto::TaskListResponse;

use crate::QueueClient;
use crate::auth::Credentials;
use crate::error::Result;
use crate::paging::Page;

/// Tasks per page requested from the server
///
/// 100 is the most the managed queue will return; it does not let the client
/// pick a page size. The admin queue honors an explicit `page_size` and
/// accepts values up to 2000.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Which task queue surface to consume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMode {
    /// The managed queue: every delivered task must be acknowledged before
    /// the server delivers more for the tenant
    Managed,
    /// The admin queue: an unacknowledged task simply stays enqueued and is
    /// redelivered on the next fetch
    Admin,
}

impl QueueMode {
    fn tasks_path(self) -> &'static str {
        match self {
            QueueMode::Managed => "tasks",
            QueueMode::Admin => "tasks/admin",
        }
    }
}

impl QueueClient {
    // =============================================================================
    // Task Queue
    // =============================================================================

    /// Fetch one page of pending tasks for a tenant, oldest first
    ///
    /// Authenticates with the tenant's actor credentials, recovering from an
    /// expired bearer token. Every raw payload on the page is decoded into a
    /// canonical [`Task`]; a payload with an unsupported schema fails the
    /// whole page.
    ///
    /// # Arguments
    /// * `tenant` - The tenant whose queue to read
    /// * `mode` - Managed or admin queue surface
    /// * `page` - 0-based page index
    /// * `page_size` - Requested page size (only honored by the admin queue)
    pub async fn list_tasks(
        &self,
        tenant: &Tenant,
        mode: QueueMode,
        page: usize,
        page_size: u32,
    ) -> Result<Page<Task>> {
        let credentials = Credentials::for_tenant(tenant);
        let url = format!("{}/{}", self.base_url(), mode.tasks_path());

        let response = self
            .execute_with_reauth(&credentials, |http| {
                http.get(&url)
                    .header(ACCEPT, "application/json")
                    .query(&[
                        ("page", page.to_string()),
                        ("page_size", page_size.to_string()),
                    ])
            })
            .await?;

        let body: TaskListResponse = self.handle_response(response).await?;
        let more = body.has_more();
        let items = body
            .data
            .iter()
            .map(Task::decode)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Page::new(items, more))
    }

    /// Acknowledge one task
    ///
    /// Issued synchronously, exactly once per delivered task. Uses the same
    /// expired-token recovery as fetching, with its own retry budget.
    pub async fn acknowledge_task(
        &self,
        tenant: &Tenant,
        mode: QueueMode,
        task_id: Uuid,
        ack: &TaskAck,
    ) -> Result<()> {
        let credentials = Credentials::for_tenant(tenant);
        let url = format!("{}/{}/{}/ack", self.base_url(), mode.tasks_path(), task_id);

        let response = self
            .execute_with_reauth(&credentials, |http| http.put(&url).json(ack))
            .await?;

        self.handle_empty_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use conveyor_core::domain::tenant::{AccountRef, AuthDescriptor, IntegrationRef};
    use serde_json::json;

    use crate::token::{InMemoryTokenStore, TokenStore};

    const TASK_ID: &str = "8d9f2a6c-1b3e-4d5f-8a7b-9c0d1e2f3a4b";

    fn tenant(scheme: &str) -> Tenant {
        Tenant {
            id: Uuid::new_v4(),
            name: "District 9".to_string(),
            account: AccountRef {
                id: Uuid::new_v4(),
                name: "Acme SIS".to_string(),
            },
            integration: IntegrationRef {
                name: "roster-sync".to_string(),
            },
            cloud: None,
            auth: AuthDescriptor {
                scheme: scheme.to_string(),
                client_id: "actor-1".to_string(),
                client_secret: "secret".to_string(),
            },
        }
    }

    fn task_page_body() -> String {
        json!({
            "data": [{
                "schema": "3.0",
                "type": "data_event",
                "id": TASK_ID,
                "action": "add",
                "object_type": "RDM:Student",
            }],
            "paging": {"next": null},
        })
        .to_string()
    }

    async fn token_mock(server: &mut mockito::Server, token: &str, hits: usize) -> mockito::Mock {
        server
            .mock("POST", "/oauth/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"access_token": token}).to_string())
            .expect(hits)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_list_tasks_attaches_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let token = token_mock(&mut server, "fresh", 1).await;
        let tasks = server
            .mock("GET", "/tasks/admin")
            .match_query(mockito::Matcher::UrlEncoded("page".into(), "0".into()))
            .match_header("authorization", "Bearer fresh")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(task_page_body())
            .create_async()
            .await;

        let client = QueueClient::new(server.url());
        let page = client
            .list_tasks(&tenant("oauth2"), QueueMode::Admin, 0, DEFAULT_PAGE_SIZE)
            .await
            .unwrap();

        assert_eq!(page.items.len(), 1);
        assert!(!page.more);
        assert_eq!(page.items[0].id(), Uuid::parse_str(TASK_ID).unwrap());
        token.assert_async().await;
        tasks.assert_async().await;
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_once_and_retried() {
        let mut server = mockito::Server::new_async().await;
        // The cached token is stale; the server rejects it exactly once
        let rejected = server
            .mock("GET", "/tasks")
            .match_query(mockito::Matcher::Any)
            .match_header("authorization", "Bearer stale")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;
        let token = token_mock(&mut server, "fresh", 1).await;
        let accepted = server
            .mock("GET", "/tasks")
            .match_query(mockito::Matcher::Any)
            .match_header("authorization", "Bearer fresh")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(task_page_body())
            .expect(1)
            .create_async()
            .await;

        let store = Arc::new(InMemoryTokenStore::new());
        store.set("actor-1", "stale".to_string());
        let client = QueueClient::new(server.url()).with_token_store(store);

        let page = client
            .list_tasks(&tenant("oauth2"), QueueMode::Managed, 0, DEFAULT_PAGE_SIZE)
            .await
            .unwrap();

        assert_eq!(page.items.len(), 1);
        rejected.assert_async().await;
        token.assert_async().await;
        accepted.assert_async().await;
    }

    #[tokio::test]
    async fn test_persistent_unauthorized_surfaces_after_retry_budget() {
        let mut server = mockito::Server::new_async().await;
        // Initial attempt plus 3 retries, each with a freshly exchanged token
        let token = token_mock(&mut server, "fresh", 4).await;
        let rejected = server
            .mock("GET", "/tasks")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .expect(4)
            .create_async()
            .await;

        let client = QueueClient::new(server.url());
        let err = client
            .list_tasks(&tenant("oauth2"), QueueMode::Managed, 0, DEFAULT_PAGE_SIZE)
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        token.assert_async().await;
        rejected.assert_async().await;
    }

    #[tokio::test]
    async fn test_basic_credentials_never_retry() {
        let mut server = mockito::Server::new_async().await;
        let rejected = server
            .mock("GET", "/tasks")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let client = QueueClient::new(server.url());
        let err = client
            .list_tasks(&tenant("basic"), QueueMode::Managed, 0, DEFAULT_PAGE_SIZE)
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        rejected.assert_async().await;
    }

    #[tokio::test]
    async fn test_acknowledge_puts_wire_shape() {
        let mut server = mockito::Server::new_async().await;
        let _token = token_mock(&mut server, "fresh", 1).await;
        let ack_mock = server
            .mock("PUT", format!("/tasks/admin/{TASK_ID}/ack").as_str())
            .match_header("authorization", "Bearer fresh")
            .match_body(mockito::Matcher::Json(json!({
                "status": "error",
                "message": "could not update record",
                "app_id": "42",
            })))
            .with_status(200)
            .create_async()
            .await;

        let client = QueueClient::new(server.url());
        let ack = TaskAck::error("could not update record").with_app_id("42");
        client
            .acknowledge_task(
                &tenant("oauth2"),
                QueueMode::Admin,
                Uuid::parse_str(TASK_ID).unwrap(),
                &ack,
            )
            .await
            .unwrap();

        ack_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_auth_failure_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let _token = token_mock(&mut server, "fresh", 1).await;
        let failing = server
            .mock("GET", "/tasks")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .with_body("queue unavailable")
            .expect(1)
            .create_async()
            .await;

        let client = QueueClient::new(server.url());
        let err = client
            .list_tasks(&tenant("oauth2"), QueueMode::Managed, 0, DEFAULT_PAGE_SIZE)
            .await
            .unwrap_err();

        assert!(err.is_server_error());
        failing.assert_async().await;
    }

    #[tokio::test]
    async fn test_undecodable_task_fails_the_page() {
        let mut server = mockito::Server::new_async().await;
        let _token = token_mock(&mut server, "fresh", 1).await;
        let _tasks = server
            .mock("GET", "/tasks")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "data": [{"schema": "9.0", "type": "data_event", "id": TASK_ID, "action": "add"}],
                    "paging": {"next": null},
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = QueueClient::new(server.url());
        let err = client
            .list_tasks(&tenant("oauth2"), QueueMode::Managed, 0, DEFAULT_PAGE_SIZE)
            .await
            .unwrap_err();

        assert!(matches!(err, crate::ClientError::DecodeError(_)));
    }
}
