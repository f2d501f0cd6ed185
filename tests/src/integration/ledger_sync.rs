//! # Ledger Synchronisation Tests
//!
//! Listings, uploads and logouts interleave freely. The ledger must end up
//! showing the newest listing plus any upload the listing could not have
//! seen, and nothing from a session that has ended.

#[cfg(test)]
mod tests {
    use ic_02_task_ledger::{StatusRegression, TaskLedgerApi};
    use shared_types::{ClientError, TaskStatus};

    use crate::integration::server::{count, image, TestClient, EMAIL, PASSWORD};

    /// Yields until the server has received `calls` listing requests.
    async fn until_listed(client: &TestClient, calls: usize) {
        while count(&client.server.calls.list) < calls {
            tokio::task::yield_now().await;
        }
    }

    fn ids(client: &TestClient) -> Vec<u64> {
        client
            .ledger
            .snapshot()
            .tasks
            .iter()
            .map(|t| t.id().0)
            .collect()
    }

    // =========================================================================
    // STEADY STATE
    // =========================================================================

    #[tokio::test]
    async fn test_listing_follows_server_progress() {
        let client = TestClient::logged_in(0).await;
        let first = client.server.seed_task(TaskStatus::Queued);
        let second = client.server.seed_task(TaskStatus::Queued);

        client.ledger.fetch_tasks().await.unwrap();
        assert_eq!(ids(&client), vec![second.0, first.0]);
        assert_eq!(client.ledger.snapshot().pending_count(), 2);

        client.server.set_status(first, TaskStatus::Processing);
        client.server.set_status(second, TaskStatus::Completed);
        let tasks = client.ledger.fetch_tasks().await.unwrap();
        assert_eq!(tasks[0].status(), TaskStatus::Completed);
        assert_eq!(tasks[0].result_path(), Some("results/2.png"));
        assert_eq!(tasks[1].status(), TaskStatus::Processing);

        client.server.set_status(first, TaskStatus::Failed);
        client.ledger.fetch_tasks().await.unwrap();
        let snapshot = client.ledger.snapshot();
        assert!(snapshot.all_settled());
        assert_eq!(snapshot.tasks[1].error_message(), Some("worker crashed"));
    }

    #[tokio::test]
    async fn test_single_task_refresh_updates_collection() {
        let client = TestClient::logged_in(0).await;
        let id = client.server.seed_task(TaskStatus::Queued);
        client.ledger.fetch_tasks().await.unwrap();

        client.server.set_status(id, TaskStatus::Processing);
        let task = client.ledger.fetch_task(id).await.unwrap();

        assert_eq!(task.status(), TaskStatus::Processing);
        assert_eq!(client.ledger.snapshot().tasks[0].status(), TaskStatus::Processing);
    }

    #[tokio::test]
    async fn test_backwards_status_is_flagged_not_applied() {
        let client = TestClient::logged_in(0).await;
        let id = client.server.seed_task(TaskStatus::Completed);
        client.ledger.fetch_tasks().await.unwrap();

        client.server.set_status(id, TaskStatus::Queued);
        client.ledger.fetch_tasks().await.unwrap();

        let snapshot = client.ledger.snapshot();
        assert_eq!(snapshot.tasks[0].status(), TaskStatus::Completed);
        assert_eq!(
            snapshot.regressions,
            vec![StatusRegression {
                task_id: id,
                current: TaskStatus::Completed,
                reported: TaskStatus::Queued,
            }]
        );
    }

    // =========================================================================
    // RACES
    // =========================================================================

    #[tokio::test]
    async fn test_upload_during_listing_survives() {
        let client = TestClient::logged_in(1).await;
        let seeded = client.server.seed_task(TaskStatus::Processing);

        let gate = client.server.gate_next_listing();
        let ledger = client.ledger.clone();
        let listing = tokio::spawn(async move { ledger.fetch_tasks().await });
        until_listed(&client, 1).await;
        assert!(client.ledger.snapshot().loading);

        let created = client
            .dashboard
            .guard()
            .submit(image("late.png"), None)
            .await
            .unwrap();

        gate.notify_one();
        listing.await.unwrap().unwrap();

        assert_eq!(ids(&client), vec![created.id().0, seeded.0]);
        assert!(!client.ledger.snapshot().loading);
    }

    #[tokio::test]
    async fn test_older_listing_completing_last_is_ignored() {
        let client = TestClient::logged_in(0).await;
        let id = client.server.seed_task(TaskStatus::Queued);

        let gate = client.server.gate_next_listing();
        let ledger = client.ledger.clone();
        let older = tokio::spawn(async move { ledger.fetch_tasks().await });
        until_listed(&client, 1).await;

        client.server.set_status(id, TaskStatus::Completed);
        client.ledger.fetch_tasks().await.unwrap();

        gate.notify_one();
        let tasks = older.await.unwrap().unwrap();

        assert_eq!(tasks[0].status(), TaskStatus::Completed);
        let snapshot = client.ledger.snapshot();
        assert_eq!(snapshot.tasks[0].status(), TaskStatus::Completed);
        assert!(snapshot.regressions.is_empty());
    }

    #[tokio::test]
    async fn test_logout_during_listing_discards_response() {
        let client = TestClient::logged_in(0).await;
        client.server.seed_task(TaskStatus::Queued);

        let gate = client.server.gate_next_listing();
        let ledger = client.ledger.clone();
        let listing = tokio::spawn(async move { ledger.fetch_tasks().await });
        until_listed(&client, 1).await;

        client.dashboard.logout();
        gate.notify_one();

        assert_eq!(listing.await.unwrap(), Err(ClientError::AuthRequired));
        let snapshot = client.ledger.snapshot();
        assert!(snapshot.tasks.is_empty());
        assert!(!snapshot.loading);

        client.session.login(EMAIL, PASSWORD).await.unwrap();
        client.ledger.fetch_tasks().await.unwrap();
        assert_eq!(client.ledger.snapshot().tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_token_reports_auth_required() {
        let client = TestClient::logged_in(0).await;
        client.server.seed_task(TaskStatus::Queued);
        client.ledger.fetch_tasks().await.unwrap();

        client.server.expire_tokens();
        let err = client.ledger.fetch_tasks().await.unwrap_err();

        assert!(err.requires_login());
        let snapshot = client.ledger.snapshot();
        assert_eq!(snapshot.tasks.len(), 1);
        assert_eq!(
            snapshot.error.as_deref(),
            Some("Failed to fetch tasks: authentication required")
        );
    }
}
