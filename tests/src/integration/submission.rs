//! # Submission Gate Tests
//!
//! The credit check sits in front of every upload:
//!
//! ```text
//! [Dashboard] ──submit──→ [Submission Guard] ──balance ok──→ [Task Ledger] ──→ server
//!                                │
//!                                └── balance < 1 ──→ refused, no request
//! ```
//!
//! The server stays the final authority: a stale local balance can let a
//! request through, and the server refuses it.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ic_01_session::SessionApi;
    use ic_02_task_ledger::TaskLedgerApi;
    use shared_types::{ClientError, TaskStatus};

    use crate::integration::server::{count, image, InMemoryServer, TestClient};

    // =========================================================================
    // CREDIT GATE
    // =========================================================================

    #[tokio::test]
    async fn test_zero_balance_makes_no_upload_request() {
        let client = TestClient::logged_in(0).await;

        let (outcome, notice) = client.dashboard.submit(image("a.png"), None).await;

        assert_eq!(
            outcome.unwrap_err(),
            ClientError::InsufficientCredits {
                available: 0,
                required: 1
            }
        );
        assert_eq!(notice.description, "Not enough credits to process image");
        assert_eq!(count(&client.server.calls.create), 0);
        assert!(client.ledger.snapshot().tasks.is_empty());
    }

    #[tokio::test]
    async fn test_balance_stays_stale_until_refreshed() {
        let client = TestClient::logged_in(1).await;
        let guard = client.dashboard.guard();

        let task = guard.submit(image("a.png"), None).await.unwrap();

        assert_eq!(task.status(), TaskStatus::Queued);
        assert_eq!(count(&client.server.calls.create), 1);
        assert_eq!(client.server.credits(), 0);
        // Only an authoritative fetch changes the local balance.
        assert_eq!(client.session.credits(), Some(1));

        assert_eq!(client.session.refresh_credits().await.unwrap(), 0);
        let err = guard.submit(image("b.png"), None).await.unwrap_err();
        assert!(matches!(err, ClientError::InsufficientCredits { .. }));
        assert_eq!(count(&client.server.calls.create), 1);
    }

    #[tokio::test]
    async fn test_dashboard_submit_refreshes_balance() {
        let client = TestClient::logged_in(2).await;

        let (outcome, notice) = client
            .dashboard
            .submit(image("cat.png"), Some("  sepia  ".into()))
            .await;

        let task = outcome.unwrap();
        assert_eq!(notice.description, "Image uploaded successfully");
        assert_eq!(task.metadata(), Some("sepia"));
        assert_eq!(task.image_path(), "uploads/cat.png");

        let view = client.dashboard.view();
        assert_eq!(view.session.credits(), 1);
        assert_eq!(view.ledger.tasks.len(), 1);
        assert_eq!(view.ledger.tasks[0].id(), task.id());
        assert!(!view.uploading);
        assert!(!view.ledger.submitting);
    }

    #[tokio::test]
    async fn test_server_refuses_what_a_stale_balance_lets_through() {
        let client = TestClient::logged_in(1).await;
        let guard = client.dashboard.guard();

        let (first, second) = tokio::join!(
            guard.submit(image("a.png"), None),
            guard.submit(image("b.png"), None)
        );

        let outcomes = [first, second];
        let accepted = outcomes.iter().filter(|o| o.is_ok()).count();
        assert_eq!(accepted, 1);
        let refused = outcomes.iter().find_map(|o| o.as_ref().err()).unwrap();
        match refused {
            ClientError::NetworkOrServer(message) => {
                assert!(message.contains("Not enough credits"))
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(count(&client.server.calls.create), 2);
        assert_eq!(client.server.credits(), 0);
        assert_eq!(client.ledger.snapshot().tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_logged_out_upload_asks_for_login() {
        let client = TestClient::new(Arc::new(InMemoryServer::new(5)));

        let (outcome, notice) = client.dashboard.submit(image("a.png"), None).await;

        assert_eq!(outcome.unwrap_err(), ClientError::AuthRequired);
        assert_eq!(notice.description, "Please log in to upload images");
        assert_eq!(count(&client.server.calls.create), 0);
    }

    #[tokio::test]
    async fn test_topped_up_balance_unlocks_uploads() {
        let client = TestClient::logged_in(0).await;
        assert!(client.dashboard.guard().check().is_err());

        client.server.set_credits(3);
        client.dashboard.refresh().await.unwrap();

        assert_eq!(client.dashboard.guard().check(), Ok(3));
        let (outcome, _) = client.dashboard.submit(image("a.png"), None).await;
        assert!(outcome.is_ok());
        assert_eq!(client.session.credits(), Some(2));
    }
}
