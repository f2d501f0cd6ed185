//! # Top-Up Tests
//!
//! ```text
//! [Dashboard] ──top_up──→ [Payment Flow] ──create order──→ server
//!                               │
//!                               ↓ opens
//!                          [Widget] ──provider payload──→ ProviderHandler
//!                                                              │
//!                              server ←──verify───────────────┘
//!                                │
//!                                ↓
//!                 [Session] refresh_credits (authoritative balance)
//! ```

#[cfg(test)]
mod tests {
    use ic_01_session::SessionApi;
    use ic_03_payment_flow::{PaymentApi, PaymentStage};
    use ic_04_submission_guard::Notice;
    use serde_json::{json, Value};
    use shared_types::{ClientError, OrderId, OrderStatus};

    use crate::integration::server::{count, TestClient, EMAIL};

    fn callback(order_id: &str) -> Value {
        json!({
            "orderId": order_id,
            "paymentId": "pay_1",
            "signature": "sig_1",
        })
    }

    // =========================================================================
    // HAPPY PATH
    // =========================================================================

    #[tokio::test]
    async fn test_top_up_balance_comes_from_the_server() {
        let client = TestClient::logged_in(0).await;

        let order = client.dashboard.top_up(500).await.unwrap();
        assert_eq!(order.order_id, OrderId::new("ord_1"));
        assert_eq!(order.amount, 500);
        assert_eq!(order.currency, "INR");

        let options = client.widget.last_options().unwrap();
        assert_eq!(options.order_id, order.order_id);
        assert_eq!(options.amount, 500);
        assert_eq!(options.prefill.email.as_deref(), Some(EMAIL));
        assert_eq!(
            client.payments.snapshot().order_status,
            Some(OrderStatus::AwaitingProvider)
        );

        // Another purchase lands on the server while the widget is open.
        client.server.set_credits(40);

        let handler = client.widget.take_handler().unwrap();
        let receipt = handler.complete(callback("ord_1")).await.unwrap();

        assert_eq!(receipt.credits_added, 5);
        assert_eq!(receipt.balance, Some(45));
        assert_eq!(client.session.credits(), Some(45));
        assert_eq!(count(&client.server.calls.verify), 1);

        let snapshot = client.payments.snapshot();
        assert_eq!(snapshot.stage, PaymentStage::Verified);
        assert_eq!(snapshot.order_status, Some(OrderStatus::Verified));
        assert_eq!(snapshot.credits_added, Some(5));
        assert_eq!(
            Notice::for_payment(&Ok(receipt)).description,
            "Payment verified, 5 credits added"
        );
    }

    #[tokio::test]
    async fn test_native_payload_forwarded_as_string() {
        let client = TestClient::logged_in(0).await;
        client.dashboard.top_up(300).await.unwrap();

        let payload = Value::String(
            r#"{"razorpay_order_id":"ord_1","razorpay_payment_id":"pay_7","razorpay_signature":"sig_7"}"#
                .to_string(),
        );
        let receipt = client
            .widget
            .take_handler()
            .unwrap()
            .complete(payload)
            .await
            .unwrap();

        assert_eq!(receipt.payment_id, "pay_7");
        assert_eq!(client.session.credits(), Some(3));
    }

    // =========================================================================
    // REJECTIONS
    // =========================================================================

    #[tokio::test]
    async fn test_rejected_signature_leaves_balance_unchanged() {
        let client = TestClient::logged_in(2).await;
        client.server.reject_signatures();
        client.dashboard.top_up(500).await.unwrap();

        let outcome = client
            .widget
            .take_handler()
            .unwrap()
            .complete(callback("ord_1"))
            .await;

        assert_eq!(
            outcome,
            Err(ClientError::VerificationRejected(
                "Invalid payment signature".into()
            ))
        );
        assert_eq!(
            Notice::for_payment(&outcome).description,
            "Payment verification failed"
        );
        assert_eq!(client.payments.snapshot().stage, PaymentStage::Failed);
        assert_eq!(client.session.credits(), Some(2));
        assert_eq!(client.server.credits(), 2);
    }

    #[tokio::test]
    async fn test_malformed_payloads_never_reach_the_server() {
        let client = TestClient::logged_in(0).await;

        client.dashboard.top_up(100).await.unwrap();
        let missing_signature = json!({"orderId": "ord_1", "paymentId": "pay_1"});
        let err = client
            .widget
            .take_handler()
            .unwrap()
            .complete(missing_signature)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::VerificationRejected(_)));

        // A failed attempt does not block the next one.
        client.dashboard.top_up(100).await.unwrap();
        let err = client
            .widget
            .take_handler()
            .unwrap()
            .complete(callback("ord_1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::VerificationRejected(_)));

        assert_eq!(count(&client.server.calls.verify), 0);
        assert_eq!(client.payments.snapshot().stage, PaymentStage::Failed);
        assert_eq!(client.session.credits(), Some(0));
    }

    // =========================================================================
    // SUPERSEDED ATTEMPTS
    // =========================================================================

    #[tokio::test]
    async fn test_dismissed_widget_leaves_attempt_inert() {
        let client = TestClient::logged_in(0).await;

        client.dashboard.top_up(100).await.unwrap();
        client.widget.dismiss();
        assert!(!client.payments.snapshot().loading());

        let order = client.dashboard.top_up(200).await.unwrap();
        assert_eq!(order.order_id, OrderId::new("ord_2"));

        let receipt = client
            .widget
            .take_handler()
            .unwrap()
            .complete(callback("ord_2"))
            .await
            .unwrap();
        assert_eq!(receipt.balance, Some(2));
        assert_eq!(client.widget.open_count(), 2);
    }

    #[tokio::test]
    async fn test_superseded_handler_is_ignored() {
        let client = TestClient::logged_in(0).await;

        client.dashboard.top_up(100).await.unwrap();
        let first = client.widget.take_handler().unwrap();
        client.dashboard.top_up(200).await.unwrap();
        let second = client.widget.take_handler().unwrap();

        assert_eq!(
            first.complete(callback("ord_1")).await,
            Err(ClientError::StaleAttempt)
        );
        assert_eq!(count(&client.server.calls.verify), 0);

        second.complete(callback("ord_2")).await.unwrap();
        assert_eq!(client.session.credits(), Some(2));
    }

    #[tokio::test]
    async fn test_logout_orphans_open_checkout() {
        let client = TestClient::logged_in(0).await;
        client.dashboard.top_up(500).await.unwrap();
        let handler = client.widget.take_handler().unwrap();

        client.dashboard.logout();

        assert_eq!(client.payments.snapshot().stage, PaymentStage::Idle);
        assert_eq!(
            handler.complete(callback("ord_1")).await,
            Err(ClientError::StaleAttempt)
        );
        assert_eq!(count(&client.server.calls.verify), 0);
        assert_eq!(client.server.credits(), 0);
    }

    #[tokio::test]
    async fn test_top_up_requires_login() {
        let client = TestClient::logged_in(0).await;
        client.dashboard.logout();

        assert_eq!(
            client.dashboard.top_up(500).await,
            Err(ClientError::AuthRequired)
        );
        assert_eq!(count(&client.server.calls.create_order), 0);
        assert_eq!(client.widget.open_count(), 0);
    }
}
