//! # In-Memory Server
//!
//! One backend that implements every outbound port the client core uses.
//! It holds the authoritative balance: uploads debit it, verified payments
//! credit it, and the client only ever learns the value through
//! `fetch_profile`.
//!
//! Listings can be held open with `gate_next_listing` to replay the races
//! the ledger has to survive.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use ic_01_session::{AuthResponse, SessionBackend, SessionContext, SignupRequest};
use ic_02_task_ledger::{ImageUpload, TaskBackend, TaskLedger};
use ic_03_payment_flow::{
    CheckoutConfig, CheckoutOptions, PaymentBackend, PaymentFlow, PaymentWidget, ProviderHandler,
    VerifyPaymentRequest, VerifyPaymentResponse, WidgetError,
};
use ic_04_submission_guard::Dashboard;
use parking_lot::Mutex;
use shared_types::{
    AuthToken, BackendError, OrderId, PaymentOrder, Task, TaskId, TaskRecord, TaskStatus, User,
    UserId,
};
use tokio::sync::Notify;

pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "analytical-engine";

/// Rupees per credit when a payment is verified.
pub const PRICE_PER_CREDIT: u64 = 100;

#[derive(Debug, Default)]
pub struct CallCounts {
    pub login: AtomicUsize,
    pub profile: AtomicUsize,
    pub list: AtomicUsize,
    pub create: AtomicUsize,
    pub create_order: AtomicUsize,
    pub verify: AtomicUsize,
}

pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

#[derive(Debug)]
struct Order {
    amount: u64,
    paid: bool,
}

#[derive(Debug)]
struct ServerState {
    user: User,
    password: String,
    valid_token: Option<String>,
    tokens_issued: u64,
    /// Newest first, like the backend's listing.
    tasks: Vec<TaskRecord>,
    next_task: u64,
    orders: HashMap<String, Order>,
    next_order: u64,
    reject_signatures: bool,
}

impl ServerState {
    fn authorize(&self, token: &AuthToken) -> Result<(), BackendError> {
        match self.valid_token.as_deref() {
            Some(valid) if valid == token.expose() => Ok(()),
            _ => Err(BackendError::Unauthorized),
        }
    }

    fn issue_token(&mut self) -> AuthToken {
        self.tokens_issued += 1;
        let token = format!("token-{}", self.tokens_issued);
        self.valid_token = Some(token.clone());
        AuthToken::new(token)
    }
}

pub struct InMemoryServer {
    state: Mutex<ServerState>,
    listing_gate: Mutex<Option<Arc<Notify>>>,
    pub calls: CallCounts,
}

impl InMemoryServer {
    pub fn new(credits: u64) -> Self {
        Self {
            state: Mutex::new(ServerState {
                user: User {
                    id: UserId(1),
                    email: EMAIL.to_string(),
                    full_name: Some("Ada Lovelace".to_string()),
                    credits,
                },
                password: PASSWORD.to_string(),
                valid_token: None,
                tokens_issued: 0,
                tasks: Vec::new(),
                next_task: 0,
                orders: HashMap::new(),
                next_order: 0,
                reject_signatures: false,
            }),
            listing_gate: Mutex::new(None),
            calls: CallCounts::default(),
        }
    }

    pub fn credits(&self) -> u64 {
        self.state.lock().user.credits
    }

    pub fn set_credits(&self, credits: u64) {
        self.state.lock().user.credits = credits;
    }

    /// Invalidates every issued token, as an expiring JWT would.
    pub fn expire_tokens(&self) {
        self.state.lock().valid_token = None;
    }

    pub fn reject_signatures(&self) {
        self.state.lock().reject_signatures = true;
    }

    /// Adds a task directly on the server, bypassing the upload endpoint.
    pub fn seed_task(&self, status: TaskStatus) -> TaskId {
        let mut st = self.state.lock();
        st.next_task += 1;
        let id = TaskId(st.next_task);
        let record = record(id, format!("uploads/seed-{}.png", id.0), None, status);
        st.tasks.insert(0, record);
        id
    }

    /// Moves a task to `status` the way a worker would, including any
    /// backwards move a buggy backend might report.
    pub fn set_status(&self, id: TaskId, status: TaskStatus) {
        let mut st = self.state.lock();
        if let Some(task) = st.tasks.iter_mut().find(|t| t.id == id) {
            *task = record(id, task.image_path.clone(), task.metadata.clone(), status);
        }
    }

    /// The next listing captures its result, then waits for the returned
    /// gate before answering.
    pub fn gate_next_listing(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.listing_gate.lock() = Some(gate.clone());
        gate
    }
}

fn record(id: TaskId, image_path: String, metadata: Option<String>, status: TaskStatus) -> TaskRecord {
    let now = Utc::now();
    TaskRecord {
        id,
        image_path,
        metadata,
        status,
        result_path: (status == TaskStatus::Completed).then(|| format!("results/{}.png", id.0)),
        error_message: (status == TaskStatus::Failed).then(|| "worker crashed".to_string()),
        credits_used: 1,
        created_at: now,
        updated_at: now,
    }
}

fn to_task(record: TaskRecord) -> Result<Task, BackendError> {
    Task::try_from(record).map_err(|err| BackendError::Decode(err.to_string()))
}

#[async_trait]
impl SessionBackend for InMemoryServer {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, BackendError> {
        self.calls.login.fetch_add(1, Ordering::SeqCst);
        let mut st = self.state.lock();
        if st.user.email != email || st.password != password {
            return Err(BackendError::Unauthorized);
        }
        let token = st.issue_token();
        Ok(AuthResponse {
            user: st.user.clone(),
            token,
        })
    }

    async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, BackendError> {
        let mut st = self.state.lock();
        if st.user.email == request.email {
            return Err(BackendError::Rejected {
                status: 400,
                detail: "Email already registered".into(),
            });
        }
        st.user = User {
            id: UserId(st.user.id.0 + 1),
            email: request.email.clone(),
            full_name: Some(request.full_name.clone()),
            credits: 0,
        };
        st.password = request.password.clone();
        let token = st.issue_token();
        Ok(AuthResponse {
            user: st.user.clone(),
            token,
        })
    }

    async fn fetch_profile(&self, token: &AuthToken) -> Result<User, BackendError> {
        self.calls.profile.fetch_add(1, Ordering::SeqCst);
        let st = self.state.lock();
        st.authorize(token)?;
        Ok(st.user.clone())
    }
}

#[async_trait]
impl TaskBackend for InMemoryServer {
    async fn list_tasks(&self, token: &AuthToken) -> Result<Vec<Task>, BackendError> {
        self.calls.list.fetch_add(1, Ordering::SeqCst);
        let listing = {
            let st = self.state.lock();
            st.authorize(token)?;
            st.tasks.clone()
        };
        let gate = self.listing_gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        listing.into_iter().map(to_task).collect()
    }

    async fn get_task(&self, token: &AuthToken, id: TaskId) -> Result<Task, BackendError> {
        let st = self.state.lock();
        st.authorize(token)?;
        let record = st
            .tasks
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| BackendError::Rejected {
                status: 404,
                detail: "Task not found".into(),
            })?;
        to_task(record)
    }

    async fn create_task(
        &self,
        token: &AuthToken,
        image: &ImageUpload,
        metadata: Option<&str>,
    ) -> Result<Task, BackendError> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        let mut st = self.state.lock();
        st.authorize(token)?;
        if st.user.credits < 1 {
            return Err(BackendError::Rejected {
                status: 400,
                detail: "Not enough credits to process image".into(),
            });
        }
        st.user.credits -= 1;
        st.next_task += 1;
        let id = TaskId(st.next_task);
        let record = record(
            id,
            format!("uploads/{}", image.file_name()),
            metadata.map(str::to_string),
            TaskStatus::Queued,
        );
        st.tasks.insert(0, record.clone());
        to_task(record)
    }
}

#[async_trait]
impl PaymentBackend for InMemoryServer {
    async fn create_order(
        &self,
        token: &AuthToken,
        amount: u64,
    ) -> Result<PaymentOrder, BackendError> {
        self.calls.create_order.fetch_add(1, Ordering::SeqCst);
        let mut st = self.state.lock();
        st.authorize(token)?;
        st.next_order += 1;
        let order_id = format!("ord_{}", st.next_order);
        st.orders.insert(order_id.clone(), Order { amount, paid: false });
        Ok(PaymentOrder {
            order_id: OrderId::new(order_id),
            amount,
            currency: "INR".to_string(),
        })
    }

    async fn verify_payment(
        &self,
        token: &AuthToken,
        request: &VerifyPaymentRequest,
    ) -> Result<VerifyPaymentResponse, BackendError> {
        self.calls.verify.fetch_add(1, Ordering::SeqCst);
        let mut st = self.state.lock();
        st.authorize(token)?;
        if st.reject_signatures {
            return Err(BackendError::Rejected {
                status: 400,
                detail: "Invalid payment signature".into(),
            });
        }
        let order = st
            .orders
            .get_mut(request.order_id.as_str())
            .ok_or_else(|| BackendError::Rejected {
                status: 404,
                detail: "Order not found".into(),
            })?;
        if order.paid {
            return Err(BackendError::Rejected {
                status: 400,
                detail: "Payment already processed".into(),
            });
        }
        order.paid = true;
        let credits_added = order.amount / PRICE_PER_CREDIT;
        st.user.credits += credits_added;
        Ok(VerifyPaymentResponse {
            message: "Payment verified successfully".into(),
            credits_added,
        })
    }
}

/// Widget that keeps every opened checkout for the test to complete.
#[derive(Default)]
pub struct RecordingWidget {
    opened: Mutex<Vec<(CheckoutOptions, Option<ProviderHandler>)>>,
}

impl RecordingWidget {
    pub fn open_count(&self) -> usize {
        self.opened.lock().len()
    }

    pub fn last_options(&self) -> Option<CheckoutOptions> {
        self.opened.lock().last().map(|(options, _)| options.clone())
    }

    /// Takes the handler of the most recently opened checkout.
    pub fn take_handler(&self) -> Option<ProviderHandler> {
        self.opened.lock().last_mut().and_then(|(_, handler)| handler.take())
    }

    /// Drops every pending handler, as closing the widget does.
    pub fn dismiss(&self) {
        for (_, handler) in self.opened.lock().iter_mut() {
            handler.take();
        }
    }
}

impl PaymentWidget for RecordingWidget {
    fn open(&self, options: CheckoutOptions, handler: ProviderHandler) -> Result<(), WidgetError> {
        self.opened.lock().push((options, Some(handler)));
        Ok(())
    }
}

/// Every component wired against one server.
pub struct TestClient {
    pub server: Arc<InMemoryServer>,
    pub session: Arc<SessionContext>,
    pub ledger: Arc<TaskLedger>,
    pub payments: PaymentFlow,
    pub widget: Arc<RecordingWidget>,
    pub dashboard: Dashboard,
}

impl TestClient {
    pub fn new(server: Arc<InMemoryServer>) -> Self {
        let session = Arc::new(SessionContext::new(server.clone()));
        let ledger = Arc::new(TaskLedger::new(server.clone(), session.clone()));
        let widget = Arc::new(RecordingWidget::default());
        let checkout = CheckoutConfig {
            key: "rzp_test_key".to_string(),
            ..CheckoutConfig::default()
        };
        let payments = PaymentFlow::new(server.clone(), widget.clone(), session.clone(), checkout);
        let dashboard = Dashboard::new(
            session.clone(),
            ledger.clone(),
            Arc::new(payments.clone()),
            1,
        );
        Self {
            server,
            session,
            ledger,
            payments,
            widget,
            dashboard,
        }
    }

    /// A client for a fresh server, already logged in.
    pub async fn logged_in(credits: u64) -> Self {
        let client = Self::new(Arc::new(InMemoryServer::new(credits)));
        client
            .session
            .login(EMAIL, PASSWORD)
            .await
            .expect("test login succeeds");
        client
    }
}

pub fn image(name: &str) -> ImageUpload {
    ImageUpload::new(name, vec![0x89, b'P', b'N', b'G']).expect("valid upload")
}
