//! ic-cli: command-line client for the credit-based image processing service.
//!
//! Log in once, export the printed token as `IC_TOKEN`, then submit images,
//! watch their progress and top up credits.

mod logging;
mod widget;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use ic_01_session::{SessionApi, SessionContext, SignupRequest};
use ic_02_task_ledger::{ImageUpload, TaskLedger, TaskLedgerApi};
use ic_03_payment_flow::{PaymentApi, PaymentFlow};
use ic_04_submission_guard::{Dashboard, Notice};
use ic_api_client::{ClientConfig, HttpBackend};
use shared_types::{AuthToken, Task, TaskId, TaskStatus, User};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::logging::{init_logging, LogConfig};
use crate::widget::TerminalWidget;

/// Credit-based image processing client
#[derive(Parser, Debug)]
#[command(name = "ic-cli", version)]
#[command(about = "Submit images for processing and manage credits")]
struct Args {
    /// Backend API base URL (overrides IC_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Bearer token from a previous login
    #[arg(long, env = "IC_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and print a token to export as IC_TOKEN
    Login {
        #[arg(long)]
        email: String,
        /// Read from IC_PASSWORD or stdin when omitted
        #[arg(long, env = "IC_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long, env = "IC_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Show the current credit balance
    Credits,
    /// List tasks, or show one task
    Tasks {
        #[arg(long)]
        id: Option<u64>,
    },
    /// Upload an image for processing (costs one credit)
    Submit {
        image: PathBuf,
        #[arg(long)]
        metadata: Option<String>,
        /// MIME type to send instead of the one guessed from the extension
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Poll tasks until none is pending
    Watch {
        /// Refresh interval in seconds
        #[arg(short, long, default_value = "3")]
        interval: u64,
    },
    /// Buy credits through the payment provider
    Topup {
        /// Amount in rupees
        amount: u64,
    },
}

/// Components wired for one invocation.
struct Client {
    session: Arc<SessionContext>,
    ledger: Arc<TaskLedger>,
    payments: PaymentFlow,
    widget: Arc<TerminalWidget>,
    dashboard: Dashboard,
}

impl Client {
    fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let backend = Arc::new(HttpBackend::new(config).context("invalid client configuration")?);
        let session = Arc::new(SessionContext::new(backend.clone()));
        let ledger = Arc::new(TaskLedger::new(backend.clone(), session.clone()));
        let widget = Arc::new(TerminalWidget::new());
        let payments = PaymentFlow::new(backend, widget.clone(), session.clone(), config.checkout());
        let dashboard = Dashboard::new(
            session.clone(),
            ledger.clone(),
            Arc::new(payments.clone()),
            config.min_credits,
        );
        Ok(Self {
            session,
            ledger,
            payments,
            widget,
            dashboard,
        })
    }

    async fn resume(&self, token: Option<&str>) -> anyhow::Result<User> {
        let Some(token) = token else {
            bail!("not logged in: run `ic-cli login` and export IC_TOKEN");
        };
        self.session
            .resume(AuthToken::new(token))
            .await
            .context("could not resume session")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&LogConfig::from_env())?;

    let mut config = ClientConfig::from_env();
    if let Some(url) = args.api_url.clone() {
        config.api_url = url;
    }
    let client = Client::new(&config)?;
    debug!(api_url = %config.api_url, "client ready");

    match args.command {
        Command::Login { email, password } => {
            let password = password_or_prompt(password).await?;
            let user = client.session.login(&email, &password).await?;
            let token = client.session.credentials()?.token;
            println!("Logged in as {} ({} credits)", user.display_name(), user.credits);
            println!("export IC_TOKEN={}", token.expose());
        }
        Command::Signup {
            email,
            name,
            password,
        } => {
            let password = password_or_prompt(password).await?;
            let user = client
                .session
                .signup(SignupRequest {
                    email,
                    password,
                    full_name: name,
                })
                .await?;
            let token = client.session.credentials()?.token;
            println!("Account created for {}", user.display_name());
            println!("export IC_TOKEN={}", token.expose());
        }
        Command::Credits => {
            client.resume(args.token.as_deref()).await?;
            let credits = client.session.refresh_credits().await?;
            println!("{credits} credits");
        }
        Command::Tasks { id } => {
            client.resume(args.token.as_deref()).await?;
            match id {
                Some(id) => print_task(&client.ledger.fetch_task(TaskId(id)).await?),
                None => print_tasks(&client.ledger.fetch_tasks().await?),
            }
        }
        Command::Submit {
            image,
            metadata,
            content_type,
        } => {
            client.resume(args.token.as_deref()).await?;
            let mut upload = ImageUpload::from_path(&image).await?;
            if let Some(content_type) = content_type {
                upload = upload.with_content_type(content_type);
            }
            let (outcome, notice) = client.dashboard.submit(upload, metadata).await;
            print_notice(&notice);
            let task = outcome?;
            print_task(&task);
            println!("{} credits left", client.session.snapshot().credits());
        }
        Command::Watch { interval } => {
            client.resume(args.token.as_deref()).await?;
            watch(&client, Duration::from_secs(interval.max(1))).await?;
        }
        Command::Topup { amount } => {
            client.resume(args.token.as_deref()).await?;
            top_up(&client, amount).await?;
        }
    }
    Ok(())
}

async fn watch(client: &Client, interval: Duration) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(interval);
    let mut last: Vec<(TaskId, TaskStatus)> = Vec::new();
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }

        let view = client.dashboard.refresh().await?;
        let current: Vec<(TaskId, TaskStatus)> = view
            .ledger
            .tasks
            .iter()
            .map(|t| (t.id(), t.status()))
            .collect();
        if current != last {
            print_tasks(&view.ledger.tasks);
            println!("{} credits, {} pending", view.session.credits(), view.ledger.pending_count());
            last = current;
        }
        if view.ledger.all_settled() {
            return Ok(());
        }
    }
}

async fn top_up(client: &Client, amount: u64) -> anyhow::Result<()> {
    let order = client.dashboard.top_up(amount).await?;
    let Some((options, handler)) = client.widget.take() else {
        bail!("payment widget did not open for order {}", order.order_id);
    };
    debug!(attempt = %handler.attempt(), order_id = %handler.order_id(), "checkout opened");

    println!("{}", serde_json::to_string_pretty(&options)?);
    println!(
        "Complete the payment for order {}, then paste the provider's response JSON:",
        handler.order_id()
    );

    let Some(line) = read_line().await? else {
        println!("No response given; order {} left unpaid", handler.order_id());
        return Ok(());
    };
    let payload: serde_json::Value =
        serde_json::from_str(&line).unwrap_or(serde_json::Value::String(line));

    let outcome = handler.complete(payload).await;
    print_notice(&Notice::for_payment(&outcome));
    let receipt = outcome?;
    if let Some(balance) = receipt.balance {
        println!("{balance} credits");
    }
    debug!(stage = ?client.payments.snapshot().stage, "payment finished");
    Ok(())
}

async fn password_or_prompt(password: Option<String>) -> anyhow::Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    eprint!("Password: ");
    read_line()
        .await?
        .context("no password given")
}

/// Reads one non-empty line from stdin; `None` at end of input.
async fn read_line() -> anyhow::Result<Option<String>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if !line.is_empty() {
            return Ok(Some(line.to_string()));
        }
    }
    Ok(None)
}

fn print_notice(notice: &Notice) {
    if notice.is_error() {
        eprintln!("{notice}");
    } else {
        println!("{notice}");
    }
}

fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks yet");
        return;
    }
    println!("{:>6}  {:<10}  {:<16}  {}", "ID", "STATUS", "CREATED", "DETAIL");
    for task in tasks {
        print_task(task);
    }
}

fn print_task(task: &Task) {
    let detail = task
        .result_path()
        .or(task.error_message())
        .or(task.metadata())
        .unwrap_or(task.image_path());
    println!(
        "{:>6}  {:<10}  {:<16}  {}",
        task.id().0,
        task.status().as_str(),
        task.created_at().format("%Y-%m-%d %H:%M"),
        detail
    );
}
