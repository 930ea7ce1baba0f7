//! sqlchat-cli: chat with a MySQL database through the sqlchat HTTP API
//!
//! Opens a session, asks for the connection details (password masked), connects,
//! then reads questions until `exit` or `quit`. Every answer is printed as part
//! of an `AI` / `Human` transcript.

use clap::Parser;
use dialoguer::{Input, Password};
use serde::{Deserialize, Serialize};

const DEFAULT_SERVER: &str = "http://127.0.0.1:8501";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "sqlchat-cli",
    version,
    about = "Ask questions about a MySQL database in plain language"
)]
struct Cli {
    /// sqlchat HTTP server URL (overrides SQLCHAT_HTTP_URL env var)
    #[arg(long, env = "SQLCHAT_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    /// Database host
    #[arg(long)]
    host: Option<String>,

    /// Database port
    #[arg(long)]
    port: Option<String>,

    /// Database user
    #[arg(long)]
    user: Option<String>,

    /// Database password (overrides SQLCHAT_DB_PASSWORD env var)
    #[arg(long, env = "SQLCHAT_DB_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Database name
    #[arg(long)]
    database: Option<String>,

    /// Page to scrape alongside the connection
    #[arg(long)]
    website_url: Option<String>,

    /// Use the defaults and flags as they are, without prompting
    #[arg(long)]
    no_prompt: bool,
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionForm {
    pub host: String,
    pub port: String,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptEntry {
    pub role: String,
    pub content: String,
}

/// Response of POST /sessions
#[derive(Debug, Deserialize)]
pub struct SessionCreated {
    pub id: String,
    pub profile: String,
    pub history: Vec<TranscriptEntry>,
    pub defaults: ConnectionForm,
}

#[derive(Debug, Deserialize)]
pub struct ConnectReply {
    pub connection: String,
    pub scraped_paragraphs: Option<usize>,
}

/// `answer` is absent when the server ignored a blank question.
#[derive(Debug, Deserialize)]
pub struct AskReply {
    pub answer: Option<String>,
}

// ============================================================================
// Transcript helpers
// ============================================================================

/// Display label for a transcript role.
pub fn speaker(role: &str) -> &'static str {
    match role {
        "human" => "Human",
        _ => "AI",
    }
}

pub fn render_entry(role: &str, content: &str) -> String {
    format!("{}: {}", speaker(role), content)
}

/// `exit` or `quit`, in any case, ends the chat.
pub fn is_exit(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "exit" | "quit")
}

/// Flags win over the server's form defaults. The URL field only exists when
/// the server's profile scrapes websites.
fn apply_flags(mut form: ConnectionForm, cli: &Cli) -> ConnectionForm {
    if let Some(host) = &cli.host {
        form.host = host.clone();
    }
    if let Some(port) = &cli.port {
        form.port = port.clone();
    }
    if let Some(user) = &cli.user {
        form.user = user.clone();
    }
    if let Some(password) = &cli.password {
        form.password = password.clone();
    }
    if let Some(database) = &cli.database {
        form.database = database.clone();
    }
    if form.website_url.is_some() {
        if let Some(url) = &cli.website_url {
            form.website_url = Some(url.clone());
        }
    }
    form
}

fn prompt_form(form: ConnectionForm) -> anyhow::Result<ConnectionForm> {
    let host: String = Input::new().with_prompt("Host").default(form.host).interact_text()?;
    let port: String = Input::new().with_prompt("Port").default(form.port).interact_text()?;
    let user: String = Input::new().with_prompt("User").default(form.user).interact_text()?;
    let password = Password::new()
        .with_prompt("Password (enter for default)")
        .allow_empty_password(true)
        .interact()?;
    let database: String = Input::new()
        .with_prompt("Database")
        .default(form.database)
        .interact_text()?;

    let website_url = match form.website_url {
        Some(current) => Some(
            Input::<String>::new()
                .with_prompt("Website URL (optional)")
                .default(current)
                .allow_empty(true)
                .show_default(false)
                .interact_text()?,
        ),
        None => None,
    };

    Ok(ConnectionForm {
        host,
        port,
        user,
        password: if password.is_empty() { form.password } else { password },
        database,
        website_url,
    })
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

struct ApiClient {
    client: reqwest::blocking::Client,
    server: String,
}

impl ApiClient {
    fn new(server: &str) -> anyhow::Result<Self> {
        // Two model calls per question; no client-side timeout
        let client = reqwest::blocking::Client::builder().timeout(None).build()?;
        Ok(Self {
            client,
            server: server.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server, path)
    }

    fn read<T: serde::de::DeserializeOwned>(resp: reqwest::blocking::Response) -> anyhow::Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body: serde_json::Value = resp.json().unwrap_or_default();
            let message = body["error"].as_str().unwrap_or("no details").to_string();
            anyhow::bail!("server returned {}: {}", status, message);
        }
        Ok(resp.json()?)
    }

    fn create_session(&self) -> anyhow::Result<SessionCreated> {
        Self::read(self.client.post(self.url("/sessions")).send()?)
    }

    fn connect(&self, id: &str, form: &ConnectionForm) -> anyhow::Result<ConnectReply> {
        let url = self.url(&format!("/sessions/{}/connect", id));
        Self::read(self.client.post(url).json(form).send()?)
    }

    fn ask(&self, id: &str, question: &str) -> anyhow::Result<AskReply> {
        let url = self.url(&format!("/sessions/{}/ask", id));
        let body = serde_json::json!({ "question": question });
        Self::read(self.client.post(url).json(&body).send()?)
    }

    fn end_session(&self, id: &str) {
        let url = self.url(&format!("/sessions/{}", id));
        if let Err(e) = self.client.delete(url).send() {
            eprintln!("sqlchat-cli: failed to end session: {}", e);
        }
    }
}

// ============================================================================
// Main
// ============================================================================

fn run(cli: &Cli) -> anyhow::Result<()> {
    let api = ApiClient::new(&cli.server)?;

    let session = api
        .create_session()
        .map_err(|e| anyhow::anyhow!("cannot reach {}: {}", cli.server, e))?;

    println!("Chat with MySQL ({} profile)\n", session.profile);
    for entry in &session.history {
        println!("{}", render_entry(&entry.role, &entry.content));
    }
    println!();

    let mut form = apply_flags(session.defaults, cli);
    if !cli.no_prompt {
        form = prompt_form(form)?;
    }

    println!("Connecting to your Database...");
    let reply = match api.connect(&session.id, &form) {
        Ok(r) => r,
        Err(e) => {
            api.end_session(&session.id);
            return Err(e);
        }
    };
    println!("Connected to {}", reply.connection);
    if let Some(n) = reply.scraped_paragraphs {
        println!("Website data scraped: {} paragraphs", n);
    }
    println!("Type your questions; 'exit' or 'quit' ends the chat.\n");

    loop {
        let input: String = Input::new()
            .with_prompt("Human")
            .allow_empty(true)
            .interact_text()?;

        if is_exit(&input) {
            break;
        }
        if input.trim().is_empty() {
            continue;
        }

        match api.ask(&session.id, &input) {
            Ok(AskReply { answer: Some(answer), .. }) => {
                println!("{}\n", render_entry("assistant", &answer));
            }
            Ok(_) => {}
            Err(e) => eprintln!("sqlchat-cli: {}\n", e),
        }
    }

    api.end_session(&session.id);
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("sqlchat-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
