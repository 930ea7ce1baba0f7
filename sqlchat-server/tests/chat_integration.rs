//! Chat turns against a live MySQL server.
//!
//! Runs against a dedicated test database, never the application's default
//! one: `root:admin@localhost:3306/sqlchat_test` unless overridden by
//! `SQLCHAT_TEST_MYSQL_HOST`, `SQLCHAT_TEST_MYSQL_PASSWORD` or
//! `SQLCHAT_TEST_MYSQL_DATABASE`. The database must already exist; its
//! `suicides_data` table is recreated by every test.
//!
//! Every test skips when the server is unreachable. Reachability is checked
//! once with a short timeout and remembered.

use std::sync::{Arc, OnceLock};

use serde_json::json;
use sqlchat_core::config::DatabaseConfig;
use sqlchat_core::ipc::ChatRequest;
use sqlchat_core::{
    ChatSession, ConnectionSettings, LlmConfig, MySqlConnector, MySqlDatabase, OpenAiChatClient,
    PromptProfile, SqlChatConfig, SqlDatabase,
};
use sqlchat_server::context::AppContext;
use sqlchat_server::router::handle_request;
use tokio::sync::{Mutex, MutexGuard};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STATE_QUERY: &str =
    "SELECT State, COUNT(*) AS total_suicides FROM suicides_data GROUP BY State ORDER BY State;";

const TEST_DATABASE: &str = "sqlchat_test";

fn settings() -> ConnectionSettings {
    let mut s = ConnectionSettings::defaults_for(PromptProfile::Suicides);
    s.database =
        std::env::var("SQLCHAT_TEST_MYSQL_DATABASE").unwrap_or_else(|_| TEST_DATABASE.to_string());
    if let Ok(host) = std::env::var("SQLCHAT_TEST_MYSQL_HOST") {
        s.host = host;
    }
    if let Ok(password) = std::env::var("SQLCHAT_TEST_MYSQL_PASSWORD") {
        s.password = password;
    }
    s
}

fn db_config() -> DatabaseConfig {
    DatabaseConfig {
        acquire_timeout_secs: 3,
        ..DatabaseConfig::default()
    }
}

/// Tests share one table, so they take turns. The guarded value remembers
/// whether MySQL was reachable the first time.
async fn table_lock() -> MutexGuard<'static, Option<bool>> {
    static LOCK: OnceLock<Mutex<Option<bool>>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(None)).lock().await
}

/// Connect and reseed `suicides_data` with states A, A, B.
async fn seeded_db(available: &mut Option<bool>) -> Option<MySqlDatabase> {
    if *available == Some(false) {
        return None;
    }

    let db = match MySqlDatabase::connect(&settings(), &db_config()).await {
        Ok(db) => db,
        Err(_) => {
            *available = Some(false);
            return None;
        }
    };
    *available = Some(true);

    for stmt in [
        "DROP TABLE IF EXISTS suicides_data",
        "CREATE TABLE suicides_data (State VARCHAR(64), Year INT, Type VARCHAR(64), Gender VARCHAR(16), Total INT)",
        "INSERT INTO suicides_data VALUES ('A', 2001, 'Causes', 'Male', 3), ('A', 2002, 'Causes', 'Female', NULL), ('B', 2001, 'Means', 'Male', 7)",
    ] {
        db.run(stmt).await.ok()?;
    }

    Some(db)
}

#[tokio::test]
async fn test_group_by_renders_tuples() {
    let mut available = table_lock().await;
    let db = match seeded_db(&mut available).await {
        Some(db) => db,
        None => {
            eprintln!("Skipping test_group_by_renders_tuples: MySQL unavailable");
            return;
        }
    };

    let result = db.run(STATE_QUERY).await.unwrap();
    assert_eq!(result, "[('A', 2), ('B', 1)]");
}

#[tokio::test]
async fn test_nulls_and_single_columns() {
    let mut available = table_lock().await;
    let db = match seeded_db(&mut available).await {
        Some(db) => db,
        None => {
            eprintln!("Skipping test_nulls_and_single_columns: MySQL unavailable");
            return;
        }
    };

    let result = db
        .run("SELECT Total FROM suicides_data WHERE State = 'A' ORDER BY Year")
        .await
        .unwrap();
    assert_eq!(result, "[(3,), (None,)]");

    let empty = db
        .run("SELECT State FROM suicides_data WHERE State = 'Z'")
        .await
        .unwrap();
    assert_eq!(empty, "");
}

#[tokio::test]
async fn test_table_info_describes_schema_with_samples() {
    let mut available = table_lock().await;
    let db = match seeded_db(&mut available).await {
        Some(db) => db,
        None => {
            eprintln!("Skipping test_table_info_describes_schema_with_samples: MySQL unavailable");
            return;
        }
    };

    let info = db.table_info().await.unwrap();
    assert!(info.contains("CREATE TABLE `suicides_data`"));
    assert!(info.contains("3 rows from suicides_data table:"));
    assert!(info.contains("State\tYear\tType\tGender\tTotal"));
}

#[tokio::test]
async fn test_floats_and_quotes_render_like_python() {
    let mut available = table_lock().await;
    let db = match seeded_db(&mut available).await {
        Some(db) => db,
        None => {
            eprintln!("Skipping test_floats_and_quotes_render_like_python: MySQL unavailable");
            return;
        }
    };

    let result = db.run("SELECT 2.0E0, 'O''Brien'").await.unwrap();
    assert_eq!(result, "[(2.0, \"O'Brien\")]");
}

#[tokio::test]
async fn test_empty_table_still_lists_columns() {
    let mut available = table_lock().await;
    let db = match seeded_db(&mut available).await {
        Some(db) => db,
        None => {
            eprintln!("Skipping test_empty_table_still_lists_columns: MySQL unavailable");
            return;
        }
    };

    db.run("DROP TABLE IF EXISTS empty_data").await.unwrap();
    db.run("CREATE TABLE empty_data (Id INT, Label VARCHAR(8))").await.unwrap();
    let info = db.table_info().await;
    db.run("DROP TABLE empty_data").await.unwrap();

    let info = info.unwrap();
    assert!(info.contains("3 rows from empty_data table:\nId\tLabel\n*/"), "{}", info);
}

#[tokio::test]
async fn test_invalid_sql_surfaces_server_error() {
    let mut available = table_lock().await;
    let db = match seeded_db(&mut available).await {
        Some(db) => db,
        None => {
            eprintln!("Skipping test_invalid_sql_surfaces_server_error: MySQL unavailable");
            return;
        }
    };

    let err = db.run("SELEC State FROM suicides_data").await.unwrap_err();
    assert!(err.to_string().contains("1064"), "{}", err);
}

#[tokio::test]
async fn test_full_turn_against_mysql() {
    let mut available = table_lock().await;
    if seeded_db(&mut available).await.is_none() {
        eprintln!("Skipping test_full_turn_against_mysql: MySQL unavailable");
        return;
    }

    let model = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("Your turn:"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": STATE_QUERY } }]
        })))
        .mount(&model)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("('A', 2), ('B', 1)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "A has 2, B has 1." } }]
        })))
        .mount(&model)
        .await;

    let mut config = SqlChatConfig::default();
    config.database = db_config();
    let llm = OpenAiChatClient::with_base_url(
        LlmConfig::new(Some("sk-test".to_string()), config.llm.model.clone(), None),
        model.uri(),
    )
    .unwrap();
    let connector = MySqlConnector::new(config.database.clone());
    let ctx = AppContext::new(config, Arc::new(llm), Arc::new(connector));

    let mut session = ChatSession::new(PromptProfile::Suicides);
    let resp = handle_request(ChatRequest::Connect { settings: settings() }, &mut session, &ctx).await;
    assert!(resp.is_ok(), "{:?}", resp.error);

    let resp = handle_request(
        ChatRequest::Ask { question: "Count the number of suicides in each state".into() },
        &mut session,
        &ctx,
    )
    .await;
    assert!(resp.is_ok(), "{:?}", resp.error);
    assert_eq!(resp.data.unwrap()["answer"], "A has 2, B has 1.");
    assert_eq!(session.log().len(), 3);
}
