//! Two-step question chain: question → SQL → result → answer.
//!
//! The schema description is fetched fresh for each step. The model's SQL is
//! executed exactly as returned; any driver error fails the whole chain.

use sqlchat_core::{ChatBackend, PromptProfile, SqlChatError, SqlDatabase};

/// Everything a successful chain run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainOutput {
    pub query: String,
    pub response: String,
    pub answer: String,
}

/// Ask the model for a SQL statement answering `question`.
pub async fn generate_query(
    llm: &dyn ChatBackend,
    db: &dyn SqlDatabase,
    profile: PromptProfile,
    question: &str,
    chat_history: &str,
) -> Result<String, SqlChatError> {
    let schema = db.table_info().await?;
    let prompt = profile.sql_prompt(&schema, chat_history, question);

    let query = llm.complete(&prompt).await?;
    tracing::info!(model = llm.model(), query = %query, "Generated SQL query");

    Ok(query)
}

/// Generate, execute and explain a query.
pub async fn answer_question(
    llm: &dyn ChatBackend,
    db: &dyn SqlDatabase,
    profile: PromptProfile,
    question: &str,
    chat_history: &str,
) -> Result<ChainOutput, SqlChatError> {
    let query = generate_query(llm, db, profile, question, chat_history).await?;

    let schema = db.table_info().await?;
    let response = db.run(&query).await?;
    tracing::debug!(rows = %response, "Query executed");

    let prompt = profile.answer_prompt(&schema, chat_history, &query, question, &response);
    let answer = llm.complete(&prompt).await?;

    Ok(ChainOutput {
        query,
        response,
        answer,
    })
}
