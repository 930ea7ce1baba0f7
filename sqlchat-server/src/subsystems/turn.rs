//! A single question turn on a session.

use sqlchat_core::{ChatSession, SqlChatError};

use crate::context::AppContext;
use crate::subsystems::chain::{self, ChainOutput};

/// Run one question through the chain and record the answer.
///
/// Returns `Ok(None)` for blank input, which leaves the log untouched. The
/// question is logged before the chain runs, so a failed turn keeps it
/// without an answer.
pub async fn ask(
    ctx: &AppContext,
    session: &mut ChatSession,
    question: &str,
) -> Result<Option<ChainOutput>, SqlChatError> {
    if !session.accept_question(question) {
        tracing::debug!(session = %session.id, "Ignoring blank question");
        return Ok(None);
    }

    let database = match session.database() {
        Some(db) => db,
        None => {
            session.abort_turn();
            return Err(SqlChatError::NotConnected);
        }
    };

    let history = session.log().render_history();
    let result = chain::answer_question(
        ctx.llm.as_ref(),
        database.as_ref(),
        session.profile,
        question,
        &history,
    )
    .await;

    match result {
        Ok(output) => {
            session.complete_turn(output.answer.clone());
            tracing::info!(
                session = %session.id,
                turns = session.log().len(),
                "Question answered"
            );
            Ok(Some(output))
        }
        Err(e) => {
            session.abort_turn();
            tracing::error!(session = %session.id, error = %e, "Question failed");
            Err(e)
        }
    }
}
