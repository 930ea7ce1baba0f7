//! Connect action: open the session's database handle and, for profiles with
//! a website field, scrape the given page.

use serde::Serialize;
use sqlchat_core::{scrape_website, ChatSession, ConnectionSettings, SqlChatError};

use crate::context::AppContext;

#[derive(Debug, Clone, Serialize)]
pub struct ConnectReport {
    pub connected: bool,
    pub connection: String,
    /// `None` when nothing was scraped or the page did not return 200.
    pub scraped_paragraphs: Option<usize>,
}

/// The handle is attached before scraping starts, so a failing scrape still
/// leaves the session connected.
pub async fn connect_session(
    ctx: &AppContext,
    session: &mut ChatSession,
    settings: ConnectionSettings,
) -> Result<ConnectReport, SqlChatError> {
    let connection = settings.redacted();
    tracing::info!(session = %session.id, database = %connection, "Connecting to database");

    let database = ctx.connector.connect(&settings).await.map_err(|e| {
        tracing::error!(session = %session.id, error = %e, "Database connection failed");
        e
    })?;

    let website = if session.profile.scrapes_website() {
        settings.website().map(str::to_string)
    } else {
        None
    };

    session.attach(settings, database);

    let mut scraped_paragraphs = None;
    if let Some(url) = website {
        let scraped = scrape_website(&ctx.http_client, &url).await?;
        scraped_paragraphs = scraped.as_ref().map(Vec::len);
        session.set_scraped(scraped);
    }

    Ok(ConnectReport {
        connected: true,
        connection,
        scraped_paragraphs,
    })
}
