use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Fetch `url` and return the trimmed text of every `<p>` element in
/// document order. Any status other than 200 logs a warning and yields `None`.
pub async fn scrape_website(client: &Client, url: &str) -> Result<Option<Vec<String>>, ScrapeError> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if status != StatusCode::OK {
        tracing::warn!(
            url = %url,
            status = status.as_u16(),
            "Unable to retrieve data from website"
        );
        return Ok(None);
    }

    let body = response.text().await?;
    let paragraphs = extract_paragraphs(&body);
    tracing::info!(url = %url, paragraphs = paragraphs.len(), "Website scraped");

    Ok(Some(paragraphs))
}

/// Trimmed text content of each `<p>`, nested markup flattened.
pub fn extract_paragraphs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "p")
        .map(|p| p.text().collect::<String>().trim().to_string())
        .collect()
}
