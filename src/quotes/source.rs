//! Where quotes come from.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::QuoteError;

const REQUEST_TIMEOUT_SECS: u64 = 15;

/// A quote and its author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub text: String,
    pub author: String,
}

/// Supplies one quote per call.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch(&self) -> Result<Quote, QuoteError>;
}

#[derive(Debug, Deserialize)]
struct ZenQuote {
    q: String,
    a: String,
}

/// Client for APIs answering `[{"q": "...", "a": "..."}]`.
#[derive(Debug, Clone)]
pub struct ZenQuotes {
    url: String,
    http: Client,
}

impl ZenQuotes {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>) -> Result<Self, QuoteError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }
}

/// Takes the first quote of an API response body.
pub(crate) fn parse_response(body: &str) -> Result<Quote, QuoteError> {
    let quotes: Vec<ZenQuote> =
        serde_json::from_str(body).map_err(|e| QuoteError::BadResponse(e.to_string()))?;
    let first = quotes
        .into_iter()
        .next()
        .ok_or_else(|| QuoteError::BadResponse("empty quote list".to_owned()))?;

    Ok(Quote {
        text: first.q,
        author: first.a,
    })
}

#[async_trait]
impl QuoteSource for ZenQuotes {
    async fn fetch(&self) -> Result<Quote, QuoteError> {
        let body = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response() {
        let quote = parse_response(r#"[{"q":"Stay hungry.","a":"Steve Jobs","h":"<blockquote/>"}]"#).unwrap();
        assert_eq!(quote.text, "Stay hungry.");
        assert_eq!(quote.author, "Steve Jobs");
    }

    #[test]
    fn test_parse_response_errors() {
        assert!(matches!(parse_response("[]"), Err(QuoteError::BadResponse(_))));
        assert!(matches!(
            parse_response(r#"{"error":"Too many requests"}"#),
            Err(QuoteError::BadResponse(_))
        ));
    }
}
