//! External vessel-name lookup
//!
//! The lookup service answers with a JSON array:
//!
//! ```text
//! [ { "ERROR": false, "ERROR_MESSAGE": null },
//!   [ { "MMSI": "244123456", "NAME": "POLARIS", ... } ] ]
//! ```
//!
//! Element 0 is a status record, element 1 (optional) the matching vessels.
//! Any shape without a usable `NAME` is a miss, not an error.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug)]
pub enum LookupError {
    Http(reqwest::Error),
    Status(u16),
    Malformed(String),
    Api(String),
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        LookupError::Http(err)
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(err: serde_json::Error) -> Self {
        LookupError::Malformed(err.to_string())
    }
}

impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupError::Http(e) => write!(f, "HTTP error: {}", e),
            LookupError::Status(code) => write!(f, "Lookup API returned status {}", code),
            LookupError::Malformed(e) => write!(f, "Malformed lookup response: {}", e),
            LookupError::Api(msg) => write!(f, "Lookup API error: {}", msg),
        }
    }
}

impl std::error::Error for LookupError {}

/// Source of vessel names for identifiers with no inline or cached name
#[async_trait]
pub trait NameLookup: Send + Sync {
    /// `Ok(None)` means the service answered but had no name
    async fn lookup(&self, identifier: &str) -> Result<Option<String>, LookupError>;
}

/// Extract the vessel name from a lookup response body
pub fn parse_lookup_response(body: &Value) -> Result<Option<String>, LookupError> {
    let items = body
        .as_array()
        .ok_or_else(|| LookupError::Malformed("expected a JSON array".to_string()))?;

    if let Some(status) = items.first() {
        if status.get("ERROR").map(is_truthy).unwrap_or(false) {
            let message = status
                .get("ERROR_MESSAGE")
                .and_then(Value::as_str)
                .unwrap_or("unspecified error");
            return Err(LookupError::Api(message.to_string()));
        }
    }

    let name = items
        .get(1)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|record| record.get("NAME").and_then(Value::as_str))
        .map(str::trim)
        .find(|name| !name.is_empty())
        .map(str::to_string);

    Ok(name)
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty() && s != "0" && !s.eq_ignore_ascii_case("false"),
        Value::Null => false,
        _ => true,
    }
}

/// HTTP lookup client
///
/// `url_template` carries `{mmsi}` and `{api_key}` placeholders, e.g.
/// `https://api.example.com/vessels?key={api_key}&mmsi={mmsi}`.
pub struct HttpNameLookup {
    client: reqwest::Client,
    url_template: String,
    api_key: String,
}

impl HttpNameLookup {
    pub fn new(url_template: &str, api_key: &str, timeout: Duration) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url_template: url_template.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url_for(&self, identifier: &str) -> String {
        self.url_template
            .replace("{mmsi}", identifier)
            .replace("{api_key}", &self.api_key)
    }
}

#[async_trait]
impl NameLookup for HttpNameLookup {
    async fn lookup(&self, identifier: &str) -> Result<Option<String>, LookupError> {
        let response = self.client.get(self.url_for(identifier)).send().await?;

        if !response.status().is_success() {
            return Err(LookupError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        let value: Value = serde_json::from_str(&body)?;
        parse_lookup_response(&value)
    }
}
