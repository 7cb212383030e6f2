//! MediaWiki action API client.
//!
//! Leaf content lives on wiki pages whose content model is JSON; the leaf's
//! markup is the `body` member. Transliteration is done by the wiki itself
//! through the `{{#transliterate:}}` parser function.
//!
//! Uses the `reqwest` blocking client: the editor issues one request at a
//! time and waits for it.

use leafscribe_core::{ContentFetch, FetchError, Transliterator};
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub struct MediaWikiApi {
    client: Client,
    api_url: String,
    /// Page title of each leaf, by leaf index.
    pages: Vec<String>,
}

impl MediaWikiApi {
    pub fn new(api_url: &str, pages: Vec<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
            pages,
        })
    }

    pub fn leaf_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, leaf: usize) -> Option<&str> {
        self.pages.get(leaf).map(String::as_str)
    }

    fn get(&self, query: &[(&str, String)]) -> Result<Value, FetchError> {
        let url = build_url(&self.api_url, query);
        debug!(%url, "api request");
        let response = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        response
            .json::<Value>()
            .map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

impl ContentFetch for MediaWikiApi {
    fn fetch_leaf(&self, leaf: usize) -> Result<String, FetchError> {
        let title = self.page(leaf).ok_or(FetchError::UnknownLeaf(leaf))?;
        let result = self.get(&content_query(title));
        if let Err(e) = &result {
            warn!(leaf, title, error = %e, "leaf fetch failed");
        }
        leaf_body(&result?)
    }
}

impl Transliterator for MediaWikiApi {
    fn transliterate(&self, text: &str, _script: &str, variant: &str) -> Result<String, FetchError> {
        let response = self.get(&transliterate_query(text, variant))?;
        rendered_text(&response)
    }
}

/// `api_url?k=v&...` with values percent-encoded.
pub fn build_url(api_url: &str, query: &[(&str, String)]) -> String {
    let params: Vec<String> = query
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect();
    format!("{api_url}?{}", params.join("&"))
}

pub fn content_query(title: &str) -> Vec<(&'static str, String)> {
    vec![
        ("action", "parse".to_string()),
        ("format", "json".to_string()),
        ("formatversion", "2".to_string()),
        ("page", title.to_string()),
        ("prop", "wikitext".to_string()),
        ("contentformat", "application/json".to_string()),
    ]
}

pub fn transliterate_query(text: &str, variant: &str) -> Vec<(&'static str, String)> {
    vec![
        ("action", "parse".to_string()),
        ("format", "json".to_string()),
        ("formatversion", "2".to_string()),
        ("prop", "text".to_string()),
        ("contentmodel", "wikitext".to_string()),
        ("disablelimitreport", "1".to_string()),
        ("text", format!("{{{{#transliterate:{variant}|{text}}}}}")),
    ]
}

/// Leaf markup from a `prop=wikitext` response.
///
/// A response without `parse` (missing page) is an empty leaf.
pub fn leaf_body(response: &Value) -> Result<String, FetchError> {
    if let Some(err) = api_error(response) {
        return Err(err);
    }
    let Some(parse) = response.get("parse") else {
        return Ok(String::new());
    };
    let wikitext = match parse.get("wikitext") {
        Some(Value::String(s)) => s.as_str(),
        // formatversion=1 wraps the text in {"*": ...}
        Some(Value::Object(o)) => o.get("*").and_then(Value::as_str).unwrap_or_default(),
        _ => return Err(FetchError::Malformed("parse result has no wikitext".into())),
    };
    if wikitext.trim().is_empty() {
        return Ok(String::new());
    }
    let page: Value =
        serde_json::from_str(wikitext).map_err(|e| FetchError::Malformed(e.to_string()))?;
    Ok(page
        .get("body")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string())
}

/// Rendered HTML from a `prop=text` response.
pub fn rendered_text(response: &Value) -> Result<String, FetchError> {
    if let Some(err) = api_error(response) {
        return Err(err);
    }
    match response.get("parse").and_then(|p| p.get("text")) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Object(o)) => o
            .get("*")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| FetchError::Malformed("parse text has no content".into())),
        _ => Err(FetchError::Malformed("response has no parse text".into())),
    }
}

fn api_error(response: &Value) -> Option<FetchError> {
    let err = response.get("error")?;
    let info = err
        .get("info")
        .or_else(|| err.get("code"))
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    Some(FetchError::Service(info.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn url_encodes_values() {
        let url = build_url("/w/api.php", &transliterate_query("ᬓ a", "latn"));
        assert!(url.starts_with("/w/api.php?action=parse&"));
        assert!(url.contains("text=%7B%7B%23transliterate%3Alatn%7C%E1%AC%93%20a%7D%7D"));
        assert!(url.contains("disablelimitreport=1"));
    }

    #[test]
    fn content_query_asks_for_json_wikitext() {
        let q = content_query("Lontar/1");
        assert!(q.contains(&("prop", "wikitext".to_string())));
        assert!(q.contains(&("contentformat", "application/json".to_string())));
        assert!(q.contains(&("page", "Lontar/1".to_string())));
    }

    #[test]
    fn body_is_taken_from_page_json() {
        let response = json!({
            "parse": {
                "title": "Lontar/1",
                "wikitext": "{\"body\": \"ᬓ<br>\\nᬔ\"}"
            }
        });
        assert_eq!(leaf_body(&response).unwrap(), "ᬓ<br>\nᬔ");
    }

    #[test]
    fn missing_page_is_empty() {
        assert_eq!(leaf_body(&json!({})).unwrap(), "");
        assert_eq!(
            leaf_body(&json!({"parse": {"wikitext": "{}"}})).unwrap(),
            ""
        );
    }

    #[test]
    fn broken_page_json_is_malformed() {
        let response = json!({"parse": {"wikitext": "not json"}});
        assert!(matches!(leaf_body(&response), Err(FetchError::Malformed(_))));
    }

    #[test]
    fn error_member_is_a_service_error() {
        let response = json!({"error": {"code": "badtitle", "info": "Bad title"}});
        match rendered_text(&response) {
            Err(FetchError::Service(info)) => assert_eq!(info, "Bad title"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rendered_text_both_formats() {
        assert_eq!(
            rendered_text(&json!({"parse": {"text": "<p>ka</p>"}})).unwrap(),
            "<p>ka</p>"
        );
        assert_eq!(
            rendered_text(&json!({"parse": {"text": {"*": "<p>ka</p>"}}})).unwrap(),
            "<p>ka</p>"
        );
    }

    #[test]
    fn unknown_leaf_is_not_requested() {
        let api = MediaWikiApi::new("http://127.0.0.1:9/api.php", vec![], Duration::from_millis(10))
            .unwrap();
        assert!(matches!(api.fetch_leaf(0), Err(FetchError::UnknownLeaf(0))));
    }
}
