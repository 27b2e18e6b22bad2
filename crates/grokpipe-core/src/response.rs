//! Response Normalizer: walks the provider's `output` items and flattens them into a
//! [`NormalizedResult`].
//!
//! The provider payload is loosely structured, so decoding is permissive: unknown item
//! types decode to `Other` and are skipped, items that do not decode at all are dropped,
//! and missing fields fall back to defaults.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_FAILED: &str = "failed";

const ANNOTATION_FALLBACK_TITLE: &str = "Source";
const WEB_RESULT_FALLBACK_TITLE: &str = "Web Result";
const X_POST_FALLBACK_TITLE: &str = "X Post";

/// Non-arrays read as empty; elements that fail to decode are dropped.
fn lenient_vec<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let serde_json::Value::Array(items) = serde_json::Value::deserialize(d)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect())
}

/// A value of the wrong type reads as absent.
fn lenient_opt<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = serde_json::Value::deserialize(d)?;
    Ok(serde_json::from_value::<Option<T>>(raw).ok().flatten())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireResponse {
    #[serde(default, deserialize_with = "lenient_opt")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub output: Vec<OutputItem>,
    /// Some responses carry the final text directly; used only when `output` has none.
    #[serde(default, deserialize_with = "lenient_opt")]
    pub output_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt")]
    pub usage: Option<serde_json::Map<String, serde_json::Value>>,
}

impl WireResponse {
    /// Decode a 2xx body. Only a body that is not a JSON object is rejected.
    pub fn from_value(v: serde_json::Value) -> crate::Result<Self> {
        serde_json::from_value(v)
            .map_err(|e| crate::Error::Transport(format!("invalid response body: {e}")))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    Message {
        #[serde(default, deserialize_with = "lenient_vec")]
        content: Vec<ContentItem>,
    },
    WebSearchCall,
    XSearchCall,
    WebSearchResult {
        #[serde(default, deserialize_with = "lenient_vec")]
        results: Vec<SearchHit>,
    },
    XSearchResult {
        #[serde(default, deserialize_with = "lenient_vec")]
        results: Vec<SearchHit>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    OutputText {
        #[serde(default)]
        text: Option<String>,
    },
    /// Text carrying citation annotations.
    Text {
        #[serde(default)]
        text: Option<String>,
        #[serde(default, deserialize_with = "lenient_vec")]
        annotations: Vec<Annotation>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Annotation {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// X results only.
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResult {
    /// Pass this back as the continuation id to resume the conversation.
    pub id: Option<String>,
    pub status: String,
    pub text: String,
    pub sources: Vec<Source>,
    pub usage: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NormalizedResult {
    /// Result for a call that never produced a response body worth parsing.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            id: None,
            status: STATUS_FAILED.to_string(),
            text: String::new(),
            sources: Vec::new(),
            usage: serde_json::Map::new(),
            error: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Appends unless an entry with the same url *and* title is already present.
fn push_source(sources: &mut Vec<Source>, url: Option<&str>, title: String) {
    let Some(url) = url.filter(|u| !u.is_empty()) else {
        return;
    };
    let source = Source {
        url: url.to_string(),
        title,
    };
    if !sources.contains(&source) {
        sources.push(source);
    }
}

fn title_or(title: Option<&str>, fallback: &str) -> String {
    title.unwrap_or(fallback).to_string()
}

/// Normalize a decoded provider response. Pure.
pub fn parse(wire: WireResponse) -> NormalizedResult {
    let mut text = String::new();
    let mut sources = Vec::new();

    for item in &wire.output {
        match item {
            OutputItem::Message { content } => {
                for c in content {
                    match c {
                        ContentItem::OutputText { text: t } => {
                            text.push_str(t.as_deref().unwrap_or_default());
                        }
                        ContentItem::Text {
                            text: t,
                            annotations,
                        } => {
                            text.push_str(t.as_deref().unwrap_or_default());
                            for ann in annotations {
                                push_source(
                                    &mut sources,
                                    ann.url.as_deref(),
                                    title_or(ann.title.as_deref(), ANNOTATION_FALLBACK_TITLE),
                                );
                            }
                        }
                        ContentItem::Other => {}
                    }
                }
            }
            OutputItem::WebSearchResult { results } => {
                for hit in results {
                    push_source(
                        &mut sources,
                        hit.url.as_deref(),
                        title_or(hit.title.as_deref(), WEB_RESULT_FALLBACK_TITLE),
                    );
                }
            }
            OutputItem::XSearchResult { results } => {
                for hit in results {
                    let title = hit.title.as_deref().or(hit.author.as_deref());
                    push_source(
                        &mut sources,
                        hit.url.as_deref(),
                        title_or(title, X_POST_FALLBACK_TITLE),
                    );
                }
            }
            // Query-issuance markers; nothing to extract.
            OutputItem::WebSearchCall | OutputItem::XSearchCall | OutputItem::Other => {}
        }
    }

    if text.is_empty() {
        if let Some(direct) = wire.output_text {
            text = direct;
        }
    }

    NormalizedResult {
        id: wire.id,
        status: wire
            .status
            .unwrap_or_else(|| STATUS_COMPLETED.to_string()),
        text,
        sources,
        usage: wire.usage.unwrap_or_default(),
        error: None,
    }
}
