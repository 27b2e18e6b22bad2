//! Request Builder: turns a [`RequestSpec`] into the provider payload.

use serde::{Deserialize, Serialize};

/// Maximum number of handles the X search tool accepts per list.
pub const MAX_X_HANDLES: usize = 10;

pub const DEFAULT_MODEL: &str = "grok-4-1-fast-non-reasoning";
pub const DEFAULT_REASONING_MODEL: &str = "grok-4-1-fast";

/// The two model identifiers the builder chooses between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelIds {
    pub standard: String,
    pub reasoning: String,
}

impl Default for ModelIds {
    fn default() -> Self {
        Self {
            standard: DEFAULT_MODEL.to_string(),
            reasoning: DEFAULT_REASONING_MODEL.to_string(),
        }
    }
}

impl ModelIds {
    pub fn select(&self, use_reasoning: bool) -> &str {
        if use_reasoning {
            &self.reasoning
        } else {
            &self.standard
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// What the caller wants to say.
///
/// `Messages` is an escape hatch: the list is appended verbatim (after the system
/// instruction, if any) and role names are not checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Query(String),
    Messages(Vec<Message>),
}

impl From<&str> for Input {
    fn from(s: &str) -> Self {
        Self::Query(s.to_string())
    }
}

impl From<String> for Input {
    fn from(s: String) -> Self {
        Self::Query(s)
    }
}

impl From<Vec<Message>> for Input {
    fn from(m: Vec<Message>) -> Self {
        Self::Messages(m)
    }
}

/// Filters for the X search tool. Ignored unless `use_x_search` is set, except
/// `enable_image_understanding`, which is also honored by the web search tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XFilters {
    pub allowed_handles: Vec<String>,
    pub excluded_handles: Vec<String>,
    /// ISO date (YYYY-MM-DD); passed through unvalidated.
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub enable_image_understanding: bool,
    pub enable_video_understanding: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub input: Input,
    /// Response id from a previous result; resumes that conversation server-side.
    pub continuation_id: Option<String>,
    /// `None` or `Some(0)` omits the cap from the wire request.
    pub max_output_tokens: Option<u32>,
    pub system_instruction: Option<String>,
    pub use_web_search: bool,
    pub use_x_search: bool,
    pub use_reasoning: bool,
    pub x_filters: XFilters,
}

impl RequestSpec {
    pub fn new(input: impl Into<Input>) -> Self {
        Self {
            input: input.into(),
            continuation_id: None,
            max_output_tokens: None,
            system_instruction: None,
            use_web_search: false,
            use_x_search: false,
            use_reasoning: false,
            x_filters: XFilters::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSearchTool {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_image_understanding: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XSearchTool {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_x_handles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_x_handles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_image_understanding: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_video_understanding: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Tool {
    WebSearch(WebSearchTool),
    XSearch(XSearchTool),
}

/// Provider payload for `POST /v1/responses`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRequest {
    pub model: String,
    pub input: Vec<Message>,
    pub store: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// Omitted from the JSON body when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
}

fn flag(on: bool) -> Option<bool> {
    on.then_some(true)
}

fn capped_handles(handles: &[String]) -> Option<Vec<String>> {
    if handles.is_empty() {
        return None;
    }
    Some(handles.iter().take(MAX_X_HANDLES).cloned().collect())
}

fn x_search_tool(filters: &XFilters) -> XSearchTool {
    XSearchTool {
        allowed_x_handles: capped_handles(&filters.allowed_handles),
        excluded_x_handles: capped_handles(&filters.excluded_handles),
        from_date: filters.from_date.clone(),
        to_date: filters.to_date.clone(),
        enable_image_understanding: flag(filters.enable_image_understanding),
        enable_video_understanding: flag(filters.enable_video_understanding),
    }
}

/// Build the wire request. Pure; never fails.
pub fn build(spec: &RequestSpec, models: &ModelIds) -> WireRequest {
    let mut input = Vec::new();
    if let Some(sys) = &spec.system_instruction {
        input.push(Message::system(sys.clone()));
    }
    match &spec.input {
        Input::Query(q) => input.push(Message::user(q.clone())),
        Input::Messages(m) => input.extend(m.iter().cloned()),
    }

    let mut tools = Vec::new();
    if spec.use_web_search {
        tools.push(Tool::WebSearch(WebSearchTool {
            // Video understanding is an X-only knob.
            enable_image_understanding: flag(spec.x_filters.enable_image_understanding),
        }));
    }
    if spec.use_x_search {
        tools.push(Tool::XSearch(x_search_tool(&spec.x_filters)));
    }

    WireRequest {
        model: models.select(spec.use_reasoning).to_string(),
        input,
        store: true,
        max_output_tokens: spec.max_output_tokens.filter(|n| *n > 0),
        tools,
        previous_response_id: spec.continuation_id.clone(),
    }
}
