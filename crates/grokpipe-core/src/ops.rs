//! Fixed presets for the named operations exposed to tool hosts.

use crate::request::{RequestSpec, XFilters};

pub const DEFAULT_MAX_RESULTS: u32 = 10;

const ASK_INSTRUCTION: &str = "Be concise and factual. Cite sources when using web information.";
const THINK_INSTRUCTION: &str = "Think step by step. Be thorough and cite sources.";
const X_ASK_INSTRUCTION: &str =
    "Be concise and factual. Cite X posts when referencing discussions or opinions.";

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn search_instruction(max_results: u32) -> String {
    format!(
        "Search for the query and return results in this exact format:\n\n---\nTITLE: [page title]\nURL: [full url]\nSNIPPET: [2-3 sentence excerpt]\n---\n\nReturn up to {max_results} results. No additional commentary or analysis."
    )
}

fn x_search_instruction(max_results: u32) -> String {
    format!(
        "Search X for the query and return results in this exact format:\n\n---\nAUTHOR: @[handle]\nPOST: [post content]\nURL: [full x.com url]\n---\n\nReturn up to {max_results} results. No additional commentary or analysis."
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Search,
    Ask,
    Think,
    Chat,
    XSearch,
    XAsk,
}

/// Caller-supplied arguments layered under an operation's preset.
#[derive(Debug, Clone, Default)]
pub struct Call {
    pub query: String,
    pub response_id: Option<String>,
    /// Ignored by `Search`/`XSearch`, which use a fixed cap.
    pub max_tokens: Option<u32>,
    /// Only used by `Search`/`XSearch` (substituted into the format instruction).
    pub max_results: Option<u32>,
    /// Only used by the X operations.
    pub x_filters: XFilters,
}

impl Call {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Ask => "ask",
            Self::Think => "think",
            Self::Chat => "chat",
            Self::XSearch => "x_search",
            Self::XAsk => "x_ask",
        }
    }

    pub fn uses_web_search(self) -> bool {
        matches!(self, Self::Search | Self::Ask | Self::Think)
    }

    pub fn uses_x_search(self) -> bool {
        matches!(self, Self::XSearch | Self::XAsk)
    }

    pub fn uses_reasoning(self) -> bool {
        matches!(self, Self::Think)
    }

    pub fn default_max_tokens(self) -> u32 {
        match self {
            Self::Search | Self::XSearch => 4096,
            Self::Ask | Self::Chat | Self::XAsk => 8192,
            Self::Think => 16384,
        }
    }

    fn fixed_max_tokens(self) -> bool {
        matches!(self, Self::Search | Self::XSearch)
    }

    pub fn system_instruction(self, max_results: u32) -> Option<String> {
        match self {
            Self::Search => Some(search_instruction(max_results)),
            Self::Ask => Some(ASK_INSTRUCTION.to_string()),
            Self::Think => Some(THINK_INSTRUCTION.to_string()),
            Self::Chat => None,
            Self::XSearch => Some(x_search_instruction(max_results)),
            Self::XAsk => Some(X_ASK_INSTRUCTION.to_string()),
        }
    }

    pub fn request_spec(self, call: Call) -> RequestSpec {
        let max_output_tokens = if self.fixed_max_tokens() {
            self.default_max_tokens()
        } else {
            call.max_tokens.unwrap_or(self.default_max_tokens())
        };
        let max_results = call.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        let mut spec = RequestSpec::new(call.query);
        spec.continuation_id = non_blank(call.response_id);
        spec.max_output_tokens = Some(max_output_tokens);
        spec.system_instruction = self.system_instruction(max_results);
        spec.use_web_search = self.uses_web_search();
        spec.use_x_search = self.uses_x_search();
        spec.use_reasoning = self.uses_reasoning();
        if self.uses_x_search() {
            let mut x = call.x_filters;
            x.from_date = non_blank(x.from_date);
            x.to_date = non_blank(x.to_date);
            spec.x_filters = x;
        }
        spec
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
