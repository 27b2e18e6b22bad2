use anyhow::Result;
use clap::{Parser, Subcommand};
use grokpipe_core::{render, Call, Operation, XFilters};
use grokpipe_local::{XaiClient, XaiConfig};

mod envelope;
mod logging;

#[derive(Parser, Debug)]
#[command(name = "grokpipe")]
#[command(about = "xAI Grok with web and X search grounding (CLI + MCP stdio server)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Search query (shorthand for the search command)
    #[arg(long)]
    search: Option<String>,
    /// Ask query (shorthand for the ask command)
    #[arg(long)]
    ask: Option<String>,
    /// Think query (shorthand for the think command)
    #[arg(long)]
    think: Option<String>,
    /// Chat query without web search
    #[arg(long)]
    chat: Option<String>,
    /// X search query (shorthand for the x-search command)
    #[arg(long)]
    x_search: Option<String>,
    /// X ask query (shorthand for the x-ask command)
    #[arg(long)]
    x_ask: Option<String>,

    /// Previous response id to continue a conversation
    #[arg(short = 'r', long)]
    response_id: Option<String>,

    #[command(flatten)]
    x: XFilterArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    output: OutputFormat,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as an MCP stdio server (for MCP clients).
    McpStdio,
    /// Quick web search returning structured results.
    Search(SearchCmd),
    /// Grounded answer with web search.
    Ask(ConversationCmd),
    /// Step-by-step reasoning with web search (reasoning model).
    Think(ConversationCmd),
    /// Chat without search.
    Chat(ConversationCmd),
    /// Search X (Twitter) posts.
    XSearch(XSearchCmd),
    /// Grounded answer using X (Twitter) posts as sources.
    XAsk(XAskCmd),
    /// Diagnose configuration (json; no secrets).
    Doctor,
    /// Print version info.
    Version,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Args, Debug, Clone, Default)]
struct XFilterArgs {
    /// Only include posts from these X handles (comma-separated, without @; max 10)
    #[arg(long, value_delimiter = ',')]
    allowed_handles: Vec<String>,
    /// Exclude posts from these X handles (comma-separated, without @; max 10)
    #[arg(long, value_delimiter = ',')]
    excluded_handles: Vec<String>,
    /// Start date for X search (YYYY-MM-DD)
    #[arg(long)]
    from_date: Option<String>,
    /// End date for X search (YYYY-MM-DD)
    #[arg(long)]
    to_date: Option<String>,
    /// Let the model analyze images in posts
    #[arg(long)]
    enable_images: bool,
    /// Let the model analyze videos in posts
    #[arg(long)]
    enable_video: bool,
}

impl From<XFilterArgs> for XFilters {
    fn from(a: XFilterArgs) -> Self {
        XFilters {
            allowed_handles: a.allowed_handles,
            excluded_handles: a.excluded_handles,
            from_date: a.from_date,
            to_date: a.to_date,
            enable_image_understanding: a.enable_images,
            enable_video_understanding: a.enable_video,
        }
    }
}

#[derive(clap::Args, Debug)]
struct SearchCmd {
    query: String,
    /// Maximum number of results to ask for
    #[arg(long, default_value_t = grokpipe_core::ops::DEFAULT_MAX_RESULTS)]
    max_results: u32,
}

#[derive(clap::Args, Debug)]
struct ConversationCmd {
    query: String,
    /// Previous response id to continue a conversation
    #[arg(short = 'r', long)]
    response_id: Option<String>,
    /// Maximum response length in tokens (default depends on the command)
    #[arg(long)]
    max_tokens: Option<u32>,
}

#[derive(clap::Args, Debug)]
struct XSearchCmd {
    query: String,
    /// Maximum number of results to ask for
    #[arg(long, default_value_t = grokpipe_core::ops::DEFAULT_MAX_RESULTS)]
    max_results: u32,
    #[command(flatten)]
    filters: XFilterArgs,
}

#[derive(clap::Args, Debug)]
struct XAskCmd {
    query: String,
    /// Previous response id to continue a conversation
    #[arg(short = 'r', long)]
    response_id: Option<String>,
    /// Maximum response length in tokens (default: 8192)
    #[arg(long)]
    max_tokens: Option<u32>,
    #[command(flatten)]
    filters: XFilterArgs,
}

impl Cli {
    /// First shorthand flag that is set, in a fixed order.
    fn shorthand(&self) -> Option<(Operation, Call)> {
        let (op, query) = [
            (Operation::Search, &self.search),
            (Operation::Ask, &self.ask),
            (Operation::Think, &self.think),
            (Operation::Chat, &self.chat),
            (Operation::XSearch, &self.x_search),
            (Operation::XAsk, &self.x_ask),
        ]
        .into_iter()
        .find_map(|(op, q)| q.clone().map(|q| (op, q)))?;
        Some((
            op,
            Call {
                query,
                response_id: self.response_id.clone(),
                x_filters: self.x.clone().into(),
                ..Default::default()
            },
        ))
    }
}

impl Commands {
    fn into_operation(self) -> Option<(Operation, Call)> {
        let conversation = |op, c: ConversationCmd| {
            (
                op,
                Call {
                    query: c.query,
                    response_id: c.response_id,
                    max_tokens: c.max_tokens,
                    ..Default::default()
                },
            )
        };
        Some(match self {
            Commands::Search(c) => (
                Operation::Search,
                Call {
                    query: c.query,
                    max_results: Some(c.max_results),
                    ..Default::default()
                },
            ),
            Commands::Ask(c) => conversation(Operation::Ask, c),
            Commands::Think(c) => conversation(Operation::Think, c),
            Commands::Chat(c) => conversation(Operation::Chat, c),
            Commands::XSearch(c) => (
                Operation::XSearch,
                Call {
                    query: c.query,
                    max_results: Some(c.max_results),
                    x_filters: c.filters.into(),
                    ..Default::default()
                },
            ),
            Commands::XAsk(c) => (
                Operation::XAsk,
                Call {
                    query: c.query,
                    response_id: c.response_id,
                    max_tokens: c.max_tokens,
                    x_filters: c.filters.into(),
                    ..Default::default()
                },
            ),
            _ => return None,
        })
    }
}

async fn run_cli(op: Operation, call: Call, output: OutputFormat) -> Result<()> {
    let client = XaiClient::from_env(grokpipe_local::http_client()?)?;
    let t0 = std::time::Instant::now();
    let result = grokpipe_core::execute(&client, &op.request_spec(call)).await;
    match output {
        OutputFormat::Text => println!("{}", render(&result)),
        OutputFormat::Json => {
            let payload = envelope::result_payload(op.name(), &result, t0.elapsed().as_millis());
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }
    if result.is_error() {
        std::process::exit(1);
    }
    Ok(())
}

fn doctor(output: OutputFormat) -> Result<()> {
    let t0 = std::time::Instant::now();
    // Only report booleans / names, never key values.
    let key_present = grokpipe_local::env::has_env("GROKPIPE_XAI_API_KEY")
        || grokpipe_local::env::has_env("XAI_API_KEY");
    let mut payload = match XaiConfig::from_env() {
        Ok(c) => serde_json::json!({
            "ok": true,
            "configured": { "xai_api_key": key_present },
            "endpoint": c.endpoint,
            "endpoint_is_default": c.endpoint_is_default(),
            "models": c.models,
            "timeout_ms": c.timeout.as_millis() as u64,
        }),
        Err(e) => serde_json::json!({
            "ok": false,
            "configured": { "xai_api_key": key_present },
            "error": e.to_string(),
        }),
    };
    envelope::add_envelope_fields(&mut payload, "doctor", t0.elapsed().as_millis());
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&payload)?),
        OutputFormat::Text => {
            println!("xai_api_key: {}", if key_present { "set" } else { "missing" });
            if let Some(ep) = payload["endpoint"].as_str() {
                println!("endpoint: {ep}");
                println!(
                    "models: {} / {}",
                    payload["models"]["standard"].as_str().unwrap_or(""),
                    payload["models"]["reasoning"].as_str().unwrap_or("")
                );
            }
            if let Some(e) = payload["error"].as_str() {
                println!("error: {e}");
            }
        }
    }
    Ok(())
}

#[cfg(feature = "stdio")]
mod mcp {
    use grokpipe_core::{run_operation, Call, Operation, ResponsesBackend, XFilters};
    use grokpipe_local::XaiClient;
    use rmcp::{
        handler::server::router::tool::ToolRouter as RmcpToolRouter,
        handler::server::wrapper::Parameters,
        model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
        tool, tool_handler, tool_router,
        transport::stdio,
        ErrorData as McpError, ServiceExt,
    };
    use schemars::JsonSchema;
    use serde::Deserialize;
    use std::sync::Arc;

    #[derive(Debug, Deserialize, JsonSchema, Default)]
    struct SearchArgs {
        /// Search query (required).
        #[serde(default)]
        query: String,
        /// Maximum number of results to return (default: 10).
        #[serde(default)]
        max_results: Option<u32>,
    }

    #[derive(Debug, Deserialize, JsonSchema, Default)]
    struct ConversationArgs {
        /// Your question or message (required).
        #[serde(default)]
        query: String,
        /// Pass the response_id from a previous response to continue that conversation.
        #[serde(default)]
        response_id: Option<String>,
        /// Maximum response length in tokens.
        #[serde(default)]
        max_tokens: Option<u32>,
    }

    #[derive(Debug, Deserialize, JsonSchema, Default)]
    struct XSearchArgs {
        /// Search query (required).
        #[serde(default)]
        query: String,
        /// Maximum number of results to return (default: 10).
        #[serde(default)]
        max_results: Option<u32>,
        /// Only include posts from these X handles (max 10, without @).
        #[serde(default)]
        allowed_handles: Option<Vec<String>>,
        /// Exclude posts from these X handles (max 10, without @).
        #[serde(default)]
        excluded_handles: Option<Vec<String>>,
        /// Start date in YYYY-MM-DD format.
        #[serde(default)]
        from_date: Option<String>,
        /// End date in YYYY-MM-DD format.
        #[serde(default)]
        to_date: Option<String>,
        /// Allow the model to analyze images in posts.
        #[serde(default)]
        enable_images: Option<bool>,
        /// Allow the model to analyze videos in posts.
        #[serde(default)]
        enable_video: Option<bool>,
    }

    #[derive(Debug, Deserialize, JsonSchema, Default)]
    struct XAskArgs {
        /// Your question (required).
        #[serde(default)]
        query: String,
        /// Pass the response_id from a previous response to continue that conversation.
        #[serde(default)]
        response_id: Option<String>,
        /// Maximum response length in tokens (default: 8192).
        #[serde(default)]
        max_tokens: Option<u32>,
        /// Only include posts from these X handles (max 10, without @).
        #[serde(default)]
        allowed_handles: Option<Vec<String>>,
        /// Exclude posts from these X handles (max 10, without @).
        #[serde(default)]
        excluded_handles: Option<Vec<String>>,
        /// Start date in YYYY-MM-DD format.
        #[serde(default)]
        from_date: Option<String>,
        /// End date in YYYY-MM-DD format.
        #[serde(default)]
        to_date: Option<String>,
        /// Allow the model to analyze images in posts.
        #[serde(default)]
        enable_images: Option<bool>,
        /// Allow the model to analyze videos in posts.
        #[serde(default)]
        enable_video: Option<bool>,
    }

    fn x_filters(
        allowed: Option<Vec<String>>,
        excluded: Option<Vec<String>>,
        from_date: Option<String>,
        to_date: Option<String>,
        images: Option<bool>,
        video: Option<bool>,
    ) -> XFilters {
        XFilters {
            allowed_handles: allowed.unwrap_or_default(),
            excluded_handles: excluded.unwrap_or_default(),
            from_date,
            to_date,
            enable_image_understanding: images.unwrap_or(false),
            enable_video_understanding: video.unwrap_or(false),
        }
    }

    impl ConversationArgs {
        fn into_call(self) -> Call {
            Call {
                query: self.query,
                response_id: self.response_id,
                max_tokens: self.max_tokens,
                ..Default::default()
            }
        }
    }

    fn text_result(text: String) -> CallToolResult {
        CallToolResult::success(vec![Content::text(text)])
    }

    #[derive(Clone)]
    pub(crate) struct GrokMcp {
        tool_router: RmcpToolRouter<Self>,
        backend: Arc<dyn ResponsesBackend>,
    }

    #[tool_router]
    impl GrokMcp {
        pub(crate) fn new() -> Result<Self, McpError> {
            let http = grokpipe_local::http_client()
                .map_err(|e| McpError::internal_error(e.to_string(), None))?;
            let client =
                XaiClient::from_env(http).map_err(|e| McpError::internal_error(e.to_string(), None))?;
            Ok(Self::with_backend(Arc::new(client)))
        }

        pub(crate) fn with_backend(backend: Arc<dyn ResponsesBackend>) -> Self {
            Self {
                tool_router: Self::tool_router(),
                backend,
            }
        }

        async fn dispatch(&self, op: Operation, call: Call) -> Result<CallToolResult, McpError> {
            if call.query.trim().is_empty() {
                return Ok(text_result("Error: query must be non-empty".to_string()));
            }
            tracing::debug!(tool = op.name(), continued = call.response_id.is_some(), "tool call");
            let text = run_operation(self.backend.as_ref(), op, call).await;
            Ok(text_result(text))
        }

        #[tool(
            description = "Quick web search using Grok. Returns structured results (title, URL, snippet) followed by sources."
        )]
        async fn search(
            &self,
            params: Parameters<Option<SearchArgs>>,
        ) -> Result<CallToolResult, McpError> {
            let args = params.0.unwrap_or_default();
            let call = Call {
                query: args.query,
                max_results: args.max_results,
                ..Default::default()
            };
            self.dispatch(Operation::Search, call).await
        }

        #[tool(
            description = "Grounded answer from Grok with web search. Pass response_id from a previous response to follow up."
        )]
        async fn ask(
            &self,
            params: Parameters<Option<ConversationArgs>>,
        ) -> Result<CallToolResult, McpError> {
            let args = params.0.unwrap_or_default();
            self.dispatch(Operation::Ask, args.into_call()).await
        }

        #[tool(
            description = "Deep step-by-step reasoning with web grounding (reasoning model; slower). Pass response_id to follow up."
        )]
        async fn think(
            &self,
            params: Parameters<Option<ConversationArgs>>,
        ) -> Result<CallToolResult, McpError> {
            let args = params.0.unwrap_or_default();
            self.dispatch(Operation::Think, args.into_call()).await
        }

        #[tool(description = "Chat with Grok without any search. Pass response_id to continue.")]
        async fn chat(
            &self,
            params: Parameters<Option<ConversationArgs>>,
        ) -> Result<CallToolResult, McpError> {
            let args = params.0.unwrap_or_default();
            self.dispatch(Operation::Chat, args.into_call()).await
        }

        #[tool(
            description = "Search X (Twitter) posts using Grok. Returns structured results (author, post, URL) with optional handle/date filters."
        )]
        async fn x_search(
            &self,
            params: Parameters<Option<XSearchArgs>>,
        ) -> Result<CallToolResult, McpError> {
            let a = params.0.unwrap_or_default();
            let call = Call {
                query: a.query,
                max_results: a.max_results,
                x_filters: x_filters(
                    a.allowed_handles,
                    a.excluded_handles,
                    a.from_date,
                    a.to_date,
                    a.enable_images,
                    a.enable_video,
                ),
                ..Default::default()
            };
            self.dispatch(Operation::XSearch, call).await
        }

        #[tool(
            description = "Grounded answer from Grok using X (Twitter) posts as sources. Pass response_id to follow up."
        )]
        async fn x_ask(
            &self,
            params: Parameters<Option<XAskArgs>>,
        ) -> Result<CallToolResult, McpError> {
            let a = params.0.unwrap_or_default();
            let call = Call {
                query: a.query,
                response_id: a.response_id,
                max_tokens: a.max_tokens,
                x_filters: x_filters(
                    a.allowed_handles,
                    a.excluded_handles,
                    a.from_date,
                    a.to_date,
                    a.enable_images,
                    a.enable_video,
                ),
                ..Default::default()
            };
            self.dispatch(Operation::XAsk, call).await
        }
    }

    #[tool_handler]
    impl rmcp::ServerHandler for GrokMcp {
        fn get_info(&self) -> ServerInfo {
            ServerInfo {
                instructions: Some(
                    "Grok (xAI) with web and X search grounding. Results end with a response_id; pass it back to continue a conversation."
                        .to_string(),
                ),
                capabilities: ServerCapabilities::builder().enable_tools().build(),
                ..Default::default()
            }
        }
    }

    pub(crate) async fn serve_stdio() -> Result<(), McpError> {
        // Fails before serving when the API key is missing.
        let svc = GrokMcp::new()?;
        let running = svc
            .serve(stdio())
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        // Keep the stdio server alive until the client closes.
        running
            .waiting()
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(())
    }

}

#[tokio::main]
async fn main() -> Result<()> {
    // Env files are read before logging is configured so GROKPIPE_LOG may live in them.
    let env_loads = grokpipe_local::env::load_startup_env();
    logging::init();
    for l in &env_loads {
        l.log();
    }

    let cli = Cli::parse();
    let output = cli.output;

    if let Some((op, call)) = cli.shorthand() {
        return run_cli(op, call, output).await;
    }

    let Some(command) = cli.command else {
        eprintln!("No command or query provided. Use --help for usage.");
        std::process::exit(1);
    };

    match command {
        #[cfg(feature = "stdio")]
        Commands::McpStdio => {
            mcp::serve_stdio()
                .await
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        }
        #[cfg(not(feature = "stdio"))]
        Commands::McpStdio => {
            anyhow::bail!("mcp-stdio requires feature `stdio` (rebuild with: --features stdio)");
        }
        Commands::Doctor => doctor(output)?,
        Commands::Version => {
            let v = serde_json::json!({
                "schema_version": envelope::SCHEMA_VERSION,
                "kind": "version",
                "ok": true,
                "name": "grokpipe",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match output {
                OutputFormat::Text => println!("grokpipe {}", env!("CARGO_PKG_VERSION")),
                OutputFormat::Json => println!("{v}"),
            }
        }
        other => {
            if let Some((op, call)) = other.into_operation() {
                run_cli(op, call, output).await?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorthand_flags_pick_first_operation_and_share_filters() {
        let cli = Cli::try_parse_from([
            "grokpipe",
            "--x-ask",
            "what are people saying?",
            "-r",
            "resp_1",
            "--allowed-handles",
            "a,b,c",
            "--enable-video",
        ])
        .unwrap();
        let (op, call) = cli.shorthand().unwrap();
        assert_eq!(op, Operation::XAsk);
        assert_eq!(call.query, "what are people saying?");
        assert_eq!(call.response_id.as_deref(), Some("resp_1"));
        assert_eq!(call.x_filters.allowed_handles, vec!["a", "b", "c"]);
        assert!(call.x_filters.enable_video_understanding);
        assert!(!call.x_filters.enable_image_understanding);
    }

    #[test]
    fn subcommands_map_to_operations() {
        let cli = Cli::try_parse_from(["grokpipe", "think", "why?", "-r", "resp_2", "--max-tokens", "100"])
            .unwrap();
        assert!(cli.shorthand().is_none());
        let (op, call) = cli.command.unwrap().into_operation().unwrap();
        assert_eq!(op, Operation::Think);
        assert_eq!(call.response_id.as_deref(), Some("resp_2"));
        assert_eq!(call.max_tokens, Some(100));

        let cli = Cli::try_parse_from([
            "grokpipe",
            "x-search",
            "rust",
            "--max-results",
            "3",
            "--excluded-handles",
            "spam",
            "--from-date",
            "2025-01-01",
            "--output",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        let (op, call) = cli.command.unwrap().into_operation().unwrap();
        assert_eq!(op, Operation::XSearch);
        assert_eq!(call.max_results, Some(3));
        assert_eq!(call.x_filters.excluded_handles, vec!["spam"]);
        assert_eq!(call.x_filters.from_date.as_deref(), Some("2025-01-01"));

        let cli = Cli::try_parse_from(["grokpipe", "search", "q"]).unwrap();
        let (_, call) = cli.command.unwrap().into_operation().unwrap();
        assert_eq!(call.max_results, Some(10));
    }

    #[test]
    fn blank_cli_response_id_and_dates_are_not_sent() {
        let cli = Cli::try_parse_from([
            "grokpipe",
            "x-ask",
            "q",
            "-r",
            "",
            "--from-date",
            " ",
            "--to-date",
            "2025-01-15",
        ])
        .unwrap();
        let (op, call) = cli.command.unwrap().into_operation().unwrap();
        let req = grokpipe_core::build(&op.request_spec(call), &grokpipe_core::ModelIds::default());
        let v = serde_json::to_value(&req).unwrap();
        assert!(v.get("previous_response_id").is_none());
        assert!(v["tools"][0].get("from_date").is_none());
        assert_eq!(v["tools"][0]["to_date"], "2025-01-15");

        let cli = Cli::try_parse_from(["grokpipe", "--ask", "q", "-r", "  "]).unwrap();
        let (op, call) = cli.shorthand().unwrap();
        assert_eq!(op.request_spec(call).continuation_id, None);
    }

    #[test]
    fn non_operation_commands_have_no_operation() {
        let cli = Cli::try_parse_from(["grokpipe", "version"]).unwrap();
        assert!(cli.command.unwrap().into_operation().is_none());
    }
}
