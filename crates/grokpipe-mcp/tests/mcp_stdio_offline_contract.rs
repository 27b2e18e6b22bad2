use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

fn text_of(r: &rmcp::model::CallToolResult) -> String {
    r.content
        .get(0)
        .and_then(|c| c.as_text())
        .map(|t| t.text.clone())
        .unwrap_or_default()
}

#[test]
fn grokpipe_mcp_stdio_offline_contract() {
    // Spawns the real binary over stdio, pointed at a local stub of the responses endpoint.
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    rt.block_on(async {
        use axum::{extract::State, routing::post, Json, Router};
        use rmcp::{
            model::CallToolRequestParam,
            service::ServiceExt,
            transport::{ConfigureCommandExt, TokioChildProcess},
        };
        use std::net::SocketAddr;

        type Seen = Arc<Mutex<Vec<serde_json::Value>>>;
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(
                "/v1/responses",
                post(
                    |State(seen): State<Seen>, Json(body): Json<serde_json::Value>| async move {
                        seen.lock().unwrap().push(body);
                        Json(serde_json::json!({
                            "id": "resp_mcp",
                            "status": "completed",
                            "output": [
                                { "type": "web_search_call" },
                                { "type": "web_search_result", "results": [
                                    { "url": "https://rust-lang.org", "title": "Rust" },
                                    { "url": "https://blog.rust-lang.org" }
                                ]},
                                { "type": "message", "content": [
                                    { "type": "output_text", "text": "Rust is a language." }
                                ]}
                            ]
                        }))
                    },
                ),
            )
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("axum serve");
        });

        let bin = assert_cmd::cargo::cargo_bin!("grokpipe");
        let service = ()
            .serve(TokioChildProcess::new(
                tokio::process::Command::new(bin).configure(|cmd| {
                    cmd.args(["mcp-stdio"]);
                    cmd.env("GROKPIPE_DOTENV", "0");
                    cmd.env_remove("GROKPIPE_ENV_FILE");
                    cmd.env_remove("GROKPIPE_XAI_API_KEY");
                    cmd.env("XAI_API_KEY", "test-key");
                    cmd.env("GROKPIPE_XAI_ENDPOINT", format!("http://{addr}/v1/responses"));
                }),
            )?)
            .await?;

        let tools = service.list_tools(Default::default()).await?;
        let names: BTreeSet<String> = tools
            .tools
            .iter()
            .map(|t| t.name.clone().into_owned())
            .collect();
        let expected: BTreeSet<String> = ["search", "ask", "think", "chat", "x_search", "x_ask"]
            .into_iter()
            .map(str::to_string)
            .collect();
        assert_eq!(names, expected);

        // ask: rendered answer, numbered sources, follow-up line.
        let ask = service
            .call_tool(CallToolRequestParam {
                name: "ask".into(),
                arguments: Some(
                    serde_json::json!({ "query": "what is rust?", "max_tokens": 100 })
                        .as_object()
                        .cloned()
                        .unwrap(),
                ),
            })
            .await?;
        assert_eq!(
            text_of(&ask),
            "Rust is a language.\n\nSources:\n1. [Rust](https://rust-lang.org)\n2. [Web Result](https://blog.rust-lang.org)\n\n---\nTo follow up, use response_id: resp_mcp"
        );

        // x_search: handle lists are capped before they reach the provider.
        let handles: Vec<String> = (0..15).map(|i| format!("user{i}")).collect();
        service
            .call_tool(CallToolRequestParam {
                name: "x_search".into(),
                arguments: Some(
                    serde_json::json!({
                        "query": "rust",
                        "excluded_handles": handles,
                        "to_date": "2025-02-01"
                    })
                    .as_object()
                    .cloned()
                    .unwrap(),
                ),
            })
            .await?;

        // Empty query: error text, no provider call.
        let empty = service
            .call_tool(CallToolRequestParam {
                name: "chat".into(),
                arguments: Some(
                    serde_json::json!({ "query": "" })
                        .as_object()
                        .cloned()
                        .unwrap(),
                ),
            })
            .await?;
        assert_eq!(text_of(&empty), "Error: query must be non-empty");

        {
            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 2);
            assert_eq!(seen[0]["max_output_tokens"], 100);
            assert_eq!(seen[0]["store"], true);
            let x_tool = &seen[1]["tools"][0];
            assert_eq!(x_tool["type"], "x_search");
            assert_eq!(x_tool["excluded_x_handles"].as_array().map(Vec::len), Some(10));
            assert_eq!(x_tool["to_date"], "2025-02-01");
            assert!(x_tool.get("allowed_x_handles").is_none());
        }

        service.cancel().await?;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
    .expect("mcp stdio offline contract");
}
