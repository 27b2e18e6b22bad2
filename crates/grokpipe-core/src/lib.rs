pub mod ops;
pub mod render;
pub mod request;
pub mod response;

pub use ops::{Call, Operation};
pub use render::render;
pub use request::{build, Input, Message, ModelIds, RequestSpec, Tool, WireRequest, XFilters};
pub use response::{parse, NormalizedResult, Source, WireResponse};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Provider answered with a non-2xx status.
    #[error("API error: {status} - {body}")]
    Api { status: u16, body: String },
    /// Network, timeout, or body-decoding failure.
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
}

impl Error {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// One request/response exchange with the provider.
#[async_trait::async_trait]
pub trait ResponsesBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn models(&self) -> &ModelIds;
    async fn create_response(&self, req: &WireRequest) -> Result<WireResponse>;
}

/// Build, send, normalize. Transport failures become a failed result, never an `Err`.
pub async fn execute(backend: &dyn ResponsesBackend, spec: &RequestSpec) -> NormalizedResult {
    let req = build(spec, backend.models());
    match backend.create_response(&req).await {
        Ok(wire) => parse(wire),
        Err(e) => {
            tracing::warn!(backend = backend.name(), status = ?e.status(), "request failed");
            NormalizedResult::failed(e.to_string())
        }
    }
}

/// [`execute`] followed by [`render`].
pub async fn run_operation(backend: &dyn ResponsesBackend, op: Operation, call: Call) -> String {
    let spec = op.request_spec(call);
    render(&execute(backend, &spec).await)
}
