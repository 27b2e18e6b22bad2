use crate::response::NormalizedResult;

/// Human-readable text for a tool result.
pub fn render(result: &NormalizedResult) -> String {
    if let Some(e) = &result.error {
        return format!("Error: {e}");
    }

    let mut out = vec![result.text.clone()];

    if !result.sources.is_empty() {
        out.push("\nSources:".to_string());
        for (i, s) in result.sources.iter().enumerate() {
            out.push(format!("{}. [{}]({})", i + 1, s.title, s.url));
        }
    }

    if let Some(id) = &result.id {
        out.push("\n---".to_string());
        out.push(format!("To follow up, use response_id: {id}"));
    }

    out.join("\n")
}
