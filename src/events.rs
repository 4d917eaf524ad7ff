//! Structured risk-event extraction.
//!
//! Parses LLM output against the event wire schema and drives the bounded
//! retry loop around the completion call. The parser is field-defensive:
//! model output is not guaranteed to match the schema, so malformed entries
//! are logged and skipped rather than failing the whole extraction.
//!
//! Expected output shape:
//!
//! ```json
//! {"events": [
//!   {"event_name": "...", "risk_level": "高|中|低|high|medium|low",
//!    "key_action": "...", "page_ref": 3}
//! ]}
//! ```
//!
//! A missing `events` key is an empty result, not an error. A missing or
//! null `page_ref` stays `None`.

use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::completion::CompletionClient;
use crate::error::PipelineError;
use crate::models::{ChatMessage, ExtractedEvent, RiskLevel};
use crate::prompt::EXTRACTION_TEMPERATURE;

/// Total completion attempts before extraction gives up.
pub const EXTRACTION_ATTEMPTS: u32 = 3;

/// Structured output stayed unparseable after the retry budget.
///
/// Carries the last raw completion text so the offending output is never
/// discarded.
#[derive(Debug, Error)]
#[error("structured output invalid after {attempts} attempts: {detail}")]
pub struct SchemaError {
    pub attempts: u32,
    pub last_raw: String,
    pub detail: String,
}

/// Remove a markdown code fence wrapping, if present.
///
/// Models often wrap JSON in ` ```json ... ``` ` despite instructions not
/// to. Returns the inner lines when the trimmed input starts with a fence,
/// otherwise the trimmed input unchanged.
pub fn strip_code_fence(raw: &str) -> String {
    let trimmed = raw.trim();

    if trimmed.starts_with("```json") || trimmed.starts_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() > 2 {
            return lines[1..lines.len() - 1].join("\n");
        }
    }

    trimmed.to_string()
}

/// Parse completion output into events.
///
/// Returns `Err` with a parse description when the text is not JSON or
/// `events` is not an array; those are the failures the retry loop re-asks
/// for. Individually malformed entries are skipped with a warning.
pub fn parse_events(raw: &str) -> Result<Vec<ExtractedEvent>, String> {
    let stripped = strip_code_fence(raw);

    let value: serde_json::Value =
        serde_json::from_str(&stripped).map_err(|e| format!("not valid JSON: {e}"))?;

    let entries = match value.get("events") {
        None => return Ok(Vec::new()),
        Some(serde_json::Value::Array(entries)) => entries,
        Some(other) => {
            return Err(format!(
                "'events' is not an array (got {})",
                value_kind(other)
            ))
        }
    };

    let mut events = Vec::with_capacity(entries.len());

    for (position, entry) in entries.iter().enumerate() {
        let Some(event_name) = entry.get("event_name").and_then(|v| v.as_str()) else {
            warn!(position, "skipping event entry without event_name");
            continue;
        };

        let risk_raw = entry.get("risk_level").and_then(|v| v.as_str()).unwrap_or("");
        let Some(risk_level) = RiskLevel::parse(risk_raw) else {
            warn!(position, "skipping event entry with unrecognized risk_level");
            continue;
        };

        let key_action = entry
            .get("key_action")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        let page_ref = entry
            .get("page_ref")
            .and_then(|v| v.as_u64())
            .and_then(|p| u32::try_from(p).ok());

        events.push(ExtractedEvent {
            event_name: event_name.to_string(),
            risk_level,
            key_action,
            page_ref,
        });
    }

    Ok(events)
}

fn value_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Run the completion call with the extraction retry budget.
///
/// Parse failures re-ask immediately with the same messages; transport
/// failures back off (1s, 2s) first. Every failure counts against the same
/// budget of [`EXTRACTION_ATTEMPTS`]. The surfaced error keeps the kind of
/// the final failure: [`SchemaError`] with the last raw text for a parse
/// failure, the completion error itself for transport.
pub async fn extract_with_retry(
    client: &dyn CompletionClient,
    messages: &[ChatMessage],
) -> Result<Vec<ExtractedEvent>, PipelineError> {
    let mut last_parse: Option<(String, String)> = None;

    for attempt in 1..=EXTRACTION_ATTEMPTS {
        match client.complete(messages, Some(EXTRACTION_TEMPERATURE)).await {
            Ok(raw) => match parse_events(&raw) {
                Ok(events) => {
                    debug!(attempt, events = events.len(), "extraction output parsed");
                    return Ok(events);
                }
                Err(detail) => {
                    warn!(attempt, error = %detail, chars = raw.len(), "extraction output failed to parse");
                    last_parse = Some((raw, detail));
                }
            },
            Err(err) => {
                if attempt == EXTRACTION_ATTEMPTS {
                    return Err(err.into());
                }
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                warn!(attempt, error = %err, delay_secs = delay.as_secs(), "completion failed during extraction");
                tokio::time::sleep(delay).await;
            }
        }
    }

    // The final attempt either returned above or recorded a parse failure.
    let (last_raw, detail) = last_parse.unwrap_or_default();
    Err(SchemaError {
        attempts: EXTRACTION_ATTEMPTS,
        last_raw,
        detail,
    }
    .into())
}
