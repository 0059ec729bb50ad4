//! Best-effort extraction of structured facts from free-form user text.
//!
//! The model is asked for a JSON array or object; its output is parsed with
//! `serde_json` into the exact expected shape. Anything else (prose, nested
//! values, numbers, a failed completion) yields an empty result. Model output
//! is never evaluated.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::llm::{Completion, CompletionClient};

use super::prompts::{
    dislikes_extraction_prompt, interests_extraction_prompt, lifestyle_extraction_prompt,
};
use super::state::Lifestyle;

/// Runs the three extraction tasks through a completion client.
#[derive(Clone)]
pub struct Extractor {
    client: CompletionClient,
}

impl Extractor {
    pub fn new(client: CompletionClient) -> Self {
        Self { client }
    }

    pub async fn interests(&self, text: &str) -> BTreeSet<String> {
        let raw = self.run("interests", &interests_extraction_prompt(text)).await;
        raw.map(|r| parse_string_list(&r)).unwrap_or_default()
    }

    pub async fn dislikes(&self, text: &str) -> BTreeSet<String> {
        let raw = self.run("dislikes", &dislikes_extraction_prompt(text)).await;
        raw.map(|r| parse_string_list(&r)).unwrap_or_default()
    }

    pub async fn lifestyle(&self, text: &str) -> Lifestyle {
        let raw = self.run("lifestyle", &lifestyle_extraction_prompt(text)).await;
        raw.map(|r| parse_lifestyle(&r)).unwrap_or_default()
    }

    async fn run(&self, task: &str, prompt: &str) -> Option<String> {
        match self.client.complete(prompt).await {
            Completion::Text(text) => {
                debug!(task, raw = %text, "Extraction output");
                Some(text)
            }
            Completion::Failed(failure) => {
                warn!(task, ?failure, "Extraction skipped, completion failed");
                None
            }
        }
    }
}

/// Parse a JSON array of strings. Entries are trimmed; empty ones dropped.
pub fn parse_string_list(raw: &str) -> BTreeSet<String> {
    let body = strip_code_fence(raw);
    match serde_json::from_str::<Vec<String>>(body) {
        Ok(items) => items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
        Err(e) => {
            warn!(error = %e, raw = %raw, "Model output is not a JSON string array");
            BTreeSet::new()
        }
    }
}

/// Parse a JSON object of lifestyle facts. Unknown keys are ignored; a
/// non-string value for a known key rejects the whole object.
pub fn parse_lifestyle(raw: &str) -> Lifestyle {
    let body = strip_code_fence(raw);
    let object = match serde_json::from_str::<Map<String, Value>>(body) {
        Ok(object) => object,
        Err(e) => {
            warn!(error = %e, raw = %raw, "Model output is not a JSON object");
            return Lifestyle::default();
        }
    };

    let field = |key: &str| -> Result<Option<String>, ()> {
        match object.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(v)) => {
                let v = v.trim();
                Ok((!v.is_empty()).then(|| v.to_string()))
            }
            Some(_) => Err(()),
        }
    };

    match (field("time_availability"), field("budget"), field("space")) {
        (Ok(time_availability), Ok(budget), Ok(space)) => Lifestyle {
            time_availability,
            budget,
            space,
        },
        _ => {
            warn!(raw = %raw, "Lifestyle object has non-string values");
            Lifestyle::default()
        }
    }
}

/// Unwrap a single Markdown code fence (```` ```json ... ``` ````) if present.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening line.
    match inner.split_once('\n') {
        Some((_, body)) => body.trim(),
        None => inner.trim(),
    }
}
