//! Per-entry submission with a bounded retry on transport failures.
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::SyncSettings;
use crate::kind::{Complexity, EntryKind};
use crate::model::{Action, Entry, SubmissionResult};
use crate::publish::{PublishApi, PublishResponse};
use crate::shutdown::Shutdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total calls are `max_retries + 1`.
    pub max_retries: u32,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub simple: Duration,
    pub complex: Duration,
}

impl Timeouts {
    pub fn for_complexity(&self, complexity: Complexity) -> Duration {
        match complexity {
            Complexity::Simple => self.simple,
            Complexity::Complex => self.complex,
        }
    }
}

pub struct Submitter<'a> {
    api: &'a dyn PublishApi,
    kind: &'a EntryKind,
    retry: RetryPolicy,
    timeouts: Timeouts,
    shutdown: Shutdown,
}

impl<'a> Submitter<'a> {
    pub fn new(api: &'a dyn PublishApi, kind: &'a EntryKind, settings: &SyncSettings) -> Self {
        Self {
            api,
            kind,
            retry: RetryPolicy {
                max_retries: settings.max_retries,
                delay: settings.retry_delay(),
            },
            timeouts: Timeouts {
                simple: settings.simple_timeout(),
                complex: settings.complex_timeout(),
            },
            shutdown: Shutdown::new(),
        }
    }

    pub fn interruptible(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeouts.for_complexity(self.kind.complexity)
    }

    /// Submit one entry. Never fails: every outcome is captured in the result.
    pub async fn submit(&self, entry: &Entry, routing_key: Option<&str>) -> SubmissionResult {
        let path = self.kind.target_path(entry, routing_key);
        if routing_key.is_none() && self.kind.structured_path.is_some() {
            warn!(entry_id = %entry.id, %path, "no routing key, using legacy path");
        }
        let timeout = self.timeout();
        let mut result = SubmissionResult::pending(entry, &path);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            result.attempts = attempt;
            debug!(entry_id = %entry.id, %path, attempt, ?timeout, "submitting");

            match self.api.post(&path, timeout).await {
                Ok(response) => {
                    apply_response(&mut result, &response);
                    return result;
                }
                Err(err) if attempt > self.retry.max_retries => {
                    warn!(entry_id = %entry.id, attempts = attempt, error = %err, "retries exhausted");
                    result.error = Some(err.message);
                    result.retry_exhausted = true;
                    return result;
                }
                Err(err) => {
                    warn!(
                        entry_id = %entry.id,
                        error = %err,
                        timed_out = err.timed_out,
                        "request failed, retrying in {:?} (attempt {}/{})",
                        self.retry.delay,
                        attempt,
                        self.retry.max_retries
                    );
                    if !self.shutdown.sleep(self.retry.delay).await {
                        result.error = Some(format!("interrupted before retry: {}", err.message));
                        return result;
                    }
                }
            }
        }
    }
}

/// Fold a downstream response into `result`.
///
/// On 2xx the payload decides success; non-2xx is always a failure carrying the status.
pub fn apply_response(result: &mut SubmissionResult, response: &PublishResponse) {
    let payload: Option<Value> = serde_json::from_str(&response.body).ok();

    if !response.is_success() {
        result.success = false;
        result.http_status = Some(response.status);
        let json_error = payload.as_ref().map(|body| text_field(body, "error"));
        result.error = Some(match json_error {
            Some(Some(error)) => error,
            Some(None) => format!("HTTP {}", response.status),
            None if !response.body.trim().is_empty() => response.body.trim().to_string(),
            None => format!("HTTP {}", response.status),
        });
        result.message = payload.as_ref().and_then(|b| text_field(b, "message"));
        return;
    }

    let Some(body) = payload else {
        result.success = false;
        result.error = Some(format!(
            "publish server returned non-JSON body: {}",
            truncate(&response.body, 200)
        ));
        return;
    };

    result.success = body.get("success").and_then(Value::as_bool).unwrap_or(false);
    result.message = text_field(&body, "message");
    result.identifier = body
        .get("magento")
        .and_then(|m| scalar_text(m.get("identifier")))
        .or_else(|| scalar_text(body.get("identifier")));

    if result.success {
        result.action = body
            .get("action")
            .or_else(|| body.get("magento").and_then(|m| m.get("action")))
            .and_then(Value::as_str)
            .map(Action::from_label)
            .or_else(|| result.message.as_deref().map(action_from_message))
            .unwrap_or(Action::Unknown);
    } else {
        result.error = Some(
            text_field(&body, "error")
                .or_else(|| result.message.clone())
                .unwrap_or_else(|| "Unknown error".to_string()),
        );
    }
}

/// Read the action out of a message like "FAQ rendered and updated in Magento".
fn action_from_message(message: &str) -> Action {
    let lower = message.to_lowercase();
    if lower.contains("recreated") {
        Action::Recreated
    } else if lower.contains("created") {
        Action::Created
    } else if lower.contains("updated") {
        Action::Updated
    } else {
        Action::Unknown
    }
}

fn text_field(body: &Value, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
