//! Activity log collaborator for CRUD invocations and outcomes.

use super::sanitize_message;
use log::{error, info};
use serde_json::Value;
use std::sync::Arc;

const MAX_PAYLOAD_CHARS: usize = 512;

/// Fire-and-forget sink for `<schema>.<operation>` records.
pub trait ActivityLog: Send + Sync {
    fn info(&self, tag: &str, payload: &Value);
    fn error(&self, tag: &str, payload: &Value);
}

impl<T: ActivityLog + ?Sized> ActivityLog for Arc<T> {
    fn info(&self, tag: &str, payload: &Value) {
        (**self).info(tag, payload);
    }

    fn error(&self, tag: &str, payload: &Value) {
        (**self).error(tag, payload);
    }
}

/// Writes activity through the `log` facade as single-line key/value events.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreActivityLog;

impl ActivityLog for CoreActivityLog {
    fn info(&self, tag: &str, payload: &Value) {
        info!(
            "event=crud module=service status=ok tag={} payload={}",
            tag,
            sanitize_message(&payload.to_string(), MAX_PAYLOAD_CHARS)
        );
    }

    fn error(&self, tag: &str, payload: &Value) {
        error!(
            "event=crud module=service status=error tag={} payload={}",
            tag,
            sanitize_message(&payload.to_string(), MAX_PAYLOAD_CHARS)
        );
    }
}
