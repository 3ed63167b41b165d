//! Response collaborator used when store failures are handled in place.

use crate::model::context::RequestContext;
use log::warn;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Generic error responses a service may short-circuit a request with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InternalServerError,
}

impl ErrorCode {
    /// Stable wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn http_status(self) -> u16 {
        match self {
            Self::InternalServerError => 500,
        }
    }
}

/// Answers a request with a generic error.
pub trait ErrorResponder: Send + Sync {
    fn error(&self, request: &RequestContext, code: ErrorCode);
}

impl<T: ErrorResponder + ?Sized> ErrorResponder for Arc<T> {
    fn error(&self, request: &RequestContext, code: ErrorCode) {
        (**self).error(request, code);
    }
}

/// Error response written for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorResponse {
    pub request_id: Uuid,
    pub code: ErrorCode,
}

/// Keeps the error response per request, first write wins.
#[derive(Debug, Default)]
pub struct ResponseRecorder {
    responses: Mutex<Vec<ErrorResponse>>,
}

impl ResponseRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn responses(&self) -> Vec<ErrorResponse> {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn response_for(&self, request_id: Uuid) -> Option<ErrorCode> {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|response| response.request_id == request_id)
            .map(|response| response.code)
    }
}

impl ErrorResponder for ResponseRecorder {
    fn error(&self, request: &RequestContext, code: ErrorCode) {
        let mut responses = self.responses.lock().unwrap_or_else(PoisonError::into_inner);
        if responses
            .iter()
            .any(|response| response.request_id == request.request_id)
        {
            warn!(
                "event=response_error module=service status=skipped request_id={} code={}",
                request.request_id,
                code.as_str()
            );
            return;
        }
        responses.push(ErrorResponse {
            request_id: request.request_id,
            code,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorCode, ErrorResponder, ResponseRecorder};
    use crate::model::context::RequestContext;

    #[test]
    fn internal_error_has_stable_name_and_status() {
        assert_eq!(ErrorCode::InternalServerError.as_str(), "INTERNAL_SERVER_ERROR");
        assert_eq!(ErrorCode::InternalServerError.http_status(), 500);
    }

    #[test]
    fn recorder_keeps_first_response_per_request() {
        let recorder = ResponseRecorder::new();
        let ctx = RequestContext::anonymous();
        recorder.error(&ctx, ErrorCode::InternalServerError);
        recorder.error(&ctx, ErrorCode::InternalServerError);

        assert_eq!(recorder.responses().len(), 1);
        assert_eq!(
            recorder.response_for(ctx.request_id),
            Some(ErrorCode::InternalServerError)
        );
        assert_eq!(
            recorder.response_for(RequestContext::anonymous().request_id),
            None
        );
    }
}
