//! Scripted transport for unit tests.

use crate::error::{ClientError, Result};
use crate::transport::{ApiRequest, RawResponse, Transport};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Hands out canned responses in order and records every request.
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<RawResponse>>,
    repeat: Option<RawResponse>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(responses: Vec<RawResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Answers every request with the same response.
    pub(crate) fn repeating(response: RawResponse) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::new()),
            repeat: Some(response),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.responses.lock().unwrap().pop_front();
        next.or_else(|| self.repeat.clone()).ok_or_else(|| {
            ClientError::Protocol(format!(
                "no scripted response for {} {}",
                request.method, request.path
            ))
        })
    }
}

pub(crate) fn json_response(status: u16, body: &Value) -> RawResponse {
    RawResponse::new(status).with_json(body)
}
