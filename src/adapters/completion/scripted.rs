//! Offline completion client replaying canned responses.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::domain::ports::{
    CompletionClient, CompletionError, CompletionRequest, CompletionResponse, RequestKind,
};

type Scripted = Result<String, CompletionError>;

/// Replays responses per [`RequestKind`] in order; the last one for a kind
/// repeats once the queue is down to it. Every request is recorded.
///
/// A kind with nothing scripted fails as unavailable.
#[derive(Default)]
pub struct ScriptedCompletionClient {
    queues: Mutex<HashMap<RequestKind, VecDeque<Scripted>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletionClient {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_response(self, kind: RequestKind, content: impl Into<String>) -> Self {
        self.push(kind, Ok(content.into()));
        self
    }

    #[must_use]
    pub fn with_failure(self, kind: RequestKind, error: CompletionError) -> Self {
        self.push(kind, Err(error));
        self
    }

    pub fn push(&self, kind: RequestKind, response: Scripted) {
        if let Ok(mut queues) = self.queues.lock() {
            queues.entry(kind).or_default().push_back(response);
        }
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn requests_of(&self, kind: RequestKind) -> Vec<CompletionRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.kind == kind)
            .collect()
    }

    fn next(&self, kind: RequestKind) -> Scripted {
        let mut queues = self
            .queues
            .lock()
            .map_err(|_| CompletionError::Unavailable("script lock poisoned".to_string()))?;
        let queue = queues
            .get_mut(&kind)
            .filter(|queue| !queue.is_empty())
            .ok_or_else(|| {
                CompletionError::Unavailable(format!("no scripted response for {}", kind.as_str()))
            })?;

        if queue.len() > 1 {
            queue
                .pop_front()
                .unwrap_or_else(|| Err(CompletionError::Unavailable("empty script".to_string())))
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(CompletionError::Unavailable("empty script".to_string())))
        }
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletionClient {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, CompletionError> {
        let kind = request.kind;
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        self.next(kind).map(|content| CompletionResponse { content })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_then_repeat_last() {
        let client = ScriptedCompletionClient::new()
            .with_response(RequestKind::Analysis, "first")
            .with_response(RequestKind::Analysis, "second");

        let mut seen = Vec::new();
        for _ in 0..3 {
            let response = client
                .complete(CompletionRequest::json(RequestKind::Analysis, "s"))
                .await
                .unwrap();
            seen.push(response.content);
        }
        assert_eq!(seen, vec!["first", "second", "second"]);
        assert_eq!(client.requests_of(RequestKind::Analysis).len(), 3);
    }

    #[tokio::test]
    async fn test_unscripted_kind_is_unavailable() {
        let client = ScriptedCompletionClient::new();
        let err = client
            .complete(CompletionRequest::text(RequestKind::Report, "s"))
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(client.requests().len(), 1);
    }
}
