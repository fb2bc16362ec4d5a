//! Scripted selector for exercising the match loop in tests.

use crate::traits::{MoveSelector, SelectionRequest, SelectorError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// What the scripted selector does with one request.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    /// Return this index.
    Index(usize),
    /// Fail the attempt.
    Fail,
    /// Never resolve. Models a stalled provider.
    Hang,
}

/// A selector that replays queued replies and records every request.
///
/// Queued replies are consumed in order; once the queue is empty the
/// default reply repeats forever.
pub struct ScriptedSelector {
    replies: Mutex<VecDeque<Reply>>,
    default: Reply,
    calls: Arc<Mutex<Vec<SelectionRequest>>>,
}

impl ScriptedSelector {
    pub fn new(replies: Vec<Reply>, default: Reply) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            default,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A selector that always answers with the same index.
    pub fn always(index: usize) -> Self {
        Self::new(Vec::new(), Reply::Index(index))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Shared handle to the recorded requests.
    pub fn calls(&self) -> Arc<Mutex<Vec<SelectionRequest>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl MoveSelector for ScriptedSelector {
    async fn pick_move(&self, req: &SelectionRequest) -> Result<usize, SelectorError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(req.clone());
        }

        let reply = self
            .replies
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or(self.default);

        match reply {
            Reply::Index(index) => Ok(index),
            Reply::Fail => Err(SelectorError::BadReply("scripted failure".to_string())),
            Reply::Hang => std::future::pending().await,
        }
    }
}
