//! In-memory traversal fakes shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use async_trait::async_trait;
use parking_lot::Mutex;
use crate::common::error::{Result, WorkbenchError};
use crate::common::value::RawElement;
use crate::traversal::client::{Credentials, TraversalConnection, TraversalConnector};

/// Canned reply for one submitted query
pub enum Scripted {
    Rows(Vec<RawElement>),
    Fail(String),
}

#[derive(Default)]
struct FakeState {
    opens: AtomicUsize,
    closes: AtomicUsize,
    fail_close: AtomicBool,
    queries: Mutex<Vec<String>>,
    replies: Mutex<VecDeque<Scripted>>,
}

/// Connector whose connections answer from a shared script.
/// Unscripted queries return no rows.
#[derive(Clone, Default)]
pub struct FakeConnector {
    state: Arc<FakeState>,
}

impl FakeConnector {
    pub fn new(replies: Vec<Scripted>) -> Self {
        let connector = FakeConnector::default();
        connector.state.replies.lock().extend(replies);
        connector
    }

    /// Make every `close` report an error
    pub fn fail_on_close(&self) {
        self.state.fail_close.store(true, Ordering::SeqCst);
    }

    pub fn opens(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.state.queries.lock().clone()
    }
}

#[async_trait]
impl TraversalConnector for FakeConnector {
    async fn open(&self, _server: &str, _credentials: Credentials) -> Result<Box<dyn TraversalConnection>> {
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeConnection {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeConnection {
    state: Arc<FakeState>,
}

#[async_trait]
impl TraversalConnection for FakeConnection {
    async fn submit(&self, query: &str) -> Result<Vec<RawElement>> {
        self.state.queries.lock().push(query.to_string());
        match self.state.replies.lock().pop_front() {
            Some(Scripted::Rows(rows)) => Ok(rows),
            Some(Scripted::Fail(message)) => Err(WorkbenchError::query(message)),
            None => Ok(Vec::new()),
        }
    }

    async fn close(&self) -> Result<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_close.load(Ordering::SeqCst) {
            return Err(WorkbenchError::query("connection already reset"));
        }
        Ok(())
    }
}
