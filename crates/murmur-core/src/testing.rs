//! In-memory connection used by unit tests.

use crate::connection::{Connection, ConnectionId, ConnectionRef, SendError};
use async_trait::async_trait;
use murmur_protocol::Payload;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Records every frame sent to it.
pub(crate) struct MockConnection {
    id: ConnectionId,
    sent: Mutex<Vec<Payload>>,
    closed: AtomicBool,
    failing: AtomicBool,
}

impl MockConnection {
    pub(crate) fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: ConnectionId::new(id),
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            failing: AtomicBool::new(false),
        })
    }

    pub(crate) fn handle(self: &Arc<Self>) -> ConnectionRef {
        self.clone()
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Make every subsequent send fail without closing.
    pub(crate) fn fail_sends(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Drain the recorded frames.
    pub(crate) fn take(&self) -> Vec<Payload> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    /// Drain the recorded frames as strings. Binary frames are decoded as UTF-8.
    pub(crate) fn take_text(&self) -> Vec<String> {
        self.take()
            .into_iter()
            .map(|payload| match payload {
                Payload::Text(text) => text,
                Payload::Binary(data) => String::from_utf8(data.to_vec()).unwrap(),
            })
            .collect()
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    async fn send(&self, payload: Payload) -> Result<(), SendError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SendError::Failed("mock failure".to_string()));
        }
        self.sent.lock().unwrap().push(payload);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Render a reply the way it appears on the wire.
pub(crate) fn wire(reply: murmur_protocol::Reply) -> String {
    reply.to_string()
}
