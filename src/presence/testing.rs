//! Recording presence client used by the session manager tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::traits::{ActivityPayload, PresenceConnection, PresenceConnector};
use crate::error::ClientError;

#[derive(Default)]
struct Recorded {
    client_ids: Mutex<Vec<String>>,
    updates: Mutex<Vec<ActivityPayload>>,
    update_attempts: AtomicUsize,
    clears: AtomicUsize,
    closes: AtomicUsize,
    fail_connect: AtomicBool,
    fail_update: AtomicBool,
    fail_clear: AtomicBool,
    hang: AtomicBool,
}

impl Recorded {
    /// Never resolves while hanging is switched on
    async fn maybe_hang(&self) {
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }
}

/// Connector whose connections record every call into shared counters
#[derive(Clone, Default)]
pub struct RecordingConnector {
    recorded: Arc<Recorded>,
}

impl RecordingConnector {
    pub fn fail_connects(&self, fail: bool) {
        self.recorded.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.recorded.fail_update.store(fail, Ordering::SeqCst);
    }

    pub fn fail_clears(&self, fail: bool) {
        self.recorded.fail_clear.store(fail, Ordering::SeqCst);
    }

    /// Make every call block forever, like an unresponsive service
    pub fn hang(&self, hang: bool) {
        self.recorded.hang.store(hang, Ordering::SeqCst);
    }

    pub fn connect_calls(&self) -> usize {
        self.recorded.client_ids.lock().len()
    }

    pub fn client_ids(&self) -> Vec<String> {
        self.recorded.client_ids.lock().clone()
    }

    /// Successfully delivered payloads
    pub fn updates(&self) -> Vec<ActivityPayload> {
        self.recorded.updates.lock().clone()
    }

    pub fn update_attempts(&self) -> usize {
        self.recorded.update_attempts.load(Ordering::SeqCst)
    }

    pub fn clear_calls(&self) -> usize {
        self.recorded.clears.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.recorded.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PresenceConnector for RecordingConnector {
    fn name(&self) -> &'static str {
        "Recording"
    }

    async fn connect(&self, client_id: &str) -> Result<Box<dyn PresenceConnection>, ClientError> {
        self.recorded.client_ids.lock().push(client_id.to_string());
        self.recorded.maybe_hang().await;

        if self.recorded.fail_connect.load(Ordering::SeqCst) {
            return Err(ClientError::Unavailable("no host process".to_string()));
        }

        Ok(Box::new(RecordingConnection {
            recorded: self.recorded.clone(),
        }))
    }
}

struct RecordingConnection {
    recorded: Arc<Recorded>,
}

#[async_trait]
impl PresenceConnection for RecordingConnection {
    async fn update(&mut self, payload: &ActivityPayload) -> Result<(), ClientError> {
        self.recorded.update_attempts.fetch_add(1, Ordering::SeqCst);
        self.recorded.maybe_hang().await;

        if self.recorded.fail_update.load(Ordering::SeqCst) {
            return Err(ClientError::Request("pipe closed".to_string()));
        }

        self.recorded.updates.lock().push(payload.clone());
        Ok(())
    }

    async fn clear(&mut self) -> Result<(), ClientError> {
        self.recorded.clears.fetch_add(1, Ordering::SeqCst);
        self.recorded.maybe_hang().await;

        if self.recorded.fail_clear.load(Ordering::SeqCst) {
            return Err(ClientError::Request("pipe closed".to_string()));
        }
        Ok(())
    }

    async fn close(self: Box<Self>) {
        self.recorded.closes.fetch_add(1, Ordering::SeqCst);
        self.recorded.maybe_hang().await;
    }
}
