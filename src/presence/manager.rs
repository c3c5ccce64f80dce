//! Owns the presence connection and keeps the displayed activity refreshed

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::fields::SharedFields;
use super::traits::{ActivityPayload, PresenceConnection, PresenceConnector};
use crate::error::{ClientError, SessionError};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub refresh_interval: Duration,
    /// Upper bound for every call into the presence client
    pub call_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// What the status indicator should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Disconnected,
    Connected,
    ConnectFailed,
    /// An update failed after a successful connect
    Lost,
    Closed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionStatus::Disconnected | SessionStatus::Lost => "Disconnected",
            SessionStatus::Connected => "Connected",
            SessionStatus::ConnectFailed => "Failed to connect",
            SessionStatus::Closed => "Closed",
        };
        f.write_str(label)
    }
}

#[derive(Default)]
struct Session {
    connection: Option<Box<dyn PresenceConnection>>,
    started_at: Option<DateTime<Utc>>,
    closed: bool,
}

/// Manages the connection to the presence service and the refresh task
pub struct SessionManager {
    connector: Arc<dyn PresenceConnector>,
    fields: SharedFields,
    config: SessionConfig,
    session: Mutex<Session>,
    status_tx: watch::Sender<SessionStatus>,
    stop_tx: watch::Sender<bool>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    pub fn new(
        connector: Arc<dyn PresenceConnector>,
        fields: SharedFields,
        config: SessionConfig,
    ) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::Disconnected);
        let (stop_tx, _) = watch::channel(false);

        Self {
            connector,
            fields,
            config,
            session: Mutex::new(Session::default()),
            status_tx,
            stop_tx,
            refresh_task: Mutex::new(None),
        }
    }

    pub fn fields(&self) -> &SharedFields {
        &self.fields
    }

    pub fn status(&self) -> SessionStatus {
        *self.status_tx.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.connection.is_some()
    }

    /// When the current session was started, if one was ever started
    pub async fn started_at(&self) -> Option<DateTime<Utc>> {
        self.session.lock().await.started_at
    }

    /// Open a connection using the current client id.
    ///
    /// Any live connection is torn down first. Returns the session start time.
    pub async fn connect(&self) -> Result<DateTime<Utc>, SessionError> {
        let fields = self.fields.snapshot();
        let client_id = fields.client_id().ok_or(SessionError::MissingClientId)?;

        let mut session = self.session.lock().await;
        if session.closed {
            return Err(SessionError::Closed);
        }

        if let Some(previous) = session.connection.take() {
            tracing::info!("Closing previous {} connection", self.connector.name());
            self.teardown(previous).await;
        }

        tracing::info!("{} connecting...", self.connector.name());

        let connection =
            match with_timeout(self.config.call_timeout, self.connector.connect(client_id)).await {
                Ok(connection) => connection,
                Err(e) => {
                    tracing::warn!("{} connection failed: {}", self.connector.name(), e);
                    self.set_status(SessionStatus::ConnectFailed);
                    return Err(SessionError::ConnectionFailed(e.to_string()));
                }
            };

        // Wall clock can step backwards; keep start times non-decreasing
        let now = Utc::now();
        let started_at = session.started_at.map_or(now, |previous| previous.max(now));

        session.connection = Some(connection);
        session.started_at = Some(started_at);
        self.set_status(SessionStatus::Connected);

        tracing::info!("{} Rich Presence connected", self.connector.name());
        Ok(started_at)
    }

    /// Connect and push the current fields once
    pub async fn start(&self) -> Result<(), SessionError> {
        self.connect().await?;
        self.push_update().await
    }

    /// Push the current field values to the presence service
    pub async fn push_update(&self) -> Result<(), SessionError> {
        let mut session = self.session.lock().await;
        self.push_locked(&mut session).await
    }

    async fn push_locked(&self, session: &mut Session) -> Result<(), SessionError> {
        let (Some(connection), Some(started_at)) =
            (session.connection.as_mut(), session.started_at)
        else {
            return Err(SessionError::NotConnected);
        };

        let payload = ActivityPayload::from_fields(&self.fields.snapshot(), started_at);
        tracing::debug!("Updating presence: {:?}", payload);

        match with_timeout(self.config.call_timeout, connection.update(&payload)).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!("Failed to update {} activity: {}", self.connector.name(), e);
                if let Some(stale) = session.connection.take() {
                    self.close_quietly(stale).await;
                }
                self.set_status(SessionStatus::Lost);
                Err(SessionError::UpdateFailed(e.to_string()))
            }
        }
    }

    /// Spawn the background task that re-pushes the fields every `refresh_interval`.
    ///
    /// Only one refresh task runs per manager; later calls are ignored.
    pub async fn start_periodic_refresh(self: &Arc<Self>) {
        let mut task = self.refresh_task.lock().await;
        if task.is_some() {
            tracing::debug!("Presence refresh task already running");
            return;
        }

        let interval = self.config.refresh_interval;
        let stop_rx = self.stop_tx.subscribe();
        *task = Some(tokio::spawn(run_refresh_task(
            Arc::downgrade(self),
            interval,
            stop_rx,
        )));

        tracing::info!("Presence refresh every {}s", interval.as_secs_f32());
    }

    async fn refresh_tick(&self) {
        let mut session = self.session.lock().await;
        if session.closed || session.connection.is_none() {
            return;
        }

        if let Err(e) = self.push_locked(&mut session).await {
            tracing::debug!("Periodic presence refresh failed: {}", e);
        }
    }

    /// Stop refreshing, clear the displayed presence and close the connection.
    ///
    /// Cleanup is best-effort: failures are logged, never returned.
    pub async fn shutdown(&self) {
        self.stop_tx.send_replace(true);

        if let Some(task) = self.refresh_task.lock().await.take() {
            if let Err(e) = task.await {
                tracing::warn!("Presence refresh task ended abnormally: {}", e);
            }
        }

        let mut session = self.session.lock().await;
        if session.closed {
            return;
        }

        if let Some(connection) = session.connection.take() {
            self.teardown(connection).await;
        }

        session.closed = true;
        self.set_status(SessionStatus::Closed);
        tracing::info!("{} Rich Presence disconnected", self.connector.name());
    }

    async fn teardown(&self, mut connection: Box<dyn PresenceConnection>) {
        if let Err(e) = with_timeout(self.config.call_timeout, connection.clear()).await {
            tracing::warn!("Failed to clear {} activity: {}", self.connector.name(), e);
        }
        self.close_quietly(connection).await;
    }

    async fn close_quietly(&self, connection: Box<dyn PresenceConnection>) {
        if tokio::time::timeout(self.config.call_timeout, connection.close())
            .await
            .is_err()
        {
            tracing::warn!("Timed out closing {} connection", self.connector.name());
        }
    }

    fn set_status(&self, status: SessionStatus) {
        self.status_tx.send_replace(status);
    }
}

async fn with_timeout<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, ClientError> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or_else(|_| Err(ClientError::Request(format!("timed out after {:?}", limit))))
}

/// Background loop behind `start_periodic_refresh`
async fn run_refresh_task(
    manager: Weak<SessionManager>,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if *stop_rx.borrow_and_update() {
            break;
        }

        tokio::select! {
            biased;
            changed = stop_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                manager.refresh_tick().await;
            }
        }
    }

    tracing::debug!("Presence refresh task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::testing::RecordingConnector;
    use crate::presence::PresenceFields;

    fn manager_with(connector: &RecordingConnector, fields: PresenceFields) -> Arc<SessionManager> {
        Arc::new(SessionManager::new(
            Arc::new(connector.clone()),
            SharedFields::new(fields),
            SessionConfig::default(),
        ))
    }

    fn fields() -> PresenceFields {
        PresenceFields {
            client_id: "123".to_string(),
            details: "Coding".to_string(),
            state: "Focused".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn connect_without_client_id_makes_no_attempt() {
        let connector = RecordingConnector::default();
        let manager = manager_with(
            &connector,
            PresenceFields {
                client_id: "  ".to_string(),
                ..fields()
            },
        );

        let result = manager.connect().await;
        assert!(matches!(result, Err(SessionError::MissingClientId)));
        assert_eq!(connector.connect_calls(), 0);
        assert_eq!(manager.status(), SessionStatus::Disconnected);
    }

    #[tokio::test]
    async fn connect_records_start_time() {
        let connector = RecordingConnector::default();
        let manager = manager_with(&connector, fields());

        let before = Utc::now();
        let started = manager.connect().await.unwrap();
        assert!(started >= before);
        assert!(started <= Utc::now());
        assert!(manager.is_connected().await);
        assert_eq!(manager.started_at().await, Some(started));
        assert_eq!(manager.status(), SessionStatus::Connected);
        assert_eq!(connector.client_ids(), vec!["123".to_string()]);
    }

    #[tokio::test]
    async fn reconnect_closes_previous_connection() {
        let connector = RecordingConnector::default();
        let manager = manager_with(&connector, fields());

        let first = manager.connect().await.unwrap();
        let second = manager.connect().await.unwrap();

        assert!(second >= first);
        assert_eq!(connector.connect_calls(), 2);
        assert_eq!(connector.clear_calls(), 1);
        assert_eq!(connector.close_calls(), 1);
    }

    #[tokio::test]
    async fn connect_failure_leaves_session_disconnected() {
        let connector = RecordingConnector::default();
        connector.fail_connects(true);
        let manager = manager_with(&connector, fields());

        let result = manager.connect().await;
        assert!(matches!(result, Err(SessionError::ConnectionFailed(_))));
        assert!(!manager.is_connected().await);
        assert_eq!(manager.status(), SessionStatus::ConnectFailed);
    }

    #[tokio::test]
    async fn start_pushes_current_fields() {
        let connector = RecordingConnector::default();
        let manager = manager_with(&connector, fields());

        manager.start().await.unwrap();

        let updates = connector.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].details, "Coding");
        assert_eq!(updates[0].state, "Focused");
        assert_eq!(updates[0].small_image, None);
        assert_eq!(Some(updates[0].start), manager.started_at().await);
    }

    #[tokio::test]
    async fn push_update_requires_connection() {
        let connector = RecordingConnector::default();
        let manager = manager_with(&connector, fields());

        let result = manager.push_update().await;
        assert!(matches!(result, Err(SessionError::NotConnected)));
        assert!(connector.updates().is_empty());
    }

    #[tokio::test]
    async fn failed_update_marks_session_lost() {
        let connector = RecordingConnector::default();
        let manager = manager_with(&connector, fields());
        manager.connect().await.unwrap();

        connector.fail_updates(true);
        let result = manager.push_update().await;
        assert!(matches!(result, Err(SessionError::UpdateFailed(_))));
        assert!(!manager.is_connected().await);
        assert_eq!(manager.status(), SessionStatus::Lost);
        assert_eq!(connector.close_calls(), 1);

        // Recoverable: a new connect brings the session back
        connector.fail_updates(false);
        manager.start().await.unwrap();
        assert_eq!(manager.status(), SessionStatus::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_reads_live_field_values() {
        let connector = RecordingConnector::default();
        let manager = manager_with(&connector, fields());

        manager.start().await.unwrap();
        manager.start_periodic_refresh().await;

        manager
            .fields()
            .update(|f| f.details = "Reviewing".to_string());

        tokio::time::sleep(DEFAULT_REFRESH_INTERVAL + Duration::from_secs(1)).await;

        let updates = connector.updates();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].details, "Coding");
        assert_eq!(updates[1].details, "Reviewing");

        manager.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_stops_pushing_after_failure() {
        let connector = RecordingConnector::default();
        let manager = manager_with(&connector, fields());

        manager.start().await.unwrap();
        manager.start_periodic_refresh().await;
        connector.fail_updates(true);

        tokio::time::sleep(DEFAULT_REFRESH_INTERVAL * 4).await;

        // One failed attempt, then no-op ticks until the next connect
        assert_eq!(connector.update_attempts(), 2);
        assert_eq!(manager.status(), SessionStatus::Lost);

        manager.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn no_updates_after_shutdown() {
        let connector = RecordingConnector::default();
        let manager = manager_with(&connector, fields());

        manager.start().await.unwrap();
        manager.start_periodic_refresh().await;
        tokio::time::sleep(DEFAULT_REFRESH_INTERVAL * 2 + Duration::from_secs(1)).await;
        assert_eq!(connector.update_attempts(), 3);

        manager.shutdown().await;
        assert_eq!(connector.clear_calls(), 1);
        assert_eq!(connector.close_calls(), 1);
        assert_eq!(manager.status(), SessionStatus::Closed);

        tokio::time::sleep(DEFAULT_REFRESH_INTERVAL * 4).await;
        assert_eq!(connector.update_attempts(), 3);

        assert!(matches!(manager.connect().await, Err(SessionError::Closed)));
    }

    #[tokio::test]
    async fn shutdown_swallows_cleanup_failures() {
        let connector = RecordingConnector::default();
        let manager = manager_with(&connector, fields());
        manager.connect().await.unwrap();

        connector.fail_clears(true);
        manager.shutdown().await;

        assert_eq!(connector.close_calls(), 1);
        assert!(!manager.is_connected().await);
        assert_eq!(manager.status(), SessionStatus::Closed);

        // Second shutdown is a no-op
        manager.shutdown().await;
        assert_eq!(connector.close_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_timeout_is_a_connection_failure() {
        let connector = RecordingConnector::default();
        connector.hang(true);
        let manager = manager_with(&connector, fields());

        let result = manager.connect().await;
        assert!(matches!(result, Err(SessionError::ConnectionFailed(_))));
        assert_eq!(connector.connect_calls(), 1);
        assert!(!manager.is_connected().await);
        assert_eq!(manager.status(), SessionStatus::ConnectFailed);
    }

    #[tokio::test(start_paused = true)]
    async fn update_timeout_marks_session_lost() {
        let connector = RecordingConnector::default();
        let manager = manager_with(&connector, fields());
        manager.connect().await.unwrap();

        connector.hang(true);
        let started = Instant::now();
        let result = manager.push_update().await;

        assert!(matches!(result, Err(SessionError::UpdateFailed(_))));
        assert!(!manager.is_connected().await);
        assert_eq!(manager.status(), SessionStatus::Lost);
        // Update and the close of the stale connection are each bounded
        assert!(started.elapsed() <= DEFAULT_CALL_TIMEOUT * 2);
        assert_eq!(connector.close_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_finishes_when_cleanup_hangs() {
        let connector = RecordingConnector::default();
        let manager = manager_with(&connector, fields());
        manager.start().await.unwrap();
        manager.start_periodic_refresh().await;

        connector.hang(true);
        let started = Instant::now();
        manager.shutdown().await;

        assert!(started.elapsed() <= DEFAULT_CALL_TIMEOUT * 2);
        assert_eq!(connector.clear_calls(), 1);
        assert_eq!(connector.close_calls(), 1);
        assert!(!manager.is_connected().await);
        assert_eq!(manager.status(), SessionStatus::Closed);
    }

    #[tokio::test]
    async fn status_changes_are_published() {
        let connector = RecordingConnector::default();
        let manager = manager_with(&connector, fields());
        let mut status = manager.subscribe_status();

        manager.connect().await.unwrap();
        status.changed().await.unwrap();
        assert_eq!(*status.borrow_and_update(), SessionStatus::Connected);
        assert_eq!(SessionStatus::Lost.to_string(), "Disconnected");
    }
}
