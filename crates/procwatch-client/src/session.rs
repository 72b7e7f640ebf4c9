//! Connection session: lifecycle, frame ingestion, and command application.
//!
//! A [`MonitorSession`] owns the two metric history buffers, the
//! latest-snapshot slot, and the table state. All shared state lives behind
//! one mutex, so frame ingestion and user commands are applied one at a time
//! in arrival order and readers never observe a half-applied frame.
//!
//! The session is transport-agnostic: the socket library hands frames in via
//! [`MonitorSession::on_frame`] and is driven for outbound sends through the
//! [`Transport`] seam. Lifecycle is `Disconnected -> Connecting -> Connected
//! -> Disconnected`; there is no automatic reconnect, resuming after a drop
//! requires a fresh [`connect`](MonitorSession::connect) from the caller.

use crate::error::{SessionError, TransportError};
use crate::wire::TableConfig;
use procwatch_core::{
    decode_snapshot, reduce, HistorySample, InvalidCapacity, RingBuffer, SystemSnapshot,
    TableCommand, TableState,
};
use std::sync::Mutex;

/// Session connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected
    #[default]
    Disconnected,
    /// Transport handed over, awaiting the open notification
    Connecting,
    /// Connected and ingesting frames
    Connected,
}

impl ConnectionState {
    /// Check if the session can ingest and send frames.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if the session is waiting for the transport to open.
    #[must_use]
    pub const fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting)
    }
}

/// Outbound seam to the socket library.
///
/// The session takes ownership of one transport per `connect` and guarantees
/// `close` is called exactly once per acquisition, on every exit path.
pub trait Transport: Send {
    /// Send one text frame to the peer.
    fn send_text(&mut self, frame: &str) -> Result<(), TransportError>;

    /// Close the underlying connection.
    fn close(&mut self) -> Result<(), TransportError>;
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Capacity of each metric history buffer.
    pub history_capacity: usize,
    /// Bidirectional protocol variant: push a [`TableConfig`] frame to the
    /// peer whenever a command produces a new table state. When false the
    /// outbound path is inert and the table is a purely client-side view.
    pub push_table_config: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            // Matches the producer's own rolling window.
            history_capacity: 100,
            push_table_config: false,
        }
    }
}

impl SessionConfig {
    /// Set the history buffer capacity.
    #[must_use]
    pub const fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Enable the bidirectional protocol variant.
    #[must_use]
    pub const fn with_push_table_config(mut self, push: bool) -> Self {
        self.push_table_config = push;
        self
    }
}

struct SessionInner {
    state: ConnectionState,
    transport: Option<Box<dyn Transport>>,
    latest: Option<SystemSnapshot>,
    cpu_history: RingBuffer<HistorySample>,
    memory_history: RingBuffer<HistorySample>,
    table: TableState,
}

impl SessionInner {
    /// Tear down to `Disconnected`, releasing the transport exactly once.
    /// Buffers and the latest snapshot are retained so the UI can keep
    /// showing last-known values next to a disconnected indicator.
    fn teardown(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            let _ = transport.close();
        }
        self.state = ConnectionState::Disconnected;
    }
}

/// One live monitoring session.
///
/// Explicitly constructed and owned; dropping the session closes any held
/// transport.
pub struct MonitorSession {
    inner: Mutex<SessionInner>,
    config: SessionConfig,
}

impl MonitorSession {
    /// Create a session with the given configuration.
    ///
    /// # Errors
    ///
    /// Fails with [`InvalidCapacity`] when `history_capacity` is zero.
    pub fn new(config: SessionConfig) -> Result<Self, InvalidCapacity> {
        let inner = SessionInner {
            state: ConnectionState::Disconnected,
            transport: None,
            latest: None,
            cpu_history: RingBuffer::new(config.history_capacity)?,
            memory_history: RingBuffer::new(config.history_capacity)?,
            table: TableState::default(),
        };
        Ok(Self {
            inner: Mutex::new(inner),
            config,
        })
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    /// Hand over a transport and start connecting.
    ///
    /// No-op when a connection attempt is already underway or established.
    pub fn connect(&self, transport: Box<dyn Transport>) {
        let mut inner = self.lock();
        if inner.state != ConnectionState::Disconnected {
            return;
        }
        inner.transport = Some(transport);
        inner.state = ConnectionState::Connecting;
    }

    /// Notification from the transport that the connection is open.
    pub fn on_open(&self) {
        let mut inner = self.lock();
        if inner.state.is_connecting() {
            inner.state = ConnectionState::Connected;
        }
    }

    /// Ingest one raw inbound frame.
    ///
    /// On success the scalar metrics are appended to the history buffers and
    /// the snapshot replaces the latest-snapshot slot, all atomically. On any
    /// error the frame is dropped and accumulated state is unchanged.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`] outside the connected state,
    /// [`SessionError::Snapshot`] for malformed frames, and
    /// [`SessionError::OutOfOrder`] for frames older than the latest one.
    pub fn on_frame(&self, raw: &str) -> Result<(), SessionError> {
        let mut inner = self.lock();
        if !inner.state.is_active() {
            return Err(SessionError::NotConnected);
        }

        let snapshot = decode_snapshot(raw)?;
        if let Some(latest) = &inner.latest {
            if snapshot.captured_at < latest.captured_at {
                return Err(SessionError::OutOfOrder {
                    frame: snapshot.captured_at,
                    latest: latest.captured_at,
                });
            }
        }

        inner.cpu_history.push(HistorySample::new(
            snapshot.captured_at,
            snapshot.totals.global_cpu_percent,
        ));
        inner.memory_history.push(HistorySample::new(
            snapshot.captured_at,
            snapshot.totals.memory_percent(),
        ));
        inner.latest = Some(snapshot);
        Ok(())
    }

    /// Apply a table command, returning the new state.
    ///
    /// In the bidirectional variant the new state is also serialized and sent
    /// to the peer; a send failure tears the session down to `Disconnected`
    /// (table state keeps the reduced value, data is retained).
    ///
    /// # Errors
    ///
    /// [`SessionError::Table`] when the reducer rejects the command, or
    /// [`SessionError::Transport`] when the outbound send fails.
    pub fn apply(&self, command: &TableCommand) -> Result<TableState, SessionError> {
        let mut inner = self.lock();
        let next = reduce(&inner.table, command)?;
        inner.table = next.clone();

        if self.config.push_table_config && inner.state.is_active() {
            let frame = TableConfig::from(&next).to_frame();
            let result = inner
                .transport
                .as_mut()
                .map_or(Ok(()), |t| t.send_text(&frame));
            if let Err(e) = result {
                inner.teardown();
                return Err(SessionError::Transport(e));
            }
        }

        Ok(next)
    }

    /// Notification from the transport that the connection dropped.
    ///
    /// Transitions to `Disconnected`; buffers and the latest snapshot are
    /// retained.
    pub fn on_transport_error(&self) {
        self.lock().teardown();
    }

    /// Close the session. Idempotent; the transport is released exactly once.
    pub fn close(&self) {
        self.lock().teardown();
    }

    /// The latest successfully ingested snapshot, if any.
    #[must_use]
    pub fn latest(&self) -> Option<SystemSnapshot> {
        self.lock().latest.clone()
    }

    /// Read view of the CPU history, oldest first.
    #[must_use]
    pub fn cpu_history(&self) -> Vec<HistorySample> {
        self.lock().cpu_history.snapshot()
    }

    /// Read view of the memory history, oldest first.
    #[must_use]
    pub fn memory_history(&self) -> Vec<HistorySample> {
        self.lock().memory_history.snapshot()
    }

    /// Current table state.
    #[must_use]
    pub fn table(&self) -> TableState {
        self.lock().table.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionInner> {
        self.inner.lock().expect("session mutex not poisoned")
    }
}

impl Drop for MonitorSession {
    fn drop(&mut self) {
        if let Ok(inner) = self.inner.get_mut() {
            inner.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procwatch_core::SortKey;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeTransport {
        sent: Arc<Mutex<Vec<String>>>,
        closes: Arc<AtomicUsize>,
        fail_sends: bool,
    }

    impl Transport for FakeTransport {
        fn send_text(&mut self, frame: &str) -> Result<(), TransportError> {
            if self.fail_sends {
                return Err(TransportError::new("pipe broke"));
            }
            self.sent
                .lock()
                .expect("sent mutex not poisoned")
                .push(frame.to_string());
            Ok(())
        }

        fn close(&mut self) -> Result<(), TransportError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn frame(time: &str, cpu: f64) -> String {
        json!({
            "date_time": time,
            "device_details": {
                "architecture": "x86_64",
                "name": "devbox",
                "distro": "Ubuntu 22.04",
                "platform": "Linux"
            },
            "total_system_data": {
                "cores": 8,
                "total_memory": 1000u64,
                "used_memory": 250u64,
                "global_cpu_usage": cpu
            },
            "processes_data": [
                {
                    "pid": 1,
                    "process_path": "/sbin/init",
                    "cpu_usage": 0.1,
                    "memory": 10u64,
                    "disk_usage": 0
                }
            ]
        })
        .to_string()
    }

    fn connected_session(config: SessionConfig) -> (MonitorSession, Arc<Mutex<Vec<String>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let transport = FakeTransport {
            sent: Arc::clone(&sent),
            ..FakeTransport::default()
        };
        let session = MonitorSession::new(config).unwrap();
        session.connect(Box::new(transport));
        session.on_open();
        (session, sent)
    }

    #[test]
    fn test_zero_capacity_is_fatal_at_construction() {
        let config = SessionConfig::default().with_history_capacity(0);
        assert!(MonitorSession::new(config).is_err());
    }

    #[test]
    fn test_lifecycle_transitions() {
        let session = MonitorSession::new(SessionConfig::default()).unwrap();
        assert_eq!(session.state(), ConnectionState::Disconnected);

        session.connect(Box::new(FakeTransport::default()));
        assert_eq!(session.state(), ConnectionState::Connecting);
        assert!(session.state().is_connecting());

        session.on_open();
        assert_eq!(session.state(), ConnectionState::Connected);
        assert!(session.state().is_active());

        session.close();
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_on_frame_requires_connected() {
        let session = MonitorSession::new(SessionConfig::default()).unwrap();
        assert!(matches!(
            session.on_frame(&frame("2024-03-01 12:00:00", 10.0)),
            Err(SessionError::NotConnected)
        ));

        session.connect(Box::new(FakeTransport::default()));
        // Still connecting, not open yet.
        assert!(matches!(
            session.on_frame(&frame("2024-03-01 12:00:00", 10.0)),
            Err(SessionError::NotConnected)
        ));
    }

    #[test]
    fn test_ingestion_fills_both_histories_and_latest() {
        let (session, _) = connected_session(SessionConfig::default());
        session.on_frame(&frame("2024-03-01 12:00:00", 42.0)).unwrap();

        let cpu = session.cpu_history();
        assert_eq!(cpu.len(), 1);
        assert_eq!(cpu[0].value, 42.0);

        let memory = session.memory_history();
        assert_eq!(memory.len(), 1);
        // 250 / 1000 * 100, two-decimal rounding.
        assert_eq!(memory[0].value, 25.0);

        let latest = session.latest().unwrap();
        assert_eq!(latest.totals.global_cpu_percent, 42.0);
        assert_eq!(cpu[0].at, latest.captured_at);
    }

    #[test]
    fn test_capacity_two_keeps_last_two_samples() {
        let config = SessionConfig::default().with_history_capacity(2);
        let (session, _) = connected_session(config);
        session.on_frame(&frame("2024-03-01 12:00:00", 10.0)).unwrap();
        session.on_frame(&frame("2024-03-01 12:00:01", 20.0)).unwrap();
        session.on_frame(&frame("2024-03-01 12:00:02", 30.0)).unwrap();

        let values: Vec<f64> = session.cpu_history().iter().map(|s| s.value).collect();
        assert_eq!(values, vec![20.0, 30.0]);
    }

    #[test]
    fn test_bad_frame_keeps_prior_state() {
        let (session, _) = connected_session(SessionConfig::default());
        session.on_frame(&frame("2024-03-01 12:00:00", 10.0)).unwrap();

        assert!(matches!(
            session.on_frame("{definitely not json"),
            Err(SessionError::Snapshot(_))
        ));
        assert_eq!(session.cpu_history().len(), 1);
        assert!(session.latest().is_some());
        assert_eq!(session.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_out_of_order_frame_rejected() {
        let (session, _) = connected_session(SessionConfig::default());
        session.on_frame(&frame("2024-03-01 12:00:05", 10.0)).unwrap();

        assert!(matches!(
            session.on_frame(&frame("2024-03-01 12:00:04", 20.0)),
            Err(SessionError::OutOfOrder { .. })
        ));
        assert_eq!(session.cpu_history().len(), 1);

        // Equal timestamps are allowed: order is non-decreasing, not strict.
        session.on_frame(&frame("2024-03-01 12:00:05", 20.0)).unwrap();
        assert_eq!(session.cpu_history().len(), 2);
    }

    #[test]
    fn test_apply_reduces_without_outbound_by_default() {
        let (session, sent) = connected_session(SessionConfig::default());
        let next = session
            .apply(&TableCommand::SortBy(SortKey::CpuUsage))
            .unwrap();
        assert_eq!(next.sort_key, SortKey::CpuUsage);
        assert_eq!(session.table(), next);
        assert!(sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_apply_pushes_table_config_when_bidirectional() {
        let config = SessionConfig::default().with_push_table_config(true);
        let (session, sent) = connected_session(config);
        session.apply(&TableCommand::SetPage(2)).unwrap();

        let frames = sent.lock().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], r#"{"order_by":"pid","order":"asc","page":2}"#);
    }

    #[test]
    fn test_apply_rejected_command_leaves_table_unchanged() {
        let config = SessionConfig::default().with_push_table_config(true);
        let (session, sent) = connected_session(config);
        let before = session.table();

        assert!(matches!(
            session.apply(&TableCommand::SetPage(-3)),
            Err(SessionError::Table(_))
        ));
        assert_eq!(session.table(), before);
        assert!(sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_send_failure_disconnects_but_retains_data() {
        let closes = Arc::new(AtomicUsize::new(0));
        let transport = FakeTransport {
            fail_sends: true,
            closes: Arc::clone(&closes),
            ..FakeTransport::default()
        };
        let config = SessionConfig::default().with_push_table_config(true);
        let session = MonitorSession::new(config).unwrap();
        session.connect(Box::new(transport));
        session.on_open();
        session.on_frame(&frame("2024-03-01 12:00:00", 10.0)).unwrap();

        assert!(matches!(
            session.apply(&TableCommand::SetPage(1)),
            Err(SessionError::Transport(_))
        ));
        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        // Last-known data stays visible alongside the disconnected state.
        assert!(session.latest().is_some());
        assert_eq!(session.cpu_history().len(), 1);
        assert_eq!(session.table().page, 1);
    }

    #[test]
    fn test_close_releases_transport_exactly_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        let transport = FakeTransport {
            closes: Arc::clone(&closes),
            ..FakeTransport::default()
        };
        let session = MonitorSession::new(SessionConfig::default()).unwrap();
        session.connect(Box::new(transport));
        session.on_open();

        session.close();
        session.close();
        session.on_transport_error();
        drop(session);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_closes_held_transport() {
        let closes = Arc::new(AtomicUsize::new(0));
        {
            let transport = FakeTransport {
                closes: Arc::clone(&closes),
                ..FakeTransport::default()
            };
            let session = MonitorSession::new(SessionConfig::default()).unwrap();
            session.connect(Box::new(transport));
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reconnect_is_explicit() {
        let session = MonitorSession::new(SessionConfig::default()).unwrap();
        session.connect(Box::new(FakeTransport::default()));
        session.on_open();
        session.on_transport_error();
        assert_eq!(session.state(), ConnectionState::Disconnected);

        // No auto-retry: the caller supplies a fresh transport.
        session.connect(Box::new(FakeTransport::default()));
        assert_eq!(session.state(), ConnectionState::Connecting);
    }
}
