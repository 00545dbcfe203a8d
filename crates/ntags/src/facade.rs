//! Observable Session Facade
//!
//! [`TagReader`] is what a presentation layer holds. It starts read and write
//! sessions, feeds transport events to the [`SessionMachine`] one at a time,
//! and exposes the resulting [`SessionView`].
//!
//! Nothing here returns an error to the caller. Failures end up as status
//! text.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use ntags_conf::{SessionConfig, StartPolicy};

use crate::error::SessionError;
use crate::record::ScanResult;
use crate::session::{Phase, Session, SessionId, SessionMachine, SessionMode};
use crate::status;
use crate::transport::{Transport, TransportEvent};
use crate::view::SessionView;

pub struct TagReader<T: Transport + ?Sized> {
    transport: Arc<T>,
    machine: SessionMachine<T>,
    config: SessionConfig,
    generation: AtomicU64,
}

impl<T: Transport + ?Sized> TagReader<T> {
    pub fn new(transport: Arc<T>, config: SessionConfig) -> Self {
        Self {
            machine: SessionMachine::new(transport.clone()),
            transport,
            config,
            generation: AtomicU64::new(0),
        }
    }

    /// Start a read session.
    ///
    /// While a read session is already live this only restates its status.
    /// A new read session clears the results of the previous one as soon as it
    /// activates, so `results()` only ever holds texts from the current scan
    /// session. If the radio is unavailable nothing starts and the results are
    /// left as they were.
    pub async fn start_scanning(&self) {
        if !self.transport.is_available() {
            tracing::warn!("NFC unavailable, scan not started");
            self.machine
                .set_status(SessionError::TransportUnavailable.to_string());
            return;
        }

        if let Some(live) = self.machine.slot().snapshot().await {
            if live.mode == SessionMode::Read {
                tracing::debug!(session_id = %live.id, "Scan already running");
                self.machine.set_status(live.status);
                return;
            }
            if !self.make_room(&live).await {
                return;
            }
        }

        let id = self.next_id();
        let alert = self.config.scan_alert.clone();
        self.machine
            .activate(Session::read(id, alert.clone()), alert)
            .await;
    }

    /// Start a write session that appends `text` to the next tag tapped.
    pub async fn start_writing(&self, text: impl Into<String>) {
        if !self.transport.is_available() {
            tracing::warn!("NFC unavailable, write not started");
            self.machine
                .set_status(SessionError::TransportUnavailable.to_string());
            return;
        }

        if let Some(live) = self.machine.slot().snapshot().await {
            if !self.make_room(&live).await {
                return;
            }
        }

        let id = self.next_id();
        let alert = self.config.write_alert.clone();
        self.machine
            .activate(Session::write(id, text, alert.clone()), alert)
            .await;
    }

    /// Apply the configured start policy to a live session. True if the new
    /// request may proceed.
    async fn make_room(&self, live: &Session) -> bool {
        match self.config.concurrent_start {
            StartPolicy::Reject => {
                tracing::info!(session_id = %live.id, "Start refused, session in progress");
                self.machine.set_status(status::SESSION_BUSY);
                false
            }
            StartPolicy::Supersede => {
                if let Some(ended) = self.machine.end_live(live.id, Some(status::SUPERSEDED)).await {
                    tracing::info!(session_id = %ended.id, mode = %ended.mode, "Superseded live session");
                }
                true
            }
        }
    }

    /// End the live session cleanly, if there is one.
    pub async fn close(&self) {
        let Some(id) = self.machine.slot().current_id().await else {
            return;
        };

        if let Some(ended) = self.machine.end_live(id, None).await {
            self.machine.view().send_modify(|v| {
                v.status = status::SESSION_CLOSED.to_string();
                v.phase = ended.phase;
                v.session = None;
            });
        }
    }

    /// Process one transport event.
    pub async fn handle_event(&self, event: TransportEvent) {
        self.machine.handle(event).await;
    }

    /// Process every event already queued on `events`. Returns how many were
    /// handled.
    pub async fn drain(&self, events: &mut mpsc::UnboundedReceiver<TransportEvent>) -> usize {
        let mut handled = 0;
        while let Ok(event) = events.try_recv() {
            self.handle_event(event).await;
            handled += 1;
        }
        handled
    }

    /// Process events until the transport drops its sender.
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        tracing::debug!("Transport event stream closed");
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.machine.view().subscribe()
    }

    /// Copy of the whole view.
    pub fn view(&self) -> SessionView {
        self.machine.view().borrow().clone()
    }

    pub fn status(&self) -> String {
        self.machine.view().borrow().status.clone()
    }

    pub fn results(&self) -> ScanResult {
        self.machine.view().borrow().results.clone()
    }

    pub fn phase(&self) -> Phase {
        self.machine.view().borrow().phase.clone()
    }

    /// Whether a session is live.
    pub fn is_active(&self) -> bool {
        self.machine.view().borrow().session.is_some()
    }

    /// Text waiting to be written by the live session.
    pub async fn pending_outgoing_text(&self) -> Option<String> {
        self.machine
            .slot()
            .snapshot()
            .await
            .and_then(|s| s.pending_outgoing_text)
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    fn next_id(&self) -> SessionId {
        SessionId::from_raw(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capability;
    use crate::transport::{SimCall, SimTag, SimTransport, TagHandle};
    use pretty_assertions::assert_eq;

    fn reader(policy: StartPolicy) -> (TagReader<SimTransport>, mpsc::UnboundedReceiver<TransportEvent>) {
        let (transport, events) = SimTransport::new();
        let config = SessionConfig {
            concurrent_start: policy,
            ..Default::default()
        };
        (TagReader::new(Arc::new(transport), config), events)
    }

    #[tokio::test]
    async fn test_session_ids_increase() {
        let (reader, _events) = reader(StartPolicy::Supersede);
        assert_eq!(reader.next_id(), SessionId::from_raw(1));
        assert_eq!(reader.next_id(), SessionId::from_raw(2));
    }

    #[tokio::test]
    async fn test_restart_scan_restates_status() {
        let (reader, mut events) = reader(StartPolicy::Supersede);
        reader.start_scanning().await;
        reader.drain(&mut events).await;
        reader.machine.set_status("something else");

        reader.start_scanning().await;

        assert_eq!(reader.status(), status::READY_TO_SCAN);
        let begins = reader
            .transport()
            .calls()
            .iter()
            .filter(|c| matches!(c, SimCall::Begin { .. }))
            .count();
        assert_eq!(begins, 1);
    }

    #[tokio::test]
    async fn test_supersede_discards_pending_text() {
        let (reader, mut events) = reader(StartPolicy::Supersede);
        reader.start_writing("first").await;
        reader.drain(&mut events).await;

        reader.start_writing("second").await;
        reader.drain(&mut events).await;

        assert_eq!(reader.pending_outgoing_text().await.as_deref(), Some("second"));
        assert_eq!(
            reader.transport().invalidations(),
            vec![(SessionId::from_raw(1), Some(status::SUPERSEDED.to_string()))]
        );
        assert_eq!(reader.status(), status::READY_TO_WRITE);
    }

    #[tokio::test]
    async fn test_unavailable_reports_error_text() {
        let (reader, _events) = reader(StartPolicy::Supersede);
        reader.transport().set_available(false);

        reader.start_writing("hello").await;

        assert_eq!(reader.status(), "NFC is not supported on this device.");
        assert_eq!(reader.phase(), Phase::Idle);
        assert!(reader.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn test_supersede_leaves_newer_session_alone() {
        let (reader, mut events) = reader(StartPolicy::Supersede);
        reader.start_scanning().await;
        reader.drain(&mut events).await;
        let stale = reader.machine.slot().snapshot().await.unwrap();

        // A newer session takes the slot after `stale` was read.
        reader.start_writing("newer").await;
        assert!(reader.make_room(&stale).await);

        assert_eq!(reader.pending_outgoing_text().await.as_deref(), Some("newer"));
        assert_eq!(
            reader.transport().invalidations(),
            vec![(SessionId::from_raw(1), Some(status::SUPERSEDED.to_string()))]
        );
    }

    #[tokio::test]
    async fn test_reject_keeps_live_session() {
        let (reader, mut events) = reader(StartPolicy::Reject);
        reader.start_writing("first").await;
        reader.drain(&mut events).await;

        reader.start_scanning().await;

        assert_eq!(reader.status(), status::SESSION_BUSY);
        assert_eq!(reader.pending_outgoing_text().await.as_deref(), Some("first"));
        assert!(reader.transport().invalidations().is_empty());
    }

    #[tokio::test]
    async fn test_close_ends_cleanly() {
        let (reader, mut events) = reader(StartPolicy::Supersede);
        reader.start_scanning().await;
        reader.drain(&mut events).await;

        reader.close().await;
        reader.drain(&mut events).await;

        assert!(!reader.is_active());
        assert_eq!(reader.status(), status::SESSION_CLOSED);
        assert_eq!(reader.transport().invalidations(), vec![(SessionId::from_raw(1), None)]);
    }

    #[tokio::test]
    async fn test_run_processes_until_closed() {
        let (transport, mut events) = SimTransport::new();
        let transport = Arc::new(transport);
        transport.insert_tag("card", SimTag::with_texts(Capability::ReadWrite, ["hi"]));
        let reader = TagReader::new(transport.clone(), SessionConfig::default());

        reader.start_scanning().await;
        assert!(transport.tap(&[TagHandle::new("card")]));

        // The transport keeps its sender alive; relay the queued events onto a
        // stream that ends.
        let (tx, rx) = mpsc::unbounded_channel();
        while let Ok(event) = events.try_recv() {
            tx.send(event).unwrap();
        }
        drop(tx);
        reader.run(rx).await;

        assert_eq!(reader.results(), vec!["hi".to_string()]);
        assert_eq!(reader.phase(), Phase::AwaitingTag);
    }
}
