//! Session State Machine
//!
//! Drives one session from activation to termination:
//!
//! ```text
//! Idle -> Activating -> AwaitingTag -> Connecting -+-> Reading ------------> AwaitingTag
//!                                                  |
//!                                                  +-> QueryingCapability -> Writing -> Terminated
//! ```
//!
//! Any failure goes straight to `Terminated(Failed)` and invalidates the
//! platform session with the failure's reason. Reads return to
//! `AwaitingTag` so the next tap is handled by the same session.
//!
//! Every step re-checks that its session still owns the slot after each
//! transport call. A session that was replaced or invalidated in the meantime
//! is abandoned without touching the observable view.
//!
//! Tracing spans:
//! - `ntags.session.begin` - platform session start
//! - `ntags.session.tag` - one tag interaction

use std::sync::Arc;
use tokio::sync::watch;
use tracing::Instrument;

use super::{Phase, Session, SessionId, SessionMode, SessionSlot, Termination};
use crate::capability::{self, Outcome};
use crate::codec;
use crate::error::SessionError;
use crate::record::{append_record, ScanResult};
use crate::status;
use crate::transport::{BeginSession, TagHandle, Transport, TransportEvent};
use crate::view::SessionView;

/// Result of working on one detected tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagOutcome {
    /// Read mode: the tag's records, decoded.
    Scanned(ScanResult),
    /// Write mode: the combined record set was written.
    Written,
    /// The session must end with this error.
    Failed(SessionError),
    /// The session stopped being live while the tag was being worked on.
    Abandoned,
}

/// The state machine. Owns the session slot and publishes to the view.
pub struct SessionMachine<T: Transport + ?Sized> {
    transport: Arc<T>,
    slot: SessionSlot,
    view: watch::Sender<SessionView>,
}

impl<T: Transport + ?Sized> SessionMachine<T> {
    pub fn new(transport: Arc<T>) -> Self {
        let (view, _) = watch::channel(SessionView::default());
        Self {
            transport,
            slot: SessionSlot::new(),
            view,
        }
    }

    pub fn slot(&self) -> &SessionSlot {
        &self.slot
    }

    pub fn view(&self) -> &watch::Sender<SessionView> {
        &self.view
    }

    /// Replace the status text without touching anything else.
    pub fn set_status(&self, text: impl Into<String>) {
        let text = text.into();
        self.view.send_modify(|v| v.status = text);
    }

    /// `Idle -> Activating`: install `session` and ask the transport to begin.
    ///
    /// Read sessions clear the previous results.
    pub async fn activate(&self, session: Session, alert_message: String) {
        let id = session.id;
        let mode = session.mode;
        let text = session.status.clone();

        let span = tracing::info_span!(
            "ntags.session.begin",
            session_id = %id,
            mode = %mode,
        );

        async {
            if let Some(displaced) = self.slot.install(session).await {
                tracing::warn!(displaced = %displaced.id, "Activated over a live session");
            }

            self.view.send_modify(|v| {
                v.status = text;
                v.phase = Phase::Activating;
                v.session = Some(id);
                if mode == SessionMode::Read {
                    v.results.clear();
                }
            });

            let request = BeginSession {
                mode,
                invalidate_after_first_read: mode.invalidate_after_first_read(),
                alert_message,
            };

            match self.transport.begin_session(id, request).await {
                Ok(()) => tracing::info!("Session started"),
                Err(e) => self.fail(id, SessionError::BeginFailed(e)).await,
            }
        }
        .instrument(span)
        .await
    }

    /// Route a transport event to its handler. Events for any session but the
    /// live one are dropped here.
    pub async fn handle(&self, event: TransportEvent) {
        let id = event.session();
        if !self.slot.is_current(id).await {
            tracing::debug!(session_id = %id, event = ?event, "Ignoring event for stale session");
            return;
        }

        match event {
            TransportEvent::SessionActive { session } => self.on_session_active(session).await,
            TransportEvent::TagsDetected { session, tags } => {
                self.on_tags_detected(session, tags).await
            }
            TransportEvent::Invalidated { session, reason } => {
                self.on_invalidated(session, reason).await
            }
        }
    }

    /// `Activating -> AwaitingTag`.
    pub async fn on_session_active(&self, id: SessionId) {
        let ready = self
            .slot
            .with_session(id, |session| {
                if session.phase != Phase::Activating {
                    return None;
                }
                session.advance(Phase::AwaitingTag);
                session.status = match session.mode {
                    SessionMode::Read => status::READY_TO_SCAN,
                    SessionMode::Write => status::READY_TO_WRITE,
                }
                .to_string();
                Some(session.status.clone())
            })
            .await
            .flatten();

        match ready {
            Some(text) => self.view.send_modify(|v| {
                v.status = text;
                v.phase = Phase::AwaitingTag;
            }),
            None => tracing::debug!(session_id = %id, "Ignoring activation for stale session"),
        }
    }

    /// `AwaitingTag -> Connecting -> ...`: work on the first detected tag.
    pub async fn on_tags_detected(&self, id: SessionId, tags: Vec<TagHandle>) {
        let extra = tags.len().saturating_sub(1);
        let Some(tag) = tags.into_iter().next() else {
            tracing::debug!(session_id = %id, "Detection event carried no tags");
            return;
        };

        let claimed = self
            .slot
            .with_session(id, |session| {
                if session.phase != Phase::AwaitingTag {
                    return None;
                }
                session.advance(Phase::Connecting);
                Some((session.mode, session.pending_outgoing_text.clone()))
            })
            .await
            .flatten();

        let Some((mode, pending)) = claimed else {
            tracing::debug!(session_id = %id, tag = %tag, "Ignoring tag for stale or busy session");
            return;
        };

        self.view.send_modify(|v| v.phase = Phase::Connecting);

        let span = tracing::info_span!(
            "ntags.session.tag",
            session_id = %id,
            tag = %tag,
            mode = %mode,
        );

        async {
            if extra > 0 {
                tracing::debug!(ignored = extra, "Ignoring additional tags in range");
            }

            let outcome = self.interact(id, mode, pending, &tag).await;
            self.settle(id, outcome).await;
        }
        .instrument(span)
        .await
    }

    /// The platform ended the session on its own.
    pub async fn on_invalidated(&self, id: SessionId, reason: String) {
        let Some(mut session) = self.slot.remove(id).await else {
            tracing::debug!(session_id = %id, reason = %reason, "Ignoring invalidation for stale session");
            return;
        };

        tracing::info!(session_id = %id, reason = %reason, "Session invalidated by transport");
        session.advance(Phase::Terminated(Termination::Failed(reason.clone())));

        let text = status::session_ended(&reason);
        self.view.send_modify(|v| {
            v.status = text;
            v.phase = session.phase.clone();
            v.session = None;
        });
    }

    /// Connect and run the read or write path for `tag`.
    pub async fn interact(
        &self,
        id: SessionId,
        mode: SessionMode,
        pending: Option<String>,
        tag: &TagHandle,
    ) -> TagOutcome {
        if let Err(e) = self.transport.connect(id, tag).await {
            return TagOutcome::Failed(SessionError::ConnectionFailed(e));
        }

        match mode {
            SessionMode::Read => self.read_tag(id, tag).await,
            SessionMode::Write => self.write_tag(id, pending, tag).await,
        }
    }

    async fn read_tag(&self, id: SessionId, tag: &TagHandle) -> TagOutcome {
        if !self.advance(id, Phase::Reading).await {
            return TagOutcome::Abandoned;
        }

        match self.transport.read_records(id, tag).await {
            Ok(records) => {
                let records = records.unwrap_or_default();
                tracing::debug!(records = records.len(), "Read tag");
                TagOutcome::Scanned(codec::decode_all(&records))
            }
            Err(e) => TagOutcome::Failed(SessionError::ReadFailed(e)),
        }
    }

    async fn write_tag(&self, id: SessionId, pending: Option<String>, tag: &TagHandle) -> TagOutcome {
        if !self.advance(id, Phase::QueryingCapability).await {
            return TagOutcome::Abandoned;
        }

        let query = self.transport.query_capability(id, tag).await;
        if let Outcome::Reject(e) = capability::resolve(query) {
            return TagOutcome::Failed(e);
        }

        let Some(text) = pending else {
            return TagOutcome::Failed(SessionError::NothingToWrite);
        };

        if !self.advance(id, Phase::Writing).await {
            return TagOutcome::Abandoned;
        }

        let existing = match self.transport.read_records(id, tag).await {
            Ok(Some(records)) => records,
            Ok(None) => {
                tracing::debug!("Tag is empty, writing first record");
                Vec::new()
            }
            Err(e) => return TagOutcome::Failed(SessionError::ReadExistingFailed(e)),
        };

        if !self.slot.is_current(id).await {
            return TagOutcome::Abandoned;
        }

        let kept = existing.len();
        let combined = append_record(existing, codec::encode(&text));

        match self.transport.write_records(id, tag, combined).await {
            Ok(()) => {
                tracing::debug!(kept, "Appended record");
                TagOutcome::Written
            }
            Err(e) => TagOutcome::Failed(SessionError::WriteFailed(e)),
        }
    }

    /// Apply the outcome of a tag interaction.
    pub async fn settle(&self, id: SessionId, outcome: TagOutcome) {
        match outcome {
            TagOutcome::Scanned(results) => {
                let applied = self
                    .slot
                    .with_session(id, |session| {
                        session.advance(Phase::AwaitingTag);
                        session.status = status::SCAN_COMPLETE.to_string();
                    })
                    .await;

                if applied.is_none() {
                    tracing::debug!("Discarding scan for stale session");
                    return;
                }

                tracing::info!(entries = results.len(), "Scan complete");
                self.view.send_modify(|v| {
                    v.results = results;
                    v.status = status::SCAN_COMPLETE.to_string();
                    v.phase = Phase::AwaitingTag;
                });
            }
            TagOutcome::Written => {
                let Some(mut session) = self.slot.remove(id).await else {
                    tracing::debug!("Discarding write result for stale session");
                    return;
                };

                session.pending_outgoing_text = None;
                session.status = status::WRITE_SUCCESSFUL.to_string();
                session.advance(Phase::Terminated(Termination::Completed));

                self.transport.set_alert(id, status::WRITE_ALERT).await;
                self.transport.invalidate(id, None).await;

                tracing::info!("Write complete");
                self.view.send_modify(|v| {
                    v.status = session.status;
                    v.phase = session.phase;
                    v.session = None;
                });
            }
            TagOutcome::Failed(error) => self.fail(id, error).await,
            TagOutcome::Abandoned => {
                tracing::debug!("Session ended while the tag was in use");
            }
        }
    }

    /// `* -> Terminated(Failed)`: invalidate with the error's reason.
    ///
    /// Recoverable errors are logged and leave the session running.
    pub async fn fail(&self, id: SessionId, error: SessionError) {
        if !error.is_fatal() {
            tracing::debug!(session_id = %id, error = %error, "Recoverable error, session continues");
            return;
        }

        let Some(mut session) = self.slot.remove(id).await else {
            tracing::debug!(session_id = %id, error = %error, "Failure for stale session");
            return;
        };

        let reason = error.to_string();
        tracing::warn!(session_id = %id, error = %reason, "Session failed");
        session.advance(Phase::Terminated(Termination::Failed(reason.clone())));

        self.transport.invalidate(id, Some(reason.clone())).await;

        let text = status::session_ended(&reason);
        self.view.send_modify(|v| {
            v.status = text;
            v.phase = session.phase;
            v.session = None;
        });
    }

    /// Take session `id` out of the slot and invalidate it, if it is still
    /// live.
    ///
    /// Used when a newer start request replaces it, or when the caller closes
    /// it. Returns the session that was ended.
    pub async fn end_live(&self, id: SessionId, reason: Option<&str>) -> Option<Session> {
        let mut session = self.slot.remove(id).await?;
        tracing::info!(session_id = %session.id, reason = ?reason, "Ending live session");

        session.pending_outgoing_text = None;
        session.advance(Phase::Terminated(match reason {
            Some(r) => Termination::Failed(r.to_string()),
            None => Termination::Completed,
        }));

        self.transport
            .invalidate(session.id, reason.map(str::to_string))
            .await;
        Some(session)
    }

    /// Advance `id` to `phase`, mirroring it in the view. False if `id` is no
    /// longer live.
    async fn advance(&self, id: SessionId, phase: Phase) -> bool {
        let advanced = self
            .slot
            .with_session(id, |session| session.advance(phase.clone()))
            .await
            .is_some();

        if advanced {
            self.view.send_modify(|v| v.phase = phase);
        }
        advanced
    }
}
