//! Simulated Transport
//!
//! An in-memory radio. Tags live in a table keyed by handle, each with a
//! capability, its records, and optional scripted failures per step. Tests and
//! `ntags-sim` "tap" tags to emit detection events for the live session.
//!
//! Like a real platform, invalidating a session echoes an `Invalidated` event
//! back on the channel.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

use ntags_conf::SimTagConfig;

use super::{BeginSession, TagHandle, Transport, TransportEvent};
use crate::capability::Capability;
use crate::codec;
use crate::error::TransportError;
use crate::record::RecordSet;
use crate::session::SessionId;

/// Reason carried by the echo event after the core invalidates a session.
const INVALIDATED_ECHO: &str = "Session invalidated";

/// A simulated tag.
#[derive(Debug, Clone, PartialEq)]
pub struct SimTag {
    pub capability: Result<Capability, TransportError>,
    /// `None` models a tag holding no NDEF message at all.
    pub records: Option<RecordSet>,
    pub connect_error: Option<TransportError>,
    pub read_error: Option<TransportError>,
    pub write_error: Option<TransportError>,
}

impl SimTag {
    /// A tag with no message.
    pub fn empty(capability: Capability) -> Self {
        Self {
            capability: Ok(capability),
            records: None,
            connect_error: None,
            read_error: None,
            write_error: None,
        }
    }

    /// A tag holding one text record per entry.
    pub fn with_texts<I, S>(capability: Capability, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let records = texts.into_iter().map(|t| codec::encode(t.as_ref())).collect();
        Self::with_records(capability, records)
    }

    pub fn with_records(capability: Capability, records: RecordSet) -> Self {
        Self {
            records: Some(records),
            ..Self::empty(capability)
        }
    }

    pub fn failing_connect(mut self, message: impl Into<String>) -> Self {
        self.connect_error = Some(TransportError::new(message));
        self
    }

    pub fn failing_query(mut self, message: impl Into<String>) -> Self {
        self.capability = Err(TransportError::new(message));
        self
    }

    pub fn failing_read(mut self, message: impl Into<String>) -> Self {
        self.read_error = Some(TransportError::new(message));
        self
    }

    pub fn failing_write(mut self, message: impl Into<String>) -> Self {
        self.write_error = Some(TransportError::new(message));
        self
    }

    /// Build a tag from a config fixture. An empty `records` list becomes a
    /// tag with no message.
    pub fn from_config(config: &SimTagConfig) -> Self {
        let capability = Capability::from_name(&config.capability);
        let mut tag = if config.records.is_empty() {
            Self::empty(capability)
        } else {
            Self::with_texts(capability, &config.records)
        };

        if let Some(ref e) = config.connect_error {
            tag = tag.failing_connect(e.as_str());
        }
        if let Some(ref e) = config.query_error {
            tag = tag.failing_query(e.as_str());
        }
        if let Some(ref e) = config.read_error {
            tag = tag.failing_read(e.as_str());
        }
        if let Some(ref e) = config.write_error {
            tag = tag.failing_write(e.as_str());
        }
        tag
    }
}

/// A call the core made on the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum SimCall {
    Begin {
        session: SessionId,
        request: BeginSession,
    },
    Connect {
        session: SessionId,
        tag: TagHandle,
    },
    QueryCapability {
        session: SessionId,
        tag: TagHandle,
    },
    ReadRecords {
        session: SessionId,
        tag: TagHandle,
    },
    WriteRecords {
        session: SessionId,
        tag: TagHandle,
        records: RecordSet,
    },
    SetAlert {
        session: SessionId,
        message: String,
    },
    Invalidate {
        session: SessionId,
        reason: Option<String>,
    },
}

/// In-memory transport.
#[derive(Debug)]
pub struct SimTransport {
    available: AtomicBool,
    auto_activate: AtomicBool,
    events: mpsc::UnboundedSender<TransportEvent>,
    tags: DashMap<TagHandle, SimTag>,
    live: Mutex<Option<SessionId>>,
    calls: Mutex<Vec<SimCall>>,
}

impl SimTransport {
    /// Create an available transport and the receiver for its events.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let transport = Self {
            available: AtomicBool::new(true),
            auto_activate: AtomicBool::new(true),
            events,
            tags: DashMap::new(),
            live: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        };
        (transport, rx)
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Whether `begin_session` emits `SessionActive` by itself. Default: true.
    pub fn set_auto_activate(&self, auto: bool) {
        self.auto_activate.store(auto, Ordering::SeqCst);
    }

    pub fn insert_tag(&self, handle: impl Into<TagHandle>, tag: SimTag) {
        self.tags.insert(handle.into(), tag);
    }

    /// Current state of a tag, including anything written to it.
    pub fn tag(&self, handle: &TagHandle) -> Option<SimTag> {
        self.tags.get(handle).map(|t| t.clone())
    }

    /// Session the simulated platform currently has open.
    pub fn live_session(&self) -> Option<SessionId> {
        *lock(&self.live)
    }

    /// Bring `tags` into range of the live session. False if none is open.
    pub fn tap(&self, tags: &[TagHandle]) -> bool {
        match self.live_session() {
            Some(session) => {
                self.tap_for(session, tags);
                true
            }
            None => false,
        }
    }

    /// Emit a detection addressed to `session`, live or not.
    pub fn tap_for(&self, session: SessionId, tags: &[TagHandle]) {
        self.emit(TransportEvent::TagsDetected {
            session,
            tags: tags.to_vec(),
        });
    }

    /// End the live session from the platform side (timeout, user cancel).
    pub fn cancel(&self, reason: impl Into<String>) -> bool {
        match lock(&self.live).take() {
            Some(session) => {
                self.emit(TransportEvent::Invalidated {
                    session,
                    reason: reason.into(),
                });
                true
            }
            None => false,
        }
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<SimCall> {
        lock(&self.calls).clone()
    }

    /// Record sets passed to `write_records`, in order.
    pub fn writes(&self) -> Vec<RecordSet> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                SimCall::WriteRecords { records, .. } => Some(records.clone()),
                _ => None,
            })
            .collect()
    }

    /// `(session, reason)` for every `invalidate` call, in order.
    pub fn invalidations(&self) -> Vec<(SessionId, Option<String>)> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                SimCall::Invalidate { session, reason } => Some((*session, reason.clone())),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: SimCall) {
        lock(&self.calls).push(call);
    }

    fn emit(&self, event: TransportEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Sim event receiver dropped");
        }
    }

    fn lookup(&self, tag: &TagHandle) -> Result<SimTag, TransportError> {
        self.tag(tag)
            .ok_or_else(|| TransportError::new(format!("Tag {} is out of range", tag)))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Transport for SimTransport {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn begin_session(&self, session: SessionId, request: BeginSession) -> Result<(), TransportError> {
        self.record(SimCall::Begin { session, request });

        if !self.is_available() {
            return Err(TransportError::new("NFC radio unavailable"));
        }

        *lock(&self.live) = Some(session);
        if self.auto_activate.load(Ordering::SeqCst) {
            self.emit(TransportEvent::SessionActive { session });
        }
        Ok(())
    }

    async fn connect(&self, session: SessionId, tag: &TagHandle) -> Result<(), TransportError> {
        self.record(SimCall::Connect {
            session,
            tag: tag.clone(),
        });

        match self.lookup(tag)?.connect_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn query_capability(&self, session: SessionId, tag: &TagHandle) -> Result<Capability, TransportError> {
        self.record(SimCall::QueryCapability {
            session,
            tag: tag.clone(),
        });

        self.lookup(tag)?.capability
    }

    async fn read_records(&self, session: SessionId, tag: &TagHandle) -> Result<Option<RecordSet>, TransportError> {
        self.record(SimCall::ReadRecords {
            session,
            tag: tag.clone(),
        });

        let state = self.lookup(tag)?;
        match state.read_error {
            Some(e) => Err(e),
            None => Ok(state.records),
        }
    }

    async fn write_records(&self, session: SessionId, tag: &TagHandle, records: RecordSet) -> Result<(), TransportError> {
        self.record(SimCall::WriteRecords {
            session,
            tag: tag.clone(),
            records: records.clone(),
        });

        let mut state = self
            .tags
            .get_mut(tag)
            .ok_or_else(|| TransportError::new(format!("Tag {} is out of range", tag)))?;

        if let Some(ref e) = state.write_error {
            return Err(e.clone());
        }
        state.records = Some(records);
        Ok(())
    }

    async fn set_alert(&self, session: SessionId, message: &str) {
        self.record(SimCall::SetAlert {
            session,
            message: message.to_string(),
        });
    }

    async fn invalidate(&self, session: SessionId, reason: Option<String>) {
        self.record(SimCall::Invalidate {
            session,
            reason: reason.clone(),
        });

        let was_live = {
            let mut live = lock(&self.live);
            if *live == Some(session) {
                *live = None;
                true
            } else {
                false
            }
        };

        if was_live {
            self.emit(TransportEvent::Invalidated {
                session,
                reason: reason.unwrap_or_else(|| INVALIDATED_ECHO.to_string()),
            });
        }
    }
}
