//! Presence Tracker
//!
//! Per-participant online/offline state driven by heartbeats.
//!
//! ```text
//! unknown --heartbeat--> online --expiry / disconnect--> offline --heartbeat--> online ...
//! ```
//!
//! Each heartbeat (re)arms an expiry timer. When it fires the participant
//! goes offline with `last_seen` frozen at the last accepted heartbeat.
//! Transitions are written through to the [`PresenceRepository`] and
//! published to the [`FanoutHub`] under one lock, so the persisted and
//! published order always match. Reads are served from an in-memory
//! snapshot and never wait on storage.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{SubsecRound, Utc};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::fanout_hub::{FanoutHub, HubEvent};
use crate::domain::{Participant, Participants, PresenceRecord, PresenceRepository, PresenceStatus};
use crate::infrastructure::metrics::record_presence_transition;
use crate::shared::error::ChatError;

/// Pending expiry for one participant.
#[derive(Default)]
struct ExpiryTimer {
    /// Bumped on every heartbeat and disconnect; a firing timer whose
    /// generation is stale does nothing.
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

struct TrackerInner {
    repo: Arc<dyn PresenceRepository>,
    hub: Arc<FanoutHub>,
    participants: Participants,
    expiry_window: Duration,
    records: RwLock<HashMap<Participant, PresenceRecord>>,
    timers: Mutex<HashMap<Participant, ExpiryTimer>>,
}

/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct PresenceTracker {
    inner: Arc<TrackerInner>,
}

impl PresenceTracker {
    /// Load persisted presence. Nobody can be connected right after a
    /// restart, so records persisted as online come back offline with their
    /// last heartbeat kept.
    pub async fn open(
        repo: Arc<dyn PresenceRepository>,
        hub: Arc<FanoutHub>,
        participants: Participants,
        expiry_window: Duration,
    ) -> Result<Self, ChatError> {
        let mut records = HashMap::new();
        for mut record in repo.find_all().await? {
            if !participants.contains(&record.identity) {
                tracing::debug!(identity = %record.identity, "Ignoring presence of former participant");
                continue;
            }
            if record.is_online() {
                record.status = PresenceStatus::Offline;
                repo.upsert(&record).await?;
            }
            records.insert(record.identity.clone(), record);
        }

        tracing::info!(restored = records.len(), "Presence tracker opened");

        Ok(Self {
            inner: Arc::new(TrackerInner {
                repo,
                hub,
                participants,
                expiry_window,
                records: RwLock::new(records),
                timers: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn expiry_window(&self) -> Duration {
        self.inner.expiry_window
    }

    /// Mark `identity` online and restart its expiry window.
    ///
    /// The first heartbeat of a never-seen participant is accepted like any
    /// other. Only the offline to online transition is published; refreshes
    /// of an online participant update the record silently.
    pub async fn heartbeat(&self, identity: &Participant) -> Result<PresenceRecord, ChatError> {
        self.ensure_participant(identity)?;

        let mut timers = self.inner.timers.lock().await;
        let was_online = self.get(identity).is_online();

        let record = PresenceRecord {
            identity: identity.clone(),
            status: PresenceStatus::Online,
            last_seen: Some(Utc::now().trunc_subsecs(3)),
        };

        let timer = timers.entry(identity.clone()).or_default();
        timer.generation += 1;
        if let Some(handle) = timer.handle.take() {
            handle.abort();
        }
        timer.handle = Some(self.spawn_expiry(identity.clone(), timer.generation));

        self.inner.commit(&record).await;
        if !was_online {
            self.inner.publish(&record, "heartbeat");
        }

        tracing::trace!(identity = %identity, "Heartbeat accepted");
        Ok(record)
    }

    /// Mark `identity` offline now and cancel its pending expiry.
    ///
    /// A participant that is already offline keeps its record, including the
    /// `last_seen` frozen by an earlier expiry.
    pub async fn explicit_disconnect(
        &self,
        identity: &Participant,
    ) -> Result<PresenceRecord, ChatError> {
        self.disconnect_unless(identity, || false).await
    }

    /// [`explicit_disconnect`](Self::explicit_disconnect), skipped when
    /// `still_connected` returns true. The check runs under the transition
    /// lock, so a session that registers and heartbeats concurrently is
    /// never marked offline by a stale close.
    pub async fn disconnect_unless<F>(
        &self,
        identity: &Participant,
        still_connected: F,
    ) -> Result<PresenceRecord, ChatError>
    where
        F: FnOnce() -> bool,
    {
        self.ensure_participant(identity)?;

        let mut timers = self.inner.timers.lock().await;
        if still_connected() {
            return Ok(self.get(identity));
        }
        if let Some(timer) = timers.get_mut(identity) {
            timer.generation += 1;
            if let Some(handle) = timer.handle.take() {
                handle.abort();
            }
        }

        let current = self.get(identity);
        if !current.is_online() {
            return Ok(current);
        }

        let record = PresenceRecord {
            identity: identity.clone(),
            status: PresenceStatus::Offline,
            last_seen: Some(Utc::now().trunc_subsecs(3)),
        };
        self.inner.commit(&record).await;
        self.inner.publish(&record, "disconnect");

        tracing::debug!(identity = %identity, "Participant disconnected");
        Ok(record)
    }

    /// Disconnect every online participant, used on shutdown.
    pub async fn disconnect_all(&self) {
        let participants: Vec<Participant> = self.inner.participants.iter().cloned().collect();
        for identity in participants {
            if let Err(e) = self.explicit_disconnect(&identity).await {
                tracing::warn!(identity = %identity, error = %e, "Failed to disconnect on shutdown");
            }
        }
    }

    /// Current presence of `identity`. Never waits on storage.
    pub fn get(&self, identity: &Participant) -> PresenceRecord {
        self.inner
            .records
            .read()
            .get(identity)
            .cloned()
            .unwrap_or_else(|| PresenceRecord::unknown(identity.clone()))
    }

    /// Presence of both participants.
    pub fn snapshot(&self) -> Vec<PresenceRecord> {
        self.inner.participants.iter().map(|p| self.get(p)).collect()
    }

    fn ensure_participant(&self, identity: &Participant) -> Result<(), ChatError> {
        if self.inner.participants.contains(identity) {
            Ok(())
        } else {
            Err(ChatError::UnknownParticipant(identity.to_string()))
        }
    }

    fn spawn_expiry(&self, identity: Participant, generation: u64) -> JoinHandle<()> {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(inner.expiry_window).await;
            inner.expire(&identity, generation).await;
        })
    }
}

impl TrackerInner {
    async fn expire(&self, identity: &Participant, generation: u64) {
        let mut timers = self.timers.lock().await;
        match timers.get_mut(identity) {
            Some(timer) if timer.generation == generation => timer.handle = None,
            _ => return,
        }

        let current = self.records.read().get(identity).cloned();
        let Some(current) = current.filter(PresenceRecord::is_online) else {
            return;
        };

        let record = PresenceRecord {
            status: PresenceStatus::Offline,
            ..current
        };
        self.commit(&record).await;
        self.publish(&record, "expiry");

        tracing::info!(
            identity = %identity,
            last_seen = ?record.last_seen,
            "Presence expired"
        );
    }

    /// Update the snapshot and write through. Storage failures are logged:
    /// the in-memory record stays authoritative and the next transition
    /// overwrites the stored row.
    async fn commit(&self, record: &PresenceRecord) {
        self.records
            .write()
            .insert(record.identity.clone(), record.clone());

        if let Err(e) = self.repo.upsert(record).await {
            tracing::warn!(identity = %record.identity, error = %e, "Failed to persist presence");
        }
    }

    fn publish(&self, record: &PresenceRecord, cause: &str) {
        record_presence_transition(record.status.as_str(), cause);
        self.hub.publish(HubEvent::Presence(record.clone()));
    }
}
