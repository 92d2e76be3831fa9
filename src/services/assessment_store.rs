// In-memory record of each user's latest assessment result, bounded by TTL and capacity.

use crate::services::scoring::{overall_risk_of, RiskLevel, ScoreBand};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentProgress {
    pub phq9: Option<ScoreBand>,
    pub gad7: Option<ScoreBand>,
    pub overall_risk: RiskLevel,
    pub recorded_at: DateTime<Utc>,
}

impl AssessmentProgress {
    pub fn new(phq9: Option<ScoreBand>, gad7: Option<ScoreBand>) -> Self {
        let overall_risk = overall_risk_of(phq9.as_ref(), gad7.as_ref());
        Self {
            phq9,
            gad7,
            overall_risk,
            recorded_at: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct AssessmentStore {
    // user id -> (progress, stored at)
    entries: Arc<Mutex<HashMap<String, (AssessmentProgress, Instant)>>>,
    ttl: Duration,
    capacity: usize,
}

impl AssessmentStore {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, (AssessmentProgress, Instant)>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record(&self, user_id: &str, progress: AssessmentProgress) {
        self.record_at(user_id, progress, Instant::now());
    }

    pub fn get(&self, user_id: &str) -> Option<AssessmentProgress> {
        self.get_at(user_id, Instant::now())
    }

    /// Returns true if an entry was removed.
    pub fn clear(&self, user_id: &str) -> bool {
        self.lock().remove(user_id).is_some()
    }

    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, stored_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(stored_at) > self.ttl
    }

    fn record_at(&self, user_id: &str, progress: AssessmentProgress, now: Instant) {
        let mut entries = self.lock();
        if !entries.contains_key(user_id) && entries.len() >= self.capacity {
            let ttl = self.ttl;
            entries.retain(|_, (_, stored_at)| now.saturating_duration_since(*stored_at) <= ttl);

            if entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, (_, stored_at))| *stored_at)
                    .map(|(key, _)| key.clone());
                if let Some(key) = oldest {
                    tracing::debug!(user_id = %key, "assessment store full, evicting oldest entry");
                    entries.remove(&key);
                }
            }
        }
        entries.insert(user_id.to_string(), (progress, now));
    }

    fn get_at(&self, user_id: &str, now: Instant) -> Option<AssessmentProgress> {
        let mut entries = self.lock();
        let expired = match entries.get(user_id) {
            Some((progress, stored_at)) if !self.is_expired(*stored_at, now) => {
                return Some(progress.clone())
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(user_id);
        }
        None
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, (_, stored_at)| now.saturating_duration_since(*stored_at) <= ttl);
        before - entries.len()
    }
}
