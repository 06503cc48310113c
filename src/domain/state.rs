use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::position::Position;

/// Trade action recorded against an idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Buy,
    Sell,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the idempotency key for an action at `now`.
///
/// Keys are bucketed to the minute: a tick re-run inside the same
/// 60-second window sees the prior entry and must not re-submit. A tick
/// that straddles a bucket boundary can structurally duplicate; the
/// per-strategy lock makes that window narrow and it is accepted.
pub fn idempotency_key(action: ActionKind, mint: &str, now: DateTime<Utc>) -> String {
    let bucket = now.timestamp_millis() / 60_000;
    format!("{}:{}:{}", action, mint, bucket)
}

/// Result of a settled (or deduplicated) action, kept per idempotency key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyEntry {
    /// When the action was recorded.
    pub t: DateTime<Utc>,
    /// Settlement reference, if the executor returned one.
    #[serde(default)]
    pub sig: Option<String>,
}

/// Durable per-strategy runtime state.
///
/// Mutated only by the tick orchestrator while holding the strategy lock,
/// persisted atomically at tick end. Every map carries a serde default so
/// state files written by older versions load cleanly with the missing
/// substructures treated as empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeState {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_tick_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_ok_at: Option<DateTime<Utc>>,
    /// Open positions keyed by mint; at most one lifecycle per mint.
    #[serde(default)]
    pub positions: BTreeMap<String, Position>,
    /// Settled action results keyed by `action:mint:minuteBucket`.
    #[serde(default)]
    pub idempotency: BTreeMap<String, IdempotencyEntry>,
    /// Re-entry suppression deadlines keyed by mint.
    #[serde(default)]
    pub cooldowns: BTreeMap<String, DateTime<Utc>>,
}

impl RuntimeState {
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at: now,
            last_tick_at: None,
            last_ok_at: None,
            positions: BTreeMap::new(),
            idempotency: BTreeMap::new(),
            cooldowns: BTreeMap::new(),
        }
    }

    /// Whether `mint` is still inside its post-exit cooldown at `now`.
    pub fn in_cooldown(&self, mint: &str, now: DateTime<Utc>) -> bool {
        self.cooldowns.get(mint).is_some_and(|until| *until > now)
    }

    pub fn open_position_count(&self) -> usize {
        self.positions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotency_key_buckets_to_the_minute() {
        // 1_700_000_040 is a minute boundary; t0 sits 40s into the bucket.
        let t0 = DateTime::from_timestamp(1_700_000_080, 0).unwrap();
        let t1 = t0 + chrono::Duration::seconds(19);
        let t2 = t0 + chrono::Duration::seconds(30);

        let k0 = idempotency_key(ActionKind::Buy, "MintA", t0);
        let k1 = idempotency_key(ActionKind::Buy, "MintA", t1);
        let k2 = idempotency_key(ActionKind::Buy, "MintA", t2);

        // t1 lands in the same bucket, t2 crosses the boundary.
        assert_eq!(k0, k1);
        assert_ne!(k0, k2);
        assert!(k0.starts_with("buy:MintA:"));
    }

    #[test]
    fn state_without_cooldowns_deserializes_as_empty_map() {
        let raw = r#"{
            "id": "s1",
            "created_at": "2026-01-01T00:00:00Z",
            "positions": {},
            "idempotency": {}
        }"#;
        let state: RuntimeState = serde_json::from_str(raw).unwrap();
        assert!(state.cooldowns.is_empty());
        assert!(state.last_ok_at.is_none());
    }

    #[test]
    fn cooldown_window() {
        let now = Utc::now();
        let mut state = RuntimeState::new("s1", now);
        state
            .cooldowns
            .insert("MintA".into(), now + chrono::Duration::seconds(60));
        assert!(state.in_cooldown("MintA", now));
        assert!(!state.in_cooldown("MintA", now + chrono::Duration::seconds(61)));
        assert!(!state.in_cooldown("MintB", now));
    }
}
