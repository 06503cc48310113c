//! Strategy liveness check.
//!
//! Two staleness signals, either of which recommends a restart:
//! - the last successful tick is older than the threshold
//! - a lock file exists whose mtime is older than the threshold
//!   (an orphaned lock from a crashed tick keeps the strategy
//!   perpetually "busy" and needs operator attention)

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::UNIX_EPOCH;

use crate::error::Result;
use crate::persistence::StrategyRepository;

/// Configuration for the liveness check
#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    /// Seconds without a successful tick (or with a held lock) before the
    /// strategy is considered stale.
    pub max_stale_sec: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self { max_stale_sec: 180 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Healthy,
    Restart,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Restart => "restart",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one liveness check.
#[derive(Debug, Clone, Serialize)]
pub struct WatchdogReport {
    pub id: String,
    pub last_ok_at: Option<DateTime<Utc>>,
    /// Seconds since the last successful tick; `None` when the strategy
    /// has never completed one.
    pub stale_sec: Option<i64>,
    pub max_stale_sec: u64,
    pub lock_present: bool,
    pub lock_stale: bool,
    pub recommendation: Recommendation,
}

/// Check one strategy. Reads persisted state and lock metadata only;
/// performs no mutation.
pub fn check_strategy(
    repo: &StrategyRepository,
    id: &str,
    config: &WatchdogConfig,
    now: DateTime<Utc>,
) -> Result<WatchdogReport> {
    let state = repo.load_state(id)?;
    let last_ok_at = state.and_then(|s| s.last_ok_at);
    let stale_sec = last_ok_at.map(|t| (now - t).num_seconds());

    let lock_path = repo.lock_path(id);
    let lock_present = lock_path.exists();
    let lock_stale = if lock_present {
        match std::fs::metadata(&lock_path).and_then(|m| m.modified()) {
            Ok(mtime) => {
                let mtime_sec = mtime
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs() as i64)
                    .unwrap_or(0);
                now.timestamp() - mtime_sec > config.max_stale_sec as i64
            }
            // The lock vanished between the existence check and the stat;
            // treat as released.
            Err(_) => false,
        }
    } else {
        false
    };

    let never_succeeded_or_stale = stale_sec.is_none_or(|s| s > config.max_stale_sec as i64);
    let recommendation = if never_succeeded_or_stale || lock_stale {
        Recommendation::Restart
    } else {
        Recommendation::Healthy
    };

    Ok(WatchdogReport {
        id: id.to_string(),
        last_ok_at,
        stale_sec,
        max_stale_sec: config.max_stale_sec,
        lock_present,
        lock_stale,
        recommendation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RuntimeState;
    use chrono::Duration;

    fn repo() -> (tempfile::TempDir, StrategyRepository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = StrategyRepository::open(dir.path());
        (dir, repo)
    }

    #[test]
    fn fresh_success_is_healthy() {
        let (_dir, repo) = repo();
        let now = Utc::now();
        let mut state = RuntimeState::new("s1", now);
        state.last_ok_at = Some(now - Duration::seconds(30));
        repo.save_state("s1", &state).unwrap();

        let report = check_strategy(&repo, "s1", &WatchdogConfig::default(), now).unwrap();
        assert_eq!(report.recommendation, Recommendation::Healthy);
        assert!(!report.lock_present);
    }

    #[test]
    fn stale_success_recommends_restart() {
        let (_dir, repo) = repo();
        let now = Utc::now();
        let mut state = RuntimeState::new("s1", now);
        state.last_ok_at = Some(now - Duration::seconds(600));
        repo.save_state("s1", &state).unwrap();

        let report = check_strategy(&repo, "s1", &WatchdogConfig::default(), now).unwrap();
        assert_eq!(report.stale_sec, Some(600));
        assert_eq!(report.recommendation, Recommendation::Restart);
    }

    #[test]
    fn missing_state_recommends_restart() {
        let (_dir, repo) = repo();
        let report = check_strategy(&repo, "s1", &WatchdogConfig::default(), Utc::now()).unwrap();
        assert_eq!(report.stale_sec, None);
        assert_eq!(report.recommendation, Recommendation::Restart);
    }

    #[test]
    fn fresh_lock_is_not_stale() {
        let (_dir, repo) = repo();
        let now = Utc::now();
        let mut state = RuntimeState::new("s1", now);
        state.last_ok_at = Some(now);
        repo.save_state("s1", &state).unwrap();

        let _guard = repo.lock("s1").unwrap();
        let report = check_strategy(&repo, "s1", &WatchdogConfig::default(), now).unwrap();
        assert!(report.lock_present);
        assert!(!report.lock_stale);
        assert_eq!(report.recommendation, Recommendation::Healthy);
    }

    #[test]
    fn watchdog_does_not_mutate() {
        let (_dir, repo) = repo();
        let now = Utc::now();
        let state = RuntimeState::new("s1", now);
        repo.save_state("s1", &state).unwrap();
        let before = std::fs::read_to_string(repo.state_path("s1")).unwrap();

        check_strategy(&repo, "s1", &WatchdogConfig::default(), now).unwrap();
        let after = std::fs::read_to_string(repo.state_path("s1")).unwrap();
        assert_eq!(before, after);
        assert!(!repo.lock_path("s1").exists());
    }
}
