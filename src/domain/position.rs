use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Market venue a position was opened on.
///
/// Tokens start on a bonding curve and migrate to a pooled constant-product
/// market once the curve completes; the two venues quote and settle
/// differently, so every position records where it was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Venue {
    Bonding,
    Pool,
}

impl Venue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bonding => "bonding",
            Self::Pool => "pool",
        }
    }

    /// Route by the venue-completion flag reported for the token.
    pub fn from_complete(complete: bool) -> Self {
        if complete {
            Self::Pool
        } else {
            Self::Bonding
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Venue {
    type Err = &'static str;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bonding" | "curve" => Ok(Self::Bonding),
            "pool" | "amm" => Ok(Self::Pool),
            _ => Err("invalid venue; expected bonding|pool"),
        }
    }
}

/// An open position held by a strategy.
///
/// Created when an entry settles; removed when the exit settles or the
/// venue reports no remaining balance (treated as already closed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub mint: String,
    /// Token creator identity, required to route bonding-curve sells.
    pub creator: String,
    pub venue: Venue,
    pub opened_at: DateTime<Utc>,
    /// SOL spent on entry.
    pub buy_sol: Decimal,
    /// Settlement reference of the entry transaction.
    #[serde(default)]
    pub buy_sig: Option<String>,
    /// Discovery source that surfaced the token (or "force_mint").
    pub source: String,
    /// Completion flag observed at entry time.
    #[serde(default)]
    pub complete: bool,
}

impl Position {
    /// Age of the position in whole seconds at `now`.
    pub fn age_sec(&self, now: DateTime<Utc>) -> i64 {
        (now - self.opened_at).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    #[test]
    fn venue_routing_follows_completion_flag() {
        assert_eq!(Venue::from_complete(false), Venue::Bonding);
        assert_eq!(Venue::from_complete(true), Venue::Pool);
        assert_eq!("amm".parse::<Venue>().unwrap(), Venue::Pool);
    }

    #[test]
    fn position_age() {
        let now = Utc::now();
        let p = Position {
            mint: "MintA".into(),
            creator: "CreatorA".into(),
            venue: Venue::Bonding,
            opened_at: now - Duration::seconds(90),
            buy_sol: dec!(0.1),
            buy_sig: None,
            source: "trending".into(),
            complete: false,
        };
        assert_eq!(p.age_sec(now), 90);
    }
}
