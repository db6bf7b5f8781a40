//! Time-keyed pass pricing.
//!
//! A registration created at or before the early-bird cutoff costs 2299;
//! anything later costs 2499. The cutoff is a wall-clock instant
//! (2026-02-15T23:59:59) interpreted in the deployment's UTC offset.

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, registration::Tier};

pub const EARLY_BIRD_AMOUNT: i64 = 2299;
pub const REGULAR_AMOUNT: i64 = 2499;

/// 2026-02-15T23:59:59 read as if it were UTC.
const CUTOFF_WALL_CLOCK_SECS: i64 = 1_771_199_999;

/// A `(tier, amount)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
  pub tier:   Tier,
  pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
  cutoff: DateTime<Utc>,
}

impl PricingPolicy {
  pub fn new(offset: FixedOffset) -> Self {
    Self::from_offset_secs(offset.local_minus_utc())
  }

  fn from_offset_secs(offset_secs: i32) -> Self {
    let shift = CUTOFF_WALL_CLOCK_SECS - i64::from(offset_secs);
    Self { cutoff: DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(shift) }
  }

  /// Build a policy from an offset in minutes east of UTC.
  pub fn with_offset_minutes(minutes: i32) -> Result<Self> {
    minutes
      .checked_mul(60)
      .and_then(FixedOffset::east_opt)
      .map(Self::new)
      .ok_or_else(|| {
        Error::Validation(format!("utc offset out of range: {minutes} minutes"))
      })
  }

  /// The last instant that still prices as early bird.
  pub fn cutoff(&self) -> DateTime<Utc> { self.cutoff }

  pub fn quote(&self, now: DateTime<Utc>) -> Quote {
    if now <= self.cutoff {
      Quote { tier: Tier::EarlyBird, amount: EARLY_BIRD_AMOUNT }
    } else {
      Quote { tier: Tier::Regular, amount: REGULAR_AMOUNT }
    }
  }
}

impl Default for PricingPolicy {
  /// UTC+05:30.
  fn default() -> Self {
    Self::from_offset_secs(330 * 60)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn ist() -> FixedOffset { FixedOffset::east_opt(330 * 60).unwrap() }

  #[test]
  fn cutoff_is_wall_clock_in_offset() {
    let policy = PricingPolicy::new(ist());
    let expected = ist().with_ymd_and_hms(2026, 2, 15, 23, 59, 59).unwrap();
    assert_eq!(policy.cutoff(), expected.with_timezone(&Utc));

    let utc = PricingPolicy::new(FixedOffset::east_opt(0).unwrap());
    assert_eq!(
      utc.cutoff(),
      Utc.with_ymd_and_hms(2026, 2, 15, 23, 59, 59).unwrap()
    );
  }

  #[test]
  fn at_cutoff_is_early_bird() {
    let policy = PricingPolicy::new(ist());
    let q = policy.quote(policy.cutoff());
    assert_eq!(q, Quote { tier: Tier::EarlyBird, amount: 2299 });
  }

  #[test]
  fn after_cutoff_is_regular() {
    let policy = PricingPolicy::new(ist());
    let q = policy.quote(policy.cutoff() + TimeDelta::milliseconds(1));
    assert_eq!(q, Quote { tier: Tier::Regular, amount: 2499 });
  }

  #[test]
  fn quote_is_pure() {
    let policy = PricingPolicy::default();
    let t = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap();
    assert_eq!(policy.quote(t), policy.quote(t));
    assert_eq!(policy.quote(t).tier, Tier::EarlyBird);
  }

  #[test]
  fn offset_minutes_bounds() {
    assert!(PricingPolicy::with_offset_minutes(330).is_ok());
    assert!(PricingPolicy::with_offset_minutes(-300).is_ok());
    assert!(PricingPolicy::with_offset_minutes(24 * 60).is_err());
  }
}
