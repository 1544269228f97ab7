//! Realtime distance: how far behind realtime the index could be, in the
//! worst case, and whether that is within a caller's tolerance.

use std::num::IntErrorKind;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StatusError;
use crate::omnichain::{OmnichainIndexingSnapshot, OmnichainIndexingStatus};
use crate::types::UnixTimestamp;

/// Worst-case distance (seconds) below which indexed data may stand in for a
/// live on-chain call. Fixed; independent of any caller-supplied tolerance.
pub const ACCELERATION_MAX_WORST_CASE_DISTANCE: u64 = 60;

// ─── MaxWorstCaseDistance ─────────────────────────────────────────────────────

/// A validated, non-negative tolerance in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaxWorstCaseDistance(u64);

impl MaxWorstCaseDistance {
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub const fn as_secs(&self) -> u64 {
        self.0
    }

    /// Parse caller input. Negative, fractional and non-numeric values are
    /// rejected, never clamped.
    pub fn parse(raw: &str) -> Result<Self, StatusError> {
        let trimmed = raw.trim();
        let invalid = |reason: &str| StatusError::InvalidDistance {
            raw: raw.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if trimmed.starts_with('-') {
            return Err(invalid("must be non-negative"));
        }
        match trimmed.parse::<u64>() {
            Ok(secs) => Ok(Self(secs)),
            Err(e) if *e.kind() == IntErrorKind::PosOverflow => Err(invalid("out of range")),
            Err(_) if trimmed.parse::<f64>().is_ok() => Err(invalid("must be an integer")),
            Err(_) => Err(invalid("must be a non-negative integer number of seconds")),
        }
    }
}

impl FromStr for MaxWorstCaseDistance {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<i64> for MaxWorstCaseDistance {
    type Error = StatusError;

    fn try_from(secs: i64) -> Result<Self, Self::Error> {
        u64::try_from(secs)
            .map(Self)
            .map_err(|_| StatusError::InvalidDistance {
                raw: secs.to_string(),
                reason: "must be non-negative".into(),
            })
    }
}

impl std::fmt::Display for MaxWorstCaseDistance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.0)
    }
}

// ─── Worst-case distance ──────────────────────────────────────────────────────

/// `server_now − slowest_chain_indexing_cursor`, clamped at zero.
///
/// `None` when no bound can be given: the omnichain status is `Unstarted`
/// or no chain has an indexed block yet.
pub fn worst_case_distance(
    snapshot: &OmnichainIndexingSnapshot,
    server_now: UnixTimestamp,
) -> Option<u64> {
    if matches!(snapshot.omnichain_status(), OmnichainIndexingStatus::Unstarted) {
        return None;
    }
    snapshot
        .slowest_chain_indexing_cursor()
        .map(|cursor| server_now.saturating_sub(cursor))
}

/// The figures behind a realtime decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeCheck {
    pub requested_max_worst_case_distance: MaxWorstCaseDistance,
    pub slowest_chain_indexing_cursor: UnixTimestamp,
    pub worst_case_distance: u64,
    pub server_now: UnixTimestamp,
}

/// Outcome of [`check_realtime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealtimeOutcome {
    /// `worst_case_distance <= requested`.
    Satisfied(RealtimeCheck),
    /// `worst_case_distance > requested`.
    NotSatisfied(RealtimeCheck),
    /// No snapshot, or no bound can be computed from it.
    Indeterminate,
}

impl RealtimeOutcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied(_))
    }

    pub fn check(&self) -> Option<&RealtimeCheck> {
        match self {
            Self::Satisfied(check) | Self::NotSatisfied(check) => Some(check),
            Self::Indeterminate => None,
        }
    }
}

/// Is the index within `requested` seconds of realtime as of `server_now`?
pub fn check_realtime(
    snapshot: Option<&OmnichainIndexingSnapshot>,
    requested: MaxWorstCaseDistance,
    server_now: UnixTimestamp,
) -> RealtimeOutcome {
    let Some(snapshot) = snapshot else {
        return RealtimeOutcome::Indeterminate;
    };
    let (Some(worst_case_distance), Some(cursor)) = (
        worst_case_distance(snapshot, server_now),
        snapshot.slowest_chain_indexing_cursor(),
    ) else {
        return RealtimeOutcome::Indeterminate;
    };

    let check = RealtimeCheck {
        requested_max_worst_case_distance: requested,
        slowest_chain_indexing_cursor: cursor,
        worst_case_distance,
        server_now,
    };
    if worst_case_distance <= requested.as_secs() {
        RealtimeOutcome::Satisfied(check)
    } else {
        RealtimeOutcome::NotSatisfied(check)
    }
}

/// Whether protocol resolution may answer from indexed data instead of a
/// live on-chain call.
pub fn can_accelerate(
    snapshot: Option<&OmnichainIndexingSnapshot>,
    server_now: UnixTimestamp,
) -> bool {
    snapshot
        .and_then(|s| worst_case_distance(s, server_now))
        .is_some_and(|d| d < ACCELERATION_MAX_WORST_CASE_DISTANCE)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
