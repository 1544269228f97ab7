//! API support gate: decides whether a request may be served given the
//! current indexing status and the handler's prerequisites.
//!
//! Checks run in a fixed order and the first failing check decides:
//!
//! 1. required plugins are active
//! 2. a successful snapshot is cached
//! 3. the required status is reachable and reached, and the worst-case
//!    distance is within bounds
//!
//! Pure: no I/O and no clock reads.

use std::sync::Arc;

use serde::Serialize;

use chainstatus_cache::CachedResult;
use chainstatus_core::{
    check_realtime, MaxWorstCaseDistance, OmnichainConfigType, OmnichainIndexingSnapshot,
    OmnichainStatusId, RealtimeOutcome, StatusError, UnixTimestamp,
};

use crate::config::PublicConfig;

/// What a handler needs before it can answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prerequisites {
    pub required_plugins: Vec<String>,
    pub required_status: Option<OmnichainStatusId>,
    pub max_worst_case_distance: Option<MaxWorstCaseDistance>,
}

impl Prerequisites {
    pub fn plugins<I, S>(plugins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required_plugins: plugins.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn status(mut self, status: OmnichainStatusId) -> Self {
        self.required_status = Some(status);
        self
    }

    pub fn max_worst_case_distance(mut self, distance: MaxWorstCaseDistance) -> Self {
        self.max_worst_case_distance = Some(distance);
        self
    }
}

/// Where indexing is now, against what was required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDetail {
    pub current_status: OmnichainStatusId,
    pub slowest_chain_indexing_cursor: Option<UnixTimestamp>,
    pub worst_case_distance: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_status: Option<OmnichainStatusId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_max_worst_case_distance: Option<MaxWorstCaseDistance>,
    pub server_now: UnixTimestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateResult {
    Ok(Arc<OmnichainIndexingSnapshot>),
    InsufficientIndexingProgress(ProgressDetail),
    ServiceUnavailable { detail: String, retryable: bool },
    InternalServerError(String),
}

impl GateResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

pub fn evaluate(
    cached: Option<&CachedResult<Arc<OmnichainIndexingSnapshot>, StatusError>>,
    config: &PublicConfig,
    prerequisites: &Prerequisites,
    now: UnixTimestamp,
) -> GateResult {
    let missing: Vec<&str> = prerequisites
        .required_plugins
        .iter()
        .map(String::as_str)
        .filter(|p| !config.has_plugin(p))
        .collect();
    if !missing.is_empty() {
        return GateResult::ServiceUnavailable {
            detail: format!("required plugins are not active: {}", missing.join(", ")),
            retryable: false,
        };
    }

    let snapshot = match cached.map(|c| &c.result) {
        Some(Ok(snapshot)) => snapshot,
        Some(Err(e)) => {
            return GateResult::ServiceUnavailable {
                detail: format!("indexing status is unavailable: {e}"),
                retryable: true,
            }
        }
        None => {
            return GateResult::ServiceUnavailable {
                detail: "indexing status has not been loaded yet".into(),
                retryable: true,
            }
        }
    };

    let current = snapshot.omnichain_status().id();
    let config_type = snapshot.config_type();

    if current == OmnichainStatusId::Completed && config_type == OmnichainConfigType::Indefinite {
        return GateResult::InternalServerError(
            "indexing status is completed but the indexing config is indefinite".into(),
        );
    }

    if prerequisites.required_status == Some(OmnichainStatusId::Completed)
        && config_type == OmnichainConfigType::Indefinite
    {
        return GateResult::ServiceUnavailable {
            detail: "completed indexing is required but indexing never completes".into(),
            retryable: false,
        };
    }

    let insufficient = |worst_case_distance| {
        GateResult::InsufficientIndexingProgress(ProgressDetail {
            current_status: current,
            slowest_chain_indexing_cursor: snapshot.slowest_chain_indexing_cursor(),
            worst_case_distance,
            required_status: prerequisites.required_status,
            required_max_worst_case_distance: prerequisites.max_worst_case_distance,
            server_now: now,
        })
    };

    if prerequisites
        .required_status
        .is_some_and(|required| current < required)
    {
        return insufficient(chainstatus_core::worst_case_distance(snapshot, now));
    }

    if let Some(max) = prerequisites.max_worst_case_distance {
        match check_realtime(Some(snapshot.as_ref()), max, now) {
            RealtimeOutcome::Satisfied(_) => {}
            RealtimeOutcome::NotSatisfied(check) => {
                return insufficient(Some(check.worst_case_distance))
            }
            RealtimeOutcome::Indeterminate => return insufficient(None),
        }
    }

    GateResult::Ok(Arc::clone(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainstatus_core::{
        BlockRef, ChainId, ChainIndexingStatus, DefiniteConfig, IndefiniteConfig,
    };
    use std::collections::BTreeMap;

    fn config(plugins: &[&str]) -> PublicConfig {
        PublicConfig::new("mainnet", plugins.iter().map(|p| p.to_string()).collect())
    }

    fn cached(chains: Vec<ChainIndexingStatus>) -> CachedResult<Arc<OmnichainIndexingSnapshot>, StatusError> {
        let map: BTreeMap<_, _> = chains
            .into_iter()
            .enumerate()
            .map(|(i, s)| (ChainId(i as u64 + 1), s))
            .collect();
        CachedResult::new(Ok(Arc::new(OmnichainIndexingSnapshot::build(map, 1_000).unwrap())))
    }

    fn following(ts: u64) -> ChainIndexingStatus {
        ChainIndexingStatus::Following {
            config: IndefiniteConfig {
                start_block: BlockRef::new(0, 0),
            },
            latest_indexed_block: BlockRef::new(10, ts),
            latest_known_block: BlockRef::new(10, ts),
            approximate_realtime_distance: 0,
        }
    }

    fn backfill(ts: u64) -> ChainIndexingStatus {
        ChainIndexingStatus::Backfill {
            config: IndefiniteConfig {
                start_block: BlockRef::new(0, 0),
            }
            .into(),
            latest_indexed_block: BlockRef::new(5, ts),
            latest_known_block: BlockRef::new(10, 2_000),
            backfill_end_block: BlockRef::new(10, 2_000),
        }
    }

    fn completed() -> ChainIndexingStatus {
        let config = DefiniteConfig {
            start_block: BlockRef::new(0, 0),
            end_block: BlockRef::new(10, 900),
        };
        ChainIndexingStatus::Completed {
            config,
            latest_indexed_block: config.end_block,
            latest_known_block: config.end_block,
        }
    }

    #[test]
    fn missing_plugin_is_not_retryable() {
        let status = cached(vec![following(1_000)]);
        let result = evaluate(
            Some(&status),
            &config(&["subgraph"]),
            &Prerequisites::plugins(["subgraph", "registrars"]),
            1_000,
        );
        match result {
            GateResult::ServiceUnavailable { detail, retryable } => {
                assert!(!retryable);
                assert!(detail.contains("registrars"));
                assert!(!detail.contains("subgraph,"));
            }
            other => panic!("expected service unavailable, got {other:?}"),
        }
    }

    #[test]
    fn plugins_are_checked_before_status() {
        let result = evaluate(None, &config(&[]), &Prerequisites::plugins(["subgraph"]), 0);
        assert!(matches!(result, GateResult::ServiceUnavailable { retryable: false, .. }));
    }

    #[test]
    fn missing_or_failed_status_is_retryable() {
        let none = evaluate(None, &config(&[]), &Prerequisites::default(), 0);
        assert!(matches!(none, GateResult::ServiceUnavailable { retryable: true, .. }));

        let failed = CachedResult::new(Err(StatusError::Runtime("down".into())));
        let result = evaluate(Some(&failed), &config(&[]), &Prerequisites::default(), 0);
        assert!(matches!(result, GateResult::ServiceUnavailable { retryable: true, .. }));
    }

    #[test]
    fn completed_unreachable_on_indefinite_config() {
        let status = cached(vec![following(1_000)]);
        let prereq = Prerequisites::default().status(OmnichainStatusId::Completed);
        let result = evaluate(Some(&status), &config(&[]), &prereq, 1_000);
        assert!(matches!(result, GateResult::ServiceUnavailable { retryable: false, .. }));
    }

    #[test]
    fn rank_below_required_is_insufficient() {
        let status = cached(vec![following(1_000), backfill(800)]);
        let prereq = Prerequisites::default().status(OmnichainStatusId::Following);
        match evaluate(Some(&status), &config(&[]), &prereq, 1_010) {
            GateResult::InsufficientIndexingProgress(detail) => {
                assert_eq!(detail.current_status, OmnichainStatusId::Backfill);
                assert_eq!(detail.required_status, Some(OmnichainStatusId::Following));
                assert_eq!(detail.slowest_chain_indexing_cursor, Some(800));
                assert_eq!(detail.worst_case_distance, Some(210));
            }
            other => panic!("expected insufficient progress, got {other:?}"),
        }
    }

    #[test]
    fn distance_bound_is_enforced() {
        let status = cached(vec![following(1_000)]);
        let prereq = Prerequisites::default().max_worst_case_distance(MaxWorstCaseDistance::from_secs(10));

        assert!(evaluate(Some(&status), &config(&[]), &prereq, 1_009).is_ok());

        match evaluate(Some(&status), &config(&[]), &prereq, 1_012) {
            GateResult::InsufficientIndexingProgress(detail) => {
                assert_eq!(detail.worst_case_distance, Some(12));
                assert_eq!(
                    detail.required_max_worst_case_distance,
                    Some(MaxWorstCaseDistance::from_secs(10))
                );
            }
            other => panic!("expected insufficient progress, got {other:?}"),
        }
    }

    #[test]
    fn completed_definite_satisfies_following() {
        let status = cached(vec![completed()]);
        let prereq = Prerequisites::default().status(OmnichainStatusId::Following);
        assert!(evaluate(Some(&status), &config(&[]), &prereq, 1_000).is_ok());
    }
}
