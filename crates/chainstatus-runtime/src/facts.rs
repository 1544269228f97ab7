//! Wire format of the indexing runtime's sync facts, and its validation into
//! per-chain [`ChainFacts`] keyed by [`ChainId`].
//!
//! The runtime reports three maps keyed by chain *name*. They must describe
//! the same chains; anything else is rejected here, at the boundary.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use chainstatus_core::{BlockRef, ChainFacts, ChainId, ChainIndexingConfig, StatusError};

/// The only event ordering the status model understands.
pub const OMNICHAIN_ORDERING: &str = "omnichain";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeIndexingFacts {
    pub app_settings: AppSettings,
    pub chains_block_refs: BTreeMap<String, ChainBlockRefs>,
    pub chains_metrics: BTreeMap<String, ChainMetrics>,
    pub chains_statuses: BTreeMap<String, ChainSyncStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub ordering: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainBlockRefs {
    pub config: BlockRangeConfig,
    pub backfill_end_block: BlockRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRangeConfig {
    pub start_block: BlockRef,
    #[serde(default)]
    pub end_block: Option<BlockRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainMetrics {
    pub is_sync_complete: bool,
    pub is_sync_realtime: bool,
    /// Highest block the runtime has seen on the chain.
    pub sync_block: BlockRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSyncStatus {
    pub chain_id: ChainId,
    /// Latest block fully indexed.
    pub block: BlockRef,
}

impl RuntimeIndexingFacts {
    /// Validate and normalize into per-chain facts.
    ///
    /// Fails on a non-omnichain ordering, a chain missing from any of the
    /// three maps, a chain id claimed by two names, or an invalid block range.
    pub fn into_chain_facts(self) -> Result<BTreeMap<ChainId, ChainFacts>, StatusError> {
        if self.app_settings.ordering != OMNICHAIN_ORDERING {
            return Err(StatusError::UnsupportedOrdering(self.app_settings.ordering));
        }

        let names: BTreeSet<&String> = self
            .chains_block_refs
            .keys()
            .chain(self.chains_metrics.keys())
            .chain(self.chains_statuses.keys())
            .collect();
        if names.is_empty() {
            return Err(StatusError::NoChains);
        }

        let mut facts = BTreeMap::new();
        let mut owners: BTreeMap<ChainId, &String> = BTreeMap::new();

        for name in names {
            let missing = |map: &'static str| StatusError::MissingChain {
                chain: name.clone(),
                map,
            };
            let block_refs = self
                .chains_block_refs
                .get(name)
                .ok_or_else(|| missing("chainsBlockRefs"))?;
            let metrics = self
                .chains_metrics
                .get(name)
                .ok_or_else(|| missing("chainsMetrics"))?;
            let status = self
                .chains_statuses
                .get(name)
                .ok_or_else(|| missing("chainsStatuses"))?;

            if let Some(first) = owners.insert(status.chain_id, name) {
                return Err(StatusError::DuplicateChainId {
                    chain_id: status.chain_id,
                    first: first.clone(),
                    second: name.clone(),
                });
            }

            let config = ChainIndexingConfig::new(
                name,
                block_refs.config.start_block,
                block_refs.config.end_block,
            )?;

            facts.insert(
                status.chain_id,
                ChainFacts {
                    chain_id: status.chain_id,
                    config,
                    is_sync_complete: metrics.is_sync_complete,
                    is_sync_realtime: metrics.is_sync_realtime,
                    latest_indexed_block: status.block,
                    latest_known_block: metrics.sync_block,
                    backfill_end_block: block_refs.backfill_end_block,
                },
            );
        }

        Ok(facts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> serde_json::Value {
        json!({
            "appSettings": { "ordering": "omnichain" },
            "chainsBlockRefs": {
                "mainnet": {
                    "config": { "startBlock": { "number": 100, "timestamp": 1000 }, "endBlock": null },
                    "backfillEndBlock": { "number": 900, "timestamp": 9000 }
                },
                "base": {
                    "config": {
                        "startBlock": { "number": 10, "timestamp": 1100 },
                        "endBlock": { "number": 50, "timestamp": 1500 }
                    },
                    "backfillEndBlock": { "number": 50, "timestamp": 1500 }
                }
            },
            "chainsMetrics": {
                "mainnet": { "isSyncComplete": false, "isSyncRealtime": true, "syncBlock": { "number": 950, "timestamp": 9500 } },
                "base": { "isSyncComplete": true, "isSyncRealtime": false, "syncBlock": { "number": 50, "timestamp": 1500 } }
            },
            "chainsStatuses": {
                "mainnet": { "chainId": 1, "block": { "number": 940, "timestamp": 9400 } },
                "base": { "chainId": 8453, "block": { "number": 50, "timestamp": 1500 } }
            }
        })
    }

    fn parse(value: serde_json::Value) -> RuntimeIndexingFacts {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn valid_document_maps_by_chain_id() {
        let facts = parse(document()).into_chain_facts().unwrap();
        assert_eq!(facts.len(), 2);

        let mainnet = &facts[&ChainId(1)];
        assert!(!mainnet.config.is_definite());
        assert_eq!(mainnet.latest_indexed_block.number, 940);
        assert_eq!(mainnet.latest_known_block.number, 950);
        assert_eq!(mainnet.backfill_end_block.number, 900);
        assert!(mainnet.is_sync_realtime);

        let base = &facts[&ChainId(8453)];
        assert_eq!(base.config.end_block(), Some(BlockRef::new(50, 1500)));
        assert!(base.is_sync_complete);
    }

    #[test]
    fn missing_end_block_key_is_indefinite() {
        let mut doc = document();
        doc["chainsBlockRefs"]["mainnet"]["config"]
            .as_object_mut()
            .unwrap()
            .remove("endBlock");
        let facts = parse(doc).into_chain_facts().unwrap();
        assert!(!facts[&ChainId(1)].config.is_definite());
    }

    #[test]
    fn chain_missing_from_one_map_is_rejected() {
        let mut doc = document();
        doc["chainsMetrics"].as_object_mut().unwrap().remove("base");
        let err = parse(doc).into_chain_facts().unwrap_err();
        assert_eq!(
            err,
            StatusError::MissingChain {
                chain: "base".into(),
                map: "chainsMetrics"
            }
        );
    }

    #[test]
    fn duplicate_chain_id_is_rejected() {
        let mut doc = document();
        doc["chainsStatuses"]["base"]["chainId"] = json!(1);
        let err = parse(doc).into_chain_facts().unwrap_err();
        assert!(matches!(
            err,
            StatusError::DuplicateChainId { chain_id: ChainId(1), .. }
        ));
    }

    #[test]
    fn non_omnichain_ordering_is_rejected() {
        let mut doc = document();
        doc["appSettings"]["ordering"] = json!("multichain");
        let err = parse(doc).into_chain_facts().unwrap_err();
        assert_eq!(err, StatusError::UnsupportedOrdering("multichain".into()));
    }

    #[test]
    fn end_before_start_is_rejected() {
        let mut doc = document();
        doc["chainsBlockRefs"]["base"]["config"]["endBlock"] = json!({ "number": 5, "timestamp": 1050 });
        let err = parse(doc).into_chain_facts().unwrap_err();
        assert!(matches!(err, StatusError::InvalidConfig { .. }));
    }

    #[test]
    fn empty_document_has_no_chains() {
        let doc = json!({
            "appSettings": { "ordering": "omnichain" },
            "chainsBlockRefs": {}, "chainsMetrics": {}, "chainsStatuses": {}
        });
        assert_eq!(parse(doc).into_chain_facts().unwrap_err(), StatusError::NoChains);
    }
}
