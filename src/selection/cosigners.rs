//! Cosigner closure
//!
//! Members of the paying or signing shared addresses whose own definition is
//! not final on the ledger have to sign too, and so do their members, until
//! nothing new turns up.

use crate::config::WalletConfig;
use crate::selection::SelectionError;
use crate::storage::DefinitionStore;
use std::collections::HashSet;
use std::sync::Arc;

/// Computes additional signing addresses
#[derive(Clone)]
pub struct CosignerClosureResolver {
    store: Arc<dyn DefinitionStore>,
    config: Arc<WalletConfig>,
}

impl CosignerClosureResolver {
    pub fn new(store: Arc<dyn DefinitionStore>, config: Arc<WalletConfig>) -> Self {
        Self { store, config }
    }

    /// Addresses that must also sign, in discovery order, excluding the
    /// inputs.
    ///
    /// Membership is acyclic on the ledger, so each round shrinks the
    /// remaining depth; the round cap only guards against corrupted data.
    pub async fn closure(
        &self,
        paying_addresses: &[String],
        signing_addresses: &[String],
        allowed_devices: Option<&[String]>,
    ) -> Result<Vec<String>, SelectionError> {
        let mut known: HashSet<String> = paying_addresses
            .iter()
            .chain(signing_addresses)
            .cloned()
            .collect();
        let mut frontier: Vec<String> = Vec::new();
        for address in paying_addresses.iter().chain(signing_addresses) {
            if !frontier.contains(address) {
                frontier.push(address.clone());
            }
        }

        let mut additional = Vec::new();
        let limit = self.config.max_closure_rounds;
        // `limit` discovery rounds, plus the query that finds nothing new
        for round in 0..=limit {
            if frontier.is_empty() {
                return Ok(additional);
            }
            let members = self
                .store
                .unfinalized_member_addresses(&frontier, allowed_devices)
                .await?;
            let discovered: Vec<String> = members
                .into_iter()
                .filter(|address| known.insert(address.clone()))
                .collect();
            if discovered.is_empty() {
                return Ok(additional);
            }
            if round == limit {
                break;
            }
            log::debug!("Closure round {} added {:?}", round, discovered);
            additional.extend(discovered.iter().cloned());
            frontier = discovered;
        }

        Err(SelectionError::ClosureDidNotConverge { rounds: limit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::testing::{self, path, LOCAL, PEER};
    use serde_json::json;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn resolver(store: Arc<MemoryStore>) -> CosignerClosureResolver {
        CosignerClosureResolver::new(store, Arc::new(testing::test_config()))
    }

    #[tokio::test]
    async fn test_transitive_members() {
        let resolver = resolver(testing::fixture_store());
        let additional = resolver.closure(&strings(&["S2"]), &[], None).await.unwrap();
        // B1 and the commitment leaves are not ours
        assert_eq!(additional, strings(&["S1", "M1", "A1"]));
    }

    #[tokio::test]
    async fn test_inputs_are_excluded() {
        let resolver = resolver(testing::fixture_store());
        let additional = resolver
            .closure(&strings(&["S2"]), &strings(&["A1"]), None)
            .await
            .unwrap();
        assert_eq!(additional, strings(&["S1", "M1"]));
    }

    #[tokio::test]
    async fn test_closure_is_idempotent() {
        let resolver = resolver(testing::fixture_store());
        let paying = strings(&["S2"]);
        let first = resolver.closure(&paying, &[], None).await.unwrap();
        let again = resolver.closure(&paying, &first, None).await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_finalized_members_skipped() {
        let store = testing::fixture_store();
        store
            .update(|t| {
                t.addresses.push("M1".to_string());
                t.add_unit("u-def", true, 5);
                t.address_definition_changes.push(crate::storage::DefinitionChangeRecord {
                    unit: "u-def".to_string(),
                    address: "M1".to_string(),
                    definition_chash: "CH1".to_string(),
                });
                t.definitions.push(crate::storage::DefinitionRecord {
                    definition_chash: "CH1".to_string(),
                    definition: json!(["sig", {}]),
                });
            })
            .await;
        let resolver = resolver(store);
        let additional = resolver.closure(&strings(&["S2"]), &[], None).await.unwrap();
        assert_eq!(additional, strings(&["S1", "A1"]));
    }

    #[tokio::test]
    async fn test_device_filter() {
        let resolver = resolver(testing::fixture_store());
        let devices = vec![PEER.to_string()];
        let additional = resolver
            .closure(&strings(&["S2"]), &[], Some(devices.as_slice()))
            .await
            .unwrap();
        assert!(additional.is_empty());
    }

    #[tokio::test]
    async fn test_round_cap() {
        let store = testing::fixture_store();
        store
            .update(|t| {
                for i in 0..5 {
                    let parent = format!("CH{}", i);
                    let child = format!("CH{}", i + 1);
                    t.add_shared_address(&parent, json!(["or", []]))
                        .add_member(&parent, path("r.0"), &child, LOCAL);
                }
                t.add_shared_address("CH5", json!(["or", []]));
            })
            .await;
        let mut config = testing::test_config();
        config.max_closure_rounds = 2;
        let resolver = CosignerClosureResolver::new(store, Arc::new(config));

        let err = resolver
            .closure(&strings(&["CH0"]), &[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, SelectionError::ClosureDidNotConverge { rounds: 2 }));
    }

    #[tokio::test]
    async fn test_converges_exactly_at_cap() {
        let store = testing::fixture_store();
        store
            .update(|t| {
                t.add_shared_address("P0", json!(["or", []]))
                    .add_member("P0", path("r.0"), "P1", LOCAL)
                    .add_shared_address("P1", json!(["or", []]));
            })
            .await;
        let mut config = testing::test_config();
        config.max_closure_rounds = 1;
        let resolver = CosignerClosureResolver::new(store, Arc::new(config));

        let additional = resolver.closure(&strings(&["P0"]), &[], None).await.unwrap();
        assert_eq!(additional, strings(&["P1"]));
    }
}
