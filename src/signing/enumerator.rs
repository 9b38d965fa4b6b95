//! Signing path enumeration
//!
//! Lists every path a definition needs authorized, tagged with the kind of
//! proof required there.

use crate::config::WalletConfig;
use crate::core::{ProofKind, SigningPath, SigningPaths};
use crate::signing::resolver::ResolveError;
use crate::storage::DefinitionStore;
use futures::future::{join_all, BoxFuture, FutureExt};
use std::sync::Arc;

/// Enumerates the leaves of an address definition
#[derive(Clone)]
pub struct SigningPathEnumerator {
    store: Arc<dyn DefinitionStore>,
    config: Arc<WalletConfig>,
}

impl SigningPathEnumerator {
    pub fn new(store: Arc<dyn DefinitionStore>, config: Arc<WalletConfig>) -> Self {
        Self { store, config }
    }

    /// All signing paths of `address`, optionally limited to members held by
    /// `allowed_devices`
    pub async fn enumerate(
        &self,
        address: &str,
        allowed_devices: Option<&[String]>,
    ) -> Result<SigningPaths, ResolveError> {
        self.go_deeper(address.to_string(), SigningPath::root(), allowed_devices, 0)
            .await
    }

    fn go_deeper<'a>(
        &'a self,
        member_address: String,
        prefix: SigningPath,
        allowed_devices: Option<&'a [String]>,
        depth: usize,
    ) -> BoxFuture<'a, Result<SigningPaths, ResolveError>> {
        async move {
            if depth > self.config.max_definition_depth {
                return Err(ResolveError::DefinitionTooDeep {
                    address: member_address,
                    limit: self.config.max_definition_depth,
                });
            }

            let mut paths = SigningPaths::new();

            let owned = self
                .store
                .owned_signing_paths(&member_address, allowed_devices)
                .await?;
            if !owned.is_empty() {
                for relative in owned {
                    paths.insert(prefix.extend(&relative), ProofKind::Key);
                }
                return Ok(paths);
            }

            let members = self
                .store
                .shared_memberships(&member_address, allowed_devices)
                .await?;
            if members.is_empty() {
                log::trace!("{} has no recorded definition, assuming a key", member_address);
                paths.insert(prefix, ProofKind::Key);
                return Ok(paths);
            }

            let mut branches = Vec::new();
            for member in members {
                let full_path = prefix.extend(&member.signing_path);
                if member.is_hidden_commitment() {
                    paths.insert(full_path, ProofKind::Commitment);
                } else {
                    branches.push(self.go_deeper(
                        member.address,
                        full_path,
                        allowed_devices,
                        depth + 1,
                    ));
                }
            }

            for branch in join_all(branches).await {
                merge_paths(&mut paths, branch?);
            }
            Ok(paths)
        }
        .boxed()
    }
}

/// Merge a branch result; paths are unique by construction, so a clash keeps
/// the first entry
fn merge_paths(into: &mut SigningPaths, branch: SigningPaths) {
    for (path, kind) in branch {
        if let Some(existing) = into.get(&path) {
            log::warn!(
                "Duplicate signing path {} ({:?} vs {:?})",
                path,
                existing,
                kind
            );
            continue;
        }
        into.insert(path, kind);
    }
}
