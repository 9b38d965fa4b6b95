//! Funded address selection
//!
//! Ranks a wallet's addresses by spendable balance against a target and trims
//! the list to the addresses that plausibly take part in paying it. The final
//! covering subset is picked by the composer.

use crate::compose::Composer;
use crate::config::WalletConfig;
use crate::core::FundedAddress;
use crate::selection::SelectionError;
use crate::storage::DefinitionStore;
use std::cmp::{Ordering, Reverse};
use std::sync::Arc;

/// Where the paying addresses come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FundingSource {
    /// Every address of a wallet
    Wallet(String),
    /// An explicit list of addresses
    Addresses(Vec<String>),
}

/// Selects funded addresses for a payment
#[derive(Clone)]
pub struct FundedAddressSelector {
    store: Arc<dyn DefinitionStore>,
    composer: Arc<dyn Composer>,
    config: Arc<WalletConfig>,
}

impl FundedAddressSelector {
    pub fn new(
        store: Arc<dyn DefinitionStore>,
        composer: Arc<dyn Composer>,
        config: Arc<WalletConfig>,
    ) -> Self {
        Self {
            store,
            composer,
            config,
        }
    }

    /// Funded addresses of `source` in `asset` (`None` for base), ordered
    /// for paying `target`. A zero target means the amount is not known.
    pub async fn select(
        &self,
        asset: Option<&str>,
        source: &FundingSource,
        target: u64,
    ) -> Result<Vec<FundedAddress>, SelectionError> {
        let wallet = match source {
            FundingSource::Addresses(addresses) => {
                return Ok(self
                    .composer
                    .read_sorted_funded_addresses(asset, addresses, target)
                    .await?);
            }
            FundingSource::Wallet(wallet) => wallet,
        };

        read_wallet_funded_addresses(
            self.store.as_ref(),
            asset,
            wallet,
            target,
            self.config.max_fee,
        )
        .await
    }
}

/// Funded addresses of a wallet, ordered for `target` and trimmed to the
/// ones that plausibly take part in paying it
pub async fn read_wallet_funded_addresses(
    store: &dyn DefinitionStore,
    asset: Option<&str>,
    wallet: &str,
    target: u64,
    max_fee: u64,
) -> Result<Vec<FundedAddress>, SelectionError> {
    let mut rows = store.funded_totals(wallet, asset).await?;
    order_funded(&mut rows, target);

    let mut target = target;
    if let Some(asset) = asset {
        let info = store
            .read_asset(asset)
            .await?
            .ok_or_else(|| SelectionError::UnknownAsset(asset.to_string()))?;
        // Denomination-aware selection happens in the composer
        if info.fixed_denominations {
            target = 0;
        }
    }

    let selected = filter_most_funded(rows, target, max_fee);
    log::debug!(
        "Selected {} funded addresses of wallet {} for {}",
        selected.len(),
        wallet,
        target
    );
    Ok(selected)
}

/// Order candidates for a target: addresses covering it first, then by
/// distance to it. Without a target, largest first.
pub fn order_funded(rows: &mut [FundedAddress], target: u64) {
    if target == 0 {
        rows.sort_by(|a, b| {
            b.total
                .cmp(&a.total)
                .then_with(|| a.address.cmp(&b.address))
        });
        return;
    }
    rows.sort_by(|a, b| {
        let key = |f: &FundedAddress| (Reverse(f.total > target), f.total.abs_diff(target));
        match key(a).cmp(&key(b)) {
            Ordering::Equal => a.address.cmp(&b.address),
            other => other,
        }
    });
}

/// Keep leading candidates until their sum exceeds `target` plus the fee
/// allowance. Without a target every candidate is kept.
pub fn filter_most_funded(rows: Vec<FundedAddress>, target: u64, max_fee: u64) -> Vec<FundedAddress> {
    if target == 0 {
        return rows;
    }
    let threshold = target.saturating_add(max_fee);
    let mut accumulated: u64 = 0;
    let mut selected = Vec::new();
    for row in rows {
        accumulated = accumulated.saturating_add(row.total);
        selected.push(row);
        if accumulated > threshold {
            break;
        }
    }
    selected
}
