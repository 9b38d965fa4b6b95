//! Payment orchestration
//!
//! Validates a payment, selects the paying, fee-paying and signing addresses,
//! builds the signer and hands everything to the composer.

use crate::compose::{ComposeError, ComposeParams, Composer, ComposerKind, PreCommitHook};
use crate::context::WalletContext;
use crate::core::Output;
use crate::network::{DeviceMessage, WalletEvent};
use crate::payment::forwarder::{CosignerScope, PrivatePaymentForwarder};
use crate::payment::request::PaymentOptions;
use crate::payment::PaymentError;
use crate::selection::{CosignerClosureResolver, FundedAddressSelector, FundingSource};
use crate::signing::{LocalSigner, SignatureKey, SigningCoordinator};
use std::sync::Arc;

/// Addresses taking part in one payment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FundingPlan {
    /// Addresses paying the amount
    pub funded: Vec<String>,
    /// Base-asset addresses paying the fee of an asset payment
    pub fee_paying: Vec<String>,
    /// Requested signing addresses followed by the cosigner closure
    pub signing: Vec<String>,
}

/// Entry point for payments
pub struct PaymentOrchestrator {
    ctx: WalletContext,
    composer: Arc<dyn Composer>,
    selector: FundedAddressSelector,
    cosigners: CosignerClosureResolver,
}

impl PaymentOrchestrator {
    pub fn new(ctx: WalletContext, composer: Arc<dyn Composer>) -> Self {
        let selector =
            FundedAddressSelector::new(ctx.store.clone(), composer.clone(), ctx.config.clone());
        let cosigners = CosignerClosureResolver::new(ctx.store.clone(), ctx.config.clone());
        Self {
            ctx,
            composer,
            selector,
            cosigners,
        }
    }

    pub fn context(&self) -> &WalletContext {
        &self.ctx
    }

    /// Pay `amount` of `asset` from `wallet` to a single recipient
    #[allow(clippy::too_many_arguments)]
    pub async fn send_payment(
        &self,
        asset: Option<&str>,
        wallet: &str,
        to_address: &str,
        amount: u64,
        change_address: &str,
        signing_device_addresses: Option<Vec<String>>,
        recipient_device_address: Option<&str>,
        local_signer: Arc<dyn LocalSigner>,
    ) -> Result<String, PaymentError> {
        let opts = PaymentOptions {
            asset: asset.map(str::to_string),
            wallet: Some(wallet.to_string()),
            to_address: Some(to_address.to_string()),
            amount: Some(amount),
            change_address: Some(change_address.to_string()),
            signing_device_addresses,
            recipient_device_address: recipient_device_address.map(str::to_string),
            ..Default::default()
        };
        self.send_multi_payment(opts, local_signer).await
    }

    /// Compose, sign and save a payment; returns the unit id
    pub async fn send_multi_payment(
        &self,
        opts: PaymentOptions,
        local_signer: Arc<dyn LocalSigner>,
    ) -> Result<String, PaymentError> {
        opts.validate()?;
        let asset = opts.asset();
        let estimated = opts.estimated_amount(self.ctx.config.typical_fee)?;

        let source = match (&opts.wallet, &opts.paying_addresses) {
            (Some(wallet), _) => FundingSource::Wallet(wallet.clone()),
            (None, Some(addresses)) => FundingSource::Addresses(addresses.clone()),
            (None, None) => {
                return Err(PaymentError::InvalidRequest(
                    "neither wallet id nor paying addresses".to_string(),
                ))
            }
        };
        let devices = opts.signing_device_addresses.as_deref();

        let plan = self
            .read_funded_and_signing_addresses(
                asset,
                &source,
                estimated,
                opts.fee_paying_wallet.as_deref(),
                &opts.signing_addresses,
                devices,
            )
            .await?;
        if plan.funded.is_empty() {
            return Err(PaymentError::NoFundedAddresses);
        }
        if asset.is_some() && plan.fee_paying.is_empty() {
            return Err(PaymentError::NoFeeAddresses);
        }

        let asset_info = match asset {
            Some(asset) => Some(
                self.ctx
                    .store
                    .read_asset(asset)
                    .await?
                    .ok_or_else(|| PaymentError::UnknownAsset(asset.to_string()))?,
            ),
            None => None,
        };
        let kind = ComposerKind::for_asset(asset_info.as_ref());

        let mut coordinator = SigningCoordinator::new(self.ctx.clone(), local_signer);
        if let Some(devices) = &opts.signing_device_addresses {
            coordinator = coordinator.with_allowed_devices(devices.clone());
        }
        if let Some(proof) = &opts.commitment_proof {
            coordinator = coordinator.with_commitment_proof(proof.clone());
        }

        let mut params = ComposeParams {
            asset: asset.map(str::to_string),
            available_paying_addresses: plan.funded,
            available_fee_paying_addresses: Vec::new(),
            signing_addresses: plan.signing,
            signer: Arc::new(coordinator),
            outputs: Vec::new(),
            asset_outputs: Vec::new(),
            to_address: None,
            amount: None,
            change_address: opts.change_address.clone(),
            send_all: false,
            tolerance_plus: None,
            tolerance_minus: None,
            messages: opts.messages.clone(),
            pre_commit: None,
        };

        match &asset_info {
            Some(info) => {
                params.available_fee_paying_addresses = plan.fee_paying;
                if opts.to_address.is_some() {
                    params.to_address = opts.to_address.clone();
                    params.amount = opts.amount;
                } else {
                    params.asset_outputs = opts.asset_outputs.clone().unwrap_or_default();
                    // Destinations only; the composer adds base change
                    params.outputs = opts.base_outputs.clone().unwrap_or_default();
                }
                if info.is_private {
                    let scope = match &source {
                        FundingSource::Wallet(wallet) => CosignerScope::Wallet(wallet.clone()),
                        FundingSource::Addresses(addresses) => {
                            CosignerScope::Addresses(addresses.clone())
                        }
                    };
                    let hook: Arc<dyn PreCommitHook> = Arc::new(PrivatePaymentForwarder::new(
                        self.ctx.network.clone(),
                        opts.recipient_device_address.clone(),
                        scope,
                    ));
                    params.pre_commit = Some(hook);
                }
                if kind == ComposerKind::IndivisibleAsset {
                    params.tolerance_plus = Some(0);
                    params.tolerance_minus = Some(0);
                }
            }
            None => {
                if opts.send_all {
                    let to_address = opts.to_address.clone().unwrap_or_default();
                    params.send_all = true;
                    params.outputs = vec![Output::new(to_address, 0)];
                } else {
                    let mut outputs = match (&opts.to_address, opts.amount) {
                        (Some(to_address), Some(amount)) => vec![Output::new(to_address.clone(), amount)],
                        _ => opts.base_outputs.clone().unwrap_or_default(),
                    };
                    if let Some(change_address) = &opts.change_address {
                        outputs.push(Output::new(change_address.clone(), 0));
                    }
                    params.outputs = outputs;
                }
            }
        }

        log::debug!("Composing {} payment: {:?}", kind, params);
        let outcome = self
            .composer
            .compose_and_save(kind, params)
            .await
            .map_err(|e| match e {
                ComposeError::NotEnoughFunds(message) => PaymentError::NotEnoughFunds(message),
                other => PaymentError::Compose(other),
            })?;

        if outcome.recipient_chains.is_none() {
            if let Some(device) = &opts.recipient_device_address {
                if let Err(e) = self
                    .ctx
                    .network
                    .send_payment_notification(device, &outcome.unit)
                    .await
                {
                    log::warn!("Payment notification to {} failed: {}", device, e);
                }
            }
        }

        log::info!("Payment {} saved", outcome.unit);
        self.ctx.events.emit(WalletEvent::PaymentSent {
            unit: outcome.unit.clone(),
        });
        Ok(outcome.unit)
    }

    /// Funded addresses for the amount, base-asset addresses for the fee of
    /// an asset payment, and every address that must sign
    pub async fn read_funded_and_signing_addresses(
        &self,
        asset: Option<&str>,
        source: &FundingSource,
        estimated_amount: u64,
        fee_paying_wallet: Option<&str>,
        signing_addresses: &[String],
        signing_device_addresses: Option<&[String]>,
    ) -> Result<FundingPlan, PaymentError> {
        let funded: Vec<String> = self
            .selector
            .select(asset, source, estimated_amount)
            .await?
            .into_iter()
            .map(|f| f.address)
            .collect();
        if funded.is_empty() {
            return Ok(FundingPlan::default());
        }

        let typical_fee = self.ctx.config.typical_fee;
        let mut fee_paying = Vec::new();
        if asset.is_some() {
            fee_paying = self.base_addresses(source, typical_fee).await?;
            let same_wallet =
                matches!((source, fee_paying_wallet), (FundingSource::Wallet(w), Some(f)) if w == f);
            if fee_paying.is_empty() && !same_wallet {
                if let Some(fee_wallet) = fee_paying_wallet {
                    log::debug!("Paying fees from wallet {}", fee_wallet);
                    let fallback = FundingSource::Wallet(fee_wallet.to_string());
                    fee_paying = self.base_addresses(&fallback, typical_fee).await?;
                }
            }
        }

        let mut paying = funded.clone();
        for address in &fee_paying {
            if !paying.contains(address) {
                paying.push(address.clone());
            }
        }
        let additional = self
            .cosigners
            .closure(&paying, signing_addresses, signing_device_addresses)
            .await?;

        let mut signing = signing_addresses.to_vec();
        signing.extend(additional);
        Ok(FundingPlan {
            funded,
            fee_paying,
            signing,
        })
    }

    async fn base_addresses(
        &self,
        source: &FundingSource,
        target: u64,
    ) -> Result<Vec<String>, PaymentError> {
        Ok(self
            .selector
            .select(None, source, target)
            .await?
            .into_iter()
            .map(|f| f.address)
            .collect())
    }

    /// Route an inbound device message. Returns whether a pending signature
    /// request was completed.
    pub async fn handle_device_message(&self, from_device: &str, message: DeviceMessage) -> bool {
        match message {
            DeviceMessage::Signature {
                address,
                signing_path,
                signed_text,
                signature,
            } => {
                let key = SignatureKey::new(from_device, &address, &signing_path, &signed_text);
                self.ctx.requests.resolve(&key, &signature).await > 0
            }
            other => {
                log::debug!("Ignoring {} from {}", other.type_name(), from_device);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AssetInfo, FundedAddress, REFUSED_SIGNATURE};
    use crate::crypto::{digest_base64, unit_hash_to_sign};
    use crate::storage::MemoryStore;
    use crate::testing::{
        self, path, CountingStore, Forward, RecordingNetwork, ScriptedComposer, TestSigner, LOCAL,
        PEER,
    };
    use std::sync::atomic::Ordering;

    fn asset(name: &str, fixed_denominations: bool, is_private: bool) -> AssetInfo {
        AssetInfo {
            asset: name.to_string(),
            fixed_denominations,
            is_private,
        }
    }

    fn payment_store() -> Arc<MemoryStore> {
        let mut tables = testing::fixture_snapshot();
        tables
            .add_unit("u1", true, 1)
            .add_output("u1", "A1", None, 5_000)
            .add_output("u1", "A2", None, 3_000)
            .add_output("u1", "A1", Some("priv"), 100)
            .add_output("u1", "A2", Some("fixed"), 10)
            .add_output("u1", "M1", Some("orphan"), 50)
            .add_asset(asset("priv", false, true))
            .add_asset(asset("fixed", true, false))
            .add_asset(asset("orphan", false, false));
        Arc::new(MemoryStore::new(tables))
    }

    struct Harness {
        orchestrator: PaymentOrchestrator,
        network: Arc<RecordingNetwork>,
        composer: Arc<ScriptedComposer>,
    }

    fn harness(composer: ScriptedComposer) -> Harness {
        let network = Arc::new(RecordingNetwork::default());
        let composer = Arc::new(composer);
        let ctx = testing::test_context(payment_store(), network.clone());
        Harness {
            orchestrator: PaymentOrchestrator::new(ctx, composer.clone()),
            network,
            composer,
        }
    }

    fn signer() -> Arc<TestSigner> {
        Arc::new(TestSigner::default())
    }

    #[tokio::test]
    async fn test_base_payment() {
        let h = harness(ScriptedComposer::default());
        let mut events = h.orchestrator.context().events.subscribe();

        let unit = h
            .orchestrator
            .send_payment(None, "w1", "X", 1000, "CH", None, None, signer())
            .await
            .unwrap();
        assert_eq!(unit, "UNIT-1");

        let record = &h.composer.records()[0];
        assert_eq!(record.kind, ComposerKind::Base);
        assert_eq!(record.paying_addresses, vec!["A2", "A1"]);
        assert_eq!(record.outputs, vec![Output::new("X", 1000), Output::new("CH", 0)]);
        assert!(record.committed);
        assert!(record.signatures.iter().all(|(_, _, sig)| sig.starts_with("sig-w1")));
        assert_eq!(
            events.recv().await.unwrap(),
            WalletEvent::PaymentSent {
                unit: "UNIT-1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_send_all() {
        let h = harness(ScriptedComposer::default());
        let opts = PaymentOptions {
            wallet: Some("w1".to_string()),
            to_address: Some("X".to_string()),
            send_all: true,
            ..Default::default()
        };
        h.orchestrator.send_multi_payment(opts, signer()).await.unwrap();

        let record = &h.composer.records()[0];
        assert!(record.send_all);
        assert_eq!(record.outputs, vec![Output::new("X", 0)]);
    }

    #[tokio::test]
    async fn test_invalid_request_touches_nothing() {
        let store = Arc::new(CountingStore::new(MemoryStore::new(testing::fixture_snapshot())));
        let network = Arc::new(RecordingNetwork::default());
        let composer = Arc::new(ScriptedComposer::default());
        let ctx = WalletContext::new(testing::test_config(), store.clone(), network.clone());
        let orchestrator = PaymentOrchestrator::new(ctx, composer.clone());

        let opts = PaymentOptions {
            wallet: Some("w1".to_string()),
            paying_addresses: Some(vec!["A1".to_string()]),
            to_address: Some("X".to_string()),
            amount: Some(10),
            change_address: Some("CH".to_string()),
            ..Default::default()
        };
        let err = orchestrator.send_multi_payment(opts, signer()).await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidRequest(_)));
        assert_eq!(store.queries(), 0);
        assert!(composer.records().is_empty());
        assert!(network.sent().is_empty());

        // A valid request does reach the store
        let opts = PaymentOptions {
            wallet: Some("w1".to_string()),
            to_address: Some("X".to_string()),
            amount: Some(10),
            change_address: Some("CH".to_string()),
            ..Default::default()
        };
        let _ = orchestrator.send_multi_payment(opts, signer()).await;
        assert!(store.queries() > 0);
    }

    #[tokio::test]
    async fn test_no_funded_addresses() {
        let h = harness(ScriptedComposer::default());
        let err = h
            .orchestrator
            .send_payment(None, "w3", "X", 10, "CH", None, None, signer())
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::NoFundedAddresses));
        assert_eq!(err.to_string(), "There are no funded addresses");
    }

    #[tokio::test]
    async fn test_fee_wallet_fallback() {
        let h = harness(ScriptedComposer::default());
        let devices = Some(vec![LOCAL.to_string()]);

        let err = h
            .orchestrator
            .send_payment(Some("orphan"), "w2", "X", 10, "CH", devices.clone(), None, signer())
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::NoFeeAddresses));

        let opts = PaymentOptions {
            asset: Some("orphan".to_string()),
            wallet: Some("w2".to_string()),
            fee_paying_wallet: Some("w1".to_string()),
            to_address: Some("X".to_string()),
            amount: Some(10),
            change_address: Some("CH".to_string()),
            signing_device_addresses: devices,
            ..Default::default()
        };
        h.orchestrator.send_multi_payment(opts, signer()).await.unwrap();

        let record = &h.composer.records()[0];
        assert_eq!(record.kind, ComposerKind::DivisibleAsset);
        assert_eq!(record.paying_addresses, vec!["M1"]);
        assert_eq!(record.fee_paying_addresses, vec!["A2", "A1"]);
    }

    #[tokio::test]
    async fn test_indivisible_asset() {
        let h = harness(ScriptedComposer::default());
        h.orchestrator
            .send_payment(Some("fixed"), "w1", "X", 1, "CH", None, None, signer())
            .await
            .unwrap();
        assert_eq!(h.composer.records()[0].kind, ComposerKind::IndivisibleAsset);
    }

    #[tokio::test]
    async fn test_private_payment_forwards_before_commit() {
        let h = harness(ScriptedComposer::with_private_chains());
        h.orchestrator
            .send_payment(Some("priv"), "w1", "X", 10, "CH", None, Some(PEER), signer())
            .await
            .unwrap();

        let sent = h.network.sent();
        assert_eq!(sent.len(), 1);
        assert!(matches!(sent[0].1, DeviceMessage::PrivatePayments { .. }));
        assert_eq!(
            h.network.forwards(),
            vec![Forward::WalletMembers(vec!["w1".to_string()])]
        );
        assert!(h.composer.records()[0].committed);
    }

    #[tokio::test]
    async fn test_forwarding_failure_aborts_commit() {
        let h = harness(ScriptedComposer::with_private_chains());
        h.network.fail_forwards.store(true, Ordering::SeqCst);

        let err = h
            .orchestrator
            .send_payment(Some("priv"), "w1", "X", 10, "CH", None, Some(PEER), signer())
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Compose(ComposeError::PreCommit(_))));
        assert!(!h.composer.records()[0].committed);
    }

    #[tokio::test]
    async fn test_public_payment_notification() {
        let h = harness(ScriptedComposer::default());
        h.orchestrator
            .send_payment(None, "w1", "X", 1000, "CH", None, Some(PEER), signer())
            .await
            .unwrap();

        let sent = h.network.sent();
        assert_eq!(
            sent,
            vec![(
                PEER.to_string(),
                DeviceMessage::PaymentNotification {
                    unit: "UNIT-1".to_string()
                }
            )]
        );
    }

    #[tokio::test]
    async fn test_not_enough_funds() {
        let h = harness(ScriptedComposer {
            not_enough_funds: true,
            ..Default::default()
        });
        let err = h
            .orchestrator
            .send_payment(None, "w1", "X", 1000, "CH", None, None, signer())
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::NotEnoughFunds(_)));
    }

    #[tokio::test]
    async fn test_cosigners_join_signing_addresses() {
        let h = harness(ScriptedComposer::default());
        *h.composer.sorted_funded.lock().unwrap() = vec![FundedAddress::new("S1", 10_000)];

        let plan = h
            .orchestrator
            .read_funded_and_signing_addresses(
                None,
                &FundingSource::Addresses(vec!["S1".to_string()]),
                2_000,
                None,
                &["EXTRA".to_string()],
                None,
            )
            .await
            .unwrap();
        assert_eq!(plan.funded, vec!["S1"]);
        assert!(plan.fee_paying.is_empty());
        assert_eq!(plan.signing, vec!["EXTRA", "A1"]);
    }

    /// Answer the first sign offer the way a peer device would
    async fn peer_answers(h: &Harness, signature: &str) {
        loop {
            let offer = h.network.sent().into_iter().find_map(|(_, m)| match m {
                DeviceMessage::SignOffer {
                    address,
                    signing_path,
                    unsigned_unit,
                    ..
                } => Some((address, signing_path, unsigned_unit)),
                _ => None,
            });
            if let Some((address, signing_path, unsigned_unit)) = offer {
                let reply = DeviceMessage::Signature {
                    address,
                    signing_path,
                    signed_text: digest_base64(&unit_hash_to_sign(&unsigned_unit)),
                    signature: signature.to_string(),
                };
                assert!(h.orchestrator.handle_device_message(PEER, reply).await);
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_remote_cosigner_round_trip() {
        let h = harness(ScriptedComposer::default());
        *h.composer.sorted_funded.lock().unwrap() = vec![FundedAddress::new("M1", 10_000)];
        let opts = PaymentOptions {
            paying_addresses: Some(vec!["M1".to_string()]),
            to_address: Some("X".to_string()),
            amount: Some(100),
            change_address: Some("CH".to_string()),
            ..Default::default()
        };

        let (unit, _) = tokio::join!(
            h.orchestrator.send_multi_payment(opts, signer()),
            peer_answers(&h, "PEER-SIG")
        );
        assert_eq!(unit.unwrap(), "UNIT-1");

        let signatures = &h.composer.records()[0].signatures;
        assert!(signatures.contains(&("M1".to_string(), path("r.1"), "PEER-SIG".to_string())));
        assert!(signatures
            .iter()
            .any(|(a, p, s)| a == "M1" && p == &path("r.0") && s.starts_with("sig-w2")));
    }

    #[tokio::test]
    async fn test_refusal_is_passed_to_composer() {
        let h = harness(ScriptedComposer::default());
        *h.composer.sorted_funded.lock().unwrap() = vec![FundedAddress::new("M1", 10_000)];
        let mut events = h.orchestrator.context().events.subscribe();
        let opts = PaymentOptions {
            paying_addresses: Some(vec!["M1".to_string()]),
            to_address: Some("X".to_string()),
            amount: Some(100),
            change_address: Some("CH".to_string()),
            ..Default::default()
        };

        let (unit, _) = tokio::join!(
            h.orchestrator.send_multi_payment(opts, signer()),
            peer_answers(&h, REFUSED_SIGNATURE)
        );
        assert!(unit.is_ok());
        assert_eq!(events.recv().await.unwrap(), WalletEvent::ConfirmOnOtherDevices);
        assert_eq!(
            events.recv().await.unwrap(),
            WalletEvent::RefusedToSign {
                device_address: PEER.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unrelated_messages_ignored() {
        let h = harness(ScriptedComposer::default());
        let handled = h
            .orchestrator
            .handle_device_message(PEER, DeviceMessage::PaymentNotification { unit: "U".to_string() })
            .await;
        assert!(!handled);
    }
}
