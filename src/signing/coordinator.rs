//! Signature production for the composer
//!
//! The coordinator is the signer handed to the transaction composer. It
//! sizes signing paths, looks up definitions, and produces each signature
//! locally, by asking a peer device, or by revealing a commitment proof.

use crate::context::WalletContext;
use crate::core::{KeyDerivation, ProofKind, SignerClassification, SigningPath, REFUSED_SIGNATURE};
use crate::crypto::{digest_base64, unit_hash_to_sign};
use crate::network::{NetworkError, WalletEvent};
use crate::signing::enumerator::SigningPathEnumerator;
use crate::signing::requests::SignatureKey;
use crate::signing::resolver::{PathResolver, ResolveError};
use crate::storage::StoreError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Signing errors
#[derive(Error, Debug)]
pub enum SigningError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Definition not found: {0}")]
    DefinitionNotFound(String),
    #[error("No signer known for {address} at {signing_path}")]
    UnknownSigner {
        address: String,
        signing_path: SigningPath,
    },
    #[error("Commitment proof for {signing_path} must come from a peer")]
    ProofMustComeFromPeer { signing_path: SigningPath },
    #[error("No commitment proof supplied for {signing_path}")]
    MissingCommitmentProof { signing_path: SigningPath },
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("Device {device_address} did not sign {address} at {signing_path} in time")]
    RemoteSignatureTimedOut {
        device_address: String,
        address: String,
        signing_path: SigningPath,
    },
    #[error("Signature request to {device_address} was cancelled")]
    RemoteRequestCancelled { device_address: String },
    #[error("Local signing failed: {0}")]
    LocalSigningFailed(String),
}

/// Produces signatures with keys held on this device
#[async_trait]
pub trait LocalSigner: Send + Sync {
    async fn sign(&self, key: &KeyDerivation, digest: &[u8]) -> Result<String, SigningError>;
}

/// Signer capability consumed by the composer
#[async_trait]
pub trait Signer: Send + Sync {
    /// Expected byte length of the proof at each signing path of `address`.
    /// Commitment paths are missing when no proof was supplied.
    async fn signing_path_lengths(
        &self,
        address: &str,
    ) -> Result<BTreeMap<SigningPath, usize>, SigningError>;

    /// Definition of `address`
    async fn definition(&self, address: &str) -> Result<Value, SigningError>;

    /// Signature or proof for `address` at `signing_path`
    async fn sign(
        &self,
        unsigned_unit: &Value,
        private_payloads: Option<&Value>,
        address: &str,
        signing_path: &SigningPath,
    ) -> Result<String, SigningError>;
}

/// Signer bound to one payment
pub struct SigningCoordinator {
    ctx: WalletContext,
    resolver: PathResolver,
    enumerator: SigningPathEnumerator,
    local_signer: Arc<dyn LocalSigner>,
    allowed_devices: Option<Vec<String>>,
    commitment_proof: Option<String>,
    confirmation_requested: AtomicBool,
}

impl SigningCoordinator {
    pub fn new(ctx: WalletContext, local_signer: Arc<dyn LocalSigner>) -> Self {
        let resolver = PathResolver::new(ctx.store.clone(), ctx.config.clone());
        let enumerator = SigningPathEnumerator::new(ctx.store.clone(), ctx.config.clone());
        Self {
            ctx,
            resolver,
            enumerator,
            local_signer,
            allowed_devices: None,
            commitment_proof: None,
            confirmation_requested: AtomicBool::new(false),
        }
    }

    /// Only enumerate paths held by these devices
    pub fn with_allowed_devices(mut self, devices: Vec<String>) -> Self {
        self.allowed_devices = Some(devices);
        self
    }

    /// Proof revealed for local hidden-commitment leaves
    pub fn with_commitment_proof(mut self, proof: String) -> Self {
        self.commitment_proof = Some(proof);
        self
    }

    async fn request_remote(
        &self,
        device_address: String,
        unsigned_unit: &Value,
        private_payloads: Option<&Value>,
        address: &str,
        signing_path: &SigningPath,
        digest: &[u8],
    ) -> Result<String, SigningError> {
        let key = SignatureKey::new(&device_address, address, signing_path, &digest_base64(digest));
        let (rx, is_new) = self.ctx.requests.register(key.clone()).await;

        if is_new {
            log::info!("Requesting signature of {} {} from {}", address, signing_path, device_address);
            if let Err(e) = self
                .ctx
                .network
                .send_sign_offer(&device_address, address, signing_path, unsigned_unit, private_payloads)
                .await
            {
                self.ctx.requests.cancel(&key).await;
                return Err(e.into());
            }
            if !self.confirmation_requested.swap(true, Ordering::SeqCst) {
                self.ctx.events.emit(WalletEvent::ConfirmOnOtherDevices);
            }
        }

        let received = match self.ctx.config.remote_sign_timeout() {
            Some(limit) => tokio::time::timeout(limit, rx).await.ok(),
            None => Some(rx.await),
        };
        let Some(received) = received else {
            // Callers that joined later keep their own deadlines
            self.ctx.requests.abandon(&key).await;
            return Err(SigningError::RemoteSignatureTimedOut {
                device_address,
                address: address.to_string(),
                signing_path: signing_path.clone(),
            });
        };

        let signature = received.map_err(|_| SigningError::RemoteRequestCancelled {
            device_address: device_address.clone(),
        })?;

        if signature == REFUSED_SIGNATURE {
            log::warn!("Device {} refused to sign {} {}", device_address, address, signing_path);
            self.ctx
                .events
                .emit(WalletEvent::RefusedToSign { device_address });
        }
        Ok(signature)
    }
}

#[async_trait]
impl Signer for SigningCoordinator {
    async fn signing_path_lengths(
        &self,
        address: &str,
    ) -> Result<BTreeMap<SigningPath, usize>, SigningError> {
        let paths = self
            .enumerator
            .enumerate(address, self.allowed_devices.as_deref())
            .await?;

        let mut lengths = BTreeMap::new();
        for (path, kind) in paths {
            match kind {
                ProofKind::Key => {
                    lengths.insert(path, self.ctx.config.signature_length);
                }
                ProofKind::Commitment => {
                    if let Some(proof) = &self.commitment_proof {
                        lengths.insert(path, proof.len());
                    }
                }
            }
        }
        Ok(lengths)
    }

    /// # Panics
    ///
    /// Panics when more than one distinct definition is recorded.
    async fn definition(&self, address: &str) -> Result<Value, SigningError> {
        let mut definitions = self.ctx.store.definitions(address).await?;
        match definitions.len() {
            0 => Err(SigningError::DefinitionNotFound(address.to_string())),
            1 => Ok(definitions.remove(0)),
            n => panic!("{} definitions recorded for {}", n, address),
        }
    }

    async fn sign(
        &self,
        unsigned_unit: &Value,
        private_payloads: Option<&Value>,
        address: &str,
        signing_path: &SigningPath,
    ) -> Result<String, SigningError> {
        let digest = unit_hash_to_sign(unsigned_unit);
        let classification = self.resolver.resolve(address, signing_path).await?;
        log::debug!("Signing {} {} via {}", address, signing_path, classification);

        match classification {
            SignerClassification::Local(key) => self.local_signer.sign(&key, &digest).await,
            SignerClassification::Remote { device_address } => {
                self.request_remote(
                    device_address,
                    unsigned_unit,
                    private_payloads,
                    address,
                    signing_path,
                    &digest,
                )
                .await
            }
            SignerClassification::HiddenCommitment { is_local: true } => self
                .commitment_proof
                .clone()
                .ok_or_else(|| SigningError::MissingCommitmentProof {
                    signing_path: signing_path.clone(),
                }),
            SignerClassification::HiddenCommitment { is_local: false } => {
                Err(SigningError::ProofMustComeFromPeer {
                    signing_path: signing_path.clone(),
                })
            }
            SignerClassification::Unknown => Err(SigningError::UnknownSigner {
                address: address.to_string(),
                signing_path: signing_path.clone(),
            }),
        }
    }
}
