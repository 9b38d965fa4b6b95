//! Device message types
//!
//! Messages exchanged between paired devices while authorizing a payment.

use crate::core::{PrivateChain, SigningPath};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Device-to-device messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "subject", content = "body", rename_all = "snake_case")]
pub enum DeviceMessage {
    /// Ask a device to sign a unit for one of its addresses
    SignOffer {
        address: String,
        signing_path: SigningPath,
        unsigned_unit: Value,
        private_payloads: Option<Value>,
    },

    /// A signature (or the refusal sentinel) for a previous offer
    Signature {
        address: String,
        signing_path: SigningPath,
        /// Base64 digest that was signed
        signed_text: String,
        signature: String,
    },

    /// Private payment chains for the recipient or cosigners
    PrivatePayments {
        chains: Vec<PrivateChain>,
        forwarded: bool,
    },

    /// A public payment was sent to the device owner
    PaymentNotification { unit: String },
}

impl DeviceMessage {
    /// Serialize message to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize message from bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    /// Get message type name for logging
    pub fn type_name(&self) -> &'static str {
        match self {
            DeviceMessage::SignOffer { .. } => "SignOffer",
            DeviceMessage::Signature { .. } => "Signature",
            DeviceMessage::PrivatePayments { .. } => "PrivatePayments",
            DeviceMessage::PaymentNotification { .. } => "PaymentNotification",
        }
    }
}
