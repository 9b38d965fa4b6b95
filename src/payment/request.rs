//! Payment requests

use crate::core::{normalize_asset, Output};
use crate::payment::PaymentError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Options of a multi-output payment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentOptions {
    /// Asset to pay in; `None` or `"base"` for the base asset
    pub asset: Option<String>,
    /// Pay from every address of this wallet
    pub wallet: Option<String>,
    /// Or pay from these addresses
    pub paying_addresses: Option<Vec<String>>,
    /// Pays the fee of an asset payment when the paying wallet holds no base
    /// asset
    pub fee_paying_wallet: Option<String>,
    /// Addresses that must sign although they do not pay
    pub signing_addresses: Vec<String>,
    pub to_address: Option<String>,
    pub amount: Option<u64>,
    /// Sweep every base-asset output to `to_address`
    pub send_all: bool,
    pub change_address: Option<String>,
    /// Only involve these devices in signing
    pub signing_device_addresses: Option<Vec<String>>,
    /// Device of the recipient, for private chains and notifications
    pub recipient_device_address: Option<String>,
    /// Proof revealed at local hidden-commitment leaves
    pub commitment_proof: Option<String>,
    pub base_outputs: Option<Vec<Output>>,
    pub asset_outputs: Option<Vec<Output>>,
    /// Application messages carried by the unit
    pub messages: Vec<Value>,
}

fn invalid(message: &str) -> Result<(), PaymentError> {
    Err(PaymentError::InvalidRequest(message.to_string()))
}

impl PaymentOptions {
    /// Asset with the base asset normalized to `None`
    pub fn asset(&self) -> Option<&str> {
        normalize_asset(self.asset.as_deref())
    }

    /// Reject contradictory or incomplete requests; reads nothing
    pub fn validate(&self) -> Result<(), PaymentError> {
        match (&self.wallet, &self.paying_addresses) {
            (None, None) => return invalid("neither wallet id nor paying addresses"),
            (Some(_), Some(_)) => return invalid("both wallet id and paying addresses"),
            (None, Some(addresses)) if addresses.is_empty() => {
                return invalid("empty list of paying addresses")
            }
            _ => {}
        }

        let has_outputs = self.base_outputs.is_some() || self.asset_outputs.is_some();
        if (self.to_address.is_some() || self.amount.is_some()) && has_outputs {
            return invalid("to_address and outputs at the same time");
        }
        if self.asset().is_none() && self.asset_outputs.is_some() {
            return invalid("base asset and asset outputs");
        }

        if self.send_all {
            if self.asset().is_some() {
                return invalid("send_all with asset");
            }
            if self.amount.is_some() {
                return invalid("send_all with amount");
            }
            if self.to_address.is_none() {
                return invalid("send_all without to_address");
            }
            return Ok(());
        }

        if self.change_address.is_none() {
            return invalid("no change address");
        }
        if self.to_address.is_some() && self.amount.is_none() {
            return invalid("to_address without amount");
        }
        if self.to_address.is_none() && !has_outputs {
            return invalid("no destination");
        }
        Ok(())
    }

    /// Amount the paying addresses should cover: the explicit amount or the
    /// sum of the outputs, plus `typical_fee` for base-asset payments. Zero
    /// when unknown.
    pub fn estimated_amount(&self, typical_fee: u64) -> Result<u64, PaymentError> {
        let outputs = if self.asset().is_some() {
            self.asset_outputs.as_deref()
        } else {
            self.base_outputs.as_deref()
        };

        let estimated = match (self.amount, outputs) {
            (Some(amount), _) => amount,
            (None, Some(outputs)) => outputs
                .iter()
                .try_fold(0u64, |sum, o| sum.checked_add(o.amount))
                .ok_or_else(|| PaymentError::InvalidRequest("output sum overflows".to_string()))?,
            (None, None) => 0,
        };

        if estimated > 0 && self.asset().is_none() {
            return estimated
                .checked_add(typical_fee)
                .ok_or_else(|| PaymentError::InvalidRequest("amount overflows".to_string()));
        }
        Ok(estimated)
    }
}
