//! Wallet notifications
//!
//! User-facing notifications raised while a payment is being authorized.

use tokio::sync::broadcast;

/// Default capacity of the notification channel
pub const EVENT_CAPACITY: usize = 64;

/// Notifications for the wallet UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// Signatures were requested from other devices; the user should
    /// confirm there
    ConfirmOnOtherDevices,
    /// A device refused to sign
    RefusedToSign { device_address: String },
    /// A payment was committed
    PaymentSent { unit: String },
}

/// Broadcast bus for [`WalletEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WalletEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscriber is not an error.
    pub fn emit(&self, event: WalletEvent) {
        if self.tx.send(event).is_err() {
            log::trace!("No subscribers for wallet event");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_CAPACITY)
    }
}
