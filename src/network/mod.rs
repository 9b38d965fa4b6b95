//! Device networking
//!
//! Provides the boundary towards paired devices:
//! - Device message types (sign offers, signatures, private payments)
//! - The dispatch trait implemented by the transport
//! - Wallet notifications (confirm on other devices, refusals)

pub mod dispatch;
pub mod events;
pub mod message;

pub use dispatch::{DeviceNetwork, NetworkError};
pub use events::{EventBus, WalletEvent, EVENT_CAPACITY};
pub use message::DeviceMessage;
