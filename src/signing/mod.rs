//! Signing path resolution and signature production
//!
//! - [`PathResolver`] classifies an (address, signing path) pair
//! - [`SigningPathEnumerator`] lists every path a definition requires
//! - [`SigningCoordinator`] is the signer handed to the composer
//! - [`SignatureRequests`] tracks signatures awaited from peer devices

pub mod coordinator;
pub mod enumerator;
pub mod requests;
pub mod resolver;

pub use coordinator::{LocalSigner, Signer, SigningCoordinator, SigningError};
pub use enumerator::SigningPathEnumerator;
pub use requests::{SignatureKey, SignatureRequests};
pub use resolver::{PathResolver, ResolveError};
