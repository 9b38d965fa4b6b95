//! Storage module: the definition store interface and its in-memory,
//! snapshot-persisted implementation

pub mod memory;
pub mod persistence;
pub mod store;

pub use memory::{
    AuthorRecord, DefinitionChangeRecord, DefinitionRecord, MembershipRecord, MemoryStore,
    OutputRecord, OwnedAddressRecord, Sequence, SharedAddressRecord, StoreSnapshot, UnitRecord,
    WalletRecord, WalletSigningPathRecord,
};
pub use persistence::{SnapshotConfig, SnapshotStorage};
pub use store::{device_allowed, DefinitionStore, MembershipRow, OwnedAddressRow, StoreError};
