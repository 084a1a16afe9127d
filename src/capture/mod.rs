//! Platform collaborators
//!
//! Contracts for location delivery and output storage, plus in-process
//! implementations of both.

pub mod local;
pub mod loopback;
pub mod traits;

pub use local::{Announcement, LocalStorage, StorageMode};
pub use loopback::LoopbackLocationService;
pub use traits::{
    AnnounceFlags, LocationAuthorizer, LocationEvent, LocationListener, LocationService,
    MediaCategory, OutputRequest, OutputTarget, ProviderCatalog, ProviderId, ProviderStatus,
    RawLocation, StorageResolver, UpdateRequest,
};
