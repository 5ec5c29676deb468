//! Core module system for the ModKit host.
//!
//! This crate loads, initializes, and unloads native shared-library
//! modules at runtime, and keeps the cross-module type-identity registry
//! that lets independently compiled modules safely recognize each
//! other's objects.
//!
//! The pieces, leaves first:
//!
//! - [`loader`] — opens libraries and resolves the conventional entry
//!   symbols behind the narrow [`loader::ModuleCode`] interface
//! - [`uniqid`] — the unique-id allocator and cast guard
//! - [`registry`] — the loaded set and the init/deinit lifecycle
//! - [`eventbus`] — announces load/unload/error events to observers

pub mod config;
pub mod error;
pub mod event;
pub mod eventbus;
pub mod loader;
pub mod registry;
pub mod uniqid;

pub use config::ModuleDirs;
pub use error::{ModuleError, Result};
pub use event::{EventMetadata, HostEvent, ModuleInfo};
pub use eventbus::{
    DEFAULT_CHANNEL_CAPACITY, EventBus, EventBusReceiver, FilterBuilder, FilteredReceiver,
    SharedEventBus,
};
pub use registry::{ModuleRecord, ModuleRegistry, ModuleState};
pub use uniqid::{TypeTagged, UniqIdRegistry};

/// Re-exports commonly used types.
pub mod prelude {
    pub use crate::config::ModuleDirs;
    pub use crate::error::{ModuleError, Result};
    pub use crate::event::{HostEvent, ModuleInfo};
    pub use crate::eventbus::{EventBus, SharedEventBus};
    pub use crate::registry::{ModuleRegistry, ModuleState};
    pub use crate::uniqid::{TypeTagged, UniqIdRegistry};
}
