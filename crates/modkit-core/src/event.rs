//! Host events announcing module lifecycle changes.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ModuleError;

/// Cloneable snapshot of a loaded module.
///
/// Events carry this snapshot rather than the registry record itself:
/// the record exclusively owns the library handle and cannot be cloned
/// onto a broadcast channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleInfo {
    /// Logical module name derived from the library path.
    pub name: String,
    /// Path or name the module was loaded from.
    pub path: PathBuf,
    /// When the module finished loading.
    pub loaded_at: DateTime<Utc>,
}

/// Events published on the host event bus.
#[derive(Debug, Clone, Serialize)]
pub enum HostEvent {
    /// A module was loaded and its initializer has run.
    ModuleLoaded { module: ModuleInfo },

    /// A module is being unloaded. Emitted after the module leaves the
    /// loaded set but before its finalizer runs, so observers can react
    /// without calling back into code that is about to vanish.
    ModuleUnloaded { module: ModuleInfo },

    /// A load attempt failed.
    ModuleError { error: ModuleError },
}

impl HostEvent {
    /// Variant name, for logging and assertions.
    pub fn type_name(&self) -> &'static str {
        match self {
            HostEvent::ModuleLoaded { .. } => "ModuleLoaded",
            HostEvent::ModuleUnloaded { .. } => "ModuleUnloaded",
            HostEvent::ModuleError { .. } => "ModuleError",
        }
    }

    /// Logical module name the event concerns.
    pub fn module_name(&self) -> &str {
        match self {
            HostEvent::ModuleLoaded { module } | HostEvent::ModuleUnloaded { module } => {
                &module.name
            }
            HostEvent::ModuleError { error } => error.module(),
        }
    }

    /// Whether this is a load-failure event.
    pub fn is_error(&self) -> bool {
        matches!(self, HostEvent::ModuleError { .. })
    }
}

/// Metadata attached to every published event.
#[derive(Debug, Clone, Serialize)]
pub struct EventMetadata {
    /// Component that published the event.
    pub source: String,
    /// Publish time, milliseconds since the epoch.
    pub timestamp: i64,
}

impl EventMetadata {
    /// Create metadata with the current timestamp.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str) -> ModuleInfo {
        ModuleInfo {
            name: name.to_string(),
            path: PathBuf::from(format!("/tmp/lib{name}.so")),
            loaded_at: Utc::now(),
        }
    }

    #[test]
    fn event_accessors() {
        let ev = HostEvent::ModuleLoaded { module: info("foo") };
        assert_eq!(ev.type_name(), "ModuleLoaded");
        assert_eq!(ev.module_name(), "foo");
        assert!(!ev.is_error());

        let ev = HostEvent::ModuleError {
            error: ModuleError::AlreadyLoaded("bar".to_string()),
        };
        assert_eq!(ev.module_name(), "bar");
        assert!(ev.is_error());
    }

    #[test]
    fn metadata_records_source() {
        let meta = EventMetadata::new("registry");
        assert_eq!(meta.source, "registry");
        assert!(meta.timestamp > 0);
    }
}
