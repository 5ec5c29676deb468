//! Error types for the module system.

use serde::Serialize;

/// Errors raised while loading a module.
///
/// Registry and cast lookups deliberately do not use this type: misses
/// there are routine on hot type-check paths and are reported as `None`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum ModuleError {
    /// A module with the same logical name is already loaded.
    #[error("module already loaded: {0}")]
    AlreadyLoaded(String),

    /// The library file was not found in any module directory.
    #[error("module not found: {0}")]
    NotFound(String),

    /// The platform loader failed to open or map the library.
    #[error("failed to load module {module}: {detail}")]
    Load { module: String, detail: String },

    /// The library opened but is missing the mandatory initializer.
    #[error("invalid module {module}: missing entry symbol `{symbol}`")]
    InvalidModule { module: String, symbol: String },
}

impl ModuleError {
    /// Logical name of the module this error concerns.
    pub fn module(&self) -> &str {
        match self {
            ModuleError::AlreadyLoaded(name) | ModuleError::NotFound(name) => name,
            ModuleError::Load { module, .. } | ModuleError::InvalidModule { module, .. } => module,
        }
    }

    /// Short kind tag used in logs and event payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            ModuleError::AlreadyLoaded(_) => "already_loaded",
            ModuleError::NotFound(_) => "not_found",
            ModuleError::Load { .. } => "load_failed",
            ModuleError::InvalidModule { .. } => "invalid_module",
        }
    }

    /// Diagnostic detail, where the failure carries one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ModuleError::Load { detail, .. } => Some(detail),
            ModuleError::InvalidModule { symbol, .. } => Some(symbol),
            _ => None,
        }
    }
}

/// Result alias for module loading operations.
pub type Result<T> = std::result::Result<T, ModuleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ModuleError::InvalidModule {
            module: "foo".to_string(),
            symbol: "foo_init".to_string(),
        };
        assert_eq!(err.to_string(), "invalid module foo: missing entry symbol `foo_init`");
        assert_eq!(err.module(), "foo");
        assert_eq!(err.kind(), "invalid_module");
        assert_eq!(err.detail(), Some("foo_init"));
    }

    #[test]
    fn already_loaded_has_no_detail() {
        let err = ModuleError::AlreadyLoaded("proxy".to_string());
        assert_eq!(err.module(), "proxy");
        assert!(err.detail().is_none());
    }
}
