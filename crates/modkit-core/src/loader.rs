//! Shared-library loader for native modules.
//!
//! Wraps `libloading` behind a narrow capability interface: a loaded
//! module exposes exactly two operations, initialize and finalize. All
//! unsafe foreign-function plumbing lives here; the registry never touches
//! raw symbols.

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::{Path, PathBuf};

use libloading::Library;

use crate::config::ModuleDirs;
use crate::error::{ModuleError, Result};

/// Conventional entry-point signature: no parameters, no return value.
pub type ModuleEntryFn = unsafe extern "C" fn();

/// The two operations a loaded module exposes to the host.
///
/// The initializer is trusted native code; it runs synchronously on the
/// host control thread and is expected to register tags and capabilities.
pub trait ModuleCode {
    /// Run the mandatory `"<name>_init"` entry point.
    fn initialize(&self);

    /// Run the optional `"<name>_deinit"` entry point, if the library
    /// exports one. Absence is not an error.
    fn finalize(&self);
}

/// Derive the logical module name from a library path or bare name:
/// strip directory components, the platform `lib` prefix, and the
/// platform shared-object suffix.
pub fn module_name_from_path(path: &str) -> String {
    let file = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path);
    let file = file.strip_prefix(DLL_PREFIX).unwrap_or(file);
    let file = file.strip_suffix(DLL_SUFFIX).unwrap_or(file);
    file.to_string()
}

/// Whether a path names a shared-library file on this platform.
pub fn is_module_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| DLL_SUFFIX.strip_prefix('.') == Some(ext))
        .unwrap_or(false)
}

/// Resolve `path_or_name` to the library file to open.
///
/// Absolute paths are taken verbatim. Anything else is resolved against
/// the system module directory first and the per-user directory second;
/// a bare name (no extension) is expanded to the platform library
/// filename (`libfoo.so`) before the search.
fn resolve_path(dirs: &ModuleDirs, path_or_name: &str, name: &str) -> Result<PathBuf> {
    let given = Path::new(path_or_name);
    if given.is_absolute() {
        return Ok(given.to_path_buf());
    }

    let relative: PathBuf = if given.extension().is_some() {
        given.to_path_buf()
    } else {
        PathBuf::from(libloading::library_filename(path_or_name))
    };

    for dir in dirs.search_order() {
        let candidate = dir.join(&relative);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(ModuleError::NotFound(name.to_string()))
}

/// Open the library behind `path_or_name`.
pub fn open_library(dirs: &ModuleDirs, path_or_name: &str, name: &str) -> Result<Library> {
    let path = resolve_path(dirs, path_or_name, name)?;
    unsafe { Library::new(&path) }.map_err(|e| ModuleError::Load {
        module: name.to_string(),
        detail: e.to_string(),
    })
}

/// Resolve an entry symbol to a callable function pointer, `None` when
/// the library does not export it. The pointer stays valid for as long
/// as the library is open.
pub fn resolve(library: &Library, symbol: &str) -> Option<ModuleEntryFn> {
    unsafe { library.get::<ModuleEntryFn>(symbol.as_bytes()) }
        .ok()
        .map(|sym| *sym)
}

/// A native module: the open library plus its resolved initializer.
///
/// Owns the library handle exclusively; dropping the value closes it, and
/// the registry guarantees exactly one drop per handle.
pub struct NativeModule {
    library: Library,
    name: String,
    // Valid while `library` is open; never escapes this struct.
    init: ModuleEntryFn,
}

impl NativeModule {
    /// Open the library and resolve the mandatory initializer.
    ///
    /// On a missing initializer the just-opened library is dropped before
    /// the error is returned, so nothing leaks on this path.
    pub fn load(dirs: &ModuleDirs, path_or_name: &str, name: &str) -> Result<Self> {
        let library = open_library(dirs, path_or_name, name)?;

        let symbol = modkit_module_sdk::init_symbol(name);
        let Some(init) = resolve(&library, &symbol) else {
            // `library` drops here, closing the handle.
            return Err(ModuleError::InvalidModule {
                module: name.to_string(),
                symbol,
            });
        };

        Ok(Self {
            library,
            name: name.to_string(),
            init,
        })
    }
}

impl ModuleCode for NativeModule {
    fn initialize(&self) {
        unsafe { (self.init)() }
    }

    fn finalize(&self) {
        // Resolved at finalize time, matching the lifecycle contract:
        // the symbol is optional and only consulted during unload.
        let symbol = modkit_module_sdk::deinit_symbol(&self.name);
        if let Some(deinit) = resolve(&self.library, &symbol) {
            unsafe { deinit() }
        }
    }
}

impl std::fmt::Debug for NativeModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeModule")
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_derivation_strips_dirs_prefix_and_suffix() {
        let file = format!("plugins/{DLL_PREFIX}foo{DLL_SUFFIX}");
        assert_eq!(module_name_from_path(&file), "foo");
    }

    #[test]
    fn name_derivation_bare_name_is_identity() {
        assert_eq!(module_name_from_path("foo"), "foo");
    }

    #[test]
    fn name_derivation_absolute_path() {
        let file = format!("/usr/lib/modkit/modules/{DLL_PREFIX}stats{DLL_SUFFIX}");
        assert_eq!(module_name_from_path(&file), "stats");
    }

    #[test]
    fn module_file_detection() {
        let file = PathBuf::from(format!("{DLL_PREFIX}foo{DLL_SUFFIX}"));
        assert!(is_module_file(&file));
        assert!(!is_module_file(Path::new("foo.txt")));
        assert!(!is_module_file(Path::new("foo")));
    }

    #[test]
    fn bare_name_missing_everywhere_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = ModuleDirs::new(tmp.path(), None);
        let err = open_library(&dirs, "nosuch", "nosuch").unwrap_err();
        assert_eq!(err, ModuleError::NotFound("nosuch".to_string()));
    }

    #[test]
    fn absolute_path_bypasses_search_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = ModuleDirs::new(tmp.path(), None);
        let bogus = tmp.path().join("libempty.so");
        std::fs::write(&bogus, b"not a shared object").unwrap();

        // The file exists, so resolution succeeds and the platform loader
        // rejects the contents.
        let err = open_library(&dirs, bogus.to_str().unwrap(), "empty").unwrap_err();
        assert!(matches!(err, ModuleError::Load { .. }));
    }

    #[test]
    fn relative_path_resolves_against_module_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let user = tempfile::tempdir().unwrap();
        let file = format!("{DLL_PREFIX}garbage{DLL_SUFFIX}");
        std::fs::write(user.path().join(&file), b"junk").unwrap();

        let dirs = ModuleDirs::new(tmp.path(), Some(user.path().to_path_buf()));
        // Found in the user fallback dir, then rejected by the loader.
        let err = open_library(&dirs, "garbage", "garbage").unwrap_err();
        assert!(matches!(err, ModuleError::Load { .. }));
    }
}
