//! Module registry: tracks loaded modules and drives their lifecycle.
//!
//! Lifecycle: Unloaded -> Loading -> Loaded -> Unloading -> record
//! dropped. Load failures are announced on the event bus and reported as
//! a boolean; they never propagate past this boundary.

use std::path::PathBuf;

use chrono::Utc;

use crate::config::ModuleDirs;
use crate::error::{ModuleError, Result};
use crate::event::{HostEvent, ModuleInfo};
use crate::eventbus::SharedEventBus;
use crate::loader::{self, ModuleCode, NativeModule};
use crate::uniqid::UniqIdRegistry;

/// Lifecycle state of a loaded module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// Record created, initializer not yet finished.
    Loading,
    /// Initializer ran; the module is live.
    Loaded,
    /// Removed from the loaded set, teardown in progress.
    Unloading,
}

/// A currently loaded module. Exclusively owns its library handle via the
/// [`ModuleCode`] box; dropping the record closes the library.
pub struct ModuleRecord {
    info: ModuleInfo,
    state: ModuleState,
    code: Box<dyn ModuleCode>,
}

impl ModuleRecord {
    /// Logical module name.
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Cloneable snapshot carried on events.
    pub fn info(&self) -> &ModuleInfo {
        &self.info
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ModuleState {
        self.state
    }
}

impl std::fmt::Debug for ModuleRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRecord")
            .field("name", &self.info.name)
            .field("state", &self.state)
            .finish()
    }
}

/// The host's module system context.
///
/// Owns the loaded set, the unique-id allocator, and the module search
/// directories. All operations run on the host's single control thread
/// and take `&mut self`; no internal locking.
pub struct ModuleRegistry {
    modules: Vec<ModuleRecord>,
    ids: UniqIdRegistry,
    bus: SharedEventBus,
    dirs: ModuleDirs,
}

impl ModuleRegistry {
    /// Create a registry using directories from the environment.
    pub fn new(bus: SharedEventBus) -> Self {
        Self::with_dirs(bus, ModuleDirs::from_env())
    }

    /// Create a registry with explicit module directories.
    pub fn with_dirs(bus: SharedEventBus, dirs: ModuleDirs) -> Self {
        Self {
            modules: Vec::new(),
            ids: UniqIdRegistry::new(),
            bus,
            dirs,
        }
    }

    /// Load a module by path or bare name.
    ///
    /// On success the module's initializer has run and a `ModuleLoaded`
    /// event was published. On failure a `ModuleError` event carries the
    /// diagnostic and `false` is returned; nothing was mutated.
    pub fn load(&mut self, path_or_name: &str) -> bool {
        let name = loader::module_name_from_path(path_or_name);
        match self.try_load(path_or_name, &name) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(module = %name, %error, "module load failed");
                self.bus.publish(HostEvent::ModuleError { error });
                false
            }
        }
    }

    fn try_load(&mut self, path_or_name: &str, name: &str) -> Result<()> {
        // Duplicate names are rejected before the loader is touched.
        if self.find(name).is_some() {
            return Err(ModuleError::AlreadyLoaded(name.to_string()));
        }
        let code = NativeModule::load(&self.dirs, path_or_name, name)?;
        self.finish_load(name, path_or_name, Box::new(code));
        Ok(())
    }

    /// Append the record, run the initializer, announce the load.
    fn finish_load(&mut self, name: &str, path: &str, code: Box<dyn ModuleCode>) {
        let info = ModuleInfo {
            name: name.to_string(),
            path: PathBuf::from(path),
            loaded_at: Utc::now(),
        };
        self.modules.push(ModuleRecord {
            info: info.clone(),
            state: ModuleState::Loading,
            code,
        });

        if let Some(record) = self.modules.last_mut() {
            record.code.initialize();
            record.state = ModuleState::Loaded;
        }

        tracing::info!(module = name, "module loaded");
        self.bus.publish(HostEvent::ModuleLoaded { module: info });
    }

    /// Unload a module by name.
    ///
    /// The record leaves the loaded set before anything else, so
    /// re-entrant lookups during teardown cannot observe it as loaded;
    /// `ModuleUnloaded` is published before the finalizer runs, so
    /// observers cannot call back into code that is about to vanish.
    /// Returns `false` if no such module is loaded. Unload itself cannot
    /// fail: a missing finalizer is not an error and closing the library
    /// is infallible at this layer.
    pub fn unload(&mut self, name: &str) -> bool {
        let Some(pos) = self
            .modules
            .iter()
            .position(|m| m.info.name.eq_ignore_ascii_case(name))
        else {
            return false;
        };

        let mut record = self.modules.remove(pos);
        record.state = ModuleState::Unloading;
        self.bus.publish(HostEvent::ModuleUnloaded {
            module: record.info.clone(),
        });

        record.code.finalize();
        let name = record.info.name.clone();
        // Dropping the record closes the library handle.
        drop(record);

        self.ids.destroy_module_ids(&name);
        tracing::info!(module = %name, "module unloaded");
        true
    }

    /// Find a loaded module by name, case-insensitively.
    pub fn find(&self, name: &str) -> Option<&ModuleRecord> {
        self.modules
            .iter()
            .find(|m| m.info.name.eq_ignore_ascii_case(name))
    }

    /// Currently loaded modules, in load order.
    pub fn modules(&self) -> &[ModuleRecord] {
        &self.modules
    }

    /// Number of loaded modules.
    pub fn count(&self) -> usize {
        self.modules.len()
    }

    /// Load every shared-library file found in the module directories.
    ///
    /// Per-file failures are announced on the bus like any other load
    /// failure and never abort the scan. Returns the number of modules
    /// loaded.
    pub fn autoload(&mut self) -> usize {
        let dirs: Vec<PathBuf> = self.dirs.search_order().cloned().collect();
        let mut loaded = 0;

        for dir in dirs {
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if !loader::is_module_file(&path) {
                    continue;
                }
                let Some(path_str) = path.to_str() else {
                    tracing::warn!(path = %path.display(), "skipping non-UTF-8 module path");
                    continue;
                };
                if self.load(path_str) {
                    loaded += 1;
                }
            }
        }

        loaded
    }

    /// The unique-id allocator.
    pub fn ids(&self) -> &UniqIdRegistry {
        &self.ids
    }

    /// Mutable access to the unique-id allocator, used by module
    /// initializers (through the host) to register their tags.
    pub fn ids_mut(&mut self) -> &mut UniqIdRegistry {
        &mut self.ids
    }

    /// Tear down the id registry: force-purge every module name still
    /// holding ids in either tag-space and reset the counter. Loaded
    /// modules themselves are expected to be unloaded by the caller
    /// beforehand.
    pub fn shutdown(&mut self) {
        self.ids.clear();
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.modules)
            .field("dirs", &self.dirs)
            .finish()
    }
}
