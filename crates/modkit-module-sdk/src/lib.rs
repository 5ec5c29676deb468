//! ModKit Module SDK
//!
//! This SDK provides the entry-symbol conventions and export macro for
//! building native ModKit modules. The host resolves two well-known
//! symbols in every module library:
//!
//! - `"<name>_init"` — mandatory, runs right after the library is opened
//! - `"<name>_deinit"` — optional, runs right before the library is closed
//!
//! Both take no parameters and return nothing. The [`declare_module!`]
//! macro emits them with the correct linkage so host and module cannot
//! disagree on naming.
//!
//! # Quick Start
//!
//! ```rust
//! use modkit_module_sdk::declare_module;
//!
//! fn setup() {
//!     // register tags, hook into the host
//! }
//!
//! fn teardown() {}
//!
//! declare_module!(my_module, init = setup, deinit = teardown);
//! ```

// Re-exported for declare_module!; not part of the public API surface.
#[doc(hidden)]
pub use paste;

/// Suffix of the mandatory initializer symbol.
pub const INIT_SUFFIX: &str = "_init";

/// Suffix of the optional finalizer symbol.
pub const DEINIT_SUFFIX: &str = "_deinit";

/// Full initializer symbol name for a logical module name.
pub fn init_symbol(name: &str) -> String {
    format!("{}{}", name, INIT_SUFFIX)
}

/// Full finalizer symbol name for a logical module name.
pub fn deinit_symbol(name: &str) -> String {
    format!("{}{}", name, DEINIT_SUFFIX)
}

/// Export the conventional entry points for a module.
///
/// The first argument is the logical module name, which must match the
/// library filename (`lib<name>.so` on Linux). `init` is mandatory,
/// `deinit` optional.
#[macro_export]
macro_rules! declare_module {
    ($name:ident, init = $init:path) => {
        $crate::paste::paste! {
            #[no_mangle]
            pub extern "C" fn [<$name _init>]() {
                $init();
            }
        }
    };
    ($name:ident, init = $init:path, deinit = $deinit:path) => {
        $crate::declare_module!($name, init = $init);
        $crate::paste::paste! {
            #[no_mangle]
            pub extern "C" fn [<$name _deinit>]() {
                $deinit();
            }
        }
    };
}
