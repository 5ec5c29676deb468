//! Cross-module type-identity registry.
//!
//! Independently compiled modules each keep a private numbering for the
//! kinds of object they create. This registry translates those private
//! tags into process-global ids so one module can recognize instances
//! tagged by another, and revalidates every lookup against the owning
//! module's own namespace so a wrong ownership claim cannot cause type
//! confusion.
//!
//! Two structurally identical tag-spaces exist, one for numeric local
//! tags and one for string local tags. They share a single monotonic
//! counter, so ids from the two spaces never collide.

use std::collections::{BTreeSet, HashMap};

/// Access to the type tag a module embedded in an object it created.
///
/// Implementations return the global id the creating module obtained from
/// [`UniqIdRegistry::get_uniq_id`]. The tag is treated as a claim, never
/// as proof; [`UniqIdRegistry::check_cast`] revalidates it.
pub trait TypeTagged {
    /// Self-reported global type id of this object.
    fn type_tag(&self) -> i32;
}

/// Process-wide allocator of global type ids.
///
/// One instance per host; owned by the module registry and torn down with
/// it. Namespaces never escape this type.
#[derive(Debug, Default)]
pub struct UniqIdRegistry {
    /// Shared across both tag-spaces.
    next_id: i32,

    /// module name -> (numeric local tag -> global id)
    ids: HashMap<String, HashMap<i32, i32>>,
    /// global id -> numeric local tag
    rev: HashMap<i32, i32>,

    /// module name -> (string local tag -> global id)
    str_ids: HashMap<String, HashMap<String, i32>>,
    /// global id -> string local tag
    str_rev: HashMap<i32, String>,
}

impl UniqIdRegistry {
    /// Create an empty registry with the counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Global id for `module`'s numeric local tag.
    ///
    /// Idempotent: the first call for a (module, tag) pair allocates a
    /// fresh id and records the forward and reverse mappings in the same
    /// step; repeated calls return the same id.
    pub fn get_uniq_id(&mut self, module: &str, tag: i32) -> i32 {
        let namespace = self.ids.entry(module.to_string()).or_default();
        if let Some(&uniq) = namespace.get(&tag) {
            return uniq;
        }

        let uniq = self.next_id;
        self.next_id += 1;
        namespace.insert(tag, uniq);
        self.rev.insert(uniq, tag);
        tracing::debug!(module, tag, uniq, "allocated numeric type id");
        uniq
    }

    /// Global id for `module`'s string local tag. Stores an owned copy of
    /// the key; the caller's string need not outlive the registration.
    pub fn get_uniq_id_str(&mut self, module: &str, tag: &str) -> i32 {
        let namespace = self.str_ids.entry(module.to_string()).or_default();
        if let Some(&uniq) = namespace.get(tag) {
            return uniq;
        }

        let uniq = self.next_id;
        self.next_id += 1;
        namespace.insert(tag.to_string(), uniq);
        self.str_rev.insert(uniq, tag.to_string());
        tracing::debug!(module, tag, uniq, "allocated string type id");
        uniq
    }

    /// Local numeric tag behind `uniq`, provided `module` owns it.
    ///
    /// The reverse map gives a candidate tag; the candidate is then looked
    /// up in the named module's own namespace and must map back to the
    /// same global id. A global id owned by a different module fails here
    /// even though the reverse map knows it — this double-check, not the
    /// lookup, is what makes the registry resistant to type confusion.
    pub fn find_id(&self, module: &str, uniq: i32) -> Option<i32> {
        let tag = *self.rev.get(&uniq)?;
        let namespace = self.ids.get(module)?;
        (*namespace.get(&tag)? == uniq).then_some(tag)
    }

    /// String-space counterpart of [`find_id`](Self::find_id).
    pub fn find_id_str(&self, module: &str, uniq: i32) -> Option<&str> {
        let tag = self.str_rev.get(&uniq)?;
        let namespace = self.str_ids.get(module)?;
        (*namespace.get(tag)? == uniq).then_some(tag.as_str())
    }

    /// Cast guard: return `object` only if it is present and its
    /// self-reported tag belongs to `module`.
    ///
    /// Failures are silent (`None`): this runs on hot type-check paths
    /// and a miss is routine, not an error. "Tag never registered" and
    /// "tag registered to a different module" are deliberately one
    /// outcome.
    pub fn check_cast<'a, T: TypeTagged>(
        &self,
        object: Option<&'a T>,
        module: &str,
    ) -> Option<&'a T> {
        let object = object?;
        self.find_id(module, object.type_tag())?;
        Some(object)
    }

    /// Purge every id owned by `module`, in both tag-spaces.
    ///
    /// Forward and reverse entries go in the same step, preserving the
    /// invariant that a reverse-map entry exists only while its owning
    /// namespace entry maps back to it. Called once per module, from
    /// unload and from teardown.
    pub fn destroy_module_ids(&mut self, module: &str) {
        if let Some(namespace) = self.ids.remove(module) {
            for uniq in namespace.into_values() {
                self.rev.remove(&uniq);
            }
        }
        if let Some(namespace) = self.str_ids.remove(module) {
            for uniq in namespace.into_values() {
                self.str_rev.remove(&uniq);
            }
        }
    }

    /// Teardown: purge every module name still registered in either
    /// tag-space and reset the counter.
    pub fn clear(&mut self) {
        let names: BTreeSet<String> = self
            .ids
            .keys()
            .chain(self.str_ids.keys())
            .cloned()
            .collect();
        for name in names {
            self.destroy_module_ids(&name);
        }
        self.next_id = 0;
    }

    /// Number of currently allocated ids across both tag-spaces.
    pub fn len(&self) -> usize {
        self.rev.len() + self.str_rev.len()
    }

    /// Whether no ids are currently allocated.
    pub fn is_empty(&self) -> bool {
        self.rev.is_empty() && self.str_rev.is_empty()
    }
}
