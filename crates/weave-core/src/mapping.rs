/// A single member (field or method) mapping, scoped to one class entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberMapping {
    pub mapped_name: String,
    pub obfuscated_name: String,
    pub descriptor: String,
}

/// One class's mapped/obfuscated name pair plus its own member mappings.
/// Member names are only ever resolved *within* the entry of the class they
/// belong to — there is no flat, class-independent member table in the
/// canonical resolution (see [`MappedMemberResolution::PerClassMapping`]).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassMappingEntry {
    pub mapped_name: String,
    pub obfuscated_name: String,
    pub members: Vec<MemberMapping>,
}

impl ClassMappingEntry {
    pub fn member_by_mapped_name(&self, mapped_name: &str) -> Option<&MemberMapping> {
        self.members.iter().find(|m| m.mapped_name == mapped_name)
    }
}

/// External lookup the engine consults for `Obfuscated`- and `Mapped`-mode
/// name matching. Implementations own however the obfuscated↔mapped table
/// itself is populated and kept fresh; the engine only ever calls through
/// this trait.
pub trait MappingService: Send + Sync {
    /// Whether `runtime_name` (already normalized) should be considered the
    /// same class as `target_name` (already normalized) under `Obfuscated`
    /// mode. A plain passthrough implementation that just compares the two
    /// strings is valid when the host has no real obfuscation mapping.
    fn is_class_equivalent(&self, runtime_name: &str, target_name: &str) -> bool;

    /// Looks up the class entry whose mapped name equals `mapped_name`.
    /// Returns `None` if the mapping has no such class — this is the normal
    /// "no match" path for `Mapped` mode, not an error.
    fn class_entry_by_mapped_name(&self, mapped_name: &str) -> Option<ClassMappingEntry>;

    /// Looks up a member mapping by mapped name across the whole mapping
    /// source, ignoring which class it belongs to. Only consulted under
    /// [`MappedMemberResolution::FlatGlobalMapping`]; the default
    /// implementation returns `None`, which that mode treats as "no match"
    /// rather than panicking on an unimplemented lookup.
    fn member_by_mapped_name_global(&self, _mapped_name: &str) -> Option<MemberMapping> {
        None
    }
}

/// Resolves the Open Question this engine inherited from inconsistent
/// earlier behavior around `Mapped`-mode member names. `PerClassMapping` is
/// the canonical, default resolution; the others are retained as named,
/// opt-in legacy modes for hosts whose mapping source genuinely has no
/// per-class member table, and are documented here as known-incorrect in
/// the general case rather than silently supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MappedMemberResolution {
    /// Resolve a mapped member name through the per-class member list of the
    /// class entry that matched the containing class. Canonical behavior.
    #[default]
    PerClassMapping,
    /// Resolve against a single flat table shared across all classes,
    /// ignoring which class entry matched. Known to misbehave when two
    /// classes happen to share a mapped member name.
    FlatGlobalMapping,
    /// Compare the mixin's declared member name directly against the
    /// runtime member name, as if `name_type` were `Default`. Only correct
    /// when the mapping source's "mapped" names already equal runtime names.
    NoTranslation,
}
