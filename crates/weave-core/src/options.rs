use crate::mapping::MappedMemberResolution;

/// Configuration surface the host supplies when building an [`crate::Engine`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// How `Mapped`-mode member names are resolved. Defaults to the
    /// canonical per-class mapping; see [`MappedMemberResolution`] for the
    /// legacy alternatives this still supports.
    pub mapped_member_resolution: MappedMemberResolution,
    /// Soft cap on the normalized-name cache, for hosts that load a very
    /// large number of distinct class names over a long-running process.
    /// `None` (the default) leaves the cache unbounded, matching the
    /// documented default behavior.
    pub max_cache_entries: Option<usize>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self { mapped_member_resolution: MappedMemberResolution::default(), max_cache_entries: None }
    }
}
