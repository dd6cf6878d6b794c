use crate::mixin::ScannedMixin;

/// Discovers mixins from wherever compiled modules register them (scanning
/// annotated methods, reading a manifest, etc). The engine treats this as a
/// black box: it calls `scan()` once at build time (and again on explicit
/// rescan) and otherwise never looks inside.
pub trait MixinScanner: Send + Sync {
    fn scan(&self) -> Vec<ScannedMixin>;
}
