//! Thread-safe wrapper around [`weave_core::Engine`] for hosts that call
//! `modify_class` from multiple class-loading threads.
//!
//! `weave_core::Engine` itself assumes the simplest case: `modify_class` is
//! called serially, and `rescan` must be externally synchronized against any
//! in-flight call. [`WeaveHost`] supplies that synchronization with an
//! `RwLock` — concurrent `modify_class` calls take a shared read lock (and so
//! run concurrently with each other), while `rescan` takes an exclusive write
//! lock, so a mixin rescan can never observe or produce a torn index.

use std::sync::{Arc, RwLock};

use thiserror::Error;
use weave_core::{ClassCodec, Engine, EngineOptions, MappingService, MixinScanner};

pub use weave_core::{
    ClassMixin, ClassMixinDescriptor, ClassTarget, EngineError, FieldMixin, FieldMixinDescriptor, FieldTarget,
    LastFailure, MethodCodeMixin, MethodCodeMixinDescriptor, MethodMixin, MethodMixinDescriptor, MethodTarget, MixinError,
    MixinId, MixinStats, NameType, ScannedMixin,
};

/// The host adapter's own error boundary.
///
/// `WeaveHost`'s contract is total: `modify_class` already folds every
/// per-mixin and per-class failure into "no modification" inside
/// [`weave_core::Engine`] (see [`EngineError`]/[`MixinError`]), and `rescan`
/// and `stats` cannot fail either. This type exists only so the crate has
/// the same typed error boundary every other crate in the workspace has at
/// its public seams; it is effectively uninhabited today.
#[derive(Debug, Error)]
pub enum HostError {}

pub struct WeaveHost {
    engine: RwLock<Engine>,
}

impl WeaveHost {
    pub fn new(options: EngineOptions, mapping: Arc<dyn MappingService>, scanner: &dyn MixinScanner) -> Self {
        Self { engine: RwLock::new(Engine::new(options, mapping, scanner)) }
    }

    pub fn with_codec(
        options: EngineOptions,
        mapping: Arc<dyn MappingService>,
        codec: Arc<dyn ClassCodec>,
        scanner: &dyn MixinScanner,
    ) -> Self {
        Self { engine: RwLock::new(Engine::with_codec(options, mapping, codec, scanner)) }
    }

    /// The host-facing probe/transform entry point. See
    /// [`weave_core::Engine::modify_class`] for the exact two-phase
    /// contract.
    pub fn modify_class(&self, class_name: &str, class_data: Option<&[u8]>) -> Option<Vec<u8>> {
        let engine = self.engine.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        engine.modify_class(class_name, class_data)
    }

    /// Re-invokes `scanner` and swaps in the new mixin list under an
    /// exclusive lock. Blocks until any `modify_class` calls already in
    /// flight complete, then blocks any new ones until the rescan finishes.
    pub fn rescan(&self, scanner: &dyn MixinScanner) {
        let mut engine = self.engine.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        tracing::debug!("rescanning mixins");
        engine.rescan(scanner);
    }

    pub fn stats(&self) -> std::collections::BTreeMap<String, MixinStats> {
        let engine = self.engine.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        engine.stats().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_core::MixinError as CoreMixinError;
    use weave_classfile::{ClassModel, ConstantPoolBuilder, Writer};

    struct PassthroughMapping;
    impl MappingService for PassthroughMapping {
        fn is_class_equivalent(&self, runtime_name: &str, target_name: &str) -> bool {
            runtime_name == target_name
        }
        fn class_entry_by_mapped_name(&self, _mapped_name: &str) -> Option<weave_core::ClassMappingEntry> {
            None
        }
    }

    struct RenameClassMixin;
    impl ClassMixin for RenameClassMixin {
        fn apply(&self, class: &ClassModel) -> Result<ClassModel, CoreMixinError> {
            Ok(class.clone())
        }
    }

    fn minimal_class_bytes(this_class: &str) -> Vec<u8> {
        let mut cp = ConstantPoolBuilder::new();
        let this_idx = cp.intern_class(this_class).unwrap();
        let super_idx = cp.intern_class("java/lang/Object").unwrap();

        let mut out = Writer::new();
        out.write_u4(0xCAFE_BABE);
        out.write_u2(0);
        out.write_u2(52);
        cp.write(&mut out).unwrap();
        out.write_u2(0x0021);
        out.write_u2(this_idx);
        out.write_u2(super_idx);
        out.write_u2(0);
        out.write_u2(0);
        out.write_u2(0);
        out.write_u2(0);
        out.into_bytes()
    }

    struct FixedScanner(std::cell::RefCell<Option<Vec<ScannedMixin>>>);
    impl MixinScanner for FixedScanner {
        fn scan(&self) -> Vec<ScannedMixin> {
            self.0.borrow_mut().take().unwrap_or_default()
        }
    }

    #[test]
    fn rescan_replaces_mixins_observed_by_later_modify_class_calls() {
        let empty_scanner = FixedScanner(std::cell::RefCell::new(Some(vec![])));
        let host = WeaveHost::new(EngineOptions::default(), Arc::new(PassthroughMapping), &empty_scanner);
        let bytes = minimal_class_bytes("a/b/C");
        assert_eq!(host.modify_class("a/b/C", Some(&bytes)), None);

        let target = ClassTarget { class_name: "a/b/C".to_string(), name_type: NameType::Default, priority: 0 };
        let descriptor =
            ClassMixinDescriptor { id: MixinId { module: "m".to_string(), index: 0 }, target, handler: Box::new(RenameClassMixin) };
        let rescan_scanner = FixedScanner(std::cell::RefCell::new(Some(vec![ScannedMixin::Class(descriptor)])));
        host.rescan(&rescan_scanner);

        assert_eq!(host.modify_class("a/b/C", None), Some(Vec::new()));
    }

    #[test]
    fn stats_start_empty() {
        let scanner = FixedScanner(std::cell::RefCell::new(Some(vec![])));
        let host = WeaveHost::new(EngineOptions::default(), Arc::new(PassthroughMapping), &scanner);
        assert!(host.stats().is_empty());
    }
}
