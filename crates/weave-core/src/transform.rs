use std::sync::Arc;

use weave_classfile::{ClassModel, CodeAttribute, FieldModel, MethodModel};

use crate::codec::{ClassCodec, DefaultCodec};
use crate::error::{EngineError, MixinError};
use crate::index::MixinIndex;
use crate::mapping::MappingService;
use crate::mixin::MixinId;
use crate::name::NameNormalizer;
use crate::options::EngineOptions;
use crate::panic_util::panic_payload_to_string;
use crate::scanner::MixinScanner;
use crate::selector;
use crate::stats::{EngineStats, LastFailure};

/// The engine: holds the mixin index, the name normalizer/cache, and the
/// collaborators the core treats as black boxes (mapping service, codec).
/// Exposes the single host-facing operation, [`Engine::modify_class`].
///
/// `modify_class` is documented to be called serially per class (the host's
/// class-loading lock is assumed to supply that); [`Engine::rescan`] takes
/// `&mut self` and must be externally synchronized against any in-flight
/// `modify_class` call, since the mixin index itself is not internally
/// locked.
pub struct Engine {
    options: EngineOptions,
    normalizer: NameNormalizer,
    index: MixinIndex,
    mapping: Arc<dyn MappingService>,
    codec: Arc<dyn ClassCodec>,
    stats: EngineStats,
}

impl Engine {
    pub fn new(options: EngineOptions, mapping: Arc<dyn MappingService>, scanner: &dyn MixinScanner) -> Self {
        Self::with_codec(options, mapping, Arc::new(DefaultCodec), scanner)
    }

    pub fn with_codec(
        options: EngineOptions,
        mapping: Arc<dyn MappingService>,
        codec: Arc<dyn ClassCodec>,
        scanner: &dyn MixinScanner,
    ) -> Self {
        let normalizer = NameNormalizer::with_max_entries(options.max_cache_entries);
        let index = MixinIndex::build(scanner);
        Self { options, normalizer, index, mapping, codec, stats: EngineStats::new() }
    }

    /// Re-invokes `scanner` and fully replaces the stored mixin list. Callers
    /// must ensure no `modify_class` call is in flight while this runs.
    pub fn rescan(&mut self, scanner: &dyn MixinScanner) {
        self.index.rebuild(scanner);
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// The host-facing two-phase probe/transform entry point.
    ///
    /// `class_data == None` or `Some(&[])` is probe mode: returns
    /// `Some(vec![])` if any mixin targets `class_name`, else `None`.
    /// Otherwise this is transform mode: returns `None` for "no change" or
    /// `Some(bytes)` for a replacement class file. Never returns `Err` —
    /// every internal failure degrades to "no modification" plus a log
    /// line, so a misbehaving mixin or an unparseable class file cannot
    /// propagate past this call.
    pub fn modify_class(&self, class_name: &str, class_data: Option<&[u8]>) -> Option<Vec<u8>> {
        match class_data {
            None => self.probe(class_name),
            Some(bytes) if bytes.is_empty() => self.probe(class_name),
            Some(bytes) => self.transform(class_name, bytes),
        }
    }

    fn probe(&self, class_name: &str) -> Option<Vec<u8>> {
        if selector::has_any(&self.index, class_name, &self.normalizer, self.mapping.as_ref()) {
            Some(Vec::new())
        } else {
            None
        }
    }

    fn transform(&self, class_name: &str, bytes: &[u8]) -> Option<Vec<u8>> {
        if !selector::has_any(&self.index, class_name, &self.normalizer, self.mapping.as_ref()) {
            return None;
        }

        let class = match self.codec.parse(bytes) {
            Ok(class) => class,
            Err(source) => {
                let err = EngineError::Parse { class_name: class_name.to_string(), source };
                tracing::warn!(class = class_name, error = %err, "failed to parse class; skipping");
                return None;
            }
        };

        let (class, modified) = self.apply_all(class);
        if !modified {
            return None;
        }

        match self.codec.serialize(&class) {
            Ok(bytes) => Some(bytes),
            Err(source) => {
                let err = EngineError::Serialize { class_name: class.this_class.clone(), source };
                tracing::warn!(class = %class.this_class, error = %err, "failed to serialize modified class; discarding changes");
                None
            }
        }
    }

    fn apply_all(&self, mut class: ClassModel) -> (ClassModel, bool) {
        let mut modified = false;

        modified |= self.apply_class_mixins(&mut class);
        modified |= self.apply_field_mixins(&mut class);
        let (method_modified, code_modified) = self.apply_method_and_code_mixins(&mut class);
        modified |= method_modified;
        modified |= code_modified;

        (class, modified)
    }

    fn apply_class_mixins(&self, class: &mut ClassModel) -> bool {
        let mut modified = false;
        let descriptors = selector::select_class(&self.index, &class.this_class, &self.normalizer, self.mapping.as_ref());
        for desc in descriptors {
            let class_name = class.this_class.clone();
            if let Some(new_class) = invoke(&desc.id, &class_name, &self.stats, || desc.handler.apply(&*class)) {
                *class = new_class;
                modified = true;
            }
        }
        modified
    }

    fn apply_field_mixins(&self, class: &mut ClassModel) -> bool {
        let mut modified = false;
        let resolution = self.options.mapped_member_resolution;
        let snapshot = class.fields.clone();
        let mut rewritten: Vec<FieldModel> = Vec::with_capacity(snapshot.len());

        for field in snapshot {
            let descriptors = selector::select_field(
                &self.index,
                &class.this_class,
                &field.name,
                &field.descriptor,
                &self.normalizer,
                self.mapping.as_ref(),
                resolution,
            );
            let mut current = field;
            for desc in descriptors {
                let class_name = class.this_class.clone();
                if let Some(new_field) = invoke(&desc.id, &class_name, &self.stats, || desc.handler.apply(&*class, &current)) {
                    current = new_field;
                    modified = true;
                }
            }
            rewritten.push(current);
        }

        class.fields = rewritten;
        modified
    }

    fn apply_method_and_code_mixins(&self, class: &mut ClassModel) -> (bool, bool) {
        let mut method_modified = false;
        let mut code_modified = false;
        let resolution = self.options.mapped_member_resolution;
        let snapshot = class.methods.clone();
        let mut rewritten: Vec<MethodModel> = Vec::with_capacity(snapshot.len());

        for method in snapshot {
            let method_descriptors = selector::select_method(
                &self.index,
                &class.this_class,
                &method.name,
                &method.descriptor,
                &self.normalizer,
                self.mapping.as_ref(),
                resolution,
            );
            let mut current = method;
            for desc in method_descriptors {
                let class_name = class.this_class.clone();
                if let Some(new_method) = invoke(&desc.id, &class_name, &self.stats, || desc.handler.apply(&*class, &current)) {
                    current = new_method;
                    method_modified = true;
                }
            }

            // Selection for method-code mixins uses the identity the method
            // carries after the method-level pass, since that pass may have
            // just renamed it.
            let code_descriptors = selector::select_method_code(
                &self.index,
                &class.this_class,
                &current.name,
                &current.descriptor,
                &self.normalizer,
                self.mapping.as_ref(),
                resolution,
            );
            if code_descriptors.is_empty() {
                rewritten.push(current);
                continue;
            }

            match current.code().cloned() {
                None => {
                    tracing::trace!(
                        class = %class.this_class,
                        method = %current.name,
                        signature = %current.descriptor,
                        "method-code mixins registered but method has no Code attribute; skipping"
                    );
                    rewritten.push(current);
                }
                Some(code) => {
                    let mut current_code = code;
                    for desc in code_descriptors {
                        let class_name = class.this_class.clone();
                        if let Some(new_code) =
                            invoke(&desc.id, &class_name, &self.stats, || desc.handler.apply(&*class, &current_code))
                        {
                            current_code = new_code;
                            code_modified = true;
                        }
                    }
                    current = current.with_code(current_code);
                    rewritten.push(current);
                }
            }
        }

        class.methods = rewritten;
        (method_modified, code_modified)
    }
}

/// Runs a single mixin invocation under `catch_unwind`, so a panicking
/// mixin cannot unwind into (and abort) the host's class-loading call
/// stack, and records the outcome in `stats`. Returns `None` on either an
/// `Err` return or a panic — the caller always treats both identically:
/// skip this one mixin, keep the last good intermediate value.
fn invoke<T>(
    mixin_id: &MixinId,
    class_name: &str,
    stats: &EngineStats,
    f: impl FnOnce() -> Result<T, MixinError>,
) -> Option<T> {
    let id = mixin_id.to_string();
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(Ok(value)) => {
            stats.record_success(&id);
            Some(value)
        }
        Ok(Err(err)) => {
            tracing::error!(mixin_id = %id, class = class_name, error = %err, "mixin invocation failed");
            stats.record_failure(&id, LastFailure::MixinError(err.message));
            None
        }
        Err(payload) => {
            let message = panic_payload_to_string(&payload);
            tracing::error!(mixin_id = %id, class = class_name, panic = %message, "mixin invocation panicked");
            stats.record_failure(&id, LastFailure::Panic(message));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MixinError as CoreMixinError;
    use crate::mapping::{ClassMappingEntry, MemberMapping};
    use crate::mixin::{
        ClassMixin, ClassMixinDescriptor, ClassTarget, FieldMixin, FieldMixinDescriptor, FieldTarget, MethodCodeMixin,
        MethodCodeMixinDescriptor, MethodMixin, MethodMixinDescriptor, MethodTarget, NameType, ScannedMixin,
    };
    use weave_classfile::{ConstantPoolBuilder, Writer};

    struct PassthroughMapping {
        entries: Vec<ClassMappingEntry>,
    }

    impl MappingService for PassthroughMapping {
        fn is_class_equivalent(&self, r: &str, t: &str) -> bool {
            r == t
        }
        fn class_entry_by_mapped_name(&self, mapped_name: &str) -> Option<ClassMappingEntry> {
            self.entries.iter().find(|e| e.mapped_name == mapped_name).cloned()
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
    impl FixedScanner {
        fn new(mixins: Vec<ScannedMixin>) -> Self {
            Self(std::cell::RefCell::new(Some(mixins)))
        }
    }
    impl MixinScanner for FixedScanner {
        fn scan(&self) -> Vec<ScannedMixin> {
            self.0.borrow_mut().take().unwrap_or_default()
        }
    }

    struct RenameClassMixin;
    impl ClassMixin for RenameClassMixin {
        fn apply(&self, class: &ClassModel) -> Result<ClassModel, CoreMixinError> {
            let mut new_class = class.clone();
            new_class.access_flags |= 0x0010; // ACC_FINAL, an observable marker
            Ok(new_class)
        }
    }

    #[test]
    fn no_mixins_registered_never_modifies() {
        let scanner = FixedScanner::new(vec![]);
        let engine = Engine::new(EngineOptions::default(), Arc::new(PassthroughMapping { entries: vec![] }), &scanner);
        assert_eq!(engine.modify_class("a/b/C", None), None);
        let bytes = minimal_class_bytes("a/b/C");
        assert_eq!(engine.modify_class("a/b/C", Some(&bytes)), None);
    }

    fn class_mixin_descriptor(index: usize, target: ClassTarget) -> ClassMixinDescriptor {
        ClassMixinDescriptor { id: MixinId { module: "m".to_string(), index }, target, handler: Box::new(RenameClassMixin) }
    }

    #[test]
    fn one_default_class_mixin_probe_and_transform() {
        let target = ClassTarget { class_name: "a/b/C".to_string(), name_type: NameType::Default, priority: 0 };
        let scanner = FixedScanner::new(vec![ScannedMixin::Class(class_mixin_descriptor(0, target))]);
        let engine = Engine::new(EngineOptions::default(), Arc::new(PassthroughMapping { entries: vec![] }), &scanner);

        assert_eq!(engine.modify_class("a/b/C", None), Some(Vec::new()));

        let bytes = minimal_class_bytes("a/b/C");
        let out = engine.modify_class("a/b/C", Some(&bytes)).expect("mixin should have modified the class");
        assert_ne!(out, bytes);
    }

    #[test]
    fn empty_bytes_is_treated_as_probe_mode() {
        let target = ClassTarget { class_name: "a/b/C".to_string(), name_type: NameType::Default, priority: 0 };
        let scanner = FixedScanner::new(vec![ScannedMixin::Class(class_mixin_descriptor(0, target))]);
        let engine = Engine::new(EngineOptions::default(), Arc::new(PassthroughMapping { entries: vec![] }), &scanner);
        assert_eq!(engine.modify_class("a/b/C", Some(&[])), Some(Vec::new()));
    }

    #[test]
    fn mapped_name_mixin_matches_only_obfuscated_runtime_name() {
        let mapping = PassthroughMapping {
            entries: vec![ClassMappingEntry {
                mapped_name: "net/game/Entity".to_string(),
                obfuscated_name: "a/b/C".to_string(),
                members: vec![],
            }],
        };
        let target = ClassTarget { class_name: "net/game/Entity".to_string(), name_type: NameType::Mapped, priority: 0 };
        let scanner = FixedScanner::new(vec![ScannedMixin::Class(class_mixin_descriptor(0, target))]);
        let engine = Engine::new(EngineOptions::default(), Arc::new(mapping), &scanner);

        assert_eq!(engine.modify_class("a/b/C", None), Some(Vec::new()));
        assert_eq!(engine.modify_class("net/game/Entity", None), None);
    }

    struct RenameFieldMixin(&'static str);
    impl FieldMixin for RenameFieldMixin {
        fn apply(&self, _class: &ClassModel, field: &FieldModel) -> Result<FieldModel, CoreMixinError> {
            let mut f = field.clone();
            f.name = self.0.to_string();
            Ok(f)
        }
    }

    struct ThrowingFieldMixin;
    impl FieldMixin for ThrowingFieldMixin {
        fn apply(&self, _class: &ClassModel, _field: &FieldModel) -> Result<FieldModel, CoreMixinError> {
            Err(CoreMixinError::new("boom"))
        }
    }

    #[test]
    fn a_throwing_field_mixin_does_not_block_the_other() {
        let class_target = ClassTarget { class_name: "a/b/C".to_string(), name_type: NameType::Default, priority: 0 };
        let first = FieldMixinDescriptor {
            id: MixinId { module: "m".to_string(), index: 0 },
            target: FieldTarget { class: class_target.clone(), field_name: "x".to_string(), field_descriptor: "I".to_string() },
            handler: Box::new(ThrowingFieldMixin),
        };
        let second = FieldMixinDescriptor {
            id: MixinId { module: "m".to_string(), index: 1 },
            target: FieldTarget { class: class_target, field_name: "x".to_string(), field_descriptor: "I".to_string() },
            handler: Box::new(RenameFieldMixin("renamed")),
        };
        let scanner = FixedScanner::new(vec![ScannedMixin::Field(first), ScannedMixin::Field(second)]);
        let engine = Engine::new(EngineOptions::default(), Arc::new(PassthroughMapping { entries: vec![] }), &scanner);

        let mut class = weave_classfile::ClassModel::parse(&minimal_class_bytes("a/b/C")).unwrap();
        class.fields.push(FieldModel { access_flags: 0, name: "x".to_string(), descriptor: "I".to_string(), attributes: vec![] });
        let class_bytes = class.serialize().unwrap();

        let out = engine.modify_class("a/b/C", Some(&class_bytes)).expect("field mixin should have modified the class");
        let reparsed = weave_classfile::ClassModel::parse(&out).unwrap();
        assert_eq!(reparsed.fields[0].name, "renamed");
    }

    struct RenameMethodMixin(&'static str);
    impl MethodMixin for RenameMethodMixin {
        fn apply(&self, _class: &ClassModel, method: &MethodModel) -> Result<MethodModel, CoreMixinError> {
            let mut m = method.clone();
            m.name = self.0.to_string();
            Ok(m)
        }
    }

    #[test]
    fn method_mixins_apply_in_priority_order() {
        let mut class = weave_classfile::ClassModel::parse(&minimal_class_bytes("x/Y")).unwrap();
        class.methods.push(MethodModel { access_flags: 0, name: "run".to_string(), descriptor: "()V".to_string(), attributes: vec![] });
        let bytes = class.serialize().unwrap();

        let low_priority = MethodMixinDescriptor {
            id: MixinId { module: "m".to_string(), index: 0 },
            target: MethodTarget {
                class: ClassTarget { class_name: "x/Y".to_string(), name_type: NameType::Default, priority: 10 },
                method_name: "run".to_string(),
                method_signature: "()V".to_string(),
            },
            handler: Box::new(RenameMethodMixin("run_v1")),
        };
        // Targets the name the first mixin produces, so observing it run
        // second (by priority, not registration order) proves ordering.
        let high_priority = MethodMixinDescriptor {
            id: MixinId { module: "m".to_string(), index: 1 },
            target: MethodTarget {
                class: ClassTarget { class_name: "x/Y".to_string(), name_type: NameType::Default, priority: 20 },
                method_name: "run_v1".to_string(),
                method_signature: "()V".to_string(),
            },
            handler: Box::new(RenameMethodMixin("run_v2")),
        };

        let scanner = FixedScanner::new(vec![ScannedMixin::Method(high_priority), ScannedMixin::Method(low_priority)]);
        let engine = Engine::new(EngineOptions::default(), Arc::new(PassthroughMapping { entries: vec![] }), &scanner);

        let out = engine.modify_class("x/Y", Some(&bytes)).expect("mixins should have modified the class");
        let reparsed = weave_classfile::ClassModel::parse(&out).unwrap();
        assert_eq!(reparsed.methods[0].name, "run_v2");
    }

    struct CodeFlipMixin;
    impl MethodCodeMixin for CodeFlipMixin {
        fn apply(&self, _class: &ClassModel, code: &CodeAttribute) -> Result<CodeAttribute, CoreMixinError> {
            let mut c = code.clone();
            c.instructions.push(0x00); // nop, an observable marker
            Ok(c)
        }
    }

    #[test]
    fn method_code_mixin_on_method_without_code_attribute_is_skipped_not_an_error() {
        let class_target = ClassTarget { class_name: "x/Y".to_string(), name_type: NameType::Default, priority: 0 };
        let descriptor = MethodCodeMixinDescriptor {
            id: MixinId { module: "m".to_string(), index: 0 },
            target: MethodTarget { class: class_target, method_name: "run".to_string(), method_signature: "()V".to_string() },
            handler: Box::new(CodeFlipMixin),
        };
        let mut class = weave_classfile::ClassModel::parse(&minimal_class_bytes("x/Y")).unwrap();
        // Abstract/native method: no Code attribute.
        class.methods.push(MethodModel { access_flags: 0x0400, name: "run".to_string(), descriptor: "()V".to_string(), attributes: vec![] });
        let bytes = class.serialize().unwrap();

        let scanner = FixedScanner::new(vec![ScannedMixin::MethodCode(descriptor)]);
        let engine = Engine::new(EngineOptions::default(), Arc::new(PassthroughMapping { entries: vec![] }), &scanner);

        // A method-code mixin targets the class, so probe mode answers
        // "maybe" — but since the only matching method has no Code
        // attribute, the transform must not panic and, having changed
        // nothing, reports no modification.
        assert_eq!(engine.modify_class("x/Y", None), Some(Vec::new()));
        assert_eq!(engine.modify_class("x/Y", Some(&bytes)), None);
    }

    struct MemberMappingOnly(ClassMappingEntry);
    impl MappingService for MemberMappingOnly {
        fn is_class_equivalent(&self, r: &str, t: &str) -> bool {
            r == t
        }
        fn class_entry_by_mapped_name(&self, mapped_name: &str) -> Option<ClassMappingEntry> {
            if self.0.mapped_name == mapped_name {
                Some(self.0.clone())
            } else {
                None
            }
        }
    }

    #[test]
    fn mapped_method_name_resolves_through_per_class_member_mapping() {
        let entry = ClassMappingEntry {
            mapped_name: "net/game/Entity".to_string(),
            obfuscated_name: "a/b/C".to_string(),
            members: vec![MemberMapping { mapped_name: "tick".to_string(), obfuscated_name: "a".to_string(), descriptor: "()V".to_string() }],
        };
        let class_target = ClassTarget { class_name: "net/game/Entity".to_string(), name_type: NameType::Mapped, priority: 0 };
        let descriptor = MethodMixinDescriptor {
            id: MixinId { module: "m".to_string(), index: 0 },
            target: MethodTarget { class: class_target, method_name: "tick".to_string(), method_signature: "()V".to_string() },
            handler: Box::new(RenameMethodMixin("ticked")),
        };
        let mut class = weave_classfile::ClassModel::parse(&minimal_class_bytes("a/b/C")).unwrap();
        class.methods.push(MethodModel { access_flags: 0, name: "a".to_string(), descriptor: "()V".to_string(), attributes: vec![] });
        let bytes = class.serialize().unwrap();

        let scanner = FixedScanner::new(vec![ScannedMixin::Method(descriptor)]);
        let engine = Engine::new(EngineOptions::default(), Arc::new(MemberMappingOnly(entry)), &scanner);

        let out = engine.modify_class("a/b/C", Some(&bytes)).expect("mapped method mixin should have applied");
        let reparsed = weave_classfile::ClassModel::parse(&out).unwrap();
        assert_eq!(reparsed.methods[0].name, "ticked");
    }
}
