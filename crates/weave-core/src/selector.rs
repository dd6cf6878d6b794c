use crate::index::MixinIndex;
use crate::mapping::{MappedMemberResolution, MappingService};
use crate::matcher;
use crate::mixin::{ClassMixinDescriptor, ClassTarget, FieldMixinDescriptor, MethodCodeMixinDescriptor, MethodMixinDescriptor};
use crate::name::NameNormalizer;

fn normalized(target: &ClassTarget, normalizer: &NameNormalizer) -> ClassTarget {
    ClassTarget { class_name: normalizer.normalize(&target.class_name), name_type: target.name_type, priority: target.priority }
}

fn class_target_matches(target: &ClassTarget, runtime_class_name_normalized: &str, normalizer: &NameNormalizer, mapping: &dyn MappingService) -> bool {
    let normalized_target = normalized(target, normalizer);
    matcher::class_matches(runtime_class_name_normalized, &normalized_target, mapping)
}

/// Returns the class-kind mixins matching `class_name`, ordered ascending
/// by priority with ties broken by discovery order (the order
/// [`MixinIndex`] received them from the scanner — `Vec::sort_by_key` is a
/// stable sort, so no separate tie-break key is needed).
pub fn select_class<'a>(
    index: &'a MixinIndex,
    class_name: &str,
    normalizer: &NameNormalizer,
    mapping: &dyn MappingService,
) -> Vec<&'a ClassMixinDescriptor> {
    let runtime = normalizer.normalize(class_name);
    let mut matched: Vec<&ClassMixinDescriptor> =
        index.classes().iter().filter(|d| class_target_matches(&d.target, &runtime, normalizer, mapping)).collect();
    matched.sort_by_key(|d| d.target.priority);
    matched
}

#[allow(clippy::too_many_arguments)]
pub fn select_field<'a>(
    index: &'a MixinIndex,
    class_name: &str,
    field_name: &str,
    field_descriptor: &str,
    normalizer: &NameNormalizer,
    mapping: &dyn MappingService,
    resolution: MappedMemberResolution,
) -> Vec<&'a FieldMixinDescriptor> {
    let runtime = normalizer.normalize(class_name);
    let mut matched: Vec<&FieldMixinDescriptor> = index
        .fields()
        .iter()
        .filter(|d| {
            class_target_matches(&d.target.class, &runtime, normalizer, mapping)
                && d.target.field_descriptor == field_descriptor
                && matcher::member_name_matches(&d.target.class, &d.target.field_name, field_name, mapping, resolution)
        })
        .collect();
    matched.sort_by_key(|d| d.target.class.priority);
    matched
}

#[allow(clippy::too_many_arguments)]
pub fn select_method<'a>(
    index: &'a MixinIndex,
    class_name: &str,
    method_name: &str,
    method_signature: &str,
    normalizer: &NameNormalizer,
    mapping: &dyn MappingService,
    resolution: MappedMemberResolution,
) -> Vec<&'a MethodMixinDescriptor> {
    let runtime = normalizer.normalize(class_name);
    let mut matched: Vec<&MethodMixinDescriptor> = index
        .methods()
        .iter()
        .filter(|d| {
            class_target_matches(&d.target.class, &runtime, normalizer, mapping)
                && d.target.method_signature == method_signature
                && matcher::member_name_matches(&d.target.class, &d.target.method_name, method_name, mapping, resolution)
        })
        .collect();
    matched.sort_by_key(|d| d.target.class.priority);
    matched
}

#[allow(clippy::too_many_arguments)]
pub fn select_method_code<'a>(
    index: &'a MixinIndex,
    class_name: &str,
    method_name: &str,
    method_signature: &str,
    normalizer: &NameNormalizer,
    mapping: &dyn MappingService,
    resolution: MappedMemberResolution,
) -> Vec<&'a MethodCodeMixinDescriptor> {
    let runtime = normalizer.normalize(class_name);
    let mut matched: Vec<&MethodCodeMixinDescriptor> = index
        .method_code()
        .iter()
        .filter(|d| {
            class_target_matches(&d.target.class, &runtime, normalizer, mapping)
                && d.target.method_signature == method_signature
                && matcher::member_name_matches(&d.target.class, &d.target.method_name, method_name, mapping, resolution)
        })
        .collect();
    matched.sort_by_key(|d| d.target.class.priority);
    matched
}

/// Answers the probe-mode question: does any mixin, of any kind, target
/// `class_name`?
pub fn has_any(index: &MixinIndex, class_name: &str, normalizer: &NameNormalizer, mapping: &dyn MappingService) -> bool {
    let runtime = normalizer.normalize(class_name);
    index.classes().iter().any(|d| class_target_matches(&d.target, &runtime, normalizer, mapping))
        || index.fields().iter().any(|d| class_target_matches(&d.target.class, &runtime, normalizer, mapping))
        || index.methods().iter().any(|d| class_target_matches(&d.target.class, &runtime, normalizer, mapping))
        || index.method_code().iter().any(|d| class_target_matches(&d.target.class, &runtime, normalizer, mapping))
}
