use crate::mapping::{MappedMemberResolution, MappingService};
use crate::mixin::{ClassTarget, NameType};

/// Decides whether an observed (already-normalized) class name matches a
/// mixin's declared target under the target's naming strategy. Descriptor
/// strings for fields/methods are never translated regardless of
/// `name_type` — only names are; that comparison is done directly by the
/// selector, not here.
pub fn class_matches(runtime_name: &str, target: &ClassTarget, mapping: &dyn MappingService) -> bool {
    match target.name_type {
        NameType::Default => runtime_name == target.class_name,
        NameType::Obfuscated => mapping.is_class_equivalent(runtime_name, &target.class_name),
        NameType::Mapped => mapping
            .class_entry_by_mapped_name(&target.class_name)
            .map(|entry| entry.obfuscated_name == runtime_name)
            .unwrap_or(false),
    }
}

/// Decides whether an observed member name matches a mixin target's
/// declared member name, given that the containing class has already been
/// established to match (`class_matches` returned `true` for the same
/// `target`). Only called after a class match, since `Mapped` resolution
/// needs the matching class entry to scope the per-class member lookup.
pub fn member_name_matches(
    target: &ClassTarget,
    target_member_name: &str,
    runtime_member_name: &str,
    mapping: &dyn MappingService,
    resolution: MappedMemberResolution,
) -> bool {
    match target.name_type {
        NameType::Default | NameType::Obfuscated => target_member_name == runtime_member_name,
        NameType::Mapped => match resolution {
            MappedMemberResolution::PerClassMapping => mapping
                .class_entry_by_mapped_name(&target.class_name)
                .and_then(|entry| entry.member_by_mapped_name(target_member_name).cloned())
                .map(|member| member.obfuscated_name == runtime_member_name)
                .unwrap_or(false),
            MappedMemberResolution::FlatGlobalMapping => mapping
                .member_by_mapped_name_global(target_member_name)
                .map(|member| member.obfuscated_name == runtime_member_name)
                .unwrap_or(false),
            MappedMemberResolution::NoTranslation => target_member_name == runtime_member_name,
        },
    }
}
