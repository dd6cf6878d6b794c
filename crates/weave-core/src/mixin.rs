use std::fmt;

use weave_classfile::{ClassModel, CodeAttribute, FieldModel, MethodModel};

use crate::error::MixinError;

/// The namespace a mixin target's names are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameType {
    /// Names are already in the runtime (observed) namespace.
    Default,
    /// Names are in the runtime namespace, but matching is delegated to the
    /// mapping service's class-equivalence predicate rather than plain
    /// string equality (the target may be partially obfuscated).
    Obfuscated,
    /// Names are expressed in the human-readable "mapped" namespace and must
    /// be translated through a [`crate::mapping::MappingService`] before
    /// comparison against runtime names.
    Mapped,
}

/// Stable, loggable identity of one scanned mixin: which module produced it
/// and its position within that module's scan output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MixinId {
    pub module: String,
    pub index: usize,
}

impl fmt::Display for MixinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.module, self.index)
    }
}

/// The class a mixin targets, plus the ordering key applied across all
/// mixins matching the same target (ties break by discovery order, i.e. the
/// order the scanner originally returned descriptors in; see
/// [`crate::index::MixinIndex`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTarget {
    pub class_name: String,
    pub name_type: NameType,
    pub priority: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTarget {
    pub class: ClassTarget,
    pub field_name: String,
    pub field_descriptor: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodTarget {
    pub class: ClassTarget,
    pub method_name: String,
    pub method_signature: String,
}

/// A class-kind mixin: rewrites class-level state (access flags, super
/// class, attribute list). Field and method lists are rewritten by their own
/// dedicated mixin kinds, not by this one.
pub trait ClassMixin: Send + Sync {
    fn apply(&self, class: &ClassModel) -> Result<ClassModel, MixinError>;
}

pub trait FieldMixin: Send + Sync {
    fn apply(&self, class: &ClassModel, field: &FieldModel) -> Result<FieldModel, MixinError>;
}

pub trait MethodMixin: Send + Sync {
    fn apply(&self, class: &ClassModel, method: &MethodModel) -> Result<MethodModel, MixinError>;
}

/// Operates on a method's decoded `Code` attribute rather than the method
/// itself, since that's the substructure code-rewriting mixins actually need
/// (instructions, exception table, max stack/locals).
pub trait MethodCodeMixin: Send + Sync {
    fn apply(&self, class: &ClassModel, code: &CodeAttribute) -> Result<CodeAttribute, MixinError>;
}

pub struct ClassMixinDescriptor {
    pub id: MixinId,
    pub target: ClassTarget,
    pub handler: Box<dyn ClassMixin>,
}

pub struct FieldMixinDescriptor {
    pub id: MixinId,
    pub target: FieldTarget,
    pub handler: Box<dyn FieldMixin>,
}

pub struct MethodMixinDescriptor {
    pub id: MixinId,
    pub target: MethodTarget,
    pub handler: Box<dyn MethodMixin>,
}

pub struct MethodCodeMixinDescriptor {
    pub id: MixinId,
    pub target: MethodTarget,
    pub handler: Box<dyn MethodCodeMixin>,
}

/// The four kinds a scanned mixin may be classified as. Mirrors the source
/// system's subclass hierarchy (class / field / method / method-code
/// mixins) as a closed tagged union instead of dynamic dispatch on a common
/// base type, so the rewrite pipeline can match on kind exhaustively.
pub enum ScannedMixin {
    Class(ClassMixinDescriptor),
    Field(FieldMixinDescriptor),
    Method(MethodMixinDescriptor),
    MethodCode(MethodCodeMixinDescriptor),
}
