//! Mixin registry, matcher, and class rewriting pipeline.
//!
//! [`Engine`] is the single entry point a host embeds: it holds the scanned
//! mixin index, the name normalizer, and the host's [`MappingService`] and
//! [`ClassCodec`] collaborators, and exposes [`Engine::modify_class`] as the
//! two-phase probe/transform operation a class loader calls for every class
//! it is about to define.

mod codec;
mod error;
mod index;
mod mapping;
mod matcher;
mod mixin;
mod name;
mod options;
mod panic_util;
mod scanner;
mod selector;
mod stats;
mod transform;

pub use codec::{ClassCodec, DefaultCodec};
pub use error::{EngineError, MixinError};
pub use index::MixinIndex;
pub use mapping::{ClassMappingEntry, MappedMemberResolution, MappingService, MemberMapping};
pub use mixin::{
    ClassMixin, ClassMixinDescriptor, ClassTarget, FieldMixin, FieldMixinDescriptor, FieldTarget, MethodCodeMixin,
    MethodCodeMixinDescriptor, MethodMixin, MethodMixinDescriptor, MethodTarget, MixinId, NameType, ScannedMixin,
};
pub use name::NameNormalizer;
pub use options::EngineOptions;
pub use scanner::MixinScanner;
pub use stats::{EngineStats, LastFailure, MixinStats};
pub use transform::Engine;

pub mod selection {
    //! Standalone selection queries, exposed for hosts that want to answer
    //! "what would match this name" without running a full transform (e.g.
    //! diagnostics, dry-run tooling).
    pub use crate::selector::{has_any, select_class, select_field, select_method, select_method_code};
}
