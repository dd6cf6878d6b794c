use thiserror::Error;

/// An error raised by a single mixin invocation. The engine never surfaces
/// this past the `Engine::modify_class` boundary (see [`crate::transform`]);
/// it exists so mixin authors get a typed way to fail a single application
/// instead of panicking.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct MixinError {
    pub message: String,
}

impl MixinError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Internal engine failures. Like [`MixinError`], these never cross the
/// `Engine::modify_class` boundary — every variant is logged and converted
/// to "no modification" by the transformer. Per-mixin invocation failures
/// (a single `Err` return or panic) are not modeled here: they're narrower
/// in scope than a whole-class failure, so the transformer logs them
/// directly at the call site instead of routing them through this enum.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to parse class {class_name}: {source}")]
    Parse { class_name: String, #[source] source: weave_classfile::CodecError },
    #[error("failed to serialize class {class_name}: {source}")]
    Serialize { class_name: String, #[source] source: weave_classfile::CodecError },
}
