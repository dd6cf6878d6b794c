use weave_classfile::{ClassModel, CodecError};

/// The class-file codec the transformer parses and re-serializes through.
/// Kept as a narrow trait (rather than calling `weave_classfile` directly)
/// so a host can substitute its own codec as long as it round-trips; the
/// production [`DefaultCodec`] is the only implementation this crate ships.
pub trait ClassCodec: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<ClassModel, CodecError>;
    fn serialize(&self, class: &ClassModel) -> Result<Vec<u8>, CodecError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCodec;

impl ClassCodec for DefaultCodec {
    fn parse(&self, bytes: &[u8]) -> Result<ClassModel, CodecError> {
        ClassModel::parse(bytes)
    }

    fn serialize(&self, class: &ClassModel) -> Result<Vec<u8>, CodecError> {
        class.serialize()
    }
}
