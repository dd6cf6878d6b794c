use thiserror::Error;

pub type Result<T> = std::result::Result<T, CodecError>;

/// Failures raised while decoding or encoding a class file, or the `Code`
/// attribute nested inside a method.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("invalid class file magic: {0:#010x}")]
    InvalidMagic(u32),
    #[error("invalid constant pool index: {0}")]
    InvalidConstantPoolIndex(u16),
    #[error("invalid constant pool tag: {0}")]
    InvalidConstantPoolTag(u8),
    #[error("constant pool entry {index} expected {expected}, found {found}")]
    ConstantPoolTypeMismatch {
        index: u16,
        expected: &'static str,
        found: &'static str,
    },
    #[error("invalid modified UTF-8 in constant pool")]
    InvalidModifiedUtf8,
    #[error("attribute payload too large to encode: {0} bytes")]
    AttributePayloadTooLarge(usize),
    #[error("{0}")]
    Other(&'static str),
}
