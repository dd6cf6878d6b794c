#![forbid(unsafe_code)]

//! Reader/writer for the class-file format the rewrite pipeline operates on.
//!
//! This crate is deliberately narrow: it decodes enough of the format to
//! give `weave-core` a structured [`ClassModel`] to rewrite, and re-encodes
//! that model back to bytes. Attributes it doesn't specifically understand
//! (anything other than `Code`) are carried through unchanged as opaque
//! bytes rather than rejected or dropped.

mod classfile;
mod code;
mod constant_pool;
mod error;
mod reader;

pub use classfile::{Attribute, ClassModel, FieldModel, MethodModel};
pub use code::{CodeAttribute, ExceptionTableEntry, RawAttribute};
pub use constant_pool::{ConstantPool, ConstantPoolBuilder, CpInfo};
pub use error::{CodecError, Result};
pub use reader::{Reader, Writer};
