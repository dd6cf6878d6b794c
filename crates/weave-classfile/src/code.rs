use crate::constant_pool::{ConstantPool, ConstantPoolBuilder};
use crate::error::{CodecError, Result};
use crate::reader::{Reader, Writer};

/// One entry of a method's exception table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// Constant pool index of the caught type, or `0` for a catch-all.
    pub catch_type: u16,
}

/// A nested attribute carried by the `Code` attribute (e.g. `LineNumberTable`,
/// `LocalVariableTable`). Payloads are opaque: mixins that need to inspect
/// them decode `info` themselves via the descriptor/signature helpers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    pub name: String,
    pub info: Vec<u8>,
}

/// Decoded form of a method's `Code` attribute. `instructions` is kept as an
/// opaque byte run rather than a disassembled instruction list: decoding and
/// re-encoding bytecode operands is the concern of whatever mixin chooses to
/// rewrite code, not of this codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub instructions: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Vec<RawAttribute>,
}

impl CodeAttribute {
    /// Decodes a `Code` attribute's `info` payload. Nested attribute names
    /// are resolved against `pool` since, like every attribute name in a
    /// class file, they are stored as constant pool indices rather than
    /// inline text.
    pub fn decode(bytes: &[u8], pool: &ConstantPool) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let max_stack = reader.read_u2()?;
        let max_locals = reader.read_u2()?;
        let code_length = reader.read_u4()? as usize;
        let instructions = reader.read_bytes(code_length)?.to_vec();

        let exception_table_length = reader.read_u2()? as usize;
        let mut exception_table = Vec::with_capacity(exception_table_length);
        for _ in 0..exception_table_length {
            exception_table.push(ExceptionTableEntry {
                start_pc: reader.read_u2()?,
                end_pc: reader.read_u2()?,
                handler_pc: reader.read_u2()?,
                catch_type: reader.read_u2()?,
            });
        }

        let attributes_count = reader.read_u2()? as usize;
        let mut attributes = Vec::with_capacity(attributes_count);
        for _ in 0..attributes_count {
            let name_index = reader.read_u2()?;
            let name = pool.get_utf8(name_index)?.to_string();
            let len = reader.read_u4()? as usize;
            let info = reader.read_bytes(len)?.to_vec();
            attributes.push(RawAttribute { name, info });
        }

        reader.ensure_empty()?;
        Ok(Self { max_stack, max_locals, instructions, exception_table, attributes })
    }

    /// Encodes this `Code` attribute back into its `info` payload, interning
    /// any nested attribute names into `builder`.
    pub fn encode(&self, builder: &mut ConstantPoolBuilder) -> Result<Vec<u8>> {
        let mut writer = Writer::new();
        writer.write_u2(self.max_stack);
        writer.write_u2(self.max_locals);
        if self.instructions.len() > u32::MAX as usize {
            return Err(CodecError::AttributePayloadTooLarge(self.instructions.len()));
        }
        writer.write_u4(self.instructions.len() as u32);
        writer.write_bytes(&self.instructions);

        if self.exception_table.len() > u16::MAX as usize {
            return Err(CodecError::AttributePayloadTooLarge(self.exception_table.len()));
        }
        writer.write_u2(self.exception_table.len() as u16);
        for entry in &self.exception_table {
            writer.write_u2(entry.start_pc);
            writer.write_u2(entry.end_pc);
            writer.write_u2(entry.handler_pc);
            writer.write_u2(entry.catch_type);
        }

        if self.attributes.len() > u16::MAX as usize {
            return Err(CodecError::AttributePayloadTooLarge(self.attributes.len()));
        }
        writer.write_u2(self.attributes.len() as u16);
        for attr in &self.attributes {
            let name_index = builder.intern_utf8(&attr.name)?;
            writer.write_u2(name_index);
            if attr.info.len() > u32::MAX as usize {
                return Err(CodecError::AttributePayloadTooLarge(attr.info.len()));
            }
            writer.write_u4(attr.info.len() as u32);
            writer.write_bytes(&attr.info);
        }

        Ok(writer.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Reader as RawReader;

    fn empty_pool() -> ConstantPool {
        // A minimal valid pool: count = 1 means no entries (indices 1..<1
        // never get read by a Code attribute with zero nested attributes).
        let mut w = Writer::new();
        w.write_u2(1);
        let bytes = w.into_bytes();
        ConstantPool::parse(&mut RawReader::new(&bytes)).unwrap()
    }

    #[test]
    fn round_trips_instructions_and_exception_table() {
        let code = CodeAttribute {
            max_stack: 2,
            max_locals: 1,
            instructions: vec![0x2a, 0xb1], // aload_0, return
            exception_table: vec![ExceptionTableEntry {
                start_pc: 0,
                end_pc: 2,
                handler_pc: 2,
                catch_type: 0,
            }],
            attributes: vec![],
        };
        let mut builder = ConstantPoolBuilder::new();
        let bytes = code.encode(&mut builder).unwrap();

        let mut pool_writer = Writer::new();
        builder.write(&mut pool_writer).unwrap();
        let pool_bytes = pool_writer.into_bytes();
        let pool = ConstantPool::parse(&mut RawReader::new(&pool_bytes)).unwrap();

        let decoded = CodeAttribute::decode(&bytes, &pool).unwrap();
        assert_eq!(decoded, code);
    }

    #[test]
    fn decode_rejects_truncated_payload() {
        let pool = empty_pool();
        assert!(CodeAttribute::decode(&[0, 1], &pool).is_err());
    }
}
