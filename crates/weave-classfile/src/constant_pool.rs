use std::collections::HashMap;

use crate::error::{CodecError, Result};
use crate::reader::{Reader, Writer};

#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub enum CpInfo {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    String { string_index: u16 },
    Fieldref { class_index: u16, name_and_type_index: u16 },
    Methodref { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodref { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { reference_kind: u8, reference_index: u16 },
    MethodType { descriptor_index: u16 },
    Dynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    InvokeDynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    Module { name_index: u16 },
    Package { name_index: u16 },
}

impl CpInfo {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            CpInfo::Utf8(_) => "Utf8",
            CpInfo::Integer(_) => "Integer",
            CpInfo::Float(_) => "Float",
            CpInfo::Long(_) => "Long",
            CpInfo::Double(_) => "Double",
            CpInfo::Class { .. } => "Class",
            CpInfo::String { .. } => "String",
            CpInfo::Fieldref { .. } => "Fieldref",
            CpInfo::Methodref { .. } => "Methodref",
            CpInfo::InterfaceMethodref { .. } => "InterfaceMethodref",
            CpInfo::NameAndType { .. } => "NameAndType",
            CpInfo::MethodHandle { .. } => "MethodHandle",
            CpInfo::MethodType { .. } => "MethodType",
            CpInfo::Dynamic { .. } => "Dynamic",
            CpInfo::InvokeDynamic { .. } => "InvokeDynamic",
            CpInfo::Module { .. } => "Module",
            CpInfo::Package { .. } => "Package",
        }
    }

    fn is_wide(&self) -> bool {
        matches!(self, CpInfo::Long(_) | CpInfo::Double(_))
    }
}

/// Read-only view over a parsed constant pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstantPool {
    entries: Vec<Option<CpInfo>>,
}

impl ConstantPool {
    pub fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        let count = reader.read_u2()? as usize;
        if count == 0 {
            return Err(CodecError::Other("constant_pool_count must be >= 1"));
        }

        let mut entries = vec![None; count];
        let mut i = 1usize;
        while i < count {
            let tag = reader.read_u1()?;
            let entry = match tag {
                1 => {
                    let len = reader.read_u2()? as usize;
                    let bytes = reader.read_bytes(len)?;
                    CpInfo::Utf8(decode_modified_utf8(bytes)?)
                }
                3 => CpInfo::Integer(reader.read_i4()?),
                4 => CpInfo::Float(f32::from_bits(reader.read_u4()?)),
                5 => CpInfo::Long(reader.read_i8()?),
                6 => CpInfo::Double(f64::from_bits(reader.read_i8()? as u64)),
                7 => CpInfo::Class { name_index: reader.read_u2()? },
                8 => CpInfo::String { string_index: reader.read_u2()? },
                9 => CpInfo::Fieldref {
                    class_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                },
                10 => CpInfo::Methodref {
                    class_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                },
                11 => CpInfo::InterfaceMethodref {
                    class_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                },
                12 => CpInfo::NameAndType {
                    name_index: reader.read_u2()?,
                    descriptor_index: reader.read_u2()?,
                },
                15 => CpInfo::MethodHandle {
                    reference_kind: reader.read_u1()?,
                    reference_index: reader.read_u2()?,
                },
                16 => CpInfo::MethodType { descriptor_index: reader.read_u2()? },
                17 => CpInfo::Dynamic {
                    bootstrap_method_attr_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                },
                18 => CpInfo::InvokeDynamic {
                    bootstrap_method_attr_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                },
                19 => CpInfo::Module { name_index: reader.read_u2()? },
                20 => CpInfo::Package { name_index: reader.read_u2()? },
                other => return Err(CodecError::InvalidConstantPoolTag(other)),
            };

            entries[i] = Some(entry);
            if entries[i].as_ref().unwrap().is_wide() {
                if i + 1 >= count {
                    return Err(CodecError::Other("malformed constant pool"));
                }
                i += 2;
            } else {
                i += 1;
            }
        }

        Ok(Self { entries })
    }

    pub fn get(&self, index: u16) -> Result<&CpInfo> {
        let idx = index as usize;
        if idx == 0 || idx >= self.entries.len() {
            return Err(CodecError::InvalidConstantPoolIndex(index));
        }
        self.entries[idx].as_ref().ok_or(CodecError::InvalidConstantPoolIndex(index))
    }

    pub fn get_utf8(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            CpInfo::Utf8(s) => Ok(s.as_str()),
            other => Err(CodecError::ConstantPoolTypeMismatch {
                index,
                expected: "Utf8",
                found: other.kind(),
            }),
        }
    }

    pub fn get_class_name(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            CpInfo::Class { name_index } => Ok(self.get_utf8(*name_index)?.to_string()),
            other => Err(CodecError::ConstantPoolTypeMismatch {
                index,
                expected: "Class",
                found: other.kind(),
            }),
        }
    }
}

/// Builds a fresh constant pool during serialization, interning strings and
/// class references on demand and deduplicating repeats.
///
/// Entries are slot-addressed like [`ConstantPool`]'s own storage (index 0
/// unused, a `Long`/`Double` entry's second slot left `None`) rather than
/// densely packed, so that [`Self::seed_from`] can replay an original pool
/// at the exact indices it already had.
pub struct ConstantPoolBuilder {
    entries: Vec<Option<CpInfo>>,
    utf8_index: HashMap<String, u16>,
    class_index: HashMap<String, u16>,
}

impl Default for ConstantPoolBuilder {
    fn default() -> Self {
        // Slot 0 is unused; entries are 1-indexed like the file format.
        Self { entries: vec![None], utf8_index: HashMap::new(), class_index: HashMap::new() }
    }
}

impl ConstantPoolBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the builder with every entry of `original`, copying each one
    /// through via [`Self::copy_raw`] before any new interning happens.
    ///
    /// `serialize` calls this first so that Code instruction operands and
    /// nested-attribute payloads (opaque byte blobs this codec never
    /// inspects, let alone rewrites) keep referencing the same constant
    /// pool entries after a rebuild: copying every original entry before
    /// interning anything new reproduces the original indices exactly, and
    /// only a mixin-introduced name that wasn't already in the pool ends up
    /// appended past the original extent.
    pub fn seed_from(&mut self, original: &ConstantPool) -> Result<()> {
        for entry in original.entries.iter().flatten() {
            let index = self.copy_raw(entry.clone())?;
            if let CpInfo::Utf8(s) = entry {
                self.utf8_index.entry(s.clone()).or_insert(index);
            }
        }
        // Class entries only carry a name_index, so resolve names in a
        // second pass now that every Utf8 entry has been copied in.
        for index in 0..self.entries.len() {
            let Some(CpInfo::Class { name_index }) = &self.entries[index] else { continue };
            let name_index = *name_index as usize;
            if let Some(Some(CpInfo::Utf8(name))) = self.entries.get(name_index) {
                self.class_index.entry(name.clone()).or_insert(index as u16);
            }
        }
        Ok(())
    }

    fn push(&mut self, entry: CpInfo) -> Result<u16> {
        let wide = entry.is_wide();
        let index = self.entries.len();
        if index > u16::MAX as usize {
            return Err(CodecError::Other("constant pool overflow"));
        }
        self.entries.push(Some(entry));
        if wide {
            // Long/Double entries occupy two constant pool indices; the
            // second is reserved and never written to.
            if self.entries.len() > u16::MAX as usize {
                return Err(CodecError::Other("constant pool overflow"));
            }
            self.entries.push(None);
        }
        Ok(index as u16)
    }

    pub fn intern_utf8(&mut self, s: &str) -> Result<u16> {
        if let Some(idx) = self.utf8_index.get(s) {
            return Ok(*idx);
        }
        let idx = self.push(CpInfo::Utf8(s.to_string()))?;
        self.utf8_index.insert(s.to_string(), idx);
        Ok(idx)
    }

    pub fn intern_class(&mut self, internal_name: &str) -> Result<u16> {
        if let Some(idx) = self.class_index.get(internal_name) {
            return Ok(*idx);
        }
        let name_index = self.intern_utf8(internal_name)?;
        let idx = self.push(CpInfo::Class { name_index })?;
        self.class_index.insert(internal_name.to_string(), idx);
        Ok(idx)
    }

    /// Copies a verbatim entry (used by [`Self::seed_from`], and directly by
    /// callers that need to preserve a numeric/ref constant the rewrite
    /// pipeline never inspects).
    pub fn copy_raw(&mut self, entry: CpInfo) -> Result<u16> {
        self.push(entry)
    }

    pub fn write(&self, writer: &mut Writer) -> Result<()> {
        let count = self.entries.len();
        if count > u16::MAX as usize {
            return Err(CodecError::Other("constant pool overflow"));
        }
        writer.write_u2(count as u16);
        for entry in self.entries.iter().skip(1).flatten() {
            write_cp_entry(writer, entry)?;
        }
        Ok(())
    }
}

fn write_cp_entry(writer: &mut Writer, entry: &CpInfo) -> Result<()> {
    match entry {
        CpInfo::Utf8(s) => {
            writer.write_u1(1);
            let bytes = encode_modified_utf8(s);
            if bytes.len() > u16::MAX as usize {
                return Err(CodecError::AttributePayloadTooLarge(bytes.len()));
            }
            writer.write_u2(bytes.len() as u16);
            writer.write_bytes(&bytes);
        }
        CpInfo::Integer(v) => {
            writer.write_u1(3);
            writer.write_i4(*v);
        }
        CpInfo::Float(v) => {
            writer.write_u1(4);
            writer.write_u4(v.to_bits());
        }
        CpInfo::Long(v) => {
            writer.write_u1(5);
            writer.write_i8(*v);
        }
        CpInfo::Double(v) => {
            writer.write_u1(6);
            writer.write_i8(v.to_bits() as i64);
        }
        CpInfo::Class { name_index } => {
            writer.write_u1(7);
            writer.write_u2(*name_index);
        }
        CpInfo::String { string_index } => {
            writer.write_u1(8);
            writer.write_u2(*string_index);
        }
        CpInfo::Fieldref { class_index, name_and_type_index } => {
            writer.write_u1(9);
            writer.write_u2(*class_index);
            writer.write_u2(*name_and_type_index);
        }
        CpInfo::Methodref { class_index, name_and_type_index } => {
            writer.write_u1(10);
            writer.write_u2(*class_index);
            writer.write_u2(*name_and_type_index);
        }
        CpInfo::InterfaceMethodref { class_index, name_and_type_index } => {
            writer.write_u1(11);
            writer.write_u2(*class_index);
            writer.write_u2(*name_and_type_index);
        }
        CpInfo::NameAndType { name_index, descriptor_index } => {
            writer.write_u1(12);
            writer.write_u2(*name_index);
            writer.write_u2(*descriptor_index);
        }
        CpInfo::MethodHandle { reference_kind, reference_index } => {
            writer.write_u1(15);
            writer.write_u1(*reference_kind);
            writer.write_u2(*reference_index);
        }
        CpInfo::MethodType { descriptor_index } => {
            writer.write_u1(16);
            writer.write_u2(*descriptor_index);
        }
        CpInfo::Dynamic { bootstrap_method_attr_index, name_and_type_index } => {
            writer.write_u1(17);
            writer.write_u2(*bootstrap_method_attr_index);
            writer.write_u2(*name_and_type_index);
        }
        CpInfo::InvokeDynamic { bootstrap_method_attr_index, name_and_type_index } => {
            writer.write_u1(18);
            writer.write_u2(*bootstrap_method_attr_index);
            writer.write_u2(*name_and_type_index);
        }
        CpInfo::Module { name_index } => {
            writer.write_u1(19);
            writer.write_u2(*name_index);
        }
        CpInfo::Package { name_index } => {
            writer.write_u1(20);
            writer.write_u2(*name_index);
        }
    }
    Ok(())
}

fn decode_modified_utf8(bytes: &[u8]) -> Result<String> {
    // Modified UTF-8 as used in class files is UTF-8 for the BMP plus NUL
    // encoded as 0xC0 0x80 and supplementary characters as surrogate pairs
    // (CESU-8 style). Decode into UTF-16 code units, then convert.
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            units.push(b as u16);
            i += 1;
            continue;
        }

        if (b & 0xE0) == 0xC0 {
            if i + 1 >= bytes.len() {
                return Err(CodecError::InvalidModifiedUtf8);
            }
            let b2 = bytes[i + 1];
            if b == 0xC0 && b2 == 0x80 {
                units.push(0);
            } else {
                if (b2 & 0xC0) != 0x80 {
                    return Err(CodecError::InvalidModifiedUtf8);
                }
                units.push((((b & 0x1F) as u16) << 6) | ((b2 & 0x3F) as u16));
            }
            i += 2;
            continue;
        }

        if (b & 0xF0) == 0xE0 {
            if i + 2 >= bytes.len() {
                return Err(CodecError::InvalidModifiedUtf8);
            }
            let b2 = bytes[i + 1];
            let b3 = bytes[i + 2];
            if (b2 & 0xC0) != 0x80 || (b3 & 0xC0) != 0x80 {
                return Err(CodecError::InvalidModifiedUtf8);
            }
            units.push((((b & 0x0F) as u16) << 12) | (((b2 & 0x3F) as u16) << 6) | ((b3 & 0x3F) as u16));
            i += 3;
            continue;
        }

        return Err(CodecError::InvalidModifiedUtf8);
    }

    // Classfiles may legally contain unpaired surrogates; decode losslessly
    // where possible but never reject the whole file over one bad unit.
    Ok(String::from_utf16_lossy(&units))
}

fn encode_modified_utf8(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for unit in s.encode_utf16() {
        match unit {
            0 => out.extend_from_slice(&[0xC0, 0x80]),
            1..=0x7F => out.push(unit as u8),
            0x80..=0x7FF => {
                out.push(0xC0 | ((unit >> 6) as u8));
                out.push(0x80 | ((unit & 0x3F) as u8));
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) as u8));
                out.push(0x80 | (((unit >> 6) & 0x3F) as u8));
                out.push(0x80 | ((unit & 0x3F) as u8));
            }
        }
    }
    out
}
