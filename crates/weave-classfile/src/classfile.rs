use crate::code::CodeAttribute;
use crate::constant_pool::{ConstantPool, ConstantPoolBuilder};
use crate::error::{CodecError, Result};
use crate::reader::{Reader, Writer};

const MAGIC: u32 = 0xCAFE_BABE;
const CODE_ATTRIBUTE_NAME: &str = "Code";

/// A class-level, field-level, or method-level attribute. `Code` is decoded
/// eagerly since the rewrite pipeline needs to reach into it; every other
/// attribute (`Signature`, `RuntimeVisibleAnnotations`, `InnerClasses`, and
/// anything this codec doesn't know about) is kept as an opaque byte blob so
/// it survives a rewrite unchanged even though this codec never interprets
/// it.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Code(CodeAttribute),
    Raw { name: String, info: Vec<u8> },
}

impl Attribute {
    pub fn name(&self) -> &str {
        match self {
            Attribute::Code(_) => CODE_ATTRIBUTE_NAME,
            Attribute::Raw { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldModel {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodModel {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub attributes: Vec<Attribute>,
}

impl MethodModel {
    /// The method's `Code` attribute, if it has one (absent for abstract and
    /// native methods).
    pub fn code(&self) -> Option<&CodeAttribute> {
        self.attributes.iter().find_map(|a| match a {
            Attribute::Code(c) => Some(c),
            _ => None,
        })
    }

    /// Replaces the method's `Code` attribute in place, preserving its
    /// position in the attribute list. No-op if the method has none.
    pub fn with_code(mut self, code: CodeAttribute) -> Self {
        for attr in &mut self.attributes {
            if let Attribute::Code(_) = attr {
                *attr = Attribute::Code(code);
                return self;
            }
        }
        self
    }
}

/// The full parsed representation of one class file.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassModel {
    pub minor_version: u16,
    pub major_version: u16,
    pub access_flags: u16,
    pub this_class: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldModel>,
    pub methods: Vec<MethodModel>,
    pub attributes: Vec<Attribute>,
    /// The constant pool this model was parsed from. `serialize` seeds a
    /// fresh builder from it before interning anything new, so that Code
    /// instruction operands and raw nested-attribute payloads — which
    /// reference the pool by fixed numeric index and are never rewritten by
    /// this codec — keep pointing at the right entries. Defaults to an
    /// empty pool for a `ClassModel` built by hand rather than via `parse`.
    pub constant_pool: ConstantPool,
}

impl ClassModel {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let magic = reader.read_u4()?;
        if magic != MAGIC {
            return Err(CodecError::InvalidMagic(magic));
        }
        let minor_version = reader.read_u2()?;
        let major_version = reader.read_u2()?;

        let cp = ConstantPool::parse(&mut reader)?;

        let access_flags = reader.read_u2()?;
        let this_class_index = reader.read_u2()?;
        let this_class = cp.get_class_name(this_class_index)?;

        let super_class_index = reader.read_u2()?;
        let super_class =
            if super_class_index == 0 { None } else { Some(cp.get_class_name(super_class_index)?) };

        let interfaces_count = reader.read_u2()? as usize;
        let mut interfaces = Vec::with_capacity(interfaces_count);
        for _ in 0..interfaces_count {
            let idx = reader.read_u2()?;
            interfaces.push(cp.get_class_name(idx)?);
        }

        let fields_count = reader.read_u2()? as usize;
        let mut fields = Vec::with_capacity(fields_count);
        for _ in 0..fields_count {
            fields.push(parse_member(&mut reader, &cp)?.into_field());
        }

        let methods_count = reader.read_u2()? as usize;
        let mut methods = Vec::with_capacity(methods_count);
        for _ in 0..methods_count {
            methods.push(parse_member(&mut reader, &cp)?.into_method());
        }

        let attributes = parse_attributes(&mut reader, &cp)?;
        reader.ensure_empty()?;

        Ok(Self {
            minor_version,
            major_version,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
            constant_pool: cp,
        })
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut builder = ConstantPoolBuilder::new();
        builder.seed_from(&self.constant_pool)?;

        let this_class_index = builder.intern_class(&self.this_class)?;
        let super_class_index = match &self.super_class {
            Some(name) => builder.intern_class(name)?,
            None => 0,
        };
        let mut interface_indices = Vec::with_capacity(self.interfaces.len());
        for name in &self.interfaces {
            interface_indices.push(builder.intern_class(name)?);
        }

        let mut fields_body = Writer::new();
        for field in &self.fields {
            write_member(&mut fields_body, &mut builder, &field.access_flags, &field.name, &field.descriptor, &field.attributes)?;
        }

        let mut methods_body = Writer::new();
        for method in &self.methods {
            write_member(&mut methods_body, &mut builder, &method.access_flags, &method.name, &method.descriptor, &method.attributes)?;
        }

        let mut class_attrs_body = Writer::new();
        write_attributes(&mut class_attrs_body, &mut builder, &self.attributes)?;

        let mut out = Writer::new();
        out.write_u4(MAGIC);
        out.write_u2(self.minor_version);
        out.write_u2(self.major_version);
        builder.write(&mut out)?;
        out.write_u2(self.access_flags);
        out.write_u2(this_class_index);
        out.write_u2(super_class_index);

        if interface_indices.len() > u16::MAX as usize {
            return Err(CodecError::AttributePayloadTooLarge(interface_indices.len()));
        }
        out.write_u2(interface_indices.len() as u16);
        for idx in interface_indices {
            out.write_u2(idx);
        }

        if self.fields.len() > u16::MAX as usize {
            return Err(CodecError::AttributePayloadTooLarge(self.fields.len()));
        }
        out.write_u2(self.fields.len() as u16);
        out.write_bytes(&fields_body.into_bytes());

        if self.methods.len() > u16::MAX as usize {
            return Err(CodecError::AttributePayloadTooLarge(self.methods.len()));
        }
        out.write_u2(self.methods.len() as u16);
        out.write_bytes(&methods_body.into_bytes());

        out.write_bytes(&class_attrs_body.into_bytes());

        Ok(out.into_bytes())
    }
}

struct ParsedMember {
    access_flags: u16,
    name: String,
    descriptor: String,
    attributes: Vec<Attribute>,
}

impl ParsedMember {
    fn into_field(self) -> FieldModel {
        FieldModel { access_flags: self.access_flags, name: self.name, descriptor: self.descriptor, attributes: self.attributes }
    }
    fn into_method(self) -> MethodModel {
        MethodModel { access_flags: self.access_flags, name: self.name, descriptor: self.descriptor, attributes: self.attributes }
    }
}

fn parse_member(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<ParsedMember> {
    let access_flags = reader.read_u2()?;
    let name_index = reader.read_u2()?;
    let descriptor_index = reader.read_u2()?;
    let name = cp.get_utf8(name_index)?.to_string();
    let descriptor = cp.get_utf8(descriptor_index)?.to_string();
    let attributes = parse_attributes(reader, cp)?;
    Ok(ParsedMember { access_flags, name, descriptor, attributes })
}

fn parse_attributes(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<Vec<Attribute>> {
    let count = reader.read_u2()? as usize;
    let mut attributes = Vec::with_capacity(count);
    for _ in 0..count {
        let name_index = reader.read_u2()?;
        let name = cp.get_utf8(name_index)?.to_string();
        let len = reader.read_u4()? as usize;
        let info = reader.read_bytes(len)?;
        if name == CODE_ATTRIBUTE_NAME {
            let code = CodeAttribute::decode(info, cp)?;
            attributes.push(Attribute::Code(code));
        } else {
            attributes.push(Attribute::Raw { name, info: info.to_vec() });
        }
    }
    Ok(attributes)
}

fn write_attributes(writer: &mut Writer, builder: &mut ConstantPoolBuilder, attributes: &[Attribute]) -> Result<()> {
    if attributes.len() > u16::MAX as usize {
        return Err(CodecError::AttributePayloadTooLarge(attributes.len()));
    }
    writer.write_u2(attributes.len() as u16);
    for attr in attributes {
        let name_index = builder.intern_utf8(attr.name())?;
        writer.write_u2(name_index);
        let info = match attr {
            Attribute::Code(code) => code.encode(builder)?,
            Attribute::Raw { info, .. } => info.clone(),
        };
        if info.len() > u32::MAX as usize {
            return Err(CodecError::AttributePayloadTooLarge(info.len()));
        }
        writer.write_u4(info.len() as u32);
        writer.write_bytes(&info);
    }
    Ok(())
}

fn write_member(
    writer: &mut Writer,
    builder: &mut ConstantPoolBuilder,
    access_flags: &u16,
    name: &str,
    descriptor: &str,
    attributes: &[Attribute],
) -> Result<()> {
    writer.write_u2(*access_flags);
    writer.write_u2(builder.intern_utf8(name)?);
    writer.write_u2(builder.intern_utf8(descriptor)?);
    write_attributes(writer, builder, attributes)
}
