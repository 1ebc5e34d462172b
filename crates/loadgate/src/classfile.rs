//! Class-file codec.
//!
//! A buffer writer that produces minimal, verifier-valid JVM class files,
//! and a header reader that walks the constant pool and member tables far
//! enough to report what a class declares. Only the structures the harness
//! needs are modelled; attribute bodies are skipped, not decoded.

use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Class file magic number
pub const MAGIC: u32 = 0xCAFE_BABE;

/// Major version emitted for Java 8
pub const JAVA_8: u16 = 52;

/// Access flags (JVMS 4.1, 4.6)
pub mod access {
    /// Declared public
    pub const ACC_PUBLIC: u16 = 0x0001;
    /// Declared private
    pub const ACC_PRIVATE: u16 = 0x0002;
    /// Declared static
    pub const ACC_STATIC: u16 = 0x0008;
    /// Declared final
    pub const ACC_FINAL: u16 = 0x0010;
    /// Treat superclass methods specially in invokespecial
    pub const ACC_SUPER: u16 = 0x0020;
    /// Is an interface
    pub const ACC_INTERFACE: u16 = 0x0200;
    /// Declared abstract
    pub const ACC_ABSTRACT: u16 = 0x0400;
    /// Not present in source
    pub const ACC_SYNTHETIC: u16 = 0x1000;
}

/// JVM opcodes used by generated method bodies
pub mod opcode {
    /// Load reference from local 0
    pub const ALOAD_0: u8 = 0x2A;
    /// Return void
    pub const RETURN: u8 = 0xB1;
    /// Invoke instance initializer or private method
    pub const INVOKESPECIAL: u8 = 0xB7;
}

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_INTERFACE_METHODREF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;
const TAG_METHOD_HANDLE: u8 = 15;
const TAG_METHOD_TYPE: u8 = 16;
const TAG_DYNAMIC: u8 = 17;
const TAG_INVOKE_DYNAMIC: u8 = 18;
const TAG_MODULE: u8 = 19;
const TAG_PACKAGE: u8 = 20;

/// Encode a string as JVM "modified UTF-8" (JVMS 4.4.7).
#[must_use]
pub fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

/// Decode JVM "modified UTF-8".
///
/// # Errors
///
/// Returns [`HarnessError::ClassFormat`] on truncated or invalid sequences.
pub fn decode_modified_utf8(bytes: &[u8]) -> HarnessResult<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = u16::from(bytes[i]);
        let (unit, width) = if b0 & 0x80 == 0 {
            (b0, 1)
        } else if b0 & 0xE0 == 0xC0 {
            let b1 = continuation(bytes, i + 1)?;
            (((b0 & 0x1F) << 6) | b1, 2)
        } else if b0 & 0xF0 == 0xE0 {
            let b1 = continuation(bytes, i + 1)?;
            let b2 = continuation(bytes, i + 2)?;
            (((b0 & 0x0F) << 12) | (b1 << 6) | b2, 3)
        } else {
            return Err(HarnessError::class_format(format!(
                "invalid modified UTF-8 lead byte 0x{b0:02X}"
            )));
        };
        units.push(unit);
        i += width;
    }
    String::from_utf16(&units)
        .map_err(|e| HarnessError::class_format(format!("invalid UTF-16 in constant: {e}")))
}

fn continuation(bytes: &[u8], at: usize) -> HarnessResult<u16> {
    match bytes.get(at) {
        Some(b) if b & 0xC0 == 0x80 => Ok(u16::from(b & 0x3F)),
        _ => Err(HarnessError::class_format(
            "truncated modified UTF-8 sequence",
        )),
    }
}

// =============================================================================
// Writer
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Constant {
    Utf8(String),
    Class(u16),
    NameAndType(u16, u16),
    Methodref(u16, u16),
}

/// Deduplicating constant pool builder.
#[derive(Debug, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
    index: HashMap<Constant, u16>,
}

impl ConstantPool {
    /// Create an empty pool
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, constant: Constant) -> HarnessResult<u16> {
        if let Some(&idx) = self.index.get(&constant) {
            return Ok(idx);
        }
        // Slot 0 is reserved; the count field is entries + 1.
        let idx = u16::try_from(self.entries.len() + 1)
            .ok()
            .filter(|&idx| idx < u16::MAX)
            .ok_or_else(|| HarnessError::class_format("constant pool overflow"))?;
        self.entries.push(constant.clone());
        let _ = self.index.insert(constant, idx);
        Ok(idx)
    }

    /// Intern a `CONSTANT_Utf8`
    pub fn utf8(&mut self, value: &str) -> HarnessResult<u16> {
        self.intern(Constant::Utf8(value.to_string()))
    }

    /// Intern a `CONSTANT_Class` for an internal name
    pub fn class(&mut self, internal_name: &str) -> HarnessResult<u16> {
        let name = self.utf8(internal_name)?;
        self.intern(Constant::Class(name))
    }

    /// Intern a `CONSTANT_NameAndType`
    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> HarnessResult<u16> {
        let name = self.utf8(name)?;
        let descriptor = self.utf8(descriptor)?;
        self.intern(Constant::NameAndType(name, descriptor))
    }

    /// Intern a `CONSTANT_Methodref`
    pub fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> HarnessResult<u16> {
        let class = self.class(owner)?;
        let nat = self.name_and_type(name, descriptor)?;
        self.intern(Constant::Methodref(class, nat))
    }

    /// Number of entries (excluding the reserved slot)
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn write(&self, out: &mut Vec<u8>) -> HarnessResult<()> {
        let count = u16::try_from(self.entries.len() + 1)
            .map_err(|_| HarnessError::class_format("constant pool overflow"))?;
        put_u16(out, count);
        for entry in &self.entries {
            match entry {
                Constant::Utf8(value) => {
                    let encoded = encode_modified_utf8(value);
                    let len = u16::try_from(encoded.len()).map_err(|_| {
                        HarnessError::class_format("UTF-8 constant longer than 65535 bytes")
                    })?;
                    out.push(TAG_UTF8);
                    put_u16(out, len);
                    out.extend_from_slice(&encoded);
                }
                Constant::Class(name) => {
                    out.push(TAG_CLASS);
                    put_u16(out, *name);
                }
                Constant::NameAndType(name, descriptor) => {
                    out.push(TAG_NAME_AND_TYPE);
                    put_u16(out, *name);
                    put_u16(out, *descriptor);
                }
                Constant::Methodref(class, nat) => {
                    out.push(TAG_METHODREF);
                    put_u16(out, *class);
                    put_u16(out, *nat);
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct MethodEntry {
    access: u16,
    name: u16,
    descriptor: u16,
    code: Option<CodeBody>,
}

#[derive(Debug, Clone)]
struct CodeBody {
    attribute_name: u16,
    max_stack: u16,
    max_locals: u16,
    bytecode: Vec<u8>,
}

/// Builder for a class file with methods but no fields.
#[derive(Debug)]
pub struct ClassWriter {
    major: u16,
    minor: u16,
    access: u16,
    this_class: u16,
    super_class: u16,
    pool: ConstantPool,
    methods: Vec<MethodEntry>,
}

impl ClassWriter {
    /// Start a class `name` extending `super_name` (both internal names).
    ///
    /// # Errors
    ///
    /// Returns an error if either name is empty.
    pub fn new(major: u16, access: u16, name: &str, super_name: &str) -> HarnessResult<Self> {
        if name.is_empty() || super_name.is_empty() {
            return Err(HarnessError::class_format("class names must not be empty"));
        }
        let mut pool = ConstantPool::new();
        let this_class = pool.class(name)?;
        let super_class = pool.class(super_name)?;
        Ok(Self {
            major,
            minor: 0,
            access,
            this_class,
            super_class,
            pool,
            methods: Vec::new(),
        })
    }

    /// Add a method with a `Code` attribute.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool overflows.
    pub fn add_method(
        &mut self,
        access: u16,
        name: &str,
        descriptor: &str,
        max_stack: u16,
        max_locals: u16,
        bytecode: Vec<u8>,
    ) -> HarnessResult<&mut Self> {
        let name = self.pool.utf8(name)?;
        let descriptor = self.pool.utf8(descriptor)?;
        let attribute_name = self.pool.utf8("Code")?;
        self.methods.push(MethodEntry {
            access,
            name,
            descriptor,
            code: Some(CodeBody {
                attribute_name,
                max_stack,
                max_locals,
                bytecode,
            }),
        });
        Ok(self)
    }

    /// Add a method with no body (abstract or native).
    ///
    /// # Errors
    ///
    /// Returns an error if the pool overflows.
    pub fn add_abstract_method(
        &mut self,
        access: u16,
        name: &str,
        descriptor: &str,
    ) -> HarnessResult<&mut Self> {
        let name = self.pool.utf8(name)?;
        let descriptor = self.pool.utf8(descriptor)?;
        self.methods.push(MethodEntry {
            access,
            name,
            descriptor,
            code: None,
        });
        Ok(self)
    }

    /// Add `public <init>()V` that only calls the superclass constructor.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool overflows.
    pub fn add_default_constructor(&mut self, super_name: &str) -> HarnessResult<&mut Self> {
        let super_init = self.pool.method_ref(super_name, "<init>", "()V")?;
        let [hi, lo] = super_init.to_be_bytes();
        let bytecode = vec![
            opcode::ALOAD_0,
            opcode::INVOKESPECIAL,
            hi,
            lo,
            opcode::RETURN,
        ];
        self.add_method(access::ACC_PUBLIC, "<init>", "()V", 1, 1, bytecode)
    }

    /// Serialize the class file.
    ///
    /// # Errors
    ///
    /// Returns an error if a table exceeds the format's size limits.
    pub fn to_bytes(&self) -> HarnessResult<Vec<u8>> {
        let mut out = Vec::with_capacity(256);
        put_u32(&mut out, MAGIC);
        put_u16(&mut out, self.minor);
        put_u16(&mut out, self.major);
        self.pool.write(&mut out)?;
        put_u16(&mut out, self.access);
        put_u16(&mut out, self.this_class);
        put_u16(&mut out, self.super_class);
        put_u16(&mut out, 0); // interfaces
        put_u16(&mut out, 0); // fields

        let method_count = u16::try_from(self.methods.len())
            .map_err(|_| HarnessError::class_format("too many methods"))?;
        put_u16(&mut out, method_count);
        for method in &self.methods {
            put_u16(&mut out, method.access);
            put_u16(&mut out, method.name);
            put_u16(&mut out, method.descriptor);
            match &method.code {
                Some(code) => {
                    put_u16(&mut out, 1);
                    let code_len = u32::try_from(code.bytecode.len())
                        .ok()
                        .filter(|&len| len > 0 && len < 65536)
                        .ok_or_else(|| HarnessError::class_format("code length out of range"))?;
                    put_u16(&mut out, code.attribute_name);
                    put_u32(&mut out, 12 + code_len);
                    put_u16(&mut out, code.max_stack);
                    put_u16(&mut out, code.max_locals);
                    put_u32(&mut out, code_len);
                    out.extend_from_slice(&code.bytecode);
                    put_u16(&mut out, 0); // exception table
                    put_u16(&mut out, 0); // code attributes
                }
                None => put_u16(&mut out, 0),
            }
        }
        put_u16(&mut out, 0); // class attributes
        Ok(out)
    }
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

// =============================================================================
// Reader
// =============================================================================

/// A method declared by a class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodInfo {
    /// Access flags
    pub access_flags: u16,
    /// Method name
    pub name: String,
    /// Method descriptor
    pub descriptor: String,
}

/// The declarations of a class file, without attribute bodies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassHeader {
    /// Minor version
    pub minor_version: u16,
    /// Major version
    pub major_version: u16,
    /// Number of constant pool slots, including the reserved slot 0
    pub constant_pool_count: u16,
    /// Class access flags
    pub access_flags: u16,
    /// Internal name of this class
    pub this_class: String,
    /// Internal name of the superclass (absent only for `java/lang/Object`)
    pub super_class: Option<String>,
    /// Implemented interfaces
    pub interfaces: Vec<String>,
    /// Number of declared fields
    pub field_count: u16,
    /// Declared methods
    pub methods: Vec<MethodInfo>,
}

#[derive(Debug, Clone)]
enum PoolSlot {
    Utf8(String),
    Class(u16),
    Other,
    Unusable,
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> HarnessResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                HarnessError::class_format(format!("unexpected end of data at offset {}", self.pos))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> HarnessResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> HarnessResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> HarnessResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn skip_attributes(&mut self) -> HarnessResult<()> {
        let count = self.u16()?;
        for _ in 0..count {
            let _name = self.u16()?;
            let len = self.u32()? as usize;
            let _ = self.take(len)?;
        }
        Ok(())
    }
}

impl ClassHeader {
    /// Parse the declarations of a class file.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::ClassFormat`] if the bytes are not a
    /// well-formed class file.
    pub fn parse(bytes: &[u8]) -> HarnessResult<Self> {
        let mut r = ByteReader::new(bytes);
        let magic = r.u32()?;
        if magic != MAGIC {
            return Err(HarnessError::class_format(format!(
                "bad magic 0x{magic:08X}"
            )));
        }
        let minor_version = r.u16()?;
        let major_version = r.u16()?;
        let constant_pool_count = r.u16()?;
        let pool = read_pool(&mut r, constant_pool_count)?;

        let access_flags = r.u16()?;
        let this_class = class_name(&pool, r.u16()?)?;
        let super_index = r.u16()?;
        let super_class = if super_index == 0 {
            None
        } else {
            Some(class_name(&pool, super_index)?)
        };

        let interface_count = r.u16()?;
        let interfaces = (0..interface_count)
            .map(|_| class_name(&pool, r.u16()?))
            .collect::<HarnessResult<Vec<_>>>()?;

        let field_count = r.u16()?;
        for _ in 0..field_count {
            let _ = r.take(6)?;
            r.skip_attributes()?;
        }

        let method_count = r.u16()?;
        let mut methods = Vec::with_capacity(usize::from(method_count));
        for _ in 0..method_count {
            let access_flags = r.u16()?;
            let name = utf8(&pool, r.u16()?)?;
            let descriptor = utf8(&pool, r.u16()?)?;
            r.skip_attributes()?;
            methods.push(MethodInfo {
                access_flags,
                name,
                descriptor,
            });
        }
        r.skip_attributes()?;

        if r.pos != bytes.len() {
            return Err(HarnessError::class_format(format!(
                "{} trailing bytes after class attributes",
                bytes.len() - r.pos
            )));
        }

        Ok(Self {
            minor_version,
            major_version,
            constant_pool_count,
            access_flags,
            this_class,
            super_class,
            interfaces,
            field_count,
            methods,
        })
    }

    /// Find a declared method by name and descriptor
    #[must_use]
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }
}

fn read_pool(r: &mut ByteReader<'_>, count: u16) -> HarnessResult<Vec<PoolSlot>> {
    if count == 0 {
        return Err(HarnessError::class_format("constant pool count is zero"));
    }
    let mut pool = vec![PoolSlot::Unusable];
    while pool.len() < usize::from(count) {
        let tag = r.u8()?;
        match tag {
            TAG_UTF8 => {
                let len = usize::from(r.u16()?);
                pool.push(PoolSlot::Utf8(decode_modified_utf8(r.take(len)?)?));
            }
            TAG_CLASS => pool.push(PoolSlot::Class(r.u16()?)),
            TAG_STRING | TAG_METHOD_TYPE | TAG_MODULE | TAG_PACKAGE => {
                let _ = r.take(2)?;
                pool.push(PoolSlot::Other);
            }
            TAG_METHOD_HANDLE => {
                let _ = r.take(3)?;
                pool.push(PoolSlot::Other);
            }
            TAG_INTEGER | TAG_FLOAT | TAG_FIELDREF | TAG_METHODREF | TAG_INTERFACE_METHODREF
            | TAG_NAME_AND_TYPE | TAG_DYNAMIC | TAG_INVOKE_DYNAMIC => {
                let _ = r.take(4)?;
                pool.push(PoolSlot::Other);
            }
            TAG_LONG | TAG_DOUBLE => {
                // Eight-byte constants occupy two slots.
                let _ = r.take(8)?;
                pool.push(PoolSlot::Other);
                pool.push(PoolSlot::Unusable);
            }
            other => {
                return Err(HarnessError::class_format(format!(
                    "unknown constant pool tag {other} at slot {}",
                    pool.len()
                )))
            }
        }
    }
    if pool.len() != usize::from(count) {
        return Err(HarnessError::class_format(
            "eight-byte constant overruns the constant pool",
        ));
    }
    Ok(pool)
}

fn utf8(pool: &[PoolSlot], index: u16) -> HarnessResult<String> {
    match pool.get(usize::from(index)) {
        Some(PoolSlot::Utf8(value)) => Ok(value.clone()),
        _ => Err(HarnessError::class_format(format!(
            "constant #{index} is not a UTF-8 entry"
        ))),
    }
}

fn class_name(pool: &[PoolSlot], index: u16) -> HarnessResult<String> {
    match pool.get(usize::from(index)) {
        Some(PoolSlot::Class(name)) => utf8(pool, *name),
        _ => Err(HarnessError::class_format(format!(
            "constant #{index} is not a class entry"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(name: &str) -> Vec<u8> {
        let mut writer = ClassWriter::new(
            JAVA_8,
            access::ACC_PUBLIC | access::ACC_SUPER,
            name,
            "java/lang/Object",
        )
        .unwrap();
        writer.add_default_constructor("java/lang/Object").unwrap();
        writer.to_bytes().unwrap()
    }

    // =========================================================================
    // Writer
    // =========================================================================

    #[test]
    fn test_writer_emits_magic_and_version() {
        let bytes = minimal("pkg/Probe");
        assert_eq!(&bytes[0..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
        assert_eq!(&bytes[4..6], &[0, 0]);
        assert_eq!(&bytes[6..8], &[0, 52]);
    }

    #[test]
    fn test_constructor_bytecode() {
        let bytes = minimal("pkg/Probe");
        // Pool order: 1 Utf8 pkg/Probe, 2 Class, 3 Utf8 Object, 4 Class,
        // 5 Utf8 <init>, 6 Utf8 ()V, 7 NameAndType, 8 Methodref
        let code = [opcode::ALOAD_0, opcode::INVOKESPECIAL, 0x00, 0x08, opcode::RETURN];
        assert!(bytes.windows(code.len()).any(|w| w == code));
    }

    #[test]
    fn test_pool_deduplicates() {
        let mut pool = ConstantPool::new();
        let a = pool.class("java/lang/Object").unwrap();
        let b = pool.class("java/lang/Object").unwrap();
        assert_eq!(a, b);
        assert_eq!(pool.len(), 2);
        let m1 = pool.method_ref("java/lang/Object", "<init>", "()V").unwrap();
        let m2 = pool.method_ref("java/lang/Object", "<init>", "()V").unwrap();
        assert_eq!(m1, m2);
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(ClassWriter::new(JAVA_8, 0, "", "java/lang/Object").is_err());
    }

    #[test]
    fn test_empty_code_rejected() {
        let mut writer = ClassWriter::new(JAVA_8, 0, "a/B", "java/lang/Object").unwrap();
        writer
            .add_method(access::ACC_PUBLIC, "m", "()V", 0, 1, Vec::new())
            .unwrap();
        assert!(writer.to_bytes().is_err());
    }

    // =========================================================================
    // Reader
    // =========================================================================

    #[test]
    fn test_header_of_minimal_class() {
        let header = ClassHeader::parse(&minimal("pkg/Probe")).unwrap();
        assert_eq!(header.major_version, JAVA_8);
        assert_eq!(header.this_class, "pkg/Probe");
        assert_eq!(header.super_class.as_deref(), Some("java/lang/Object"));
        assert_eq!(header.access_flags, access::ACC_PUBLIC | access::ACC_SUPER);
        assert!(header.interfaces.is_empty());
        assert_eq!(header.field_count, 0);
        assert_eq!(header.methods.len(), 1);
        let init = header.method("<init>", "()V").unwrap();
        assert_eq!(init.access_flags, access::ACC_PUBLIC);
    }

    #[test]
    fn test_abstract_method_has_no_code() {
        let mut writer = ClassWriter::new(
            JAVA_8,
            access::ACC_PUBLIC | access::ACC_INTERFACE | access::ACC_ABSTRACT,
            "pkg/Api",
            "java/lang/Object",
        )
        .unwrap();
        writer
            .add_abstract_method(access::ACC_PUBLIC | access::ACC_ABSTRACT, "run", "()V")
            .unwrap();
        let header = ClassHeader::parse(&writer.to_bytes().unwrap()).unwrap();
        assert!(header.method("run", "()V").is_some());
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = minimal("pkg/Probe");
        bytes[0] = 0;
        let err = ClassHeader::parse(&bytes).unwrap_err();
        assert!(err.to_string().contains("bad magic"));
    }

    #[test]
    fn test_truncated_input() {
        let bytes = minimal("pkg/Probe");
        for cut in [3, 9, 20, bytes.len() - 1] {
            assert!(ClassHeader::parse(&bytes[..cut]).is_err(), "cut at {cut}");
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = minimal("pkg/Probe");
        bytes.push(0);
        assert!(ClassHeader::parse(&bytes).is_err());
    }

    // =========================================================================
    // Modified UTF-8
    // =========================================================================

    #[test]
    fn test_modified_utf8_nul_is_two_bytes() {
        assert_eq!(encode_modified_utf8("\0"), vec![0xC0, 0x80]);
        assert_eq!(decode_modified_utf8(&[0xC0, 0x80]).unwrap(), "\0");
    }

    #[test]
    fn test_modified_utf8_supplementary_uses_surrogates() {
        let encoded = encode_modified_utf8("\u{1F600}");
        assert_eq!(encoded.len(), 6);
        assert_eq!(decode_modified_utf8(&encoded).unwrap(), "\u{1F600}");
    }

    #[test]
    fn test_modified_utf8_rejects_four_byte_form() {
        assert!(decode_modified_utf8(&[0xF0, 0x9F, 0x98, 0x80]).is_err());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_generated_class_names_survive(name in "[a-z]{1,6}(/[a-z]{1,6}){0,3}/[A-Z][A-Za-z0-9$]{0,10}") {
                let header = ClassHeader::parse(&minimal(&name)).unwrap();
                prop_assert_eq!(header.this_class, name);
            }

            #[test]
            fn prop_modified_utf8_reversible(value in "\\PC{0,32}") {
                let encoded = encode_modified_utf8(&value);
                prop_assert!(!encoded.contains(&0));
                prop_assert_eq!(decode_modified_utf8(&encoded).unwrap(), value);
            }
        }
    }
}
