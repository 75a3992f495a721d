//! Runtime argument and result values.
//!
//! A `Value` carries its own kind tag and, for string and buffer kinds, owns
//! the bytes behind the address that gets marshaled. Ownership matters: the
//! marshaler takes addresses straight out of the variant, so the `Value`
//! must stay alive until the native call has returned. Borrowing the
//! argument slice for the whole call makes that automatic.

use std::ffi::CString;
use std::fmt;

use crate::types::ValueType;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Void,
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    /// A raw address, including null.
    Pointer(usize),
    /// NUL-terminated byte string, terminator stored by `CString`.
    Str(CString),
    /// NUL-terminated UTF-16 string, terminator included in the vector.
    WStr(Vec<u16>),
    /// Arbitrary bytes passed by address.
    Buffer(Vec<u8>),
}

impl Value {
    /// Build a C string argument. Text after an interior NUL is dropped,
    /// which is what the callee would see anyway.
    pub fn cstring(text: &str) -> Value {
        let bytes: Vec<u8> = text.bytes().take_while(|&b| b != 0).collect();
        // SAFETY: interior NULs were stripped above
        let owned = unsafe { CString::from_vec_unchecked(bytes) };
        Value::Str(owned)
    }

    /// Build a wide string argument, UTF-16 with a trailing terminator.
    pub fn wstring(text: &str) -> Value {
        let mut units: Vec<u16> =
            text.encode_utf16().take_while(|&u| u != 0).collect();
        units.push(0);
        Value::WStr(units)
    }

    pub fn buffer(bytes: Vec<u8>) -> Value {
        Value::Buffer(bytes)
    }

    pub fn kind(&self) -> ValueType {
        match self {
            Value::Void => ValueType::Void,
            Value::Bool(_) => ValueType::Bool,
            Value::I8(_) => ValueType::I8,
            Value::U8(_) => ValueType::U8,
            Value::I16(_) => ValueType::I16,
            Value::U16(_) => ValueType::U16,
            Value::I32(_) => ValueType::I32,
            Value::U32(_) => ValueType::U32,
            Value::I64(_) => ValueType::I64,
            Value::U64(_) => ValueType::U64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
            Value::Pointer(_) => ValueType::Pointer,
            Value::Str(_) => ValueType::Str,
            Value::WStr(_) => ValueType::WStr,
            Value::Buffer(_) => ValueType::Buffer,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "void"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Pointer(addr) => write!(f, "{addr:#x}"),
            Value::Str(text) => {
                write!(f, "{}", text.to_string_lossy())
            }
            Value::WStr(units) => {
                let content = match units.split_last() {
                    Some((&0, body)) => body,
                    _ => units.as_slice(),
                };
                write!(f, "{}", String::from_utf16_lossy(content))
            }
            Value::Buffer(bytes) => write!(f, "buffer[{}]", bytes.len()),
        }
    }
}
