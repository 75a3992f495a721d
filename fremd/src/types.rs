//! Declared types for native calls: what a value looks like on the wire
//! and how many call-frame slots it occupies.
//!
//! Slot math lives here and nowhere else. Everything that needs to know how
//! wide an argument is goes through [`ValueType::slot_count`].

/// Width of one call-frame slot, one register worth of bytes.
///
/// Packing is parameterized over this so the 32-bit layout can be exercised
/// on a 64-bit host instead of only on real 32-bit hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotWidth {
    Four,
    Eight,
}

impl SlotWidth {
    /// The width of the host we are actually running on.
    pub const NATIVE: SlotWidth = if size_of::<usize>() == 8 {
        SlotWidth::Eight
    } else {
        SlotWidth::Four
    };

    #[inline]
    pub const fn bytes(self) -> usize {
        match self {
            SlotWidth::Four => 4,
            SlotWidth::Eight => 8,
        }
    }

    /// Mask selecting the bits a single slot of this width can hold.
    #[inline]
    pub const fn mask(self) -> u64 {
        match self {
            SlotWidth::Four => 0xFFFF_FFFF,
            SlotWidth::Eight => u64::MAX,
        }
    }
}

/// Every kind of value that can cross the call boundary.
///
/// `Str`/`WStr`/`Buffer` travel as the address of their storage; they are
/// separate kinds so marshaling knows to take that address and callers can
/// declare what a returned address means.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Void,
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Pointer,
    Str,
    WStr,
    Buffer,
}

impl ValueType {
    /// Parse an external type name. Unknown names are `None`, the caller
    /// decides whether that is fatal.
    pub fn from_name(name: &str) -> Option<ValueType> {
        let kind = match name {
            "void" => ValueType::Void,
            "bool" => ValueType::Bool,
            "int8" => ValueType::I8,
            "uint8" => ValueType::U8,
            "int16" => ValueType::I16,
            "uint16" => ValueType::U16,
            "int32" => ValueType::I32,
            "uint32" => ValueType::U32,
            "int64" => ValueType::I64,
            "uint64" => ValueType::U64,
            "float" => ValueType::F32,
            "double" => ValueType::F64,
            "pointer" => ValueType::Pointer,
            "string" => ValueType::Str,
            "wstring" => ValueType::WStr,
            "buffer" => ValueType::Buffer,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Void => "void",
            ValueType::Bool => "bool",
            ValueType::I8 => "int8",
            ValueType::U8 => "uint8",
            ValueType::I16 => "int16",
            ValueType::U16 => "uint16",
            ValueType::I32 => "int32",
            ValueType::U32 => "uint32",
            ValueType::I64 => "int64",
            ValueType::U64 => "uint64",
            ValueType::F32 => "float",
            ValueType::F64 => "double",
            ValueType::Pointer => "pointer",
            ValueType::Str => "string",
            ValueType::WStr => "wstring",
            ValueType::Buffer => "buffer",
        }
    }

    /// Wire size in bytes before slot promotion. Pointer-like kinds report
    /// the minimum register width so they always land in a single slot.
    pub const fn byte_size(self) -> usize {
        match self {
            ValueType::Void => 0,
            ValueType::Bool | ValueType::I8 | ValueType::U8 => 1,
            ValueType::I16 | ValueType::U16 => 2,
            ValueType::I32
            | ValueType::U32
            | ValueType::F32
            | ValueType::Pointer
            | ValueType::Str
            | ValueType::WStr
            | ValueType::Buffer => 4,
            ValueType::I64 | ValueType::U64 | ValueType::F64 => 8,
        }
    }

    /// How many call-frame slots a value of this kind occupies at the given
    /// slot width. Zero for `Void`, otherwise at least one.
    pub const fn slot_count(self, width: SlotWidth) -> usize {
        let size = self.byte_size();
        if size == 0 {
            return 0;
        }
        (size + width.bytes() - 1) / width.bytes()
    }
}

/// How the callee expects its stack handled.
///
/// `FastCall` is accepted as a name but dispatched exactly like `CDecl`;
/// there is no separate register-seeding path for it.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallConvention {
    #[default]
    CDecl,
    StdCall,
    FastCall,
}

impl CallConvention {
    pub fn from_name(name: &str) -> Option<CallConvention> {
        match name {
            "cdecl" => Some(CallConvention::CDecl),
            "stdcall" => Some(CallConvention::StdCall),
            "fastcall" => Some(CallConvention::FastCall),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CallConvention::CDecl => "cdecl",
            CallConvention::StdCall => "stdcall",
            CallConvention::FastCall => "fastcall",
        }
    }
}
