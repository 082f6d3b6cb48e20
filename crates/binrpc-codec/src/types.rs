use std::fmt;

use crate::error::{CodecError, Result};

/// Wire type tags (the low nibble of a record header).
///
/// The set is closed. Arrays, AVPs and raw bytes exist in wider revisions of
/// the protocol but are rejected here rather than skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeTag {
    Integer = 0,
    String = 1,
    Double = 2,
    Struct = 3,
}

impl TypeTag {
    /// Mask selecting the tag bits of a record header.
    pub const MASK: u8 = 0x0F;

    /// The tag's wire value.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Lowercase name used in error messages and CLI output.
    pub const fn name(self) -> &'static str {
        match self {
            TypeTag::Integer => "integer",
            TypeTag::String => "string",
            TypeTag::Double => "double",
            TypeTag::Struct => "struct",
        }
    }
}

impl TryFrom<u8> for TypeTag {
    type Error = CodecError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(TypeTag::Integer),
            1 => Ok(TypeTag::String),
            2 => Ok(TypeTag::Double),
            3 => Ok(TypeTag::Struct),
            _ => Err(CodecError::UnsupportedType {
                tag,
                reason: "unknown wire type tag",
            }),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
