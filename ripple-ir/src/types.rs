//! Types in the low-form IR. Module ports and expressions carry ground
//! types; the vector form exists only to describe memory `reg` arrays.

/// A type in the low-form IR.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    /// Unsigned integer of the given bit width.
    UInt(u64),
    /// Signed (two's complement) integer of the given bit width.
    SInt(u64),
    /// A clock.
    Clock,
    /// A bidirectional analog net of the given bit width.
    Analog(u64),
    /// A vector of elements. Only appears as the type of a memory array.
    Vector(Box<Type>, u64),
}

impl Type {
    /// Bit width of a ground type. `None` for vectors.
    pub fn width(&self) -> Option<u64> {
        match self {
            Type::UInt(w) | Type::SInt(w) | Type::Analog(w) => Some(*w),
            Type::Clock => Some(1),
            Type::Vector(..) => None,
        }
    }

    pub fn is_ground(&self) -> bool {
        !matches!(self, Type::Vector(..))
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Type::SInt(_))
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::UInt(w) => write!(f, "UInt<{}>", w),
            Type::SInt(w) => write!(f, "SInt<{}>", w),
            Type::Clock => write!(f, "Clock"),
            Type::Analog(w) => write!(f, "Analog<{}>", w),
            Type::Vector(elem, size) => write!(f, "{}[{}]", elem, size),
        }
    }
}
