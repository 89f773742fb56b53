//! IR types and values.

use arnm_ir::Name;
use std::fmt;

/// IR-level type tags.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum IrType {
    #[default]
    Void,
    Bool,
    I8,
    I32,
    I64,
    F64,
    Ptr,
    /// Process handle; pointer-sized, distinct for readability.
    Process,
    /// Produced only on compiler bugs.
    Bad,
}

impl IrType {
    /// Is this a pointer-shaped type at the machine level?
    pub fn is_pointer(self) -> bool {
        matches!(self, IrType::Ptr | IrType::Process)
    }
}

/// A single-assignment operand.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum IrValue {
    /// Virtual register, dense per function.
    Var { id: u32, ty: IrType },
    /// Literal, stored as raw bits.
    Const { bits: u64, ty: IrType },
    /// Symbol reference (`@name`).
    Global { name: Name, ty: IrType },
    #[default]
    Undef,
}

impl IrValue {
    pub const fn const_i32(value: i32) -> IrValue {
        IrValue::Const {
            bits: value as i64 as u64,
            ty: IrType::I32,
        }
    }

    pub const fn const_i64(value: i64) -> IrValue {
        IrValue::Const {
            bits: value as u64,
            ty: IrType::I64,
        }
    }

    pub const fn const_bool(value: bool) -> IrValue {
        IrValue::Const {
            bits: value as u64,
            ty: IrType::Bool,
        }
    }

    /// Null pointer constant.
    pub const fn null_ptr() -> IrValue {
        IrValue::Const {
            bits: 0,
            ty: IrType::Ptr,
        }
    }

    pub const fn global(name: Name, ty: IrType) -> IrValue {
        IrValue::Global { name, ty }
    }

    /// Type of this value (`Void` for undef).
    pub fn ty(&self) -> IrType {
        match self {
            IrValue::Var { ty, .. }
            | IrValue::Const { ty, .. }
            | IrValue::Global { ty, .. } => *ty,
            IrValue::Undef => IrType::Void,
        }
    }

    pub fn is_undef(&self) -> bool {
        matches!(self, IrValue::Undef)
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IrType::Void => "void",
            IrType::Bool => "i1",
            IrType::I8 => "i8",
            IrType::I32 => "i32",
            IrType::I64 => "i64",
            IrType::F64 => "f64",
            IrType::Ptr => "ptr",
            IrType::Process => "process",
            IrType::Bad => "bad",
        };
        f.write_str(s)
    }
}

#[cfg(target_pointer_width = "64")]
mod size_asserts {
    use super::{IrType, IrValue};
    arnm_ir::static_assert_size!(IrType, 1);
    arnm_ir::static_assert_size!(IrValue, 16);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn const_bits() {
        assert_eq!(
            IrValue::const_i32(-1),
            IrValue::Const {
                bits: u64::MAX,
                ty: IrType::I32
            }
        );
        assert_eq!(
            IrValue::const_bool(true),
            IrValue::Const {
                bits: 1,
                ty: IrType::Bool
            }
        );
        assert_eq!(IrValue::null_ptr().ty(), IrType::Ptr);
    }

    #[test]
    fn value_types() {
        assert_eq!(IrValue::Undef.ty(), IrType::Void);
        assert!(IrType::Process.is_pointer());
        assert!(!IrType::I32.is_pointer());
    }
}
