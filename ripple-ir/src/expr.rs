use crate::Type;
use num_bigint::{BigInt, BigUint, Sign};
use ripple_utils::{Error, Id, RippleResult};

/// The kind of declaration a reference resolves to. Controls whether the
/// back end chases a reference through the netlist: only [Kind::Wire] and
/// [Kind::Node] references are ever rewritten.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Port,
    Wire,
    Node,
    Register,
    Instance,
    Memory,
}

/// Primitive operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimOp {
    Add,
    Addw,
    Sub,
    Subw,
    Mul,
    Div,
    Rem,
    Lt,
    Leq,
    Gt,
    Geq,
    Eq,
    Neq,
    Pad,
    AsUInt,
    AsSInt,
    AsClock,
    Shl,
    Shlw,
    Shr,
    Dshl,
    Dshlw,
    Dshr,
    Cvt,
    Neg,
    Not,
    And,
    Or,
    Xor,
    Andr,
    Orr,
    Xorr,
    Cat,
    Bits,
    Head,
    Tail,
}

impl std::fmt::Display for PrimOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PrimOp::Add => "add",
            PrimOp::Addw => "addw",
            PrimOp::Sub => "sub",
            PrimOp::Subw => "subw",
            PrimOp::Mul => "mul",
            PrimOp::Div => "div",
            PrimOp::Rem => "rem",
            PrimOp::Lt => "lt",
            PrimOp::Leq => "leq",
            PrimOp::Gt => "gt",
            PrimOp::Geq => "geq",
            PrimOp::Eq => "eq",
            PrimOp::Neq => "neq",
            PrimOp::Pad => "pad",
            PrimOp::AsUInt => "asUInt",
            PrimOp::AsSInt => "asSInt",
            PrimOp::AsClock => "asClock",
            PrimOp::Shl => "shl",
            PrimOp::Shlw => "shlw",
            PrimOp::Shr => "shr",
            PrimOp::Dshl => "dshl",
            PrimOp::Dshlw => "dshlw",
            PrimOp::Dshr => "dshr",
            PrimOp::Cvt => "cvt",
            PrimOp::Neg => "neg",
            PrimOp::Not => "not",
            PrimOp::And => "and",
            PrimOp::Or => "or",
            PrimOp::Xor => "xor",
            PrimOp::Andr => "andr",
            PrimOp::Orr => "orr",
            PrimOp::Xorr => "xorr",
            PrimOp::Cat => "cat",
            PrimOp::Bits => "bits",
            PrimOp::Head => "head",
            PrimOp::Tail => "tail",
        };
        write!(f, "{}", s)
    }
}

/// An expression in the low-form IR.
///
/// Expressions are plain trees with value semantics; the netlist and other
/// back-end tables key on structural equality, which is why `PartialEq`,
/// `Eq` and `Hash` are derived.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expr {
    Ref {
        name: Id,
        tpe: Type,
        kind: Kind,
    },
    SubField {
        expr: Box<Expr>,
        name: Id,
        tpe: Type,
    },
    SubIndex {
        expr: Box<Expr>,
        value: u64,
        tpe: Type,
    },
    SubAccess {
        expr: Box<Expr>,
        index: Box<Expr>,
        tpe: Type,
    },
    Mux {
        cond: Box<Expr>,
        tval: Box<Expr>,
        fval: Box<Expr>,
        tpe: Type,
    },
    ValidIf {
        cond: Box<Expr>,
        value: Box<Expr>,
        tpe: Type,
    },
    UIntLit {
        value: BigUint,
        width: u64,
    },
    SIntLit {
        value: BigInt,
        width: u64,
    },
    DoPrim {
        op: PrimOp,
        args: Vec<Expr>,
        consts: Vec<u64>,
        tpe: Type,
    },
}

impl Expr {
    /// Reference to a declared name.
    pub fn reference<I: Into<Id>>(name: I, tpe: Type, kind: Kind) -> Self {
        Expr::Ref {
            name: name.into(),
            tpe,
            kind,
        }
    }

    /// Unsigned literal with an explicit width.
    pub fn uint(value: u64, width: u64) -> Self {
        Expr::UIntLit {
            value: BigUint::from(value),
            width,
        }
    }

    /// Signed literal with an explicit width.
    pub fn sint(value: i64, width: u64) -> Self {
        Expr::SIntLit {
            value: BigInt::from(value),
            width,
        }
    }

    /// Reference to an instance. Instance references carry no meaningful
    /// type of their own; their subfields do.
    pub fn inst_ref<I: Into<Id>>(name: I) -> Self {
        Expr::reference(name, Type::UInt(0), Kind::Instance)
    }

    /// A subfield of an instance, `inst.port`.
    pub fn inst_port<I: Into<Id>, P: Into<Id>>(
        inst: I,
        port: P,
        tpe: Type,
    ) -> Self {
        Expr::SubField {
            expr: Box::new(Expr::inst_ref(inst)),
            name: port.into(),
            tpe,
        }
    }

    /// A field of a memory port, `mem.port.field`.
    pub fn mem_port_field<M, P, F>(mem: M, port: P, field: F, tpe: Type) -> Self
    where
        M: Into<Id>,
        P: Into<Id>,
        F: Into<Id>,
    {
        Expr::SubField {
            expr: Box::new(Expr::SubField {
                expr: Box::new(Expr::reference(
                    mem,
                    Type::UInt(0),
                    Kind::Memory,
                )),
                name: port.into(),
                tpe: Type::UInt(0),
            }),
            name: field.into(),
            tpe,
        }
    }

    /// The type of this expression.
    pub fn tpe(&self) -> Type {
        match self {
            Expr::Ref { tpe, .. }
            | Expr::SubField { tpe, .. }
            | Expr::SubIndex { tpe, .. }
            | Expr::SubAccess { tpe, .. }
            | Expr::Mux { tpe, .. }
            | Expr::ValidIf { tpe, .. }
            | Expr::DoPrim { tpe, .. } => tpe.clone(),
            Expr::UIntLit { width, .. } => Type::UInt(*width),
            Expr::SIntLit { width, .. } => Type::SInt(*width),
        }
    }

    /// The declaration kind of the root reference of a name path, if this
    /// expression is one.
    pub fn kind(&self) -> Option<Kind> {
        match self {
            Expr::Ref { kind, .. } => Some(*kind),
            Expr::SubField { expr, .. }
            | Expr::SubIndex { expr, .. }
            | Expr::SubAccess { expr, .. } => expr.kind(),
            _ => None,
        }
    }

    /// The flattened name of a reference path: the dotted path joined by
    /// `_`. This is the name the path carries in the emitted Verilog.
    pub fn lowered_name(&self) -> Option<String> {
        match self {
            Expr::Ref { name, .. } => Some(name.to_string()),
            Expr::SubField { expr, name, .. } => {
                Some(format!("{}_{}", expr.lowered_name()?, name))
            }
            Expr::SubIndex { expr, value, .. } => {
                Some(format!("{}_{}", expr.lowered_name()?, value))
            }
            _ => None,
        }
    }

    /// Strip the root reference off a subfield path: `inst.port` becomes
    /// `port`, `a.b.c` becomes `b.c`. Reaching anything but a subfield is a
    /// pipeline bug.
    pub fn remove_root(&self) -> RippleResult<Expr> {
        match self {
            Expr::SubField { expr, name, tpe } => match expr.as_ref() {
                Expr::Ref { .. } => Ok(Expr::Ref {
                    name: *name,
                    tpe: tpe.clone(),
                    kind: Kind::Port,
                }),
                _ => Ok(Expr::SubField {
                    expr: Box::new(expr.remove_root()?),
                    name: *name,
                    tpe: tpe.clone(),
                }),
            },
            e => Err(Error::internal(format!(
                "cannot remove root of non-subfield expression `{}`",
                e
            ))),
        }
    }

    /// True iff this expression may appear as a primitive-op argument in
    /// the low form: a literal, a reference, or a subfield.
    pub fn is_simple(&self) -> bool {
        matches!(
            self,
            Expr::Ref { .. }
                | Expr::SubField { .. }
                | Expr::UIntLit { .. }
                | Expr::SIntLit { .. }
        )
    }
}

impl std::fmt::Display for Expr {
    /// The LIR text form of the expression.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Ref { name, .. } => write!(f, "{}", name),
            Expr::SubField { expr, name, .. } => {
                write!(f, "{}.{}", expr, name)
            }
            Expr::SubIndex { expr, value, .. } => {
                write!(f, "{}[{}]", expr, value)
            }
            Expr::SubAccess { expr, index, .. } => {
                write!(f, "{}[{}]", expr, index)
            }
            Expr::Mux {
                cond, tval, fval, ..
            } => write!(f, "mux({}, {}, {})", cond, tval, fval),
            Expr::ValidIf { cond, value, .. } => {
                write!(f, "validif({}, {})", cond, value)
            }
            Expr::UIntLit { value, width } => {
                write!(f, "UInt<{}>(\"h{:x}\")", width, value)
            }
            Expr::SIntLit { value, width } => {
                if value.sign() == Sign::Minus {
                    write!(f, "SInt<{}>(\"h-{:x}\")", width, value.magnitude())
                } else {
                    write!(f, "SInt<{}>(\"h{:x}\")", width, value.magnitude())
                }
            }
            Expr::DoPrim {
                op, args, consts, ..
            } => {
                write!(f, "{}(", op)?;
                let mut first = true;
                for a in args {
                    if !first {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                    first = false;
                }
                for c in consts {
                    if !first {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", c)?;
                    first = false;
                }
                write!(f, ")")
            }
        }
    }
}
