use crate::{Expr, Type};
use ripple_utils::{GetName, Id};

/// A register definition: holds its value across cycles of `clock`.
/// `reset`/`init` describe the synchronous reset value; an `init` equal to
/// a reference to the register itself means "no reset".
#[derive(Clone, Debug, PartialEq)]
pub struct DefRegister {
    pub name: Id,
    pub tpe: Type,
    pub clock: Expr,
    pub reset: Expr,
    pub init: Expr,
}

/// A memory definition. The back end requires `read_latency == 0`,
/// `write_latency == 1`, and no readwrite ports (they are split upstream).
#[derive(Clone, Debug, PartialEq)]
pub struct DefMemory {
    pub name: Id,
    pub data_type: Type,
    pub depth: u64,
    pub write_latency: u64,
    pub read_latency: u64,
    pub readers: Vec<Id>,
    pub writers: Vec<Id>,
    pub readwriters: Vec<Id>,
}

/// A structural module instantiation, as produced by the front end.
#[derive(Clone, Debug, PartialEq)]
pub struct DefInstance {
    pub name: Id,
    pub module: Id,
}

/// An instantiation whose per-port connections have been materialized by
/// the prep pass. `port_cons` holds one `inst.port` subfield per port of
/// the instantiated module, in port order.
#[derive(Clone, Debug, PartialEq)]
pub struct DefInstanceConnected {
    pub name: Id,
    pub module: Id,
    pub port_cons: Vec<Expr>,
}

/// Parameters of an external module.
#[derive(Clone, Debug, PartialEq)]
pub enum Param {
    Int(Id, i64),
    Str(Id, String),
    /// Verbatim Verilog text, e.g. a sized literal.
    Raw(Id, String),
}

impl GetName for Param {
    fn name(&self) -> Id {
        match self {
            Param::Int(n, _) | Param::Str(n, _) | Param::Raw(n, _) => *n,
        }
    }
}

/// A statement in a module body.
#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Block(Vec<Stmt>),
    Connect {
        loc: Expr,
        expr: Expr,
    },
    IsInvalid {
        expr: Expr,
    },
    Node {
        name: Id,
        value: Expr,
    },
    Wire {
        name: Id,
        tpe: Type,
    },
    Register(DefRegister),
    Memory(DefMemory),
    Instance(DefInstance),
    InstanceConnected(DefInstanceConnected),
    /// Transient instantiation form used while the prep pass rewrites a
    /// module. Reaching a back end is a pipeline bug.
    InstanceConnector {
        name: Id,
        module: Id,
    },
    /// Declares a group of analog nets as electrically connected.
    Attach(Vec<Expr>),
    Stop {
        clk: Expr,
        en: Expr,
        code: i64,
    },
    Print {
        clk: Expr,
        en: Expr,
        string: String,
        args: Vec<Expr>,
    },
    Skip,
}
