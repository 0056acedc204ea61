//! # The Ripple Low-Form IR
//!
//! The low-form register-transfer IR (LIR) describes a synchronous digital
//! circuit as an ordered sequence of modules. Every aggregate construct has
//! already been flattened away: module ports carry ground types only,
//! memories expose explicit reader/writer ports, and complex expressions
//! have been lifted into nodes.
//!
//! This library defines the data structures consumed by the pre-pass
//! pipeline and the back ends, together with [Printer], the canonical text
//! serializer for the IR.

mod expr;
mod module;
mod printer;
mod stmt;
mod types;

pub use expr::{Expr, Kind, PrimOp};
pub use module::{
    module_names, Circuit, Direction, Module, Port,
};
pub use printer::Printer;
pub use ripple_utils::{GetName, Id};
pub use stmt::{
    DefInstance, DefInstanceConnected, DefMemory, DefRegister, Param, Stmt,
};
pub use types::Type;
