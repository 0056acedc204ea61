//! Back ends for the Ripple compiler.
mod artifact;
mod lir;
mod netlist;
mod traits;
mod verilog;

pub use artifact::{Artifact, ArtifactKind, EmitRequest};
pub use lir::LirBackend;
pub use netlist::Netlist;
pub use traits::Backend;
pub use verilog::VerilogBackend;
