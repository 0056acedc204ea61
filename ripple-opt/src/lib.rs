//! Normalization passes for the Ripple compiler.
//!
//! The Verilog back end consumes IR in a shape slightly stronger than the
//! low form: primitive-op arguments are literals, references or subfields;
//! `rem` operands fit Verilog's `%` semantics; width-changing operators are
//! explicit; no identifier collides with a Verilog reserved word; and every
//! instantiation carries its port connections. The passes in this crate
//! establish those guarantees.
pub mod pass_manager;
pub mod passes;
pub mod traversal;
