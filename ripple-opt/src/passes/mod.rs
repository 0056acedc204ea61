mod verilog_modulus;
mod verilog_prep;
mod verilog_rename;
mod width_wrap;

pub use verilog_modulus::VerilogModulus;
pub use verilog_prep::VerilogPrep;
pub use verilog_rename::{VerilogRename, RESERVED_NAMES};
pub use width_wrap::WidthWrap;
