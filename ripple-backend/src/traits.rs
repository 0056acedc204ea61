//! Interface for a Ripple back end.
use crate::{Artifact, EmitRequest};
use ripple_ir::Circuit;
use ripple_utils::{OutputFile, RippleResult};
use std::io::Write as _;

/// A back end for the compiler.
pub trait Backend {
    /// The name of this back end.
    fn name(&self) -> &'static str;
    /// Validate the circuit for emission using this back end. Returns an
    /// `Err(..)` if the circuit has unexpected constructs.
    fn validate(circuit: &Circuit) -> RippleResult<()>;
    /// Transform the circuit into named artifacts.
    fn emit(
        circuit: &Circuit,
        req: &EmitRequest,
    ) -> RippleResult<Vec<Artifact>>;
    /// Convenience function to validate the circuit and write every
    /// emitted artifact to `file`.
    fn run(
        &self,
        circuit: &Circuit,
        req: &EmitRequest,
        file: &mut OutputFile,
    ) -> RippleResult<()> {
        Self::validate(circuit)?;
        let artifacts = Self::emit(circuit, req)?;
        let out = &mut file.get_write();
        for artifact in artifacts {
            out.write_all(artifact.text.as_bytes())?;
        }
        Ok(())
    }
}
