/// The language and granularity of an emitted artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
    LirCircuit,
    LirModule,
    VerilogCircuit,
    VerilogModule,
}

/// A named piece of emitted text. Back ends return artifacts as plain
/// values; writing them anywhere is the caller's business.
#[derive(Clone, Debug)]
pub struct Artifact {
    pub name: String,
    pub kind: ArtifactKind,
    pub text: String,
}

/// Which artifacts the caller wants from a back end.
#[derive(Clone, Copy, Debug)]
pub struct EmitRequest {
    /// Emit the whole circuit as one artifact.
    pub circuit: bool,
    /// Emit one self-contained artifact per internal module.
    pub all_modules: bool,
}

impl Default for EmitRequest {
    fn default() -> Self {
        EmitRequest {
            circuit: true,
            all_modules: false,
        }
    }
}
