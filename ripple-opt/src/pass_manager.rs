//! Define the PassManager structure that is used to construct and run the
//! normalization pipeline.
use crate::passes::{VerilogModulus, VerilogPrep, VerilogRename, WidthWrap};
use crate::traversal::{Named, Pass};
use ripple_ir::Circuit;
use ripple_utils::RippleResult;
use std::time::Instant;

/// Top-level type for all passes that transform a [Circuit].
pub type PassClosure = Box<dyn Fn(&mut Circuit) -> RippleResult<()>>;

/// Structure that tracks all registered passes for the compiler.
#[derive(Default)]
pub struct PassManager {
    /// All registered passes, in execution order.
    passes: Vec<(&'static str, PassClosure)>,
}

impl PassManager {
    /// Register a new pass. Registration order is execution order.
    pub fn register_pass<P>(&mut self)
    where
        P: Pass + Default,
    {
        self.passes
            .push((P::name(), Box::new(|c| P::do_pass_default(c))));
    }

    /// The pipeline the Verilog back end expects to have run.
    pub fn default_pipeline() -> Self {
        let mut pm = PassManager::default();
        pm.register_pass::<VerilogModulus>();
        pm.register_pass::<WidthWrap>();
        pm.register_pass::<VerilogRename>();
        pm.register_pass::<VerilogPrep>();
        pm
    }

    /// Names of the registered passes, in order.
    pub fn show_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|(name, _)| *name).collect()
    }

    /// Run every registered pass, in order.
    pub fn execute_plan(&self, circuit: &mut Circuit) -> RippleResult<()> {
        for (name, pass) in &self.passes {
            let start = Instant::now();
            pass(circuit)?;
            log::info!("Ran `{}` in {:?}", name, start.elapsed());
        }
        Ok(())
    }
}
