//! LIR passthrough back end: re-serializes circuits as LIR text.
//!
//! In all-modules mode every internal module becomes a self-contained
//! circuit: the modules it directly instantiates are downgraded to
//! external stubs so the artifact parses on its own.

use crate::{Artifact, ArtifactKind, Backend, EmitRequest};
use ripple_ir::{Circuit, GetName, Id, Module, Printer, Stmt};
use ripple_utils::{Error, RippleResult};

/// Implements the LIR passthrough back end.
#[derive(Default)]
pub struct LirBackend;

impl Backend for LirBackend {
    fn name(&self) -> &'static str {
        "lir"
    }

    fn validate(_circuit: &Circuit) -> RippleResult<()> {
        // Any circuit that exists can be serialized back out.
        Ok(())
    }

    fn emit(
        circuit: &Circuit,
        req: &EmitRequest,
    ) -> RippleResult<Vec<Artifact>> {
        let mut artifacts = Vec::new();
        if req.circuit {
            artifacts.push(Artifact {
                name: circuit.main.to_string(),
                kind: ArtifactKind::LirCircuit,
                text: Printer::circuit_to_str(circuit),
            });
        }
        if req.all_modules {
            for module in &circuit.modules {
                let Module::Internal { name, body, .. } = module else {
                    continue;
                };
                let mut modules = Vec::new();
                for dep in collect_instances(body)? {
                    let m = circuit.module(dep).ok_or_else(|| {
                        Error::malformed_ir(format!(
                            "module `{}` instantiates undefined module `{}`",
                            name, dep
                        ))
                    })?;
                    modules.push(stub(m));
                }
                modules.push(module.clone());
                let sub = Circuit {
                    main: *name,
                    modules,
                };
                artifacts.push(Artifact {
                    name: name.to_string(),
                    kind: ArtifactKind::LirModule,
                    text: Printer::circuit_to_str(&sub),
                });
            }
        }
        Ok(artifacts)
    }
}

/// The modules a body directly instantiates, in first-use order,
/// deduplicated.
fn collect_instances(stmt: &Stmt) -> RippleResult<Vec<Id>> {
    let mut out = Vec::new();
    visit(stmt, &mut out)?;
    Ok(out)
}

fn visit(stmt: &Stmt, out: &mut Vec<Id>) -> RippleResult<()> {
    match stmt {
        Stmt::Block(stmts) => {
            for s in stmts {
                visit(s, out)?;
            }
        }
        Stmt::Instance(inst) => {
            if !out.contains(&inst.module) {
                out.push(inst.module);
            }
        }
        Stmt::InstanceConnected(inst) => {
            if !out.contains(&inst.module) {
                out.push(inst.module);
            }
        }
        Stmt::InstanceConnector { name, module } => {
            return Err(Error::internal(format!(
                "connector form of instance `{}` of `{}` survived to emission",
                name, module
            )));
        }
        _ => {}
    }
    Ok(())
}

/// Downgrade a module to a declaration-only external stub.
fn stub(module: &Module) -> Module {
    Module::External {
        name: module.name(),
        ports: module.ports().to_vec(),
        defname: module.name(),
        params: vec![],
    }
}
