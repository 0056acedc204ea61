use crate::traversal::{map_stmt_exprs, Named, Pass};
use ripple_ir::{
    module_names, Circuit, DefInstanceConnected, Expr, GetName, Id, Kind,
    Module, Port, Stmt,
};
use ripple_utils::{Error, NameGenerator, RippleResult};
use std::collections::HashMap;

/// The final normalization before emission:
///
/// 1. every primitive-op argument that is not a literal, reference or
///    subfield is lifted into a fresh node (`_T_<n>`), and
/// 2. every structural instantiation is rewritten into its connected form,
///    carrying one `inst.port` subfield per port of the instantiated
///    module.
#[derive(Default)]
pub struct VerilogPrep;

impl Named for VerilogPrep {
    fn name() -> &'static str {
        "verilog-prep"
    }

    fn description() -> &'static str {
        "split complex primop arguments and bind instance ports"
    }
}

impl Pass for VerilogPrep {
    fn run(&mut self, circuit: &mut Circuit) -> RippleResult<()> {
        let signatures: HashMap<Id, Vec<Port>> = circuit
            .modules
            .iter()
            .map(|m| (m.name(), m.ports().to_vec()))
            .collect();

        for module in &mut circuit.modules {
            let names = module_names(module);
            let mod_name = module.name();
            if let Module::Internal { body, .. } = module {
                let mut ng = NameGenerator::with_prev_defined_names(names);
                let old = std::mem::replace(body, Stmt::Skip);
                let bound = bind_instances(old, mod_name, &signatures)?;
                *body = split_exprs(bound, &mut ng);
            }
        }
        Ok(())
    }
}

fn bind_instances(
    s: Stmt,
    mod_name: Id,
    signatures: &HashMap<Id, Vec<Port>>,
) -> RippleResult<Stmt> {
    match s {
        Stmt::Block(stmts) => Ok(Stmt::Block(
            stmts
                .into_iter()
                .map(|s| bind_instances(s, mod_name, signatures))
                .collect::<RippleResult<Vec<_>>>()?,
        )),
        Stmt::Instance(inst) => {
            let ports = signatures.get(&inst.module).ok_or_else(|| {
                Error::malformed_ir(format!(
                    "instance `{}` in module `{}` refers to undefined module `{}`",
                    inst.name, mod_name, inst.module
                ))
            })?;
            let port_cons = ports
                .iter()
                .map(|p| {
                    Expr::inst_port(inst.name, p.name, p.tpe.clone())
                })
                .collect();
            Ok(Stmt::InstanceConnected(DefInstanceConnected {
                name: inst.name,
                module: inst.module,
                port_cons,
            }))
        }
        Stmt::InstanceConnector { name, module } => {
            Err(Error::internal(format!(
                "connector form of instance `{}` of `{}` reached prep",
                name, module
            )))
        }
        s => Ok(s),
    }
}

fn split_exprs(s: Stmt, ng: &mut NameGenerator) -> Stmt {
    match s {
        Stmt::Block(stmts) => {
            let mut out = Vec::with_capacity(stmts.len());
            for s in stmts {
                match s {
                    b @ Stmt::Block(_) => out.push(split_exprs(b, ng)),
                    s => {
                        let mut hoisted = Vec::new();
                        let s = map_stmt_exprs(s, &mut |e| {
                            split_args(e, ng, &mut hoisted)
                        });
                        out.extend(hoisted);
                        out.push(s);
                    }
                }
            }
            Stmt::Block(out)
        }
        s => {
            let mut hoisted = Vec::new();
            let s =
                map_stmt_exprs(s, &mut |e| split_args(e, ng, &mut hoisted));
            if hoisted.is_empty() {
                s
            } else {
                hoisted.push(s);
                Stmt::Block(hoisted)
            }
        }
    }
}

fn split_args(
    e: Expr,
    ng: &mut NameGenerator,
    hoisted: &mut Vec<Stmt>,
) -> Expr {
    match e {
        Expr::DoPrim {
            op,
            args,
            consts,
            tpe,
        } => {
            // Expressions are mapped bottom-up, so the arguments have
            // already been split internally; anything still complex
            // becomes a node here.
            let args = args
                .into_iter()
                .map(|a| {
                    if a.is_simple() {
                        a
                    } else {
                        let tpe = a.tpe();
                        let name = ng.gen_name("_T");
                        hoisted.push(Stmt::Node { name, value: a });
                        Expr::reference(name, tpe, Kind::Node)
                    }
                })
                .collect();
            Expr::DoPrim {
                op,
                args,
                consts,
                tpe,
            }
        }
        e => e,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_ir::{Direction, PrimOp, Type};

    #[test]
    fn nested_primop_arguments_become_nodes() {
        let a = Expr::reference("a", Type::UInt(4), Kind::Port);
        let b = Expr::reference("b", Type::UInt(4), Kind::Port);
        let inner = Expr::DoPrim {
            op: PrimOp::Add,
            args: vec![a.clone(), b.clone()],
            consts: vec![],
            tpe: Type::UInt(5),
        };
        let outer = Expr::DoPrim {
            op: PrimOp::Not,
            args: vec![inner.clone()],
            consts: vec![],
            tpe: Type::UInt(5),
        };
        let mut circuit = Circuit {
            main: "M".into(),
            modules: vec![Module::Internal {
                name: "M".into(),
                ports: vec![],
                body: Stmt::Block(vec![Stmt::Node {
                    name: "z".into(),
                    value: outer,
                }]),
            }],
        };
        VerilogPrep::do_pass_default(&mut circuit).unwrap();
        let Module::Internal { body, .. } = &circuit.modules[0] else {
            unreachable!()
        };
        let Stmt::Block(stmts) = body else { unreachable!() };
        assert_eq!(
            stmts[0],
            Stmt::Node {
                name: "_T_0".into(),
                value: inner,
            }
        );
        assert_eq!(
            stmts[1],
            Stmt::Node {
                name: "z".into(),
                value: Expr::DoPrim {
                    op: PrimOp::Not,
                    args: vec![Expr::reference(
                        "_T_0",
                        Type::UInt(5),
                        Kind::Node
                    )],
                    consts: vec![],
                    tpe: Type::UInt(5),
                },
            }
        );
    }

    #[test]
    fn structural_instances_are_bound() {
        let mut circuit = Circuit {
            main: "Top".into(),
            modules: vec![
                Module::Internal {
                    name: "Top".into(),
                    ports: vec![],
                    body: Stmt::Block(vec![Stmt::Instance(
                        ripple_ir::DefInstance {
                            name: "c".into(),
                            module: "Child".into(),
                        },
                    )]),
                },
                Module::Internal {
                    name: "Child".into(),
                    ports: vec![
                        Port {
                            name: "clk".into(),
                            direction: Direction::Input,
                            tpe: Type::Clock,
                        },
                        Port {
                            name: "out".into(),
                            direction: Direction::Output,
                            tpe: Type::UInt(8),
                        },
                    ],
                    body: Stmt::Block(vec![]),
                },
            ],
        };
        VerilogPrep::do_pass_default(&mut circuit).unwrap();
        let Module::Internal { body, .. } = &circuit.modules[0] else {
            unreachable!()
        };
        let Stmt::Block(stmts) = body else { unreachable!() };
        let Stmt::InstanceConnected(inst) = &stmts[0] else {
            panic!("expected connected instance")
        };
        assert_eq!(inst.module, "Child");
        assert_eq!(
            inst.port_cons,
            vec![
                Expr::inst_port("c", "clk", Type::Clock),
                Expr::inst_port("c", "out", Type::UInt(8)),
            ]
        );
    }

    #[test]
    fn connector_form_is_a_pipeline_bug() {
        let mut circuit = Circuit {
            main: "M".into(),
            modules: vec![Module::Internal {
                name: "M".into(),
                ports: vec![],
                body: Stmt::InstanceConnector {
                    name: "c".into(),
                    module: "Child".into(),
                },
            }],
        };
        assert!(VerilogPrep::do_pass_default(&mut circuit).is_err());
    }
}
