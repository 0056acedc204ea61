use crate::traversal::{map_stmt_exprs, Named, Pass};
use ripple_ir::{
    module_names, Circuit, Expr, Kind, Module, PrimOp, Stmt, Type,
};
use ripple_utils::{NameGenerator, RippleResult};

/// Verilog's `%` produces a value as wide as its widest operand, while the
/// IR types `rem` at the width of its narrowest. This pass hoists every
/// `rem` whose operands are wider than its result into a node computed at
/// the operand width and replaces the use with a `bits` slice of that node.
#[derive(Default)]
pub struct VerilogModulus;

impl Named for VerilogModulus {
    fn name() -> &'static str {
        "verilog-modulus"
    }

    fn description() -> &'static str {
        "legalize rem operands for Verilog's % semantics"
    }
}

impl Pass for VerilogModulus {
    fn run(&mut self, circuit: &mut Circuit) -> RippleResult<()> {
        for module in &mut circuit.modules {
            let names = module_names(module);
            if let Module::Internal { body, .. } = module {
                let mut ng = NameGenerator::with_prev_defined_names(names);
                let old = std::mem::replace(body, Stmt::Skip);
                *body = rewrite_stmt(old, &mut ng);
            }
        }
        Ok(())
    }
}

fn rewrite_stmt(s: Stmt, ng: &mut NameGenerator) -> Stmt {
    match s {
        Stmt::Block(stmts) => {
            let mut out = Vec::with_capacity(stmts.len());
            for s in stmts {
                match s {
                    b @ Stmt::Block(_) => out.push(rewrite_stmt(b, ng)),
                    s => {
                        let mut hoisted = Vec::new();
                        let s = map_stmt_exprs(s, &mut |e| {
                            swap_rem(e, ng, &mut hoisted)
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
                map_stmt_exprs(s, &mut |e| swap_rem(e, ng, &mut hoisted));
            if hoisted.is_empty() {
                s
            } else {
                hoisted.push(s);
                Stmt::Block(hoisted)
            }
        }
    }
}

fn swap_rem(
    e: Expr,
    ng: &mut NameGenerator,
    hoisted: &mut Vec<Stmt>,
) -> Expr {
    let Expr::DoPrim {
        op: PrimOp::Rem,
        args,
        consts,
        tpe,
    } = &e
    else {
        return e;
    };
    let Some(result_width) = tpe.width() else {
        return e;
    };
    let Some(operand_width) =
        args.iter().filter_map(|a| a.tpe().width()).max()
    else {
        return e;
    };
    if operand_width <= result_width {
        return e;
    }

    let wide_tpe = if tpe.is_signed() {
        Type::SInt(operand_width)
    } else {
        Type::UInt(operand_width)
    };
    let name = ng.gen_name("_T");
    hoisted.push(Stmt::Node {
        name,
        value: Expr::DoPrim {
            op: PrimOp::Rem,
            args: args.clone(),
            consts: consts.clone(),
            tpe: wide_tpe.clone(),
        },
    });
    let slice = Expr::DoPrim {
        op: PrimOp::Bits,
        args: vec![Expr::reference(name, wide_tpe, Kind::Node)],
        consts: vec![result_width - 1, 0],
        tpe: Type::UInt(result_width),
    };
    if tpe.is_signed() {
        Expr::DoPrim {
            op: PrimOp::AsSInt,
            args: vec![slice],
            consts: vec![],
            tpe: tpe.clone(),
        }
    } else {
        slice
    }
}
