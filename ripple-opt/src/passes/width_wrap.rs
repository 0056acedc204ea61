use crate::traversal::{map_stmt_exprs, map_stmts, Named, Pass};
use ripple_ir::{Circuit, Expr, Module, PrimOp, Stmt};
use ripple_utils::RippleResult;

/// Rewrites `tail`-of-widening-op patterns into the width-preserving
/// operator forms (`addw`, `subw`, `shlw`, `dshlw`) so that every
/// operator's result width is directly expressible in Verilog.
#[derive(Default)]
pub struct WidthWrap;

impl Named for WidthWrap {
    fn name() -> &'static str {
        "width-wrap"
    }

    fn description() -> &'static str {
        "make result widths Verilog-expressible"
    }
}

impl Pass for WidthWrap {
    fn run(&mut self, circuit: &mut Circuit) -> RippleResult<()> {
        for module in &mut circuit.modules {
            if let Module::Internal { body, .. } = module {
                let old = std::mem::replace(body, Stmt::Skip);
                *body = map_stmts(old, &mut |s| {
                    map_stmt_exprs(s, &mut wrap)
                });
            }
        }
        Ok(())
    }
}

fn wrap(e: Expr) -> Expr {
    let Expr::DoPrim {
        op: PrimOp::Tail,
        args,
        consts,
        tpe,
    } = &e
    else {
        return e;
    };
    if args.len() != 1 || consts.len() != 1 {
        return e;
    }
    let Expr::DoPrim {
        op: inner,
        args: inner_args,
        consts: inner_consts,
        ..
    } = &args[0]
    else {
        return e;
    };

    let wide = match inner {
        PrimOp::Add if consts[0] == 1 => PrimOp::Addw,
        PrimOp::Sub if consts[0] == 1 => PrimOp::Subw,
        PrimOp::Shl
            if inner_consts.first().copied() == Some(consts[0]) =>
        {
            PrimOp::Shlw
        }
        PrimOp::Dshl
            if inner_args.len() == 2
                && Some(consts[0]) == dshl_growth(&inner_args[1]) =>
        {
            PrimOp::Dshlw
        }
        _ => return e,
    };
    Expr::DoPrim {
        op: wide,
        args: inner_args.clone(),
        consts: inner_consts.clone(),
        tpe: tpe.clone(),
    }
}

// A dynamic left shift by a `w`-bit amount grows its operand by 2^w - 1
// bits.
fn dshl_growth(shamt: &Expr) -> Option<u64> {
    let w = shamt.tpe().width()?;
    if w >= 64 {
        return None;
    }
    Some((1u64 << w) - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_ir::{Kind, Type};

    fn tail(of: Expr, n: u64, tpe: Type) -> Expr {
        Expr::DoPrim {
            op: PrimOp::Tail,
            args: vec![of],
            consts: vec![n],
            tpe,
        }
    }

    #[test]
    fn tail_of_add_becomes_addw() {
        let a = Expr::reference("a", Type::UInt(8), Kind::Port);
        let b = Expr::reference("b", Type::UInt(8), Kind::Port);
        let add = Expr::DoPrim {
            op: PrimOp::Add,
            args: vec![a.clone(), b.clone()],
            consts: vec![],
            tpe: Type::UInt(9),
        };
        let mut circuit = Circuit {
            main: "M".into(),
            modules: vec![Module::Internal {
                name: "M".into(),
                ports: vec![],
                body: Stmt::Node {
                    name: "z".into(),
                    value: tail(add, 1, Type::UInt(8)),
                },
            }],
        };
        WidthWrap::do_pass_default(&mut circuit).unwrap();
        let Module::Internal { body, .. } = &circuit.modules[0] else {
            unreachable!()
        };
        assert_eq!(
            *body,
            Stmt::Node {
                name: "z".into(),
                value: Expr::DoPrim {
                    op: PrimOp::Addw,
                    args: vec![a, b],
                    consts: vec![],
                    tpe: Type::UInt(8),
                },
            }
        );
    }

    #[test]
    fn unrelated_tail_is_untouched() {
        let a = Expr::reference("a", Type::UInt(8), Kind::Port);
        let body = Stmt::Node {
            name: "z".into(),
            value: tail(a, 2, Type::UInt(6)),
        };
        let mut circuit = Circuit {
            main: "M".into(),
            modules: vec![Module::Internal {
                name: "M".into(),
                ports: vec![],
                body: body.clone(),
            }],
        };
        WidthWrap::do_pass_default(&mut circuit).unwrap();
        let Module::Internal { body: after, .. } = &circuit.modules[0] else {
            unreachable!()
        };
        assert_eq!(*after, body);
    }
}
