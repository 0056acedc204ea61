//! Traversal helpers for passes over the statement tree.
use ripple_ir::{Circuit, Expr, Stmt};
use ripple_utils::RippleResult;

/// Trait that describes named things. Every pass implements this so the
/// pass manager can identify it.
pub trait Named {
    /// The name of a pass. Is used for identifying passes.
    fn name() -> &'static str;
    /// A short description of the pass.
    fn description() -> &'static str;
}

/// A transformation over a whole circuit.
pub trait Pass: Named {
    fn run(&mut self, circuit: &mut Circuit) -> RippleResult<()>;

    /// Construct the pass with [Default] and run it.
    fn do_pass_default(circuit: &mut Circuit) -> RippleResult<()>
    where
        Self: Default + Sized,
    {
        Self::default().run(circuit)
    }
}

/// Rewrite an expression bottom-up: children first, then `f` on the rebuilt
/// node.
pub fn map_expr<F>(e: Expr, f: &mut F) -> Expr
where
    F: FnMut(Expr) -> Expr,
{
    let e = match e {
        Expr::SubField { expr, name, tpe } => Expr::SubField {
            expr: Box::new(map_expr(*expr, f)),
            name,
            tpe,
        },
        Expr::SubIndex { expr, value, tpe } => Expr::SubIndex {
            expr: Box::new(map_expr(*expr, f)),
            value,
            tpe,
        },
        Expr::SubAccess { expr, index, tpe } => Expr::SubAccess {
            expr: Box::new(map_expr(*expr, f)),
            index: Box::new(map_expr(*index, f)),
            tpe,
        },
        Expr::Mux {
            cond,
            tval,
            fval,
            tpe,
        } => Expr::Mux {
            cond: Box::new(map_expr(*cond, f)),
            tval: Box::new(map_expr(*tval, f)),
            fval: Box::new(map_expr(*fval, f)),
            tpe,
        },
        Expr::ValidIf { cond, value, tpe } => Expr::ValidIf {
            cond: Box::new(map_expr(*cond, f)),
            value: Box::new(map_expr(*value, f)),
            tpe,
        },
        Expr::DoPrim {
            op,
            args,
            consts,
            tpe,
        } => Expr::DoPrim {
            op,
            args: args.into_iter().map(|a| map_expr(a, f)).collect(),
            consts,
            tpe,
        },
        e @ (Expr::Ref { .. }
        | Expr::UIntLit { .. }
        | Expr::SIntLit { .. }) => e,
    };
    f(e)
}

/// Rewrite every expression carried by one statement. Does not recurse
/// into child statements of a block.
pub fn map_stmt_exprs<F>(s: Stmt, f: &mut F) -> Stmt
where
    F: FnMut(Expr) -> Expr,
{
    let mut m = |e| map_expr(e, f);
    match s {
        Stmt::Connect { loc, expr } => Stmt::Connect {
            loc: m(loc),
            expr: m(expr),
        },
        Stmt::IsInvalid { expr } => Stmt::IsInvalid { expr: m(expr) },
        Stmt::Node { name, value } => Stmt::Node {
            name,
            value: m(value),
        },
        Stmt::Register(mut reg) => {
            reg.clock = m(reg.clock);
            reg.reset = m(reg.reset);
            reg.init = m(reg.init);
            Stmt::Register(reg)
        }
        Stmt::InstanceConnected(mut inst) => {
            inst.port_cons = inst.port_cons.into_iter().map(m).collect();
            Stmt::InstanceConnected(inst)
        }
        Stmt::Attach(exprs) => {
            Stmt::Attach(exprs.into_iter().map(m).collect())
        }
        Stmt::Stop { clk, en, code } => Stmt::Stop {
            clk: m(clk),
            en: m(en),
            code,
        },
        Stmt::Print {
            clk,
            en,
            string,
            args,
        } => Stmt::Print {
            clk: m(clk),
            en: m(en),
            string,
            args: args.into_iter().map(m).collect(),
        },
        s @ (Stmt::Block(_)
        | Stmt::Wire { .. }
        | Stmt::Memory(_)
        | Stmt::Instance(_)
        | Stmt::InstanceConnector { .. }
        | Stmt::Skip) => s,
    }
}

/// Rewrite a statement tree bottom-up.
pub fn map_stmts<F>(s: Stmt, f: &mut F) -> Stmt
where
    F: FnMut(Stmt) -> Stmt,
{
    let s = match s {
        Stmt::Block(stmts) => Stmt::Block(
            stmts.into_iter().map(|s| map_stmts(s, f)).collect(),
        ),
        s => s,
    };
    f(s)
}
