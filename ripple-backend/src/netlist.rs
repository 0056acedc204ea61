//! Per-module driver index built by a single pre-scan of the body.
use linked_hash_map::LinkedHashMap;
use ripple_ir::{Expr, Kind, Stmt};
use ripple_utils::{Error, NameGenerator, RippleResult};

/// Maps every connect target, node, and invalidated expression to its
/// driving expression. Keys are canonicalized to the flattened name of the
/// target path, so structurally equal paths hit the same entry regardless
/// of incidental type annotations on intermediate references. Insertion
/// order is preserved; everything derived from the netlist stays
/// deterministic.
pub struct Netlist {
    map: LinkedHashMap<String, Expr>,
}

impl Netlist {
    /// Index a module body. Invalidated targets get a fresh scratch
    /// reference (`_GEN_<n>`) as their driver.
    pub fn build(
        body: &Stmt,
        ng: &mut NameGenerator,
    ) -> RippleResult<Netlist> {
        let mut netlist = Netlist {
            map: LinkedHashMap::new(),
        };
        netlist.visit(body, ng)?;
        Ok(netlist)
    }

    fn visit(
        &mut self,
        stmt: &Stmt,
        ng: &mut NameGenerator,
    ) -> RippleResult<()> {
        match stmt {
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.visit(s, ng)?;
                }
            }
            Stmt::Connect { loc, expr } => {
                self.insert(loc, expr.clone())?;
            }
            Stmt::Node { name, value } => {
                self.map.insert(name.to_string(), value.clone());
            }
            Stmt::IsInvalid { expr } => {
                let temp = Expr::reference(
                    ng.gen_name("_GEN"),
                    expr.tpe(),
                    Kind::Wire,
                );
                self.insert(expr, temp)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn insert(&mut self, loc: &Expr, driver: Expr) -> RippleResult<()> {
        let key = loc.lowered_name().ok_or_else(|| {
            Error::malformed_ir(format!(
                "connect target `{}` is not a name path",
                loc
            ))
        })?;
        self.map.insert(key, driver);
        Ok(())
    }

    /// The driver recorded for `e`, if any.
    pub fn get(&self, e: &Expr) -> Option<&Expr> {
        self.map.get(&e.lowered_name()?)
    }
}
