use crate::{Param, Stmt, Type};
use ripple_utils::{GetName, Id};
use std::collections::HashSet;

/// Direction of a module port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// A module port. Carries a ground type in the low form.
#[derive(Clone, Debug, PartialEq)]
pub struct Port {
    pub name: Id,
    pub direction: Direction,
    pub tpe: Type,
}

impl GetName for Port {
    fn name(&self) -> Id {
        self.name
    }
}

/// A module: either internal (with a body) or external (declaration only;
/// its definition lives outside the circuit).
#[derive(Clone, Debug, PartialEq)]
pub enum Module {
    Internal {
        name: Id,
        ports: Vec<Port>,
        body: Stmt,
    },
    External {
        name: Id,
        ports: Vec<Port>,
        defname: Id,
        params: Vec<Param>,
    },
}

impl Module {
    pub fn ports(&self) -> &[Port] {
        match self {
            Module::Internal { ports, .. } | Module::External { ports, .. } => {
                ports
            }
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Module::Internal { .. })
    }
}

impl GetName for Module {
    fn name(&self) -> Id {
        match self {
            Module::Internal { name, .. } | Module::External { name, .. } => {
                *name
            }
        }
    }
}

/// A circuit: an ordered sequence of modules with a designated top module.
#[derive(Clone, Debug, PartialEq)]
pub struct Circuit {
    pub main: Id,
    pub modules: Vec<Module>,
}

impl Circuit {
    /// Look up a module by name.
    pub fn module(&self, name: Id) -> Option<&Module> {
        self.modules.iter().find(|m| m.name() == name)
    }

    /// The top module.
    pub fn top(&self) -> Option<&Module> {
        self.module(self.main)
    }
}

/// Every name declared in a module: ports, wires, nodes, registers,
/// memories (and their port names), and instances. Used to seed fresh-name
/// generation so generated names stay disjoint.
pub fn module_names(module: &Module) -> HashSet<String> {
    let mut names = HashSet::new();
    for port in module.ports() {
        names.insert(port.name.to_string());
    }
    if let Module::Internal { body, .. } = module {
        stmt_names(body, &mut names);
    }
    names
}

fn stmt_names(stmt: &Stmt, names: &mut HashSet<String>) {
    match stmt {
        Stmt::Block(stmts) => {
            for s in stmts {
                stmt_names(s, names);
            }
        }
        Stmt::Node { name, .. } | Stmt::Wire { name, .. } => {
            names.insert(name.to_string());
        }
        Stmt::Register(reg) => {
            names.insert(reg.name.to_string());
        }
        Stmt::Memory(mem) => {
            names.insert(mem.name.to_string());
            for p in mem
                .readers
                .iter()
                .chain(&mem.writers)
                .chain(&mem.readwriters)
            {
                names.insert(p.to_string());
            }
        }
        Stmt::Instance(inst) => {
            names.insert(inst.name.to_string());
        }
        Stmt::InstanceConnected(inst) => {
            names.insert(inst.name.to_string());
        }
        Stmt::InstanceConnector { name, .. } => {
            names.insert(name.to_string());
        }
        Stmt::Connect { .. }
        | Stmt::IsInvalid { .. }
        | Stmt::Attach(_)
        | Stmt::Stop { .. }
        | Stmt::Print { .. }
        | Stmt::Skip => {}
    }
}
