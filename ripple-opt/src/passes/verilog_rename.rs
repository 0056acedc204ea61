use crate::traversal::{map_stmt_exprs, map_stmts, Named, Pass};
use ripple_ir::{
    module_names, Circuit, Expr, GetName, Id, Kind, Module, Stmt,
};
use ripple_utils::{NameGenerator, RippleResult};
use std::collections::HashMap;

/// Verilog-2001 reserved words. Any identifier in this table must be
/// renamed before emission.
pub const RESERVED_NAMES: &[&str] = &[
    "always", "and", "assign", "automatic", "begin", "buf", "bufif0",
    "bufif1", "case", "casex", "casez", "cell", "cmos", "config", "deassign",
    "default", "defparam", "design", "disable", "edge", "else", "end",
    "endcase", "endconfig", "endfunction", "endgenerate", "endmodule",
    "endprimitive", "endspecify", "endtable", "endtask", "event", "for",
    "force", "forever", "fork", "function", "generate", "genvar", "highz0",
    "highz1", "if", "ifnone", "incdir", "include", "initial", "inout",
    "input", "instance", "integer", "join", "large", "liblist", "library",
    "localparam", "macromodule", "medium", "module", "nand", "negedge",
    "nmos", "nor", "noshowcancelled", "not", "notif0", "notif1", "or",
    "output", "parameter", "pmos", "posedge", "primitive", "pull0", "pull1",
    "pulldown", "pullup", "pulsestyle_ondetect", "pulsestyle_onevent",
    "rcmos", "real", "realtime", "reg", "release", "repeat", "rnmos",
    "rpmos", "rtran", "rtranif0", "rtranif1", "scalared", "showcancelled",
    "signed", "small", "specify", "specparam", "strong0", "strong1",
    "supply0", "supply1", "table", "task", "time", "tran", "tranif0",
    "tranif1", "tri", "tri0", "tri1", "triand", "trior", "trireg",
    "unsigned", "use", "vectored", "wait", "wand", "weak0", "weak1",
    "while", "wire", "wor", "xnor", "xor",
];

fn is_reserved(name: Id) -> bool {
    RESERVED_NAMES.binary_search(&name.as_str()).is_ok()
}

/// Renames every identifier that collides with a Verilog reserved word by
/// suffixing `_` (uniquified against the module's namespace), rewriting all
/// uses consistently, including instance-port subfields in parent modules.
#[derive(Default)]
pub struct VerilogRename;

impl Named for VerilogRename {
    fn name() -> &'static str {
        "verilog-rename"
    }

    fn description() -> &'static str {
        "rename identifiers that collide with Verilog reserved words"
    }
}

impl Pass for VerilogRename {
    fn run(&mut self, circuit: &mut Circuit) -> RippleResult<()> {
        // Module names first; they become Verilog module names directly.
        let mut module_ng = NameGenerator::with_prev_defined_names(
            circuit.modules.iter().map(|m| m.name().to_string()).collect(),
        );
        let module_map: HashMap<Id, Id> = circuit
            .modules
            .iter()
            .filter(|m| is_reserved(m.name()))
            .map(|m| (m.name(), fresh(&mut module_ng, m.name())))
            .collect();

        // Per-module rename tables for every declared name. Port tables are
        // computed for all modules up front because instance-port subfields
        // in a parent module use the instantiated module's port names.
        let mut local_maps: HashMap<Id, HashMap<Id, Id>> = HashMap::new();
        let mut port_maps: HashMap<Id, HashMap<Id, Id>> = HashMap::new();
        for module in &circuit.modules {
            let mut ng =
                NameGenerator::with_prev_defined_names(module_names(module));
            let mut local = HashMap::new();
            for port in module.ports() {
                if is_reserved(port.name) {
                    local.insert(port.name, fresh(&mut ng, port.name));
                }
            }
            port_maps.insert(module.name(), local.clone());
            if let Module::Internal { body, .. } = module {
                declared_renames(body, &mut ng, &mut local);
            }
            local_maps.insert(module.name(), local);
        }

        for module in &mut circuit.modules {
            let local = &local_maps[&module.name()];
            match module {
                Module::Internal { name, ports, body } => {
                    if let Some(new) = module_map.get(name) {
                        *name = *new;
                    }
                    for port in ports.iter_mut() {
                        if let Some(new) = local.get(&port.name) {
                            port.name = *new;
                        }
                    }
                    let old = std::mem::replace(body, Stmt::Skip);
                    *body = rename_stmts(
                        old, local, &port_maps, &module_map,
                    );
                }
                Module::External { name, ports, .. } => {
                    // defname is the external Verilog name and is the
                    // integrator's responsibility; only the LIR-facing
                    // names are rewritten.
                    if let Some(new) = module_map.get(name) {
                        *name = *new;
                    }
                    for port in ports.iter_mut() {
                        if let Some(new) = local.get(&port.name) {
                            port.name = *new;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn fresh(ng: &mut NameGenerator, name: Id) -> Id {
    let mut cand = format!("{}_", name);
    while ng.contains(&cand) {
        cand.push('_');
    }
    ng.add_names([cand.clone()].into());
    Id::from(cand)
}

/// Collect renames for every name declared in a statement tree.
fn declared_renames(
    stmt: &Stmt,
    ng: &mut NameGenerator,
    local: &mut HashMap<Id, Id>,
) {
    match stmt {
        Stmt::Block(stmts) => {
            for s in stmts {
                declared_renames(s, ng, local);
            }
        }
        Stmt::Node { name, .. } | Stmt::Wire { name, .. } => {
            add_rename(*name, ng, local)
        }
        Stmt::Register(reg) => add_rename(reg.name, ng, local),
        Stmt::Memory(mem) => {
            add_rename(mem.name, ng, local);
            for p in mem
                .readers
                .iter()
                .chain(&mem.writers)
                .chain(&mem.readwriters)
            {
                add_rename(*p, ng, local);
            }
        }
        Stmt::Instance(inst) => add_rename(inst.name, ng, local),
        Stmt::InstanceConnected(inst) => add_rename(inst.name, ng, local),
        Stmt::InstanceConnector { name, .. } => add_rename(*name, ng, local),
        _ => {}
    }
}

fn add_rename(
    name: Id,
    ng: &mut NameGenerator,
    local: &mut HashMap<Id, Id>,
) {
    if is_reserved(name) {
        local.insert(name, fresh(ng, name));
    }
}

fn rename_stmts(
    body: Stmt,
    local: &HashMap<Id, Id>,
    port_maps: &HashMap<Id, HashMap<Id, Id>>,
    module_map: &HashMap<Id, Id>,
) -> Stmt {
    // Instance names resolve through the instantiated module's port table.
    // References are rewritten after declarations, so key the binding by
    // the instance's renamed name; the value stays the original module
    // name, which is what `port_maps` is keyed by.
    let mut inst_modules: HashMap<Id, Id> = HashMap::new();
    collect_instances(&body, local, &mut inst_modules);

    map_stmts(body, &mut |s| {
        let s = match s {
            Stmt::Node { name, value } => Stmt::Node {
                name: renamed(local, name),
                value,
            },
            Stmt::Wire { name, tpe } => Stmt::Wire {
                name: renamed(local, name),
                tpe,
            },
            Stmt::Register(mut reg) => {
                reg.name = renamed(local, reg.name);
                Stmt::Register(reg)
            }
            Stmt::Memory(mut mem) => {
                mem.name = renamed(local, mem.name);
                for p in mem
                    .readers
                    .iter_mut()
                    .chain(mem.writers.iter_mut())
                    .chain(mem.readwriters.iter_mut())
                {
                    *p = renamed(local, *p);
                }
                Stmt::Memory(mem)
            }
            Stmt::Instance(mut inst) => {
                inst.name = renamed(local, inst.name);
                inst.module = renamed(module_map, inst.module);
                Stmt::Instance(inst)
            }
            Stmt::InstanceConnected(mut inst) => {
                inst.name = renamed(local, inst.name);
                inst.module = renamed(module_map, inst.module);
                Stmt::InstanceConnected(inst)
            }
            Stmt::InstanceConnector { name, module } => {
                Stmt::InstanceConnector {
                    name: renamed(local, name),
                    module: renamed(module_map, module),
                }
            }
            s => s,
        };
        map_stmt_exprs(s, &mut |e| {
            rename_expr(e, local, port_maps, &inst_modules)
        })
    })
}

fn collect_instances(
    stmt: &Stmt,
    local: &HashMap<Id, Id>,
    out: &mut HashMap<Id, Id>,
) {
    match stmt {
        Stmt::Block(stmts) => {
            for s in stmts {
                collect_instances(s, local, out);
            }
        }
        Stmt::Instance(inst) => {
            out.insert(renamed(local, inst.name), inst.module);
        }
        Stmt::InstanceConnected(inst) => {
            out.insert(renamed(local, inst.name), inst.module);
        }
        Stmt::InstanceConnector { name, module } => {
            out.insert(renamed(local, *name), *module);
        }
        _ => {}
    }
}

fn renamed(map: &HashMap<Id, Id>, name: Id) -> Id {
    map.get(&name).copied().unwrap_or(name)
}

fn rename_expr(
    e: Expr,
    local: &HashMap<Id, Id>,
    port_maps: &HashMap<Id, HashMap<Id, Id>>,
    inst_modules: &HashMap<Id, Id>,
) -> Expr {
    match e {
        Expr::Ref { name, tpe, kind } => Expr::Ref {
            name: renamed(local, name),
            tpe,
            kind,
        },
        Expr::SubField { expr, name, tpe } => {
            let name = match expr.as_ref() {
                // `inst.port`: the field is a port of the instantiated
                // module. The inner reference was already renamed, so look
                // the instance up by its renamed name.
                Expr::Ref {
                    kind: Kind::Instance,
                    name: inst,
                    ..
                } => inst_modules
                    .get(inst)
                    .and_then(|m| port_maps.get(m))
                    .map(|pm| renamed(pm, name))
                    .unwrap_or(name),
                // `mem.port`: memory port names are module-local.
                Expr::Ref {
                    kind: Kind::Memory, ..
                } => renamed(local, name),
                // Deeper fields (`mem.port.addr`) are fixed field names.
                _ => name,
            };
            Expr::SubField { expr, name, tpe }
        }
        e => e,
    }
}
