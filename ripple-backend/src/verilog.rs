//! Verilog back end for the Ripple compiler.
//!
//! Transforms a [Circuit] into synthesizable Verilog-2001 text that is
//! behaviorally equivalent to the IR. Expects the `verilog-modulus`,
//! `width-wrap`, `verilog-rename` and `verilog-prep` passes to have run.

use crate::netlist::Netlist;
use crate::{Artifact, ArtifactKind, Backend, EmitRequest};
use itertools::Itertools;
use linked_hash_map::LinkedHashMap;
use num_bigint::{BigUint, Sign};
use ripple_ir::{
    module_names, Circuit, DefInstanceConnected, DefMemory, DefRegister,
    Direction, Expr, GetName, Id, Kind, Module, Param, Port, PrimOp, Stmt,
    Type,
};
use ripple_utils::{
    bits_needed_for, escape_string, Error, NameGenerator, RippleResult,
};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::Instant;

/// Fixed macro-guarded header emitted at the top of every Verilog file.
const PREAMBLE: &str = "\
`ifdef RANDOMIZE_GARBAGE_ASSIGN
`define RANDOMIZE
`endif
`ifdef RANDOMIZE_INVALID_ASSIGN
`define RANDOMIZE
`endif
`ifdef RANDOMIZE_REG_INIT
`define RANDOMIZE
`endif
`ifdef RANDOMIZE_MEM_INIT
`define RANDOMIZE
`endif
";

/// A register update stops flattening a mux into `if`/`else` once the mux
/// has been expanded this many times. Keeps shared mux DAGs from blowing
/// up; past the bound the mux renders as a ternary expression.
const MUX_FLATTEN_BOUND: u32 = 4;

/// Memories above this bit count get a `/* sparse */` marker on their
/// declaration.
const SPARSE_MEM_BITS: u64 = 1 << 29;

/// Implements the Verilog back end.
#[derive(Default)]
pub struct VerilogBackend;

impl Backend for VerilogBackend {
    fn name(&self) -> &'static str {
        "verilog"
    }

    fn validate(circuit: &Circuit) -> RippleResult<()> {
        for module in &circuit.modules {
            for port in module.ports() {
                if !port.tpe.is_ground() {
                    return Err(Error::malformed_ir(format!(
                        "port `{}` of module `{}` does not have a ground type",
                        port.name,
                        module.name()
                    )));
                }
            }
            if let Module::Internal { body, .. } = module {
                validate_stmt(body, module.name())?;
            }
        }
        Ok(())
    }

    fn emit(
        circuit: &Circuit,
        req: &EmitRequest,
    ) -> RippleResult<Vec<Artifact>> {
        let mut artifacts = Vec::new();
        if req.circuit {
            let mut text = String::from(PREAMBLE);
            for module in &circuit.modules {
                if module.is_internal() {
                    text.push_str(&emit_timed(circuit, module)?);
                }
            }
            artifacts.push(Artifact {
                name: circuit.main.to_string(),
                kind: ArtifactKind::VerilogCircuit,
                text,
            });
        }
        if req.all_modules {
            for module in &circuit.modules {
                if module.is_internal() {
                    let mut text = String::from(PREAMBLE);
                    text.push_str(&emit_timed(circuit, module)?);
                    artifacts.push(Artifact {
                        name: module.name().to_string(),
                        kind: ArtifactKind::VerilogModule,
                        text,
                    });
                }
            }
        }
        Ok(artifacts)
    }
}

fn validate_stmt(stmt: &Stmt, module: Id) -> RippleResult<()> {
    match stmt {
        Stmt::Block(stmts) => {
            for s in stmts {
                validate_stmt(s, module)?;
            }
        }
        Stmt::Memory(mem) => check_memory(mem, module)?,
        _ => {}
    }
    Ok(())
}

fn check_memory(mem: &DefMemory, module: Id) -> RippleResult<()> {
    if mem.read_latency != 0 || mem.write_latency != 1 {
        return Err(Error::unsupported_ir(format!(
            "memory `{}` in module `{}` has latencies ({}, {}); only (0, 1) can be lowered",
            mem.name, module, mem.read_latency, mem.write_latency
        )));
    }
    if !mem.readwriters.is_empty() {
        return Err(Error::unsupported_ir(format!(
            "memory `{}` in module `{}` has readwrite ports; they must be split upstream",
            mem.name, module
        )));
    }
    Ok(())
}

fn emit_timed(circuit: &Circuit, module: &Module) -> RippleResult<String> {
    let start = Instant::now();
    let out = ModuleEmitter::new(circuit, module)?.emit()?;
    log::info!("Generated `{}` in {:?}", module.name(), start.elapsed());
    Ok(out)
}

/// Per-module lowering state. Built fresh for each module and discarded
/// after its text is rendered; nothing is shared across modules.
struct ModuleEmitter<'a> {
    circuit: &'a Circuit,
    name: Id,
    ports: &'a [Port],
    body: &'a Stmt,
    netlist: Netlist,
    namegen: NameGenerator,
    portdefs: Vec<String>,
    declares: Vec<String>,
    instdeclares: Vec<String>,
    assigns: Vec<String>,
    attach_synth: Vec<String>,
    attach_alias: Vec<String>,
    initials: Vec<String>,
    /// Always-block bodies in first-seen clock order.
    at_clock: LinkedHashMap<Expr, Vec<String>>,
}

impl<'a> ModuleEmitter<'a> {
    fn new(circuit: &'a Circuit, module: &'a Module) -> RippleResult<Self> {
        let Module::Internal { name, ports, body } = module else {
            return Err(Error::internal(format!(
                "cannot lower external module `{}`",
                module.name()
            )));
        };
        let mut namegen =
            NameGenerator::with_prev_defined_names(module_names(module));
        let netlist = Netlist::build(body, &mut namegen)?;
        Ok(ModuleEmitter {
            circuit,
            name: *name,
            ports,
            body,
            netlist,
            namegen,
            portdefs: Vec::new(),
            declares: Vec::new(),
            instdeclares: Vec::new(),
            assigns: Vec::new(),
            attach_synth: Vec::new(),
            attach_alias: Vec::new(),
            initials: Vec::new(),
            at_clock: LinkedHashMap::new(),
        })
    }

    fn emit(mut self) -> RippleResult<String> {
        self.build_ports()?;
        let body = self.body;
        self.build_streams(body)?;
        self.render()
    }

    /* ============================= Ports ============================= */

    fn build_ports(&mut self) -> RippleResult<()> {
        let ports = self.ports;
        let dirs: Vec<&str> = ports
            .iter()
            .map(|p| match (&p.tpe, p.direction) {
                (Type::Analog(_), _) => "inout ",
                (_, Direction::Input) => "input ",
                (_, Direction::Output) => "output",
            })
            .collect();
        let types: Vec<String> = ports
            .iter()
            .map(|p| type_decl(&p.tpe))
            .collect::<RippleResult<_>>()?;
        let width = types.iter().map(|t| t.len()).max().unwrap_or(0);
        for ((port, dir), tpe) in ports.iter().zip(dirs).zip(types) {
            if width == 0 {
                self.portdefs.push(format!("{} {}", dir, port.name));
            } else {
                self.portdefs.push(format!(
                    "{} {:<width$} {}",
                    dir, tpe, port.name
                ));
            }
        }
        Ok(())
    }

    /* ============================ Streams ============================ */

    fn build_streams(&mut self, stmt: &Stmt) -> RippleResult<()> {
        match stmt {
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.build_streams(s)?;
                }
            }
            Stmt::Skip => {}
            Stmt::Wire { name, tpe } => {
                self.declares.push(decl_line("wire", tpe, name.as_str())?);
            }
            Stmt::Node { name, value } => {
                self.declares.push(decl_line(
                    "wire",
                    &value.tpe(),
                    name.as_str(),
                )?);
                let mut line = format!("assign {} = ", name);
                v_expr(value, &mut line)?;
                line.push(';');
                self.assigns.push(line);
            }
            Stmt::Connect { loc, expr } => match loc.kind() {
                Some(Kind::Port | Kind::Wire | Kind::Instance) => {
                    let mut line = String::from("assign ");
                    v_expr(loc, &mut line)?;
                    line.push_str(" = ");
                    v_expr(expr, &mut line)?;
                    line.push(';');
                    self.assigns.push(line);
                }
                // Registers and memory ports are driven from their
                // always-blocks; the netlist already indexed the driver.
                Some(Kind::Register | Kind::Memory) => {}
                Some(Kind::Node) | None => {
                    return Err(Error::malformed_ir(format!(
                        "cannot connect to `{}`",
                        loc
                    )))
                }
            },
            Stmt::IsInvalid { expr } => self.build_invalid(expr)?,
            Stmt::Register(reg) => self.build_register(reg)?,
            Stmt::Memory(mem) => self.build_memory(mem)?,
            Stmt::InstanceConnected(inst) => self.build_instance(inst)?,
            Stmt::Instance(inst) => {
                return Err(Error::internal(format!(
                    "unbound instance `{}` of `{}` reached the emitter",
                    inst.name, inst.module
                )))
            }
            Stmt::InstanceConnector { name, module } => {
                return Err(Error::internal(format!(
                    "connector form of instance `{}` of `{}` reached the emitter",
                    name, module
                )))
            }
            Stmt::Attach(exprs) => self.build_attach(exprs)?,
            Stmt::Stop { clk, en, code } => {
                self.build_stop(clk, en, *code)?;
            }
            Stmt::Print {
                clk,
                en,
                string,
                args,
            } => self.build_print(clk, en, string, args)?,
        }
        Ok(())
    }

    /* ===================== Invalids & registers ====================== */

    fn build_invalid(&mut self, expr: &Expr) -> RippleResult<()> {
        let temp = self.netlist.get(expr).cloned().ok_or_else(|| {
            Error::internal(format!(
                "no scratch driver recorded for invalidated `{}`",
                expr
            ))
        })?;
        let Expr::Ref { name, tpe, .. } = &temp else {
            return Err(Error::internal(format!(
                "driver of invalidated `{}` is not a fresh reference",
                expr
            )));
        };
        self.declares.push(decl_line("reg", tpe, name.as_str())?);
        let width = ground_width(&temp)?;
        self.rand_init(name.as_str(), width, "RANDOMIZE_INVALID_ASSIGN");
        if matches!(
            expr.kind(),
            Some(Kind::Port | Kind::Wire | Kind::Instance)
        ) {
            let mut line = String::from("assign ");
            v_expr(expr, &mut line)?;
            write!(line, " = {};", name)?;
            self.assigns.push("`ifdef RANDOMIZE_INVALID_ASSIGN".into());
            self.assigns.push(line);
            self.assigns.push("`endif".into());
        }
        Ok(())
    }

    fn build_register(&mut self, reg: &DefRegister) -> RippleResult<()> {
        self.declares.push(decl_line(
            "reg",
            &reg.tpe,
            reg.name.as_str(),
        )?);
        let width = reg.tpe.width().ok_or_else(|| {
            Error::malformed_ir(format!(
                "register `{}` does not have a ground type",
                reg.name
            ))
        })?;
        self.rand_init(reg.name.as_str(), width, "RANDOMIZE_REG_INIT");

        let self_ref =
            Expr::reference(reg.name, reg.tpe.clone(), Kind::Register);
        let driver = self
            .netlist
            .get(&self_ref)
            .cloned()
            .unwrap_or_else(|| self_ref.clone());
        // Registers whose init is themselves have no reset mux.
        let next = if reg.init == self_ref {
            driver
        } else {
            Expr::Mux {
                cond: Box::new(reg.reset.clone()),
                tval: Box::new(reg.init.clone()),
                fval: Box::new(driver),
                tpe: reg.tpe.clone(),
            }
        };
        let mut lines = Vec::new();
        // The flattening budget is this register's own: a mux shared with
        // another register's driver expands up to the bound in each.
        let mut visits = HashMap::new();
        self.add_update(&self_ref, &next, 4, &mut visits, &mut lines)?;
        self.at_clock
            .entry(reg.clock.clone())
            .or_insert_with(Vec::new)
            .extend(lines);
        Ok(())
    }

    /// Flatten the mux tree guarding a register's next value into nested
    /// `if` statements, resolving wire/node references through the
    /// netlist on the way down. `visits` counts mux expansions for the
    /// register currently being flattened, keyed by structural equality.
    fn add_update(
        &self,
        reg: &Expr,
        e: &Expr,
        indent: usize,
        visits: &mut HashMap<Expr, u32>,
        out: &mut Vec<String>,
    ) -> RippleResult<()> {
        // A register keeping its own value needs no update.
        if e == reg {
            return Ok(());
        }
        let resolved = match e.kind() {
            Some(Kind::Wire | Kind::Node) => self
                .netlist
                .get(e)
                .cloned()
                .unwrap_or_else(|| e.clone()),
            _ => e.clone(),
        };
        let expand = match &resolved {
            Expr::Mux { .. } => {
                let count = visits.entry(resolved.clone()).or_insert(0);
                if *count < MUX_FLATTEN_BOUND {
                    *count += 1;
                    true
                } else {
                    false
                }
            }
            _ => false,
        };
        if !expand {
            let tab = " ".repeat(indent);
            let mut line = String::new();
            write!(line, "{}", tab)?;
            v_expr(reg, &mut line)?;
            line.push_str(" <= ");
            v_expr(&resolved, &mut line)?;
            line.push(';');
            out.push(line);
            return Ok(());
        }

        let Expr::Mux {
            cond, tval, fval, ..
        } = &resolved
        else {
            unreachable!()
        };
        let mut t_lines = Vec::new();
        self.add_update(reg, tval, indent + 2, visits, &mut t_lines)?;
        let mut f_lines = Vec::new();
        self.add_update(reg, fval, indent + 2, visits, &mut f_lines)?;

        let tab = " ".repeat(indent);
        match (t_lines.is_empty(), f_lines.is_empty()) {
            (false, false) => {
                let mut line = format!("{}if (", tab);
                v_expr(cond, &mut line)?;
                line.push_str(") begin");
                out.push(line);
                out.extend(t_lines);
                out.push(format!("{}end else begin", tab));
                out.extend(f_lines);
                out.push(format!("{}end", tab));
            }
            (false, true) => {
                let mut line = format!("{}if (", tab);
                v_expr(cond, &mut line)?;
                line.push_str(") begin");
                out.push(line);
                out.extend(t_lines);
                out.push(format!("{}end", tab));
            }
            (true, false) => {
                let mut line = format!("{}if (!(", tab);
                v_expr(cond, &mut line)?;
                line.push_str(")) begin");
                out.push(line);
                out.extend(f_lines);
                out.push(format!("{}end", tab));
            }
            (true, true) => {}
        }
        Ok(())
    }

    /* ============================ Memories =========================== */

    fn build_memory(&mut self, mem: &DefMemory) -> RippleResult<()> {
        check_memory(mem, self.name)?;
        let data_width = mem.data_type.width().ok_or_else(|| {
            Error::malformed_ir(format!(
                "memory `{}` does not have a ground data type",
                mem.name
            ))
        })?;
        let addr_width = bits_needed_for(mem.depth);
        let keyword =
            if mem.depth.saturating_mul(data_width) > SPARSE_MEM_BITS {
                "reg /* sparse */"
            } else {
                "reg"
            };
        let array_tpe =
            Type::Vector(Box::new(mem.data_type.clone()), mem.depth);
        self.declares
            .push(decl_line(keyword, &array_tpe, mem.name.as_str())?);
        self.mem_rand_init(mem.name.as_str(), data_width, mem.depth);

        for reader in &mem.readers {
            self.build_read_port(mem, *reader, data_width, addr_width)?;
        }
        for writer in &mem.writers {
            self.build_write_port(mem, *writer, addr_width)?;
        }
        Ok(())
    }

    fn build_read_port(
        &mut self,
        mem: &DefMemory,
        reader: Id,
        data_width: u64,
        addr_width: u64,
    ) -> RippleResult<()> {
        let data_name = format!("{}_{}_data", mem.name, reader);
        let addr_name = format!("{}_{}_addr", mem.name, reader);
        self.declares
            .push(decl_line("wire", &mem.data_type, &data_name)?);
        self.declares.push(decl_line(
            "wire",
            &Type::UInt(addr_width),
            &addr_name,
        )?);

        let addr = Expr::mem_port_field(
            mem.name,
            reader,
            "addr",
            Type::UInt(addr_width),
        );
        let driver = self.port_driver(&addr)?;
        let mut line = format!("assign {} = ", addr_name);
        v_expr(&driver, &mut line)?;
        line.push(';');
        self.assigns.push(line);

        let mem_port = format!("{}[{}]", mem.name, addr_name);
        if mem.depth.is_power_of_two() {
            self.assigns
                .push(format!("assign {} = {};", data_name, mem_port));
        } else {
            // Out-of-range reads return garbage when requested; the
            // in-range read is the non-randomized default.
            let bound =
                v_uint_lit(&BigUint::from(mem.depth), addr_width);
            self.assigns
                .push("`ifndef RANDOMIZE_GARBAGE_ASSIGN".into());
            self.assigns
                .push(format!("assign {} = {};", data_name, mem_port));
            self.assigns.push("`else".into());
            self.assigns.push(format!(
                "assign {} = ({} >= {}) ? {} : {};",
                data_name,
                addr_name,
                bound,
                vrandom(data_width),
                mem_port
            ));
            self.assigns.push("`endif".into());
        }
        Ok(())
    }

    fn build_write_port(
        &mut self,
        mem: &DefMemory,
        writer: Id,
        addr_width: u64,
    ) -> RippleResult<()> {
        let fields = [
            ("data", mem.data_type.clone()),
            ("addr", Type::UInt(addr_width)),
            ("mask", Type::UInt(1)),
            ("en", Type::UInt(1)),
        ];
        for (field, tpe) in &fields {
            let wire_name = format!("{}_{}_{}", mem.name, writer, field);
            self.declares.push(decl_line("wire", tpe, &wire_name)?);
            let port_field =
                Expr::mem_port_field(mem.name, writer, *field, tpe.clone());
            let driver = self.port_driver(&port_field)?;
            let mut line = format!("assign {} = ", wire_name);
            v_expr(&driver, &mut line)?;
            line.push(';');
            self.assigns.push(line);
        }

        let clk_field =
            Expr::mem_port_field(mem.name, writer, "clk", Type::Clock);
        let clock = self.port_driver(&clk_field)?;
        let en = format!("{}_{}_en", mem.name, writer);
        let mask = format!("{}_{}_mask", mem.name, writer);
        let addr = format!("{}_{}_addr", mem.name, writer);
        let data = format!("{}_{}_data", mem.name, writer);
        let body = self.at_clock.entry(clock).or_insert_with(Vec::new);
        body.push(format!("    if ({} & {}) begin", en, mask));
        body.push(format!("      {}[{}] <= {};", mem.name, addr, data));
        body.push("    end".into());
        Ok(())
    }

    fn port_driver(&self, field: &Expr) -> RippleResult<Expr> {
        self.netlist.get(field).cloned().ok_or_else(|| {
            Error::malformed_ir(format!(
                "memory port field `{}` is not connected",
                field
            ))
        })
    }

    /* ========================== Instances ============================ */

    fn build_instance(
        &mut self,
        inst: &DefInstanceConnected,
    ) -> RippleResult<()> {
        let module = self.circuit.module(inst.module).ok_or_else(|| {
            Error::malformed_ir(format!(
                "instance `{}` refers to undefined module `{}`",
                inst.name, inst.module
            ))
        })?;
        let (defname, params): (Id, &[Param]) = match module {
            Module::External {
                defname, params, ..
            } => (*defname, params),
            Module::Internal { name, .. } => (*name, &[]),
        };

        for e in &inst.port_cons {
            let wire_name = e.lowered_name().ok_or_else(|| {
                Error::internal(format!(
                    "instance port binding `{}` is not a name path",
                    e
                ))
            })?;
            self.declares
                .push(decl_line("wire", &e.tpe(), &wire_name)?);
        }

        let header = if params.is_empty() {
            format!("{} {} (", defname, inst.name)
        } else {
            let bindings =
                params.iter().map(param_binding).join(", ");
            format!("{} #({}) {} (", defname, bindings, inst.name)
        };
        self.instdeclares.push(header);
        let n = inst.port_cons.len();
        for (i, e) in inst.port_cons.iter().enumerate() {
            let port = e.remove_root()?;
            let mut line = String::from("  .");
            v_expr(&port, &mut line)?;
            line.push('(');
            v_expr(e, &mut line)?;
            line.push(')');
            if i + 1 != n {
                line.push(',');
            }
            self.instdeclares.push(line);
        }
        self.instdeclares.push(");".into());
        Ok(())
    }

    /* ====================== Attach, stop, print ====================== */

    fn build_attach(&mut self, exprs: &[Expr]) -> RippleResult<()> {
        let names: Vec<String> = exprs
            .iter()
            .map(|e| expr_str(e))
            .collect::<RippleResult<_>>()?;
        for (i, a) in names.iter().enumerate() {
            for b in names.iter().skip(i + 1) {
                self.attach_synth.push(format!("assign {} = {};", a, b));
                self.attach_synth.push(format!("assign {} = {};", b, a));
            }
        }
        self.attach_alias
            .push(format!("alias {};", names.iter().join(" = ")));
        Ok(())
    }

    fn build_stop(
        &mut self,
        clk: &Expr,
        en: &Expr,
        code: i64,
    ) -> RippleResult<()> {
        let call = if code == 0 { "$finish" } else { "$fatal" };
        let body = format!("          {};", call);
        self.guarded_sim_call(clk, en, "STOP_COND", vec![body])
    }

    fn build_print(
        &mut self,
        clk: &Expr,
        en: &Expr,
        string: &str,
        args: &[Expr],
    ) -> RippleResult<()> {
        let mut call = format!(
            "          $fwrite(32'h80000002, \"{}\"",
            escape_string(string)
        );
        for arg in args {
            call.push_str(", ");
            v_expr(arg, &mut call)?;
        }
        call.push_str(");");
        self.guarded_sim_call(clk, en, "PRINTF_COND", vec![call])
    }

    /// Simulation-only construct scaffolding: everything sits under
    /// `` `ifndef SYNTHESIS``, optionally gated by a condition macro, and
    /// fires only when `en` holds.
    fn guarded_sim_call(
        &mut self,
        clk: &Expr,
        en: &Expr,
        cond_macro: &str,
        calls: Vec<String>,
    ) -> RippleResult<()> {
        let mut lines = Vec::new();
        lines.push("    `ifndef SYNTHESIS".to_string());
        lines.push(format!("    `ifdef {}", cond_macro));
        lines.push(format!("      if (`{}) begin", cond_macro));
        lines.push("    `endif".to_string());
        let mut en_line = String::from("        if (");
        v_expr(en, &mut en_line)?;
        en_line.push_str(") begin");
        lines.push(en_line);
        lines.extend(calls);
        lines.push("        end".to_string());
        lines.push(format!("    `ifdef {}", cond_macro));
        lines.push("      end".to_string());
        lines.push("    `endif".to_string());
        lines.push("    `endif".to_string());
        self.at_clock
            .entry(clk.clone())
            .or_insert_with(Vec::new)
            .extend(lines);
        Ok(())
    }

    /* ======================== Randomization ========================== */

    fn rand_init(&mut self, name: &str, width: u64, guard: &str) {
        let width = width.max(1);
        let rand = self.namegen.rand_name();
        self.declares
            .push(format!("reg [{}:0] {};", rand_width(width) - 1, rand));
        self.initials.push(format!("`ifdef {}", guard));
        self.initials
            .push(format!("{} = {};", rand, vrandom(width)));
        self.initials
            .push(format!("{} = {}[{}:0];", name, rand, width - 1));
        self.initials.push("`endif".to_string());
    }

    fn mem_rand_init(&mut self, name: &str, width: u64, depth: u64) {
        let width = width.max(1);
        let rand = self.namegen.rand_name();
        self.declares
            .push(format!("reg [{}:0] {};", rand_width(width) - 1, rand));
        self.initials.push("`ifdef RANDOMIZE_MEM_INIT".to_string());
        self.initials
            .push(format!("{} = {};", rand, vrandom(width)));
        self.initials.push(format!(
            "for (initvar = 0; initvar < {}; initvar = initvar+1)",
            depth
        ));
        self.initials.push(format!(
            "  {}[initvar] = {}[{}:0];",
            name,
            rand,
            width - 1
        ));
        self.initials.push("`endif".to_string());
    }

    /* ========================== Rendering ============================ */

    fn render(self) -> RippleResult<String> {
        let mut out = String::new();
        writeln!(out, "module {}(", self.name)?;
        let n = self.portdefs.len();
        for (i, p) in self.portdefs.iter().enumerate() {
            writeln!(out, "  {}{}", p, if i + 1 == n { "" } else { "," })?;
        }
        writeln!(out, ");")?;
        for line in &self.declares {
            writeln!(out, "  {}", line)?;
        }
        for line in &self.instdeclares {
            writeln!(out, "  {}", line)?;
        }
        for line in &self.assigns {
            writeln!(out, "  {}", line)?;
        }
        if !self.attach_synth.is_empty() || !self.attach_alias.is_empty() {
            writeln!(out, "`ifdef SYNTHESIS")?;
            for line in &self.attach_synth {
                writeln!(out, "  {}", line)?;
            }
            writeln!(out, "`elsif verilator")?;
            writeln!(
                out,
                "  `error \"Verilator does not support alias and thus cannot arbitrarily connect bidirectional wires and ports\""
            )?;
            writeln!(out, "`else")?;
            for line in &self.attach_alias {
                writeln!(out, "  {}", line)?;
            }
            writeln!(out, "`endif")?;
        }
        if self.declares.is_empty()
            && self.instdeclares.is_empty()
            && self.assigns.is_empty()
        {
            // A module with no body is still a legal module.
            writeln!(out, "  initial begin end")?;
        }
        if !self.initials.is_empty() {
            writeln!(out, "`ifdef RANDOMIZE")?;
            writeln!(out, "  integer initvar;")?;
            writeln!(out, "  initial begin")?;
            writeln!(out, "    `ifndef verilator")?;
            writeln!(out, "      #0.002 begin end")?;
            writeln!(out, "    `endif")?;
            for line in &self.initials {
                writeln!(out, "    {}", line)?;
            }
            writeln!(out, "  end")?;
            writeln!(out, "`endif")?;
        }
        for (clk, body) in &self.at_clock {
            if body.is_empty() {
                continue;
            }
            let mut line = String::from("  always @(posedge ");
            v_expr(clk, &mut line)?;
            line.push_str(") begin");
            writeln!(out, "{}", line)?;
            for l in body {
                writeln!(out, "{}", l)?;
            }
            writeln!(out, "  end")?;
        }
        writeln!(out, "endmodule")?;
        Ok(out)
    }
}

/* ======================= Expression rendering ======================== */

/// Write the Verilog rendering of an expression.
fn v_expr(e: &Expr, out: &mut String) -> RippleResult<()> {
    match e {
        Expr::Ref { name, .. } => out.push_str(name.as_str()),
        Expr::SubField { .. } | Expr::SubIndex { .. } => {
            let name = e.lowered_name().ok_or_else(|| {
                Error::malformed_ir(format!(
                    "expression `{}` has no flattened name",
                    e
                ))
            })?;
            out.push_str(&name);
        }
        Expr::SubAccess { expr, index, .. } => {
            v_expr(expr, out)?;
            out.push('[');
            v_expr(index, out)?;
            out.push(']');
        }
        Expr::Mux {
            cond, tval, fval, ..
        } => {
            v_expr(cond, out)?;
            out.push_str(" ? ");
            v_cast(tval, out)?;
            out.push_str(" : ");
            v_cast(fval, out)?;
        }
        // The condition is redundant at the Verilog level; invalid values
        // randomize elsewhere.
        Expr::ValidIf { value, .. } => v_cast(value, out)?,
        Expr::UIntLit { value, width } => {
            out.push_str(&v_uint_lit(value, *width))
        }
        Expr::SIntLit { value, width } => {
            let (sign, magnitude) = value.clone().into_parts();
            let hex = padded_hex(&magnitude, *width);
            if sign == Sign::Minus {
                write!(out, "-{}'sh{}", width, hex)?;
            } else {
                write!(out, "{}'sh{}", width, hex)?;
            }
        }
        Expr::DoPrim { .. } => v_primop(e, out)?,
    }
    Ok(())
}

fn expr_str(e: &Expr) -> RippleResult<String> {
    let mut out = String::new();
    v_expr(e, &mut out)?;
    Ok(out)
}

/// Sign a subtree according to its own type.
fn v_cast(e: &Expr, out: &mut String) -> RippleResult<()> {
    if e.tpe().is_signed() {
        out.push_str("$signed(");
        v_expr(e, out)?;
        out.push(')');
    } else {
        v_expr(e, out)?;
    }
    Ok(())
}

/// Sign a subtree according to a governing result type.
fn v_cast_to(e: &Expr, tpe: &Type, out: &mut String) -> RippleResult<()> {
    if tpe.is_signed() {
        out.push_str("$signed(");
        v_expr(e, out)?;
        out.push(')');
    } else {
        v_expr(e, out)?;
    }
    Ok(())
}

/// Coerce an argument to signed when any sibling argument is signed:
/// signed values directly, unsigned ones through a zero-extension.
fn v_cast_if(e: &Expr, any_signed: bool, out: &mut String) -> RippleResult<()> {
    if !any_signed {
        return v_expr(e, out);
    }
    if e.tpe().is_signed() {
        out.push_str("$signed(");
        v_expr(e, out)?;
        out.push(')');
    } else {
        out.push_str("$signed({1'b0,");
        v_expr(e, out)?;
        out.push_str("})");
    }
    Ok(())
}

fn ground_width(e: &Expr) -> RippleResult<u64> {
    e.tpe().width().ok_or_else(|| {
        Error::malformed_ir(format!(
            "expression `{}` does not have a ground type",
            e
        ))
    })
}

fn v_primop(e: &Expr, out: &mut String) -> RippleResult<()> {
    let Expr::DoPrim {
        op,
        args,
        consts,
        tpe,
    } = e
    else {
        unreachable!()
    };
    for arg in args {
        if !arg.is_simple() {
            return Err(Error::malformed_ir(format!(
                "argument `{}` of `{}` is not a literal, reference or subfield",
                arg, op
            )));
        }
    }
    let arg =
        |i: usize| -> RippleResult<&Expr> {
            args.get(i).ok_or_else(|| {
                Error::malformed_ir(format!("`{}` is missing arguments", op))
            })
        };
    let konst = |i: usize| -> RippleResult<u64> {
        consts.get(i).copied().ok_or_else(|| {
            Error::malformed_ir(format!(
                "`{}` is missing constant arguments",
                op
            ))
        })
    };
    let any_signed = args.iter().any(|a| a.tpe().is_signed());

    match op {
        PrimOp::Add
        | PrimOp::Addw
        | PrimOp::Sub
        | PrimOp::Subw
        | PrimOp::Mul
        | PrimOp::Div
        | PrimOp::Rem
        | PrimOp::Lt
        | PrimOp::Leq
        | PrimOp::Gt
        | PrimOp::Geq
        | PrimOp::Eq
        | PrimOp::Neq => {
            let sym = match op {
                PrimOp::Add | PrimOp::Addw => "+",
                PrimOp::Sub | PrimOp::Subw => "-",
                PrimOp::Mul => "*",
                PrimOp::Div => "/",
                PrimOp::Rem => "%",
                PrimOp::Lt => "<",
                PrimOp::Leq => "<=",
                PrimOp::Gt => ">",
                PrimOp::Geq => ">=",
                PrimOp::Eq => "==",
                PrimOp::Neq => "!=",
                _ => unreachable!(),
            };
            v_cast_if(arg(0)?, any_signed, out)?;
            write!(out, " {} ", sym)?;
            v_cast_if(arg(1)?, any_signed, out)?;
        }
        PrimOp::And | PrimOp::Or | PrimOp::Xor => {
            let sym = match op {
                PrimOp::And => "&",
                PrimOp::Or => "|",
                PrimOp::Xor => "^",
                _ => unreachable!(),
            };
            v_cast_to(arg(0)?, tpe, out)?;
            write!(out, " {} ", sym)?;
            v_cast_to(arg(1)?, tpe, out)?;
        }
        PrimOp::Not => {
            out.push_str("~ ");
            v_expr(arg(0)?, out)?;
        }
        PrimOp::Andr => {
            out.push('&');
            v_expr(arg(0)?, out)?;
        }
        PrimOp::Orr => {
            out.push('|');
            v_expr(arg(0)?, out)?;
        }
        PrimOp::Xorr => {
            out.push('^');
            v_expr(arg(0)?, out)?;
        }
        PrimOp::Shl | PrimOp::Shlw => {
            v_cast(arg(0)?, out)?;
            write!(out, " << {}", konst(0)?)?;
        }
        PrimOp::Shr => {
            let a = arg(0)?;
            let w = ground_width(a)?;
            let amount = konst(0)?;
            if amount >= w {
                return Err(Error::unsupported_ir(format!(
                    "cannot right-shift `{}` ({} bits) by {}",
                    a, w, amount
                )));
            }
            v_expr(a, out)?;
            write!(out, "[{}:{}]", w - 1, amount)?;
        }
        PrimOp::Dshl | PrimOp::Dshlw => {
            v_cast(arg(0)?, out)?;
            out.push_str(" << ");
            v_expr(arg(1)?, out)?;
        }
        PrimOp::Dshr => {
            v_cast_if(arg(0)?, any_signed, out)?;
            out.push_str(if tpe.is_signed() { " >>> " } else { " >> " });
            v_expr(arg(1)?, out)?;
        }
        PrimOp::Pad => {
            let a = arg(0)?;
            let w = ground_width(a)?;
            let n = konst(0)?;
            if w == 0 || n <= w {
                v_expr(a, out)?;
            } else if !tpe.is_signed() {
                write!(out, "{{{}'d0, ", n - w)?;
                v_expr(a, out)?;
                out.push('}');
            } else if w == 1 {
                write!(out, "{{{}{{", n)?;
                v_expr(a, out)?;
                out.push_str("}}");
            } else {
                write!(out, "{{{{{}{{", n - w)?;
                v_expr(a, out)?;
                write!(out, "[{}]}}}}, ", w - 1)?;
                v_expr(a, out)?;
                out.push('}');
            }
        }
        PrimOp::Neg => {
            out.push_str("-{");
            v_cast(arg(0)?, out)?;
            out.push('}');
        }
        PrimOp::Cvt => {
            let a = arg(0)?;
            if a.tpe().is_signed() {
                v_cast(a, out)?;
            } else {
                out.push_str("{1'b0,");
                v_cast(a, out)?;
                out.push('}');
            }
        }
        PrimOp::AsUInt | PrimOp::AsClock => {
            out.push_str("$unsigned(");
            v_expr(arg(0)?, out)?;
            out.push(')');
        }
        PrimOp::AsSInt => {
            out.push_str("$signed(");
            v_expr(arg(0)?, out)?;
            out.push(')');
        }
        PrimOp::Cat => {
            out.push('{');
            v_cast(arg(0)?, out)?;
            out.push_str(", ");
            v_cast(arg(1)?, out)?;
            out.push('}');
        }
        PrimOp::Bits => {
            let a = arg(0)?;
            let (hi, lo) = (konst(0)?, konst(1)?);
            if hi == lo {
                if hi == 0 && ground_width(a)? == 1 {
                    v_expr(a, out)?;
                } else {
                    v_expr(a, out)?;
                    write!(out, "[{}]", hi)?;
                }
            } else {
                v_expr(a, out)?;
                write!(out, "[{}:{}]", hi, lo)?;
            }
        }
        PrimOp::Head => {
            let a = arg(0)?;
            let w = ground_width(a)?;
            let n = konst(0)?;
            v_expr(a, out)?;
            write!(out, "[{}:{}]", w - 1, w - n)?;
        }
        PrimOp::Tail => {
            let a = arg(0)?;
            let w = ground_width(a)?;
            let n = konst(0)?;
            v_expr(a, out)?;
            write!(out, "[{}:0]", w - n - 1)?;
        }
    }
    Ok(())
}

/* ========================= Shared helpers ============================ */

/// The declaration fragment of a type: `[w-1:0]`, `signed [w-1:0]`, or
/// empty for single-bit and clock types.
fn type_decl(tpe: &Type) -> RippleResult<String> {
    match tpe {
        Type::UInt(w) | Type::Analog(w) => Ok(if *w > 1 {
            format!("[{}:0]", w - 1)
        } else {
            String::new()
        }),
        Type::Clock => Ok(String::new()),
        Type::SInt(w) => Ok(if *w > 1 {
            format!("signed [{}:0]", w - 1)
        } else {
            "signed".to_string()
        }),
        Type::Vector(..) => Err(Error::malformed_ir(format!(
            "type `{}` cannot appear outside a memory declaration",
            tpe
        ))),
    }
}

/// A full declaration line. Vector types (memory arrays) put the size
/// bracket after the name.
fn decl_line(kw: &str, tpe: &Type, name: &str) -> RippleResult<String> {
    match tpe {
        Type::Vector(elem, size) => {
            let t = type_decl(elem)?;
            if t.is_empty() {
                Ok(format!("{} {} [{}:0];", kw, name, size - 1))
            } else {
                Ok(format!("{} {} {} [{}:0];", kw, t, name, size - 1))
            }
        }
        tpe => {
            let t = type_decl(tpe)?;
            if t.is_empty() {
                Ok(format!("{} {};", kw, name))
            } else {
                Ok(format!("{} {} {};", kw, t, name))
            }
        }
    }
}

fn param_binding(param: &Param) -> String {
    match param {
        Param::Int(name, v) => format!(".{}({})", name, v),
        Param::Str(name, s) => {
            format!(".{}(\"{}\")", name, escape_string(s))
        }
        Param::Raw(name, s) => format!(".{}({})", name, s),
    }
}

/// `{k{$random}}` wide enough to cover `width` bits.
fn vrandom(width: u64) -> String {
    format!("{{{}{{$random}}}}", width.div_ceil(32))
}

/// Width of a randomization scratch register: `width` rounded up to a
/// multiple of 32.
fn rand_width(width: u64) -> u64 {
    width.div_ceil(32) * 32
}

fn padded_hex(value: &BigUint, width: u64) -> String {
    let digits = (width.div_ceil(4)).max(1) as usize;
    let hex = format!("{:x}", value);
    if hex.len() >= digits {
        hex
    } else {
        format!("{}{}", "0".repeat(digits - hex.len()), hex)
    }
}

fn v_uint_lit(value: &BigUint, width: u64) -> String {
    format!("{}'h{}", width, padded_hex(value, width))
}
