//! Implements the canonical text form of the IR. Serialization is
//! deterministic: the statement tree is walked in order and no part of the
//! in-memory circuit is mutated.
use crate::{
    Circuit, DefMemory, DefRegister, Direction, Module, Param, Port, Stmt,
};
use itertools::Itertools;
use ripple_utils::{escape_string, GetName};
use std::io;

/// Printer for the IR.
pub struct Printer;

impl Printer {
    /// Serialize a whole circuit.
    pub fn write_circuit<F: io::Write>(
        circuit: &Circuit,
        f: &mut F,
    ) -> io::Result<()> {
        writeln!(f, "circuit {} :", circuit.main)?;
        for module in &circuit.modules {
            Self::write_module(module, 2, f)?;
        }
        Ok(())
    }

    /// Serialize a single module at the given indentation level.
    pub fn write_module<F: io::Write>(
        module: &Module,
        indent: usize,
        f: &mut F,
    ) -> io::Result<()> {
        match module {
            Module::Internal { name, ports, body } => {
                writeln!(f, "{}module {} :", " ".repeat(indent), name)?;
                for port in ports {
                    Self::write_port(port, indent + 2, f)?;
                }
                writeln!(f)?;
                Self::write_stmt(body, indent + 2, f)?;
            }
            Module::External {
                name,
                ports,
                defname,
                params,
            } => {
                writeln!(f, "{}extmodule {} :", " ".repeat(indent), name)?;
                for port in ports {
                    Self::write_port(port, indent + 2, f)?;
                }
                writeln!(f, "{}defname = {}", " ".repeat(indent + 2), defname)?;
                for param in params {
                    Self::write_param(param, indent + 2, f)?;
                }
            }
        }
        writeln!(f)
    }

    fn write_port<F: io::Write>(
        port: &Port,
        indent: usize,
        f: &mut F,
    ) -> io::Result<()> {
        let dir = match port.direction {
            Direction::Input => "input",
            Direction::Output => "output",
        };
        writeln!(
            f,
            "{}{} {} : {}",
            " ".repeat(indent),
            dir,
            port.name,
            port.tpe
        )
    }

    fn write_param<F: io::Write>(
        param: &Param,
        indent: usize,
        f: &mut F,
    ) -> io::Result<()> {
        write!(f, "{}parameter {} = ", " ".repeat(indent), param.name())?;
        match param {
            Param::Int(_, v) => writeln!(f, "{}", v),
            Param::Str(_, s) => writeln!(f, "\"{}\"", escape_string(s)),
            Param::Raw(_, s) => writeln!(f, "{}", s),
        }
    }

    /// Serialize a statement. Blocks flatten into their children; every
    /// leaf statement occupies one line except memories, which serialize as
    /// an indented field list.
    pub fn write_stmt<F: io::Write>(
        stmt: &Stmt,
        indent: usize,
        f: &mut F,
    ) -> io::Result<()> {
        let tab = " ".repeat(indent);
        match stmt {
            Stmt::Block(stmts) => {
                for s in stmts {
                    Self::write_stmt(s, indent, f)?;
                }
                Ok(())
            }
            Stmt::Connect { loc, expr } => {
                writeln!(f, "{}{} <= {}", tab, loc, expr)
            }
            Stmt::IsInvalid { expr } => {
                writeln!(f, "{}{} is invalid", tab, expr)
            }
            Stmt::Node { name, value } => {
                writeln!(f, "{}node {} = {}", tab, name, value)
            }
            Stmt::Wire { name, tpe } => {
                writeln!(f, "{}wire {} : {}", tab, name, tpe)
            }
            Stmt::Register(reg) => Self::write_register(reg, indent, f),
            Stmt::Memory(mem) => Self::write_memory(mem, indent, f),
            Stmt::Instance(inst) => {
                writeln!(f, "{}inst {} of {}", tab, inst.name, inst.module)
            }
            // Port connections are derived data; the text form is the same
            // as the structural instance.
            Stmt::InstanceConnected(inst) => {
                writeln!(f, "{}inst {} of {}", tab, inst.name, inst.module)
            }
            Stmt::InstanceConnector { name, module } => {
                writeln!(f, "{}inst {} of {}", tab, name, module)
            }
            Stmt::Attach(exprs) => {
                writeln!(
                    f,
                    "{}attach({})",
                    tab,
                    exprs.iter().map(|e| e.to_string()).join(", ")
                )
            }
            Stmt::Stop { clk, en, code } => {
                writeln!(f, "{}stop({}, {}, {})", tab, clk, en, code)
            }
            Stmt::Print {
                clk,
                en,
                string,
                args,
            } => {
                write!(
                    f,
                    "{}printf({}, {}, \"{}\"",
                    tab,
                    clk,
                    en,
                    escape_string(string)
                )?;
                for arg in args {
                    write!(f, ", {}", arg)?;
                }
                writeln!(f, ")")
            }
            Stmt::Skip => writeln!(f, "{}skip", tab),
        }
    }

    fn write_register<F: io::Write>(
        reg: &DefRegister,
        indent: usize,
        f: &mut F,
    ) -> io::Result<()> {
        writeln!(
            f,
            "{}reg {} : {}, {} with : (reset => ({}, {}))",
            " ".repeat(indent),
            reg.name,
            reg.tpe,
            reg.clock,
            reg.reset,
            reg.init
        )
    }

    fn write_memory<F: io::Write>(
        mem: &DefMemory,
        indent: usize,
        f: &mut F,
    ) -> io::Result<()> {
        let tab = " ".repeat(indent);
        let field_tab = " ".repeat(indent + 2);
        writeln!(f, "{}mem {} :", tab, mem.name)?;
        writeln!(f, "{}data-type => {}", field_tab, mem.data_type)?;
        writeln!(f, "{}depth => {}", field_tab, mem.depth)?;
        writeln!(f, "{}read-latency => {}", field_tab, mem.read_latency)?;
        writeln!(f, "{}write-latency => {}", field_tab, mem.write_latency)?;
        for r in &mem.readers {
            writeln!(f, "{}reader => {}", field_tab, r)?;
        }
        for w in &mem.writers {
            writeln!(f, "{}writer => {}", field_tab, w)?;
        }
        for rw in &mem.readwriters {
            writeln!(f, "{}readwriter => {}", field_tab, rw)?;
        }
        writeln!(f, "{}read-under-write => undefined", field_tab)
    }

    /// Convenience method to get the string representation of a circuit.
    pub fn circuit_to_str(circuit: &Circuit) -> String {
        let mut buf = Vec::new();
        Self::write_circuit(circuit, &mut buf).ok();
        String::from_utf8_lossy(buf.as_slice()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Expr, Kind, Type};

    fn counter() -> Circuit {
        let clk = Expr::reference("clk", Type::Clock, Kind::Port);
        let r = Expr::reference("r", Type::UInt(8), Kind::Register);
        Circuit {
            main: "Counter".into(),
            modules: vec![Module::Internal {
                name: "Counter".into(),
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
                body: Stmt::Block(vec![
                    Stmt::Register(DefRegister {
                        name: "r".into(),
                        tpe: Type::UInt(8),
                        clock: clk,
                        reset: Expr::uint(0, 1),
                        init: r.clone(),
                    }),
                    Stmt::Connect {
                        loc: Expr::reference("out", Type::UInt(8), Kind::Port),
                        expr: r,
                    },
                ]),
            }],
        }
    }

    #[test]
    fn serializes_a_register_module() {
        let text = Printer::circuit_to_str(&counter());
        assert_eq!(
            text,
            "circuit Counter :\n\
             \x20 module Counter :\n\
             \x20   input clk : Clock\n\
             \x20   output out : UInt<8>\n\
             \n\
             \x20   reg r : UInt<8>, clk with : (reset => (UInt<1>(\"h0\"), r))\n\
             \x20   out <= r\n\
             \n"
        );
    }

    #[test]
    fn serialization_is_deterministic() {
        let c = counter();
        assert_eq!(Printer::circuit_to_str(&c), Printer::circuit_to_str(&c));
    }
}
