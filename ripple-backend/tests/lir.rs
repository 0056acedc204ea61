//! Checks of the LIR passthrough back end.
use ripple_backend::{Artifact, ArtifactKind, Backend, EmitRequest, LirBackend};
use ripple_ir::{
    Circuit, DefInstance, Direction, Expr, Kind, Module, Port, Stmt, Type,
};

fn input(name: &str, tpe: Type) -> Port {
    Port {
        name: name.into(),
        direction: Direction::Input,
        tpe,
    }
}

fn three_module_circuit() -> Circuit {
    Circuit {
        main: "Top".into(),
        modules: vec![
            Module::Internal {
                name: "Top".into(),
                ports: vec![input("x", Type::UInt(4))],
                body: Stmt::Block(vec![
                    Stmt::Instance(DefInstance {
                        name: "c1".into(),
                        module: "Child".into(),
                    }),
                    Stmt::Instance(DefInstance {
                        name: "b".into(),
                        module: "Black".into(),
                    }),
                    // A second instance of an already-seen module must not
                    // produce a second stub.
                    Stmt::Instance(DefInstance {
                        name: "c2".into(),
                        module: "Child".into(),
                    }),
                ]),
            },
            Module::Internal {
                name: "Child".into(),
                ports: vec![input("in", Type::UInt(4))],
                body: Stmt::Block(vec![Stmt::Skip]),
            },
            Module::External {
                name: "Black".into(),
                ports: vec![input("in", Type::UInt(4))],
                defname: "BB".into(),
                params: vec![ripple_ir::Param::Int("WIDTH".into(), 4)],
            },
        ],
    }
}

fn emit(circuit: &Circuit, req: EmitRequest) -> Vec<Artifact> {
    LirBackend::validate(circuit).unwrap();
    LirBackend::emit(circuit, &req).unwrap()
}

#[test]
fn circuit_mode_serializes_everything() {
    let circuit = three_module_circuit();
    let artifacts = emit(
        &circuit,
        EmitRequest {
            circuit: true,
            all_modules: false,
        },
    );
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].name, "Top");
    assert_eq!(artifacts[0].kind, ArtifactKind::LirCircuit);
    let text = &artifacts[0].text;
    assert!(text.starts_with("circuit Top :\n"), "{}", text);
    assert!(text.contains("  module Top :\n"), "{}", text);
    assert!(text.contains("    inst c1 of Child\n"), "{}", text);
    assert!(text.contains("  extmodule Black :\n"), "{}", text);
    assert!(text.contains("    defname = BB\n"), "{}", text);
    assert!(text.contains("    parameter WIDTH = 4\n"), "{}", text);
}

#[test]
fn all_modules_mode_stubs_direct_children() {
    let circuit = three_module_circuit();
    let artifacts = emit(
        &circuit,
        EmitRequest {
            circuit: false,
            all_modules: true,
        },
    );
    // One artifact per internal module; externals get none of their own.
    assert_eq!(artifacts.len(), 2);

    let top = &artifacts[0];
    assert_eq!(top.name, "Top");
    assert_eq!(top.kind, ArtifactKind::LirModule);
    assert!(top.text.starts_with("circuit Top :\n"), "{}", top.text);
    // Stubs come first, in first-use order, deduplicated; each is an
    // external with defname equal to its own name and no parameters.
    let child_stub = top.text.find("extmodule Child :").unwrap();
    let black_stub = top.text.find("extmodule Black :").unwrap();
    let top_module = top.text.find("module Top :").unwrap();
    assert!(child_stub < black_stub && black_stub < top_module);
    assert_eq!(top.text.matches("extmodule Child :").count(), 1);
    assert!(top.text.contains("    defname = Child\n"), "{}", top.text);
    assert!(top.text.contains("    defname = Black\n"), "{}", top.text);
    assert!(!top.text.contains("parameter"), "{}", top.text);

    let child = &artifacts[1];
    assert_eq!(child.name, "Child");
    assert!(!child.text.contains("extmodule"), "{}", child.text);
    assert!(child.text.contains("    skip\n"), "{}", child.text);
}

#[test]
fn connector_instances_are_a_pipeline_bug() {
    let circuit = Circuit {
        main: "Top".into(),
        modules: vec![Module::Internal {
            name: "Top".into(),
            ports: vec![],
            body: Stmt::InstanceConnector {
                name: "c".into(),
                module: "Child".into(),
            },
        }],
    };
    let req = EmitRequest {
        circuit: false,
        all_modules: true,
    };
    assert!(LirBackend::emit(&circuit, &req).is_err());
}

#[test]
fn run_writes_artifacts_to_the_sink() {
    let backend = LirBackend;
    assert_eq!(backend.name(), "lir");
    let mut sink = ripple_utils::OutputFile::Null;
    backend
        .run(&three_module_circuit(), &EmitRequest::default(), &mut sink)
        .unwrap();
}

#[test]
fn serialization_round_trips_structurally() {
    // No parser lives in this workspace; the printer is the canonical
    // form, so a rebuilt circuit must print byte-identically.
    let circuit = three_module_circuit();
    let rebuilt = circuit.clone();
    let a = emit(&circuit, EmitRequest::default());
    let b = emit(&rebuilt, EmitRequest::default());
    assert_eq!(a[0].text, b[0].text);
}

#[test]
fn memories_and_registers_serialize() {
    use ripple_ir::{DefMemory, DefRegister};
    let clk = Expr::reference("clk", Type::Clock, Kind::Port);
    let circuit = Circuit {
        main: "M".into(),
        modules: vec![Module::Internal {
            name: "M".into(),
            ports: vec![input("clk", Type::Clock)],
            body: Stmt::Block(vec![
                Stmt::Register(DefRegister {
                    name: "r".into(),
                    tpe: Type::SInt(4),
                    clock: clk,
                    reset: Expr::uint(0, 1),
                    init: Expr::sint(-1, 4),
                }),
                Stmt::Memory(DefMemory {
                    name: "m".into(),
                    data_type: Type::UInt(8),
                    depth: 6,
                    write_latency: 1,
                    read_latency: 0,
                    readers: vec!["p".into()],
                    writers: vec!["w".into()],
                    readwriters: vec![],
                }),
            ]),
        }],
    };
    let artifacts = emit(&circuit, EmitRequest::default());
    let text = &artifacts[0].text;
    assert!(
        text.contains(
            "    reg r : SInt<4>, clk with : (reset => (UInt<1>(\"h0\"), SInt<4>(\"h-1\")))\n"
        ),
        "{}",
        text
    );
    assert!(text.contains("    mem m :\n"), "{}", text);
    assert!(text.contains("      data-type => UInt<8>\n"), "{}", text);
    assert!(text.contains("      depth => 6\n"), "{}", text);
    assert!(text.contains("      reader => p\n"), "{}", text);
    assert!(
        text.contains("      read-under-write => undefined\n"),
        "{}",
        text
    );
}
