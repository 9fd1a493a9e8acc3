//! Integration tests for the uninitialized-store rewrite pass.
//!
//! Functions are written in the machine IR text format, either inline or as
//! fixtures under `tests/mir/`.

use std::fs;
use std::path::Path;

use cheri_codegen::mir::{parse_functions, MachineFunction, MachineOperand, Opcode, Register};
use cheri_codegen::passes::{MachineFunctionPass, PassError, UStorePass};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Helper to load and parse a fixture from `tests/mir/`.
fn load_mir_file(filename: &str) -> Vec<MachineFunction> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/mir")
        .join(filename);
    let contents = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));

    parse_functions(&contents).unwrap_or_else(|e| panic!("Failed to parse {filename}: {e}"))
}

fn parse_one(text: &str) -> MachineFunction {
    let mut funcs = parse_functions(text).expect("valid machine IR");
    assert_eq!(funcs.len(), 1);
    funcs.remove(0)
}

fn opcodes(func: &MachineFunction, block: usize) -> Vec<Opcode> {
    func.blocks()[block].iter().map(|i| i.opcode()).collect()
}

#[test]
fn test_single_store_replaced_in_place() {
    init_logging();
    let mut func = parse_one(
        "f {\nentry:\n    NOP\n    CAPSTORE32 $x10, $x11, 24, $c12\n    RET\n}\n",
    );
    let before = func.instr_count();

    let changed = UStorePass::new().run_on_function(&mut func).unwrap();

    assert!(changed);
    assert_eq!(func.instr_count(), before + 1);
    assert_eq!(
        opcodes(&func, 0),
        vec![Opcode::Nop, Opcode::CIncOffset, Opcode::UCapStore32, Opcode::Ret]
    );
    assert!(!opcodes(&func, 0).contains(&Opcode::CapStore32));

    let block = &func.blocks()[0];
    assert_eq!(block.instrs()[1].to_string(), "CINCOFFSET $x11, $c12, $c12");
    assert_eq!(block.instrs()[2].to_string(), "UCAPSTORE32 $c12, 24, $x10, $c12");
}

#[test]
fn test_fixture_rewrite() {
    init_logging();
    let mut funcs = load_mir_file("stores.mir");
    assert_eq!(funcs.len(), 2);

    let mut pass = UStorePass::new();
    assert!(pass.run_on_function(&mut funcs[0]).unwrap());
    assert!(!pass.run_on_function(&mut funcs[1]).unwrap());

    let expected = "\
stores {
entry:
    ADDI $x10, $x0, 42
    CINCOFFSET $x5, $c11, $c11
    UCAPSTORE32 $c11, 16, $x10, $c11
    CINCOFFSET $x6, $c11, $c11
    UCAPSTORE8 $c11, -4, $x10, $c11
    CSETBOUNDS $c12, $c11, 8
bb.1:
    CINCOFFSET %2, %3, %3
    UCAPSTORE3264 %3, 0, %1, %3
    RET
}
";
    assert_eq!(funcs[0].to_string(), expected);

    let stats = pass.stats();
    assert_eq!(stats.functions_changed, 1);
    assert_eq!(stats.stores_rewritten, 3);
}

#[test]
fn test_block_lengths_grow_by_rewrite_count() {
    let mut funcs = load_mir_file("stores.mir");
    let func = &mut funcs[0];
    let lengths: Vec<_> = func.blocks().iter().map(|b| b.len()).collect();

    UStorePass::new().run_on_function(func).unwrap();

    assert_eq!(func.blocks()[0].len(), lengths[0] + 2);
    assert_eq!(func.blocks()[1].len(), lengths[1] + 1);
}

#[test]
fn test_second_run_is_noop() {
    let mut funcs = load_mir_file("stores.mir");
    let mut pass = UStorePass::new();

    assert!(pass.run_on_function(&mut funcs[0]).unwrap());
    let after_first = funcs[0].clone();

    assert!(!pass.run_on_function(&mut funcs[0]).unwrap());
    assert_eq!(funcs[0], after_first);
}

#[test]
fn test_no_matching_opcodes() {
    let mut funcs = load_mir_file("stores.mir");
    let original = funcs[1].clone();

    let changed = UStorePass::new().run_on_function(&mut funcs[1]).unwrap();

    assert!(!changed);
    assert_eq!(funcs[1].instr_count(), original.instr_count());
    assert_eq!(funcs[1], original);
}

#[test]
fn test_empty_function() {
    let mut func = MachineFunction::new("empty");
    assert!(!UStorePass::new().run_on_function(&mut func).unwrap());
}

#[test]
fn test_adjacent_stores() {
    let mut func = parse_one(
        "f {\nentry:\n    CAPSTORE8 $x1, $x2, 1, $c3\n    CAPSTORE16 $x4, $x5, 2, $c6\n    CAPSTORE64 $x7, $x8, 3, $c9\n}\n",
    );

    assert!(UStorePass::new().run_on_function(&mut func).unwrap());
    assert_eq!(
        opcodes(&func, 0),
        vec![
            Opcode::CIncOffset,
            Opcode::UCapStore8,
            Opcode::CIncOffset,
            Opcode::UCapStore16,
            Opcode::CIncOffset,
            Opcode::UCapStore64,
        ]
    );

    // Each pair keeps the operands of the store it replaced.
    let block = &func.blocks()[0];
    assert_eq!(block.instrs()[3].operand(2), Some(&MachineOperand::Reg(Register::Gpr(4))));
    assert_eq!(block.instrs()[5].operand(1), Some(&MachineOperand::Imm(3)));
}

#[test]
fn test_malformed_store_aborts_without_changes() {
    init_logging();
    let mut funcs = load_mir_file("malformed.mir");
    let original = funcs[0].clone();

    let err = UStorePass::new().run_on_function(&mut funcs[0]).unwrap_err();

    match &err {
        PassError::MalformedOperands {
            pass,
            function,
            block,
            index,
            opcode,
            reason,
        } => {
            assert_eq!(*pass, "ustore");
            assert_eq!(function, "malformed");
            assert_eq!(block, "exit");
            assert_eq!(*index, 0);
            assert_eq!(*opcode, Opcode::CapStore16);
            assert!(reason.contains("offset operand must be an immediate"));
        }
    }
    assert!(err.to_string().contains("malformed CAPSTORE16 in malformed/exit"));

    // The well-formed store in the first block was not rewritten either.
    assert_eq!(funcs[0], original);
}
