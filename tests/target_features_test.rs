//! Integration tests for the target feature descriptor.

use std::collections::BTreeSet;

use cheri_codegen::target::{
    canonical_register_name, check_asm_operands, validate_asm_constraint, Arch, AsmOperand,
    CapTableAbi, ConstraintError, MacroSet, TargetFeaturesBuilder, TargetInfo,
};

const BASE_MACROS: [&str; 5] = [
    "__ELF__",
    "__riscv",
    "__riscv_xlen",
    "__riscv_cmodel_medlow",
    "__riscv_float_abi_soft",
];

fn target(arch: Arch, tokens: &[&str]) -> TargetInfo {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut builder = TargetFeaturesBuilder::new(arch);
    builder.configure(tokens);
    builder.finalize()
}

fn defines(info: &TargetInfo) -> MacroSet {
    let mut macros = MacroSet::new();
    info.target_defines(&mut macros);
    macros
}

fn names(macros: &MacroSet) -> BTreeSet<String> {
    macros.names().map(str::to_string).collect()
}

#[test]
fn test_base_macros() {
    let macros = defines(&target(Arch::Riscv32, &[]));

    assert_eq!(names(&macros), BASE_MACROS.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>());
    assert_eq!(macros.get("__riscv_xlen"), Some("32"));
    assert_eq!(macros.get("__ELF__"), Some("1"));

    let macros = defines(&target(Arch::Riscv64, &[]));
    assert_eq!(macros.get("__riscv_xlen"), Some("64"));
}

#[test]
fn test_standard_extensions() {
    let macros = defines(&target(Arch::Riscv64, &["+m", "+a", "+f", "+d", "+c"]));

    let mut expected: BTreeSet<String> = BASE_MACROS.iter().map(|s| s.to_string()).collect();
    for name in [
        "__riscv_mul",
        "__riscv_div",
        "__riscv_muldiv",
        "__riscv_atomic",
        "__riscv_flen",
        "__riscv_fdiv",
        "__riscv_fsqrt",
        "__riscv_compressed",
    ] {
        expected.insert(name.to_string());
    }

    assert_eq!(names(&macros), expected);
    assert_eq!(macros.get("__riscv_flen"), Some("64"));
}

#[test]
fn test_token_order_is_irrelevant() {
    let forward = defines(&target(Arch::Riscv32, &["+m", "+a", "+f", "+d", "+c"]));
    let backward = defines(&target(Arch::Riscv32, &["+c", "+d", "+f", "+a", "+m", "+m"]));

    assert_eq!(names(&forward), names(&backward));
    for def in forward.iter() {
        assert_eq!(backward.get(&def.name), Some(def.value.as_str()));
    }
}

#[test]
fn test_unknown_tokens_ignored() {
    let plain = defines(&target(Arch::Riscv32, &["+m"]));
    let noisy = defines(&target(Arch::Riscv32, &["+zfh", "+m", "+XCHERI", "-c", "bogus"]));
    assert_eq!(plain, noisy);
}

#[test]
fn test_cheri_macros() {
    let info = target(Arch::Riscv32, &["+xcheri"]);
    assert_eq!(info.capability_width(), Some(64));
    assert!(info.has_feature("xcheri"));

    let macros = defines(&info);
    let permissions = [
        ("__CHERI_CAP_PERMISSION_GLOBAL__", "1"),
        ("__CHERI_CAP_PERMISSION_PERMIT_EXECUTE__", "2"),
        ("__CHERI_CAP_PERMISSION_PERMIT_LOAD__", "4"),
        ("__CHERI_CAP_PERMISSION_PERMIT_STORE__", "8"),
        ("__CHERI_CAP_PERMISSION_PERMIT_LOAD_CAPABILITY__", "16"),
        ("__CHERI_CAP_PERMISSION_PERMIT_STORE_CAPABILITY__", "32"),
        ("__CHERI_CAP_PERMISSION_PERMIT_STORE_LOCAL__", "64"),
        ("__CHERI_CAP_PERMISSION_PERMIT_SEAL__", "128"),
        ("__CHERI_CAP_PERMISSION_PERMIT_CCALL__", "256"),
        ("__CHERI_CAP_PERMISSION_PERMIT_UNSEAL__", "512"),
        ("__CHERI_CAP_PERMISSION_ACCESS_SYSTEM_REGISTERS__", "1024"),
    ];
    for (name, value) in permissions {
        assert_eq!(macros.get(name), Some(value), "{name}");
    }
    assert_eq!(macros.get("__riscv_clen"), Some("64"));
    assert!(!macros.contains("__CHERI_CAPABILITY_TABLE__"));
    assert_eq!(macros.len(), BASE_MACROS.len() + permissions.len() + 1);

    let rv64 = defines(&target(Arch::Riscv64, &["+xcheri"]));
    assert_eq!(rv64.get("__riscv_clen"), Some("128"));
}

#[test]
fn test_capability_table_macro() {
    let build = |abi: &str, table: CapTableAbi| {
        let mut builder = TargetFeaturesBuilder::from_triple("riscv64-unknown-freebsd").unwrap();
        builder.abi(abi).cap_table_abi(table).configure(["+xcheri"]);
        defines(&builder.finalize())
    };

    assert_eq!(build("l64pc128", CapTableAbi::Plt).get("__CHERI_CAPABILITY_TABLE__"), Some("2"));
    assert_eq!(build("l64pc128", CapTableAbi::Pcrel).get("__CHERI_CAPABILITY_TABLE__"), Some("3"));
    assert_eq!(
        build("l64pc128", CapTableAbi::FunctionDescriptor).get("__CHERI_CAPABILITY_TABLE__"),
        Some("4")
    );
    assert!(!build("l64pc128", CapTableAbi::Legacy).contains("__CHERI_CAPABILITY_TABLE__"));
    // Hybrid ABI: pointers are integers, no capability table.
    assert!(!build("lp64", CapTableAbi::Pcrel).contains("__CHERI_CAPABILITY_TABLE__"));
}

#[test]
fn test_cap_table_without_xcheri() {
    let mut builder = TargetFeaturesBuilder::new(Arch::Riscv64);
    builder.abi("l64pc128").cap_table_abi(CapTableAbi::Pcrel);
    let macros = defines(&builder.finalize());
    assert!(!macros.contains("__CHERI_CAPABILITY_TABLE__"));
    assert!(!macros.contains("__riscv_clen"));
}

#[test]
fn test_finalized_target_is_shareable() {
    let info = std::sync::Arc::new(target(Arch::Riscv64, &["+m", "+xcheri"]));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let info = info.clone();
            std::thread::spawn(move || defines(&info).len())
        })
        .collect();
    let expected = defines(&info).len();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn test_register_tables() {
    let info = target(Arch::Riscv32, &[]);
    assert_eq!(info.gcc_reg_names().len(), 64);
    assert_eq!(info.gcc_reg_names()[0], "x0");
    assert_eq!(info.gcc_reg_names()[32], "c0");
    assert_eq!(info.gcc_reg_aliases().len(), 64);

    assert_eq!(canonical_register_name("ra"), Some("x1"));
    assert_eq!(canonical_register_name("cra"), Some("c1"));
    assert_eq!(canonical_register_name("ct6"), Some("c31"));
}

#[test]
fn test_constraint_ranges() {
    let simm12 = validate_asm_constraint('I').unwrap().immediate_range();
    assert!((-2048..=2047).all(|v| simm12.contains(v)));
    assert!(!simm12.contains(2048));
    assert!(!simm12.contains(-2049));

    let uimm5 = validate_asm_constraint('K').unwrap().immediate_range();
    assert!((0..=31).all(|v| uimm5.contains(v)));
    assert!(!uimm5.contains(-1));
    assert!(!uimm5.contains(32));

    let zero = validate_asm_constraint('J').unwrap().immediate_range();
    assert_eq!((zero.min, zero.max), (0, 0));

    assert_eq!(
        validate_asm_constraint('Y'),
        Err(ConstraintError::Unrecognized { constraint: 'Y' })
    );
}

#[test]
fn test_asm_statement_diagnostics() {
    let diagnostics = check_asm_operands(&[
        AsmOperand::new('I', Some(-2048)),
        AsmOperand::new('q', None),
        AsmOperand::new('J', Some(1)),
        AsmOperand::new('K', None),
    ]);

    let operands: Vec<_> = diagnostics.iter().map(|d| d.operand).collect();
    assert_eq!(operands, vec![1, 2, 3]);
    assert_eq!(diagnostics[0].to_string(), "operand 1: invalid input constraint 'q' in asm");
}
