mod common;

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use bascompile::codegen::{UndefinedLine, UnsupportedConstruct};
use bascompile::compile;
use bascompile::parse::SyntaxError;
use common::*;

#[test]
fn test_arithmetic_program() {
    let asm = assemble("10 A = 1\n20 B = 2\n30 C = A + B * 3\n40 PRINT C\n50 END\n");
    let lines = code(&asm);

    assert_eq!(
        between(&lines, "l30:", 0, "l40:"),
        [
            "ld   hl, vA",
            "call MOVFM",
            "call PUSHF",
            "ld   hl, vB",
            "call MOVFM",
            "call PUSHF",
            "ld   bc, $8240",
            "ld   de, $0000",
            "call MOVFR",
            "pop  bc",
            "pop  de",
            "call FMULT",
            "pop  bc",
            "pop  de",
            "call FADD",
            "ld   hl, vC",
            "call MOVMF",
        ]
    );
    assert_eq!(between(&lines, "l50:", 0, "end:"), ["jp   end"]);

    let cells: Vec<_> = lines
        .iter()
        .filter(|line| line.ends_with("defd 0"))
        .copied()
        .collect();
    assert_eq!(cells, ["vA: defd 0", "vB: defd 0", "vC: defd 0"]);
}

#[test]
fn test_explicit_let_program() {
    let source = "10 LET A=1\n20 LET B=2\n30 LET C=A+B\n40 PRINT C\n50 END\n";
    let program = bascompile::parse_source(None, source).unwrap();
    let names: Vec<_> = program.variables.iter().map(|v| v.name()).collect();
    assert_eq!(names, ["A", "B", "C"]);

    let asm = assemble(source);
    let lines = code(&asm);
    assert_eq!(lines.iter().filter(|l| **l == "call MOVMF").count(), 3);
    assert_eq!(
        between(&lines, "l40:", 0, "l50:"),
        [
            "ld   hl, vC",
            "call MOVFM",
            "call FOUT",
            "ld   hl, FBUFFR+1",
            "call STROUT",
            "call CRDO",
        ]
    );
}

#[test]
fn test_goto_skips_lines() {
    let asm = assemble("10 GOTO 30\n20 PRINT 1\n30 PRINT 2\n");
    let lines = code(&asm);
    assert_eq!(between(&lines, "l10:", 0, "l20:"), ["jp   l30"]);
    assert!(lines.contains(&"l30:"));
}

#[test]
fn test_chained_comparison() {
    let asm = assemble("10 A = 1 < 2 < 3\n");
    let lines = code(&asm);
    let compares = lines.iter().filter(|l| **l == "call FCOMP").count();
    assert_eq!(compares, 2);
    // the inner comparison finishes before 3 is loaded
    let inner = between(&lines, "call FCOMP", 0, "call FLOAT");
    assert!(inner.contains(&"r1:"));
    let rest = between(&lines, "call FLOAT", 0, "call FCOMP");
    assert_eq!(rest[0], "call PUSHF");
    assert_eq!(rest[1], "ld   bc, $8240");
}

#[test]
fn test_listing_layout() {
    let asm = assemble("10 A = 1\n");
    assert!(asm.starts_with("; ROM entry points\n"));
    assert!(asm.contains("    org $38E1\n"));
    let main = asm.find("main:").unwrap();
    let line = asm.find("l10:").unwrap();
    let exit = asm.find("end:").unwrap();
    let cell = asm.find("vA: defd 0").unwrap();
    assert!(main < line && line < exit && exit < cell);
    assert!(asm.ends_with("$00,$00,$00\n"));
}

#[test]
fn test_unknown_statement_is_rejected() {
    let e = compile(None, "10 A = 1\n20 FOO 3\n30 END\n").unwrap_err();
    let error = e.downcast_ref::<SyntaxError>().unwrap();
    assert_eq!(error.line, 2);
    assert_eq!(error.line_number, Some(20));
}

#[test]
fn test_goto_missing_line() {
    let e = compile(None, "10 A = 1\n20 GOTO 99\n").unwrap_err();
    let error = e.downcast_ref::<UndefinedLine>().unwrap();
    assert_eq!(error.line_number, 20);
    assert_eq!(error.target, 99);
}

#[test]
fn test_string_outside_print() {
    let e = compile(None, "10 A = \"TEXT\"\n").unwrap_err();
    let error = e.downcast_ref::<UnsupportedConstruct>().unwrap();
    assert_eq!(error.line_number, 10);

    let e = compile(None, "10 PRINT \"A\" + 1\n").unwrap_err();
    assert!(e.downcast_ref::<UnsupportedConstruct>().is_some());
}

#[test]
fn test_out_of_order_lines_keep_source_order() {
    let compilation = compile(None, "20 A = 1\n10 GOTO 20\n").unwrap();
    assert_eq!(compilation.warnings.len(), 1);
    let first = compilation.assembly.find("l20:").unwrap();
    let second = compilation.assembly.find("l10:").unwrap();
    assert!(first < second);
}

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("bascompile-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

#[test]
fn test_cli_writes_assembly() {
    let input = scratch("ok.bas");
    let output = scratch("ok.asm");
    fs::write(&input, "10 PRINT \"HELLO\"\n20 END\n").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_bascompile"))
        .arg(&input)
        .arg(&output)
        .status()
        .unwrap();

    assert!(status.success());
    let asm = fs::read_to_string(&output).unwrap();
    assert!(asm.contains("s0: db \"HELLO\",0"));
}

#[test]
fn test_cli_writes_nothing_on_error() {
    let input = scratch("bad.bas");
    let output = scratch("bad.asm");
    fs::write(&input, "10 A = 1\n20 FOO 3\n").unwrap();
    let _ = fs::remove_file(&output);

    let result = Command::new(env!("CARGO_BIN_EXE_bascompile"))
        .arg(&input)
        .arg(&output)
        .output()
        .unwrap();

    assert!(!result.status.success());
    assert!(!output.exists());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("[line 2]"), "{stderr}");
}

#[test]
fn test_cli_requires_two_paths() {
    let status = Command::new(env!("CARGO_BIN_EXE_bascompile"))
        .arg("only-one.bas")
        .status()
        .unwrap();
    assert!(!status.success());
}
