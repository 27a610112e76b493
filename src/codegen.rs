//! Lowers a parsed program to Z80 assembly for the ROM's float package.
//!
//! Every expression leaves its value in `FAC`. A binary operator evaluates
//! its left side, pushes `FAC`, evaluates the right side and pops the left
//! value into `BCDE` before calling the ROM routine that combines the two.

use std::collections::HashSet;

use miette::{Diagnostic, Error, NamedSource, SourceSpan};
use thiserror::Error;

use crate::{
    caq,
    mbf::Mbf32,
    parse::{Atom, BinaryOp, Expr, Line, Program, Statement, UnaryOp, Variable},
    rom::{FBUFFR, Routine},
};

/// Label every `END` jumps to.
pub const EXIT_LABEL: &str = "end";

#[derive(Error, Debug, Diagnostic)]
#[error("no code generation rule for {construct} in line {line_number}")]
#[diagnostic(
    code(bascompile::unsupported),
    help("strings can only be printed directly, as in PRINT \"TEXT\"")
)]
pub struct UnsupportedConstruct {
    #[source_code]
    src: NamedSource<String>,

    #[label("in this line")]
    span: SourceSpan,

    pub line_number: u16,
    pub construct: String,
}

#[derive(Error, Debug, Diagnostic)]
#[error("GOTO {target} in line {line_number} jumps to a line that does not exist")]
#[diagnostic(
    code(bascompile::undefined_line),
    help("GOTO can only target a line number the program defines")
)]
pub struct UndefinedLine {
    #[source_code]
    src: NamedSource<String>,

    #[label("in this line")]
    span: SourceSpan,

    pub line_number: u16,
    pub target: u16,
}

/// Label of the first instruction of a BASIC line.
pub fn line_label(number: u16) -> String {
    format!("l{number}")
}

pub fn generate(program: &Program<'_>) -> Result<String, Error> {
    Generator::new(program).generate()
}

pub struct Generator<'a, 'de> {
    program: &'a Program<'de>,
    defined: HashSet<u16>,
    out: String,
    strings: Vec<&'a str>,
    labels: usize,
    line: Option<&'a Line>,
}

impl<'a, 'de> Generator<'a, 'de> {
    pub fn new(program: &'a Program<'de>) -> Self {
        Self {
            program,
            defined: program.lines.iter().map(|line| line.number).collect(),
            out: String::new(),
            strings: Vec::new(),
            labels: 0,
            line: None,
        }
    }

    pub fn generate(mut self) -> Result<String, Error> {
        let program = self.program;
        self.out.push_str(&caq::header());

        for line in &program.lines {
            self.line = Some(line);
            self.out.push('\n');
            self.label(&line_label(line.number));
            for statement in &line.statements {
                self.out.push_str(&format!("    ; {statement}\n"));
                self.emit_statement(statement)?;
            }
        }

        self.out.push_str(caq::exit());
        self.out.push('\n');
        for variable in &program.variables {
            self.out.push_str(&format!("{}: defd 0\n", variable.label()));
        }
        for (index, text) in self.strings.iter().enumerate() {
            if text.is_empty() {
                self.out.push_str(&format!("s{index}: db 0\n"));
            } else {
                self.out.push_str(&format!("s{index}: db \"{text}\",0\n"));
            }
        }
        self.out.push_str(caq::trailer());
        Ok(self.out)
    }

    fn emit(&mut self, mnemonic: &str, operands: impl std::fmt::Display) {
        let instruction = format!("    {mnemonic:<4} {operands}");
        self.out.push_str(instruction.trim_end());
        self.out.push('\n');
    }

    fn call(&mut self, routine: Routine) {
        self.emit("call", routine);
    }

    fn label(&mut self, label: &str) {
        self.out.push_str(label);
        self.out.push_str(":\n");
    }

    fn fresh_label(&mut self) -> String {
        self.labels += 1;
        format!("r{}", self.labels)
    }

    fn intern(&mut self, text: &'a str) -> String {
        let index = match self.strings.iter().position(|s| *s == text) {
            Some(index) => index,
            None => {
                self.strings.push(text);
                self.strings.len() - 1
            }
        };
        format!("s{index}")
    }

    fn line_number(&self) -> u16 {
        self.line.map_or(0, |line| line.number)
    }

    fn line_span(&self) -> SourceSpan {
        self.line.map_or(SourceSpan::from(0..0), |line| line.span)
    }

    fn unsupported(&self, construct: impl Into<String>) -> Error {
        UnsupportedConstruct {
            src: self.program.source(),
            span: self.line_span(),
            line_number: self.line_number(),
            construct: construct.into(),
        }
        .into()
    }

    fn emit_statement(&mut self, statement: &'a Statement) -> Result<(), Error> {
        match statement {
            Statement::Let { target, value } => {
                self.emit_expression(value)?;
                self.store(target);
            }
            Statement::Goto(target) => {
                if !self.defined.contains(target) {
                    return Err(UndefinedLine {
                        src: self.program.source(),
                        span: self.line_span(),
                        line_number: self.line_number(),
                        target: *target,
                    }
                    .into());
                }
                self.emit("jp", line_label(*target));
            }
            Statement::Print(items) => {
                for item in items {
                    if let Expr::Atom(Atom::Str(text)) = item {
                        let label = self.intern(text);
                        self.emit("ld", format!("hl, {label}"));
                        self.call(Routine::Strout);
                        continue;
                    }
                    self.emit_expression(item)?;
                    self.call(Routine::Fout);
                    self.emit("ld", format!("hl, {}+1", FBUFFR.0));
                    self.call(Routine::Strout);
                }
                self.call(Routine::Crdo);
            }
            Statement::End => self.emit("jp", EXIT_LABEL),
            Statement::Rem(_) => {}
        }
        Ok(())
    }

    fn emit_expression(&mut self, expr: &Expr) -> Result<(), Error> {
        match expr {
            Expr::Atom(Atom::Number(value)) => {
                let mbf = Mbf32::try_from(*value)
                    .map_err(|e| self.unsupported(format!("the literal {value} ({e})")))?;
                self.emit("ld", format!("bc, ${:04X}", mbf.hi()));
                self.emit("ld", format!("de, ${:04X}", mbf.lo()));
                self.call(Routine::Movfr);
            }
            Expr::Atom(Atom::Var(variable)) => self.load(variable),
            Expr::Atom(Atom::Str(text)) => {
                return Err(self.unsupported(format!("the string \"{text}\" inside an expression")));
            }
            Expr::Unary(op, operand) => {
                self.emit_expression(operand)?;
                let routine = match op {
                    UnaryOp::Not => {
                        self.emit_complement();
                        return Ok(());
                    }
                    UnaryOp::Negate => Routine::Neg,
                    UnaryOp::Sin => Routine::Sin,
                    UnaryOp::Cos => Routine::Cos,
                    UnaryOp::Tan => Routine::Tan,
                    UnaryOp::Atn => Routine::Atn,
                    UnaryOp::Log => Routine::Log,
                    UnaryOp::Exp => Routine::Exp,
                    UnaryOp::Rnd => Routine::Rnd,
                    UnaryOp::Sqr => Routine::Sqr,
                    UnaryOp::Abs => Routine::Abs,
                    UnaryOp::Sgn => Routine::Sgn,
                    UnaryOp::Int => Routine::Int,
                };
                self.call(routine);
            }
            Expr::Binary(op, lhs, rhs) => match op {
                BinaryOp::Add => self.emit_arithmetic(Routine::Fadd, lhs, rhs)?,
                BinaryOp::Sub => self.emit_arithmetic(Routine::Fsub, lhs, rhs)?,
                BinaryOp::Mul => self.emit_arithmetic(Routine::Fmult, lhs, rhs)?,
                BinaryOp::Div => self.emit_arithmetic(Routine::Fdiv, lhs, rhs)?,
                BinaryOp::Pow => self.emit_arithmetic(Routine::Fpwr, lhs, rhs)?,
                BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge => self.emit_relation(*op, lhs, rhs)?,
                BinaryOp::And | BinaryOp::Or => self.emit_logical(*op, lhs, rhs)?,
            },
        }
        Ok(())
    }

    fn load(&mut self, variable: &Variable) {
        self.emit("ld", format!("hl, {}", variable.label()));
        self.call(Routine::Movfm);
    }

    fn store(&mut self, variable: &Variable) {
        self.emit("ld", format!("hl, {}", variable.label()));
        self.call(Routine::Movmf);
    }

    /// Left into ARG, right into FAC.
    fn emit_operands(&mut self, lhs: &Expr, rhs: &Expr) -> Result<(), Error> {
        self.emit_expression(lhs)?;
        self.call(Routine::Pushf);
        self.emit_expression(rhs)?;
        self.emit("pop", "bc");
        self.emit("pop", "de");
        Ok(())
    }

    fn emit_arithmetic(&mut self, routine: Routine, lhs: &Expr, rhs: &Expr) -> Result<(), Error> {
        self.emit_operands(lhs, rhs)?;
        self.call(routine);
        Ok(())
    }

    /// FCOMP leaves 1, 0 or -1 in A; one flag test turns that into -1 (true) or 0 (false).
    fn emit_relation(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<(), Error> {
        let (test, when_zero, otherwise) = match op {
            BinaryOp::Eq => ("or   a", -1, 0),
            BinaryOp::Ne => ("or   a", 0, -1),
            BinaryOp::Lt => ("cp   1", -1, 0),
            BinaryOp::Ge => ("cp   1", 0, -1),
            BinaryOp::Gt => ("cp   $FF", -1, 0),
            BinaryOp::Le => ("cp   $FF", 0, -1),
            op => return Err(self.unsupported(format!("`{op}` as a comparison"))),
        };
        self.emit_operands(lhs, rhs)?;
        self.call(Routine::Fcomp);
        let done = self.fresh_label();
        self.out.push_str(&format!("    {test}\n"));
        self.emit("ld", format!("a, {when_zero}"));
        self.emit("jp", format!("z, {done}"));
        self.emit("ld", format!("a, {otherwise}"));
        self.label(&done);
        self.call(Routine::Float);
        Ok(())
    }

    /// Both sides are truncated to 16-bit integers by FRCINT and combined bytewise.
    fn emit_logical(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<(), Error> {
        let mnemonic = match op {
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            op => return Err(self.unsupported(format!("`{op}` as a logical operator"))),
        };
        self.emit_expression(lhs)?;
        self.call(Routine::Frcint);
        self.emit("push", "de");
        self.emit_expression(rhs)?;
        self.call(Routine::Frcint);
        self.emit("pop", "bc");
        self.emit("ld", "a, c");
        self.emit(mnemonic, "e");
        self.emit("ld", "c, a");
        self.emit("ld", "a, b");
        self.emit(mnemonic, "d");
        self.call(Routine::Givint);
        Ok(())
    }

    /// NOT complements the 16-bit integer in DE against $FFFF.
    fn emit_complement(&mut self) {
        self.call(Routine::Frcint);
        self.emit("ld", "a, $FF");
        self.emit("xor", "e");
        self.emit("ld", "b, a");
        self.emit("ld", "a, $FF");
        self.emit("xor", "d");
        self.call(Routine::Floatb);
    }
}
