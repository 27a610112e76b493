//! Entry points of the Aquarius system ROM used by generated code.
//!
//! `FAC` is the floating accumulator, `ARG` the `BCDE` register set.

use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Routine {
    Fadd,
    Fsub,
    Fmult,
    Fdiv,
    Fpwr,
    Neg,
    Log,
    Exp,
    Rnd,
    Sqr,
    Sin,
    Cos,
    Tan,
    Atn,
    Abs,
    Sgn,
    Int,
    Pushf,
    Movfm,
    Movfr,
    Movmf,
    Fcomp,
    Float,
    Frcint,
    Givint,
    Floatb,
    Fout,
    Strout,
    Crdo,
}

impl Routine {
    pub const ALL: [Routine; 29] = [
        Routine::Fadd,
        Routine::Fsub,
        Routine::Fmult,
        Routine::Fdiv,
        Routine::Fpwr,
        Routine::Neg,
        Routine::Log,
        Routine::Exp,
        Routine::Rnd,
        Routine::Sqr,
        Routine::Sin,
        Routine::Cos,
        Routine::Tan,
        Routine::Atn,
        Routine::Abs,
        Routine::Sgn,
        Routine::Int,
        Routine::Pushf,
        Routine::Movfm,
        Routine::Movfr,
        Routine::Movmf,
        Routine::Fcomp,
        Routine::Float,
        Routine::Frcint,
        Routine::Givint,
        Routine::Floatb,
        Routine::Fout,
        Routine::Strout,
        Routine::Crdo,
    ];

    /// Symbol the assembler knows the routine by.
    pub fn name(self) -> &'static str {
        match self {
            Routine::Fadd => "FADD",
            Routine::Fsub => "FSUB",
            Routine::Fmult => "FMULT",
            Routine::Fdiv => "FDIV",
            Routine::Fpwr => "FPWR",
            Routine::Neg => "NEG",
            Routine::Log => "LOG",
            Routine::Exp => "EXP",
            Routine::Rnd => "RND",
            Routine::Sqr => "SQR",
            Routine::Sin => "SIN",
            Routine::Cos => "COS",
            Routine::Tan => "TAN",
            Routine::Atn => "ATN",
            Routine::Abs => "ABS",
            Routine::Sgn => "SGN",
            Routine::Int => "INT",
            Routine::Pushf => "PUSHF",
            Routine::Movfm => "MOVFM",
            Routine::Movfr => "MOVFR",
            Routine::Movmf => "MOVMF",
            Routine::Fcomp => "FCOMP",
            Routine::Float => "FLOAT",
            Routine::Frcint => "FRCINT",
            Routine::Givint => "GIVINT",
            Routine::Floatb => "FLOATB",
            Routine::Fout => "FOUT",
            Routine::Strout => "STROUT",
            Routine::Crdo => "CRDO",
        }
    }

    pub fn address(self) -> u16 {
        match self {
            Routine::Fadd => 0x1261,
            Routine::Fsub => 0x125E,
            Routine::Fmult => 0x13CB,
            Routine::Fdiv => 0x142F,
            Routine::Fpwr => 0x1780,
            Routine::Neg => 0x150B,
            Routine::Log => 0x1385,
            Routine::Exp => 0x17CD,
            Routine::Rnd => 0x1866,
            Routine::Sqr => 0x1775,
            Routine::Sin => 0x18DD,
            Routine::Cos => 0x18D7,
            Routine::Tan => 0x1970,
            Routine::Atn => 0x1985,
            Routine::Abs => 0x1509,
            Routine::Sgn => 0x14F5,
            Routine::Int => 0x15B1,
            Routine::Pushf => 0x1513,
            Routine::Movfm => 0x1520,
            Routine::Movfr => 0x1523,
            Routine::Movmf => 0x153A,
            Routine::Fcomp => 0x155B,
            Routine::Float => 0x14F6,
            Routine::Frcint => 0x0682,
            Routine::Givint => 0x0B21,
            Routine::Floatb => 0x0B22,
            Routine::Fout => 0x1680,
            Routine::Strout => 0x0E9D,
            Routine::Crdo => 0x19EA,
        }
    }

    /// What the routine expects and leaves behind.
    pub fn contract(self) -> &'static str {
        match self {
            Routine::Fadd => "FAC = ARG + FAC",
            Routine::Fsub => "FAC = ARG - FAC",
            Routine::Fmult => "FAC = ARG * FAC",
            Routine::Fdiv => "FAC = ARG / FAC",
            Routine::Fpwr => "FAC = ARG ^ FAC",
            Routine::Neg => "FAC = -FAC",
            Routine::Log => "FAC = log(FAC)",
            Routine::Exp => "FAC = exp(FAC)",
            Routine::Rnd => "FAC = rnd(FAC)",
            Routine::Sqr => "FAC = sqrt(FAC)",
            Routine::Sin => "FAC = sin(FAC)",
            Routine::Cos => "FAC = cos(FAC)",
            Routine::Tan => "FAC = tan(FAC)",
            Routine::Atn => "FAC = atan(FAC)",
            Routine::Abs => "FAC = abs(FAC)",
            Routine::Sgn => "FAC = sgn(FAC)",
            Routine::Int => "FAC = int(FAC)",
            Routine::Pushf => "push FAC to stack",
            Routine::Movfm => "FAC = (hl)",
            Routine::Movfr => "FAC = ARG",
            Routine::Movmf => "(hl) = FAC",
            Routine::Fcomp => "A = 1 when ARG < FAC, 0 when ARG == FAC, -1 when ARG > FAC",
            Routine::Float => "FAC = float(signed A)",
            Routine::Frcint => "de = (int)FAC",
            Routine::Givint => "FAC = float(MSB:a LSB:c)",
            Routine::Floatb => "FAC = float(MSB:a LSB:b)",
            Routine::Fout => "convert FAC to text at FBUFFR+1",
            Routine::Strout => "print zero terminated text at (hl)",
            Routine::Crdo => "print carriage return",
        }
    }
}

impl Display for Routine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Text buffer `FOUT` writes into.
pub const FBUFFR: (&str, u16) = ("FBUFFR", 0x38E8);
