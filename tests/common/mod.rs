#![allow(dead_code)]

use std::collections::HashSet;

pub fn assemble(source: &str) -> String {
    match bascompile::compile(None, source) {
        Ok(compilation) => compilation.assembly,
        Err(e) => panic!("{e:?}"),
    }
}

/// Trimmed code lines with comments and blank lines removed.
pub fn code(asm: &str) -> Vec<&str> {
    asm.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(';'))
        .collect()
}

/// Lines strictly between the `nth` (0-based) occurrence of `from` and the next `to`.
pub fn between<'a>(lines: &[&'a str], from: &str, nth: usize, to: &str) -> Vec<&'a str> {
    let start = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| **line == from)
        .nth(nth)
        .map(|(i, _)| i + 1)
        .unwrap_or_else(|| panic!("`{from}` #{nth} not found"));
    let len = lines[start..]
        .iter()
        .position(|line| *line == to)
        .unwrap_or_else(|| panic!("`{to}` not found after `{from}`"));
    lines[start..start + len].to_vec()
}

/// Every symbol the listing defines, either as `name:` or `name: equ`.
pub fn labels(asm: &str) -> HashSet<String> {
    asm.lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter_map(|word| word.strip_suffix(':'))
        .map(str::to_string)
        .collect()
}

/// The handful of 8-bit instructions the inline sequences use.
#[derive(Debug, Default, Clone)]
pub struct Registers {
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub zero: bool,
    pub stack: Vec<u16>,
}

impl Registers {
    fn get(&self, operand: &str) -> u8 {
        match operand {
            "a" => self.a,
            "b" => self.b,
            "c" => self.c,
            "d" => self.d,
            "e" => self.e,
            imm => match imm.strip_prefix('$') {
                Some(hex) => u8::from_str_radix(hex, 16).unwrap(),
                None => imm.parse::<i16>().unwrap() as u8,
            },
        }
    }

    fn set(&mut self, register: &str, value: u8) {
        match register {
            "a" => self.a = value,
            "b" => self.b = value,
            "c" => self.c = value,
            "d" => self.d = value,
            "e" => self.e = value,
            other => panic!("cannot load `{other}`"),
        }
    }

    pub fn run(&mut self, code: &[&str]) {
        let mut pc = 0;
        while pc < code.len() {
            let line = code[pc];
            pc += 1;
            if line.ends_with(':') {
                continue;
            }
            let (op, rest) = line.split_once(' ').unwrap_or((line, ""));
            let args: Vec<&str> = rest.split(',').map(str::trim).collect();
            match op {
                "ld" => {
                    let value = self.get(args[1]);
                    self.set(args[0], value);
                }
                "xor" => {
                    self.a ^= self.get(args[0]);
                    self.zero = self.a == 0;
                }
                "and" => {
                    self.a &= self.get(args[0]);
                    self.zero = self.a == 0;
                }
                "or" => {
                    self.a |= self.get(args[0]);
                    self.zero = self.a == 0;
                }
                "cp" => self.zero = self.a == self.get(args[0]),
                "push" if args[0] == "de" => {
                    self.stack.push(u16::from_be_bytes([self.d, self.e]))
                }
                "pop" if args[0] == "bc" => {
                    let [b, c] = self.stack.pop().unwrap().to_be_bytes();
                    self.b = b;
                    self.c = c;
                }
                "jp" if args[0] == "z" => {
                    if self.zero {
                        let target = format!("{}:", args[1]);
                        pc = code.iter().position(|l| *l == target).unwrap();
                    }
                }
                _ => panic!("cannot simulate `{line}`"),
            }
        }
    }
}
