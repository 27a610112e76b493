use miette::Error;

pub mod caq;
pub mod codegen;
pub mod lex;
pub mod mbf;
pub mod parse;
pub mod rom;

pub use codegen::Generator;
pub use lex::Lexer;
pub use parse::{Parser, Program};

use parse::LineOrderWarning;

/// Assembly for a whole program plus the warnings raised while reading it.
#[derive(Debug)]
pub struct Compilation {
    pub assembly: String,
    pub warnings: Vec<LineOrderWarning>,
}

pub fn parse_source<'de>(filename: Option<&'de str>, source: &'de str) -> Result<Program<'de>, Error> {
    let tokens = lex::tokenize(filename, source)?;
    Parser::new(filename, source, tokens).parse()
}

/// Runs every stage; nothing is produced unless all of them succeed.
pub fn compile(filename: Option<&str>, source: &str) -> Result<Compilation, Error> {
    let program = parse_source(filename, source)?;
    let assembly = codegen::generate(&program)?;
    Ok(Compilation {
        assembly,
        warnings: program.warnings,
    })
}
