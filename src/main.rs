use std::fs;
use std::path::PathBuf;

use bascompile::codegen::{UndefinedLine, UnsupportedConstruct};
use bascompile::lex::{SingleTokenError, StringTerminationError};
use bascompile::parse::SyntaxError;
use clap::Parser;
use miette::IntoDiagnostic;
use miette::WrapErr;

/// Compile a line-numbered BASIC program into Z80 assembly for the Aquarius.
#[derive(Parser, Debug)]
struct Args {
    /// BASIC source to read
    input: PathBuf,
    /// Assembly file to write
    output: PathBuf,
}

fn main() -> miette::Result<()> {
    let args = Args::parse();

    let file_contents = fs::read_to_string(&args.input)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading `{}` failed", args.input.display()))?;

    let compilation = match bascompile::compile(args.input.to_str(), &file_contents) {
        Ok(compilation) => compilation,
        Err(e) => {
            if let Some(single_token_error) = e.downcast_ref::<SingleTokenError>() {
                eprintln!(
                    "[line {}] Error: Unexpected character: {}",
                    single_token_error.line(),
                    single_token_error.token
                );
            } else if let Some(string_termination_error) =
                e.downcast_ref::<StringTerminationError>()
            {
                eprintln!(
                    "[line {}] Error: Unterminated string",
                    string_termination_error.line()
                );
            } else if let Some(syntax_error) = e.downcast_ref::<SyntaxError>() {
                eprintln!("[line {}] Error: {}", syntax_error.line, syntax_error.message);
            } else if let Some(undefined_line) = e.downcast_ref::<UndefinedLine>() {
                eprintln!(
                    "[line {}] Error: Undefined line {}",
                    undefined_line.line_number, undefined_line.target
                );
            } else if let Some(unsupported) = e.downcast_ref::<UnsupportedConstruct>() {
                eprintln!(
                    "[line {}] Error: Unsupported {}",
                    unsupported.line_number, unsupported.construct
                );
            } else {
                return Err(e);
            }
            eprintln!("{e:?}");

            std::process::exit(65);
        }
    };

    for warning in compilation.warnings {
        eprintln!("{:?}", miette::Report::new(warning));
    }

    fs::write(&args.output, compilation.assembly)
        .into_diagnostic()
        .wrap_err_with(|| format!("writing `{}` failed", args.output.display()))?;
    Ok(())
}
