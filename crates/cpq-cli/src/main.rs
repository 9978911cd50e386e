use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use owo_colors::OwoColorize;

use cpq_lexer::Lexer;
use cpq_parser::Parser as CplParser;
use cpq_quad::{resolve_labels, Opcode};
use cpq_syntax::error::ParseError;

#[derive(Parser, Debug)]
#[command(name = "cpq", about = "Compile a CPL source file to QUAD code")]
struct Cli {
    /// CPL source file; must have the .ou extension
    input: PathBuf,
}

/// Print a parse error with the offending source line and a caret under
/// the reported column.
fn render_parse_error(source: &str, error: &ParseError) {
    eprintln!("{}: {}", "ParseError".red().bold(), error);
    let position = error.position;
    if let Some(src_line) = source.lines().nth(position.line) {
        eprintln!("  {}", src_line.bright_black());
        let mut marker = String::new();
        marker.push_str(&" ".repeat(position.column));
        marker.push('^');
        eprintln!("  {}", marker.red());
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.input.extension().and_then(|ext| ext.to_str()) != Some("ou") {
        eprintln!("{}", "Input file extension must be .ou".red());
        return ExitCode::FAILURE;
    }

    let source = match fs::read_to_string(&cli.input) {
        Ok(source) => source,
        Err(_) => {
            eprintln!("{}", "Cannot open input CPL file.".red());
            return ExitCode::FAILURE;
        }
    };

    let mut lexer = Lexer::new(&source);
    let mut parser = CplParser::new(lexer.tokenize());
    let program = parser.parse_program();
    let parse_errors = parser.into_errors();
    for error in &parse_errors {
        render_parse_error(&source, error);
    }

    let (code, codegen_errors) = cpq_codegen::generate(&program);
    for error in &codegen_errors {
        eprintln!("{}: {}", "CodegenError".red().bold(), error);
    }

    // The .qud file is written only when both phases came back clean.
    if !parse_errors.is_empty() || !codegen_errors.is_empty() {
        return ExitCode::FAILURE;
    }

    let mut resolved = resolve_labels(code);
    resolved.emit(Opcode::Halt, vec![]);
    let output = format!("{resolved}{}\n", signature());

    let outfile = cli.input.with_extension("qud");
    if fs::write(&outfile, output).is_err() {
        eprintln!(
            "{}",
            format!("Cannot write output file {}", outfile.display()).red()
        );
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Trailing signature line, ignored by the QUAD machine once HALT ran.
fn signature() -> String {
    format!("cpq {}", env!("CARGO_PKG_VERSION"))
}
