//! Rat23F compiler CLI entry point.
//!
//! Usage:
//!   ratc lex <input.rat>       (dump the token listing)
//!   ratc check <input.rat>     (syntax check only)
//!   ratc compile <input.rat>   (full listings)

use rat_compiler::{
    lexer::Lexer,
    parser::{CompiledProgram, Parser},
    report, source,
    token::Token,
};
use std::{env, fs, process};

fn main() {
    simple_logger::SimpleLogger::new().env().init().unwrap();

    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: ratc <command> <file.rat>");
        eprintln!("Commands: lex, check, compile");
        process::exit(64);
    }

    let command = &args[1];
    let filename = &args[2];

    let raw = match fs::read_to_string(filename) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading '{}': {}", filename, e);
            process::exit(74);
        }
    };
    let cleaned = source::prepare(&raw);

    match command.as_str() {
        "lex" => {
            let tokens = lex_source(&cleaned);
            print!("{}", report::token_listing(&tokens));
        }
        "check" => {
            compile_source(&cleaned);
            println!("The code is syntactically correct.");
        }
        "compile" => {
            let tokens = lex_source(&cleaned);
            let program = parse_tokens(&cleaned, tokens.clone());
            println!("The code is syntactically correct.");
            print!("{}", report::token_listing(&tokens));
            print!("{}", report::symbol_listing(&program.symbols));
            print!("{}", report::instruction_listing(&program.instructions));
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            process::exit(64);
        }
    }
}

/// Lex the cleaned source. Lexical errors are reported but non-fatal;
/// unrecognized runs stay in the token sequence.
fn lex_source(cleaned: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(cleaned);
    let tokens = lexer.scan_tokens();
    for err in lexer.errors() {
        eprintln!("lexical error: {}", err);
    }
    tokens
}

/// Lex and parse, exiting with a rendered diagnostic on a fatal error.
fn compile_source(cleaned: &str) -> CompiledProgram {
    let tokens = lex_source(cleaned);
    parse_tokens(cleaned, tokens)
}

fn parse_tokens(cleaned: &str, tokens: Vec<Token>) -> CompiledProgram {
    match Parser::new(cleaned, tokens).parse() {
        Ok(program) => program,
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            process::exit(65);
        }
    }
}
