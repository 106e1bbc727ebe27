//! Plain-text listings of the compiler's outputs.
//!
//! Three renderers, one per output table. Each produces a small aligned
//! column report suitable for the console or an output file; none of them
//! inspect the source, only the finished tables.

use crate::bytecode::{InstructionTable, START_ADDRESS};
use crate::symbols::SymbolTable;
use crate::token::Token;

/// Two-column token listing in lexing order.
pub fn token_listing(tokens: &[Token]) -> String {
    let mut out = String::from("----------------------\n");
    out.push_str(&format!("{:<12}: [Lexeme]\n", "[Token]"));
    for token in tokens {
        out.push_str(&format!("{:<12}: {}\n", token.kind.to_string(), token.lexeme));
    }
    out.push_str("----------------------\n");
    out
}

/// Symbol listing in declaration order.
pub fn symbol_listing(symbols: &SymbolTable) -> String {
    let mut out = String::from("Symbol Table:\n");
    out.push_str(&format!(
        "{:<16}{:<10}{}\n",
        "Identifier", "Address", "Type"
    ));
    for entry in symbols.entries() {
        out.push_str(&format!(
            "{:<16}{:<10}{}\n",
            entry.identifier, entry.address, entry.kind
        ));
    }
    out
}

/// Instruction listing with 1-based sequential addresses. The operand
/// column is left blank for opcodes that take none.
pub fn instruction_listing(instructions: &InstructionTable) -> String {
    let mut out = String::from("Instruction Table:\n");
    out.push_str(&format!("{:<8}{:<8}{}\n", "Address", "Op", "Operand"));
    for (offset, instruction) in instructions.instructions().iter().enumerate() {
        let address = START_ADDRESS + offset;
        if instruction.op.has_operand() {
            out.push_str(&format!(
                "{:<8}{:<8}{}\n",
                address, instruction.op.to_string(), instruction.operand
            ));
        } else {
            out.push_str(&format!("{:<8}{}\n", address, instruction.op));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Op;
    use crate::lexer::Lexer;
    use crate::symbols::IdentKind;

    #[test]
    fn test_token_listing_rows() {
        let mut lexer = Lexer::new("integer a;");
        let tokens = lexer.scan_tokens();
        let listing = token_listing(&tokens);
        assert!(listing.contains("Keyword     : integer"));
        assert!(listing.contains("Identifier  : a"));
        assert!(listing.contains("Separator   : ;"));
    }

    #[test]
    fn test_symbol_listing_rows() {
        let mut symbols = SymbolTable::new();
        symbols.declare("count", IdentKind::Integer).unwrap();
        let listing = symbol_listing(&symbols);
        assert!(listing.contains("count"));
        assert!(listing.contains("7000"));
        assert!(listing.contains("integer"));
    }

    #[test]
    fn test_instruction_listing_blank_operand() {
        let mut instructions = InstructionTable::new();
        instructions.emit(Op::Pushi, 5);
        instructions.emit(Op::Add, 0);

        let listing = instruction_listing(&instructions);
        let lines: Vec<&str> = listing.lines().collect();
        assert!(lines[2].starts_with("1"));
        assert!(lines[2].contains("PUSHI"));
        assert!(lines[2].trim_end().ends_with("5"));
        // No filler operand shown for ADD.
        assert_eq!(lines[3].trim_end(), format!("{:<8}{}", 2, "ADD"));
    }
}
