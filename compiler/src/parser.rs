//! Parser and code generator — one-pass recursive descent over the token
//! sequence.
//!
//! Each grammar production maps to a method that consumes tokens with one
//! token of lookahead and no backtracking. Semantic actions run as each
//! production is recognized:
//!
//! - While a declaration line is active, identifiers seen by the id-list
//!   production are inserted into the symbol table; everywhere else they
//!   are resolved against it.
//! - The expression grammar emits stack-machine instructions in postfix
//!   order. Precedence comes from the grammar nesting itself: term sits
//!   inside expression, so `*` and `/` bind tighter than `+` and `-`
//!   without any precedence table.
//! - Control flow emits `JUMPZ`/`JUMP` with placeholder operands whose
//!   addresses are pushed on a LIFO jump stack and patched once the target
//!   is known. Strict nesting means each construct pops exactly what it
//!   pushed.
//!
//! The first token that violates the grammar aborts the compilation with
//! a diagnostic naming the line and lexeme. Duplicate declarations and
//! use-before-declaration are equally fatal, so every error path here is
//! fail-fast.

use crate::bytecode::{InstructionTable, JumpStack, Op};
use crate::errors::CompileError;
use crate::symbols::{IdentKind, SymbolTable};
use crate::token::{Span, Token, TokenKind};

/// Output of a successful compilation.
#[derive(Debug)]
pub struct CompiledProgram {
    pub symbols: SymbolTable,
    pub instructions: InstructionTable,
}

pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    current: usize,
    symbols: SymbolTable,
    code: InstructionTable,
    jump_stack: JumpStack,
    /// Set while a declaration line is being parsed. Identifiers seen by
    /// the id-list production are inserted with this type instead of
    /// looked up.
    declaring: Option<IdentKind>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            current: 0,
            symbols: SymbolTable::new(),
            code: InstructionTable::new(),
            jump_stack: JumpStack::new(),
            declaring: None,
        }
    }

    /// Parse the whole token sequence and return the symbol and
    /// instruction tables.
    pub fn parse(mut self) -> Result<CompiledProgram, CompileError> {
        self.program()?;
        debug_assert!(self.jump_stack.is_empty(), "jump stack imbalance");
        Ok(CompiledProgram {
            symbols: self.symbols,
            instructions: self.code,
        })
    }

    // ── Program structure ────────────────────────────────────────────

    /// <program> ::= { <function-def> } # [ <decl-list> ] <stmt-list> #
    fn program(&mut self) -> Result<(), CompileError> {
        log::trace!("<Program>");
        while self.check_keyword("function") {
            self.function_definition()?;
        }
        self.expect_separator("#")?;
        self.opt_declaration_list()?;
        self.statement_list()?;
        self.expect_separator("#")?;
        if self.peek().is_some() {
            let token = self.advance().unwrap();
            return Err(self.syntax_error(&token, "end of input"));
        }
        Ok(())
    }

    /// <function-def> ::= function <id> ( [ <param-list> ] )
    ///                    [ <decl-list> ] <compound>
    ///
    /// The function name is not entered in the symbol table and no call
    /// or return linkage is emitted; parameters and local declarations
    /// share the one symbol table and body statements emit normally.
    fn function_definition(&mut self) -> Result<(), CompileError> {
        log::trace!("<Function Definition>");
        self.expect_keyword("function")?;
        self.expect_identifier()?;
        self.expect_separator("(")?;
        if !self.check_separator(")") {
            self.parameter_list()?;
        }
        self.expect_separator(")")?;
        self.opt_declaration_list()?;
        self.compound_statement()?;
        Ok(())
    }

    /// <param-list> ::= <ids> <qualifier> { , <ids> <qualifier> }
    ///
    /// The qualifier follows its identifiers, so the names are collected
    /// first and declared once the type is known.
    fn parameter_list(&mut self) -> Result<(), CompileError> {
        loop {
            let mut names = vec![self.expect_identifier()?];
            while self.check_separator(",") {
                self.advance();
                names.push(self.expect_identifier()?);
            }
            let kind = self.expect_qualifier()?;
            for name in &names {
                self.declare(name, kind)?;
            }
            if !self.match_separator(",") {
                break;
            }
        }
        Ok(())
    }

    // ── Declarations ─────────────────────────────────────────────────

    /// Zero or more `<qualifier> <ids> ;` lines.
    fn opt_declaration_list(&mut self) -> Result<(), CompileError> {
        while self.peek_qualifier().is_some() {
            self.declaration()?;
            self.expect_separator(";")?;
        }
        Ok(())
    }

    /// <declaration> ::= <qualifier> <ids>
    fn declaration(&mut self) -> Result<(), CompileError> {
        log::trace!("<Declaration>");
        let kind = self.expect_qualifier()?;
        self.declaring = Some(kind);
        self.id_list()?;
        self.declaring = None;
        Ok(())
    }

    /// <ids> ::= <identifier> { , <identifier> }
    ///
    /// In declaration context each identifier is inserted at the next
    /// free address; elsewhere each is resolved. Returns the addresses in
    /// source order.
    fn id_list(&mut self) -> Result<Vec<usize>, CompileError> {
        let mut addresses = vec![self.id()?];
        while self.match_separator(",") {
            addresses.push(self.id()?);
        }
        Ok(addresses)
    }

    fn id(&mut self) -> Result<usize, CompileError> {
        let token = self.expect_identifier()?;
        match self.declaring {
            Some(kind) => self.declare(&token, kind),
            None => self.lookup(&token).map(|(address, _)| address),
        }
    }

    // ── Statements ───────────────────────────────────────────────────

    /// <stmt-list> ::= <statement> { <statement> }
    fn statement_list(&mut self) -> Result<(), CompileError> {
        self.statement()?;
        while self.at_statement_start() {
            self.statement()?;
        }
        Ok(())
    }

    fn at_statement_start(&self) -> bool {
        match self.peek() {
            Some(token) => match token.kind {
                TokenKind::Identifier => true,
                TokenKind::Separator => token.lexeme == "{",
                TokenKind::Keyword => {
                    matches!(token.lexeme.as_str(), "if" | "ret" | "put" | "get" | "while")
                }
                _ => false,
            },
            None => false,
        }
    }

    fn statement(&mut self) -> Result<(), CompileError> {
        let Some(token) = self.peek() else {
            return Err(self.eof_error("a statement"));
        };
        let kind = token.kind;
        let lexeme = token.lexeme.clone();
        match kind {
            TokenKind::Separator if lexeme == "{" => self.compound_statement(),
            TokenKind::Identifier => self.assignment(),
            TokenKind::Keyword
                if matches!(lexeme.as_str(), "if" | "ret" | "put" | "get" | "while") =>
            {
                match lexeme.as_str() {
                    "if" => self.if_statement(),
                    "ret" => self.return_statement(),
                    "put" => self.print_statement(),
                    "get" => self.scan_statement(),
                    _ => self.while_statement(),
                }
            }
            _ => {
                let token = self.advance().unwrap();
                Err(self.syntax_error(&token, "a statement"))
            }
        }
    }

    /// <compound> ::= { <stmt-list> }
    fn compound_statement(&mut self) -> Result<(), CompileError> {
        log::trace!("<Compound>");
        self.expect_separator("{")?;
        self.statement_list()?;
        self.expect_separator("}")?;
        Ok(())
    }

    /// <assign> ::= <identifier> = <expression> ;
    ///
    /// The target is resolved before the expression is emitted, so an
    /// undeclared target fails before any code for the right-hand side.
    fn assignment(&mut self) -> Result<(), CompileError> {
        log::trace!("<Assign>");
        let target = self.expect_identifier()?;
        let (address, _) = self.lookup(&target)?;
        self.expect_operator("=")?;
        self.expression()?;
        self.code.emit(Op::Popm, address as i64);
        self.expect_separator(";")?;
        Ok(())
    }

    /// <if> ::= if ( <condition> ) <statement> [ else <statement> ] endif
    ///
    /// Without an else arm the condition's `JUMPZ` lands just past the
    /// controlled statement. With one, the true branch emits a `JUMP`
    /// over the else arm, the `JUMPZ` lands on the else arm's first
    /// instruction, and the `JUMP` is patched past it at `endif`.
    fn if_statement(&mut self) -> Result<(), CompileError> {
        log::trace!("<If>");
        self.expect_keyword("if")?;
        self.expect_separator("(")?;
        self.condition()?;
        self.expect_separator(")")?;
        self.statement()?;
        if self.match_keyword("else") {
            let skip = self.code.emit(Op::Jump, 0);
            let else_entry = self.code.next_address();
            self.pop_and_patch(else_entry);
            self.jump_stack.push(skip);
            self.statement()?;
            self.expect_keyword("endif")?;
            let after = self.code.next_address();
            self.pop_and_patch(after);
        } else {
            self.expect_keyword("endif")?;
            let after = self.code.next_address();
            self.pop_and_patch(after);
        }
        Ok(())
    }

    /// <while> ::= while ( <condition> ) <statement>
    fn while_statement(&mut self) -> Result<(), CompileError> {
        log::trace!("<While>");
        self.expect_keyword("while")?;
        let entry = self.code.emit(Op::Label, 0);
        self.expect_separator("(")?;
        self.condition()?;
        self.expect_separator(")")?;
        self.statement()?;
        self.code.emit(Op::Jump, entry as i64);
        let exit = self.code.next_address();
        self.pop_and_patch(exit);
        Ok(())
    }

    /// <return> ::= ret ; | ret <expression> ;
    ///
    /// The expression's value is left on the stack; function linkage
    /// itself emits nothing.
    fn return_statement(&mut self) -> Result<(), CompileError> {
        log::trace!("<Return>");
        self.expect_keyword("ret")?;
        if !self.check_separator(";") {
            self.expression()?;
        }
        self.expect_separator(";")?;
        Ok(())
    }

    /// <print> ::= put ( <expression> ) ;
    fn print_statement(&mut self) -> Result<(), CompileError> {
        log::trace!("<Print>");
        self.expect_keyword("put")?;
        self.expect_separator("(")?;
        self.expression()?;
        self.code.emit(Op::Stdout, 0);
        self.expect_separator(")")?;
        self.expect_separator(";")?;
        Ok(())
    }

    /// <scan> ::= get ( <ids> ) ;
    ///
    /// Each target reads one value: `STDIN` then `POPM` per identifier.
    fn scan_statement(&mut self) -> Result<(), CompileError> {
        log::trace!("<Scan>");
        self.expect_keyword("get")?;
        self.expect_separator("(")?;
        let addresses = self.id_list()?;
        for address in addresses {
            self.code.emit(Op::Stdin, 0);
            self.code.emit(Op::Popm, address as i64);
        }
        self.expect_separator(")")?;
        self.expect_separator(";")?;
        Ok(())
    }

    // ── Conditions and expressions ───────────────────────────────────

    /// <condition> ::= <expression> <relop> <expression>
    ///
    /// Emits both operands, the comparison opcode, then `JUMPZ 0` whose
    /// address goes on the jump stack for the enclosing construct.
    fn condition(&mut self) -> Result<(), CompileError> {
        log::trace!("<Condition>");
        self.expression()?;
        let op = self.relop()?;
        self.expression()?;
        self.code.emit(op, 0);
        let jumpz = self.code.emit(Op::Jumpz, 0);
        self.jump_stack.push(jumpz);
        Ok(())
    }

    fn relop(&mut self) -> Result<Op, CompileError> {
        let token = self.advance_expecting("a relational operator")?;
        if token.kind == TokenKind::Operator {
            let op = match token.lexeme.as_str() {
                "<" => Some(Op::Les),
                ">" => Some(Op::Grt),
                "==" => Some(Op::Equ),
                "!=" => Some(Op::Neq),
                "<=" => Some(Op::Leq),
                "=>" => Some(Op::Geq),
                _ => None,
            };
            if let Some(op) = op {
                return Ok(op);
            }
        }
        Err(self.syntax_error(&token, "a relational operator"))
    }

    /// <expression> ::= <term> { (+|-) <term> }
    fn expression(&mut self) -> Result<(), CompileError> {
        log::trace!("<Expression>");
        self.term()?;
        loop {
            if self.match_operator("+") {
                self.term()?;
                self.code.emit(Op::Add, 0);
            } else if self.match_operator("-") {
                self.term()?;
                self.code.emit(Op::Sub, 0);
            } else {
                break;
            }
        }
        Ok(())
    }

    /// <term> ::= <factor> { (*|/) <factor> }
    fn term(&mut self) -> Result<(), CompileError> {
        self.factor()?;
        loop {
            if self.match_operator("*") {
                self.factor()?;
                self.code.emit(Op::Mul, 0);
            } else if self.match_operator("/") {
                self.factor()?;
                self.code.emit(Op::Div, 0);
            } else {
                break;
            }
        }
        Ok(())
    }

    /// <factor> ::= [ - ] <primary>
    fn factor(&mut self) -> Result<(), CompileError> {
        if self.match_operator("-") {
            self.primary()?;
            // Negate the value on top of the stack.
            self.code.emit(Op::Pushi, -1);
            self.code.emit(Op::Mul, 0);
        } else {
            self.primary()?;
        }
        Ok(())
    }

    /// <primary> ::= <identifier> [ ( <ids> ) ] | <integer> | <real>
    ///             | ( <expression> ) | true | false
    fn primary(&mut self) -> Result<(), CompileError> {
        let token = self.advance_expecting("an expression")?;
        match token.kind {
            TokenKind::Identifier => {
                if self.check_separator("(") {
                    // Call-shaped primary: arguments are resolved but no
                    // call instruction exists in the target machine.
                    self.advance();
                    self.id_list()?;
                    self.expect_separator(")")?;
                } else {
                    let (address, _) = self.lookup(&token)?;
                    self.code.emit(Op::Pushm, address as i64);
                }
            }
            TokenKind::Integer => {
                let value: i64 = token.lexeme.parse().map_err(|_| {
                    self.semantic_error(&token, "integer literal out of range", "too large")
                })?;
                self.code.emit(Op::Pushi, value);
            }
            TokenKind::Real => {
                // The target machine is integer-valued; truncate.
                let value: f64 = token.lexeme.parse().map_err(|_| {
                    self.semantic_error(&token, "real literal out of range", "too large")
                })?;
                self.code.emit(Op::Pushi, value as i64);
            }
            TokenKind::Keyword if token.lexeme == "true" => {
                self.code.emit(Op::Pushi, 1);
            }
            TokenKind::Keyword if token.lexeme == "false" => {
                self.code.emit(Op::Pushi, 0);
            }
            TokenKind::Separator if token.lexeme == "(" => {
                self.expression()?;
                self.expect_separator(")")?;
            }
            _ => return Err(self.syntax_error(&token, "an expression")),
        }
        Ok(())
    }

    // ── Symbol-table actions ─────────────────────────────────────────

    fn declare(&mut self, token: &Token, kind: IdentKind) -> Result<usize, CompileError> {
        self.symbols.declare(&token.lexeme, kind).map_err(|e| {
            self.semantic_error(token, e.to_string(), "already declared")
        })
    }

    fn lookup(&self, token: &Token) -> Result<(usize, IdentKind), CompileError> {
        self.symbols
            .lookup(&token.lexeme)
            .map(|entry| (entry.address, entry.kind))
            .map_err(|e| self.semantic_error(token, e.to_string(), "not declared"))
    }

    // ── Backpatching ─────────────────────────────────────────────────

    /// Pop the most recent pending jump and patch its operand to `target`.
    /// An empty stack here is a compiler defect, not a user error: every
    /// construct pushes before parsing its body and pops after.
    fn pop_and_patch(&mut self, target: usize) {
        let address = self.jump_stack.pop().expect("jump stack imbalance");
        self.code.patch(address, target as i64);
    }

    // ── Token-cursor helpers ─────────────────────────────────────────

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.current).cloned();
        if token.is_some() {
            self.current += 1;
        }
        token
    }

    fn advance_expecting(&mut self, expected: &str) -> Result<Token, CompileError> {
        self.advance().ok_or_else(|| self.eof_error(expected))
    }

    fn check_separator(&self, lexeme: &str) -> bool {
        self.peek().is_some_and(|t| t.is_separator(lexeme))
    }

    fn check_keyword(&self, lexeme: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(lexeme))
    }

    fn match_separator(&mut self, lexeme: &str) -> bool {
        if self.check_separator(lexeme) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn match_operator(&mut self, lexeme: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_operator(lexeme)) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn match_keyword(&mut self, lexeme: &str) -> bool {
        if self.check_keyword(lexeme) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn expect_separator(&mut self, lexeme: &str) -> Result<Token, CompileError> {
        let token = self.advance_expecting(&format!("'{}'", lexeme))?;
        if token.is_separator(lexeme) {
            Ok(token)
        } else {
            Err(self.syntax_error(&token, &format!("'{}'", lexeme)))
        }
    }

    fn expect_operator(&mut self, lexeme: &str) -> Result<Token, CompileError> {
        let token = self.advance_expecting(&format!("'{}'", lexeme))?;
        if token.is_operator(lexeme) {
            Ok(token)
        } else {
            Err(self.syntax_error(&token, &format!("'{}'", lexeme)))
        }
    }

    fn expect_keyword(&mut self, lexeme: &str) -> Result<Token, CompileError> {
        let token = self.advance_expecting(&format!("'{}'", lexeme))?;
        if token.is_keyword(lexeme) {
            Ok(token)
        } else {
            Err(self.syntax_error(&token, &format!("'{}'", lexeme)))
        }
    }

    fn expect_identifier(&mut self) -> Result<Token, CompileError> {
        let token = self.advance_expecting("an identifier")?;
        if token.kind == TokenKind::Identifier {
            Ok(token)
        } else {
            Err(self.syntax_error(&token, "an identifier"))
        }
    }

    fn peek_qualifier(&self) -> Option<IdentKind> {
        let token = self.peek()?;
        if token.kind != TokenKind::Keyword {
            return None;
        }
        IdentKind::from_qualifier(&token.lexeme)
    }

    fn expect_qualifier(&mut self) -> Result<IdentKind, CompileError> {
        let token = self.advance_expecting("a type qualifier")?;
        if token.kind == TokenKind::Keyword {
            if let Some(kind) = IdentKind::from_qualifier(&token.lexeme) {
                return Ok(kind);
            }
        }
        Err(self.syntax_error(&token, "a type qualifier"))
    }

    // ── Error construction ───────────────────────────────────────────

    fn syntax_error(&self, token: &Token, expected: &str) -> CompileError {
        CompileError::new(
            format!(
                "syntax error on line {}: unexpected '{}'",
                token.line, token.lexeme
            ),
            self.source,
            token.span,
            format!("expected {}", expected),
        )
    }

    fn semantic_error(
        &self,
        token: &Token,
        message: impl std::fmt::Display,
        label: &str,
    ) -> CompileError {
        CompileError::new(
            format!("semantic error on line {}: {}", token.line, message),
            self.source,
            token.span,
            label,
        )
    }

    fn eof_error(&self, expected: &str) -> CompileError {
        let end = self.source.len();
        CompileError::new(
            format!("syntax error: unexpected end of input, expected {}", expected),
            self.source,
            Span::new(end.saturating_sub(1), end),
            format!("expected {}", expected),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::symbols::BASE_ADDRESS;

    fn compile(source: &str) -> CompiledProgram {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.scan_tokens();
        assert!(lexer.errors().is_empty(), "lex errors: {:?}", lexer.errors());
        Parser::new(source, tokens)
            .parse()
            .expect("compilation failed")
    }

    fn compile_err(source: &str) -> CompileError {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.scan_tokens();
        Parser::new(source, tokens)
            .parse()
            .expect_err("compilation unexpectedly succeeded")
    }

    fn emitted(program: &CompiledProgram) -> Vec<(Op, i64)> {
        program
            .instructions
            .instructions()
            .iter()
            .map(|i| (i.op, i.operand))
            .collect()
    }

    #[test]
    fn test_symbol_addresses_in_declaration_order() {
        let program = compile("# integer a, b; real c; a = 1; #");
        let entries = program.symbols.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(
            (entries[0].identifier.as_str(), entries[0].address),
            ("a", 7000)
        );
        assert_eq!(
            (entries[1].identifier.as_str(), entries[1].address),
            ("b", 7001)
        );
        assert_eq!(
            (entries[2].identifier.as_str(), entries[2].address),
            ("c", 7002)
        );
        assert_eq!(entries[2].kind, IdentKind::Real);
    }

    #[test]
    fn test_arithmetic_emitted_in_postfix_order() {
        let program = compile("# integer x; x = 1 + 2 * 3; #");
        assert_eq!(
            emitted(&program),
            vec![
                (Op::Pushi, 1),
                (Op::Pushi, 2),
                (Op::Pushi, 3),
                (Op::Mul, 0),
                (Op::Add, 0),
                (Op::Popm, BASE_ADDRESS as i64),
            ]
        );
    }

    #[test]
    fn test_parentheses_override_grammar_precedence() {
        let program = compile("# integer x; x = (1 + 2) * 3; #");
        assert_eq!(
            emitted(&program),
            vec![
                (Op::Pushi, 1),
                (Op::Pushi, 2),
                (Op::Add, 0),
                (Op::Pushi, 3),
                (Op::Mul, 0),
                (Op::Popm, BASE_ADDRESS as i64),
            ]
        );
    }

    #[test]
    fn test_unary_minus_negates() {
        let program = compile("# integer x; x = -x; #");
        assert_eq!(
            emitted(&program),
            vec![
                (Op::Pushm, 7000),
                (Op::Pushi, -1),
                (Op::Mul, 0),
                (Op::Popm, 7000),
            ]
        );
    }

    #[test]
    fn test_bool_literals_push_one_and_zero() {
        let program = compile("# bool b; b = true; b = false; #");
        assert_eq!(
            emitted(&program),
            vec![
                (Op::Pushi, 1),
                (Op::Popm, 7000),
                (Op::Pushi, 0),
                (Op::Popm, 7000),
            ]
        );
    }

    #[test]
    fn test_if_backpatches_to_after_statement() {
        let program = compile("# integer x, y; if (x < 1) y = 2; endif #");
        // 1 PUSHM x, 2 PUSHI 1, 3 LES, 4 JUMPZ, 5 PUSHI 2, 6 POPM y
        assert_eq!(
            emitted(&program),
            vec![
                (Op::Pushm, 7000),
                (Op::Pushi, 1),
                (Op::Les, 0),
                (Op::Jumpz, 7),
                (Op::Pushi, 2),
                (Op::Popm, 7001),
            ]
        );
    }

    #[test]
    fn test_if_else_true_branch_jumps_over_else_arm() {
        let program = compile("# integer x, y; if (x < 1) y = 2; else y = 3; endif #");
        // 1 PUSHM, 2 PUSHI, 3 LES, 4 JUMPZ->8, 5 PUSHI 2, 6 POPM,
        // 7 JUMP->10, 8 PUSHI 3, 9 POPM
        assert_eq!(
            emitted(&program),
            vec![
                (Op::Pushm, 7000),
                (Op::Pushi, 1),
                (Op::Les, 0),
                (Op::Jumpz, 8),
                (Op::Pushi, 2),
                (Op::Popm, 7001),
                (Op::Jump, 10),
                (Op::Pushi, 3),
                (Op::Popm, 7001),
            ]
        );
    }

    #[test]
    fn test_while_emits_label_back_edge_and_exit_patch() {
        let program = compile("# integer x; while (x < 10) x = x + 1; #");
        // 1 LABEL, 2 PUSHM, 3 PUSHI 10, 4 LES, 5 JUMPZ->11,
        // 6 PUSHM, 7 PUSHI 1, 8 ADD, 9 POPM, 10 JUMP->1
        assert_eq!(
            emitted(&program),
            vec![
                (Op::Label, 0),
                (Op::Pushm, 7000),
                (Op::Pushi, 10),
                (Op::Les, 0),
                (Op::Jumpz, 11),
                (Op::Pushm, 7000),
                (Op::Pushi, 1),
                (Op::Add, 0),
                (Op::Popm, 7000),
                (Op::Jump, 1),
            ]
        );
    }

    #[test]
    fn test_nested_while_if_patches_in_nesting_order() {
        let program = compile(
            "# integer i, x;\n\
             while (i < 3) {\n\
                 if (x < 5) x = x + 1; endif\n\
                 i = i + 1;\n\
             }\n\
             #",
        );
        let code = emitted(&program);
        // Outer JUMPZ exits past the whole loop; inner JUMPZ exits the if
        // only. Find them in emission order.
        let jumpzs: Vec<(usize, i64)> = code
            .iter()
            .enumerate()
            .filter(|(_, (op, _))| *op == Op::Jumpz)
            .map(|(i, (_, operand))| (i + 1, *operand))
            .collect();
        assert_eq!(jumpzs.len(), 2);
        let (outer_addr, outer_target) = jumpzs[0];
        let (inner_addr, inner_target) = jumpzs[1];
        assert!(outer_target as usize > inner_target as usize);
        assert_eq!(outer_target as usize, code.len() + 1);
        assert!(inner_addr > outer_addr);
        // The inner if exits onto the i = i + 1 code, inside the loop.
        assert!((inner_target as usize) < code.len());
    }

    #[test]
    fn test_put_emits_stdout_after_expression() {
        let program = compile("# integer x; put (x + 1); #");
        assert_eq!(
            emitted(&program),
            vec![
                (Op::Pushm, 7000),
                (Op::Pushi, 1),
                (Op::Add, 0),
                (Op::Stdout, 0),
            ]
        );
    }

    #[test]
    fn test_get_reads_each_target_in_order() {
        let program = compile("# integer x, y; get (x, y); #");
        assert_eq!(
            emitted(&program),
            vec![
                (Op::Stdin, 0),
                (Op::Popm, 7000),
                (Op::Stdin, 0),
                (Op::Popm, 7001),
            ]
        );
    }

    #[test]
    fn test_relop_spellings() {
        let program = compile("# integer x; while (x => 0) x = x - 1; #");
        assert!(emitted(&program).iter().any(|(op, _)| *op == Op::Geq));

        let program = compile("# integer x; while (x != 0) x = x - 1; #");
        assert!(emitted(&program).iter().any(|(op, _)| *op == Op::Neq));
    }

    #[test]
    fn test_function_definitions_parse_and_declare() {
        let program = compile(
            "function add(a, b integer)\n\
             integer c;\n\
             { c = a + b; ret c; }\n\
             # integer x; x = 1; #",
        );
        let entries = program.symbols.entries();
        let names: Vec<&str> = entries.iter().map(|e| e.identifier.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "x"]);
        // Body statements emit through the shared instruction table.
        assert!(emitted(&program).contains(&(Op::Popm, 7002)));
    }

    #[test]
    fn test_missing_terminator_is_fatal() {
        let err = compile_err("# integer x; x = 1;");
        assert!(err.message.contains("syntax error"), "{}", err.message);
    }

    #[test]
    fn test_trailing_tokens_are_fatal() {
        let err = compile_err("# integer x; x = 1; # x");
        assert!(err.label.contains("end of input"), "{}", err.label);
    }

    #[test]
    fn test_duplicate_declaration_is_fatal() {
        let err = compile_err("# integer x; real x; x = 1; #");
        assert!(err.message.contains("already declared"), "{}", err.message);
    }

    #[test]
    fn test_use_before_declaration_is_fatal() {
        let err = compile_err("# integer x; y = 1; #");
        assert!(
            err.message.contains("used before declaration"),
            "{}",
            err.message
        );
    }

    #[test]
    fn test_empty_statement_list_is_fatal() {
        let err = compile_err("# #");
        assert!(err.label.contains("statement"), "{}", err.label);
    }

    #[test]
    fn test_error_names_line_and_lexeme() {
        let err = compile_err("# integer x;\nx = ;\n#");
        assert!(err.message.contains("line 2"), "{}", err.message);
        assert!(err.message.contains("';'"), "{}", err.message);
    }
}
