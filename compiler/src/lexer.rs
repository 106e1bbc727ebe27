//! Lexer — tokenizes cleaned Rat23F source with error recovery.
//!
//! The scanner walks the source left to right with a single read cursor
//! and dispatches on the current character:
//!
//! - Letter: run the identifier machine, then reclassify exact keyword
//!   matches.
//! - Digit: try the real machine first; on reject, rewind and retry as an
//!   integer. The longer, more specific pattern wins, and the poison
//!   states make a malformed numeral one rejected lexeme.
//! - Otherwise: try a two-character operator (one character of peek), then
//!   a one-character operator, then a separator.
//!
//! Every machine run is maximal munch: it consumes while a transition
//! exists and stops at the first character with none, which is then left
//! for the next dispatch. Lexical errors are non-fatal: an unrecognized
//! run becomes an `Unrecognized` token, an error line is recorded, and
//! scanning continues at the next character.

use crate::dfsm::{classify, Dfsm, IDENTIFIER, INTEGER, REAL, TRAP_STATE};
use crate::token::{self, Span, Token, TokenKind};

/// Safety bound on a single machine run. A well-formed table never gets
/// near it; it exists so a bad table cannot loop forever.
const MAX_MACHINE_STEPS: usize = 500;

pub struct Lexer<'src> {
    source: &'src str,
    chars: Vec<char>,
    start: usize,      // Start of current token (byte offset)
    start_line: usize, // Line the current token began on
    current: usize,    // Current position (char index)
    byte_pos: usize,   // Current byte position
    line: usize,
    tokens: Vec<Token>,
    errors: Vec<String>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            start: 0,
            start_line: 1,
            current: 0,
            byte_pos: 0,
            line: 1,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Scan the whole source into an ordered token sequence.
    pub fn scan_tokens(&mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.byte_pos;
            self.start_line = self.line;
            self.scan_token();
        }
        self.tokens.clone()
    }

    /// Lexical error lines recorded during scanning. Non-fatal.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    fn scan_token(&mut self) {
        let c = self.peek();
        match c {
            ' ' | '\t' | '\r' | '\n' => {
                self.advance();
            }
            c if c.is_ascii_alphabetic() => self.identifier(),
            c if c.is_ascii_digit() => self.number(),
            _ => self.operator_or_separator(),
        }
    }

    // ── Machine-driven scanners ──────────────────────────────────────

    fn identifier(&mut self) {
        let state = self.run_machine(&IDENTIFIER);
        if !IDENTIFIER.is_accepting(state) {
            self.unrecognized();
            return;
        }
        let lexeme = &self.source[self.start..self.byte_pos];
        let kind = if token::is_keyword(lexeme) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        self.add_token(kind);
    }

    fn number(&mut self) {
        // Real first; if the run rejects, rewind and retry as an integer.
        let bookmark = (self.current, self.byte_pos);
        let state = self.run_machine(&REAL);
        if REAL.is_accepting(state) {
            self.add_token(TokenKind::Real);
            return;
        }
        (self.current, self.byte_pos) = bookmark;

        let state = self.run_machine(&INTEGER);
        if INTEGER.is_accepting(state) {
            self.add_token(TokenKind::Integer);
        } else {
            // Both machines ended in their poison states: the whole
            // malformed run is one rejected lexeme.
            self.unrecognized();
        }
    }

    /// Drive `machine` from its initial state with maximal munch. The
    /// character that traps the machine, or has no transition, is not
    /// consumed. Returns the final state.
    fn run_machine(&mut self, machine: &Dfsm) -> usize {
        let mut state = machine.initial;
        for _ in 0..MAX_MACHINE_STEPS {
            if self.is_at_end() {
                break;
            }
            let class = classify(self.peek());
            match machine.step(state, class) {
                Some(next) if next != TRAP_STATE => {
                    log::trace!("state {} --{:?}--> {}", state, class, next);
                    state = next;
                    self.advance();
                }
                _ => break,
            }
        }
        state
    }

    // ── Operators and separators ─────────────────────────────────────

    fn operator_or_separator(&mut self) {
        let c = self.advance();

        // Two-character operators first, so "<=" never splits into
        // '<' followed by '='.
        if !self.is_at_end() {
            let pair: String = [c, self.peek()].iter().collect();
            if token::is_operator(&pair) {
                self.advance();
                self.add_token(TokenKind::Operator);
                return;
            }
        }

        let single = c.to_string();
        if token::is_operator(&single) {
            self.add_token(TokenKind::Operator);
        } else if token::is_separator(&single) {
            self.add_token(TokenKind::Separator);
        } else {
            self.unrecognized();
        }
    }

    /// Record the consumed run as an `Unrecognized` token and keep going.
    fn unrecognized(&mut self) {
        let lexeme = &self.source[self.start..self.byte_pos];
        self.errors.push(format!(
            "unrecognized token \"{}\" on line {}",
            lexeme, self.start_line
        ));
        self.add_token(TokenKind::Unrecognized);
    }

    // ── Character-level helpers ──────────────────────────────────────

    fn advance(&mut self) -> char {
        let c = self.chars[self.current];
        self.current += 1;
        self.byte_pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        c
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.chars[self.current]
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    fn add_token(&mut self, kind: TokenKind) {
        let lexeme = &self.source[self.start..self.byte_pos];
        self.tokens.push(Token::new(
            kind,
            lexeme,
            self.start_line,
            Span::new(self.start, self.byte_pos),
        ));
    }
}
