//! Deterministic finite-state machines backing the scanner.
//!
//! Each machine is a hand-built transition table: the nondeterministic
//! diagram for a token class was determinized by hand and each state given
//! a number. `table[state][column]` is the next state, with columns ordered
//! by `alphabet`. State 0 is always the trap state: entering it ends the
//! run, and the character that caused it is not consumed.
//!
//! The numeral machines additionally have a "poison" state that is not the
//! trap: it keeps consuming letters, digits, and periods so that a
//! malformed numeral like `123abc` is captured as one rejected lexeme
//! instead of being split into a number and an identifier.
//!
//! The tables are shared statics; the scanner owns the cursor and feeds
//! characters one at a time via [`Dfsm::step`].

/// Character classes a machine can consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolClass {
    Letter,
    Digit,
    Period,
    Other,
}

/// Classify a character for table lookup. Rat23F is ASCII-only, so
/// anything outside the ASCII letter/digit/period sets is `Other`.
pub fn classify(c: char) -> SymbolClass {
    if c.is_ascii_alphabetic() {
        SymbolClass::Letter
    } else if c.is_ascii_digit() {
        SymbolClass::Digit
    } else if c == '.' {
        SymbolClass::Period
    } else {
        SymbolClass::Other
    }
}

/// The unrecoverable state shared by every machine.
pub const TRAP_STATE: usize = 0;

/// A deterministic finite-state machine as an explicit transition table.
pub struct Dfsm {
    pub alphabet: &'static [SymbolClass],
    pub table: &'static [&'static [usize]],
    pub accepting: &'static [usize],
    pub initial: usize,
}

impl Dfsm {
    /// Next state on `class`, or `None` when the class is outside the
    /// machine's alphabet (no outgoing transition).
    pub fn step(&self, state: usize, class: SymbolClass) -> Option<usize> {
        let column = self.alphabet.iter().position(|&s| s == class)?;
        Some(self.table[state][column])
    }

    pub fn is_accepting(&self, state: usize) -> bool {
        self.accepting.contains(&state)
    }
}

/// Identifiers: one letter, then any run of letters and digits.
pub static IDENTIFIER: Dfsm = Dfsm {
    alphabet: &[SymbolClass::Letter, SymbolClass::Digit],
    table: &[
        //  l  d
        &[0, 0], // 0: trap
        &[2, 0], // 1: start
        &[3, 4], // 2: single letter
        &[3, 4], // 3: letter run
        &[3, 4], // 4: digit run
    ],
    accepting: &[2, 3, 4],
    initial: 1,
};

/// Reals: digits, one period, digits. State 5 is the poison state.
pub static REAL: Dfsm = Dfsm {
    alphabet: &[SymbolClass::Digit, SymbolClass::Period, SymbolClass::Letter],
    table: &[
        //  d  p  l
        &[0, 0, 0], // 0: trap
        &[2, 0, 0], // 1: start
        &[2, 3, 5], // 2: integer part
        &[4, 0, 5], // 3: period seen
        &[4, 0, 5], // 4: fraction
        &[5, 5, 5], // 5: poison, swallows the rest of a malformed numeral
    ],
    accepting: &[4],
    initial: 1,
};

/// Integers: digits only. State 3 is the poison state.
pub static INTEGER: Dfsm = Dfsm {
    alphabet: &[SymbolClass::Digit, SymbolClass::Period, SymbolClass::Letter],
    table: &[
        //  d  p  l
        &[0, 0, 0], // 0: trap
        &[2, 0, 0], // 1: start
        &[2, 3, 3], // 2: digit run
        &[3, 3, 3], // 3: poison
    ],
    accepting: &[2],
    initial: 1,
};

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed a whole string through a machine, stopping where the scanner
    /// would: on a trap transition or a class outside the alphabet.
    /// Returns the final state and the number of characters consumed.
    fn run(machine: &Dfsm, input: &str) -> (usize, usize) {
        let mut state = machine.initial;
        let mut consumed = 0;
        for c in input.chars() {
            match machine.step(state, classify(c)) {
                Some(next) if next != TRAP_STATE => {
                    state = next;
                    consumed += 1;
                }
                _ => break,
            }
        }
        (state, consumed)
    }

    #[test]
    fn test_identifier_accepts_letter_digit_runs() {
        let (state, consumed) = run(&IDENTIFIER, "ab12cd");
        assert!(IDENTIFIER.is_accepting(state));
        assert_eq!(consumed, 6);

        let (state, _) = run(&IDENTIFIER, "a");
        assert!(IDENTIFIER.is_accepting(state));

        let (state, _) = run(&IDENTIFIER, "a1");
        assert!(IDENTIFIER.is_accepting(state));
    }

    #[test]
    fn test_identifier_stops_at_non_alphanumeric() {
        let (state, consumed) = run(&IDENTIFIER, "abc=");
        assert!(IDENTIFIER.is_accepting(state));
        assert_eq!(consumed, 3);
    }

    #[test]
    fn test_real_requires_fraction() {
        let (state, _) = run(&REAL, "3.14");
        assert!(REAL.is_accepting(state));

        // No period: never reaches the accepting state.
        let (state, _) = run(&REAL, "42");
        assert!(!REAL.is_accepting(state));

        // Dangling period: period seen but no fraction digit.
        let (state, _) = run(&REAL, "3.");
        assert!(!REAL.is_accepting(state));
    }

    #[test]
    fn test_real_poison_swallows_trailing_letters() {
        let (state, consumed) = run(&REAL, "12.5x9 ");
        assert!(!REAL.is_accepting(state));
        assert_eq!(consumed, 6, "poison state must consume the whole run");
    }

    #[test]
    fn test_integer_accepts_digit_runs() {
        let (state, consumed) = run(&INTEGER, "12345;");
        assert!(INTEGER.is_accepting(state));
        assert_eq!(consumed, 5);
    }

    #[test]
    fn test_integer_poison_swallows_trailing_letters() {
        let (state, consumed) = run(&INTEGER, "123abc ");
        assert!(!INTEGER.is_accepting(state));
        assert_eq!(consumed, 6);
    }

    #[test]
    fn test_second_period_traps_the_real_machine() {
        // A second period has no transition out of the fraction state, so
        // the run ends accepting the "1.2" prefix.
        let (state, consumed) = run(&REAL, "1.2.3");
        assert!(REAL.is_accepting(state));
        assert_eq!(consumed, 3, "real machine stops before the second period");
    }
}
