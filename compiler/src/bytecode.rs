//! Stack-machine instruction set, the instruction table, and the jump stack.
//!
//! The instruction table is append-only: the only permitted mutation after
//! an instruction is written is a single operand overwrite via
//! [`InstructionTable::patch`], which is how forward jumps are resolved.
//! Addresses in listings are 1-based ([`START_ADDRESS`]) and sequential,
//! so the table can rely on "next address" as a stable cursor.

use std::fmt;

/// Address of the first emitted instruction.
pub const START_ADDRESS: usize = 1;

/// Opcodes of the target stack machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Pushi,
    Pushm,
    Popm,
    Stdout,
    Stdin,
    Add,
    Sub,
    Mul,
    Div,
    Grt,
    Les,
    Equ,
    Neq,
    Geq,
    Leq,
    Jumpz,
    Jump,
    Label,
}

impl Op {
    /// Whether the operand field is meaningful for this opcode. The rest
    /// are emitted with a filler operand and listed without one.
    pub fn has_operand(self) -> bool {
        matches!(self, Op::Pushi | Op::Pushm | Op::Popm | Op::Jumpz | Op::Jump)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = match self {
            Op::Pushi => "PUSHI",
            Op::Pushm => "PUSHM",
            Op::Popm => "POPM",
            Op::Stdout => "STDOUT",
            Op::Stdin => "STDIN",
            Op::Add => "ADD",
            Op::Sub => "SUB",
            Op::Mul => "MUL",
            Op::Div => "DIV",
            Op::Grt => "GRT",
            Op::Les => "LES",
            Op::Equ => "EQU",
            Op::Neq => "NEQ",
            Op::Geq => "GEQ",
            Op::Leq => "LEQ",
            Op::Jumpz => "JUMPZ",
            Op::Jump => "JUMP",
            Op::Label => "LABEL",
        };
        f.write_str(mnemonic)
    }
}

/// One emitted instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: Op,
    pub operand: i64,
}

/// The ordered list of emitted instructions, the compiler's output program.
#[derive(Debug, Default)]
pub struct InstructionTable {
    instructions: Vec<Instruction>,
}

impl InstructionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an instruction and return the address it was written to.
    pub fn emit(&mut self, op: Op, operand: i64) -> usize {
        self.instructions.push(Instruction { op, operand });
        START_ADDRESS + self.instructions.len() - 1
    }

    /// Address the next emitted instruction will receive.
    pub fn next_address(&self) -> usize {
        START_ADDRESS + self.instructions.len()
    }

    /// Overwrite the operand of an already-emitted instruction. The opcode
    /// is untouched. Panics on an address that was never emitted; callers
    /// only patch addresses they previously got from [`Self::emit`].
    pub fn patch(&mut self, address: usize, operand: i64) {
        self.instructions[address - START_ADDRESS].operand = operand;
    }

    pub fn get(&self, address: usize) -> Option<&Instruction> {
        self.instructions.get(address.checked_sub(START_ADDRESS)?)
    }

    /// Instructions in emission order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// LIFO stack of instruction addresses awaiting an operand patch. One
/// entry per open control-flow construct; strict nesting means every push
/// is matched by exactly one pop.
#[derive(Debug, Default)]
pub struct JumpStack {
    addresses: Vec<usize>,
}

impl JumpStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, address: usize) {
        self.addresses.push(address);
    }

    pub fn pop(&mut self) -> Option<usize> {
        self.addresses.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}
