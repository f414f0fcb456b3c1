// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Instruction catalog mapping mnemonics to opcode and addressing mode.
//!
//! Mnemonics with both an immediate and an absolute form appear twice; the
//! immediate entry carries an `_I` suffix and is selected by the engine when
//! it sees a `#` marker in the operand position.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Inherent,
    Immediate8,
    Immediate16,
    Absolute,
    RegisterIndirect,
    Relative,
}

/// The four pseudo-operations. They carry no opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Org,
    End,
    Rmb,
    Fcb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Machine { opcode: u8, mode: AddressingMode },
    Directive(Directive),
}

const fn machine(opcode: u8, mode: AddressingMode) -> Instruction {
    Instruction::Machine { opcode, mode }
}

const fn directive(directive: Directive) -> Instruction {
    Instruction::Directive(directive)
}

const CATALOG: &[(&str, Instruction)] = &[
    ("NOP", machine(0x12, AddressingMode::Inherent)),
    ("CLRA", machine(0x4F, AddressingMode::Inherent)),
    ("COMA", machine(0x43, AddressingMode::Inherent)),
    ("NEGA", machine(0x40, AddressingMode::Inherent)),
    ("LDA_I", machine(0x86, AddressingMode::Immediate8)),
    ("LDAX", machine(0xA6, AddressingMode::RegisterIndirect)),
    ("LDA", machine(0xB6, AddressingMode::Absolute)),
    ("STAX", machine(0xA7, AddressingMode::RegisterIndirect)),
    ("STA", machine(0xB7, AddressingMode::Absolute)),
    ("ADDA_I", machine(0x8B, AddressingMode::Immediate8)),
    ("ADDA", machine(0xBB, AddressingMode::Absolute)),
    ("ANDA_I", machine(0x84, AddressingMode::Immediate8)),
    ("ANDA", machine(0xB4, AddressingMode::Absolute)),
    ("CMPA_I", machine(0x81, AddressingMode::Immediate8)),
    ("CMPA", machine(0xB1, AddressingMode::Absolute)),
    ("LDX_I", machine(0x8E, AddressingMode::Immediate16)),
    ("LDX", machine(0xBE, AddressingMode::Absolute)),
    ("STX", machine(0xBF, AddressingMode::Absolute)),
    ("CMPX_I", machine(0x8C, AddressingMode::Immediate16)),
    ("CMPX", machine(0xBC, AddressingMode::Absolute)),
    ("ADDX_I", machine(0x30, AddressingMode::Immediate16)),
    ("ADDX", machine(0x31, AddressingMode::Absolute)),
    ("LDS_I", machine(0x8F, AddressingMode::Immediate16)),
    ("BNE", machine(0x26, AddressingMode::Relative)),
    ("BEQ", machine(0x27, AddressingMode::Relative)),
    ("BRA", machine(0x20, AddressingMode::Relative)),
    ("JMP", machine(0x7E, AddressingMode::Absolute)),
    ("JSR", machine(0xBD, AddressingMode::Absolute)),
    ("RTS", machine(0x39, AddressingMode::Inherent)),
    ("ORG", directive(Directive::Org)),
    ("END", directive(Directive::End)),
    ("RMB", directive(Directive::Rmb)),
    ("FCB", directive(Directive::Fcb)),
];

/// Immutable mnemonic lookup table, built once per assembly run.
pub struct InstructionSet {
    entries: HashMap<&'static str, Instruction>,
}

impl InstructionSet {
    #[must_use]
    pub fn new() -> Self {
        let mut entries = HashMap::with_capacity(CATALOG.len());
        for (mnemonic, instruction) in CATALOG {
            entries.insert(*mnemonic, *instruction);
        }
        Self { entries }
    }

    /// Looks up a mnemonic; the key is case-normalized first.
    pub fn lookup(&self, mnemonic: &str) -> Option<Instruction> {
        self.entries
            .get(mnemonic.to_ascii_uppercase().as_str())
            .copied()
    }
}

impl Default for InstructionSet {
    fn default() -> Self {
        Self::new()
    }
}
