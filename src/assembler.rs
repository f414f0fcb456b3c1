// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Two-pass assembler engine and command-line driver.
//!
//! Pass 1 scans every statement, binds labels to `output length + origin`
//! and emits a provisional image with unresolved operands encoded as zero.
//! Pass 2 rebuilds the image from the start with every label resolved from
//! the symbol table. Addressing-mode selection depends only on the lexical
//! shape of the operand, so instruction lengths are identical in both
//! passes. The first violated rule aborts the run with one positioned
//! diagnostic.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::hexfile;
use crate::instructions::{AddressingMode, Directive, Instruction, InstructionSet};
use crate::reporter::format_diagnostic;
use crate::source::SourceLines;
use crate::symbol_table::SymbolTable;
use crate::tokenizer::{Token, TokenKind, Tokenizer};

/// Upper bound for an RMB reservation.
const MAX_RMB: i64 = 0x8000;

pub const BAD_DIRECTIVE: &str = "Invalid directive";
pub const BAD_MNEMONIC: &str = "Invalid mnemonic";
pub const BAD_OPERAND: &str = "Operand is invalid";
pub const BAD_REGISTER: &str = "Invalid register";
pub const COMMA_EXPECTED: &str = "Expected a ','";
pub const EXTRA_GARBAGE: &str = "Symbol is unexpected";
pub const NUMBER_EXPECTED: &str = "Expected a number";
pub const OUT_OF_RANGE: &str = "Number is out of range";
pub const STORE_OVERFLOW: &str = "Program exceeds available memory";
pub const SYNTAX_ERROR: &str = "Syntax error";
pub const UNDEFINED_OPERAND: &str = "Operand is undefined";
pub const MNEMONIC_EXPECTED: &str = "Mnemonic expected";
pub const UNDEFINED_MNEMONIC: &str = "Undefined mnemonic";
pub const UNDEFINED_LABEL: &str = "Undefined label";
pub const OPERAND_EXPECTED: &str = "Operand expected";
pub const LOCATION_EXPECTED: &str = "Location expected";

/// Positioned diagnostic: a reason, the offending line and the column the
/// caret points at. Assembly stops at the first one.
#[derive(Debug, Clone)]
pub struct AsmError {
    pub reason: &'static str,
    pub line: String,
    pub pos: usize,
}

impl AsmError {
    fn new(reason: &'static str, pos: usize, line: &str) -> Self {
        Self {
            reason,
            line: line.to_string(),
            pos,
        }
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:\n{}\n{}^",
            self.reason,
            self.line.trim_end(),
            " ".repeat(self.pos)
        )
    }
}

impl std::error::Error for AsmError {}

/// Result of a successful run: the final byte image plus addresses.
#[derive(Debug)]
pub struct Assembly {
    pub code: Vec<u8>,
    pub origin: i64,
    pub entry: i64,
    pub symbols: SymbolTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    First,
    Second,
}

/// Assembles a rewindable stream of source lines into a byte image.
///
/// Every invocation owns its own catalog, symbol table and output buffer;
/// two concurrent runs share nothing.
pub fn assemble(source: &SourceLines) -> Result<Assembly, AsmError> {
    let mut asm = Assembler::new();
    for pass in [Pass::First, Pass::Second] {
        asm.pass = pass;
        asm.code.clear();
        for line in source.iter() {
            if line.trim().is_empty() {
                continue;
            }
            asm.statement(line)?;
        }
    }
    Ok(Assembly {
        code: asm.code,
        origin: asm.origin,
        entry: asm.entry,
        symbols: asm.symbols,
    })
}

struct Assembler {
    iset: InstructionSet,
    symbols: SymbolTable,
    code: Vec<u8>,
    origin: i64,
    entry: i64,
    pass: Pass,
}

impl Assembler {
    fn new() -> Self {
        Self {
            iset: InstructionSet::new(),
            symbols: SymbolTable::new(),
            code: Vec::new(),
            origin: 0,
            entry: 0,
            pass: Pass::First,
        }
    }

    /// Address of the next byte to be emitted.
    fn location(&self) -> i64 {
        self.code.len() as i64 + self.origin
    }

    fn statement(&mut self, line: &str) -> Result<(), AsmError> {
        let mut tokens = Tokenizer::new(line);
        let mut token = tokens.next_token();

        // a name in column 0 is a label declaration
        if token.kind == TokenKind::Name {
            if self.pass == Pass::First {
                self.symbols.define(&token.text, self.location());
            }
            token = tokens.next_token();
        }
        if token.kind != TokenKind::Whitespace {
            // mnemonics must be indented
            return Err(AsmError::new(SYNTAX_ERROR, token.pos, line));
        }

        let token = tokens.next_token();
        if token.kind != TokenKind::Name {
            return Err(AsmError::new(MNEMONIC_EXPECTED, token.pos, line));
        }
        let mnemonic = token.text;
        let mnemonic_pos = token.pos;
        let instruction = self
            .iset
            .lookup(&mnemonic)
            .ok_or_else(|| AsmError::new(UNDEFINED_MNEMONIC, mnemonic_pos, line))?;

        match instruction {
            Instruction::Machine { opcode, mode } => match mode {
                AddressingMode::Inherent | AddressingMode::RegisterIndirect => {
                    self.code.push(opcode);
                }
                AddressingMode::Absolute => {
                    self.absolute(&mut tokens, &mnemonic, mnemonic_pos, opcode, line)?;
                }
                AddressingMode::Relative => {
                    self.relative(&mut tokens, opcode, line)?;
                }
                AddressingMode::Immediate8 | AddressingMode::Immediate16 => {
                    // immediate entries are reached through their absolute
                    // counterpart and a '#' marker, never spelled directly
                    return Err(AsmError::new(BAD_MNEMONIC, mnemonic_pos, line));
                }
            },
            Instruction::Directive(directive) => {
                self.directive(&mut tokens, directive, line)?;
            }
        }

        // the statement must end in whitespace; anything after it, comment
        // or otherwise, is never consumed
        let token = tokens.next_token();
        if token.kind != TokenKind::Whitespace {
            return Err(AsmError::new(SYNTAX_ERROR, token.pos, line));
        }
        Ok(())
    }

    /// Absolute-mode dispatch: `#` selects the immediate variant, a name is
    /// a 16-bit little-endian address. Any other operand token falls through
    /// without emitting bytes and the trailing-grammar check decides whether
    /// the line is accepted.
    fn absolute(
        &mut self,
        tokens: &mut Tokenizer,
        mnemonic: &str,
        mnemonic_pos: usize,
        opcode: u8,
        line: &str,
    ) -> Result<(), AsmError> {
        let token = operand_token(tokens);
        match token.kind {
            TokenKind::Hash => {
                let operand = tokens.next_token();
                let immediate = self.iset.lookup(&format!("{mnemonic}_I"));
                let Some(Instruction::Machine {
                    opcode: imm_opcode,
                    mode,
                }) = immediate
                else {
                    return Err(AsmError::new(UNDEFINED_MNEMONIC, mnemonic_pos, line));
                };
                if operand.kind != TokenKind::Number {
                    return Err(AsmError::new(NUMBER_EXPECTED, operand.pos, line));
                }
                self.code.push(imm_opcode);
                self.code.push((operand.value & 0xff) as u8);
                if mode == AddressingMode::Immediate16 {
                    self.code.push(((operand.value >> 8) & 0xff) as u8);
                }
            }
            TokenKind::Name => {
                let mut operand: i64 = 0;
                if self.pass == Pass::Second {
                    operand = self.symbols.lookup(&token.text).unwrap_or(0);
                    // a label bound to address zero reads as undefined here
                    if operand == 0 {
                        return Err(AsmError::new(UNDEFINED_LABEL, token.pos, line));
                    }
                }
                self.code.push(opcode);
                self.code.push((operand & 0xff) as u8);
                self.code.push(((operand >> 8) & 0xff) as u8);
            }
            _ => {}
        }
        Ok(())
    }

    fn relative(
        &mut self,
        tokens: &mut Tokenizer,
        opcode: u8,
        line: &str,
    ) -> Result<(), AsmError> {
        let token = operand_token(tokens);
        if token.kind != TokenKind::Name {
            return Err(AsmError::new(OPERAND_EXPECTED, token.pos, line));
        }
        let mut offset: i64 = 0;
        if self.pass == Pass::Second {
            let address = self.symbols.lookup(&token.text).unwrap_or(0);
            if address == 0 {
                return Err(AsmError::new(UNDEFINED_LABEL, token.pos, line));
            }
            // measured from the output length before this instruction's own
            // bytes are appended
            offset = address - self.code.len() as i64;
        }
        if !(-127..=127).contains(&offset) {
            return Err(AsmError::new(OUT_OF_RANGE, token.pos, line));
        }
        self.code.push(opcode);
        self.code.push(offset as u8);
        Ok(())
    }

    fn directive(
        &mut self,
        tokens: &mut Tokenizer,
        directive: Directive,
        line: &str,
    ) -> Result<(), AsmError> {
        let token = operand_token(tokens);
        match directive {
            Directive::Org => {
                if token.kind != TokenKind::Number {
                    return Err(AsmError::new(NUMBER_EXPECTED, token.pos, line));
                }
                self.origin = token.value;
            }
            Directive::End => {
                if token.kind != TokenKind::Name {
                    return Err(AsmError::new(LOCATION_EXPECTED, token.pos, line));
                }
                if self.pass == Pass::Second {
                    // an unresolved or zero entry label leaves the entry
                    // point at zero instead of aborting the pass
                    self.entry = self.symbols.lookup(&token.text).unwrap_or(0);
                }
            }
            Directive::Rmb => {
                if token.kind != TokenKind::Number {
                    return Err(AsmError::new(NUMBER_EXPECTED, token.pos, line));
                }
                if !(1..=MAX_RMB).contains(&token.value) {
                    return Err(AsmError::new(OUT_OF_RANGE, token.pos, line));
                }
                let new_len = self.code.len() + token.value as usize;
                self.code.resize(new_len, 0);
            }
            Directive::Fcb => {
                if token.kind != TokenKind::Number {
                    return Err(AsmError::new(NUMBER_EXPECTED, token.pos, line));
                }
                self.code.push((token.value & 0xff) as u8);
            }
        }
        Ok(())
    }
}

/// Skips one optional whitespace token ahead of an operand.
fn operand_token(tokens: &mut Tokenizer) -> Token {
    let token = tokens.next_token();
    if token.kind == TokenKind::Whitespace {
        return tokens.next_token();
    }
    token
}

pub const VERSION: &str = "1.0";

const LONG_ABOUT: &str = "H6809 two-pass assembler.

Reads one .asm source file and prints the assembled image bytes together
with the origin and entry addresses. Use -x/--hex to also write an Intel
Hex file and -s/--symbols to dump the label table.";

#[derive(Parser, Debug)]
#[command(
    name = "h68asm",
    version = VERSION,
    about = "H6809 two-pass assembler",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    /// Program file (.asm)
    pub filename: Option<PathBuf>,
    #[arg(
        short = 'x',
        long = "hex",
        value_name = "FILE",
        long_help = "Write an Intel Hex image to FILE. When END names an entry point, a Start Segment Address record is added."
    )]
    pub hex_name: Option<String>,
    #[arg(
        short = 's',
        long = "symbols",
        action = ArgAction::SetTrue,
        long_help = "Dump the symbol table after assembly."
    )]
    pub dump_symbols: bool,
}

/// Runs the assembler with command-line arguments; returns the exit status.
///
/// A missing filename exits with 1. Assembly diagnostics and I/O errors are
/// printed but keep the status at 0.
pub fn run(use_color: bool) -> i32 {
    let cli = Cli::parse();
    let Some(path) = cli.filename.as_deref() else {
        eprintln!("No filename specified.");
        return 1;
    };
    if path.extension().and_then(|ext| ext.to_str()) != Some("asm") {
        eprintln!("Unsupported file type.");
    }
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("{err}");
            return 0;
        }
    };
    let source = SourceLines::from_text(&text);
    match assemble(&source) {
        Ok(assembly) => report(&assembly, &cli),
        Err(err) => eprintln!("{}", format_diagnostic(&err, use_color)),
    }
    0
}

fn report(assembly: &Assembly, cli: &Cli) {
    let bytes: Vec<String> = assembly.code.iter().map(|b| format!("{b:02X}")).collect();
    println!("{}", bytes.join(" "));
    println!("org: {:04X}  entry: {:04X}", assembly.origin, assembly.entry);

    if cli.dump_symbols {
        if let Err(err) = assembly.symbols.dump(io::stdout().lock()) {
            eprintln!("{err}");
        }
    }
    if let Some(hex_name) = cli.hex_name.as_deref() {
        if let Err(err) = write_hex(assembly, hex_name) {
            eprintln!("{err}");
        }
    }
}

fn write_hex(assembly: &Assembly, hex_name: &str) -> io::Result<()> {
    let file = File::create(hex_name)?;
    let entry = (assembly.entry != 0).then_some(assembly.entry as u16);
    hexfile::write_hex_file(
        BufWriter::new(file),
        assembly.origin as u16,
        &assembly.code,
        entry,
    )
}

#[cfg(test)]
mod tests {
    use super::{
        assemble, AsmError, Assembly, Cli, LOCATION_EXPECTED, MNEMONIC_EXPECTED, NUMBER_EXPECTED,
        OPERAND_EXPECTED, OUT_OF_RANGE, SYNTAX_ERROR, UNDEFINED_LABEL, UNDEFINED_MNEMONIC,
    };
    use crate::source::SourceLines;
    use clap::Parser;
    use std::path::PathBuf;

    fn run_assembler(text: &str) -> Result<Assembly, AsmError> {
        assemble(&SourceLines::from_text(text))
    }

    fn assemble_ok(text: &str) -> Assembly {
        run_assembler(text).expect("assembly succeeds")
    }

    fn assemble_err(text: &str) -> AsmError {
        run_assembler(text).expect_err("assembly fails")
    }

    #[test]
    fn inherent_addressing() {
        let asm = assemble_ok("    NOP     comment\n");
        assert_eq!(asm.code, vec![0x12]);
        assert_eq!(asm.origin, 0);
        assert_eq!(asm.entry, 0);
    }

    #[test]
    fn immediate_addressing() {
        let asm = assemble_ok("    LDA     #10     comment\n    LDX     #1234H\n");
        assert_eq!(asm.code, vec![0x86, 0x0A, 0x8E, 0x34, 0x12]);
    }

    #[test]
    fn absolute_addressing_resolves_forward_reference() {
        let asm = assemble_ok("        STA     PROD\nPROD    RMB     1        Storage for PROD\n");
        assert_eq!(asm.code, vec![0xB7, 0x03, 0x00, 0x00]);
        assert_eq!(asm.symbols.lookup("PROD"), Some(3));
    }

    #[test]
    fn register_indirect_addressing() {
        let asm = assemble_ok("    LDAX    comment\n    STAX    comment\n");
        assert_eq!(asm.code, vec![0xA6, 0xA7]);
    }

    #[test]
    fn relative_addressing_offset_from_instruction_start() {
        // the offset equals the label address minus the output length before
        // the branch bytes are appended
        let asm = assemble_ok("    BRA      LOC\nLOC NOP\n");
        assert_eq!(asm.code, vec![0x20, 0x02, 0x12]);
    }

    #[test]
    fn negative_relative_offset_stores_low_byte() {
        let asm = assemble_ok("    FCB 1\nBACK CLRA\n    BNE BACK\n");
        // BACK is at 1 and the branch starts at 2: offset -1
        assert_eq!(asm.code, vec![0x01, 0x4F, 0x26, 0xFF]);
    }

    #[test]
    fn fcb_emits_masked_byte() {
        assert_eq!(assemble_ok("    FCB 12H\n").code, vec![0x12]);
        assert_eq!(assemble_ok("    FCB 300\n").code, vec![0x2C]);
    }

    #[test]
    fn org_and_end_set_origin_and_entry() {
        let asm = assemble_ok("        ORG     1234H\nSTART   CLRA\n        END START\n");
        assert_eq!(asm.code, vec![0x4F]);
        assert_eq!(asm.origin, 0x1234);
        assert_eq!(asm.entry, 0x1234);
    }

    #[test]
    fn rmb_reserves_zeroed_bytes() {
        let asm = assemble_ok("    RMB 4\n    FCB 1\n");
        assert_eq!(asm.code, vec![0, 0, 0, 0, 1]);
    }

    #[test]
    fn rmb_rejects_zero_and_oversized_counts() {
        assert_eq!(assemble_err("    RMB 0\n").reason, OUT_OF_RANGE);
        assert_eq!(assemble_err("    RMB 32769\n").reason, OUT_OF_RANGE);
        assert!(run_assembler("    RMB 32768\n").is_ok());
    }

    #[test]
    fn branch_target_out_of_range() {
        let err = assemble_err("    BRA FAR\n    RMB 200\nFAR NOP\n");
        assert_eq!(err.reason, OUT_OF_RANGE);
        assert_eq!(err.pos, 8);
    }

    #[test]
    fn undefined_mnemonic_points_at_mnemonic_column() {
        let err = assemble_err("    FOO\n");
        assert_eq!(err.reason, UNDEFINED_MNEMONIC);
        assert_eq!(err.pos, 4);
    }

    #[test]
    fn unindented_line_is_a_label_not_a_mnemonic() {
        let err = assemble_err("NOP\n");
        assert_eq!(err.reason, MNEMONIC_EXPECTED);
    }

    #[test]
    fn non_name_in_column_zero_is_a_syntax_error() {
        let err = assemble_err("*   NOP\n");
        assert_eq!(err.reason, SYNTAX_ERROR);
        assert_eq!(err.pos, 0);
    }

    #[test]
    fn label_and_mnemonic_share_a_line() {
        let asm = assemble_ok("    FCB 1\nHERE NOP\n    JMP HERE\n");
        assert_eq!(asm.code, vec![0x01, 0x12, 0x7E, 0x01, 0x00]);
        assert_eq!(asm.symbols.lookup("HERE"), Some(1));
    }

    #[test]
    fn label_at_address_zero_reads_as_undefined() {
        let err = assemble_err("ZERO NOP\n    JMP ZERO\n");
        assert_eq!(err.reason, UNDEFINED_LABEL);
        assert_eq!(err.pos, 8);
    }

    #[test]
    fn undefined_absolute_label() {
        let err = assemble_err("    JMP NOWHERE\n");
        assert_eq!(err.reason, UNDEFINED_LABEL);
    }

    #[test]
    fn redefined_label_last_binding_wins() {
        let asm = assemble_ok("DUP NOP\nDUP CLRA\n    JMP DUP\n");
        assert_eq!(asm.code, vec![0x12, 0x4F, 0x7E, 0x01, 0x00]);
    }

    #[test]
    fn immediate_operand_must_be_a_number() {
        let err = assemble_err("    LDA #X\n");
        assert_eq!(err.reason, NUMBER_EXPECTED);
        assert_eq!(err.pos, 9);
    }

    #[test]
    fn immediate_marker_without_immediate_form() {
        let err = assemble_err("    JMP #5\n");
        assert_eq!(err.reason, UNDEFINED_MNEMONIC);
        assert_eq!(err.pos, 4);
    }

    #[test]
    fn immediate_mnemonic_cannot_be_spelled_directly() {
        let err = assemble_err("    LDA_I #10\n");
        assert_eq!(err.reason, super::BAD_MNEMONIC);
        assert_eq!(err.pos, 4);
    }

    #[test]
    fn negative_immediate_stores_low_byte() {
        let asm = assemble_ok("    LDA #-5\n");
        assert_eq!(asm.code, vec![0x86, 0xFB]);
    }

    #[test]
    fn absolute_operand_of_wrong_shape_emits_nothing() {
        // neither '#' nor a name: the statement falls through without bytes
        let asm = assemble_ok("    LDA 123 comment\n");
        assert_eq!(asm.code, Vec::<u8>::new());
    }

    #[test]
    fn missing_branch_target() {
        let err = assemble_err("    BRA\n");
        assert_eq!(err.reason, OPERAND_EXPECTED);
        assert_eq!(err.pos, 0);
    }

    #[test]
    fn org_requires_a_number() {
        let err = assemble_err("    ORG X\n");
        assert_eq!(err.reason, NUMBER_EXPECTED);
    }

    #[test]
    fn end_requires_a_location_name() {
        let err = assemble_err("    END 5\n");
        assert_eq!(err.reason, LOCATION_EXPECTED);
    }

    #[test]
    fn unresolved_entry_label_leaves_entry_at_zero() {
        let asm = assemble_ok("    END MISSING\n");
        assert_eq!(asm.entry, 0);
    }

    #[test]
    fn semicolon_comment_after_statement_is_rejected() {
        // the comment marker is its own token kind and the trailing check
        // only accepts whitespace
        let err = assemble_err("    NOP ; note\n");
        assert_eq!(err.reason, SYNTAX_ERROR);
        assert_eq!(err.pos, 7);
    }

    #[test]
    fn blank_lines_contribute_nothing() {
        let asm = assemble_ok("\n    NOP\n   \n    CLRA\n");
        assert_eq!(asm.code, vec![0x12, 0x4F]);
    }

    #[test]
    fn backward_references_assemble_identically_in_both_passes() {
        // no forward references: the pass-2 image equals the pass-1 image
        let asm = assemble_ok("    FCB 1\nHERE CLRA\n    JMP HERE\n");
        assert_eq!(asm.code, vec![0x01, 0x4F, 0x7E, 0x01, 0x00]);
    }

    #[test]
    fn diagnostic_display_renders_caret_at_column() {
        let err = assemble_err("    FOO\n");
        assert_eq!(err.to_string(), "Undefined mnemonic:\n    FOO\n    ^");
    }

    #[test]
    fn cli_parses_filename_and_outputs() {
        let cli = Cli::parse_from(["h68asm", "prog.asm", "-x", "prog.hex", "-s"]);
        assert_eq!(cli.filename, Some(PathBuf::from("prog.asm")));
        assert_eq!(cli.hex_name.as_deref(), Some("prog.hex"));
        assert!(cli.dump_symbols);
    }

    #[test]
    fn cli_filename_is_optional_at_parse_time() {
        let cli = Cli::parse_from(["h68asm"]);
        assert!(cli.filename.is_none());
        assert!(!cli.dump_symbols);
    }
}
