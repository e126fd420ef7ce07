// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

//! Textual program format.
//!
//! A program has a `section data` of initial words and a `section text` of
//! instructions, one per line:
//!
//! ```text
//! section data
//!     "hi\n"          ; a string expands to its characters and a zero word
//!     10 0x20
//! section text
//!     MOV AX, 1       ; lowered to MOVRI; `MOV AX, BX` becomes MOVRR
//!     MOVRR BX, AX
//!     SYSCALL
//!     HLT
//! ```
//!
//! Operands are separated by spaces or commas and `;` starts a comment.

use enum_tags::enum_tags;
use thiserror::Error;

use crate::{
    arch::Word,
    instruction::{Command, Instruction},
    program::Program,
    register::{slot_name, Register},
};

/// Data words written per line by [`render`].
const RENDERED_WORDS_PER_LINE: usize = 8;

/// Pseudo-instruction picking MOVRR or MOVRI from its second operand.
const MOV_MNEMONIC: &str = "MOV";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AsmError {
    #[error("line {line}: unknown section `{name}`")]
    UnknownSection { line: usize, name: String },
    #[error("line {line}: `{content}` is outside of any section")]
    OutsideSection { line: usize, content: String },
    #[error("line {line}: unknown command `{command}`")]
    UnknownCommand { line: usize, command: String },
    #[error("line {line}: `{command}` takes {expected} operands, found {found}")]
    OperandCount {
        line: usize,
        command: String,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: `{operand}` is not a register")]
    BadRegister { line: usize, operand: String },
    #[error("line {line}: `{operand}` is not an immediate")]
    BadImmediate { line: usize, operand: String },
    #[error("line {line}: `{operand}` is not a data word")]
    BadData { line: usize, operand: String },
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },
}

#[enum_tags(private, repr(u8))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    Data,
    Text,
}

#[derive(Default)]
struct Assembler {
    section: Option<Section>,
    instructions: Vec<Instruction>,
    data: Vec<Word>,
}

/// Assembles `source` into a [`Program`].
pub fn parse(source: &str) -> Result<Program, AsmError> {
    let mut assembler = Assembler::default();
    for (offset, text) in source.lines().enumerate() {
        assembler.line(offset + 1, text)?;
    }
    Ok(Program::new(assembler.instructions, assembler.data))
}

impl Assembler {
    fn line(&mut self, line: usize, text: &str) -> Result<(), AsmError> {
        let text = strip_comment(text).trim();
        if text.is_empty() {
            return Ok(());
        }

        let tokens = tokenize(text);
        let Some((&first, rest)) = tokens.split_first() else {
            return Ok(());
        };
        if let ("section", [name]) = (first, rest) {
            self.section = Some(
                Section::from_name(&name.to_ascii_uppercase()).ok_or_else(
                    || AsmError::UnknownSection {
                        line,
                        name: name.to_string(),
                    },
                )?,
            );
            return Ok(());
        }

        match self.section {
            Some(Section::Data) => self.data_line(line, text),
            Some(Section::Text) => {
                let instruction = instruction(line, first, rest)?;
                self.instructions.push(instruction);
                Ok(())
            }
            None => Err(AsmError::OutsideSection {
                line,
                content: text.to_string(),
            }),
        }
    }

    fn data_line(&mut self, line: usize, text: &str) -> Result<(), AsmError> {
        if let Some(literal) = text.strip_prefix('"') {
            let (characters, rest) = string_literal(line, literal)?;
            let rest = rest.trim();
            if !rest.is_empty() {
                return Err(AsmError::BadData {
                    line,
                    operand: rest.to_string(),
                });
            }
            self.data.extend(characters.chars().map(Word::from));
            self.data.push(0);
            return Ok(());
        }

        for token in tokenize(text) {
            let word = parse_word(token).ok_or_else(|| AsmError::BadData {
                line,
                operand: token.to_string(),
            })?;
            self.data.push(word);
        }
        Ok(())
    }
}

fn instruction(
    line: usize,
    mnemonic: &str,
    operands: &[&str],
) -> Result<Instruction, AsmError> {
    let expect = |expected: usize| {
        if operands.len() == expected {
            Ok(())
        } else {
            Err(AsmError::OperandCount {
                line,
                command: mnemonic.to_string(),
                expected,
                found: operands.len(),
            })
        }
    };

    if mnemonic == MOV_MNEMONIC {
        expect(2)?;
        let to = register(line, operands[0])?;
        return if Register::is_register_name(operands[1]) {
            Ok(Instruction::movrr(to, register(line, operands[1])?))
        } else {
            Ok(Instruction::movri(to, immediate(line, operands[1])?))
        };
    }

    let command =
        Command::from_name(mnemonic).ok_or_else(|| AsmError::UnknownCommand {
            line,
            command: mnemonic.to_string(),
        })?;

    match command {
        Command::Nop => expect(0).map(|_| Instruction::nop()),
        Command::Hlt => expect(0).map(|_| Instruction::hlt()),
        Command::Syscall => expect(0).map(|_| Instruction::syscall()),
        Command::MovRI => {
            expect(2)?;
            Ok(Instruction::movri(
                register(line, operands[0])?,
                immediate(line, operands[1])?,
            ))
        }
        Command::MovRR => {
            expect(2)?;
            Ok(Instruction::movrr(
                register(line, operands[0])?,
                register(line, operands[1])?,
            ))
        }
    }
}

fn register(line: usize, operand: &str) -> Result<Register, AsmError> {
    Register::is_register_name(operand)
        .then(|| Register::from_name(operand))
        .flatten()
        .ok_or_else(|| AsmError::BadRegister {
            line,
            operand: operand.to_string(),
        })
}

fn immediate(line: usize, operand: &str) -> Result<Word, AsmError> {
    parse_word(operand).ok_or_else(|| AsmError::BadImmediate {
        line,
        operand: operand.to_string(),
    })
}

fn parse_word(token: &str) -> Option<Word> {
    match token.strip_prefix("0x") {
        Some(hex) => Word::from_str_radix(hex, 16).ok(),
        None => token.parse().ok(),
    }
}

fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Drops everything from the first `;` that is not inside a string literal.
fn strip_comment(text: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    for (index, c) in text.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            ';' if !in_string => return &text[..index],
            _ => {}
        }
    }
    text
}

/// Reads a string literal whose opening quote is already consumed. Returns
/// the unescaped characters and whatever follows the closing quote.
fn string_literal(
    line: usize,
    literal: &str,
) -> Result<(String, &str), AsmError> {
    let mut characters = String::new();
    let mut chars = literal.char_indices();
    while let Some((index, c)) = chars.next() {
        match c {
            '"' => return Ok((characters, &literal[index + 1..])),
            '\\' => {
                let (_, escaped) =
                    chars.next().ok_or(AsmError::UnterminatedString { line })?;
                characters.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    '0' => '\0',
                    other => other,
                });
            }
            other => characters.push(other),
        }
    }
    Err(AsmError::UnterminatedString { line })
}

/// Writes `program` back in the textual format. Data is written as numeric
/// words.
///
/// Programs produced by [`parse`] reassemble to themselves. A hand-built
/// `MOVRI`/`MOVRR` with an empty register slot renders that slot as `NONE`,
/// which [`parse`] rejects.
pub fn render(program: &Program) -> String {
    let mut source = String::new();

    if !program.data().is_empty() {
        source.push_str("section data\n");
        for chunk in program.data().chunks(RENDERED_WORDS_PER_LINE) {
            let words: Vec<String> =
                chunk.iter().map(|word| word.to_string()).collect();
            source.push_str(&format!("    {}\n", words.join(" ")));
        }
    }

    source.push_str("section text\n");
    for instruction in program.instructions() {
        let rendered = match instruction.command {
            Command::MovRI => format!(
                "{} {}, {}",
                instruction.command,
                slot_name(instruction.register1),
                instruction.operand1
            ),
            Command::MovRR => format!(
                "{} {}, {}",
                instruction.command,
                slot_name(instruction.register1),
                slot_name(instruction.register2)
            ),
            Command::Nop | Command::Hlt | Command::Syscall => {
                instruction.command.to_string()
            }
        };
        source.push_str(&format!("    {}\n", rendered));
    }

    source
}
