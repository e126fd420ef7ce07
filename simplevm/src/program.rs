// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

use crate::{
    arch::{InstructionAddress, Word},
    instruction::Instruction,
};

/// A loaded program: its instructions, the initial contents of the data
/// region, and the cursor of the instruction being executed.
///
/// The instructions never change after construction; only the machine moves
/// the cursor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
    data: Vec<Word>,
    current_instruction_index: InstructionAddress,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>, data: Vec<Word>) -> Self {
        Self {
            instructions,
            data,
            current_instruction_index: 0,
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn data(&self) -> &[Word] {
        &self.data
    }

    pub fn current_instruction_index(&self) -> InstructionAddress {
        self.current_instruction_index
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The instruction under the cursor, or `None` once the cursor has left
    /// the program.
    pub(crate) fn fetch(&self) -> Option<Instruction> {
        self.instructions.get(self.current_instruction_index).copied()
    }

    pub(crate) fn advance(&mut self) {
        self.current_instruction_index += 1;
    }

    pub(crate) fn rewind(&mut self) {
        self.current_instruction_index = 0;
    }
}

impl FromIterator<Instruction> for Program {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect(), vec![])
    }
}
