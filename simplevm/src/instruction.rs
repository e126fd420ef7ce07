// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

use std::fmt;

use enum_tags::enum_tags;

use crate::{
    arch::Word,
    register::{slot_name, Register},
};

/// Smallest sized integer type that can fit a command tag.
pub type RawCommand = u8;

/// What an [`Instruction`] does.
#[enum_tags(public, repr(RawCommand))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Command {
    /// Declared but has no execution case; running it raises `INS`.
    #[default]
    Nop,
    /// `MOVRI r, i` loads the immediate `operand1` into `register1`.
    #[tag_name = "MOVRI"]
    MovRI,
    /// `MOVRR a, b` copies `register2` into `register1`.
    #[tag_name = "MOVRR"]
    MovRR,
    /// Stops the machine with the `HLT` exception.
    Hlt,
    /// Performs the system call selected by `AX`.
    Syscall,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

/// One decoded instruction. Fields a command does not use keep their
/// defaults: `None` registers and zero operands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub command: Command,
    pub register1: Option<Register>,
    pub register2: Option<Register>,
    pub operand1: Word,
    pub operand2: Word,
}

impl Instruction {
    pub const fn nop() -> Self {
        Self::bare(Command::Nop)
    }

    pub const fn hlt() -> Self {
        Self::bare(Command::Hlt)
    }

    pub const fn syscall() -> Self {
        Self::bare(Command::Syscall)
    }

    pub const fn movri(to: Register, immediate: Word) -> Self {
        Self {
            register1: Some(to),
            operand1: immediate,
            ..Self::bare(Command::MovRI)
        }
    }

    pub const fn movrr(to: Register, from: Register) -> Self {
        Self {
            register1: Some(to),
            register2: Some(from),
            ..Self::bare(Command::MovRR)
        }
    }

    const fn bare(command: Command) -> Self {
        Self {
            command,
            register1: None,
            register2: None,
            operand1: 0,
            operand2: 0,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.command,
            slot_name(self.register1),
            slot_name(self.register2),
            self.operand1,
            self.operand2
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        instruction::{Command, Instruction},
        register::Register,
    };

    #[test]
    fn command_tags_are_stable() {
        assert_eq!(0, Command::NOP_TAG);
        assert_eq!(1, Command::MovRI.tag());
        assert_eq!(2, Command::MovRR.tag());
        assert_eq!(Some(Command::Syscall), Command::from_tag(4));
        assert_eq!(None, Command::from_tag(5));
    }

    #[test]
    fn unused_fields_keep_defaults() {
        let movri = Instruction::movri(Register::Bx, 666);
        assert_eq!(None, movri.register2);
        assert_eq!(0, movri.operand2);

        let syscall = Instruction::syscall();
        assert_eq!(None, syscall.register1);
        assert_eq!(0, syscall.operand1);

        assert_eq!(Instruction::nop(), Instruction::default());
    }

    #[test]
    fn displays_with_slot_names() {
        assert_eq!(
            "MOVRR\tAX\tBX\t0\t0",
            Instruction::movrr(Register::Ax, Register::Bx).to_string()
        );
        assert_eq!("HLT\tNONE\tNONE\t0\t0", Instruction::hlt().to_string());
    }
}
