// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

use std::{
    fmt,
    ops::{Index, IndexMut},
};

use enum_tags::enum_tags;
use static_assertions::const_assert_eq;

use crate::arch::{Word, GENERAL_REGISTER_COUNT, STATUS_FLAG_COUNT};

/// Name printed for an instruction slot that does not use a register.
pub const NO_REGISTER_NAME: &str = "NONE";

/// A general-purpose register.
///
/// By convention `AX` carries the syscall number and `BX`, `CX`, `DX` its
/// arguments.
#[enum_tags(public, repr(usize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Register {
    Ax,
    Bx,
    Cx,
    Dx,
    Ex,
    Fx,
    Gx,
    Hx,
    Ix,
    Jx,
    Kx,
    Lx,
    Mx,
    Nx,
    Ox,
    Px,
    Qx,
    Rx,
    Sx,
    Tx,
    Ux,
    Vx,
    Wx,
    Xx,
    Yx,
    Zx,
}

const_assert_eq!(Register::COUNT, GENERAL_REGISTER_COUNT);

impl Register {
    pub const fn index(self) -> usize {
        self.tag()
    }

    /// The register stored at `index`, or `None` when `index` names no real
    /// register (including the count sentinel).
    pub fn from_index(index: usize) -> Option<Self> {
        Self::from_tag(index)
    }

    /// Whether `text` is shaped like a register name: an upper-case letter
    /// followed by `X`.
    pub fn is_register_name(text: &str) -> bool {
        matches!(text.as_bytes(), [b'A'..=b'Z', b'X'])
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

/// Name of an instruction's register slot, `NONE` when unused.
pub fn slot_name(slot: Option<Register>) -> &'static str {
    slot.map_or(NO_REGISTER_NAME, |register| register.name())
}

/// Status flags, reserved for comparison instructions.
#[enum_tags(public, repr(usize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusFlag {
    /// Set when a comparison finds both sides equal.
    Zf,
    /// Set when a comparison result is negative.
    Sf,
}

const_assert_eq!(StatusFlag::COUNT, STATUS_FLAG_COUNT);

impl fmt::Display for StatusFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

/// General-purpose registers and status flags of one machine.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterFile {
    general: [Word; GENERAL_REGISTER_COUNT],
    flags: [bool; STATUS_FLAG_COUNT],
}

impl RegisterFile {
    /// All registers zeroed, all flags clear.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, register: Register) -> Word {
        self.general[register.index()]
    }

    pub fn set(&mut self, register: Register, value: Word) {
        self.general[register.index()] = value;
    }

    pub fn flag(&self, flag: StatusFlag) -> bool {
        self.flags[flag.tag()]
    }

    pub fn set_flag(&mut self, flag: StatusFlag, value: bool) {
        self.flags[flag.tag()] = value;
    }

    pub fn general(&self) -> &[Word; GENERAL_REGISTER_COUNT] {
        &self.general
    }

    pub fn flags(&self) -> &[bool; STATUS_FLAG_COUNT] {
        &self.flags
    }

    /// Every register with its current value, in register order.
    pub fn iter(&self) -> impl Iterator<Item = (Register, Word)> + '_ {
        Register::ALL
            .into_iter()
            .map(|register| (register, self.get(register)))
    }
}

impl Index<Register> for RegisterFile {
    type Output = Word;

    fn index(&self, register: Register) -> &Word {
        &self.general[register.index()]
    }
}

impl IndexMut<Register> for RegisterFile {
    fn index_mut(&mut self, register: Register) -> &mut Word {
        &mut self.general[register.index()]
    }
}

#[cfg(test)]
mod tests {
    use crate::register::{
        slot_name, Register, RegisterFile, StatusFlag, NO_REGISTER_NAME,
    };

    #[test]
    fn names_follow_register_order() {
        assert_eq!("AX", Register::Ax.name());
        assert_eq!("ZX", Register::Zx.name());
        assert_eq!(Some(Register::Dx), Register::from_name("DX"));
        assert_eq!(None, Register::from_name("ax"));
        assert_eq!(NO_REGISTER_NAME, slot_name(None));
        assert_eq!("CX", slot_name(Some(Register::Cx)));
    }

    #[test]
    fn sentinel_indices_are_rejected() {
        assert_eq!(Some(Register::Zx), Register::from_index(25));
        assert_eq!(None, Register::from_index(Register::COUNT));
        assert_eq!(None, Register::from_index(Register::COUNT + 1));
    }

    #[test]
    fn register_name_shape() {
        assert!(Register::is_register_name("AX"));
        assert!(Register::is_register_name("QX"));
        assert!(!Register::is_register_name("AY"));
        assert!(!Register::is_register_name("aX"));
        assert!(!Register::is_register_name("AXX"));
    }

    #[test]
    fn fresh_file_is_zeroed() {
        let registers = RegisterFile::new();
        assert!(registers.iter().all(|(_, value)| value == 0));
        assert!(!registers.flag(StatusFlag::Zf));
        assert!(!registers.flag(StatusFlag::Sf));
    }

    #[test]
    fn set_only_touches_one_register() {
        let mut registers = RegisterFile::new();
        registers.set(Register::Cx, 42);
        registers[Register::Dx] += 1;

        assert_eq!(42, registers[Register::Cx]);
        assert_eq!(1, registers.get(Register::Dx));
        assert_eq!(43, registers.general().iter().sum::<u64>());
    }
}
