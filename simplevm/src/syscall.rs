// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

//! System calls. `AX` selects the call, `BX`, `CX` and `DX` carry its
//! arguments.

use std::{fmt, io};

use enum_tags::enum_tags;
use num_traits::ToPrimitive;
use tracing::debug;

use crate::{
    arch::Word,
    memory::BoundedMemory,
    register::{Register, RegisterFile},
};

#[enum_tags(public, repr(Word))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Syscall {
    #[tag_name = "PRINT_CHAR"]
    PrintChar,
    #[tag_name = "PRINT_STRING"]
    PrintString,
    /// Reserved: no input is ever read, so this raises `INS`.
    #[tag_name = "SCAN_CHAR"]
    ScanChar,
    /// Reserved: no input is ever read, so this raises `INS`.
    #[tag_name = "SCAN_STRING"]
    ScanString,
    Exit,
}

/// Where the print calls send their text, selected by `BX`.
#[enum_tags(public, repr(Word))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutputTarget {
    Stdio,
    /// Accepted but writes nothing.
    File,
}

/// The code passed to the `EXIT` call in `BX`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExitStatus(pub Word);

impl ExitStatus {
    pub const SUCCESS: Self = Self(0);
    pub const FAILURE: Self = Self(1);

    pub const fn code(self) -> Word {
        self.0
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::SUCCESS => write!(f, "finished successfully"),
            Self::FAILURE => write!(f, "finished failed"),
            Self(code) => write!(f, "finished with code {}", code),
        }
    }
}

/// What the machine does after a system call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyscallOutcome {
    Continue,
    Exit(ExitStatus),
    /// `AX` selects no call this machine performs.
    NotHandled,
    /// A recognized call with an argument outside its defined set.
    Illegal,
    /// A call read memory at an address that does not exist.
    BadAddress(Word),
}

/// Machine state a system call may observe.
pub struct SyscallContext<'a, O: io::Write> {
    pub registers: &'a RegisterFile,
    pub memory: &'a BoundedMemory,
    pub output: &'a mut O,
}

impl<O: io::Write> SyscallContext<'_, O> {
    /// Performs the call selected by `AX`. Only failures of the output
    /// stream are errors; everything the program got wrong is reported in
    /// the outcome.
    pub fn dispatch(&mut self) -> io::Result<SyscallOutcome> {
        let number = self.registers[Register::Ax];
        let Some(syscall) = Syscall::from_tag(number) else {
            debug!(number, "unknown syscall");
            return Ok(SyscallOutcome::NotHandled);
        };
        debug!(syscall = syscall.name(), "dispatching syscall");

        match syscall {
            Syscall::PrintChar => self.print_char(),
            Syscall::PrintString => self.print_string(),
            Syscall::ScanChar | Syscall::ScanString => {
                Ok(SyscallOutcome::NotHandled)
            }
            Syscall::Exit => self.exit(),
        }
    }

    fn print_char(&mut self) -> io::Result<SyscallOutcome> {
        let Some(target) = self.target() else {
            return Ok(SyscallOutcome::Illegal);
        };
        if target == OutputTarget::File {
            return Ok(SyscallOutcome::Continue);
        }
        let Some(character) = to_char(self.registers[Register::Cx]) else {
            return Ok(SyscallOutcome::Illegal);
        };

        write!(self.output, "{}", character)?;
        self.output.flush()?;
        Ok(SyscallOutcome::Continue)
    }

    fn print_string(&mut self) -> io::Result<SyscallOutcome> {
        let Some(target) = self.target() else {
            return Ok(SyscallOutcome::Illegal);
        };
        if target == OutputTarget::File {
            return Ok(SyscallOutcome::Continue);
        }

        let start = self.registers[Register::Cx];
        let capacity = self.memory.capacity();
        let start_address = match start.to_usize() {
            Some(address) if address < capacity => address,
            _ => return Ok(SyscallOutcome::BadAddress(start)),
        };

        let mut text = String::new();
        for address in start_address..capacity {
            let word = match self.memory.read(address) {
                Ok(word) => word,
                Err(_) => {
                    return Ok(SyscallOutcome::BadAddress(address as Word));
                }
            };
            if word == 0 {
                self.output.write_all(text.as_bytes())?;
                self.output.flush()?;
                return Ok(SyscallOutcome::Continue);
            }
            match to_char(word) {
                Some(character) => text.push(character),
                None => return Ok(SyscallOutcome::Illegal),
            }
        }

        // ran off the end of memory without a terminator
        Ok(SyscallOutcome::BadAddress(capacity as Word))
    }

    fn exit(&mut self) -> io::Result<SyscallOutcome> {
        let status = ExitStatus(self.registers[Register::Bx]);
        writeln!(self.output, "{}", status)?;
        self.output.flush()?;
        Ok(SyscallOutcome::Exit(status))
    }

    fn target(&self) -> Option<OutputTarget> {
        OutputTarget::from_tag(self.registers[Register::Bx])
    }
}

fn to_char(word: Word) -> Option<char> {
    word.to_u32().and_then(char::from_u32)
}
