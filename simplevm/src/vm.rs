// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

use std::{fmt, io};

use enum_tags::enum_tags;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::{
    arch::{InstructionAddress, STATUS_FLAG_COUNT},
    instruction::{Command, Instruction},
    memory::{BoundedMemory, MemoryError, MemoryLayout},
    program::Program,
    register::RegisterFile,
    syscall::{ExitStatus, SyscallContext, SyscallOutcome},
};

/// Exception state of a [`Machine`]. Everything but `AOK` is terminal: only a
/// reset brings the machine back.
#[enum_tags(public, repr(u8))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Exception {
    /// Running normally, or ready to run.
    #[default]
    Aok,
    /// A `HLT` instruction was executed.
    Hlt,
    /// The instruction index left the program.
    Adr,
    /// An instruction could not be executed.
    Ins,
}

impl Exception {
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Aok)
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

/// Why a [`Machine`] stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stop {
    Exception(Exception),
    /// The program called `EXIT`; the exception state stays `AOK`.
    Exit(ExitStatus),
}

/// Where and why a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunReport {
    pub stop: Stop,
    /// The index of the instruction that stopped the machine, or the
    /// out-of-range index for `ADR`.
    pub index: InstructionAddress,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stop {
            Stop::Exception(exception) => {
                writeln!(f, "Exception:{}", exception)?;
                writeln!(f, "when:{}", self.index)?;
                write!(f, "machine stopped")
            }
            Stop::Exit(status) => status.fmt(f),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("program data does not fit in memory: {0}")]
    Data(#[from] MemoryError),
    #[error("the machine has stopped and must be reset before loading")]
    Stopped,
}

/// Failures of the host around the machine. Faults of the running program
/// are never errors; they become [`Exception`]s.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("failed to write machine output: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Load(#[from] LoadError),
}

pub type MachineResult<T> = Result<T, MachineError>;

/// A single machine: registers, bounded memory and the loaded program,
/// writing whatever the program prints to `O`.
pub struct Machine<O = io::Stdout> {
    registers: RegisterFile,
    memory: BoundedMemory,
    program: Program,
    exception: Exception,
    is_running: bool,
    report: Option<RunReport>,
    output: O,
}

impl<O: io::Write> Machine<O> {
    /// Creates a [`Machine`] with the default memory layout.
    pub fn new(output: O) -> Self {
        Self::with_layout(MemoryLayout::default(), output)
    }

    pub fn with_layout(layout: MemoryLayout, output: O) -> Self {
        Self {
            registers: RegisterFile::new(),
            memory: BoundedMemory::new(layout),
            program: Program::default(),
            exception: Exception::Aok,
            is_running: false,
            report: None,
            output,
        }
    }

    /// Restores the freshly created state: zeroed registers and memory, no
    /// program, `AOK` and not running.
    pub fn reset(&mut self) {
        self.registers = RegisterFile::new();
        self.memory = BoundedMemory::new(self.memory.layout());
        self.program = Program::default();
        self.exception = Exception::Aok;
        self.is_running = false;
        self.report = None;
    }

    /// Installs `program` and copies its data to the start of the data
    /// region. Oversized data, or a machine that has stopped and not been
    /// reset, is rejected and leaves the machine untouched.
    pub fn load_program(
        &mut self,
        mut program: Program,
    ) -> Result<(), LoadError> {
        if self.report.is_some() {
            return Err(LoadError::Stopped);
        }
        self.memory.load_initial_data(program.data())?;
        program.rewind();
        debug!(
            instructions = program.len(),
            data = program.data().len(),
            "loaded program"
        );
        self.program = program;
        Ok(())
    }

    /// Loads `program` and runs it to completion.
    pub fn run_program(
        &mut self,
        program: Program,
    ) -> MachineResult<RunReport> {
        self.load_program(program)?;
        self.run()
    }

    /// Runs the [`Machine`] until it raises an exception or the program
    /// exits, then writes the stop report.
    pub fn run(&mut self) -> MachineResult<RunReport> {
        loop {
            if let Some(report) = self.step()? {
                return Ok(report);
            }
        }
    }

    /// Fetches and executes one instruction. Returns the report once the
    /// machine has stopped, and keeps returning it after that.
    pub fn step(&mut self) -> MachineResult<Option<RunReport>> {
        if let Some(report) = self.report {
            return Ok(Some(report));
        }
        self.is_running = true;

        let index = self.program.current_instruction_index();
        let Some(instruction) = self.program.fetch() else {
            warn!(
                index,
                count = self.program.len(),
                "instruction index out of bounds"
            );
            self.raise(Exception::Adr, index)?;
            return Ok(self.report);
        };
        trace!(index, command = instruction.command.name(), "executing");

        self.execute(instruction, index)?;
        // there are no jumps yet, so every instruction falls through
        self.program.advance();

        Ok(self.report)
    }

    fn execute(
        &mut self,
        instruction: Instruction,
        index: InstructionAddress,
    ) -> MachineResult<()> {
        match instruction.command {
            Command::Hlt => self.raise(Exception::Hlt, index),
            Command::MovRI | Command::MovRR => {
                self.execute_mov(instruction, index)
            }
            Command::Syscall => self.execute_syscall(index),
            Command::Nop => self.illegal(index, "no execution case"),
        }
    }

    fn execute_mov(
        &mut self,
        instruction: Instruction,
        index: InstructionAddress,
    ) -> MachineResult<()> {
        let value = match (instruction.command, instruction.register2) {
            (Command::MovRI, _) => Some(instruction.operand1),
            (Command::MovRR, Some(from)) => Some(self.registers[from]),
            _ => None,
        };

        match (instruction.register1, value) {
            (Some(to), Some(value)) => {
                self.registers.set(to, value);
                Ok(())
            }
            _ => self.illegal(index, "missing register operand"),
        }
    }

    fn execute_syscall(
        &mut self,
        index: InstructionAddress,
    ) -> MachineResult<()> {
        let outcome = SyscallContext {
            registers: &self.registers,
            memory: &self.memory,
            output: &mut self.output,
        }
        .dispatch()?;

        match outcome {
            SyscallOutcome::Continue => Ok(()),
            SyscallOutcome::Exit(status) => {
                info!(index, code = status.code(), "program exited");
                self.is_running = false;
                self.report = Some(RunReport {
                    stop: Stop::Exit(status),
                    index,
                });
                Ok(())
            }
            SyscallOutcome::NotHandled => {
                self.illegal(index, "syscall not handled")
            }
            SyscallOutcome::Illegal => {
                self.illegal(index, "bad syscall argument")
            }
            SyscallOutcome::BadAddress(address) => {
                warn!(index, address, "syscall read outside memory");
                self.raise(Exception::Adr, index)
            }
        }
    }

    fn illegal(
        &mut self,
        index: InstructionAddress,
        reason: &str,
    ) -> MachineResult<()> {
        warn!(index, reason, "illegal instruction");
        self.raise(Exception::Ins, index)
    }

    /// Enters the terminal state `exception` and writes the stop report.
    fn raise(
        &mut self,
        exception: Exception,
        index: InstructionAddress,
    ) -> MachineResult<()> {
        info!(index, exception = exception.name(), "machine stopped");
        self.exception = exception;
        self.is_running = false;

        let report = RunReport {
            stop: Stop::Exception(exception),
            index,
        };
        self.report = Some(report);
        writeln!(self.output, "{}", report)?;
        self.output.flush()?;
        Ok(())
    }
}

impl<O> Machine<O> {
    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn flags(&self) -> &[bool; STATUS_FLAG_COUNT] {
        self.registers.flags()
    }

    pub fn memory(&self) -> &BoundedMemory {
        &self.memory
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn instructions(&self) -> &[Instruction] {
        self.program.instructions()
    }

    pub fn current_instruction_index(&self) -> InstructionAddress {
        self.program.current_instruction_index()
    }

    pub fn exception(&self) -> Exception {
        self.exception
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// The report of the last stop, if the machine has stopped.
    pub fn report(&self) -> Option<RunReport> {
        self.report
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn into_output(self) -> O {
        self.output
    }
}

impl Default for Machine<io::Stdout> {
    fn default() -> Self {
        Self::new(io::stdout())
    }
}
