// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

//! Human-readable dumps of machine state.

use std::io;

use crate::{
    instruction::Instruction,
    register::{RegisterFile, StatusFlag},
};

pub const SPLIT_LINE_WIDTH: usize = 20;

pub fn write_split_line(out: &mut impl io::Write) -> io::Result<()> {
    writeln!(out, "{}", "-".repeat(SPLIT_LINE_WIDTH))
}

/// Writes every register as `NAME:value`, tab separated, followed by the
/// flags on the same line.
pub fn dump_registers(
    out: &mut impl io::Write,
    registers: &RegisterFile,
) -> io::Result<()> {
    write_split_line(out)?;
    for (register, value) in registers.iter() {
        write!(out, "{}:{}\t", register, value)?;
    }
    for flag in StatusFlag::ALL {
        write!(out, "{}:{}\t", flag, u8::from(registers.flag(flag)))?;
    }
    writeln!(out)
}

/// Writes one instruction per line.
pub fn dump_instructions(
    out: &mut impl io::Write,
    instructions: &[Instruction],
) -> io::Result<()> {
    write_split_line(out)?;
    for instruction in instructions {
        writeln!(out, "{}", instruction)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{
        diagnostics::{dump_instructions, dump_registers},
        instruction::Instruction,
        register::{Register, RegisterFile, StatusFlag},
    };

    #[test]
    fn register_dump_lists_everything() {
        let mut registers = RegisterFile::new();
        registers.set(Register::Bx, 666);
        registers.set_flag(StatusFlag::Sf, true);

        let mut out = vec![];
        dump_registers(&mut out, &registers).expect("vec write");
        let text = String::from_utf8(out).expect("utf-8");

        assert!(text.starts_with("--------------------\nAX:0\tBX:666\t"));
        assert!(text.ends_with("ZX:0\tZF:0\tSF:1\t\n"));
    }

    #[test]
    fn instruction_dump_one_per_line() {
        let mut out = vec![];
        dump_instructions(
            &mut out,
            &[Instruction::movri(Register::Ax, 1), Instruction::syscall()],
        )
        .expect("vec write");

        assert_eq!(
            "--------------------\nMOVRI\tAX\tNONE\t1\t0\nSYSCALL\tNONE\tNONE\t0\t0\n",
            String::from_utf8(out).expect("utf-8")
        );
    }
}
