// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

//! Machine invariants under property testing:
//! 1. MOVRI stores exactly its immediate
//! 2. MOVRR copies without touching the source
//! 3. HLT always halts, whatever the registers hold
//! 4. running off the end of a program is ADR at the program length
//! 5. the stack takes one word less than its capacity and never underflows
//! 6. syscall numbers outside the defined set are always INS

use proptest::prelude::*;
use simplevm::{
    arch::{Word, STACK_CAPACITY},
    instruction::Instruction,
    memory::{BoundedMemory, MemoryError},
    program::Program,
    register::Register,
    syscall::{OutputTarget, Syscall},
    vm::{Exception, Machine, RunReport, Stop},
};

fn register() -> impl Strategy<Value = Register> {
    (0..Register::COUNT).prop_map(|index| {
        Register::from_index(index).expect("index below the register count")
    })
}

fn run(instructions: Vec<Instruction>) -> (Machine<Vec<u8>>, RunReport) {
    let mut machine = Machine::new(vec![]);
    let report = machine
        .run_program(Program::new(instructions, vec![]))
        .expect("writing to a vec cannot fail");
    (machine, report)
}

proptest! {
    #[test]
    fn movri_stores_immediate(to in register(), value in any::<Word>()) {
        let (machine, _) = run(vec![Instruction::movri(to, value), Instruction::hlt()]);
        prop_assert_eq!(value, machine.registers()[to]);
    }

    #[test]
    fn movrr_copies_source(
        to in register(),
        from in register(),
        value in any::<Word>(),
    ) {
        let (machine, _) = run(vec![
            Instruction::movri(from, value),
            Instruction::movrr(to, from),
            Instruction::hlt(),
        ]);
        prop_assert_eq!(value, machine.registers()[to]);
        prop_assert_eq!(value, machine.registers()[from]);
    }

    #[test]
    fn hlt_always_halts(
        seeds in proptest::collection::vec((register(), any::<Word>()), 0..8),
    ) {
        let mut instructions: Vec<Instruction> = seeds
            .iter()
            .map(|&(to, value)| Instruction::movri(to, value))
            .collect();
        instructions.push(Instruction::hlt());
        let halt_index = instructions.len() - 1;

        let (machine, report) = run(instructions);
        prop_assert_eq!(Stop::Exception(Exception::Hlt), report.stop);
        prop_assert_eq!(halt_index, report.index);
        prop_assert!(!machine.is_running());
    }

    #[test]
    fn falling_off_the_end_is_adr(length in 0usize..32) {
        let instructions = vec![Instruction::movri(Register::Ax, 1); length];
        let (machine, report) = run(instructions);
        prop_assert_eq!(Stop::Exception(Exception::Adr), report.stop);
        prop_assert_eq!(length, report.index);
        prop_assert_eq!(Exception::Adr, machine.exception());
    }

    #[test]
    fn unknown_syscalls_are_ins(number in (Syscall::COUNT as Word)..) {
        let (machine, report) = run(vec![
            Instruction::movri(Register::Ax, number),
            Instruction::movri(Register::Bx, OutputTarget::STDIO_TAG),
            Instruction::syscall(),
            Instruction::hlt(),
        ]);
        prop_assert_eq!(Stop::Exception(Exception::Ins), report.stop);
        prop_assert_eq!(2, report.index);
        prop_assert_eq!(Exception::Ins, machine.exception());
    }

    #[test]
    fn stack_round_trips_in_reverse(
        words in proptest::collection::vec(any::<Word>(), 0..STACK_CAPACITY),
    ) {
        let mut memory = BoundedMemory::default();
        let mut pushed = vec![];
        for &word in &words {
            match memory.push(word) {
                Ok(()) => pushed.push(word),
                Err(error) => prop_assert_eq!(MemoryError::StackOverflow, error),
            }
        }
        prop_assert!(pushed.len() < STACK_CAPACITY);

        while let Some(expected) = pushed.pop() {
            prop_assert_eq!(Ok(expected), memory.pop());
        }
        prop_assert_eq!(Err(MemoryError::StackUnderflow), memory.pop());
        prop_assert_eq!(0, memory.stack_top());
    }
}

#[test]
fn stack_capacity_minus_one_pushes() {
    let mut memory = BoundedMemory::default();
    let mut successes = 0;
    while memory.push(successes as Word).is_ok() {
        successes += 1;
    }
    assert_eq!(STACK_CAPACITY - 1, successes);
    assert_eq!(STACK_CAPACITY - 1, memory.stack_top());
}

#[test]
fn end_to_end_print_and_halt() {
    let (machine, report) = run(vec![
        Instruction::movri(Register::Bx, 666),
        Instruction::movrr(Register::Ax, Register::Bx),
        Instruction::movrr(Register::Dx, Register::Ax),
        Instruction::movri(Register::Ax, Syscall::PRINTCHAR_TAG),
        Instruction::movri(Register::Bx, OutputTarget::STDIO_TAG),
        Instruction::movri(Register::Cx, '!' as Word),
        Instruction::syscall(),
        Instruction::hlt(),
    ]);

    assert_eq!(666, machine.registers()[Register::Dx]);
    assert_eq!(Stop::Exception(Exception::Hlt), report.stop);
    assert!(!machine.is_running());
    assert_eq!(
        "!Exception:HLT\nwhen:7\nmachine stopped\n",
        String::from_utf8(machine.into_output()).expect("output is utf-8")
    );
}
