// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

use std::{fs, io, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use simplevm::{
    arch::{DATA_CAPACITY, HEAP_CAPACITY, STACK_CAPACITY},
    asm, diagnostics,
    memory::MemoryLayout,
    syscall::ExitStatus,
    vm::{Exception, Machine, RunReport, Stop},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "simplevm")]
#[command(about = "Assembles and runs a simplevm program", long_about = None)]
struct Args {
    /// Program source with a `section data` and a `section text`
    path: PathBuf,

    /// Words in the data region
    #[arg(long, default_value_t = DATA_CAPACITY)]
    data_capacity: usize,

    /// Words in the stack region
    #[arg(long, default_value_t = STACK_CAPACITY)]
    stack_capacity: usize,

    /// Words in the heap region
    #[arg(long, default_value_t = HEAP_CAPACITY)]
    heap_capacity: usize,

    /// Give up after executing this many instructions
    #[arg(long)]
    max_steps: Option<u64>,

    /// Dump the registers after the run
    #[arg(long, action = ArgAction::SetTrue)]
    dump_registers: bool,

    /// Dump the loaded instructions after the run
    #[arg(long, action = ArgAction::SetTrue)]
    dump_instructions: bool,

    /// Log more (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let source = fs::read_to_string(&args.path)
        .with_context(|| format!("failed to read {}", args.path.display()))?;
    let program = asm::parse(&source)
        .with_context(|| format!("failed to assemble {}", args.path.display()))?;
    let layout = MemoryLayout::new(
        args.data_capacity,
        args.stack_capacity,
        args.heap_capacity,
    )
    .context("invalid memory layout")?;

    let mut machine = Machine::with_layout(layout, io::stdout());
    machine
        .load_program(program)
        .with_context(|| format!("failed to load {}", args.path.display()))?;
    info!(path = %args.path.display(), "running");

    let report = match args.max_steps {
        Some(budget) => run_bounded(&mut machine, budget)?,
        None => Some(machine.run()?),
    };

    let mut stdout = io::stdout().lock();
    if args.dump_registers {
        diagnostics::dump_registers(&mut stdout, machine.registers())?;
    }
    if args.dump_instructions {
        diagnostics::dump_instructions(&mut stdout, machine.instructions())?;
    }

    Ok(ExitCode::from(exit_status(report)))
}

/// Steps `machine` at most `budget` times; `None` if it is still running.
fn run_bounded<O: io::Write>(
    machine: &mut Machine<O>,
    budget: u64,
) -> Result<Option<RunReport>> {
    for _ in 0..budget {
        if let Some(report) = machine.step()? {
            return Ok(Some(report));
        }
    }
    warn!(
        budget,
        index = machine.current_instruction_index(),
        "instruction budget exhausted"
    );
    Ok(None)
}

/// Status of the process: `None` means the budget ran out first.
fn exit_status(report: Option<RunReport>) -> u8 {
    match report.map(|report| report.stop) {
        Some(Stop::Exit(ExitStatus::SUCCESS))
        | Some(Stop::Exception(Exception::Hlt)) => 0,
        Some(Stop::Exit(_)) => 1,
        Some(Stop::Exception(_)) => 2,
        None => 3,
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
