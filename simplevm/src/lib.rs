// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

#![forbid(unsafe_code)]

pub mod arch;
pub mod asm;
pub mod diagnostics;
pub mod instruction;
pub mod memory;
pub mod program;
pub mod register;
pub mod syscall;
pub mod vm;
