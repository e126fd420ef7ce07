// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

use static_assertions::const_assert;

/// Machine word, used for registers, operands and memory cells alike.
pub type Word = u64;
pub type InstructionAddress = usize;
pub type MemoryAddress = usize;

pub const GENERAL_REGISTER_COUNT: usize = 26;
pub const STATUS_FLAG_COUNT: usize = 2;

pub const DATA_CAPACITY: usize = 128;
const_assert!(DATA_CAPACITY > 0);

pub const STACK_CAPACITY: usize = 128;
const_assert!(STACK_CAPACITY > 0);

/// Reserved; no instruction touches the heap.
pub const HEAP_CAPACITY: usize = 768;

pub const MEMORY_CAPACITY: usize =
    DATA_CAPACITY + STACK_CAPACITY + HEAP_CAPACITY;
const_assert!(MEMORY_CAPACITY == 1024);

/// Upper bound on the words of a configured memory layout.
pub const MAX_MEMORY_CAPACITY: usize = 1 << 20;
const_assert!(MEMORY_CAPACITY <= MAX_MEMORY_CAPACITY);

// registers hold at least 32 bits
const_assert!(Word::BITS >= 32);
