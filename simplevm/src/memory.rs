// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

use std::{fmt, ops::Range};

use enum_tags::enum_tags;
use thiserror::Error;

use crate::arch::{
    MemoryAddress, Word, DATA_CAPACITY, HEAP_CAPACITY, MAX_MEMORY_CAPACITY,
    STACK_CAPACITY,
};

/// A contiguous range of [`BoundedMemory`], laid out in tag order.
#[enum_tags(public, repr(u8))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Region {
    Data,
    Stack,
    Heap,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    #[error("address {index} is outside memory of {capacity} words")]
    OutOfBounds {
        index: MemoryAddress,
        capacity: usize,
    },
    #[error("stack overflow")]
    StackOverflow,
    #[error("stack underflow")]
    StackUnderflow,
    #[error("{len} data words do not fit in a data region of {capacity} words")]
    DataTooLarge { len: usize, capacity: usize },
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LayoutError {
    #[error("the {0} region must not be empty")]
    EmptyRegion(Region),
    #[error("memory layout exceeds {max} words")]
    TooLarge { max: usize },
}

/// Capacity in words of each region. The total never exceeds
/// [`MAX_MEMORY_CAPACITY`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryLayout {
    data: usize,
    stack: usize,
    heap: usize,
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self {
            data: DATA_CAPACITY,
            stack: STACK_CAPACITY,
            heap: HEAP_CAPACITY,
        }
    }
}

impl MemoryLayout {
    pub fn new(
        data: usize,
        stack: usize,
        heap: usize,
    ) -> Result<Self, LayoutError> {
        if data == 0 {
            return Err(LayoutError::EmptyRegion(Region::Data));
        }
        if stack == 0 {
            return Err(LayoutError::EmptyRegion(Region::Stack));
        }
        data.checked_add(stack)
            .and_then(|total| total.checked_add(heap))
            .filter(|&total| total <= MAX_MEMORY_CAPACITY)
            .ok_or(LayoutError::TooLarge {
                max: MAX_MEMORY_CAPACITY,
            })?;
        Ok(Self { data, stack, heap })
    }

    pub const fn data_capacity(&self) -> usize {
        self.data
    }

    pub const fn stack_capacity(&self) -> usize {
        self.stack
    }

    pub const fn heap_capacity(&self) -> usize {
        self.heap
    }

    pub const fn capacity(&self) -> usize {
        self.data + self.stack + self.heap
    }

    pub const fn region(&self, region: Region) -> Range<MemoryAddress> {
        match region {
            Region::Data => 0..self.data,
            Region::Stack => self.data..self.data + self.stack,
            Region::Heap => self.data + self.stack..self.capacity(),
        }
    }
}

/// A fixed block of words split into data, stack and heap regions.
///
/// Every access is bounds checked. The stack grows upward from the start of
/// its region and its top always stays below the stack capacity, so it can
/// never spill into the heap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundedMemory {
    cells: Box<[Word]>,
    layout: MemoryLayout,
    stack_top: usize,
}

impl Default for BoundedMemory {
    fn default() -> Self {
        Self::new(MemoryLayout::default())
    }
}

impl BoundedMemory {
    pub fn new(layout: MemoryLayout) -> Self {
        Self {
            cells: vec![0; layout.capacity()].into_boxed_slice(),
            layout,
            stack_top: 0,
        }
    }

    pub fn layout(&self) -> MemoryLayout {
        self.layout
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Occupied stack slots, counted from the start of the stack region.
    pub fn stack_top(&self) -> usize {
        self.stack_top
    }

    pub fn region(&self, region: Region) -> &[Word] {
        &self.cells[self.layout.region(region)]
    }

    pub fn read(&self, index: MemoryAddress) -> Result<Word, MemoryError> {
        self.cells
            .get(index)
            .copied()
            .ok_or(self.out_of_bounds(index))
    }

    pub fn write(
        &mut self,
        index: MemoryAddress,
        word: Word,
    ) -> Result<(), MemoryError> {
        let error = self.out_of_bounds(index);
        let cell = self.cells.get_mut(index).ok_or(error)?;
        *cell = word;
        Ok(())
    }

    /// Pushes `word`, leaving the memory untouched on overflow.
    pub fn push(&mut self, word: Word) -> Result<(), MemoryError> {
        if self.stack_top + 1 >= self.layout.stack_capacity() {
            return Err(MemoryError::StackOverflow);
        }
        let slot = self.layout.region(Region::Stack).start + self.stack_top;
        self.cells[slot] = word;
        self.stack_top += 1;
        Ok(())
    }

    /// Pops the most recently pushed word, leaving the memory untouched on
    /// underflow.
    pub fn pop(&mut self) -> Result<Word, MemoryError> {
        if self.stack_top == 0 {
            return Err(MemoryError::StackUnderflow);
        }
        self.stack_top -= 1;
        let slot = self.layout.region(Region::Stack).start + self.stack_top;
        Ok(self.cells[slot])
    }

    /// Copies `data` to the start of the data region. Data that does not fit
    /// is rejected whole; nothing is written.
    pub fn load_initial_data(
        &mut self,
        data: &[Word],
    ) -> Result<(), MemoryError> {
        let capacity = self.layout.data_capacity();
        if data.len() > capacity {
            return Err(MemoryError::DataTooLarge {
                len: data.len(),
                capacity,
            });
        }
        self.cells[..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn out_of_bounds(&self, index: MemoryAddress) -> MemoryError {
        MemoryError::OutOfBounds {
            index,
            capacity: self.cells.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        arch::{
            DATA_CAPACITY, MAX_MEMORY_CAPACITY, MEMORY_CAPACITY, STACK_CAPACITY,
        },
        memory::{BoundedMemory, LayoutError, MemoryError, MemoryLayout, Region},
    };

    #[test]
    fn default_layout_partitions_memory() {
        let layout = MemoryLayout::default();
        assert_eq!(MEMORY_CAPACITY, layout.capacity());
        assert_eq!(0..128, layout.region(Region::Data));
        assert_eq!(128..256, layout.region(Region::Stack));
        assert_eq!(256..1024, layout.region(Region::Heap));
    }

    #[test]
    fn empty_regions_are_rejected() {
        assert!(MemoryLayout::new(0, 1, 1).is_err());
        assert!(MemoryLayout::new(1, 0, 1).is_err());
        assert!(MemoryLayout::new(1, 1, 0).is_ok());
    }

    #[test]
    fn oversized_layouts_are_rejected() {
        let too_large = Err(LayoutError::TooLarge {
            max: MAX_MEMORY_CAPACITY,
        });
        assert_eq!(too_large, MemoryLayout::new(usize::MAX, 1, 1));
        assert_eq!(too_large, MemoryLayout::new(1, usize::MAX, 0));
        assert_eq!(too_large, MemoryLayout::new(1, 1, MAX_MEMORY_CAPACITY));

        let largest = MemoryLayout::new(1, 1, MAX_MEMORY_CAPACITY - 2)
            .expect("layout at the limit is valid");
        assert_eq!(MAX_MEMORY_CAPACITY, largest.capacity());
    }

    #[test]
    fn read_write_are_bounds_checked() {
        let mut memory = BoundedMemory::default();
        memory.write(1023, 7).expect("last cell is addressable");
        assert_eq!(Ok(7), memory.read(1023));

        let error = MemoryError::OutOfBounds {
            index: 1024,
            capacity: MEMORY_CAPACITY,
        };
        assert_eq!(Err(error), memory.read(1024));
        assert_eq!(Err(error), memory.write(1024, 1));
    }

    #[test]
    fn stack_keeps_last_slot_free() {
        let mut memory = BoundedMemory::default();
        for value in 0..(STACK_CAPACITY as u64 - 1) {
            memory.push(value).expect("stack has room");
        }
        assert_eq!(STACK_CAPACITY - 1, memory.stack_top());
        assert_eq!(Err(MemoryError::StackOverflow), memory.push(99));
        assert_eq!(STACK_CAPACITY - 1, memory.stack_top());
        assert_eq!(0, memory.region(Region::Heap)[0]);

        assert_eq!(Ok(STACK_CAPACITY as u64 - 2), memory.pop());
    }

    #[test]
    fn pop_on_empty_stack_fails() {
        let mut memory = BoundedMemory::default();
        assert_eq!(Err(MemoryError::StackUnderflow), memory.pop());
        assert_eq!(0, memory.stack_top());

        memory.push(5).expect("stack has room");
        assert_eq!(Ok(5), memory.pop());
        assert_eq!(Err(MemoryError::StackUnderflow), memory.pop());
    }

    #[test]
    fn stack_writes_into_its_own_region() {
        let mut memory = BoundedMemory::default();
        memory.push(11).expect("stack has room");
        assert_eq!(11, memory.region(Region::Stack)[0]);
        assert!(memory.region(Region::Data).iter().all(|&word| word == 0));
    }

    #[test]
    fn initial_data_lands_in_data_region() {
        let mut memory = BoundedMemory::default();
        memory.load_initial_data(&[72, 105, 0]).expect("data fits");
        assert_eq!(&[72, 105, 0], &memory.region(Region::Data)[..3]);

        let oversized = vec![1; DATA_CAPACITY + 1];
        assert_eq!(
            Err(MemoryError::DataTooLarge {
                len: DATA_CAPACITY + 1,
                capacity: DATA_CAPACITY
            }),
            memory.load_initial_data(&oversized)
        );
        assert_eq!(0, memory.region(Region::Data)[3]);
    }
}
