use log::{debug, warn};

use crate::data_type::DataType;
use crate::mmu::{page_span, Mmu};
use crate::modules::frame_allocator::FrameAllocatorModule;
use crate::page_table::PageTable;

/// Reserved variable holding a process's code segment.
pub const TEXT_NAME: &str = "<TEXT>";
/// Reserved variable holding a process's global data segment.
pub const GLOBALS_NAME: &str = "<GLOBALS>";
/// Reserved variable holding a process's stack.
pub const STACK_NAME: &str = "<STACK>";

/// Stack bytes reserved for every new process.
pub const STACK_SIZE: u32 = 65536;

/// Errors surfaced to the command loop. No operation mutates state when it
/// fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    #[error("process not found")]
    ProcessNotFound,
    #[error("variable not found")]
    VariableNotFound,
    #[error("variable already exists")]
    VariableExists,
    #[error("allocation exceeds system memory.")]
    OutOfMemory,
}

/// Coordinates the variable table and the page table.
///
/// Each allocation first looks for a fit inside pages already resident for
/// the process, falls back to a fit anywhere in the address space, then
/// installs whatever page-table entries the placement needs.
pub struct MemoryManager<F: FrameAllocatorModule> {
    mmu: Mmu,
    page_table: PageTable<F>,
}

impl<F: FrameAllocatorModule> MemoryManager<F> {
    pub fn new(max_size: u32, page_table: PageTable<F>) -> Self {
        Self {
            mmu: Mmu::new(max_size),
            page_table,
        }
    }

    pub fn mmu(&self) -> &Mmu {
        &self.mmu
    }

    pub fn page_table(&self) -> &PageTable<F> {
        &self.page_table
    }

    /// Creates a process and allocates its reserved `<TEXT>`, `<GLOBALS>`
    /// and `<STACK>` variables through the ordinary allocate path.
    pub fn create_process(&mut self, text_size: u32, data_size: u32) -> u32 {
        let pid = self.mmu.create_process();

        let reserved = [
            (TEXT_NAME, text_size),
            (GLOBALS_NAME, data_size),
            (STACK_NAME, STACK_SIZE),
        ];
        for (name, size) in reserved {
            if let Err(error) = self.allocate(pid, name, DataType::Char, size) {
                warn!("reserved allocation {} for pid {} failed: {}", name, pid, error);
            }
        }
        pid
    }

    /// Allocates `num_elements` elements of `data_type` on the process heap
    /// and returns the chosen virtual address.
    pub fn allocate(
        &mut self,
        pid: u32,
        name: &str,
        data_type: DataType,
        num_elements: u32,
    ) -> Result<u32, MemoryError> {
        if self.mmu.get_process(pid).is_none() {
            return Err(MemoryError::ProcessNotFound);
        }
        if self.mmu.get_variable(pid, name).is_some() {
            return Err(MemoryError::VariableExists);
        }

        let element_size = data_type.element_size();
        let page_size = self.page_table.get_page_size();
        let array_bytes = element_size as u64 * num_elements as u64;

        // Prefer pages that are already resident for the process.
        let mut placed = None;
        for (_, page) in self.page_table.get_all_pages_for_pid(pid) {
            placed =
                self.mmu
                    .get_free_space_in_page(pid, page, element_size, page_size, num_elements);
            if placed.is_some() {
                break;
            }
        }
        let virtual_address = match placed {
            Some(address) => address,
            None => self
                .mmu
                .get_free_space_anywhere(pid, element_size, page_size, num_elements)
                .ok_or(MemoryError::OutOfMemory)?,
        };

        // Map whatever part of the span is not resident yet.
        let (first_page, last_page) =
            page_span(virtual_address, array_bytes, self.page_table.get_offset_bits());
        for page in first_page..=last_page {
            if !self.page_table.entry_exists(pid, page) {
                self.page_table.add_entry(pid, page);
            }
        }

        self.mmu
            .add_variable_to_process(pid, name, data_type, array_bytes as u32, virtual_address);
        self.mmu.update_free_space(pid, virtual_address, array_bytes as u32);

        debug!(
            "allocated {} ({} bytes) for pid {} at {:#010X}",
            name, array_bytes, pid, virtual_address
        );
        Ok(virtual_address)
    }

    /// Frees the named variable and evicts the pages it occupied alone.
    pub fn free(&mut self, pid: u32, name: &str) -> Result<(), MemoryError> {
        if self.mmu.get_process(pid).is_none() {
            return Err(MemoryError::ProcessNotFound);
        }
        if self.mmu.get_variable(pid, name).is_none() {
            return Err(MemoryError::VariableNotFound);
        }

        // Exclusive pages are computed against the pre-free variable list.
        let exclusive_pages =
            self.mmu
                .get_exclusive_pages(pid, name, self.page_table.get_page_size());

        self.mmu.remove_variable(pid, name);
        for page in exclusive_pages {
            self.page_table.remove_entry(pid, page);
        }
        Ok(())
    }

    /// Destroys the process, its variables and all of its page mappings.
    pub fn terminate(&mut self, pid: u32) -> Result<(), MemoryError> {
        if self.mmu.get_process(pid).is_none() {
            return Err(MemoryError::ProcessNotFound);
        }

        let pages = self.page_table.get_all_pages_for_pid(pid);
        self.mmu.remove_process(pid);
        for (pid, page) in pages {
            self.page_table.remove_entry(pid, page);
        }

        debug!("terminated process {}", pid);
        Ok(())
    }
}
