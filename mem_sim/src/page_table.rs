use std::collections::BTreeMap;
use std::io::{self, Write};

use log::trace;

use crate::modules::frame_allocator::FrameAllocatorModule;

/// Maps `(pid, virtual page)` pairs to physical frames.
///
/// The map is kept in numeric `(pid, page)` order, which is both the
/// iteration order of `get_all_pages_for_pid` and the required print order.
/// Frame selection is delegated to the injected allocator module, whose
/// contract is lowest-free-frame.
pub struct PageTable<F: FrameAllocatorModule> {
    page_size: u32,
    offset_bits: u32,
    entries: BTreeMap<(u32, u32), u32>,
    frame_allocator: F,
}

impl<F: FrameAllocatorModule> PageTable<F> {
    /// `page_size` must be a power of two.
    pub fn new(page_size: u32, frame_allocator: F) -> Self {
        assert!(
            page_size.is_power_of_two(),
            "page size {} is not a power of two",
            page_size
        );

        Self {
            page_size,
            offset_bits: page_size.trailing_zeros(),
            entries: BTreeMap::new(),
            frame_allocator,
        }
    }

    pub fn get_page_size(&self) -> u32 {
        self.page_size
    }

    pub fn get_offset_bits(&self) -> u32 {
        self.offset_bits
    }

    /// Maps `(pid, page_number)` to the lowest free frame.
    ///
    /// Mapping a key that is already present keeps the existing frame.
    pub fn add_entry(&mut self, pid: u32, page_number: u32) {
        if self.entries.contains_key(&(pid, page_number)) {
            return;
        }

        let frame = self.frame_allocator.allocate_frame();
        trace!("mapped pid {} page {} -> frame {}", pid, page_number, frame);
        self.entries.insert((pid, page_number), frame);
    }

    pub fn entry_exists(&self, pid: u32, page_number: u32) -> bool {
        self.entries.contains_key(&(pid, page_number))
    }

    /// Resolves a virtual address, or `None` when its page is not mapped.
    pub fn get_physical_address(&self, pid: u32, virtual_address: u32) -> Option<u64> {
        let page_number = virtual_address >> self.offset_bits;
        let offset = virtual_address & (self.page_size - 1);

        let frame = *self.entries.get(&(pid, page_number))?;
        Some(frame as u64 * self.page_size as u64 + offset as u64)
    }

    /// Unmaps the entry and returns its frame to the allocator.
    pub fn remove_entry(&mut self, pid: u32, page_number: u32) {
        if let Some(frame) = self.entries.remove(&(pid, page_number)) {
            trace!("unmapped pid {} page {} (frame {})", pid, page_number, frame);
            self.frame_allocator.release_frame(frame);
        }
    }

    /// Every mapped `(pid, page)` key of the process, in ascending page order.
    pub fn get_all_pages_for_pid(&self, pid: u32) -> Vec<(u32, u32)> {
        self.entries
            .range((pid, 0)..=(pid, u32::MAX))
            .map(|(key, _)| *key)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn frames(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.values().copied()
    }

    /// Writes the page table rows in numeric `(pid, page)` order.
    pub fn write_table<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, " PID  | Page Number | Frame Number")?;
        writeln!(out, "------+-------------+--------------")?;
        for ((pid, page_number), frame) in &self.entries {
            writeln!(out, "{:>6}|{:>13}|{:>14}", pid, page_number, frame)?;
        }
        Ok(())
    }
}
