use crate::modules::frame_allocator::{BTreeFrameAllocatorModule, FrameAllocatorModule};
use crate::mmu::page_span;
use crate::{MemoryManager, Mmu, PageTable};


/// Physical memory of the simulator targets: 64 MiB.
const MEMORY_SIZE: u32 = 67_108_864;

fn get_test_manager(page_size: u32) -> MemoryManager<BTreeFrameAllocatorModule> {
    let page_table = PageTable::new(page_size, BTreeFrameAllocatorModule::new());
    MemoryManager::new(MEMORY_SIZE, page_table)
}

/// Free records of a process as `(virtual_address, size)` pairs, sorted by
/// address.
fn free_records(mmu: &Mmu, pid: u32) -> Vec<(u32, u32)> {
    let mut records: Vec<(u32, u32)> = mmu
        .get_process(pid)
        .unwrap()
        .variables
        .iter()
        .filter(|v| v.is_free_space())
        .map(|v| (v.virtual_address, v.size))
        .collect();
    records.sort_unstable();
    records
}

/// The records of every live process, sorted by address, must partition
/// `[0, max_size)` with no gap and no overlap.
fn check_tiling(mmu: &Mmu) {
    for process in mmu.processes() {
        let mut records: Vec<(u64, u64)> = process
            .variables
            .iter()
            .map(|v| (v.virtual_address as u64, v.size as u64))
            .collect();
        records.sort_unstable();

        let mut cursor = 0u64;
        for (start, size) in records {
            assert_eq!(
                start, cursor,
                "gap or overlap at {:#X} in pid {}",
                start, process.pid
            );
            cursor = start + size;
        }
        assert_eq!(
            cursor,
            mmu.get_max_size() as u64,
            "records of pid {} do not reach the end of the address space",
            process.pid
        );
    }
}

/// No element of any variable may cross a page boundary, and every page a
/// variable spans must be resident.
fn check_no_straddle(manager: &MemoryManager<BTreeFrameAllocatorModule>) {
    let page_size = manager.page_table().get_page_size();
    let offset_bits = manager.page_table().get_offset_bits();

    for process in manager.mmu().processes() {
        for variable in &process.variables {
            if variable.is_free_space() || variable.size == 0 {
                continue;
            }

            // Elements pack without straddling iff the array stays inside
            // one page, or the first page break falls on an element
            // boundary (element sizes divide the power-of-two page size, so
            // every later break does too).
            let element_size = variable.data_type.element_size();
            let (root, end) = page_span(variable.virtual_address, variable.size as u64, offset_bits);
            let space_in_page = page_size - variable.virtual_address % page_size;
            assert!(
                root == end || space_in_page % element_size == 0,
                "{} of pid {} straddles a page boundary",
                variable.name,
                process.pid
            );

            for page in root..=end {
                assert!(
                    manager.page_table().entry_exists(process.pid, page),
                    "page {} of {} (pid {}) is not resident",
                    page,
                    variable.name,
                    process.pid
                );
            }
        }
    }
}

/// Physical frames must be uniquely owned by one `(pid, page)` pair.
fn check_frame_uniqueness(manager: &MemoryManager<BTreeFrameAllocatorModule>) {
    let mut frames: Vec<u32> = manager.page_table().frames().collect();
    frames.sort_unstable();
    let total = frames.len();
    frames.dedup();
    assert_eq!(frames.len(), total, "a frame is mapped twice");
}

fn check_all_invariants(manager: &MemoryManager<BTreeFrameAllocatorModule>) {
    check_tiling(manager.mmu());
    check_no_straddle(manager);
    check_frame_uniqueness(manager);
}
