pub mod frame_allocator;
pub mod physical_memory;
