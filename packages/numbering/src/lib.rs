// ABOUTME: Identifier allocation for change documents
// ABOUTME: Produces <TYPE>-<YY>-<NNN> numbers from an atomic per-key counter

pub mod allocator;
pub mod number;

pub use allocator::{AllocationError, SequenceAllocator, SequenceKey, DEFAULT_MAX_ATTEMPTS};
pub use number::{format_number, two_digit_year};
