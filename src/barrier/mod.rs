//! Barrier support: the colored-pointer ABI and the load barrier built on it.

pub mod colored_ptr;
pub mod load_barrier;

pub use colored_ptr::{Color, ColoredPointer};
pub use load_barrier::fix_pointer;
