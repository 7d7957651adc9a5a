//! Filesystem utilities for lockstep.
//!
//! The coordination root is the only shared state between agents, so every
//! record goes through the atomic helpers here.

pub mod atomic;
mod key;

pub use atomic::{Exclusive, atomic_write, atomic_write_file, create_exclusive};
pub use key::encode_key;
