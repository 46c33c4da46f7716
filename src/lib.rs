#![cfg_attr(not(feature = "std"), no_std)]
extern crate alloc;

pub mod format;
#[cfg(feature = "std")]
pub mod ops;
mod traits;

pub use traits::*;
