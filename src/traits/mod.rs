mod backing_buffer;
mod limited_hash_map;
mod limited_vec;

pub use backing_buffer::*;
pub use limited_hash_map::*;
pub use limited_vec::*;
