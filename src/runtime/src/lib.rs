//! Support code for bindings generated by `autoshader`.
//!
//! Generated files refer to this crate by name and re-use its `ash`
//! re-export, so depending on this crate is all a consumer needs.

pub use ash;
pub use memoffset::offset_of;

mod error;
mod padded;
mod parts;
mod pipe;
mod specializer;
mod writer;

pub use error::*;
pub use padded::*;
pub use parts::*;
pub use pipe::*;
pub use specializer::*;
pub use writer::*;
