//! Generates Vulkan host bindings from shader reflection data.
//!
//! Given one or more reflected shader modules, this crate lays out
//! every buffer struct to match its declared offsets, merges structs
//! shared between modules, builds the combined descriptor-set and
//! push-constant tables, and renders it all as a Rust source file that
//! builds on `autoshader-runtime`.

mod catalog;
mod descriptor;
mod emit;
mod error;
pub mod layout;
mod options;
mod push;
mod reflect;
mod specialize;
mod stage;
mod testing;
mod vertex;

pub use catalog::*;
pub use descriptor::*;
pub use emit::*;
pub use error::*;
pub use layout::{sanitize, scalar_name, Field, HostType, Layout, NameMap, StructDecl};
pub use options::*;
pub use push::*;
pub use reflect::*;
pub use specialize::*;
pub use stage::*;
pub use vertex::*;
