//! Reads SPIR-V modules into the data model `autoshader` generates
//! bindings from.
use spirv_headers as spv;

mod build;
mod data;
mod error;
mod testing;
mod view;

pub use build::{parse_bytes, parse_words};
pub use data::{EntryPoint, Module};
pub use error::*;

pub use spv::ExecutionModel;
pub use spv::StorageClass;

pub(crate) fn is_interface_storage(class: spv::StorageClass) -> bool {
    [spv::StorageClass::Input, spv::StorageClass::Output].contains(&class)
}
