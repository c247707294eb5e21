// src/control/mod.rs

//! Package records, descriptions and control templates

mod description;
mod package;
mod template;

pub use description::{wrap, Description, WRAP_WIDTH};
pub use package::{FieldValue, Package, PackageList, FIELD_ORDER, MERGED_FIELDS};
pub use template::{process_package, process_packages, read_control, substitute, Templates};
