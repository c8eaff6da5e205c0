//! Patch helpers
//!
//! Utilities for patch bodies: attribute mutators with existence checks,
//! metadata helpers, path lookup, and graph comparison. The engine itself
//! only relies on metadata helpers; the rest exists for patch authors.

pub mod compare;
pub mod functions;
pub mod object;
pub mod path;

pub use compare::{compare, DiffKind, Difference};
pub use functions::{
    change_uid, classname, clean_fields, generate_id, set_classname, set_version, version,
};
pub use object::ObjectHelper;
pub use path::{atom_at, object_at, swap_object_at};
