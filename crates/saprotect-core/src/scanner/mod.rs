pub mod path;
pub mod walk;

pub use path::{absolute_target, file_name_of, path_key};
pub use walk::{compile_ignore_patterns, walk_files, WalkItem};
