//! I/O: OBJ mesh loading and saving.

mod obj;

pub use obj::{load_obj, save_obj, LoadError};
