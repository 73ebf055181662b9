mod path_utils;

pub use path_utils::*;

pub use chrono;
pub use indoc;
pub use log;
pub use once_cell;
pub use parking_lot;
pub use pathdiff;
pub use thiserror;
pub use uuid;
pub use walkdir;
