pub mod config_store;
pub mod fs_util;
pub mod photo_library;
