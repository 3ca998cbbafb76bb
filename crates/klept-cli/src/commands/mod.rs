pub mod bookmark;
pub mod config;
pub mod link;
pub mod settings;
pub mod status;
pub mod sync;
pub mod tag;
