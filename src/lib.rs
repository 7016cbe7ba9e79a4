pub mod record;
pub mod format;
pub mod sink;
pub mod file_sink;
pub mod memory_sink;
pub mod pipeline;
pub mod capture;
pub mod server;

pub mod config;
pub mod init;
