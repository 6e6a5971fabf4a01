//! CLI commands

pub mod init;
pub mod products;
pub mod status;
pub mod watch;
