//! adrules 命令行
pub mod args;
pub mod commands;
pub mod logging;
