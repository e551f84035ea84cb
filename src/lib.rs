pub mod cli;
pub mod commands;
pub mod juliet;
pub mod utils;
