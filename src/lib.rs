#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod docker;
pub mod error;
pub mod project;
pub mod render;
pub mod tools;
pub mod utils;
