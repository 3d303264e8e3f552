pub mod env;
pub mod shell;
