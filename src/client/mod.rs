pub mod repl;
pub mod session;
