//! CLI command handling

pub mod init;
pub mod input;
pub mod output;
pub mod send;
pub mod validate;

pub use init::*;
pub use input::*;
pub use output::*;
pub use send::*;
pub use validate::*;
