//! Adapters to the outside world: child processes and the password prompt.

pub mod invoker;
pub mod process;
pub mod prompt;

pub use invoker::{ToolInvoker, ToolOutput};
pub use process::SystemInvoker;
pub use prompt::{NoPrompt, PasswordPrompt, StdinPrompt};
