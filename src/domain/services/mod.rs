mod conversation;
mod retry;

pub use conversation::*;
pub use retry::*;
