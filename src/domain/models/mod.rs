mod error;
mod event;
mod generator;
mod history;
mod slash_commands;
mod turn;
mod upload;

pub use error::*;
pub use event::*;
pub use generator::*;
pub use history::*;
pub use slash_commands::*;
pub use turn::*;
pub use upload::*;
