mod classify;
mod commands;
mod content;
mod dispatch;
mod dom;
mod error;
mod events;
mod frame;
mod history;
mod options;
mod plugin;
mod range;
mod reset;
mod selection;
mod session;
mod shortcuts;
mod toolbar;

pub use crate::classify::*;
pub use crate::content::*;
pub use crate::dom::*;
pub use crate::error::*;
pub use crate::events::*;
pub use crate::frame::*;
pub use crate::history::*;
pub use crate::options::*;
pub use crate::plugin::*;
pub use crate::range::*;
pub use crate::selection::*;
pub use crate::session::*;
pub use crate::shortcuts::*;
pub use crate::toolbar::*;
