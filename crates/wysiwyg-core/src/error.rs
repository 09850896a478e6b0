use thiserror::Error;

use crate::dom::DomError;
use crate::plugin::CommandError;
use crate::range::RangeError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("plugin {0:?} does not exist")]
    UnknownPlugin(String),
    #[error("root {0:?} does not exist")]
    UnknownRoot(String),
    #[error("a session needs at least one root")]
    NoRoots,
    #[error("session has been destroyed")]
    Destroyed,
    #[error(transparent)]
    Plugin(#[from] CommandError),
    #[error(transparent)]
    Dom(#[from] DomError),
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error("invalid content: {0}")]
    Content(#[from] serde_json::Error),
}
