//! Message context flowing through a sequence run.

mod message;

pub use message::{Headers, MessageContext};
