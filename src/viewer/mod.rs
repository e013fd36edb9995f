//! Binary event protocol for streaming optimization progress to a viewer.

mod protocol;

pub use protocol::{EventCode, ImagePane, Message, ProtocolError};
