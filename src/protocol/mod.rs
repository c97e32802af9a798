//! # Wire Protocol
//!
//! Every message on a broker connection, in either direction, is one frame:
//!
//! ```text
//! +------+-------------------+----------------------+
//! | 0x61 | length (u32, BE)  | JSON body (length B) |
//! +------+-------------------+----------------------+
//! ```
//!
//! Requests carry a [`Command`]; the server replies with exactly one
//! [`Answer`] per request. A connection may carry any number of
//! request/answer pairs and ends when the client closes it.

pub mod codec;
pub mod message;

pub use codec::{read_frame, read_message, write_message, ProtocolError, FRAME_TYPE_JSON, HEADER_LEN};
pub use message::{Answer, AnswerStatus, Command, CommandError, Request, ResourceField};
