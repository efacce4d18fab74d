//! Transport adapters.

pub mod ws;

pub use ws::{TunnelIo, decode_frame, encode_frame};
