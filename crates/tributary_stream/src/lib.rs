//! Wire protocol and stream lifecycle for Tributary.
//!
//! The service renders completion deltas as Server-Sent Events:
//!
//! ```text
//! data: {"content":"<token text>"}   zero or more
//! data: {"done":true}                exactly one, on success
//! data: {"error":"<message>"}        exactly one, on failure
//! ```
//!
//! - [`FrameEncoder`] turns a provider delta stream into [`StreamFrame`]s on the server.
//! - [`FrameDecoder`] rebuilds frames from arbitrarily chunked bytes on the client.
//! - [`StreamController`] applies decoded frames to an observable [`StreamSnapshot`].
//! - [`StreamClient`] and [`StreamSession`] drive the endpoint over HTTP.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod controller;
mod decoder;
mod encoder;
mod frame;
mod line_buffer;

pub use client::{ByteStream, GENERATE_PATH, PRINCIPAL_HEADER, StreamClient, StreamSession};
pub use controller::{StreamController, StreamSnapshot, StreamState};
pub use decoder::{FrameDecoder, UNEXPECTED_END_MESSAGE};
pub use encoder::{EncoderObserver, EncoderOutcome, FrameEncoder};
pub use frame::{DATA_PREFIX, StreamFrame};
pub use line_buffer::LineBuffer;
