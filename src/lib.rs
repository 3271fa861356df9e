//! Reelcast - HLS movie streaming server
//!
//! Converts a library of video files into HLS once at startup, then serves
//! segments to a capacity-bounded set of concurrent viewing sessions. This
//! library crate exposes the core functionality for integration testing.

pub mod channels;
pub mod config;
pub mod library;
pub mod playback;
pub mod server;
pub mod streaming;
pub mod transcode;
