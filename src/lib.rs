//! framecast: renders frames locally and streams them to a websocket render
//! endpoint under a single-slot send-then-wait gate — a new frame (or stereo
//! pair) only goes out once the peer has acknowledged the previous one.

pub mod config;
pub mod frame;
pub mod gate;
pub mod protocol;
pub mod source;
pub mod streamer;
