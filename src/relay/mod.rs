//! Bidirectional transcription relay.

pub mod frame;
pub mod routes;
pub mod session;
pub mod upstream;
