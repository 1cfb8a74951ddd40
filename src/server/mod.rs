pub mod guard;
pub mod server;
