//! Request handlers.

pub mod channels;
pub mod health;
pub mod jobs;
