//! Request handlers, grouped the same way as the routers in `routes`.

pub mod admin;
pub mod login;
pub mod public;
