// handlers/protected/mod.rs - Protected handlers (identity required, no client scope)

pub mod auth;
pub mod clients;
