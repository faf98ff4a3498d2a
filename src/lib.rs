pub mod access;
pub mod audit;
pub mod auth;
pub mod cli;
pub mod compliance;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod kanban;
pub mod middleware;
pub mod router;
pub mod services;
pub mod state;
pub mod types;

#[cfg(test)]
pub mod testing;
