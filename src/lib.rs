pub mod app;
pub mod auth;
pub mod backend;
pub mod cli;
pub mod config;
pub mod currency;
pub mod error;
pub mod filter;
pub mod guard;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod pages;
pub mod routes;
pub mod session;

pub use app::{router, AppState};
