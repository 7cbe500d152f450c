// handlers/public/mod.rs - Public handlers (no session required)
//
// Sign-in and sign-up, the landing redirect, health and the not-found page.
// Route prefix: none. Middleware: session resolution only, no guard.

pub mod auth;
pub mod home;
