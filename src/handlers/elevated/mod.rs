// handlers/elevated/mod.rs - Elevated handlers (administrators only)
//
// Routes here sit behind `require_access` with `Role::Admin`. A signed-in
// user short of the role is redirected to /dashboard, never shown an error.

pub mod admin;
pub mod clients;
