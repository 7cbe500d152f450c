// handlers/protected/mod.rs - Protected handlers (any signed-in user)
//
// Every route here sits behind `require_access` with no role: signed-out
// callers are redirected to /auth, loading sessions get a 503 to retry.
// Role checks for individual actions (lawyer-only writes) happen in the
// page functions and surface as 403.

pub mod billing;
pub mod calendar;
pub mod cases;
pub mod dashboard;
pub mod search;
pub mod settings;
