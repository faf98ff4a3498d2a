// handlers/client/mod.rs - Client-scoped handlers
//
// Every route here lives under /api/clients/:client_id and runs after the
// access guard has resolved the caller's membership role. Editor, premium
// and MFA requirements are attached per route in router.rs.

pub mod board;
pub mod compliance;
pub mod controls;
pub mod evidence;
pub mod members;
pub mod overview;
pub mod security;
