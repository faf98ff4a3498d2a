// handlers/mod.rs - Tiered handler layout
//
// Public (no identity) → Protected (identity) → Client (tenant membership,
// optionally editor / premium / MFA) → Elevated (global admin role).
// The tier of each route is enforced in router.rs; handlers read the
// resulting AccessContext and never repeat the tier checks.

pub mod client;
pub mod elevated;
pub mod protected;
pub mod public;

use crate::access::{AccessContext, ClientId, Identity};
use crate::error::ApiError;

/// Identity and client id of a client-scoped call
pub(crate) fn scoped(ctx: &AccessContext) -> Result<(&Identity, ClientId), ApiError> {
    Ok((ctx.identity()?, ctx.client_id()?))
}
