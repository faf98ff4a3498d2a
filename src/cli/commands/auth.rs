use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::access::{Aal, GlobalRole};
use crate::auth::{generate_jwt, token_ttl, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Mint a bearer token signed with the configured JWT_SECRET")]
    Token {
        #[arg(long, help = "User id (random when omitted)")]
        user_id: Option<Uuid>,
        #[arg(long, help = "Email carried in the token")]
        email: String,
        #[arg(long, default_value = "user", help = "Global role: user, admin or super_admin")]
        role: GlobalRole,
        #[arg(long, help = "Mark the session as MFA-verified (aal2)")]
        mfa: bool,
        #[arg(long, help = "Lifetime in hours, at most one year (defaults to SECURITY_JWT_EXPIRY_HOURS)")]
        hours: Option<i64>,
    },
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Token {
            user_id,
            email,
            role,
            mfa,
            hours,
        } => {
            let user_id = user_id.unwrap_or_else(Uuid::new_v4);
            let aal = if mfa { Aal::Aal2 } else { Aal::Aal1 };

            let claims = match hours {
                Some(hours) => Claims::with_expiry(user_id, email, role, aal, token_ttl(hours)),
                None => Claims::new(user_id, email, role, aal),
            };
            let token = generate_jwt(&claims)?;

            match output_format {
                OutputFormat::Json => output_success(
                    &output_format,
                    "Token generated",
                    Some(json!({ "token": token, "user_id": user_id, "expires_at": claims.exp })),
                ),
                OutputFormat::Text => {
                    println!("{}", token);
                    Ok(())
                }
            }
        }
    }
}
