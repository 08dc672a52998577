use clap::Args;
use serde_json::json;

use crate::auth::{generate_jwt, Claims};
use crate::cli::output::output_success;
use crate::cli::OutputFormat;
use crate::config;
use crate::types::Role;

#[derive(Args, Debug)]
pub struct TokenArgs {
    #[arg(long, help = "User id to embed as the token subject")]
    pub user_id: i64,

    #[arg(long, default_value = "student", help = "Role: student or admin")]
    pub role: String,

    #[arg(long, help = "Lifetime in hours (defaults to SECURITY_JWT_EXPIRY_HOURS)")]
    pub hours: Option<u64>,
}

pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let role: Role = args.role.parse()?;
    let security = &config::config().security;
    let hours = args.hours.unwrap_or(security.jwt_expiry_hours);

    let claims = Claims::new(args.user_id, role, hours);
    let token = generate_jwt(&claims, &security.jwt_secret)?;

    match output_format {
        OutputFormat::Json => output_success(
            output_format,
            "Token issued",
            Some(json!({
                "token": token,
                "user_id": args.user_id,
                "role": role,
                "expires_at": claims.exp,
            })),
            &[],
        ),
        OutputFormat::Text => {
            // bare token so it can be captured by shell substitution
            println!("{}", token);
            Ok(())
        }
    }
}
