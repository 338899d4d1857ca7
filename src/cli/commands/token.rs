use clap::Args;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims};
use crate::cli::OutputFormat;
use crate::config;

#[derive(Debug, Args)]
pub struct TokenArgs {
    #[arg(long, help = "Principal id (the `sub` claim)")]
    pub user_id: Uuid,

    #[arg(long, help = "Principal email")]
    pub email: String,

    #[arg(long, help = "Lifetime in hours (defaults to the configured expiry)")]
    pub hours: Option<u64>,
}

pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config::config();
    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set to mint tokens");
    }

    let hours = args.hours.unwrap_or(config.security.jwt_expiry_hours);
    let claims = Claims::new(args.user_id, &args.email, hours);
    let token = generate_jwt(&claims, &config.security.jwt_secret)?;

    match output_format {
        OutputFormat::Json => {
            let out = json!({
                "token": token,
                "user_id": args.user_id,
                "email": claims.email,
                "expires_at": claims.exp,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => println!("{}", token),
    }
    Ok(())
}
