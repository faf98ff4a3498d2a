use clap::Subcommand;

use crate::cli::OutputFormat;
use crate::config::config;

#[derive(Subcommand)]
pub enum ConfigCommands {
    #[command(about = "Print the effective configuration (secrets omitted)")]
    Show,
}

pub async fn handle(cmd: ConfigCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let config = config();

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
                OutputFormat::Text => {
                    println!("environment:     {:?}", config.environment);
                    println!("port:            {}", config.api.port);
                    println!("max connections: {}", config.database.max_connections);
                    println!("run migrations:  {}", config.database.run_migrations);
                    println!("cors enabled:    {}", config.security.enable_cors);
                    println!("cors origins:    {}", config.security.cors_origins.join(", "));
                    println!("jwt expiry:      {}h", config.security.jwt_expiry_hours);
                }
            }
            Ok(())
        }
    }
}
