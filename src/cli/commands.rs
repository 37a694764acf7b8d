use crate::config::AppConfig;
use crate::echo::{EchoService, ECHO_SERVICE_ID};
use crate::registry::ServiceContainer;
use crate::resolver::RouteResolver;
use crate::server::HttpServer;
use crate::security::Authenticator;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Command-line interface for brrtresolver
#[derive(Parser)]
#[command(name = "brrtresolver")]
#[command(about = "Reflective-style HTTP request resolver", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Serve the built-in echo service
    Serve {
        /// Path to the YAML configuration file
        #[arg(short, long, env = "BRRTR_CONFIG")]
        config: PathBuf,

        /// Bind address; overrides `http.addr`
        #[arg(long)]
        addr: Option<String>,
    },
    /// Issue a JWT with the configured secret
    Token {
        /// Path to the YAML configuration file
        #[arg(short, long, env = "BRRTR_CONFIG")]
        config: PathBuf,

        /// User id carried by the token
        #[arg(long)]
        user_id: i64,

        /// Role held by the user (repeatable)
        #[arg(long = "role")]
        roles: Vec<i64>,

        /// Lifetime in minutes; defaults to `security.jwt.expiration_minutes`
        #[arg(long)]
        minutes: Option<i64>,
    },
    /// List the routes of the built-in services in resolution order
    Routes,
}

/// Registry holding the built-in services.
#[must_use]
pub fn builtin_services() -> ServiceContainer {
    ServiceContainer::new().with_service(ECHO_SERVICE_ID, Arc::new(EchoService))
}

/// Resolver over the built-in services, authenticated as configured.
pub fn build_resolver(config: &AppConfig) -> Result<RouteResolver> {
    let resolver = RouteResolver::new(builtin_services());
    Ok(match config.authenticator()? {
        Some(auth) => resolver.with_authenticator(Arc::new(auth) as Arc<dyn Authenticator>),
        None => resolver,
    })
}

/// One line per route: `service  VERB /path  -> handler [auth]`.
#[must_use]
pub fn route_table(resolver: &RouteResolver) -> Vec<String> {
    resolver
        .routes()
        .into_iter()
        .map(|(service, spec)| {
            let auth = match &spec.auth {
                Some(req) if req.required_roles().is_empty() => " [auth]".to_string(),
                Some(req) => format!(" [auth roles={:?}]", req.required_roles()),
                None => String::new(),
            };
            format!("{service:<10} {:<20} -> {}{auth}", spec.route.to_string(), spec.name)
        })
        .collect()
}

/// Execute a parsed command line.
pub fn run_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve { config, addr } => {
            let config = AppConfig::load(&config)?;
            let addr = addr.unwrap_or_else(|| config.http.addr.clone());
            let resolver = build_resolver(&config)?;
            for line in route_table(&resolver) {
                info!(route = %line, "Route registered");
            }
            let handle = HttpServer::new(resolver)
                .max_body_bytes(config.http.max_body_bytes)
                .start(addr.as_str())
                .with_context(|| format!("Failed to bind {addr}"))?;
            handle
                .join()
                .map_err(|e| anyhow!("server thread panicked: {e:?}"))
        }
        Commands::Token {
            config,
            user_id,
            roles,
            minutes,
        } => {
            let config = AppConfig::load(&config)?;
            let auth = config
                .authenticator()?
                .ok_or_else(|| anyhow!("no security.jwt section configured"))?;
            let token = match minutes {
                Some(m) => auth.generate_token_with_expiry(user_id, roles, m),
                None => auth.generate_token(user_id, roles),
            }
            .context("Failed to sign token")?;
            println!("{token}");
            Ok(())
        }
        Commands::Routes => {
            let resolver = RouteResolver::new(builtin_services());
            for line in route_table(&resolver) {
                println!("{line}");
            }
            Ok(())
        }
    }
}
