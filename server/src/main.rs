use anyhow::Result;
use axum::Router;
use clap::Parser;
use fragment_core::RateLimitConfig;
use server::{build_app, ServerConfig, DEFAULT_DONATE_URL};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Directory containing all_fragments.json and metadata.json
    #[arg(long, env = "DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
    /// Requests allowed per client and window
    #[arg(long, env = "API_RATE_LIMIT")]
    rate_limit: Option<String>,
    /// Window length in seconds
    #[arg(long, env = "API_RATE_WINDOW")]
    rate_window: Option<String>,
    /// Windows a client may stay idle before its record is dropped (0 keeps forever)
    #[arg(long, env = "API_IDLE_WINDOWS")]
    idle_windows: Option<String>,
    /// Comma separated donor keys
    #[arg(long, env = "DONOR_API_KEYS", default_value = "", hide_env_values = true)]
    donor_keys: String,
    #[arg(long, env = "KOFI_VERIFICATION_TOKEN", hide_env_values = true)]
    kofi_token: Option<String>,
    #[arg(long, env = "API_KEY_SALT", hide_env_values = true)]
    api_key_salt: Option<String>,
    /// Comma separated allowed origins
    #[arg(long, env = "CORS_ALLOW_ORIGIN")]
    cors_allow_origin: Option<String>,
    #[arg(long, env = "DONATE_URL", default_value = DEFAULT_DONATE_URL)]
    donate_url: String,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            data_dir: self.data_dir,
            rate_limit: RateLimitConfig::from_raw(self.rate_limit.as_deref(), self.rate_window.as_deref(), self.idle_windows.as_deref()),
            donor_keys: self.donor_keys,
            kofi_token: self.kofi_token.filter(|t| !t.is_empty()),
            api_key_salt: self.api_key_salt.filter(|s| !s.is_empty()),
            cors_allow_origin: self.cors_allow_origin,
            donate_url: self.donate_url,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let config = args.into_config();
    let app: Router = build_app(&config)?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
