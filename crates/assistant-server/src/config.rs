use std::env;
use std::net::SocketAddr;

/// Loads `.env` into the process environment, if present.
pub fn init_env() {
    dotenvy::dotenv().ok();
}

/// Runtime configuration for the assistant server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Socket address the HTTP listener binds to.
    pub bind_addr: SocketAddr,
}

impl ServerConfig {
    /// Builds a config from environment variables.
    ///
    /// `MEALFLOW_BIND_ADDR` overrides the default `127.0.0.1:8787`.
    pub fn from_env() -> Self {
        let bind_addr = env::var("MEALFLOW_BIND_ADDR")
            .ok()
            .and_then(|raw| match raw.parse() {
                Ok(addr) => Some(addr),
                Err(_) => {
                    tracing::error!(value = %raw, "invalid MEALFLOW_BIND_ADDR, using default");
                    None
                }
            })
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8787)));
        Self { bind_addr }
    }
}
