use once_cell::sync::Lazy;
use std::env;

pub static CONFIG: Lazy<Config> = Lazy::new(Config::new);

const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:8080";

pub struct Config {
    pub server_addr: String,
    // comma separated, empty allows any origin
    pub allowed_origins: Vec<String>,
}

impl Config {
    fn new() -> Self {
        Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| DEFAULT_SERVER_ADDR.to_string()),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}
