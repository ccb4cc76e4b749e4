use log::warn;
use std::path::PathBuf;

/// Bundled linear artifact; set `MODEL_PATH` to serve a real ONNX export.
pub const DEFAULT_MODEL_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/models/demo_linear.json");
pub const DEFAULT_STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Server settings read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub model_path: PathBuf,
    pub static_dir: PathBuf,
    pub cors_origin: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_or(&lookup, "PORT", 8080);
        let workers = parse_or(&lookup, "WORKERS", num_cpus::get()).max(1);

        AppConfig {
            cors_origin: lookup("CORS_ORIGIN").unwrap_or_else(|| format!("http://localhost:{}", port)),
            host,
            port,
            workers,
            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR)),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{}={:?} invalide, valeur par défaut: {}", key, raw, default);
            default
        }),
        None => default,
    }
}
