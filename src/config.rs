use std::{net, time};

use serde::Deserialize;

#[derive(Deserialize)]
pub struct Config {
    pub db: Db,
    pub http: Http,
    #[serde(default)]
    pub log: Log,
}

#[derive(Deserialize)]
pub struct Db {
    pub url: String,
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: time::Duration,
}

fn default_connect_timeout() -> time::Duration {
    time::Duration::from_secs(5)
}

#[derive(Deserialize)]
pub struct Http {
    pub server: Server,
    pub cors: Cors,
}

#[derive(Deserialize)]
pub struct Server {
    pub addr: net::SocketAddr,
}

#[derive(Deserialize)]
pub struct Cors {
    pub allowed_origins: Vec<String>,
}

#[derive(Deserialize)]
pub struct Log {
    /// Used as the `EnvFilter` directive when `RUST_LOG` is not set.
    pub filter: String,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config = toml::from_str::<Config>(
            r#"
            [db]
            url = "postgres://localhost/test"
            connect_timeout = "2s 500ms"

            [http.server]
            addr = "127.0.0.1:3000"

            [http.cors]
            allowed_origins = ["http://example.com"]

            [log]
            filter = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.db.url, "postgres://localhost/test");
        assert_eq!(config.db.connect_timeout, time::Duration::from_millis(2500));
        assert_eq!(config.http.server.addr.port(), 3000);
        assert_eq!(config.http.cors.allowed_origins, ["http://example.com"]);
        assert_eq!(config.log.filter, "debug");
    }

    #[test]
    fn fills_optional_sections() {
        let config = toml::from_str::<Config>(
            r#"
            [db]
            url = "postgres://localhost/test"

            [http.server]
            addr = "127.0.0.1:3000"

            [http.cors]
            allowed_origins = []
            "#,
        )
        .unwrap();

        assert_eq!(config.db.connect_timeout, time::Duration::from_secs(5));
        assert_eq!(config.log.filter, "info");
    }
}
