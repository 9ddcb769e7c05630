pub mod api;
pub mod config;
pub mod db;

pub use self::config::Config;
