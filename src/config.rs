use std::env::var;

use dotenvy::dotenv;

pub struct Config {
    pub port: u16,
    pub scheme: String,
    pub host: String,
    /// In-memory repositories are used when unset.
    pub database_url: Option<String>,
    /// The in-process job bus is used when unset.
    pub nats_url: Option<String>,
    pub nats_stream: String,
    pub nats_subject: String,
    pub nats_durable: String,
    pub nats_pull_batch: usize,
    pub nats_ack_wait_seconds: u64,
    pub nats_max_deliver: i64,
    pub send_timeout_seconds: u64,
}

impl Config {
    pub fn try_parse() -> Result<Config, &'static str> {
        let _ = dotenv();

        Ok(Config {
            port: var("PORT")
                .map_err(|_| "An error occured while getting PORT env param")?
                .parse::<u16>()
                .map_err(|_| "An error occured while parsing PORT env param")?,
            scheme: var("SCHEME").map_err(|_| "An error occured while getting SCHEME env param")?,
            host: var("HOST").map_err(|_| "An error occured while getting HOST env param")?,
            database_url: var("DATABASE_URL").ok(),
            nats_url: var("NATS_URL").ok(),
            nats_stream: var("NATS_STREAM").unwrap_or_else(|_| "paging-jobs".to_string()),
            nats_subject: var("NATS_SUBJECT").unwrap_or_else(|_| "paging.process".to_string()),
            nats_durable: var("NATS_DURABLE").unwrap_or_else(|_| "paging-worker".to_string()),
            nats_pull_batch: parse_or_default(
                "NATS_PULL_BATCH",
                16,
                "An error occured while parsing NATS_PULL_BATCH env param",
            )?,
            nats_ack_wait_seconds: parse_or_default(
                "NATS_ACK_WAIT_SECONDS",
                60,
                "An error occured while parsing NATS_ACK_WAIT_SECONDS env param",
            )?,
            nats_max_deliver: parse_or_default(
                "NATS_MAX_DELIVER",
                3,
                "An error occured while parsing NATS_MAX_DELIVER env param",
            )?,
            send_timeout_seconds: parse_or_default(
                "SEND_TIMEOUT_SECONDS",
                30,
                "An error occured while parsing SEND_TIMEOUT_SECONDS env param",
            )?,
        })
    }
}

fn parse_or_default<T: std::str::FromStr>(
    name: &str,
    default: T,
    parse_error: &'static str,
) -> Result<T, &'static str> {
    match var(name) {
        Ok(raw) => raw.parse::<T>().map_err(|_| parse_error),
        Err(_) => Ok(default),
    }
}
