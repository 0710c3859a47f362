use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use dotenv::dotenv;
use tracing::info;

const SYMBOLS: &str = "SYMBOLS";
const RECENT_TRADES_CAP: &str = "RECENT_TRADES_CAP";
const DEFAULT_DEPTH: &str = "DEFAULT_DEPTH";
const MAX_TRADES_LIMIT: &str = "MAX_TRADES_LIMIT";
const EVENT_QUEUE_CAP: &str = "EVENT_QUEUE_CAP";
const LISTEN_ADDR: &str = "LISTEN_ADDR";

/// A registered trading pair with its decimal scales. Prices and quantities
/// submitted for the pair may not carry more decimal places than the scale allows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolSpec {
    pub name: String,
    pub price_scale: u32,
    pub quantity_scale: u32,
}

impl SymbolSpec {
    pub fn new(name: impl Into<String>, price_scale: u32, quantity_scale: u32) -> Self {
        Self {
            name: name.into(),
            price_scale,
            quantity_scale,
        }
    }

    /// Parses a `NAME:price_scale:quantity_scale` entry, e.g. `BTC-USDT:2:6`.
    fn parse(entry: &str) -> Result<SymbolSpec, String> {
        let parts: Vec<&str> = entry.trim().split(':').collect();
        if parts.len() != 3 {
            return Err(format!(
                "invalid symbol spec '{}', expected NAME:price_scale:quantity_scale",
                entry
            ));
        }
        let price_scale = parts[1]
            .parse::<u32>()
            .map_err(|_| format!("invalid price scale in symbol spec '{}'", entry))?;
        let quantity_scale = parts[2]
            .parse::<u32>()
            .map_err(|_| format!("invalid quantity scale in symbol spec '{}'", entry))?;
        Ok(SymbolSpec::new(parts[0].to_uppercase(), price_scale, quantity_scale))
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Trading pairs registered at startup.
    pub symbols: Vec<SymbolSpec>,
    /// Capacity of the cross-symbol recent-trades tail.
    pub recent_trades_cap: usize,
    /// Snapshot depth when a request does not specify one.
    pub default_depth: usize,
    /// Upper bound on the `limit` parameter of trade queries.
    pub max_trades_limit: usize,
    /// Per-subscriber event queue capacity.
    pub event_queue_cap: usize,
    /// Address the HTTP/WebSocket server binds to.
    pub listen_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Config {
        match Self::try_from_env() {
            Ok(config) => config,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_from_env() -> Result<Config, String> {
        // Load .env file
        dotenv().ok();

        let symbols = match env::var(SYMBOLS) {
            Ok(raw) => raw
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(SymbolSpec::parse)
                .collect::<Result<Vec<_>, String>>()?,
            Err(_) => vec![SymbolSpec::new("BTC-USDT", 2, 6)],
        };
        if symbols.is_empty() {
            return Err(format!("{} must name at least one trading pair", SYMBOLS));
        }
        info!(count = symbols.len(), "configured trading pairs");

        Ok(Config {
            symbols,
            recent_trades_cap: parse_or(RECENT_TRADES_CAP, 1000)?,
            default_depth: parse_or(DEFAULT_DEPTH, 20)?,
            max_trades_limit: parse_or(MAX_TRADES_LIMIT, 1000)?,
            event_queue_cap: parse_or(EVENT_QUEUE_CAP, 1024)?,
            listen_addr: parse_or(LISTEN_ADDR, SocketAddr::from(([0, 0, 0, 0], 8000)))?,
        })
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            symbols: vec![SymbolSpec::new("BTC-USDT", 2, 6)],
            recent_trades_cap: 1000,
            default_depth: 20,
            max_trades_limit: 1000,
            event_queue_cap: 1024,
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
        }
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, String> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("failed to parse environment variable {}", key)),
        Err(_) => Ok(default),
    }
}
