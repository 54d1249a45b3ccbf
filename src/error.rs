use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("could not load signing key: {0}")]
    SigningKey(#[source] anyhow::Error),

    #[error("could not load {}: {source}", path.display())]
    EnvFile {
        path: std::path::PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("could not build HTTP client: {0}")]
    HttpClient(#[source] anyhow::Error),

    #[error("could not read credentials: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Binance rejected request (HTTP {status}, code {code}): {msg}")]
    Api { status: u16, code: i64, msg: String },

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("symbol {0} not found in exchange info")]
    SymbolNotFound(String),

    #[error("symbol {0} has no PRICE_FILTER")]
    MissingPriceFilter(String),

    #[error("could not build request: {0}")]
    Request(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum StrategyError {
    #[error("price must be positive and finite, got {0}")]
    InvalidPrice(f64),

    #[error("notional {notional:.4} at price {price} rounds to a zero quantity")]
    ZeroQuantity { notional: f64, price: f64 },
}

#[derive(Error, Debug)]
pub enum BotError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("authentication failed: {0}")]
    Auth(#[source] ExchangeError),

    #[error("could not fetch symbol info: {0}")]
    SymbolMeta(#[source] ExchangeError),

    #[error("could not fetch opening price: {0}")]
    OpeningPrice(#[source] ExchangeError),

    #[error("price poll failed: {0}")]
    Poll(#[source] ExchangeError),
}
