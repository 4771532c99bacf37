use crate::core::currency::FALLBACK_KRW_RATE;
use crate::core::exchange::DEFAULT_DUST_THRESHOLD;
use crate::core::price::ListedSymbol;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const UPBIT_ACCESS_KEY_VAR: &str = "UPBIT_ACCESS_KEY";
pub const UPBIT_SECRET_KEY_VAR: &str = "UPBIT_SECRET_KEY";
pub const BINANCE_ACCESS_KEY_VAR: &str = "BINANCE_ACCESS_KEY";
pub const BINANCE_SECRET_KEY_VAR: &str = "BINANCE_SECRET_KEY";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EndpointConfig {
    pub base_url: String,
}

impl EndpointConfig {
    fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ProvidersConfig {
    pub upbit: EndpointConfig,
    pub binance: EndpointConfig,
    pub yahoo: EndpointConfig,
    pub fear_greed: EndpointConfig,
    pub news: EndpointConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            upbit: EndpointConfig::new("https://api.upbit.com"),
            binance: EndpointConfig::new("https://api.binance.com"),
            yahoo: EndpointConfig::new("https://query1.finance.yahoo.com"),
            fear_greed: EndpointConfig::new("https://api.alternative.me"),
            news: EndpointConfig::new("https://news.google.com"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-adapter deadline, also used as the HTTP client timeout.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            user_agent: concat!("coinboard/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub top_volume_limit: usize,
    pub whale_alert_limit: usize,
    pub dust_threshold: f64,
    pub fallback_rate: f64,
    pub news_query: String,
    pub news_limit: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            top_volume_limit: 10,
            whale_alert_limit: 5,
            dust_threshold: DEFAULT_DUST_THRESHOLD,
            fallback_rate: FALLBACK_KRW_RATE,
            news_query: "증시".to_string(),
            news_limit: 5,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StocksConfig {
    pub list_limit: usize,
    pub kospi: Vec<ListedSymbol>,
    pub kosdaq: Vec<ListedSymbol>,
    pub us: Vec<ListedSymbol>,
    pub etf: Vec<ListedSymbol>,
    pub indices: Vec<ListedSymbol>,
    /// Sector name paired with the ETF that tracks it.
    pub sectors: Vec<ListedSymbol>,
}

fn listed(entries: &[(&str, &str)]) -> Vec<ListedSymbol> {
    entries
        .iter()
        .map(|(symbol, name)| ListedSymbol::new(symbol, Some(name)))
        .collect()
}

impl Default for StocksConfig {
    fn default() -> Self {
        Self {
            list_limit: 10,
            kospi: listed(&[
                ("005930.KS", "삼성전자"),
                ("000660.KS", "SK하이닉스"),
                ("373220.KS", "LG에너지솔루션"),
                ("207940.KS", "삼성바이오로직스"),
                ("005380.KS", "현대차"),
                ("000270.KS", "기아"),
                ("068270.KS", "셀트리온"),
                ("005490.KS", "POSCO홀딩스"),
                ("105560.KS", "KB금융"),
                ("035420.KS", "NAVER"),
                ("051910.KS", "LG화학"),
                ("035720.KS", "카카오"),
                ("006400.KS", "삼성SDI"),
                ("003550.KS", "LG"),
                ("012330.KS", "현대모비스"),
                ("028260.KS", "삼성물산"),
                ("032830.KS", "삼성생명"),
                ("086790.KS", "하나금융지주"),
                ("011200.KS", "HMM"),
                ("055550.KS", "신한지주"),
                ("034020.KS", "두산에너빌리티"),
                ("003670.KS", "포스코퓨처엠"),
                ("010130.KS", "고려아연"),
                ("009150.KS", "삼성전기"),
                ("015760.KS", "한국전력"),
            ]),
            kosdaq: listed(&[
                ("247540.KQ", "에코프로비엠"),
                ("086520.KQ", "에코프로"),
                ("196170.KQ", "알테오젠"),
                ("022100.KQ", "포스코DX"),
                ("066970.KQ", "엘앤에프"),
                ("028300.KQ", "HLB"),
                ("277810.KQ", "레인보우로보틱스"),
                ("263750.KQ", "펄어비스"),
                ("293490.KQ", "카카오게임즈"),
                ("035900.KQ", "JYP Ent."),
                ("041510.KQ", "에스엠"),
                ("393890.KQ", "더블유씨피"),
                ("403870.KQ", "HPSP"),
                ("214150.KQ", "클래시스"),
                ("005290.KQ", "동진쎄미켐"),
                ("091990.KQ", "셀트리온제약"),
                ("039030.KQ", "이오테크닉스"),
                ("145020.KQ", "휴젤"),
                ("036930.KQ", "주성엔지니어링"),
                ("000250.KQ", "삼천당제약"),
            ]),
            us: [
                "NVDA", "TSLA", "AAPL", "AMD", "AMZN", "META", "MSFT", "GOOGL", "NFLX", "INTC",
                "PLTR", "COIN", "MARA", "RIOT", "BA", "JPM", "BAC", "WFC", "C", "GS", "XOM", "CVX",
                "PFE", "JNJ", "UNH",
            ]
            .iter()
            .map(|symbol| ListedSymbol::new(symbol, None))
            .collect(),
            etf: listed(&[
                ("QQQ", "Invesco QQQ"),
                ("SPY", "SPDR S&P 500"),
                ("TQQQ", "ProShares UltraPro QQQ"),
                ("SOXL", "Direxion Daily Semiconductor Bull 3X"),
                ("SQQQ", "ProShares UltraPro Short QQQ"),
                ("JEPI", "JPMorgan Equity Premium Income"),
                ("SCHD", "Schwab US Dividend Equity"),
                ("IVV", "iShares Core S&P 500"),
                ("VTI", "Vanguard Total Stock Market"),
                ("VOO", "Vanguard S&P 500"),
                ("IWM", "iShares Russell 2000"),
                ("EEM", "iShares MSCI Emerging Markets"),
                ("GLD", "SPDR Gold Shares"),
                ("SLV", "iShares Silver Trust"),
                ("ARKK", "ARK Innovation ETF"),
                ("HYG", "iShares iBoxx $ High Yield Corporate Bond"),
                ("XLF", "Financial Select Sector SPDR Fund"),
                ("XLK", "Technology Select Sector SPDR Fund"),
                ("SMH", "VanEck Semiconductor ETF"),
                ("LABU", "Direxion Daily S&P Biotech Bull 3X Shares"),
            ]),
            indices: listed(&[
                ("^KS11", "KOSPI"),
                ("^KQ11", "KOSDAQ"),
                ("^DJI", "Dow Jones"),
                ("^IXIC", "Nasdaq"),
                ("^GSPC", "S&P 500"),
            ]),
            sectors: listed(&[
                ("XLK", "Technology"),
                ("XLF", "Financials"),
                ("XLE", "Energy"),
                ("XLV", "Health Care"),
                ("XLY", "Consumer Discretionary"),
                ("XLI", "Industrials"),
            ]),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// `"*"` allows any origin.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8000".to_string(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            request_timeout_secs: 30,
        }
    }
}

/// API key pair for an authenticated exchange adapter.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl Credentials {
    /// Both parts must be present and non-blank.
    pub fn new(access_key: Option<String>, secret_key: Option<String>) -> Option<Self> {
        let access_key = access_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())?;
        let secret_key = secret_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())?;
        Some(Self {
            access_key,
            secret_key,
        })
    }

    pub fn from_env(access_var: &str, secret_var: &str) -> Option<Self> {
        let credentials = Self::new(std::env::var(access_var).ok(), std::env::var(secret_var).ok());
        if credentials.is_none() {
            debug!(access_var, secret_var, "Exchange credentials not configured");
        }
        credentials
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExchangeCredentials {
    pub upbit: Option<Credentials>,
    pub binance: Option<Credentials>,
}

impl ExchangeCredentials {
    pub fn from_env() -> Self {
        Self {
            upbit: Credentials::from_env(UPBIT_ACCESS_KEY_VAR, UPBIT_SECRET_KEY_VAR),
            binance: Credentials::from_env(BINANCE_ACCESS_KEY_VAR, BINANCE_SECRET_KEY_VAR),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub stocks: StocksConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// Never read from or written to the config file.
    #[serde(skip)]
    pub credentials: ExchangeCredentials,
}

impl AppConfig {
    /// Loads the default config file, or built-in defaults when it does not
    /// exist. Credentials always come from the environment.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            return Ok(Self::default().with_env_credentials());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "coinboard", "coinboard")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config.with_env_credentials())
    }

    pub fn with_env_credentials(mut self) -> Self {
        self.credentials = ExchangeCredentials::from_env();
        self
    }
}
