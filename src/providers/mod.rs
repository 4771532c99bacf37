pub mod alternative_me;
pub mod binance;
pub mod equities;
pub mod google_news;
pub mod upbit;
pub mod util;
pub mod whale;
pub mod yahoo_finance;

pub use alternative_me::AlternativeMeProvider;
pub use binance::BinanceProvider;
pub use equities::EquityScreener;
pub use google_news::GoogleNewsProvider;
pub use upbit::UpbitProvider;
pub use whale::SimulatedWhaleFeed;
pub use yahoo_finance::{YahooCurrencyProvider, YahooFinanceProvider};
