//! Pure mapping from normalized provider records to the external schema.

use thiserror::Error;

use crate::core::currency::ConversionRate;
use crate::core::exchange::{ExchangeBalance, Holding, TopVolumeEntry, round_to};
use crate::core::feeds::{FearGreedIndex, NewsItem, WhaleAlert};
use crate::core::fetch::Fetched;
use crate::core::price::{EquityEntry, IndexSnapshot, SectorSnapshot};
use crate::dashboard::schema::{
    BinanceBalanceView, BinanceHoldingView, BinanceTopCoinView, FearGreedView,
    KoreaStockView, NewsView, RateView, SectorView, StockIndexView, UpbitBalanceView,
    UpbitHoldingView, UpbitTopCoinView, UsStockView, WhaleAlertView,
};

/// The only failure that escapes the orchestrators.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssemblyError {
    #[error("Conversion rate {0} is not a positive finite number")]
    InvalidRate(f64),
    #[error("Derived field {field} of {symbol} is not finite")]
    NonFiniteField { field: &'static str, symbol: String },
}

pub fn checked_rate(rate: ConversionRate) -> Result<ConversionRate, AssemblyError> {
    let value = rate.value();
    if value.is_finite() && value > 0.0 {
        Ok(rate)
    } else {
        Err(AssemblyError::InvalidRate(value))
    }
}

pub fn rate_view(rate: &ConversionRate) -> RateView {
    RateView {
        value: rate.value(),
        source: rate.source(),
    }
}

/// Local-currency mirror of `amount`.
fn mirror(
    rate: &ConversionRate,
    amount: f64,
    field: &'static str,
    symbol: &str,
) -> Result<f64, AssemblyError> {
    let converted = rate.convert(amount);
    if converted.is_finite() {
        Ok(converted)
    } else {
        Err(AssemblyError::NonFiniteField {
            field,
            symbol: symbol.to_string(),
        })
    }
}

/// `None` for an absent source and for an empty list alike.
pub fn present_list<T>(fetched: Fetched<Vec<T>>) -> Option<Vec<T>> {
    fetched.present().filter(|items| !items.is_empty())
}

/// Maps a present, non-empty list; conversion errors abort assembly.
pub fn map_list<T, U>(
    fetched: Fetched<Vec<T>>,
    f: impl Fn(&T) -> Result<U, AssemblyError>,
) -> Result<Option<Vec<U>>, AssemblyError> {
    present_list(fetched)
        .map(|items| items.iter().map(f).collect::<Result<Vec<_>, _>>())
        .transpose()
}

pub fn upbit_balance(balance: &ExchangeBalance) -> UpbitBalanceView {
    UpbitBalanceView {
        total_krw: balance.total,
        available_krw: balance.available,
        locked_krw: balance.locked,
    }
}

pub fn upbit_holding(holding: &Holding) -> UpbitHoldingView {
    UpbitHoldingView {
        currency: holding.asset.clone(),
        balance: holding.free,
        locked: holding.locked,
        total: holding.quantity,
        avg_buy_price: holding.avg_cost.unwrap_or(0.0),
        current_price: holding.current_price,
        eval_amount: holding.eval_value,
        profit_rate: holding.profit_rate(),
    }
}

pub fn upbit_top_coin(entry: &TopVolumeEntry) -> UpbitTopCoinView {
    UpbitTopCoinView {
        market: entry.symbol.clone(),
        korean_name: entry.names.local.clone(),
        english_name: entry.names.english.clone(),
        trade_volume: entry.base_volume,
        trade_price: entry.quote_volume,
        current_price: entry.current_price,
        change_rate: round_to(entry.change_rate_percent, 2),
    }
}

pub fn binance_balance(balance: &ExchangeBalance) -> BinanceBalanceView {
    BinanceBalanceView {
        total_usdt: balance.total,
        available_usdt: balance.available,
        locked_usdt: balance.locked,
    }
}

pub fn binance_holding(holding: &Holding) -> BinanceHoldingView {
    BinanceHoldingView {
        asset: holding.asset.clone(),
        free: holding.free,
        locked: holding.locked,
        total: holding.quantity,
        current_price: holding.current_price,
        eval_amount: holding.eval_value,
    }
}

pub fn binance_top_coin(
    entry: &TopVolumeEntry,
    rate: &ConversionRate,
) -> Result<BinanceTopCoinView, AssemblyError> {
    Ok(BinanceTopCoinView {
        symbol: entry.symbol.clone(),
        base_asset: entry.base_asset.clone(),
        quote_volume: entry.quote_volume,
        volume: entry.base_volume,
        current_price: entry.current_price,
        price_change_percent: entry.change_rate_percent,
        current_price_krw: mirror(rate, entry.current_price, "current_price_krw", &entry.symbol)?,
        quote_volume_krw: mirror(rate, entry.quote_volume, "quote_volume_krw", &entry.symbol)?,
    })
}

pub fn fear_greed(index: &FearGreedIndex) -> FearGreedView {
    FearGreedView {
        value: index.value,
        value_classification: index.value_classification.clone(),
        timestamp: index.timestamp,
    }
}

pub fn whale_alert(alert: &WhaleAlert) -> WhaleAlertView {
    WhaleAlertView {
        coin: alert.coin.clone(),
        amount: alert.amount,
        sender: alert.sender.clone(),
        receiver: alert.receiver.clone(),
        value_usd: alert.value_usd,
        timestamp: alert.timestamp,
    }
}

/// KRW-listed equity; prices and values are whole won.
pub fn korea_stock(entry: &EquityEntry) -> KoreaStockView {
    KoreaStockView {
        code: entry.code.clone(),
        name: entry.name.clone(),
        current_price: entry.price.round() as i64,
        change_rate: entry.change_rate,
        trade_volume: entry.volume,
        trade_value: entry.trade_value.round() as i64,
    }
}

pub fn us_stock(entry: &EquityEntry, rate: &ConversionRate) -> Result<UsStockView, AssemblyError> {
    Ok(UsStockView {
        symbol: entry.symbol.clone(),
        name: entry.name.clone(),
        current_price: round_to(entry.price, 2),
        change_rate: entry.change_rate,
        trade_volume: entry.volume,
        trade_value: entry.trade_value,
        current_price_krw: mirror(rate, entry.price, "current_price_krw", &entry.symbol)?.round(),
        trade_value_krw: mirror(rate, entry.trade_value, "trade_value_krw", &entry.symbol)?.round(),
    })
}

pub fn stock_index(snapshot: &IndexSnapshot) -> StockIndexView {
    StockIndexView {
        name: snapshot.name.clone(),
        symbol: snapshot.symbol.clone(),
        current_price: snapshot.price,
        change: snapshot.change,
        change_rate: snapshot.change_rate,
    }
}

pub fn sector(snapshot: &SectorSnapshot) -> SectorView {
    SectorView {
        name: snapshot.name.clone(),
        change_rate: snapshot.change_rate,
        strength: snapshot.trend.label().to_string(),
    }
}

pub fn news(item: &NewsItem) -> NewsView {
    NewsView {
        title: item.title.clone(),
        link: item.link.clone(),
        date: item.date.clone(),
        source: item.source.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fetch::ProviderError;
    use crate::core::reference::DisplayNames;

    fn binance_entry(symbol: &str, price: f64, quote_volume: f64) -> TopVolumeEntry {
        TopVolumeEntry {
            symbol: symbol.to_string(),
            base_asset: symbol.trim_end_matches("USDT").to_string(),
            names: DisplayNames::fallback(symbol),
            current_price: price,
            change_rate_percent: 1.0,
            base_volume: quote_volume / price,
            quote_volume,
        }
    }

    #[test]
    fn test_present_list_nulls_absent_and_empty() {
        let absent: Fetched<Vec<i32>> = Fetched::Absent(ProviderError::Timeout(
            std::time::Duration::from_secs(5),
        ));
        assert_eq!(present_list(absent), None);
        assert_eq!(present_list(Fetched::Present(Vec::<i32>::new())), None);
        assert_eq!(present_list(Fetched::Present(vec![1])), Some(vec![1]));
    }

    #[test]
    fn test_rate_dependent_fields_divide_back_to_one_rate() {
        let rate = ConversionRate::live(1387.25).unwrap();
        let entries = vec![
            binance_entry("BTCUSDT", 67_000.5, 1_250_000_000.0),
            binance_entry("ETHUSDT", 3_500.25, 640_000_000.0),
        ];

        let views = map_list(Fetched::Present(entries), |e| binance_top_coin(e, &rate))
            .unwrap()
            .unwrap();
        for view in &views {
            let price_rate = view.current_price_krw / view.current_price;
            let volume_rate = view.quote_volume_krw / view.quote_volume;
            assert!((price_rate - 1387.25).abs() < 1e-9);
            assert!((volume_rate - 1387.25).abs() < 1e-9);
        }
    }

    #[test]
    fn test_non_finite_mirror_aborts_assembly() {
        let rate = ConversionRate::live(1400.0).unwrap();
        let entry = binance_entry("BADUSDT", f64::MAX, 1.0);

        assert_eq!(
            binance_top_coin(&entry, &rate),
            Err(AssemblyError::NonFiniteField {
                field: "current_price_krw",
                symbol: "BADUSDT".to_string(),
            })
        );
    }

    #[test]
    fn test_checked_rate_accepts_fallback() {
        let rate = checked_rate(ConversionRate::fallback(1450.0)).unwrap();
        let view = rate_view(&rate);
        assert_eq!(view.value, 1450.0);
        assert_eq!(view.source, crate::core::currency::RateSource::Fallback);
    }

    #[test]
    fn test_korea_stock_rounds_to_whole_won() {
        let entry = EquityEntry {
            symbol: "005930.KS".to_string(),
            code: "005930".to_string(),
            name: "삼성전자".to_string(),
            price: 71_900.4,
            change_rate: 1.27,
            volume: 12_000_000,
            trade_value: 862_804_800_000.6,
        };
        let view = korea_stock(&entry);
        assert_eq!(view.current_price, 71_900);
        assert_eq!(view.trade_value, 862_804_800_001);
        assert_eq!(view.code, "005930");
    }

    #[test]
    fn test_us_stock_mirrors_are_whole_won() {
        let rate = ConversionRate::live(1380.0).unwrap();
        let entry = EquityEntry {
            symbol: "NVDA".to_string(),
            code: "NVDA".to_string(),
            name: "NVIDIA Corporation".to_string(),
            price: 120.556,
            change_rate: -0.8,
            volume: 1_000,
            trade_value: 120_555.0,
        };
        let view = us_stock(&entry, &rate).unwrap();
        assert_eq!(view.current_price, 120.56);
        assert_eq!(view.current_price_krw, (120.556f64 * 1380.0).round());
        assert_eq!(view.trade_value_krw, 166_365_900.0);
    }

    #[test]
    fn test_upbit_holding_without_avg_cost() {
        let holding = Holding::new("BTC", 0.5, 0.0, None, Some(100.0));
        let view = upbit_holding(&holding);
        assert_eq!(view.avg_buy_price, 0.0);
        assert_eq!(view.profit_rate, 0.0);
        assert_eq!(view.eval_amount, 50.0);
    }
}
