use super::ui;
use crate::core::currency::RateSource;
use crate::core::exchange::Exchange;
use crate::dashboard::CryptoDashboard;
use crate::dashboard::schema::{
    BalanceView, BinanceBalanceView, BinanceHoldingView, BinanceTopCoinView, DashboardData,
    FearGreedView, HoldingsView, RateView, TopVolumeView, UpbitBalanceView, UpbitHoldingView,
    UpbitTopCoinView, WhaleAlertView,
};
use anyhow::Result;
use comfy_table::Cell;

fn upbit_balance_table(balance: &UpbitBalanceView) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Total (KRW)"),
        ui::header_cell("Available (KRW)"),
        ui::header_cell("Locked (KRW)"),
    ]);
    table.add_row(vec![
        ui::number_cell(ui::format_amount(balance.total_krw, 0)),
        ui::number_cell(ui::format_amount(balance.available_krw, 0)),
        ui::number_cell(ui::format_amount(balance.locked_krw, 0)),
    ]);
    table.to_string()
}

fn binance_balance_table(balance: &BinanceBalanceView) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Total (USDT)"),
        ui::header_cell("Available (USDT)"),
        ui::header_cell("Locked (USDT)"),
    ]);
    table.add_row(vec![
        ui::number_cell(ui::format_amount(balance.total_usdt, 2)),
        ui::number_cell(ui::format_amount(balance.available_usdt, 2)),
        ui::number_cell(ui::format_amount(balance.locked_usdt, 2)),
    ]);
    table.to_string()
}

fn upbit_holdings_table(holdings: &[UpbitHoldingView]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Coin"),
        ui::header_cell("Quantity"),
        ui::header_cell("Avg Buy (KRW)"),
        ui::header_cell("Price (KRW)"),
        ui::header_cell("Value (KRW)"),
        ui::header_cell("P/L"),
    ]);
    for holding in holdings {
        table.add_row(vec![
            Cell::new(&holding.currency),
            ui::number_cell(ui::format_amount(holding.total, 8)),
            ui::number_cell(ui::format_amount(holding.avg_buy_price, 0)),
            ui::format_optional_cell(holding.current_price, |p| ui::format_amount(p, 0)),
            ui::number_cell(ui::format_amount(holding.eval_amount, 0)),
            ui::change_cell(holding.profit_rate),
        ]);
    }
    table.to_string()
}

fn binance_holdings_table(holdings: &[BinanceHoldingView]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Asset"),
        ui::header_cell("Quantity"),
        ui::header_cell("Price (USDT)"),
        ui::header_cell("Value (USDT)"),
    ]);
    for holding in holdings {
        table.add_row(vec![
            Cell::new(&holding.asset),
            ui::number_cell(ui::format_amount(holding.total, 8)),
            ui::format_optional_cell(holding.current_price, |p| ui::format_amount(p, 4)),
            ui::number_cell(ui::format_amount(holding.eval_amount, 2)),
        ]);
    }
    table.to_string()
}

fn upbit_top_table(coins: &[UpbitTopCoinView]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Market"),
        ui::header_cell("Name"),
        ui::header_cell("Price (KRW)"),
        ui::header_cell("24h"),
        ui::header_cell("24h Value (KRW)"),
    ]);
    for (rank, coin) in coins.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&coin.market),
            Cell::new(format!("{} ({})", coin.korean_name, coin.english_name)),
            ui::number_cell(ui::format_amount(coin.current_price, 2)),
            ui::change_cell(coin.change_rate),
            ui::number_cell(ui::format_amount(coin.trade_price, 0)),
        ]);
    }
    table.to_string()
}

fn binance_top_table(coins: &[BinanceTopCoinView]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Symbol"),
        ui::header_cell("Price (USDT)"),
        ui::header_cell("Price (KRW)"),
        ui::header_cell("24h"),
        ui::header_cell("24h Value (KRW)"),
    ]);
    for (rank, coin) in coins.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&coin.symbol),
            ui::number_cell(ui::format_amount(coin.current_price, 4)),
            ui::number_cell(ui::format_amount(coin.current_price_krw, 0)),
            ui::change_cell(coin.price_change_percent),
            ui::number_cell(ui::format_amount(coin.quote_volume_krw, 0)),
        ]);
    }
    table.to_string()
}

fn whale_table(alerts: &[WhaleAlertView]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Time"),
        ui::header_cell("Coin"),
        ui::header_cell("Amount"),
        ui::header_cell("Value (USD)"),
        ui::header_cell("From"),
        ui::header_cell("To"),
    ]);
    for alert in alerts {
        table.add_row(vec![
            Cell::new(alert.timestamp.format("%H:%M:%S")),
            Cell::new(&alert.coin),
            ui::number_cell(ui::format_amount(alert.amount, 2)),
            ui::number_cell(ui::format_amount(alert.value_usd, 0)),
            Cell::new(&alert.sender),
            Cell::new(&alert.receiver),
        ]);
    }
    table.to_string()
}

fn fear_greed_line(index: &FearGreedView) -> String {
    format!(
        "{}: {} ({})\n",
        ui::style_text("Fear & Greed", ui::StyleType::Label),
        ui::style_text(&index.value.to_string(), ui::StyleType::Value),
        index.value_classification
    )
}

pub fn rate_line(label: &str, rate: &RateView) -> String {
    let source = match rate.source {
        RateSource::Live => ui::style_text("live", ui::StyleType::Subtle),
        RateSource::Fallback => ui::style_text("fallback", ui::StyleType::Error),
    };
    format!(
        "{}: {} ({source})\n",
        ui::style_text(label, ui::StyleType::Label),
        ui::style_text(&ui::format_amount(rate.value, 2), ui::StyleType::Value),
    )
}

impl DashboardData {
    pub fn display_as_tables(&self) -> String {
        let mut output = String::new();
        output.push_str(&rate_line("USDT/KRW", &self.usdt_krw_rate));
        match &self.fear_greed {
            Some(index) => output.push_str(&fear_greed_line(index)),
            None => output.push_str(&ui::style_text("Fear & Greed: N/A\n", ui::StyleType::Error)),
        }
        output.push('\n');

        output.push_str(&ui::section("Upbit Balance", self.upbit_balance.as_ref(), upbit_balance_table));
        output.push_str(&ui::section("Upbit Holdings", self.upbit_holdings.as_deref(), upbit_holdings_table));
        output.push_str(&ui::section("Upbit Top Volume", self.upbit_top_volume.as_deref(), upbit_top_table));
        output.push_str(&ui::section("Binance Balance", self.binance_balance.as_ref(), binance_balance_table));
        output.push_str(&ui::section(
            "Binance Holdings",
            self.binance_holdings.as_deref(),
            binance_holdings_table,
        ));
        output.push_str(&ui::section("Binance Top Volume", self.binance_top_volume.as_deref(), binance_top_table));
        output.push_str(&ui::section("Whale Alerts", self.whale_alerts.as_deref(), whale_table));

        output.push_str(&ui::style_text(
            &format!("Last updated: {}", self.last_updated.format("%Y-%m-%d %H:%M:%S UTC")),
            ui::StyleType::Subtle,
        ));
        output
    }
}

pub fn balance_text(exchange: Exchange, view: Option<&BalanceView>) -> String {
    let title = format!("{} Balance", title_case(exchange));
    match view {
        Some(BalanceView::Upbit(b)) => ui::section(&title, Some(b), upbit_balance_table),
        Some(BalanceView::Binance(b)) => ui::section(&title, Some(b), binance_balance_table),
        None => ui::unavailable(&title),
    }
}

pub fn holdings_text(exchange: Exchange, view: Option<&HoldingsView>) -> String {
    let title = format!("{} Holdings", title_case(exchange));
    match view {
        Some(HoldingsView::Upbit(h)) => ui::section(&title, Some(h.as_slice()), upbit_holdings_table),
        Some(HoldingsView::Binance(h)) => ui::section(&title, Some(h.as_slice()), binance_holdings_table),
        None => ui::unavailable(&title),
    }
}

pub fn top_volume_text(exchange: Exchange, view: Option<&TopVolumeView>) -> String {
    let title = format!("{} Top Volume", title_case(exchange));
    match view {
        Some(TopVolumeView::Upbit(c)) => ui::section(&title, Some(c.as_slice()), upbit_top_table),
        Some(TopVolumeView::Binance(c)) => ui::section(&title, Some(c.as_slice()), binance_top_table),
        None => ui::unavailable(&title),
    }
}

fn title_case(exchange: Exchange) -> &'static str {
    match exchange {
        Exchange::Upbit => "Upbit",
        Exchange::Binance => "Binance",
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn run(dashboard: &CryptoDashboard, json: bool) -> Result<()> {
    let spinner = ui::new_spinner("Fetching crypto dashboard...");
    let data = dashboard.build().await;
    spinner.finish_and_clear();
    let data = data?;

    if json {
        return print_json(&data);
    }
    println!("{}", data.display_as_tables());
    Ok(())
}

pub async fn balance(dashboard: &CryptoDashboard, exchange: Exchange, json: bool) -> Result<()> {
    let view = dashboard.balance(exchange).await;
    if json {
        return print_json(&view);
    }
    print!("{}", balance_text(exchange, view.as_ref()));
    Ok(())
}

pub async fn holdings(dashboard: &CryptoDashboard, exchange: Exchange, json: bool) -> Result<()> {
    let view = dashboard.holdings(exchange).await;
    if json {
        return print_json(&view);
    }
    print!("{}", holdings_text(exchange, view.as_ref()));
    Ok(())
}

pub async fn top_volume(
    dashboard: &CryptoDashboard,
    exchange: Exchange,
    limit: usize,
    json: bool,
) -> Result<()> {
    let view = dashboard.top_volume(exchange, limit).await?;
    if json {
        return print_json(&view);
    }
    print!("{}", top_volume_text(exchange, view.as_ref()));
    Ok(())
}
