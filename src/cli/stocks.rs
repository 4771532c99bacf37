use super::dashboard::rate_line;
use super::ui;
use crate::dashboard::StockDashboard;
use crate::dashboard::schema::{
    KoreaStockView, NewsView, SectorView, StockDashboardData, StockIndexView, UsStockView,
};
use anyhow::Result;
use comfy_table::Cell;

fn korea_table(stocks: &[KoreaStockView]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Code"),
        ui::header_cell("Name"),
        ui::header_cell("Price (KRW)"),
        ui::header_cell("Change"),
        ui::header_cell("Value (KRW)"),
    ]);
    for (rank, stock) in stocks.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&stock.code),
            Cell::new(&stock.name),
            ui::number_cell(ui::format_amount(stock.current_price as f64, 0)),
            ui::change_cell(stock.change_rate),
            ui::number_cell(ui::format_amount(stock.trade_value as f64, 0)),
        ]);
    }
    table.to_string()
}

fn us_table(stocks: &[UsStockView]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Symbol"),
        ui::header_cell("Name"),
        ui::header_cell("Price (USD)"),
        ui::header_cell("Price (KRW)"),
        ui::header_cell("Change"),
        ui::header_cell("Value (KRW)"),
    ]);
    for (rank, stock) in stocks.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&stock.symbol),
            Cell::new(&stock.name),
            ui::number_cell(ui::format_amount(stock.current_price, 2)),
            ui::number_cell(ui::format_amount(stock.current_price_krw, 0)),
            ui::change_cell(stock.change_rate),
            ui::number_cell(ui::format_amount(stock.trade_value_krw, 0)),
        ]);
    }
    table.to_string()
}

fn index_table(indices: &[StockIndexView]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Index"),
        ui::header_cell("Level"),
        ui::header_cell("Change"),
        ui::header_cell("Change %"),
    ]);
    for index in indices {
        table.add_row(vec![
            Cell::new(&index.name),
            ui::number_cell(ui::format_amount(index.current_price, 2)),
            ui::number_cell(format!("{:+.2}", index.change)),
            ui::change_cell(index.change_rate),
        ]);
    }
    table.to_string()
}

fn sector_table(sectors: &[SectorView]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Sector"),
        ui::header_cell("Change"),
        ui::header_cell("Strength"),
    ]);
    for sector in sectors {
        table.add_row(vec![
            Cell::new(&sector.name),
            ui::change_cell(sector.change_rate),
            Cell::new(&sector.strength),
        ]);
    }
    table.to_string()
}

pub fn news_list(items: &[NewsView]) -> String {
    items
        .iter()
        .map(|item| {
            format!(
                "• {}\n  {} {}\n  {}\n",
                item.title,
                ui::style_text(&item.source, ui::StyleType::Label),
                ui::style_text(&item.date, ui::StyleType::Subtle),
                ui::style_text(&item.link, ui::StyleType::Subtle),
            )
        })
        .collect()
}

impl StockDashboardData {
    pub fn display_as_tables(&self) -> String {
        let mut output = rate_line("USD/KRW", &self.usd_krw_rate);
        output.push('\n');
        output.push_str(&ui::section("Market Indices", self.indices.as_deref(), index_table));
        output.push_str(&ui::section("KOSPI by Trade Value", self.kospi_top.as_deref(), korea_table));
        output.push_str(&ui::section("KOSDAQ by Trade Value", self.kosdaq_top.as_deref(), korea_table));
        output.push_str(&ui::section("US by Trade Value", self.us_top.as_deref(), us_table));
        output.push_str(&ui::section("ETF by Volume", self.etf_ranking.as_deref(), us_table));
        output.push_str(&ui::section("Sectors", self.sectors.as_deref(), sector_table));
        output.push_str(&ui::section("News", self.news.as_deref(), news_list));
        output.push_str(&ui::style_text(
            &format!("Last updated: {}", self.last_updated.format("%Y-%m-%d %H:%M:%S UTC")),
            ui::StyleType::Subtle,
        ));
        output
    }
}

pub async fn run(dashboard: &StockDashboard, json: bool) -> Result<()> {
    let spinner = ui::new_spinner("Fetching stock dashboard...");
    let data = dashboard.build().await;
    spinner.finish_and_clear();
    let data = data?;

    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }
    println!("{}", data.display_as_tables());
    Ok(())
}

pub async fn news(dashboard: &StockDashboard, query: &str, json: bool) -> Result<()> {
    let items = dashboard.news(query).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }
    print!("{}", ui::section(&format!("News: {query}"), items.as_deref(), news_list));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::RateSource;
    use crate::dashboard::schema::RateView;
    use chrono::Utc;

    #[test]
    fn test_stock_dashboard_tables() {
        let data = StockDashboardData {
            kospi_top: Some(vec![KoreaStockView {
                code: "005930".to_string(),
                name: "삼성전자".to_string(),
                current_price: 72_000,
                change_rate: 2.86,
                trade_volume: 10_000_000,
                trade_value: 720_000_000_000,
            }]),
            kosdaq_top: None,
            us_top: None,
            indices: None,
            sectors: Some(vec![SectorView {
                name: "Technology".to_string(),
                change_rate: 1.77,
                strength: "Strong".to_string(),
            }]),
            etf_ranking: None,
            news: Some(vec![NewsView {
                title: "코스피 상승".to_string(),
                link: "https://news.example/1".to_string(),
                date: "Mon, 10 Jun 2024 01:00:00 GMT".to_string(),
                source: "연합뉴스".to_string(),
            }]),
            usd_krw_rate: RateView {
                value: 1380.5,
                source: RateSource::Live,
            },
            last_updated: Utc::now(),
        };

        let text = console::strip_ansi_codes(&data.display_as_tables()).to_string();
        assert!(text.contains("USD/KRW: 1,380.50 (live)"));
        assert!(text.contains("720,000,000,000"));
        assert!(text.contains("Strong"));
        assert!(text.contains("• 코스피 상승"));
        assert_eq!(text.matches("Not available").count(), 4);
    }
}
