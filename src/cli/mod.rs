pub mod dashboard;
pub mod setup;
pub mod stocks;
pub mod ui;
