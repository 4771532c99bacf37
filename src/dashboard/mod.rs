//! Aggregation layer: orchestrators that fan out to providers and the
//! assembler that maps their records onto the served schema.

pub mod assemble;
pub mod crypto;
pub mod schema;
pub mod stocks;

pub use assemble::AssemblyError;
pub use crypto::{CryptoDashboard, CryptoSources, DashboardSettings};
pub use schema::{DashboardData, StockDashboardData};
pub use stocks::{StockDashboard, StockSettings, StockSources};
