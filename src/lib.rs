pub mod audit;
pub mod config;
pub mod error;
pub mod ledger;
pub mod line_item;
pub mod reversal;
pub mod service;
pub mod session;
pub mod store;
pub mod totals;
pub mod utils;
pub mod valuation;
