pub mod listing;
pub mod valuation;
