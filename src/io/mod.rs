/// CSV export of transactions and cycle summaries.
pub mod export;
