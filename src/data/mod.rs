//! Tick data ingestion
//!
//! Zero-copy quote ingestion over memory-mapped CSV files. The reader owns
//! the mapping for its lifetime and yields by-value [`Tick`] records, so no
//! tick ever borrows from the file bytes.

pub mod reader;
pub mod types;

pub use reader::TickReader;
pub use types::Tick;
