// Durable post ledger: which (folder, platform, surface) tuples have been
// attempted and with what outcome

pub mod pool;
pub mod records;

pub use pool::LedgerPool;
pub use records::PostRecordRepository;
