pub mod archive;
pub mod fetcher;
pub mod finality;
pub mod header;
pub mod info;
pub mod time;
pub mod transaction;

pub use archive::TickArchive;
pub use fetcher::{fetch_header, fetch_transactions, FetchedHeader};
pub use finality::{locate, locate_in_archive, ExecutionStatus, Located, Receipt};
pub use header::TickHeader;
pub use info::{fetch_current_tick_info, wait_for_tick, CurrentTickInfo};
pub use time::TickTime;
pub use transaction::Transaction;
