pub mod action;
pub mod buffer;
pub mod journal;
pub mod sentinel;
pub mod writer;

pub use action::{ActionReceipt, ActionRecorder, AgentAction, UNVERIFIED_MARKER};
pub use buffer::{BufferEntry, ContextBuffer};
pub use journal::DailyDocument;
pub use sentinel::{Sentinel, clock_from_config};
pub use writer::{LogContent, LogOptions, LogReceipt, LogWriter};
