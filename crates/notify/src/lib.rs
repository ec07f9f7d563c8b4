//! Best-effort webhook notifications behind a window / dedup / cooldown gate.

pub mod error;
pub mod gateway;
pub mod lock;
pub mod payload;
pub mod policy;
pub mod secrets;
pub mod transport;

pub use error::NotifyError;
pub use gateway::{NotificationGateway, NotifyOutcome};
pub use lock::{LockFile, NotificationLock};
pub use policy::SuppressReason;
pub use transport::{HttpTransport, Transport};
