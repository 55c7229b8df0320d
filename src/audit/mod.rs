pub mod error;
pub mod record;
pub mod sink;
pub mod trail;

pub use error::{AuditError, AuditErrorKind};
pub use record::{AuditEntry, AuditRecord, AuditStatus};
pub use sink::{AuditSink, InMemoryAuditSink, JsonlAuditSink};
pub use trail::AuditTrail;
