//! Metadata rows: files, users, and the used-payment ledger.
//!
//! Backends behind [`RecordStore`]:
//! - `supabase`: PostgREST tables `files`, `users`, `used_payments`
//! - `memory`: concurrent maps with an optional JSON snapshot on disk

pub mod errors;
pub mod memory;
pub mod models;
pub mod store;
pub mod supabase;

pub use errors::{DbError, DbResult};
pub use memory::MemoryStore;
pub use models::{FileRecord, StorageProvider, UsedPayment, UserRecord, ANONYMOUS_OWNER};
pub use store::{ClaimOutcome, RecordStore, RedeemOutcome};
pub use supabase::SupabaseDb;
