//! Access to the `attendees` and `fdp_staff` tables.
//!
//! Every method is a single round trip. Mutations return the number of rows
//! they changed and leave the "exactly one" check to the caller.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

use crate::models::{Staff, Ticket, TicketSummary};

pub use memory::MemoryTicketStore;
pub use postgres::PgTicketStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store round trip exceeded {0:?}")]
    Timeout(Duration),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Entrance counters served by `count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stat {
    /// entered IS NOT NULL
    Inside,
    /// sold = TRUE
    Sold,
    /// entered, sold and not complimentary
    PayingEntered,
}

#[async_trait]
pub trait TicketStore: Send + Sync + 'static {
    async fn ping(&self) -> Result<(), StoreError>;

    /// `(sold, entered)` of a ticket, `None` when the row does not exist.
    async fn sold_entered(
        &self,
        ticket_num: i32,
    ) -> Result<Option<(bool, Option<DateTime<Utc>>)>, StoreError>;

    /// Entry time of a ticket; the outer `None` means no such row.
    async fn when_entered(
        &self,
        ticket_num: i32,
    ) -> Result<Option<Option<DateTime<Utc>>>, StoreError>;

    async fn ticket(&self, ticket_num: i32) -> Result<Option<Ticket>, StoreError>;

    async fn tickets(&self) -> Result<Vec<TicketSummary>, StoreError>;

    /// Vendor of a ticket; the outer `None` means no such row.
    async fn vendor(&self, ticket_num: i32) -> Result<Option<Option<String>>, StoreError>;

    /// Stamps `entered = now()` on a sold ticket that is not inside yet.
    async fn mark_entered(&self, ticket_num: i32) -> Result<u64, StoreError>;

    /// Clears `entered` on a ticket that is inside.
    async fn clear_entrance(&self, ticket_num: i32) -> Result<u64, StoreError>;

    /// Door sale of a ticket that is neither sold nor reserved: records the
    /// attendee, marks it sold by the entrance and lets it in.
    async fn sell(
        &self,
        ticket_num: i32,
        first_name: &str,
        last_name: &str,
        vendor: &str,
    ) -> Result<u64, StoreError>;

    /// Back to the unsold defaults, unconditionally.
    async fn reset(&self, ticket_num: i32) -> Result<u64, StoreError>;

    async fn count(&self, stat: Stat) -> Result<i64, StoreError>;

    async fn staff(&self, username: &str) -> Result<Option<Staff>, StoreError>;
}
