//! tickets.rs
//!
//! Ticket state evaluator, the four guarded transitions and the entrance
//! counters.
//!
//! Each transition first reads the row to tell the caller *why* it is refused,
//! then writes with a conditional UPDATE that repeats the guard. When the
//! UPDATE changes no row the ticket is read again: a concurrent change is
//! reported as the matching refusal, anything else as a consistency error.

use chrono::{DateTime, Utc};
use std::{future::Future, sync::Arc, time::Duration};
use tracing::{error, info, warn};

use crate::{
    error::{Refusal, TicketError},
    models::{Ticket, TicketState, TicketStats, TicketSummary},
    store::{Stat, StoreError, TicketStore},
};

/// Attendee names as written by a door sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoldTo {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Clone)]
pub struct TicketService {
    store: Arc<dyn TicketStore>,
    ticket_max: i32,
    deadline: Duration,
}

impl TicketService {
    pub fn new(store: Arc<dyn TicketStore>, ticket_max: i32, deadline: Duration) -> Self {
        Self { store, ticket_max, deadline }
    }

    pub fn ticket_max(&self) -> i32 {
        self.ticket_max
    }

    /// Ticket numbers outside `0..=ticket_max` never exist.
    pub fn check_range(&self, ticket_num: i64) -> Result<i32, TicketError> {
        i32::try_from(ticket_num)
            .ok()
            .filter(|num| (0..=self.ticket_max).contains(num))
            .ok_or(TicketError::NotFound(ticket_num))
    }

    async fn bounded<T, F>(&self, op: &str, ticket_num: Option<i32>, fut: F) -> Result<T, TicketError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let result = match tokio::time::timeout(self.deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.deadline)),
        };
        result.map_err(|e| {
            error!("{} failed for ticket {:?}: {}", op, ticket_num, e);
            TicketError::StoreUnavailable(e)
        })
    }

    /* ---------- reads ---------- */

    pub async fn ping(&self) -> Result<(), TicketError> {
        self.bounded("ping", None, self.store.ping()).await
    }

    pub async fn classify(&self, ticket_num: i64) -> Result<TicketState, TicketError> {
        let num = self.check_range(ticket_num)?;
        self.classify_num(num).await
    }

    async fn classify_num(&self, num: i32) -> Result<TicketState, TicketError> {
        let (sold, entered) = self
            .bounded("classify", Some(num), self.store.sold_entered(num))
            .await?
            .ok_or(TicketError::NotFound(num.into()))?;
        Ok(TicketState::from_flags(sold, entered.is_some()))
    }

    pub async fn when_entered(&self, ticket_num: i64) -> Result<Option<DateTime<Utc>>, TicketError> {
        let num = self.check_range(ticket_num)?;
        self.when_entered_num(num).await
    }

    async fn when_entered_num(&self, num: i32) -> Result<Option<DateTime<Utc>>, TicketError> {
        self.bounded("when_entered", Some(num), self.store.when_entered(num))
            .await?
            .ok_or(TicketError::NotFound(num.into()))
    }

    pub async fn details(&self, ticket_num: i64) -> Result<Ticket, TicketError> {
        let num = self.check_range(ticket_num)?;
        self.details_num(num).await
    }

    async fn details_num(&self, num: i32) -> Result<Ticket, TicketError> {
        self.bounded("details", Some(num), self.store.ticket(num))
            .await?
            .ok_or(TicketError::NotFound(num.into()))
    }

    pub async fn list(&self) -> Result<Vec<TicketSummary>, TicketError> {
        self.bounded("list", None, self.store.tickets()).await
    }

    pub async fn vendor(&self, ticket_num: i64) -> Result<Option<String>, TicketError> {
        let num = self.check_range(ticket_num)?;
        self.bounded("vendor", Some(num), self.store.vendor(num))
            .await?
            .ok_or(TicketError::NotFound(ticket_num))
    }

    /* ---------- transitions ---------- */

    /// Check-in of a sold ticket.
    pub async fn set_entered(&self, ticket_num: i64) -> Result<(), TicketError> {
        let num = self.check_range(ticket_num)?;

        match self.classify_num(num).await? {
            TicketState::SoldEntered => return Err(self.refuse(num, Refusal::AlreadyEntered)),
            TicketState::Unsold => return Err(self.refuse(num, Refusal::Unsold)),
            TicketState::Sold => {}
        }

        let rows = self
            .bounded("set_entered", Some(num), self.store.mark_entered(num))
            .await?;
        if rows == 0 {
            return Err(match self.classify_num(num).await? {
                TicketState::SoldEntered => self.refuse(num, Refusal::AlreadyEntered),
                TicketState::Unsold => self.refuse(num, Refusal::Unsold),
                TicketState::Sold => self.inconsistent(num, "set_entered", rows),
            });
        }
        self.expect_single(num, "set_entered", rows)?;

        info!("ticket {} entered", num);
        Ok(())
    }

    /// Clears the entry time of a ticket that is inside. `sold` is untouched.
    pub async fn rollback_entrance(&self, ticket_num: i64) -> Result<(), TicketError> {
        let num = self.check_range(ticket_num)?;

        if self.when_entered_num(num).await?.is_none() {
            return Err(self.refuse(num, Refusal::NotEntered));
        }

        let rows = self
            .bounded("rollback_entrance", Some(num), self.store.clear_entrance(num))
            .await?;
        if rows == 0 {
            return Err(match self.when_entered_num(num).await? {
                None => self.refuse(num, Refusal::NotEntered),
                Some(_) => self.inconsistent(num, "rollback_entrance", rows),
            });
        }
        self.expect_single(num, "rollback_entrance", rows)?;

        info!("ticket {} entrance rolled back", num);
        Ok(())
    }

    /// Door sale: records the attendee and lets the ticket in at once.
    pub async fn sell(
        &self,
        ticket_num: i64,
        first_name: &str,
        last_name: &str,
        vendor: &str,
    ) -> Result<SoldTo, TicketError> {
        let num = self.check_range(ticket_num)?;

        let sold_to = SoldTo {
            first_name: normalize_name(first_name),
            last_name: normalize_name(last_name),
        };
        if sold_to.first_name.is_empty() || sold_to.last_name.is_empty() {
            warn!("ticket {} sale without attendee details", num);
            return Err(TicketError::MissingAttendee {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
            });
        }

        let current = self.details_num(num).await?;
        if is_taken(&current) {
            let entered = current.entered.is_some();
            return Err(self.refuse(num, Refusal::AlreadySold { entered }));
        }

        let rows = self
            .bounded(
                "sell",
                Some(num),
                self.store.sell(num, &sold_to.first_name, &sold_to.last_name, vendor),
            )
            .await?;
        if rows == 0 {
            let current = self.details_num(num).await?;
            return Err(if is_taken(&current) {
                let entered = current.entered.is_some();
                self.refuse(num, Refusal::AlreadySold { entered })
            } else {
                self.inconsistent(num, "sell", rows)
            });
        }
        self.expect_single(num, "sell", rows)?;

        info!(
            "ticket {} sold by {} to {} {}",
            num, vendor, sold_to.first_name, sold_to.last_name
        );
        Ok(sold_to)
    }

    /// Administrative undo of a sale: back to the unsold defaults.
    pub async fn reset(&self, ticket_num: i64) -> Result<(), TicketError> {
        let num = self.check_range(ticket_num)?;

        let rows = self.bounded("reset", Some(num), self.store.reset(num)).await?;
        if rows == 0 {
            return Err(TicketError::NotFound(ticket_num));
        }
        self.expect_single(num, "reset", rows)?;

        warn!("ticket {} reset", num);
        Ok(())
    }

    /* ---------- stats ---------- */

    /// Runs the three counters concurrently. A failed counter is left empty
    /// without discarding the others.
    pub async fn stats(&self) -> TicketStats {
        let (inside, sold, paying_entered) = futures::join!(
            self.count(Stat::Inside),
            self.count(Stat::Sold),
            self.count(Stat::PayingEntered),
        );
        TicketStats { inside, sold, paying_entered }
    }

    async fn count(&self, stat: Stat) -> Option<i64> {
        let op = match stat {
            Stat::Inside => "count_inside",
            Stat::Sold => "count_sold",
            Stat::PayingEntered => "count_paying_entered",
        };
        self.bounded(op, None, self.store.count(stat)).await.ok()
    }

    /* ---------- helpers ---------- */

    fn refuse(&self, num: i32, refusal: Refusal) -> TicketError {
        warn!("ticket {}: {}", num, refusal.message());
        refusal.into()
    }

    fn inconsistent(&self, num: i32, op: &str, rows: u64) -> TicketError {
        error!("{} on ticket {} changed {} rows", op, num, rows);
        TicketError::Consistency { ticket_num: num, rows }
    }

    fn expect_single(&self, num: i32, op: &str, rows: u64) -> Result<(), TicketError> {
        if rows == 1 {
            Ok(())
        } else {
            Err(self.inconsistent(num, op, rows))
        }
    }
}

// A first name on an unsold ticket means it is reserved.
fn is_taken(ticket: &Ticket) -> bool {
    ticket.sold || ticket.first_name.is_some()
}

/// Trims, collapses whitespace and upper-cases the first letter of every
/// word, also after `-` and `'`. The rest is kept as typed:
/// "  han   solo-organa " becomes "Han Solo-Organa", "McDonald" stays.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(capitalize_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize_word(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut word_start = true;
    for c in word.chars() {
        if word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        word_start = c == '-' || c == '\'';
    }
    out
}
