use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Default `resp_vendor` for tickets issued by the generator.
pub const GENERATOR_VENDOR: &str = "Generator";
/// `resp_vendor` of tickets sold at the door.
pub const ENTRANCE_VENDOR: &str = "Entrance";

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub ticket_num: i32,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// 0 marks a complimentary ticket, anything above is paid.
    pub ticket_type: i32,
    pub sold: bool,
    pub vendor: Option<String>,
    pub resp_vendor: String,
    pub entered: Option<DateTime<Utc>>,
}

impl Ticket {
    pub fn unsold(ticket_num: i32, ticket_type: i32) -> Self {
        Self {
            ticket_num,
            first_name: None,
            last_name: None,
            ticket_type,
            sold: false,
            vendor: None,
            resp_vendor: GENERATOR_VENDOR.to_string(),
            entered: None,
        }
    }

    pub fn state(&self) -> TicketState {
        TicketState::from_flags(self.sold, self.entered.is_some())
    }

    pub fn is_paying(&self) -> bool {
        self.ticket_type > 0
    }
}

/// Row of the tickets list.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketSummary {
    pub ticket_num: i32,
    pub ticket_type: i32,
    pub sold: bool,
    pub entered: Option<DateTime<Utc>>,
}

impl From<&Ticket> for TicketSummary {
    fn from(ticket: &Ticket) -> Self {
        Self {
            ticket_num: ticket.ticket_num,
            ticket_type: ticket.ticket_type,
            sold: ticket.sold,
            entered: ticket.entered,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketState {
    SoldEntered,
    Sold,
    Unsold,
}

impl TicketState {
    /// `sold` dominates: an unsold ticket is `Unsold` even if it carries an entry time.
    pub fn from_flags(sold: bool, entered: bool) -> Self {
        match (sold, entered) {
            (false, _) => TicketState::Unsold,
            (true, false) => TicketState::Sold,
            (true, true) => TicketState::SoldEntered,
        }
    }
}

/// The three entrance counters. `None` means the count could not be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TicketStats {
    pub inside: Option<i64>,
    pub sold: Option<i64>,
    pub paying_entered: Option<i64>,
}

impl TicketStats {
    pub fn is_complete(&self) -> bool {
        self.inside.is_some() && self.sold.is_some() && self.paying_entered.is_some()
    }
}
