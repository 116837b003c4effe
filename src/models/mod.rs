pub mod staff;
pub mod ticket;

pub use staff::Staff;
pub use ticket::{Ticket, TicketState, TicketStats, TicketSummary};
