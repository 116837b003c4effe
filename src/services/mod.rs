pub mod auth;
pub mod tickets;

pub use auth::{AuthError, Claims, JwtKeys};
pub use tickets::{normalize_name, SoldTo, TicketService};
