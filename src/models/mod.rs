pub mod event;
pub mod profile;
pub mod registration;
pub mod ticket_type;
pub mod venue;
pub mod views;

pub use event::{Event, EventStatus};
pub use profile::{AppRole, Profile};
pub use registration::{Registration, RegistrationStatus};
pub use ticket_type::{TicketKind, TicketType};
pub use venue::Venue;
pub use views::{
    DashboardStats, EventWithTickets, RollEntry, TicketAvailability, UserRegistrationRow,
};
