pub mod date;
pub mod event;
pub mod ticket;
pub mod validation;

pub use self::{event::Event, ticket::Ticket};
