//! SeaORM entities, one module per table.

pub mod audit_logs;
pub mod canned_replies;
pub mod images;
pub mod ratings;
pub mod spam_flags;
pub mod ticket_images;
pub mod ticket_messages;
pub mod tickets;
pub mod users;
