pub mod app_config;
pub mod canned;
pub mod constants;
pub mod db;
pub mod email;
pub mod error;
pub mod image;
pub mod middleware;
pub mod notifications;
pub mod orm;
pub mod tickets;
pub mod user;
pub mod web;

pub use error::{DeskError, DeskResult};
