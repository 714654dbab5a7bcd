//! Ticket workflow engine.
//!
//! Every operation that targets one ticket goes through `access::gate`, then performs
//! its conditional update and audit write inside one transaction, and only after commit
//! hands work to the notifier.

pub mod access;
pub mod audit;
pub mod create;
pub mod lifecycle;
pub mod list;
pub mod messages;
pub mod moderation;
pub mod rating;

use crate::app_config::LimitsConfig;
use crate::notifications::Notifier;
use crate::orm::ratings;
use crate::orm::tickets::{self, TicketStatus};
use chrono::NaiveDateTime;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use create::NewTicket;
pub use list::TicketFilters;
pub use messages::NewMessage;
pub use moderation::ReviewAction;
pub use rating::NewRating;

/// Entry point for every ticket operation. Cheap to clone.
#[derive(Clone)]
pub struct TicketService {
    pub db: DatabaseConnection,
    pub notifier: Arc<dyn Notifier>,
    pub limits: LimitsConfig,
}

impl TicketService {
    pub fn new(db: DatabaseConnection, notifier: Arc<dyn Notifier>, limits: LimitsConfig) -> Self {
        Self {
            db,
            notifier,
            limits,
        }
    }
}

/// Caller-supplied pagination. Missing or out-of-range values are clamped.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct PageRequest {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl PageRequest {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
        }
    }

    /// Returns `(page, page_size)` with page >= 1 and page_size in [1, max].
    /// The page is capped so `(page - 1) * page_size` fits a SQL BIGINT offset.
    pub fn resolve(&self, limits: &LimitsConfig) -> (u64, u64) {
        let max = limits.max_page_size.max(1);
        let page_size = self
            .page_size
            .unwrap_or(limits.default_page_size)
            .clamp(1, max);
        let last_page = i64::MAX as u64 / page_size;
        let page = self
            .page
            .unwrap_or(crate::constants::FIRST_PAGE)
            .clamp(crate::constants::FIRST_PAGE, last_page);
        (page, page_size)
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
}

/// Ticket as returned to callers, with its attached image ids.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TicketView {
    pub id: i32,
    pub requester_id: i32,
    pub title: String,
    pub content: String,
    pub category: String,
    pub is_urgent: bool,
    pub is_anonymous: bool,
    pub status: TicketStatus,
    pub assigned_staff_id: Option<i32>,
    pub claimed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub image_ids: Vec<i32>,
}

impl TicketView {
    pub fn new(ticket: tickets::Model, image_ids: Vec<i32>) -> Self {
        Self {
            id: ticket.id,
            requester_id: ticket.requester_id,
            title: ticket.title,
            content: ticket.content,
            category: ticket.category,
            is_urgent: ticket.is_urgent,
            is_anonymous: ticket.is_anonymous,
            status: ticket.status,
            assigned_staff_id: ticket.assigned_staff_id,
            claimed_at: ticket.claimed_at,
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
            image_ids,
        }
    }
}

/// Ticket plus its rating. Messages are paged separately.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TicketDetail {
    #[serde(flatten)]
    pub ticket: TicketView,
    pub rating: Option<ratings::Model>,
}

/// Trimmed copy of `value`, or a validation entry when it is empty or too long.
pub(crate) fn check_text(
    details: &mut std::collections::BTreeMap<String, String>,
    field: &str,
    value: &str,
    max_chars: usize,
) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        details.insert(field.to_owned(), "must not be empty".to_owned());
    } else if trimmed.chars().count() > max_chars {
        details.insert(
            field.to_owned(),
            format!("must be at most {} characters", max_chars),
        );
    }
    trimmed.to_owned()
}
