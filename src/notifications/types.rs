//! Notification type definitions

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationType {
    TicketCreated,  // A requester opened a ticket
    TicketClaimed,  // A staff member took the ticket
    TicketResolved, // The assignee marked the ticket resolved
    NewMessage,     // The counterpart posted in the thread
    TicketRated,    // The requester rated the handling
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TicketCreated => "ticket_created",
            Self::TicketClaimed => "ticket_claimed",
            Self::TicketResolved => "ticket_resolved",
            Self::NewMessage => "new_message",
            Self::TicketRated => "ticket_rated",
        }
    }
}

/// Who a notice is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// A desk user, resolved through the users table.
    User(i32),
    /// The shared staff inbox, see `EmailConfig::staff_mailbox`.
    StaffMailbox,
}

/// A rendered notification addressed to one recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NotificationType,
    pub recipient: Recipient,
    pub subject: String,
    pub body: String,
}

const PREVIEW_CHARS: usize = 200;

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        out.push_str("...");
    }
    out
}

impl Notice {
    pub fn ticket_created(ticket_id: i32, requester_id: i32, title: &str) -> Self {
        Self {
            kind: NotificationType::TicketCreated,
            recipient: Recipient::StaffMailbox,
            subject: format!("[Ticket #{}] New ticket: {}", ticket_id, title),
            body: format!(
                "User #{} opened ticket #{} \"{}\". It is waiting in the queue to be claimed.",
                requester_id, ticket_id, title
            ),
        }
    }

    pub fn ticket_claimed(ticket_id: i32, requester_id: i32) -> Self {
        Self {
            kind: NotificationType::TicketClaimed,
            recipient: Recipient::User(requester_id),
            subject: format!("[Ticket #{}] A staff member is on it", ticket_id),
            body: format!("Ticket #{} has been claimed and is being worked on.", ticket_id),
        }
    }

    pub fn ticket_resolved(ticket_id: i32, requester_id: i32) -> Self {
        Self {
            kind: NotificationType::TicketResolved,
            recipient: Recipient::User(requester_id),
            subject: format!("[Ticket #{}] Resolved", ticket_id),
            body: format!(
                "Ticket #{} has been marked resolved. You can rate how it was handled.",
                ticket_id
            ),
        }
    }

    pub fn new_message(ticket_id: i32, recipient_id: i32, body: &str) -> Self {
        Self {
            kind: NotificationType::NewMessage,
            recipient: Recipient::User(recipient_id),
            subject: format!("[Ticket #{}] New message", ticket_id),
            body: preview(body),
        }
    }

    pub fn ticket_rated(ticket_id: i32, staff_id: i32, stars: i32) -> Self {
        Self {
            kind: NotificationType::TicketRated,
            recipient: Recipient::User(staff_id),
            subject: format!("[Ticket #{}] Rated {}/5", ticket_id, stars),
            body: format!("The requester rated ticket #{} with {} of 5 stars.", ticket_id, stars),
        }
    }
}
