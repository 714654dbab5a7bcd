//! Best-effort side channel fired after desk mutations commit.
//!
//! Implementations must be cheap to clone behind an `Arc` and must never be relied on
//! for correctness. Callers go through `dispatcher::dispatch`, which detaches the call.

pub mod dispatcher;
pub mod types;

use crate::app_config::EmailConfig;
use crate::user::get_mail_recipient;
use async_trait::async_trait;
use sea_orm::DatabaseConnection;

pub use dispatcher::dispatch;
pub use types::{Notice, NotificationType, Recipient};

pub type NotifyResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn ticket_created(&self, ticket_id: i32, requester_id: i32, title: String) -> NotifyResult;

    async fn ticket_claimed(&self, ticket_id: i32, requester_id: i32, staff_id: i32) -> NotifyResult;

    async fn ticket_resolved(&self, ticket_id: i32, requester_id: i32, staff_id: i32) -> NotifyResult;

    async fn new_message(
        &self,
        ticket_id: i32,
        recipient_id: i32,
        sender_id: i32,
        body: String,
    ) -> NotifyResult;

    async fn ticket_rated(&self, ticket_id: i32, staff_id: i32, stars: i32) -> NotifyResult;
}

/// Drops every event. For deployments without outbound mail.
#[derive(Clone, Debug, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn ticket_created(&self, _: i32, _: i32, _: String) -> NotifyResult {
        Ok(())
    }

    async fn ticket_claimed(&self, _: i32, _: i32, _: i32) -> NotifyResult {
        Ok(())
    }

    async fn ticket_resolved(&self, _: i32, _: i32, _: i32) -> NotifyResult {
        Ok(())
    }

    async fn new_message(&self, _: i32, _: i32, _: i32, _: String) -> NotifyResult {
        Ok(())
    }

    async fn ticket_rated(&self, _: i32, _: i32, _: i32) -> NotifyResult {
        Ok(())
    }
}

/// Mails each notice to its recipient, honouring `allow_email`.
#[derive(Clone, Debug)]
pub struct EmailNotifier {
    pub db: DatabaseConnection,
    pub config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(db: DatabaseConnection, config: EmailConfig) -> Self {
        Self { db, config }
    }

    async fn deliver(&self, notice: Notice) -> NotifyResult {
        let (address, name) = match notice.recipient {
            Recipient::StaffMailbox => (
                self.config.staff_mailbox().to_owned(),
                self.config.from_name.clone(),
            ),
            Recipient::User(user_id) => match get_mail_recipient(&self.db, user_id).await? {
                Some(recipient) => recipient,
                None => {
                    log::debug!(
                        "Skipping {} notice: user {} has no deliverable address",
                        notice.kind.as_str(),
                        user_id
                    );
                    return Ok(());
                }
            },
        };

        if address.is_empty() {
            log::warn!("Dropping {} notice: no staff mailbox configured", notice.kind.as_str());
            return Ok(());
        }

        let body = format!("Hello {},\n\n{}\n", name, notice.body);
        crate::email::send_email(&self.config, &address, &notice.subject, &body).await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn ticket_created(&self, ticket_id: i32, requester_id: i32, title: String) -> NotifyResult {
        self.deliver(Notice::ticket_created(ticket_id, requester_id, &title))
            .await
    }

    async fn ticket_claimed(&self, ticket_id: i32, requester_id: i32, _staff_id: i32) -> NotifyResult {
        self.deliver(Notice::ticket_claimed(ticket_id, requester_id))
            .await
    }

    async fn ticket_resolved(&self, ticket_id: i32, requester_id: i32, _staff_id: i32) -> NotifyResult {
        self.deliver(Notice::ticket_resolved(ticket_id, requester_id))
            .await
    }

    async fn new_message(
        &self,
        ticket_id: i32,
        recipient_id: i32,
        _sender_id: i32,
        body: String,
    ) -> NotifyResult {
        self.deliver(Notice::new_message(ticket_id, recipient_id, &body))
            .await
    }

    async fn ticket_rated(&self, ticket_id: i32, staff_id: i32, stars: i32) -> NotifyResult {
        self.deliver(Notice::ticket_rated(ticket_id, staff_id, stars))
            .await
    }
}
