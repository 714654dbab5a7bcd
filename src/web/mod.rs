pub mod admin;
pub mod canned;
pub mod tickets;

use crate::error::{DeskError, DeskResult};
use actix_web::web::Data;
use std::future::Future;
use std::time::Duration;

/// Upper bound on a single desk operation issued from a request.
#[derive(Clone, Copy, Debug)]
pub struct OperationDeadline(pub Duration);

impl Default for OperationDeadline {
    fn default() -> Self {
        Self(crate::app_config::database().operation_timeout())
    }
}

/// Await `op` under the deadline. An expired deadline drops the operation, which rolls
/// back any transaction it had open.
pub(crate) async fn with_deadline<T, F>(
    deadline: Option<&Data<OperationDeadline>>,
    op: F,
) -> Result<T, actix_web::Error>
where
    F: Future<Output = DeskResult<T>>,
{
    let limit = deadline.map(|d| d.0).unwrap_or_else(|| OperationDeadline::default().0);
    match actix_web::rt::time::timeout(limit, op).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            Err(DeskError::Internal(format!("operation exceeded {:?} deadline", limit)).into())
        }
    }
}

/// Configures the web app by adding services from each web file.
///
/// @see https://docs.rs/actix-web/4.0.1/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    admin::configure(conf);
    canned::configure(conf);
    tickets::configure(conf);
}
