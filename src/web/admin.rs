//! Staff workflow endpoints: lifecycle transitions and spam moderation.

use super::{with_deadline, OperationDeadline};
use crate::middleware::ClientCtx;
use crate::tickets::TicketService;
use actix_web::{post, web, Error, HttpResponse};
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(claim_ticket)
        .service(unclaim_ticket)
        .service(resolve_ticket)
        .service(close_ticket)
        .service(flag_spam)
        .service(review_spam);
}

#[derive(Deserialize)]
struct SpamFlagForm {
    reason: String,
}

#[derive(Deserialize)]
struct SpamReviewForm {
    action: String,
}

#[post("/api/admin/tickets/{ticket_id}/claim")]
async fn claim_ticket(
    client: ClientCtx,
    desk: web::Data<TicketService>,
    deadline: Option<web::Data<OperationDeadline>>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let caller_id = client.require_login()?;
    with_deadline(deadline.as_ref(), desk.claim_ticket(caller_id, path.into_inner())).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/api/admin/tickets/{ticket_id}/unclaim")]
async fn unclaim_ticket(
    client: ClientCtx,
    desk: web::Data<TicketService>,
    deadline: Option<web::Data<OperationDeadline>>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let caller_id = client.require_login()?;
    with_deadline(deadline.as_ref(), desk.unclaim_ticket(caller_id, path.into_inner())).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/api/admin/tickets/{ticket_id}/resolve")]
async fn resolve_ticket(
    client: ClientCtx,
    desk: web::Data<TicketService>,
    deadline: Option<web::Data<OperationDeadline>>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let caller_id = client.require_login()?;
    with_deadline(deadline.as_ref(), desk.resolve_ticket(caller_id, path.into_inner())).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/api/admin/tickets/{ticket_id}/close")]
async fn close_ticket(
    client: ClientCtx,
    desk: web::Data<TicketService>,
    deadline: Option<web::Data<OperationDeadline>>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let caller_id = client.require_login()?;
    with_deadline(deadline.as_ref(), desk.close_ticket(caller_id, path.into_inner())).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/api/admin/tickets/{ticket_id}/spam-flag")]
async fn flag_spam(
    client: ClientCtx,
    desk: web::Data<TicketService>,
    deadline: Option<web::Data<OperationDeadline>>,
    path: web::Path<i32>,
    form: web::Json<SpamFlagForm>,
) -> Result<HttpResponse, Error> {
    let caller_id = client.require_login()?;
    let flag = with_deadline(
        deadline.as_ref(),
        desk.flag_spam(caller_id, path.into_inner(), &form.reason),
    )
    .await?;
    Ok(HttpResponse::Created().json(flag))
}

#[post("/api/admin/tickets/{ticket_id}/spam-review")]
async fn review_spam(
    client: ClientCtx,
    desk: web::Data<TicketService>,
    deadline: Option<web::Data<OperationDeadline>>,
    path: web::Path<i32>,
    form: web::Json<SpamReviewForm>,
) -> Result<HttpResponse, Error> {
    let caller_id = client.require_login()?;
    with_deadline(
        deadline.as_ref(),
        desk.review_spam(caller_id, path.into_inner(), &form.action),
    )
    .await?;
    Ok(HttpResponse::NoContent().finish())
}
