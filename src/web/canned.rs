use super::{with_deadline, OperationDeadline};
use crate::canned::{CannedReplyChanges, CannedReplyService, NewCannedReply};
use crate::middleware::ClientCtx;
use crate::tickets::PageRequest;
use actix_web::{delete, get, patch, post, web, Error, HttpResponse};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_canned_replies)
        .service(create_canned_reply)
        .service(update_canned_reply)
        .service(delete_canned_reply);
}

#[get("/api/admin/canned-replies")]
async fn list_canned_replies(
    client: ClientCtx,
    canned: web::Data<CannedReplyService>,
    deadline: Option<web::Data<OperationDeadline>>,
    page: web::Query<PageRequest>,
) -> Result<HttpResponse, Error> {
    let caller_id = client.require_login()?;
    let replies = with_deadline(deadline.as_ref(), canned.list(caller_id, page.into_inner())).await?;
    Ok(HttpResponse::Ok().json(replies))
}

#[post("/api/admin/canned-replies")]
async fn create_canned_reply(
    client: ClientCtx,
    canned: web::Data<CannedReplyService>,
    deadline: Option<web::Data<OperationDeadline>>,
    form: web::Json<NewCannedReply>,
) -> Result<HttpResponse, Error> {
    let caller_id = client.require_login()?;
    let reply = with_deadline(deadline.as_ref(), canned.create(caller_id, form.into_inner())).await?;
    Ok(HttpResponse::Created().json(reply))
}

#[patch("/api/admin/canned-replies/{reply_id}")]
async fn update_canned_reply(
    client: ClientCtx,
    canned: web::Data<CannedReplyService>,
    deadline: Option<web::Data<OperationDeadline>>,
    path: web::Path<i32>,
    form: web::Json<CannedReplyChanges>,
) -> Result<HttpResponse, Error> {
    let caller_id = client.require_login()?;
    let reply = with_deadline(
        deadline.as_ref(),
        canned.update(caller_id, path.into_inner(), form.into_inner()),
    )
    .await?;
    Ok(HttpResponse::Ok().json(reply))
}

#[delete("/api/admin/canned-replies/{reply_id}")]
async fn delete_canned_reply(
    client: ClientCtx,
    canned: web::Data<CannedReplyService>,
    deadline: Option<web::Data<OperationDeadline>>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let caller_id = client.require_login()?;
    with_deadline(deadline.as_ref(), canned.delete(caller_id, path.into_inner())).await?;
    Ok(HttpResponse::NoContent().finish())
}
