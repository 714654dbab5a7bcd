//! Requester-facing ticket endpoints. Staff use the same routes to read.

use super::{with_deadline, OperationDeadline};
use crate::middleware::ClientCtx;
use crate::tickets::{NewMessage, NewRating, NewTicket, PageRequest, TicketFilters, TicketService};
use actix_web::{get, post, web, Error, HttpResponse};
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_tickets)
        .service(create_ticket)
        .service(view_ticket)
        .service(list_messages)
        .service(post_message)
        .service(view_rating)
        .service(rate_ticket);
}

/// Query string for the ticket listing.
#[derive(Debug, Default, Deserialize)]
struct ListTicketsQuery {
    status: Option<String>,
    category: Option<String>,
    is_urgent: Option<bool>,
    assigned_to_me: Option<bool>,
    page: Option<u64>,
    page_size: Option<u64>,
}

#[get("/api/tickets")]
async fn list_tickets(
    client: ClientCtx,
    desk: web::Data<TicketService>,
    deadline: Option<web::Data<OperationDeadline>>,
    query: web::Query<ListTicketsQuery>,
) -> Result<HttpResponse, Error> {
    let caller_id = client.require_login()?;
    let query = query.into_inner();

    let filters = TicketFilters {
        status: query.status,
        category: query.category,
        is_urgent: query.is_urgent,
        assigned_to_me: query.assigned_to_me,
    };
    let page = PageRequest {
        page: query.page,
        page_size: query.page_size,
    };

    let tickets = with_deadline(
        deadline.as_ref(),
        desk.list_tickets(caller_id, filters, page),
    )
    .await?;
    Ok(HttpResponse::Ok().json(tickets))
}

#[post("/api/tickets")]
async fn create_ticket(
    client: ClientCtx,
    desk: web::Data<TicketService>,
    deadline: Option<web::Data<OperationDeadline>>,
    form: web::Json<NewTicket>,
) -> Result<HttpResponse, Error> {
    let caller_id = client.require_login()?;
    let ticket = with_deadline(
        deadline.as_ref(),
        desk.create_ticket(caller_id, form.into_inner()),
    )
    .await?;
    Ok(HttpResponse::Created().json(ticket))
}

#[get("/api/tickets/{ticket_id}")]
async fn view_ticket(
    client: ClientCtx,
    desk: web::Data<TicketService>,
    deadline: Option<web::Data<OperationDeadline>>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let caller_id = client.require_login()?;
    let detail = with_deadline(
        deadline.as_ref(),
        desk.get_ticket_detail(caller_id, path.into_inner()),
    )
    .await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[get("/api/tickets/{ticket_id}/messages")]
async fn list_messages(
    client: ClientCtx,
    desk: web::Data<TicketService>,
    deadline: Option<web::Data<OperationDeadline>>,
    path: web::Path<i32>,
    page: web::Query<PageRequest>,
) -> Result<HttpResponse, Error> {
    let caller_id = client.require_login()?;
    let messages = with_deadline(
        deadline.as_ref(),
        desk.list_messages(caller_id, path.into_inner(), page.into_inner()),
    )
    .await?;
    Ok(HttpResponse::Ok().json(messages))
}

#[post("/api/tickets/{ticket_id}/messages")]
async fn post_message(
    client: ClientCtx,
    desk: web::Data<TicketService>,
    deadline: Option<web::Data<OperationDeadline>>,
    path: web::Path<i32>,
    form: web::Json<NewMessage>,
) -> Result<HttpResponse, Error> {
    let caller_id = client.require_login()?;
    let message = with_deadline(
        deadline.as_ref(),
        desk.post_message(caller_id, path.into_inner(), form.into_inner()),
    )
    .await?;
    Ok(HttpResponse::Created().json(message))
}

#[get("/api/tickets/{ticket_id}/rating")]
async fn view_rating(
    client: ClientCtx,
    desk: web::Data<TicketService>,
    deadline: Option<web::Data<OperationDeadline>>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let caller_id = client.require_login()?;
    let rating = with_deadline(
        deadline.as_ref(),
        desk.get_rating(caller_id, path.into_inner()),
    )
    .await?;
    Ok(HttpResponse::Ok().json(rating))
}

#[post("/api/tickets/{ticket_id}/rating")]
async fn rate_ticket(
    client: ClientCtx,
    desk: web::Data<TicketService>,
    deadline: Option<web::Data<OperationDeadline>>,
    path: web::Path<i32>,
    form: web::Json<NewRating>,
) -> Result<HttpResponse, Error> {
    let caller_id = client.require_login()?;
    let rating = with_deadline(
        deadline.as_ref(),
        desk.rate_ticket(caller_id, path.into_inner(), form.into_inner()),
    )
    .await?;
    Ok(HttpResponse::Created().json(rating))
}
