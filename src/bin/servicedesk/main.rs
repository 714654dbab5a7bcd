use actix_session::{config::PersistentSession, storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::{Key, SameSite};
use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use env_logger::Env;
use servicedesk::canned::CannedReplyService;
use servicedesk::db::{apply_schema, get_db_pool, init_db};
use servicedesk::middleware::ClientCtx;
use servicedesk::notifications::{EmailNotifier, Notifier};
use servicedesk::tickets::TicketService;
use servicedesk::web::OperationDeadline;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_lib_mods();
    servicedesk::app_config::init();

    let config = servicedesk::app_config::get_config();
    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| config.database.url.clone());
    init_db(database_url).await;

    apply_schema(get_db_pool())
        .await
        .expect("Failed to apply database schema");

    let secret_key = if config.server.session_secret.len() >= 64 {
        Key::from(config.server.session_secret.as_bytes())
    } else {
        log::warn!("server.session_secret is missing or shorter than 64 bytes. \
            A random key will be used and every session will be invalidated on restart. \
            Set SERVICEDESK_SERVER__SESSION_SECRET to keep sessions across restarts.");
        Key::generate()
    };

    let notifier: Arc<dyn Notifier> = Arc::new(EmailNotifier::new(
        get_db_pool().to_owned(),
        config.email.clone(),
    ));
    let desk = TicketService::new(get_db_pool().to_owned(), notifier, config.limits.clone());
    let canned = CannedReplyService::new(get_db_pool().to_owned(), config.limits.clone());
    let deadline = OperationDeadline(config.database.operation_timeout());
    let secure_cookies = config.server.secure_cookies;

    log::info!("Service desk listening on {}", config.server.bind_address);

    HttpServer::new(move || {
        // Middleware is listed in reverse execution order.
        App::new()
            .app_data(Data::new(desk.clone()))
            .app_data(Data::new(canned.clone()))
            .app_data(Data::new(deadline))
            .wrap(
                DefaultHeaders::new()
                    .add((header::X_FRAME_OPTIONS, "DENY"))
                    .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff")),
            )
            .wrap(ClientCtx::default())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                    .cookie_same_site(SameSite::Lax)
                    .cookie_secure(secure_cookies)
                    .session_lifecycle(PersistentSession::default())
                    .build(),
            )
            .wrap(Logger::new("%a %r %s %Dms"))
            .configure(servicedesk::web::configure)
    })
    .bind(config.server.bind_address.as_str())?
    .run()
    .await
}

/// Initialize third party crates we rely on but don't have control over.
pub fn init_lib_mods() {
    if let Err(e) = dotenv::dotenv() {
        eprintln!("No .env file loaded: {}", e);
    }
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}
