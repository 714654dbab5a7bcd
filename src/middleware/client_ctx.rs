use crate::constants::SESSION_USER_ID;
use actix_session::{Session, SessionExt};
use actix_web::dev::{self, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{web::Data, Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;

/// Client data stored for a single request cycle.
#[derive(Clone, Debug, Default)]
pub struct ClientCtxInner {
    /// Authenticated user id from the session. None is an anonymous caller.
    pub user_id: Option<i32>,
}

impl ClientCtxInner {
    pub fn from_session(session: &Session) -> Self {
        let user_id = match session.get::<i32>(SESSION_USER_ID) {
            Ok(id) => id,
            Err(err) => {
                log::warn!("Discarding unreadable session user id: {}", err);
                None
            }
        };

        ClientCtxInner { user_id }
    }
}

/// Client context passed to routes.
/// Wraps ClientCtxInner, which is set at the beginning of the request.
#[derive(Clone, Debug)]
pub struct ClientCtx(Data<ClientCtxInner>);

impl Default for ClientCtx {
    fn default() -> Self {
        Self(Data::new(ClientCtxInner::default()))
    }
}

impl ClientCtx {
    /// Returns either the user's id or None.
    pub fn get_id(&self) -> Option<i32> {
        self.0.user_id
    }

    /// Require user to be logged in. Returns user_id or ErrorUnauthorized.
    pub fn require_login(&self) -> Result<i32, actix_web::Error> {
        self.get_id()
            .ok_or_else(|| actix_web::error::ErrorUnauthorized("Login required"))
    }
}

/// This implementation is what actually provides the `client: ClientCtx` in the parameters of route functions.
impl FromRequest for ClientCtx {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        if let Some(inner) = req.extensions().get::<Data<ClientCtxInner>>() {
            return ready(Ok(Self(inner.clone())));
        }

        // Middleware not mounted; read the session directly.
        let inner = Data::new(ClientCtxInner::from_session(&req.get_session()));
        req.extensions_mut().insert(inner.clone());
        ready(Ok(Self(inner)))
    }
}

impl<S: 'static, B> Transform<S, ServiceRequest> for ClientCtx
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ClientCtxMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ClientCtxMiddleware {
            service: Rc::new(service),
        }))
    }
}

/// Client context middleware
pub struct ClientCtxMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ClientCtxMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();

        let inner = ClientCtxInner::from_session(&req.get_session());
        req.extensions_mut().insert(Data::new(inner));

        Box::pin(async move {
            let res = svc.call(req).await?;
            Ok(res)
        })
    }
}
