use crate::error::ServiceError;
use crate::orm::users;
use crate::session::authenticate_client_by_session;
use actix_session::{Session, SessionExt};
use actix_web::dev::{self, Extensions, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{web::Data, Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, LocalBoxFuture, Ready};
use sea_orm::DatabaseConnection;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Who is asking, resolved once per request.
#[derive(Clone, Debug)]
pub struct ClientCtxInner {
    /// User data. None is a guest.
    pub client: Option<users::Model>,
    /// Drives the inbox badge.
    pub unread_notifications: u64,
    pub request_start: Instant,
}

impl Default for ClientCtxInner {
    fn default() -> Self {
        Self {
            client: None,
            unread_notifications: 0,
            request_start: Instant::now(),
        }
    }
}

impl ClientCtxInner {
    pub async fn from_session(db: &DatabaseConnection, session: &Session) -> Self {
        let client = match authenticate_client_by_session(db, session).await {
            Ok(client) => client,
            Err(e) => {
                log::error!("Failed to resolve session user: {}", e);
                None
            }
        };

        let unread_notifications = match client {
            Some(ref user) => crate::notifications::count_unread(db, user.id)
                .await
                .unwrap_or(0),
            None => 0,
        };

        ClientCtxInner {
            client,
            unread_notifications,
            ..Default::default()
        }
    }
}

/// Shared handle on [`ClientCtxInner`]; cheap to clone into templates.
#[derive(Clone, Debug)]
pub struct ClientCtx(Data<ClientCtxInner>);

impl Default for ClientCtx {
    fn default() -> Self {
        Self(Data::new(ClientCtxInner::default()))
    }
}

impl ClientCtx {
    pub fn get_or_default_from_extensions(extensions: &mut Extensions) -> Self {
        match extensions.get::<Data<ClientCtxInner>>() {
            Some(cbox) => Self(cbox.clone()),
            None => {
                let cbox = Data::new(ClientCtxInner::default());
                extensions.insert(cbox.clone());
                Self(cbox)
            }
        }
    }

    pub fn get_id(&self) -> Option<i32> {
        self.0.client.as_ref().map(|u| u.id)
    }

    /// Returns the nickname, or the word for guest.
    pub fn get_name(&self) -> String {
        match &self.0.client {
            Some(user) => user.nickname.to_owned(),
            None => "Guest".to_owned(),
        }
    }

    pub fn get_user(&self) -> Option<&users::Model> {
        self.0.client.as_ref()
    }

    pub fn get_unread_notifications(&self) -> u64 {
        self.0.unread_notifications
    }

    pub fn is_user(&self) -> bool {
        self.0.client.is_some()
    }

    /// Time spent on this request so far.
    pub fn request_time(&self) -> Duration {
        Instant::now() - self.0.request_start
    }

    /// Require user to be logged in. Returns user_id or Unauthorized.
    pub fn require_login(&self) -> Result<i32, ServiceError> {
        self.get_id().ok_or(ServiceError::Unauthorized)
    }

    /// Require the signed-in user to be `owner_id`.
    pub fn require_ownership(&self, owner_id: i32) -> Result<i32, ServiceError> {
        let user_id = self.require_login()?;
        if user_id == owner_id {
            Ok(user_id)
        } else {
            Err(ServiceError::Forbidden)
        }
    }
}

/// Lets handlers take `client: ClientCtx` as an argument.
impl FromRequest for ClientCtx {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(ClientCtx::get_or_default_from_extensions(
            &mut req.extensions_mut(),
        )))
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

/// Resolves the session user before the handler runs.
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
        let session = req.get_session();

        Box::pin(async move {
            // Without a database there is no user to resolve; routes see a guest.
            if let Some(db) = req.app_data::<Data<DatabaseConnection>>() {
                let db = db.clone();
                let inner = ClientCtxInner::from_session(&db, &session).await;
                req.extensions_mut().insert(Data::new(inner));
            }

            svc.call(req).await
        })
    }
}
