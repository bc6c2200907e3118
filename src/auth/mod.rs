pub mod password;

use actix_session::{storage::CookieSessionStore, Session, SessionExt, SessionMiddleware};
use actix_web::{cookie::Key, dev::Payload, web::Data, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use serde::{Deserialize, Serialize};

use crate::app::{AppError, AppState};
use crate::database::models::user::User;

const USER_ID_KEY: &str = "user_id";
const FLASH_KEY: &str = "_flashes";

/// Builds the cookie-backed session layer shared by the server and the
/// tests. The cookie is signed with `key`; `secure` stays off because the
/// site terminates plain http in development.
pub fn session_middleware(key: Key) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_secure(false)
        .build()
}

/// Derives the cookie signing key from `SECRET_KEY`, with a fixed
/// development fallback. Set a real secret in production.
pub fn session_key() -> Key {
    let secret = std::env::var("SECRET_KEY")
        .unwrap_or_else(|_| String::from("inkpost-development-secret-inkpost-development-secret"));

    Key::derive_from(secret.as_bytes())
}

/// Moves the session from Anonymous to Authenticated: fresh session id,
/// actor id stored in the cookie.
pub fn log_in(session: &Session, user: &User) -> Result<(), AppError> {
    session.renew();
    session
        .insert(USER_ID_KEY, user.id)
        .map_err(|_| AppError::InternalServerError)
}

/// Back to Anonymous. Drops every session key.
pub fn log_out(session: &Session) {
    session.purge();
}

/// A one-shot notification, shown on the next page and then gone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flash {
    pub level: String,
    pub message: String,
}

/// Queues a notification for the next rendered page.
pub fn flash(session: &Session, level: &str, message: &str) {
    let mut pending = session
        .get::<Vec<Flash>>(FLASH_KEY)
        .ok()
        .flatten()
        .unwrap_or_default();
    pending.push(Flash {
        level: level.to_string(),
        message: message.to_string(),
    });

    let _ = session.insert(FLASH_KEY, pending);
}

/// Drains the queued notifications; each one is delivered exactly once.
pub fn take_flashes(session: &Session) -> Vec<Flash> {
    let pending = session
        .get::<Vec<Flash>>(FLASH_KEY)
        .ok()
        .flatten()
        .unwrap_or_default();
    session.remove(FLASH_KEY);

    pending
}

fn load_actor(req: &HttpRequest) -> Result<Option<User>, AppError> {
    let session = req.get_session();
    let user_id = match session.get::<i32>(USER_ID_KEY) {
        Ok(Some(id)) => id,
        //no session, or a cookie this deployment cannot read
        _ => return Ok(None),
    };

    let app_state = req
        .app_data::<Data<AppState>>()
        .ok_or(AppError::InternalServerError)?;
    let mut conn = app_state.conn()?;

    match User::find_by_id(&mut conn, user_id) {
        Ok(user) => Ok(Some(user)),
        //stale cookie naming an account that no longer exists
        Err(AppError::NotFound) => {
            session.purge();
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// The require-login guard as an extractor: resolves the authenticated
/// actor, or fails with [AppError::Unauthorized] — a redirect to the login
/// page — before the handler body runs.
pub struct AuthedUser(pub User);

impl FromRequest for AuthedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(load_actor(req).and_then(|actor| {
            actor.map(AuthedUser).ok_or(AppError::Unauthorized)
        }))
    }
}

/// The current actor if there is one; anonymous visitors extract to `None`.
pub struct MaybeUser(pub Option<User>);

impl FromRequest for MaybeUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(load_actor(req).map(MaybeUser))
    }
}
