use std::fmt::Display;

use actix_web::{http::header, HttpResponse, ResponseError};
use diesel::{
    r2d2::{ConnectionManager, Pool, PooledConnection},
    SqliteConnection,
};

use crate::database::db_utils;
use crate::media::MediaStore;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

/** Used for storing the database pool and media paths when handling requests.
Built once at startup and injected into every handler via `web::Data`. */
pub struct AppState {
    pub pool: DbPool,
    pub media: MediaStore,
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            media: self.media.clone(),
        }
    }
}

impl AppState {
    /// Connects the pool and prepares the schema. When `database_url` is
    /// `None` the url is taken from the `DATABASE_URL` environment variable
    /// (falling back to a local `inkpost.db` file).
    pub fn new(database_url: Option<&str>) -> Self {
        let pool = db_utils::connect_to_db(database_url);
        db_utils::init_schema(&pool);

        Self {
            pool,
            media: MediaStore::from_env(),
        }
    }

    pub fn conn(&self) -> Result<DbConnection, AppError> {
        self.pool.get().map_err(|_| AppError::InternalServerError)
    }
}

/** Holds the errors we will use during request processing */
#[derive(Debug, PartialEq, Eq)]
pub enum AppError {
    /// No session; rendered as a redirect to the login page.
    Unauthorized,
    /// Actor is not the owner of the resource.
    Forbidden,
    NotFound,
    /// Username or email already taken.
    DuplicateIdentity,
    /// Unknown email or wrong password, deliberately indistinguishable.
    InvalidCredentials,
    BadRequest,
    InternalServerError,
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Unauthorized => f.write_str("Login required"),
            AppError::Forbidden => f.write_str("Forbidden"),
            AppError::NotFound => f.write_str("Not found"),
            AppError::DuplicateIdentity => {
                f.write_str("User with that email or username already exists")
            }
            AppError::InvalidCredentials => f.write_str("Invalid credentials"),
            AppError::BadRequest => f.write_str("Bad request"),
            AppError::InternalServerError => f.write_str("Internal server error"),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        match self {
            AppError::Unauthorized => StatusCode::FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::DuplicateIdentity => StatusCode::CONFLICT,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::BadRequest => StatusCode::BAD_REQUEST,
            AppError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            //Guard failure sends the visitor to the login form, the
            //handler body never ran
            AppError::Unauthorized => HttpResponse::Found()
                .insert_header((header::LOCATION, "/login"))
                .finish(),
            _ => HttpResponse::build(self.status_code())
                .json(serde_json::json!({ "error": self.to_string() })),
        }
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match err {
            Error::NotFound => AppError::NotFound,
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                AppError::DuplicateIdentity
            }
            Error::DatabaseError(_, _) => AppError::InternalServerError,
            Error::QueryBuilderError(_) => AppError::BadRequest,
            Error::DeserializationError(_) => AppError::BadRequest,
            _ => AppError::InternalServerError,
        }
    }
}

impl From<diesel::r2d2::PoolError> for AppError {
    fn from(_: diesel::r2d2::PoolError) -> Self {
        AppError::InternalServerError
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(_: actix_web::error::BlockingError) -> Self {
        AppError::InternalServerError
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => AppError::NotFound,
            _ => AppError::InternalServerError,
        }
    }
}

impl std::error::Error for AppError {}
