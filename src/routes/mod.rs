pub mod blog;
pub mod comment;
pub mod user;

use actix_web::{http::header, HttpResponse};

/// The redirect half of every handler outcome: 302 with a Location header,
/// the way the site has always answered successful form posts.
pub(crate) fn redirect_to(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}
