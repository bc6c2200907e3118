use actix_session::Session;
use actix_web::{
    post,
    web::{self, Data},
    HttpResponse,
};

use crate::{
    app::{AppError, AppState},
    auth::{self, MaybeUser},
    database::models::{blog::Blog, comment::Comment},
    forms::CommentForm,
};

/// Pipe for commenting on a blog
/// - url: `{domain}/blog/{blog_id}` (POST)
///
/// # HTTP request requirements
/// ## body
/// - form field `text`
///
/// # Response
/// ## Ok
/// - redirect back to the blog; anonymous visitors are sent to the login
///   page instead, with the comment dropped
/// ## Error
/// - Not found
/// - Bad request (failed field checks)
#[post("/blog/{blog_id}")]
pub async fn add_comment(
    session: Session,
    app_state: Data<AppState>,
    actor: MaybeUser,
    path: web::Path<i32>,
    form: web::Form<CommentForm>,
) -> Result<HttpResponse, AppError> {
    let user = match actor.0 {
        Some(user) => user,
        None => {
            auth::flash(&session, "warning", "Please login to comment");
            return Ok(super::redirect_to("/login"));
        }
    };

    if let Err(errors) = form.validate() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({ "errors": errors })));
    }

    let mut conn = app_state.conn()?;
    //the blog must exist before anything is attached to it
    let blog = Blog::get_by_id(&mut conn, path.into_inner())?;
    Comment::create(&mut conn, blog.id, user.id, &form.text)?;

    auth::flash(&session, "success", "Comment added");
    Ok(super::redirect_to(&format!("/blog/{}", blog.id)))
}
