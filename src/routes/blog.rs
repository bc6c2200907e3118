use actix_multipart::Multipart;
use actix_session::Session;
use actix_web::{
    get, post,
    web::{self, Data},
    HttpResponse,
};
use serde::Deserialize;

use crate::{
    app::{AppError, AppState},
    auth::{self, AuthedUser},
    database::models::{blog::Blog, comment::Comment},
    forms::BlogForm,
    media,
};

/// Pipe for the home page
/// - url: `{domain}/`
///
/// # Response
/// ## Ok
/// - every blog, newest first, plus pending flash messages
#[get("/")]
pub async fn index(session: Session, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let mut conn = app_state.conn()?;
    let blogs = Blog::list_all(&mut conn)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "blogs": blogs,
        "flashes": auth::take_flashes(&session),
    })))
}

/// Pipe for the full blog listing; same data as the home page, kept as its
/// own url because the site links the two separately
/// - url: `{domain}/allblogs`
#[get("/allblogs")]
pub async fn all_blogs(
    session: Session,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let mut conn = app_state.conn()?;
    let blogs = Blog::list_all(&mut conn)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "blogs": blogs,
        "flashes": auth::take_flashes(&session),
    })))
}

/// Pipe for the signed-in user's own blogs
/// - url: `{domain}/myblogs`
///
/// # Response
/// ## Ok
/// - the actor's blogs, newest first
/// ## Error
/// - redirect to login when nobody is signed in
#[get("/myblogs")]
pub async fn my_blogs(
    session: Session,
    app_state: Data<AppState>,
    user: AuthedUser,
) -> Result<HttpResponse, AppError> {
    let mut conn = app_state.conn()?;
    let blogs = Blog::list_by_creator(&mut conn, user.0.id)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "blogs": blogs,
        "flashes": auth::take_flashes(&session),
    })))
}

/// Pipe for the blog creation page
/// - url: `{domain}/create_blog`
#[get("/create_blog")]
pub async fn create_blog_page(
    session: Session,
    _user: AuthedUser,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "flashes": auth::take_flashes(&session),
    })))
}

/// Pipe for creating a new blog, it is of type multipart
/// - url: `{domain}/create_blog`
///
/// # HTTP request requirements
/// ## header
/// - session cookie of a signed-in user
/// ## body
/// - title: [String] - title we wish to name our blog
/// - content: [String] - body of the blog
/// - image: file (optional) - image stored with the blog
///
/// # Response
/// ## Ok
/// - redirect to the actor's blog list
/// ## Error
/// - Bad request (failed field checks)
/// - redirect to login when nobody is signed in
/// - Internal server error
#[post("/create_blog")]
pub async fn create_blog(
    session: Session,
    app_state: Data<AppState>,
    user: AuthedUser,
    mut mp: Multipart,
) -> Result<HttpResponse, AppError> {
    let form_data = media::read_form(&mut mp).await?;
    let form = BlogForm::from_fields(&form_data.fields);
    if let Err(errors) = form.validate() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({ "errors": errors })));
    }

    let image = match form_data.file {
        Some(upload) => {
            app_state
                .media
                .store(app_state.media.blogs_dir(), upload)
                .await?
        }
        None => None,
    };

    let mut conn = app_state.conn()?;
    Blog::create(
        &mut conn,
        &user.0,
        &form.title,
        &form.content,
        image.as_deref(),
    )?;

    auth::flash(&session, "success", "Blog created successfully!");
    Ok(super::redirect_to("/myblogs"))
}

/// Pipe for a single blog with its comments
/// - url: `{domain}/blog/{blog_id}`
///
/// Every request counts one view, repeat visitors included; there is no
/// per-viewer bookkeeping.
///
/// # Response
/// ## Ok
/// - the blog (views already counted) and its comments, newest first
/// ## Error
/// - Not found
#[get("/blog/{blog_id}")]
pub async fn blog_detail(
    session: Session,
    app_state: Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let mut conn = app_state.conn()?;
    let blog = Blog::record_view(&mut conn, path.into_inner())?;
    let comments = Comment::list_by_blog(&mut conn, blog.id)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "blog": blog,
        "comments": comments,
        "flashes": auth::take_flashes(&session),
    })))
}

/// Pipe for liking a blog
/// - url: `{domain}/like/{blog_id}`
///
/// Any signed-in user may like any blog, as often as they want; each call
/// adds one.
///
/// # Response
/// ## Ok
/// - the new count as `{"likes": n}`
/// ## Error
/// - Not found
/// - redirect to login when nobody is signed in
#[post("/like/{blog_id}")]
pub async fn like_blog(
    app_state: Data<AppState>,
    _user: AuthedUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let mut conn = app_state.conn()?;
    let likes = Blog::add_like(&mut conn, path.into_inner())?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "likes": likes })))
}

/// Pipe for the edit page of one blog
/// - url: `{domain}/update/{blog_id}`
///
/// # Response
/// ## Ok
/// - the blog's current fields for the form to prefill
/// ## Error
/// - Not found
/// - Forbidden when the actor is not the owner
#[get("/update/{blog_id}")]
pub async fn update_blog_page(
    session: Session,
    app_state: Data<AppState>,
    user: AuthedUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let mut conn = app_state.conn()?;
    let blog = Blog::get_by_id(&mut conn, path.into_inner())?;
    blog.ensure_owned_by(&user.0)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "blog": blog,
        "flashes": auth::take_flashes(&session),
    })))
}

/// Pipe for editing a blog, it is of type multipart
/// - url: `{domain}/update/{blog_id}`
///
/// # HTTP request requirements
/// ## header
/// - session cookie of the blog's owner
/// ## body
/// - title, content: [String] - replacement fields
/// - image: file (optional) - replaces the stored image only when present
///   and allowed
///
/// # Response
/// ## Ok
/// - redirect to the actor's blog list
/// ## Error
/// - Not found
/// - Forbidden when the actor is not the owner
/// - Bad request (failed field checks)
#[post("/update/{blog_id}")]
pub async fn update_blog(
    session: Session,
    app_state: Data<AppState>,
    user: AuthedUser,
    path: web::Path<i32>,
    mut mp: Multipart,
) -> Result<HttpResponse, AppError> {
    let mut conn = app_state.conn()?;
    let blog = Blog::get_by_id(&mut conn, path.into_inner())?;
    //ownership is settled before anything is parsed or written
    blog.ensure_owned_by(&user.0)?;

    let form_data = media::read_form(&mut mp).await?;
    let form = BlogForm::from_fields(&form_data.fields);
    if let Err(errors) = form.validate() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({ "errors": errors })));
    }

    let image = match form_data.file {
        Some(upload) => {
            app_state
                .media
                .store(app_state.media.blogs_dir(), upload)
                .await?
        }
        None => None,
    };

    blog.update(&mut conn, &form.title, &form.content, image.as_deref())?;

    auth::flash(&session, "success", "Blog updated");
    Ok(super::redirect_to("/myblogs"))
}

/// Pipe for deleting a blog
/// - url: `{domain}/delete/{blog_id}`
///
/// Deleting the blog also deletes every comment referencing it.
///
/// # Response
/// ## Ok
/// - redirect to the actor's blog list
/// ## Error
/// - Not found
/// - Forbidden when the actor is not the owner
#[post("/delete/{blog_id}")]
pub async fn delete_blog(
    session: Session,
    app_state: Data<AppState>,
    user: AuthedUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let mut conn = app_state.conn()?;
    let blog = Blog::get_by_id(&mut conn, path.into_inner())?;
    blog.ensure_owned_by(&user.0)?;

    blog.delete(&mut conn)?;

    auth::flash(&session, "info", "Blog deleted");
    Ok(super::redirect_to("/myblogs"))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// Pipe for substring search over titles and bodies
/// - url: `{domain}/search?q=`
///
/// # Response
/// ## Ok
/// - matching blogs, newest first; an empty query returns everything
#[get("/search")]
pub async fn search(
    session: Session,
    app_state: Data<AppState>,
    params: web::Query<SearchParams>,
) -> Result<HttpResponse, AppError> {
    let query = params.q.as_deref().unwrap_or("");

    let mut conn = app_state.conn()?;
    let blogs = Blog::search(&mut conn, query)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "query": query.trim(),
        "blogs": blogs,
        "flashes": auth::take_flashes(&session),
    })))
}

/// Pipe for serving a stored upload back
/// - url: `{domain}/uploads/{kind}/{image_name}`
///
/// # Response
/// ## Ok
/// - image file in the body
/// ## Error
/// - Not found (unknown kind or no such file)
#[get("/uploads/{kind}/{image_name}")]
pub async fn get_image(
    app_state: Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (kind, image_name) = path.into_inner();

    let dir = app_state.media.resolve_dir(&kind).ok_or(AppError::NotFound)?;
    let file_path = dir.join(media::sanitize_filename(&image_name));

    let file = web::block(move || std::fs::read(file_path)).await??;

    Ok(HttpResponse::Ok().body(file))
}

#[cfg(test)]
mod tests {
    use actix_web::http::header;
    use actix_web::test::{self, call_service};
    use actix_web::App;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::database::models::user::User;
    use crate::routes::user::login;
    use crate::test_utils::{multipart_body, test_key, test_state};

    fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
        resp.headers()
            .get(header::LOCATION)
            .expect("expected a redirect")
            .to_str()
            .unwrap()
            .to_string()
    }

    /// Registers the account at the store level and logs it in through the
    /// real login route, returning the session cookie.
    async fn login_as<S, B>(
        app: &S,
        app_state: &AppState,
        name: &str,
    ) -> actix_web::cookie::Cookie<'static>
    where
        S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse<B>,
            Error = actix_web::Error,
        >,
        B: actix_web::body::MessageBody,
    {
        let email = format!("{}@x.com", name);
        let mut conn = app_state.conn().unwrap();
        User::create(&mut conn, name, &email, "secret1", None).unwrap();

        let resp = call_service(
            app,
            test::TestRequest::post()
                .uri("/login")
                .set_form(&[("email", email.as_str()), ("password", "secret1")])
                .to_request(),
        )
        .await;

        resp.response()
            .cookies()
            .next()
            .expect("login sets the session cookie")
            .into_owned()
    }

    #[actix_rt::test]
    async fn test_create_blog_and_listings() {
        let app_state = test_state();

        let app = test::init_service(
            App::new()
                .app_data(actix_web::web::Data::new(app_state.clone()))
                .wrap(auth::session_middleware(test_key()))
                .service(login)
                .service(super::create_blog)
                .service(super::my_blogs)
                .service(super::all_blogs)
                .service(super::index),
        )
        .await;

        let cookie = login_as(&app, &app_state, "alice").await;

        //anonymous creation is turned away at the door
        let (content_type, body) = multipart_body(&[("title", "Hello"), ("content", "World")]);
        let resp = call_service(
            &app,
            test::TestRequest::post()
                .uri("/create_blog")
                .insert_header((header::CONTENT_TYPE, content_type.clone()))
                .set_payload(body.clone())
                .to_request(),
        )
        .await;
        assert_eq!(resp.status().as_u16(), 302);
        assert_eq!(location(&resp), "/login");

        let resp = call_service(
            &app,
            test::TestRequest::post()
                .uri("/create_blog")
                .insert_header((header::CONTENT_TYPE, content_type))
                .set_payload(body)
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(location(&resp), "/myblogs");

        //the post shows up for its owner with zeroed counters
        let resp = call_service(
            &app,
            test::TestRequest::get()
                .uri("/myblogs")
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["blogs"].as_array().unwrap().len(), 1);
        assert_eq!(body["blogs"][0]["title"], "Hello");
        assert_eq!(body["blogs"][0]["views"], 0);
        assert_eq!(body["blogs"][0]["likes"], 0);

        //and for everyone else on the public listings
        for uri in ["/allblogs", "/"] {
            let resp =
                call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            let body: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(body["blogs"].as_array().unwrap().len(), 1, "listing {}", uri);
        }
    }

    #[actix_rt::test]
    async fn test_blog_detail_counts_every_view() {
        let app_state = test_state();

        let app = test::init_service(
            App::new()
                .app_data(actix_web::web::Data::new(app_state.clone()))
                .wrap(auth::session_middleware(test_key()))
                .service(super::blog_detail),
        )
        .await;

        let mut conn = app_state.conn().unwrap();
        let user = User::create(&mut conn, "viewer", "viewer@x.com", "secret1", None).unwrap();
        let blog = Blog::create(&mut conn, &user, "Watched", "body", None).unwrap();

        for expected in 1..=3 {
            let resp = call_service(
                &app,
                test::TestRequest::get()
                    .uri(&format!("/blog/{}", blog.id))
                    .to_request(),
            )
            .await;
            assert_eq!(resp.status().as_u16(), 200);
            let body: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(body["blog"]["views"], expected);
        }

        let found = Blog::get_by_id(&mut conn, blog.id).unwrap();
        assert_eq!(found.views, 3);

        //a missing id is a plain 404
        let resp = call_service(
            &app,
            test::TestRequest::get().uri("/blog/424242").to_request(),
        )
        .await;
        assert_eq!(resp.status().as_u16(), 404);
    }

    #[actix_rt::test]
    async fn test_like_increments_without_dedup() {
        let app_state = test_state();

        let app = test::init_service(
            App::new()
                .app_data(actix_web::web::Data::new(app_state.clone()))
                .wrap(auth::session_middleware(test_key()))
                .service(login)
                .service(super::like_blog),
        )
        .await;

        let mut conn = app_state.conn().unwrap();
        let user = User::create(&mut conn, "owner", "owner@x.com", "secret1", None).unwrap();
        let blog = Blog::create(&mut conn, &user, "Likable", "body", None).unwrap();

        //likes are a signed-in action
        let resp = call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/like/{}", blog.id))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status().as_u16(), 302);

        let cookie = login_as(&app, &app_state, "fan").await;

        //the same account liking over and over keeps counting
        for expected in 1..=3 {
            let resp = call_service(
                &app,
                test::TestRequest::post()
                    .uri(&format!("/like/{}", blog.id))
                    .cookie(cookie.clone())
                    .to_request(),
            )
            .await;
            assert_eq!(resp.status().as_u16(), 200);
            let body: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(body["likes"], expected);
        }
    }

    #[actix_rt::test]
    async fn test_update_is_owner_only() {
        let app_state = test_state();

        let app = test::init_service(
            App::new()
                .app_data(actix_web::web::Data::new(app_state.clone()))
                .wrap(auth::session_middleware(test_key()))
                .service(login)
                .service(super::update_blog_page)
                .service(super::update_blog),
        )
        .await;

        let mut conn = app_state.conn().unwrap();
        let alice = User::create(&mut conn, "alice", "alice@x.com", "secret1", None).unwrap();
        let blog = Blog::create(&mut conn, &alice, "Original", "body", None).unwrap();
        drop(conn);

        let bob_cookie = login_as(&app, &app_state, "bob").await;

        let resp = call_service(
            &app,
            test::TestRequest::get()
                .uri(&format!("/update/{}", blog.id))
                .cookie(bob_cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(resp.status().as_u16(), 403);

        let (content_type, body) = multipart_body(&[("title", "Taken"), ("content", "over")]);
        let resp = call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/update/{}", blog.id))
                .insert_header((header::CONTENT_TYPE, content_type))
                .set_payload(body)
                .cookie(bob_cookie)
                .to_request(),
        )
        .await;
        assert_eq!(resp.status().as_u16(), 403);

        //nothing moved
        let mut conn = app_state.conn().unwrap();
        let found = Blog::get_by_id(&mut conn, blog.id).unwrap();
        assert_eq!(found.title, "Original");
        drop(conn);

        //the owner edits fine; a login through the route proves the session
        let resp = call_service(
            &app,
            test::TestRequest::post()
                .uri("/login")
                .set_form(&[("email", "alice@x.com"), ("password", "secret1")])
                .to_request(),
        )
        .await;
        let alice_cookie = resp.response().cookies().next().unwrap().into_owned();

        let (content_type, body) = multipart_body(&[("title", "Edited"), ("content", "new body")]);
        let resp = call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/update/{}", blog.id))
                .insert_header((header::CONTENT_TYPE, content_type))
                .set_payload(body)
                .cookie(alice_cookie)
                .to_request(),
        )
        .await;
        assert_eq!(location(&resp), "/myblogs");

        let mut conn = app_state.conn().unwrap();
        let found = Blog::get_by_id(&mut conn, blog.id).unwrap();
        assert_eq!(found.title, "Edited");
        assert_eq!(found.body, "new body");
    }

    #[actix_rt::test]
    async fn test_delete_is_owner_only_and_cascades() {
        let app_state = test_state();

        let app = test::init_service(
            App::new()
                .app_data(actix_web::web::Data::new(app_state.clone()))
                .wrap(auth::session_middleware(test_key()))
                .service(login)
                .service(super::delete_blog),
        )
        .await;

        let mut conn = app_state.conn().unwrap();
        let alice = User::create(&mut conn, "alice", "alice@x.com", "secret1", None).unwrap();
        let blog = Blog::create(&mut conn, &alice, "Keep me", "body", None).unwrap();
        Comment::create(&mut conn, blog.id, alice.id, "first").unwrap();
        Comment::create(&mut conn, blog.id, alice.id, "second").unwrap();
        drop(conn);

        let bob_cookie = login_as(&app, &app_state, "bob").await;

        //forbidden, and forbidden again on repeat, with nothing deleted
        for _ in 0..2 {
            let resp = call_service(
                &app,
                test::TestRequest::post()
                    .uri(&format!("/delete/{}", blog.id))
                    .cookie(bob_cookie.clone())
                    .to_request(),
            )
            .await;
            assert_eq!(resp.status().as_u16(), 403);
        }
        let mut conn = app_state.conn().unwrap();
        assert!(Blog::get_by_id(&mut conn, blog.id).is_ok());
        assert_eq!(Comment::list_by_blog(&mut conn, blog.id).unwrap().len(), 2);
        drop(conn);

        let resp = call_service(
            &app,
            test::TestRequest::post()
                .uri("/login")
                .set_form(&[("email", "alice@x.com"), ("password", "secret1")])
                .to_request(),
        )
        .await;
        let alice_cookie = resp.response().cookies().next().unwrap().into_owned();

        let resp = call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/delete/{}", blog.id))
                .cookie(alice_cookie)
                .to_request(),
        )
        .await;
        assert_eq!(location(&resp), "/myblogs");

        //the post and every comment on it are gone
        let mut conn = app_state.conn().unwrap();
        assert_eq!(
            Blog::get_by_id(&mut conn, blog.id),
            Err(crate::app::AppError::NotFound)
        );
        assert_eq!(Comment::list_by_blog(&mut conn, blog.id).unwrap().len(), 0);
    }

    #[actix_rt::test]
    async fn test_search_route_filters_or_lists_everything() {
        let app_state = test_state();

        let app = test::init_service(
            App::new()
                .app_data(actix_web::web::Data::new(app_state.clone()))
                .wrap(auth::session_middleware(test_key()))
                .service(super::search),
        )
        .await;

        let mut conn = app_state.conn().unwrap();
        let user = User::create(&mut conn, "poet", "poet@x.com", "secret1", None).unwrap();
        Blog::create(&mut conn, &user, "Hello World", "body one", None).unwrap();
        Blog::create(&mut conn, &user, "Second", "body two", None).unwrap();
        drop(conn);

        let resp = call_service(
            &app,
            test::TestRequest::get().uri("/search?q=Hello").to_request(),
        )
        .await;
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["blogs"].as_array().unwrap().len(), 1);
        assert_eq!(body["blogs"][0]["title"], "Hello World");

        //no query parameter at all falls back to the full list
        let resp = call_service(&app, test::TestRequest::get().uri("/search").to_request()).await;
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["blogs"].as_array().unwrap().len(), 2);

        //as does an explicitly empty one
        let resp = call_service(
            &app,
            test::TestRequest::get().uri("/search?q=").to_request(),
        )
        .await;
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["blogs"].as_array().unwrap().len(), 2);
    }

    #[actix_rt::test]
    async fn test_get_image_serves_known_kinds_only() {
        let app_state = test_state();

        let app = test::init_service(
            App::new()
                .app_data(actix_web::web::Data::new(app_state.clone()))
                .wrap(auth::session_middleware(test_key()))
                .service(super::get_image),
        )
        .await;

        app_state.media.ensure_dirs().unwrap();
        std::fs::write(app_state.media.blogs_dir().join("shot.png"), b"bytes").unwrap();

        let resp = call_service(
            &app,
            test::TestRequest::get()
                .uri("/uploads/blogs/shot.png")
                .to_request(),
        )
        .await;
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(test::read_body(resp).await.as_ref(), b"bytes");

        let resp = call_service(
            &app,
            test::TestRequest::get()
                .uri("/uploads/blogs/missing.png")
                .to_request(),
        )
        .await;
        assert_eq!(resp.status().as_u16(), 404);

        let resp = call_service(
            &app,
            test::TestRequest::get()
                .uri("/uploads/secrets/shot.png")
                .to_request(),
        )
        .await;
        assert_eq!(resp.status().as_u16(), 404);
    }
}
