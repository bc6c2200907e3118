use actix_multipart::Multipart;
use actix_session::Session;
use actix_web::{
    get, post,
    web::{self, Data},
    HttpResponse,
};

use crate::{
    app::{AppError, AppState},
    auth::{self, AuthedUser},
    database::models::user::User,
    forms::{LoginForm, RegisterForm},
    media,
};

/// Pipe for the registration page
/// - url: `{domain}/register`
///
/// # Response
/// ## Ok
/// - pending flash messages for the form to show
#[get("/register")]
pub async fn register_page(session: Session) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "flashes": auth::take_flashes(&session),
    })))
}

/// Pipe for creating an account, it is of type multipart
/// - url: `{domain}/register`
///
/// # HTTP request requirements
/// ## body
/// - username, email, password, confirm: [String]
/// - profile_image: file (optional) - avatar to store with the account
///
/// # Response
/// ## Ok
/// - redirect to the login page, with a flash
/// - redirect back to the registration page when the identity is taken
/// ## Error
/// - Bad request (malformed multipart or failed field checks)
/// - Internal server error
#[post("/register")]
pub async fn register(
    session: Session,
    app_state: Data<AppState>,
    mut mp: Multipart,
) -> Result<HttpResponse, AppError> {
    let form_data = media::read_form(&mut mp).await?;
    let form = RegisterForm::from_fields(&form_data.fields);
    if let Err(errors) = form.validate() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({ "errors": errors })));
    }

    //a file that fails the allow-list is treated as no avatar at all
    let profile_image = match form_data.file {
        Some(upload) => {
            app_state
                .media
                .store(app_state.media.profiles_dir(), upload)
                .await?
        }
        None => None,
    };

    let mut conn = app_state.conn()?;
    match User::create(
        &mut conn,
        &form.username,
        &form.email,
        &form.password,
        profile_image.as_deref(),
    ) {
        Ok(user) => {
            log::info!("registered user {}", user.username);
            auth::flash(&session, "success", "Registered! Please log in.");
            Ok(super::redirect_to("/login"))
        }
        Err(AppError::DuplicateIdentity) => {
            auth::flash(
                &session,
                "danger",
                "User with that email or username already exists",
            );
            Ok(super::redirect_to("/register"))
        }
        Err(err) => Err(err),
    }
}

/// Pipe for the login page
/// - url: `{domain}/login`
#[get("/login")]
pub async fn login_page(session: Session) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "flashes": auth::take_flashes(&session),
    })))
}

/// Pipe for logging in
/// - url: `{domain}/login`
///
/// # HTTP request requirements
/// ## body
/// - form fields `email` and `password`
///
/// # Response
/// ## Ok
/// - redirect home with the session cookie established
/// - redirect back to the login page on bad credentials; the message never
///   says whether the email exists
#[post("/login")]
pub async fn login(
    session: Session,
    app_state: Data<AppState>,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, AppError> {
    if form.validate().is_err() {
        auth::flash(&session, "danger", "Invalid credentials");
        return Ok(super::redirect_to("/login"));
    }

    let mut conn = app_state.conn()?;
    match User::authenticate(&mut conn, form.email.trim(), &form.password) {
        Ok(user) => {
            auth::log_in(&session, &user)?;
            auth::flash(&session, "success", "Logged in successfully");
            Ok(super::redirect_to("/"))
        }
        Err(AppError::InvalidCredentials) => {
            auth::flash(&session, "danger", "Invalid credentials");
            Ok(super::redirect_to("/login"))
        }
        Err(err) => Err(err),
    }
}

/// Pipe for logging out
/// - url: `{domain}/logout`
///
/// # Response
/// ## Ok
/// - session cleared, redirect home
/// ## Error
/// - redirect to login when nobody is signed in
#[get("/logout")]
pub async fn logout(session: Session, _user: AuthedUser) -> Result<HttpResponse, AppError> {
    auth::log_out(&session);
    auth::flash(&session, "info", "Logged out");
    Ok(super::redirect_to("/"))
}

/// Pipe for the signed-in user's profile
/// - url: `{domain}/profile`
///
/// # Response
/// ## Ok
/// - the account data (the password hash is never serialized)
/// ## Error
/// - redirect to login when nobody is signed in
#[get("/profile")]
pub async fn profile(session: Session, user: AuthedUser) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "user": user.0,
        "flashes": auth::take_flashes(&session),
    })))
}
