pub mod app;
pub mod database;
pub mod media;
pub mod schema;

mod auth;
mod forms;
mod routes;

#[cfg(test)]
mod test_utils;

use actix_web::{App, HttpServer};

use app::AppState;
use routes::{blog::*, comment::*, user::*};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let app_state = AppState::new(None);
    app_state.media.ensure_dirs()?;

    let key = auth::session_key();
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| String::from("127.0.0.1:5000"));

    log::info!("Server running on {}", bind_addr);
    HttpServer::new(move || {
        App::new()
            .app_data(actix_web::web::Data::new(app_state.clone()))
            .wrap(auth::session_middleware(key.clone()))
            //User routes
            .service(register_page)
            .service(register)
            .service(login_page)
            .service(login)
            .service(logout)
            .service(profile)
            //Blog routes
            .service(index)
            .service(all_blogs)
            .service(my_blogs)
            .service(create_blog_page)
            .service(create_blog)
            .service(blog_detail)
            .service(like_blog)
            .service(update_blog_page)
            .service(update_blog)
            .service(delete_blog)
            .service(search)
            .service(get_image)
            //Comment routes
            .service(add_comment)
    })
    .bind(bind_addr)?
    .run()
    .await
}
