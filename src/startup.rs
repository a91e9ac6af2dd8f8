use actix_files as fs;
use actix_web::dev::Server;
use actix_web::{guard, middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::SessionService;
use crate::configuration::Settings;
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    create_chirp, create_user, delete_chirp, get_chirp, handle_webhook, health_check, list_chirps,
    login, refresh, reset, revoke, update_user,
};
use crate::store::Store;

pub fn run(
    listener: TcpListener,
    store: Arc<dyn Store>,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let session = SessionService::new(store, settings.jwt, settings.webhook.api_key);
    let session_data = web::Data::new(session.clone());
    let platform = web::Data::new(settings.platform);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)
            .app_data(session_data.clone())
            .app_data(platform.clone())
            .route("/api/healthz", web::get().to(health_check))
            .route("/api/login", web::post().to(login))
            .route("/api/refresh", web::post().to(refresh))
            .route("/api/revoke", web::post().to(revoke))
            .route("/api/polka/webhooks", web::post().to(handle_webhook))
            // PUT needs a logged-in user; the guard lets POST fall through to registration
            .service(
                web::scope("/api/users")
                    .guard(guard::Put())
                    .wrap(JwtMiddleware::new(session.clone()))
                    .route("", web::put().to(update_user)),
            )
            .route("/api/users", web::post().to(create_user))
            // Writing and deleting chirps needs a logged-in user; reads stay public
            .service(
                web::scope("/api/chirps")
                    .guard(guard::Any(guard::Post()).or(guard::Delete()))
                    .wrap(JwtMiddleware::new(session.clone()))
                    .route("", web::post().to(create_chirp))
                    .route("/{chirp_id}", web::delete().to(delete_chirp)),
            )
            .route("/api/chirps", web::get().to(list_chirps))
            .route("/api/chirps/{chirp_id}", web::get().to(get_chirp))
            .route("/admin/reset", web::post().to(reset))
            .service(fs::Files::new("/app", "./public").index_file("index.html"))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
