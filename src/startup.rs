use actix_files as fs;
use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{PasswordHasher, PasswordResetService, TokenCodec};
use crate::configuration::Settings;
use crate::email_client::Mailer;
use crate::logger::LoggerMiddleware;
use crate::middleware::SessionAuth;
use crate::routes::{
    change_password, current_session, forgot_password, get_current_user, health_check, login,
    logout, register, update_current_user, verify_reset_token,
};
use crate::users::UserRepository;

pub fn run(
    listener: TcpListener,
    settings: &Settings,
    users: Arc<dyn UserRepository>,
    mailer: Arc<dyn Mailer>,
) -> Result<Server, std::io::Error> {
    let session_codec = TokenCodec::session(&settings.auth);
    let reset_service = PasswordResetService::from_settings(users.clone(), mailer, settings);

    let users_data: web::Data<dyn UserRepository> = web::Data::from(users);
    let reset_data = web::Data::new(reset_service);
    let hasher_data = web::Data::new(PasswordHasher::new(settings.auth.password_hash_cost));
    let codec_data = web::Data::new(session_codec.clone());
    let auth_data = web::Data::new(settings.auth.clone());
    let application_data = web::Data::new(settings.application.clone());
    let static_dir = settings.application.static_dir.clone();

    let server = HttpServer::new(move || {
        let app = App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)
            // Shared state
            .app_data(users_data.clone())
            .app_data(reset_data.clone())
            .app_data(hasher_data.clone())
            .app_data(codec_data.clone())
            .app_data(auth_data.clone())
            .app_data(application_data.clone())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/auth")
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/logout", web::post().to(logout))
                    .route("/forgot-password", web::post().to(forgot_password))
                    .route("/verify-reset-token", web::post().to(verify_reset_token))
                    .route("/change-password", web::post().to(change_password))
                    .service(
                        web::resource("/me")
                            .wrap(SessionAuth::required(session_codec.clone()))
                            .route(web::get().to(get_current_user)),
                    )
                    .service(
                        web::resource("/session")
                            .wrap(SessionAuth::optional(session_codec.clone()))
                            .route(web::get().to(current_session)),
                    ),
            )
            .service(
                web::resource("/api/users/me")
                    .wrap(SessionAuth::required(session_codec.clone()))
                    .route(web::patch().to(update_current_user)),
            );

        // Static files last so they never shadow API routes
        match &static_dir {
            Some(dir) => app.service(fs::Files::new("/", dir).index_file("index.html")),
            None => app,
        }
    })
    .listen(listener)?
    .run();

    Ok(server)
}
