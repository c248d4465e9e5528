use std::net::TcpListener;

use actix_web::dev::Server;
use actix_web::{guard, web, App, HttpServer};
use actix_web_lab::middleware::from_fn;
use anyhow::Context;
use sqlx::migrate::MigrateError;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing_actix_web::TracingLogger;

use crate::authentication::{reject_anonymous_users, reject_non_admins, SessionKeys};
use crate::configuration::{DatabaseSettings, Settings, VerificationSettings};
use crate::email_client::EmailClient;
use crate::media_client::MediaClient;
use crate::routes::auth::{
    change_password, delete_account, forgot_password, get_me, log_out, login,
    register, resend_verification, reset_password, update_profile,
    verify_email,
};
use crate::routes::books::{
    create_book, delete_book, get_book, list_books, list_categories,
    update_book, update_category_image, update_page_content,
};
use crate::routes::documents::{
    delete_document, get_document, list_documents, update_document,
    upload_document,
};
use crate::routes::health_check;
use crate::routes::news::{
    create_news, delete_news, get_news, list_news, update_news,
};
use crate::routes::users::{get_user, list_admins, list_users};
use crate::utils::{route_not_found, ApiError};

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(configuration: Settings) -> Result<Self, anyhow::Error> {
        let connection_pool = get_connection_pool(&configuration.database);
        migrate(&configuration.database, &connection_pool)
            .await
            .context("Failed to migrate the database")?;

        let sender_email = configuration
            .email_client
            .sender()
            .map_err(|e| anyhow::anyhow!(e))
            .context("Invalid sender email address")?;
        let email_client = EmailClient::new(
            configuration.email_client.base_url.clone(),
            sender_email,
            configuration.email_client.authorization_token.clone(),
            configuration.email_client.timeout(),
        );
        let media_client = MediaClient::new(
            configuration.media_client.base_url.clone(),
            configuration.media_client.authorization_token.clone(),
            configuration.media_client.timeout(),
            configuration.media_client.max_upload_bytes,
        );
        let session_keys = SessionKeys::new(&configuration.session);

        let address = format!(
            "{}:{}",
            configuration.application.host, configuration.application.port
        );
        let listener = TcpListener::bind(&address)?;
        let port = listener.local_addr()?.port();
        tracing::info!(
            %address,
            base_url = %configuration.application.base_url,
            "Application listening"
        );
        let server = run(
            listener,
            connection_pool,
            email_client,
            media_client,
            session_keys,
            configuration.verification,
            configuration.application.client_url,
        )?;
        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Only returns once the server has stopped.
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn get_connection_pool(configuration: &DatabaseSettings) -> SqlitePool {
    SqlitePoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(configuration.with_db())
}

async fn migrate(
    configuration: &DatabaseSettings,
    connection_pool: &SqlitePool,
) -> Result<(), MigrateError> {
    if configuration.migrate {
        tracing::info!("Running database migrations");
        sqlx::migrate!("./migrations").run(connection_pool).await
    } else {
        Ok(())
    }
}

// Application data is looked up by type, so the front-end url gets its own
// wrapper instead of being a bare `String`.
pub struct ClientBaseUrl(pub String);

fn write_methods() -> impl guard::Guard {
    guard::Any(guard::Post())
        .or(guard::Put())
        .or(guard::Patch())
        .or(guard::Delete())
}

pub fn run(
    listener: TcpListener,
    connection_pool: SqlitePool,
    email_client: EmailClient,
    media_client: MediaClient,
    session_keys: SessionKeys,
    verification: VerificationSettings,
    client_url: String,
) -> Result<Server, std::io::Error> {
    // Uploads travel base64-encoded inside JSON bodies.
    let json_limit = media_client.max_upload_bytes() / 3 * 4 + 64 * 1024;
    let connection_pool = web::Data::new(connection_pool);
    let email_client = web::Data::new(email_client);
    let media_client = web::Data::new(media_client);
    let session_keys = web::Data::new(session_keys);
    let verification = web::Data::new(verification);
    let client_url = web::Data::new(ClientBaseUrl(client_url));

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::JsonConfig::default().limit(json_limit).error_handler(
                |err, _| ApiError::Validation(err.to_string()).into(),
            ))
            .app_data(web::QueryConfig::default().error_handler(|err, _| {
                ApiError::Validation(err.to_string()).into()
            }))
            // Ids that cannot exist are reported like ids that do not.
            .app_data(web::PathConfig::default().error_handler(|_, _| {
                ApiError::NotFound("Resource not found".into()).into()
            }))
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(register))
                    .route("/verify-email", web::post().to(verify_email))
                    .route(
                        "/resend-verification",
                        web::post().to(resend_verification),
                    )
                    .route("/login", web::post().to(login))
                    .route("/forgot-password", web::post().to(forgot_password))
                    .route(
                        "/reset-password/{token}",
                        web::post().to(reset_password),
                    )
                    // Guarded per resource so unknown `/auth/*` paths still 404.
                    .service(
                        web::resource("/logout")
                            .wrap(from_fn(reject_anonymous_users))
                            .route(web::post().to(log_out)),
                    )
                    .service(
                        web::resource("/me")
                            .wrap(from_fn(reject_anonymous_users))
                            .route(web::get().to(get_me))
                            .route(web::patch().to(update_profile))
                            .route(web::delete().to(delete_account)),
                    )
                    .service(
                        web::resource("/change-password")
                            .wrap(from_fn(reject_anonymous_users))
                            .route(web::post().to(change_password)),
                    ),
            )
            // Writes are admin only, reads stay public.
            .service(
                web::scope("/books")
                    .guard(write_methods())
                    .wrap(from_fn(reject_non_admins))
                    .wrap(from_fn(reject_anonymous_users))
                    .route("", web::post().to(create_book))
                    .route(
                        "/categories/image",
                        web::put().to(update_category_image),
                    )
                    .route("/{id}", web::patch().to(update_book))
                    .route("/{id}", web::delete().to(delete_book))
                    .route("/{id}/page", web::put().to(update_page_content)),
            )
            .service(
                web::scope("/books")
                    .route("", web::get().to(list_books))
                    .route("/categories", web::get().to(list_categories))
                    .route("/{id}", web::get().to(get_book)),
            )
            .service(
                web::scope("/news")
                    .guard(write_methods())
                    .wrap(from_fn(reject_non_admins))
                    .wrap(from_fn(reject_anonymous_users))
                    .route("", web::post().to(create_news))
                    .route("/{id}", web::patch().to(update_news))
                    .route("/{id}", web::delete().to(delete_news)),
            )
            .service(
                web::scope("/news")
                    .route("", web::get().to(list_news))
                    .route("/{id}", web::get().to(get_news)),
            )
            .service(
                web::scope("/documents")
                    .guard(write_methods())
                    .wrap(from_fn(reject_non_admins))
                    .wrap(from_fn(reject_anonymous_users))
                    .route("/upload", web::post().to(upload_document))
                    .route("/{id}", web::patch().to(update_document))
                    .route("/{id}", web::delete().to(delete_document)),
            )
            .service(
                web::scope("/documents")
                    .route("", web::get().to(list_documents))
                    .route("/{id}", web::get().to(get_document)),
            )
            .service(
                web::scope("/users")
                    .wrap(from_fn(reject_non_admins))
                    .wrap(from_fn(reject_anonymous_users))
                    .route("", web::get().to(list_users))
                    .route("/admins", web::get().to(list_admins))
                    .route("/{id}", web::get().to(get_user)),
            )
            .default_service(web::to(route_not_found))
            .app_data(connection_pool.clone())
            .app_data(email_client.clone())
            .app_data(media_client.clone())
            .app_data(session_keys.clone())
            .app_data(verification.clone())
            .app_data(client_url.clone())
    })
    .listen(listener)?
    .run();
    Ok(server)
}
