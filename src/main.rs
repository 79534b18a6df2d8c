use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use chrono::Duration;
use std::sync::Arc;

use taskwarden::auth::{spawn_sweeper, RegistrationService, RegistrationSettings, TokenCodec};
use taskwarden::clock::{Clock, SystemClock};
use taskwarden::config::Config;
use taskwarden::mailer::{HttpMailer, LogNotifier, Notifier};
use taskwarden::routes;
use taskwarden::state::AppState;
use taskwarden::store::{PgStore, Store};

const MAX_DB_CONNECTIONS: u32 = 10;

fn fatal(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    log::error!("{}: {}", context, err);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

fn build_notifier(config: &Config) -> std::io::Result<Arc<dyn Notifier>> {
    match &config.mail {
        Some(mail) => {
            let mailer = HttpMailer::new(
                mail.api_url.clone(),
                mail.api_key.clone(),
                mail.from.clone(),
            )
            .map_err(|e| fatal("Failed to build mail client", e))?;
            Ok(Arc::new(mailer))
        }
        None => {
            log::warn!("MAIL_API_KEY or MAIL_FROM not set; verification links will only be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| fatal("Invalid configuration", e))?;

    let store: Arc<dyn Store> = Arc::new(
        PgStore::connect(&config.database_url, MAX_DB_CONNECTIONS)
            .await
            .map_err(|e| fatal("Failed to initialise database", e))?,
    );
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let codec = TokenCodec::new(
        &config.jwt_secret,
        Duration::seconds(config.jwt_ttl_secs),
        clock.clone(),
    )
    .map_err(|e| fatal("Failed to initialise token codec", e))?;

    let registration = Arc::new(RegistrationService::new(
        store.clone(),
        build_notifier(&config)?,
        clock.clone(),
        RegistrationSettings {
            base_url: config.app_base_url.clone(),
            verification_ttl: Duration::seconds(config.verification_ttl_secs),
            bcrypt_cost: config.bcrypt_cost,
        },
    ));
    let _sweeper = spawn_sweeper(
        registration.clone(),
        std::time::Duration::from_secs(config.sweep_interval_secs.max(1)),
    );

    let state = web::Data::new(AppState {
        store,
        codec: Arc::new(codec),
        registration,
        clock,
        bcrypt_cost: config.bcrypt_cost,
    });

    log::info!("Starting taskwarden server at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .configure(routes::config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
