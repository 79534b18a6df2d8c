pub mod auth;
pub mod health;
pub mod tasks;
pub mod users;

use actix_web::web;

use crate::auth::AuthMiddleware;

/// Registers every route. Expects `web::Data<AppState>` on the app.
///
/// `/api/auth` and `/verify` are public; `/api/tasks` and `/api/users` sit
/// behind [`AuthMiddleware`].
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health)
        .service(auth::verify)
        .service(
            web::scope("/api")
                .service(
                    web::scope("/auth")
                        .service(auth::login)
                        .service(auth::register)
                        .service(auth::logout),
                )
                .service(
                    web::scope("/tasks")
                        .wrap(AuthMiddleware)
                        .service(tasks::get_tasks)
                        .service(tasks::create_task)
                        .service(tasks::get_task)
                        .service(tasks::update_task)
                        .service(tasks::delete_task),
                )
                .service(
                    web::scope("/users")
                        .wrap(AuthMiddleware)
                        .service(users::get_profile)
                        .service(users::update_profile),
                ),
        );
}
