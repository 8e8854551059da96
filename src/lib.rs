pub mod channel;
pub mod config;
pub mod connection;
pub mod envelope;
pub mod fanout;
pub mod gc;
pub mod models;
pub mod ops;
pub mod registry;
pub mod routes;
pub mod user;

use config::ServerConfig;
use registry::Registry;
use rocket_cors::CorsOptions;

pub fn rocket() -> rocket::Rocket<rocket::Build> {
    rocket_with_config(ServerConfig::from_env())
}

/// Build the server around an explicit config (tests pass short poll waits
/// and drive GC sweeps themselves).
pub fn rocket_with_config(config: ServerConfig) -> rocket::Rocket<rocket::Build> {
    let registry = Registry::new();

    let cors = CorsOptions::default()
        .to_cors()
        .expect("Failed to create CORS");

    let gc_registry = registry.clone();
    let gc_interval = config.gc_interval_secs;
    let gc_idle = config.gc_conns_after_secs;

    rocket::build()
        .manage(registry)
        .manage(config)
        .attach(cors)
        .register(
            "/",
            rocket::catchers![
                routes::unauthorized,
                routes::forbidden,
                routes::not_found,
                routes::unprocessable,
            ],
        )
        .mount(
            "/",
            rocket::routes![
                routes::connect,
                routes::subscribe,
                routes::unsubscribe,
                routes::message_post,
                routes::message_patch,
                routes::message_delete,
                routes::user_state,
                routes::channel_config,
                routes::info,
                routes::listen,
                routes::disconnect_get,
                routes::disconnect_post,
                routes::health,
                routes::admin_json,
            ],
        )
        .attach(rocket::fairing::AdHoc::on_liftoff(
            "Connection GC",
            move |_rocket| {
                Box::pin(async move {
                    gc::spawn_gc_task(gc_registry, gc_interval, gc_idle);
                    println!("🧹 Connection GC started (every {gc_interval}s, idle cutoff {gc_idle}s)");
                })
            },
        ))
}
