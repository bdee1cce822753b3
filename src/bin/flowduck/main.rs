use actix_session::{config::PersistentSession, storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::{Key, SameSite};
use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use env_logger::Env;
use flowduck::app_config::{self, Mode};
use flowduck::db::init_db;
use flowduck::middleware::ClientCtx;
use flowduck::storage::{local::LocalStorage, StorageBackend};
use flowduck::{sse, web};
use rand::{distributions::Alphanumeric, Rng};
use std::path::PathBuf;
use std::sync::Arc;

/// Cookie keys shorter than this are rejected by `Key::from`.
const MIN_SECRET_KEY_BYTES: usize = 64;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_lib_mods();
    app_config::init();

    let config = app_config::get_config();

    let db = init_db(&config.database.url, config.database.max_connections)
        .await
        .context("Database failed to initialize")?;

    let broker = sse::broker_from_config(&config.sse.redis_url)
        .context("SSE broker failed to initialize")?;
    sse::init_broker(broker);

    let storage: Arc<dyn StorageBackend> = Arc::new(
        LocalStorage::new(
            PathBuf::from(&config.storage.local_path),
            &config.storage.public_url,
        )
        .context("Storage failed to initialize")?,
    );
    let storage = Data::from(storage);

    let secret_key = session_key(&config.security.secret_key);
    let secure_cookies = config.site.mode == Mode::Prod;
    let bind = config.site.bind.clone();
    log::info!("Serving {} on {}", config.site.server_name, bind);

    // Middleware runs in reverse order of registration.
    HttpServer::new(move || {
        App::new()
            .app_data(Data::new(db.clone()))
            .app_data(storage.clone())
            .wrap(
                DefaultHeaders::new()
                    .add((header::X_FRAME_OPTIONS, "DENY"))
                    .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
                    .add(("Referrer-Policy", "strict-origin-when-cross-origin")),
            )
            .wrap(ClientCtx::default())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                    .cookie_same_site(SameSite::Lax)
                    .cookie_secure(secure_cookies)
                    .session_lifecycle(PersistentSession::default())
                    .build(),
            )
            .wrap(Logger::new("%a %{Host}i %r %s %Dms"))
            .configure(web::configure)
    })
    .bind(&bind)
    .with_context(|| format!("Could not bind {}", bind))?
    .run()
    .await?;

    Ok(())
}

/// Initialize third party crates we rely on but don't have control over.
fn init_lib_mods() {
    app_config::load_dotenv(Mode::from_env());
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}

/// A missing or short key gets replaced by a random one, which logs every
/// user out on restart.
fn session_key(configured: &str) -> Key {
    if configured.len() >= MIN_SECRET_KEY_BYTES {
        return Key::from(configured.as_bytes());
    }

    let random_string: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(128)
        .map(char::from)
        .collect();
    log::warn!(
        "security.secret_key is missing or shorter than {} bytes. Session cookies will not survive a restart. Set FLOWDUCK_SECURITY__SECRET_KEY, for example to:\n{}",
        MIN_SECRET_KEY_BYTES,
        random_string
    );
    Key::from(random_string.as_bytes())
}
