#![allow(dead_code)]

use std::{
    env,
    sync::{Mutex, MutexGuard, OnceLock},
    time::{SystemTime, UNIX_EPOCH},
};

use mongodb::Client;

use spacehub::config::AppConfig;
use spacehub::state::{AppState, init_state};

/// Global lock so integration tests that mutate the DB run one-at-a-time.
static TEST_DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub struct TestContext {
    pub state: AppState,
    pub db_name: String,
    uri: String,
    _guard: MutexGuard<'static, ()>,
}

/// Empty throw-away database.
pub async fn setup_state() -> Option<TestContext> {
    setup_with_seed("./data/does-not-exist.json").await
}

/// Throw-away database seeded from `seed_file`.
pub async fn setup_with_seed(seed_file: &str) -> Option<TestContext> {
    let guard = TEST_DB_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let uri = env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let db_name = format!(
        "spacehubtest_{}",
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis()
    );

    let client = match Client::with_uri_str(&uri).await {
        Ok(c) => c,
        Err(err) => {
            eprintln!("Skipping test; cannot connect to MongoDB: {err:?}");
            return None;
        }
    };
    if let Err(err) = client.database(&db_name).drop().await {
        eprintln!("Skipping test; cannot drop test DB: {err:?}");
        return None;
    }

    let config = AppConfig {
        mongodb_uri: uri.clone(),
        mongodb_db: db_name.clone(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        seed_file: seed_file.to_string(),
        log_json: false,
        debug_pricing: false,
    };
    match init_state(&config).await {
        Ok(state) => Some(TestContext {
            state,
            db_name,
            uri,
            _guard: guard,
        }),
        Err(err) => {
            eprintln!("Skipping test; init_state failed: {err:?}");
            None
        }
    }
}

pub async fn teardown(ctx: Option<TestContext>) {
    if let Some(ctx) = ctx {
        if let Ok(client) = Client::with_uri_str(&ctx.uri).await {
            let _ = client.database(&ctx.db_name).drop().await;
        }
        drop(ctx);
    }
}
