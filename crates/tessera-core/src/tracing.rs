use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Directives used when `RUST_LOG` is unset: the identity crates at `info`,
/// database drivers only when something goes wrong.
pub const DEFAULT_DIRECTIVES: &str =
    "tessera_identity=info,tessera_identity_migration=info,sea_orm=warn,sqlx=warn";

/// `RUST_LOG` when set and valid, [`DEFAULT_DIRECTIVES`] otherwise.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Install the JSON stdout subscriber for identity tooling. Later calls are
/// no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json().with_target(true))
        .try_init();
}
