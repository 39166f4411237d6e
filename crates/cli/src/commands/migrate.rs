use carhaul_core::config::{AppConfig, LoadOptions};
use carhaul_db::{connect, migrations};

use crate::commands::CommandResult;

struct MigrateFailure {
    class: &'static str,
    message: String,
    exit_code: u8,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    match runtime.block_on(apply_pending(&config)) {
        Ok(message) => CommandResult::success("migrate", message),
        Err(failure) => {
            CommandResult::failure("migrate", failure.class, failure.message, failure.exit_code)
        }
    }
}

async fn apply_pending(config: &AppConfig) -> Result<String, MigrateFailure> {
    let pool = connect(&config.database).await.map_err(|error| MigrateFailure {
        class: "db_connectivity",
        message: format!("failed to open `{}`: {error}", config.database.url),
        exit_code: 4,
    })?;

    let result = migrations::run_pending(&pool).await;
    pool.close().await;

    match result {
        Ok(()) => Ok(format!("migrations up to date for `{}`", config.database.url)),
        Err(error) => Err(MigrateFailure {
            class: "migration",
            message: error.to_string(),
            exit_code: 5,
        }),
    }
}
