use std::sync::Arc;

use anyhow::Context;
use khodroyar_agent::ToolRegistry;
use khodroyar_core::catalog::source;
use khodroyar_core::config::{AppConfig, LoadOptions};
use khodroyar_core::{ApplicationError, CatalogStore};
use serde_json::Value;
use tokio::runtime::Runtime;

use super::{CommandResult, EXIT_CATALOG, EXIT_CONFIG, EXIT_TOOL};
use crate::logging;

/// Loads config and catalog, then runs one catalog tool and reports its JSON result.
pub fn run(command: &str, tool_name: &str, input: Value, options: &LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => {
            let interface = ApplicationError::from(error).into_interface(command);
            return CommandResult::failure(
                command,
                "config_validation",
                interface.to_string(),
                EXIT_CONFIG,
            );
        }
    };
    logging::init(&config.logging);

    let catalog = match source::load_configured(&config.catalog) {
        Ok(catalog) => catalog,
        Err(error) => {
            let interface = error.into_interface(command);
            tracing::error!(
                event_name = "cli.catalog.unavailable",
                command,
                error = %interface,
                "catalog could not be loaded"
            );
            return CommandResult::failure(
                command,
                "catalog_source",
                interface.to_string(),
                EXIT_CATALOG,
            );
        }
    };

    let store = Arc::new(CatalogStore::new(catalog));
    let registry = ToolRegistry::car_toolkit(store, config);

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(command, "runtime", format!("{error:#}"), EXIT_TOOL)
        }
    };

    match runtime.block_on(registry.execute(tool_name, input)) {
        Ok(result) => CommandResult::tool_success(command, tool_name, result),
        Err(error) => {
            CommandResult::failure(command, "tool_execution", format!("{error:#}"), EXIT_TOOL)
        }
    }
}

fn build_runtime() -> anyhow::Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize async runtime")
}
