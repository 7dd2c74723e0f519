use std::env;
use std::fs;
use std::path::Path;

use khodroyar_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

use super::{CommandResult, EXIT_CONFIG};

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
    overridden: bool,
}

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                EXIT_CONFIG,
            )
        }
    };

    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let overrides = &options.overrides;

    let fields = [
        Field {
            key: "catalog.path",
            value: config.catalog.path.display().to_string(),
            env_keys: &["KHODROYAR_CATALOG_PATH"],
            overridden: overrides.catalog_path.is_some(),
        },
        Field {
            key: "catalog.format",
            value: format!("{:?}", config.catalog.format),
            env_keys: &["KHODROYAR_CATALOG_FORMAT"],
            overridden: overrides.catalog_format.is_some(),
        },
        Field {
            key: "catalog.csv_delimiter",
            value: config.catalog.csv_delimiter.to_string(),
            env_keys: &["KHODROYAR_CATALOG_CSV_DELIMITER"],
            overridden: false,
        },
        Field {
            key: "matching.name_threshold",
            value: config.matching.name_threshold.to_string(),
            env_keys: &["KHODROYAR_MATCHING_NAME_THRESHOLD"],
            overridden: false,
        },
        Field {
            key: "matching.company_threshold",
            value: config.matching.company_threshold.to_string(),
            env_keys: &["KHODROYAR_MATCHING_COMPANY_THRESHOLD"],
            overridden: false,
        },
        Field {
            key: "matching.feature_threshold",
            value: config.matching.feature_threshold.to_string(),
            env_keys: &["KHODROYAR_MATCHING_FEATURE_THRESHOLD"],
            overridden: false,
        },
        Field {
            key: "matching.feature_name_threshold",
            value: config.matching.feature_name_threshold.to_string(),
            env_keys: &[],
            overridden: false,
        },
        Field {
            key: "matching.details_threshold",
            value: config.matching.details_threshold.to_string(),
            env_keys: &[],
            overridden: false,
        },
        Field {
            key: "matching.suggestion_threshold",
            value: config.matching.suggestion_threshold.to_string(),
            env_keys: &[],
            overridden: false,
        },
        Field {
            key: "matching.max_results",
            value: config.matching.max_results.to_string(),
            env_keys: &["KHODROYAR_MATCHING_MAX_RESULTS"],
            overridden: false,
        },
        Field {
            key: "matching.suggestion_limit",
            value: config.matching.suggestion_limit.to_string(),
            env_keys: &[],
            overridden: false,
        },
        Field {
            key: "budget.lower_tolerance",
            value: config.budget.lower_tolerance.to_string(),
            env_keys: &["KHODROYAR_BUDGET_LOWER_TOLERANCE"],
            overridden: false,
        },
        Field {
            key: "budget.upper_tolerance",
            value: config.budget.upper_tolerance.to_string(),
            env_keys: &["KHODROYAR_BUDGET_UPPER_TOLERANCE"],
            overridden: false,
        },
        Field {
            key: "valuation.post_four_year_factor",
            value: config.valuation.post_four_year_factor.to_string(),
            env_keys: &["KHODROYAR_VALUATION_POST_FOUR_YEAR_FACTOR"],
            overridden: overrides.post_four_year_factor.is_some(),
        },
        Field {
            key: "valuation.expected_km_per_year",
            value: config.valuation.expected_km_per_year.to_string(),
            env_keys: &["KHODROYAR_VALUATION_EXPECTED_KM_PER_YEAR"],
            overridden: false,
        },
        Field {
            key: "valuation.range_spread",
            value: config.valuation.range_spread.to_string(),
            env_keys: &[],
            overridden: false,
        },
        Field {
            key: "formatting.locale",
            value: format!("{:?}", config.formatting.locale),
            env_keys: &["KHODROYAR_FORMATTING_LOCALE"],
            overridden: overrides.locale.is_some(),
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["KHODROYAR_LOGGING_LEVEL", "KHODROYAR_LOG_LEVEL"],
            overridden: overrides.log_level.is_some(),
        },
        Field {
            key: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["KHODROYAR_LOGGING_FORMAT", "KHODROYAR_LOG_FORMAT"],
            overridden: overrides.log_format.is_some(),
        },
    ];

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    for field in &fields {
        let source =
            field_source(field, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(field.key, &field.value, source));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    field: &Field,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if field.overridden {
        return "flag".to_string();
    }

    if let Some(env_key) = field.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, field.key) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
