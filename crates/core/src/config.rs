use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub matching: MatchingConfig,
    pub budget: BudgetConfig,
    pub valuation: ValuationConfig,
    pub formatting: FormattingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CatalogConfig {
    pub path: PathBuf,
    pub format: CatalogFormat,
    pub csv_delimiter: char,
}

/// Similarity thresholds and result caps for the catalog matcher.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchingConfig {
    pub name_threshold: f64,
    pub company_threshold: f64,
    pub feature_threshold: f64,
    /// Name threshold used when looking up feature sheets by car name.
    pub feature_name_threshold: f64,
    pub details_threshold: f64,
    pub suggestion_threshold: f64,
    pub max_results: usize,
    pub suggestion_limit: usize,
}

/// Asymmetric tolerance band around a stated budget, as fractions of the budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BudgetConfig {
    pub lower_tolerance: Decimal,
    pub upper_tolerance: Decimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValuationConfig {
    /// Yearly retention factor applied from the fifth year on. Revisions disagreed
    /// between 0.97 and 0.98; 0.98 is the latest.
    pub post_four_year_factor: Decimal,
    pub expected_km_per_year: u64,
    pub km_step: u64,
    pub km_step_rate: Decimal,
    pub max_mileage_depreciation: Decimal,
    pub range_spread: Decimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormattingConfig {
    pub locale: LocaleKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogFormat {
    Json,
    Csv,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocaleKind {
    Latin,
    Persian,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub catalog_path: Option<PathBuf>,
    pub catalog_format: Option<CatalogFormat>,
    pub locale: Option<LocaleKind>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub post_four_year_factor: Option<Decimal>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            matching: MatchingConfig::default(),
            budget: BudgetConfig::default(),
            valuation: ValuationConfig::default(),
            formatting: FormattingConfig { locale: LocaleKind::Latin },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/iran_car_prices.json"),
            format: CatalogFormat::Json,
            csv_delimiter: '|',
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            name_threshold: 0.6,
            company_threshold: 0.4,
            feature_threshold: 0.3,
            feature_name_threshold: 0.4,
            details_threshold: 0.5,
            suggestion_threshold: 0.3,
            max_results: 20,
            suggestion_limit: 5,
        }
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self { lower_tolerance: Decimal::new(10, 2), upper_tolerance: Decimal::new(5, 2) }
    }
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            post_four_year_factor: Decimal::new(98, 2),
            expected_km_per_year: 25_000,
            km_step: 10_000,
            km_step_rate: Decimal::new(1, 2),
            max_mileage_depreciation: Decimal::new(5, 1),
            range_spread: Decimal::new(5, 2),
        }
    }
}

impl FromStr for CatalogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(ConfigError::Validation(format!(
                "unsupported catalog format `{other}` (expected json|csv)"
            ))),
        }
    }
}

impl FromStr for LocaleKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "latin" | "en" => Ok(Self::Latin),
            "persian" | "fa" => Ok(Self::Persian),
            other => Err(ConfigError::Validation(format!(
                "unsupported locale `{other}` (expected latin|persian)"
            ))),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("khodroyar.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(catalog) = patch.catalog {
            if let Some(path) = catalog.path {
                self.catalog.path = path;
            }
            if let Some(format) = catalog.format {
                self.catalog.format = format;
            }
            if let Some(csv_delimiter) = catalog.csv_delimiter {
                self.catalog.csv_delimiter = csv_delimiter;
            }
        }

        if let Some(matching) = patch.matching {
            let target = &mut self.matching;
            if let Some(value) = matching.name_threshold {
                target.name_threshold = value;
            }
            if let Some(value) = matching.company_threshold {
                target.company_threshold = value;
            }
            if let Some(value) = matching.feature_threshold {
                target.feature_threshold = value;
            }
            if let Some(value) = matching.feature_name_threshold {
                target.feature_name_threshold = value;
            }
            if let Some(value) = matching.details_threshold {
                target.details_threshold = value;
            }
            if let Some(value) = matching.suggestion_threshold {
                target.suggestion_threshold = value;
            }
            if let Some(value) = matching.max_results {
                target.max_results = value;
            }
            if let Some(value) = matching.suggestion_limit {
                target.suggestion_limit = value;
            }
        }

        if let Some(budget) = patch.budget {
            if let Some(lower_tolerance) = budget.lower_tolerance {
                self.budget.lower_tolerance = lower_tolerance;
            }
            if let Some(upper_tolerance) = budget.upper_tolerance {
                self.budget.upper_tolerance = upper_tolerance;
            }
        }

        if let Some(valuation) = patch.valuation {
            let target = &mut self.valuation;
            if let Some(value) = valuation.post_four_year_factor {
                target.post_four_year_factor = value;
            }
            if let Some(value) = valuation.expected_km_per_year {
                target.expected_km_per_year = value;
            }
            if let Some(value) = valuation.km_step {
                target.km_step = value;
            }
            if let Some(value) = valuation.km_step_rate {
                target.km_step_rate = value;
            }
            if let Some(value) = valuation.max_mileage_depreciation {
                target.max_mileage_depreciation = value;
            }
            if let Some(value) = valuation.range_spread {
                target.range_spread = value;
            }
        }

        if let Some(formatting) = patch.formatting {
            if let Some(locale) = formatting.locale {
                self.formatting.locale = locale;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("KHODROYAR_CATALOG_PATH") {
            self.catalog.path = PathBuf::from(value);
        }
        if let Some(value) = read_env("KHODROYAR_CATALOG_FORMAT") {
            self.catalog.format = value.parse()?;
        }
        if let Some(value) = read_env("KHODROYAR_CATALOG_CSV_DELIMITER") {
            self.catalog.csv_delimiter = parse_char("KHODROYAR_CATALOG_CSV_DELIMITER", &value)?;
        }

        if let Some(value) = read_env("KHODROYAR_MATCHING_NAME_THRESHOLD") {
            self.matching.name_threshold = parse_f64("KHODROYAR_MATCHING_NAME_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("KHODROYAR_MATCHING_COMPANY_THRESHOLD") {
            self.matching.company_threshold =
                parse_f64("KHODROYAR_MATCHING_COMPANY_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("KHODROYAR_MATCHING_FEATURE_THRESHOLD") {
            self.matching.feature_threshold =
                parse_f64("KHODROYAR_MATCHING_FEATURE_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("KHODROYAR_MATCHING_MAX_RESULTS") {
            self.matching.max_results = parse_usize("KHODROYAR_MATCHING_MAX_RESULTS", &value)?;
        }

        if let Some(value) = read_env("KHODROYAR_BUDGET_LOWER_TOLERANCE") {
            self.budget.lower_tolerance =
                parse_decimal("KHODROYAR_BUDGET_LOWER_TOLERANCE", &value)?;
        }
        if let Some(value) = read_env("KHODROYAR_BUDGET_UPPER_TOLERANCE") {
            self.budget.upper_tolerance =
                parse_decimal("KHODROYAR_BUDGET_UPPER_TOLERANCE", &value)?;
        }

        if let Some(value) = read_env("KHODROYAR_VALUATION_POST_FOUR_YEAR_FACTOR") {
            self.valuation.post_four_year_factor =
                parse_decimal("KHODROYAR_VALUATION_POST_FOUR_YEAR_FACTOR", &value)?;
        }
        if let Some(value) = read_env("KHODROYAR_VALUATION_EXPECTED_KM_PER_YEAR") {
            self.valuation.expected_km_per_year =
                parse_u64("KHODROYAR_VALUATION_EXPECTED_KM_PER_YEAR", &value)?;
        }

        if let Some(value) = read_env("KHODROYAR_FORMATTING_LOCALE") {
            self.formatting.locale = value.parse()?;
        }

        let log_level =
            read_env("KHODROYAR_LOGGING_LEVEL").or_else(|| read_env("KHODROYAR_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("KHODROYAR_LOGGING_FORMAT").or_else(|| read_env("KHODROYAR_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(catalog_path) = overrides.catalog_path {
            self.catalog.path = catalog_path;
        }
        if let Some(catalog_format) = overrides.catalog_format {
            self.catalog.format = catalog_format;
        }
        if let Some(locale) = overrides.locale {
            self.formatting.locale = locale;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(factor) = overrides.post_four_year_factor {
            self.valuation.post_four_year_factor = factor;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_catalog(&self.catalog)?;
        validate_matching(&self.matching)?;
        validate_budget(&self.budget)?;
        validate_valuation(&self.valuation)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("khodroyar.toml"), PathBuf::from("config/khodroyar.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_catalog(catalog: &CatalogConfig) -> Result<(), ConfigError> {
    if catalog.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("catalog.path must not be empty".to_string()));
    }

    if !catalog.csv_delimiter.is_ascii() || catalog.csv_delimiter.is_ascii_alphanumeric() {
        return Err(ConfigError::Validation(format!(
            "catalog.csv_delimiter must be an ASCII punctuation or whitespace character, got `{}`",
            catalog.csv_delimiter
        )));
    }

    Ok(())
}

fn validate_matching(matching: &MatchingConfig) -> Result<(), ConfigError> {
    let thresholds = [
        ("matching.name_threshold", matching.name_threshold),
        ("matching.company_threshold", matching.company_threshold),
        ("matching.feature_threshold", matching.feature_threshold),
        ("matching.feature_name_threshold", matching.feature_name_threshold),
        ("matching.details_threshold", matching.details_threshold),
        ("matching.suggestion_threshold", matching.suggestion_threshold),
    ];
    for (key, value) in thresholds {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::Validation(format!("{key} must be in range 0.0..=1.0")));
        }
    }

    if matching.max_results == 0 {
        return Err(ConfigError::Validation(
            "matching.max_results must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_budget(budget: &BudgetConfig) -> Result<(), ConfigError> {
    let in_range = |value: Decimal| value >= Decimal::ZERO && value < Decimal::ONE;
    if !in_range(budget.lower_tolerance) || !in_range(budget.upper_tolerance) {
        return Err(ConfigError::Validation(
            "budget tolerances must be fractions in range 0.0..1.0 (e.g. 0.10 for 10%)".to_string(),
        ));
    }

    Ok(())
}

fn validate_valuation(valuation: &ValuationConfig) -> Result<(), ConfigError> {
    if valuation.post_four_year_factor <= Decimal::ZERO
        || valuation.post_four_year_factor > Decimal::ONE
    {
        return Err(ConfigError::Validation(
            "valuation.post_four_year_factor must be in range (0.0, 1.0] (0.97 and 0.98 are the known revisions)"
                .to_string(),
        ));
    }

    if valuation.km_step == 0 {
        return Err(ConfigError::Validation(
            "valuation.km_step must be greater than zero".to_string(),
        ));
    }

    if valuation.km_step_rate < Decimal::ZERO {
        return Err(ConfigError::Validation(
            "valuation.km_step_rate must not be negative".to_string(),
        ));
    }

    if valuation.max_mileage_depreciation < Decimal::ZERO
        || valuation.max_mileage_depreciation > Decimal::ONE
    {
        return Err(ConfigError::Validation(
            "valuation.max_mileage_depreciation must be in range 0.0..=1.0".to_string(),
        ));
    }

    if valuation.range_spread < Decimal::ZERO || valuation.range_spread >= Decimal::ONE {
        return Err(ConfigError::Validation(
            "valuation.range_spread must be in range 0.0..1.0".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| invalid_override(key, value))
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(value.trim()).map_err(|_| invalid_override(key, value))
}

fn parse_char(key: &str, value: &str) -> Result<char, ConfigError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Ok(ch),
        _ => Err(invalid_override(key, value)),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    catalog: Option<CatalogPatch>,
    matching: Option<MatchingPatch>,
    budget: Option<BudgetPatch>,
    valuation: Option<ValuationPatch>,
    formatting: Option<FormattingPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    path: Option<PathBuf>,
    format: Option<CatalogFormat>,
    csv_delimiter: Option<char>,
}

#[derive(Debug, Default, Deserialize)]
struct MatchingPatch {
    name_threshold: Option<f64>,
    company_threshold: Option<f64>,
    feature_threshold: Option<f64>,
    feature_name_threshold: Option<f64>,
    details_threshold: Option<f64>,
    suggestion_threshold: Option<f64>,
    max_results: Option<usize>,
    suggestion_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct BudgetPatch {
    lower_tolerance: Option<Decimal>,
    upper_tolerance: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct ValuationPatch {
    post_four_year_factor: Option<Decimal>,
    expected_km_per_year: Option<u64>,
    km_step: Option<u64>,
    km_step_rate: Option<Decimal>,
    max_mileage_depreciation: Option<Decimal>,
    range_spread: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct FormattingPatch {
    locale: Option<LocaleKind>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::{
        AppConfig, CatalogFormat, ConfigError, ConfigOverrides, LoadOptions, LocaleKind, LogFormat,
    };

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_use_latest_revision_constants() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(
            config.valuation.post_four_year_factor == Decimal::new(98, 2),
            "post-four-year factor should default to 0.98",
        )?;
        ensure(
            config.budget.lower_tolerance == Decimal::new(10, 2)
                && config.budget.upper_tolerance == Decimal::new(5, 2),
            "budget band should default to -10%/+5%",
        )?;
        ensure(config.matching.name_threshold == 0.6, "name threshold should default to 0.6")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_CATALOG_DIR", "/srv/khodroyar");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("khodroyar.toml");
            fs::write(
                &path,
                r#"
[catalog]
path = "${TEST_CATALOG_DIR}/cars.csv"
format = "csv"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.catalog.path == PathBuf::from("/srv/khodroyar/cars.csv"),
                "catalog path should be interpolated from environment",
            )?;
            ensure(config.catalog.format == CatalogFormat::Csv, "catalog format should be csv")
        })();

        clear_vars(&["TEST_CATALOG_DIR"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("KHODROYAR_VALUATION_POST_FOUR_YEAR_FACTOR", "0.97");
        env::set_var("KHODROYAR_FORMATTING_LOCALE", "persian");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("khodroyar.toml");
            fs::write(
                &path,
                r#"
[valuation]
post_four_year_factor = 0.96

[formatting]
locale = "latin"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.valuation.post_four_year_factor == Decimal::new(97, 2),
                "env factor should win over file",
            )?;
            ensure(config.formatting.locale == LocaleKind::Persian, "env locale should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")
        })();

        clear_vars(&["KHODROYAR_VALUATION_POST_FOUR_YEAR_FACTOR", "KHODROYAR_FORMATTING_LOCALE"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("KHODROYAR_LOG_LEVEL", "warn");
        env::set_var("KHODROYAR_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warn log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )
        })();

        clear_vars(&["KHODROYAR_LOG_LEVEL", "KHODROYAR_LOG_FORMAT"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("KHODROYAR_MATCHING_NAME_THRESHOLD", "1.5");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("matching.name_threshold")
            );
            ensure(has_message, "validation failure should mention matching.name_threshold")
        })();

        clear_vars(&["KHODROYAR_MATCHING_NAME_THRESHOLD"]);
        result
    }

    #[test]
    fn malformed_env_override_is_reported_with_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("KHODROYAR_BUDGET_UPPER_TOLERANCE", "five percent");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected env override failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::InvalidEnvOverride { ref key, .. }
                        if key == "KHODROYAR_BUDGET_UPPER_TOLERANCE"
                ),
                "error should name the offending variable",
            )
        })();

        clear_vars(&["KHODROYAR_BUDGET_UPPER_TOLERANCE"]);
        result
    }

    #[test]
    fn required_file_is_enforced() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let missing = dir.path().join("absent.toml");
        let error = AppConfig::load(LoadOptions {
            config_path: Some(missing.clone()),
            require_file: true,
            ..LoadOptions::default()
        });

        ensure(
            matches!(error, Err(ConfigError::MissingConfigFile(ref path)) if *path == missing),
            "missing required file should be reported",
        )
    }
}
