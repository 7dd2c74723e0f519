pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use khodroyar_agent::car_tools::{
    CALCULATE_USED_CAR_PRICE, GET_CAR_DETAILS, SEARCH_CARS_BY_BUDGET, SEARCH_CARS_BY_COMPANY,
    SEARCH_CAR_FEATURES, SEARCH_CAR_PRICE_BY_NAME,
};
use khodroyar_core::config::{CatalogFormat, ConfigOverrides, LoadOptions, LocaleKind};
use serde_json::{json, Map, Value};

use commands::CommandResult;

#[derive(Debug, Parser)]
#[command(
    name = "khodroyar",
    about = "Khodroyar car catalog CLI",
    long_about = "Search the car price catalog, estimate used-car prices, and inspect configuration.",
    after_help = "Examples:\n  khodroyar budget 500000000\n  khodroyar price \"dena plus\"\n  khodroyar valuate --base-price 500000000 --age 3 --km 75000 --damage paint:roof\n  khodroyar doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a khodroyar.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Catalog file to load instead of the configured one")]
    catalog: Option<PathBuf>,
    #[arg(long, global = true, help = "Catalog file format: json or csv")]
    catalog_format: Option<CatalogFormat>,
    #[arg(long, global = true, help = "Price rendering locale: latin or persian")]
    locale: Option<LocaleKind>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "List cars priced from 10% below to 5% above a budget")]
    Budget { amount: u64 },
    #[command(about = "Look up current prices by full or partial car name")]
    Price { name: String },
    #[command(about = "Show specs, advantages and disadvantages for a car or feature keyword")]
    Features {
        name: String,
        #[arg(long, help = "Similarity threshold between 0 and 1")]
        threshold: Option<f64>,
    },
    #[command(about = "List every car made by a company")]
    Company {
        name: String,
        #[arg(long, help = "Similarity threshold between 0 and 1")]
        threshold: Option<f64>,
    },
    #[command(about = "Show the closest matching car, or similar names when nothing matches")]
    Details { name: String },
    #[command(about = "Estimate a used car's price from its new price, age, mileage and damages")]
    Valuate(ValuateArgs),
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, catalog loading and the valuation engine")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

#[derive(Debug, Args)]
struct ValuateArgs {
    #[arg(long, help = "Current new-car price")]
    base_price: u64,
    #[arg(long, help = "Age in whole years")]
    age: u32,
    #[arg(long, help = "Odometer reading in kilometres")]
    km: u64,
    #[arg(
        long = "damage",
        value_parser = parse_damage,
        help = "Damage as kind[:part[:severity]], repeatable (e.g. paint:roof:major)"
    )]
    damages: Vec<DamageArg>,
    #[arg(long, help = "Options multiplier, usually 0.9 to 1.1")]
    options_factor: Option<f64>,
    #[arg(long, help = "Brand popularity multiplier, 0.9 for less popular brands")]
    brand_popularity: Option<f64>,
    #[arg(long, help = "Market condition multiplier")]
    market_factor: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct DamageArg {
    kind: String,
    part: Option<String>,
    severity: Option<String>,
}

fn parse_damage(raw: &str) -> Result<DamageArg, String> {
    let mut pieces = raw.splitn(3, ':').map(str::trim);
    let kind = pieces.next().unwrap_or_default();
    if kind.is_empty() {
        return Err("damage kind must not be empty".to_string());
    }

    let mut optional = || pieces.next().filter(|piece| !piece.is_empty()).map(str::to_string);
    let part = optional();
    let severity = optional();

    Ok(DamageArg { kind: kind.to_ascii_lowercase(), part, severity })
}

impl DamageArg {
    fn to_json(&self) -> Value {
        let mut fields = Map::new();
        fields.insert("type".to_string(), Value::String(self.kind.clone()));
        if let Some(part) = &self.part {
            fields.insert("part".to_string(), Value::String(part.clone()));
        }
        if let Some(severity) = &self.severity {
            fields.insert("severity".to_string(), Value::String(severity.to_ascii_lowercase()));
        }
        Value::Object(fields)
    }
}

impl ValuateArgs {
    fn to_tool_input(&self) -> Value {
        let mut input = json!({
            "base_price": self.base_price,
            "car_age": self.age,
            "car_kilometers": self.km,
            "damages": self.damages.iter().map(DamageArg::to_json).collect::<Vec<_>>(),
        });
        let adjustments = [
            ("options_factor", self.options_factor),
            ("brand_popularity", self.brand_popularity),
            ("market_factor", self.market_factor),
        ];
        for (key, value) in adjustments {
            if let Some(value) = value {
                input[key] = json!(value);
            }
        }
        input
    }
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                catalog_path: self.catalog.clone(),
                catalog_format: self.catalog_format,
                locale: self.locale,
                ..ConfigOverrides::default()
            },
        }
    }
}

pub fn run() -> ExitCode {
    let result = execute(Cli::parse());
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

pub fn execute(cli: Cli) -> CommandResult {
    let options = cli.load_options();

    match cli.command {
        Command::Budget { amount } => commands::tool::run(
            "budget",
            SEARCH_CARS_BY_BUDGET,
            json!({ "budget": amount }),
            &options,
        ),
        Command::Price { name } => commands::tool::run(
            "price",
            SEARCH_CAR_PRICE_BY_NAME,
            json!({ "car_name": name }),
            &options,
        ),
        Command::Features { name, threshold } => commands::tool::run(
            "features",
            SEARCH_CAR_FEATURES,
            json!({ "car_name": name, "similarity_threshold": threshold }),
            &options,
        ),
        Command::Company { name, threshold } => commands::tool::run(
            "company",
            SEARCH_CARS_BY_COMPANY,
            json!({ "company_name": name, "similarity_threshold": threshold }),
            &options,
        ),
        Command::Details { name } => commands::tool::run(
            "details",
            GET_CAR_DETAILS,
            json!({ "car_name": name }),
            &options,
        ),
        Command::Valuate(args) => commands::tool::run(
            "valuate",
            CALCULATE_USED_CAR_PRICE,
            args.to_tool_input(),
            &options,
        ),
        Command::Config => commands::config::run(&options),
        Command::Doctor { json } => commands::doctor::run(json, &options),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use serde_json::json;

    use super::{parse_damage, Cli, Command, DamageArg};

    #[test]
    fn damage_flag_accepts_kind_part_and_severity() {
        assert_eq!(
            parse_damage("Paint:roof:Major"),
            Ok(DamageArg {
                kind: "paint".to_string(),
                part: Some("roof".to_string()),
                severity: Some("Major".to_string()),
            })
        );
        assert_eq!(
            parse_damage("body_replacement"),
            Ok(DamageArg { kind: "body_replacement".to_string(), part: None, severity: None })
        );
        assert_eq!(
            parse_damage("paint::minor"),
            Ok(DamageArg {
                kind: "paint".to_string(),
                part: None,
                severity: Some("minor".to_string()),
            })
        );
        assert!(parse_damage(":roof").is_err());
    }

    #[test]
    fn valuate_builds_tool_arguments() {
        let cli = Cli::try_parse_from([
            "khodroyar",
            "valuate",
            "--base-price",
            "500000000",
            "--age",
            "3",
            "--km",
            "75000",
            "--damage",
            "paint:front_bumper:minor",
            "--damage",
            "replacement:headlight",
            "--brand-popularity",
            "0.9",
        ])
        .expect("arguments should parse");

        let Command::Valuate(args) = cli.command else {
            panic!("expected valuate command");
        };
        assert_eq!(
            args.to_tool_input(),
            json!({
                "base_price": 500000000u64,
                "car_age": 3,
                "car_kilometers": 75000,
                "damages": [
                    { "type": "paint", "part": "front_bumper", "severity": "minor" },
                    { "type": "replacement", "part": "headlight" }
                ],
                "brand_popularity": 0.9
            })
        );
    }

    #[test]
    fn global_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "khodroyar",
            "budget",
            "500000000",
            "--catalog",
            "cars.csv",
            "--catalog-format",
            "csv",
            "--locale",
            "fa",
        ])
        .expect("arguments should parse");

        let options = cli.load_options();
        assert!(!options.require_file);
        assert_eq!(
            options.overrides.catalog_path.as_deref(),
            Some(std::path::Path::new("cars.csv"))
        );
        assert!(options.overrides.catalog_format.is_some());
        assert!(options.overrides.locale.is_some());
    }
}
