use khodroyar_core::catalog::source;
use khodroyar_core::config::{AppConfig, LoadOptions};
use khodroyar_core::{
    Catalog, DamageRecord, DepreciationInput, DepreciationValuationEngine, MarketAdjustments,
    Severity, ValuationEngine,
};
use serde::Serialize;

use super::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool, options: &LoadOptions) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult { exit_code, output };
    }

    CommandResult { exit_code, output: render_human(&report) }
}

fn build_report(options: &LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            match source::load_configured(&config.catalog) {
                Ok(catalog) => {
                    checks.push(DoctorCheck {
                        name: "catalog_load",
                        status: CheckStatus::Pass,
                        details: format!(
                            "{} listings from {} companies in `{}`",
                            catalog.len(),
                            catalog.companies().len(),
                            config.catalog.path.display()
                        ),
                    });
                    checks.push(check_catalog_pricing(&catalog));
                }
                Err(error) => {
                    checks.push(DoctorCheck {
                        name: "catalog_load",
                        status: CheckStatus::Fail,
                        details: error.to_string(),
                    });
                    checks.push(skipped("catalog_pricing", "catalog did not load"));
                }
            }
            checks.push(check_valuation_engine(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("catalog_load", "configuration did not load"));
            checks.push(skipped("catalog_pricing", "configuration did not load"));
            checks.push(skipped("valuation_engine", "configuration did not load"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn skipped(name: &'static str, reason: &str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: format!("skipped because {reason}"),
    }
}

fn check_catalog_pricing(catalog: &Catalog) -> DoctorCheck {
    let priced = catalog.priced_len();
    if priced == 0 {
        return DoctorCheck {
            name: "catalog_pricing",
            status: CheckStatus::Fail,
            details: "no listing has a parseable price; budget and price searches will be empty"
                .to_string(),
        };
    }

    DoctorCheck {
        name: "catalog_pricing",
        status: CheckStatus::Pass,
        details: format!("{priced} of {} listings are priced", catalog.len()),
    }
}

/// Runs a reference valuation so a misconfigured factor shows up before real requests do.
fn check_valuation_engine(config: &AppConfig) -> DoctorCheck {
    let engine = DepreciationValuationEngine::new(config.valuation);
    let result = engine.valuate(&DepreciationInput {
        base_price: 500_000_000u64.into(),
        age_years: 3,
        mileage_km: 75_000,
        damages: vec![
            DamageRecord::paint("front_bumper", Severity::Minor),
            DamageRecord::part_replacement("headlight"),
        ],
        adjustments: MarketAdjustments::default(),
    });

    match result.error {
        Some(error) => {
            DoctorCheck { name: "valuation_engine", status: CheckStatus::Fail, details: error }
        }
        None if result.final_price >= result.base_price => DoctorCheck {
            name: "valuation_engine",
            status: CheckStatus::Fail,
            details: format!(
                "reference valuation did not depreciate: {} -> {}",
                result.base_price, result.final_price
            ),
        },
        None => DoctorCheck {
            name: "valuation_engine",
            status: CheckStatus::Pass,
            details: format!("reference valuation {} -> {}", result.base_price, result.final_price),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
