//! Confined-space permit compliance.
//!
//! A permit is evaluated against its province's table. Each applicable check
//! either passes or produces an issue; critical issues block activation.

mod rules;

pub use rules::{all_rules, rules_for, AtmosphericLimits, ProvinceRules, SectionRefs};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::domain::entities::{AtmosphericReading, Permit};
use crate::domain::value_objects::Province;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
}

/// A failed check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceIssue {
    pub code: &'static str,
    pub severity: Severity,
    pub message: String,
    pub reference: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceReport {
    pub province: Province,
    pub regulation: &'static str,
    pub compliant: bool,
    pub compliance_percent: u8,
    pub checks_passed: u32,
    pub checks_applicable: u32,
    pub issues: Vec<ComplianceIssue>,
    pub evaluated_at: DateTime<Utc>,
}

impl ComplianceReport {
    pub fn critical_issues(&self) -> impl Iterator<Item = &ComplianceIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Critical)
    }
}

struct Checks {
    passed: u32,
    applicable: u32,
    issues: Vec<ComplianceIssue>,
}

impl Checks {
    fn new() -> Self {
        Self {
            passed: 0,
            applicable: 0,
            issues: Vec::new(),
        }
    }

    fn run(&mut self, ok: bool, issue: impl FnOnce() -> ComplianceIssue) {
        self.applicable += 1;
        if ok {
            self.passed += 1;
        } else {
            self.issues.push(issue());
        }
    }
}

fn critical(code: &'static str, message: impl Into<String>, reference: &'static str) -> ComplianceIssue {
    ComplianceIssue {
        code,
        severity: Severity::Critical,
        message: message.into(),
        reference,
    }
}

/// Gas limit violations of one reading. Empty when the atmosphere is safe.
pub fn reading_violations(reading: &AtmosphericReading, rules: &ProvinceRules) -> Vec<ComplianceIssue> {
    let mut checks = Checks::new();
    gas_checks(&mut checks, reading, rules);
    checks.issues
}

fn gas_checks(checks: &mut Checks, reading: &AtmosphericReading, rules: &ProvinceRules) {
    let limits = &rules.limits;
    let reference = rules.sections.atmosphere;

    checks.run(
        reading.oxygen_percent >= limits.oxygen_min_percent
            && reading.oxygen_percent <= limits.oxygen_max_percent,
        || {
            critical(
                "OXYGEN_OUT_OF_RANGE",
                format!(
                    "oxygen {:.1}% outside {:.1}-{:.1}%",
                    reading.oxygen_percent, limits.oxygen_min_percent, limits.oxygen_max_percent
                ),
                reference,
            )
        },
    );
    checks.run(reading.lel_percent <= limits.lel_max_percent, || {
        critical(
            "LEL_EXCEEDED",
            format!(
                "flammable gas at {:.1}% LEL exceeds {:.1}%",
                reading.lel_percent, limits.lel_max_percent
            ),
            reference,
        )
    });
    checks.run(reading.h2s_ppm <= limits.h2s_max_ppm, || {
        critical(
            "H2S_EXCEEDED",
            format!("H2S {:.1} ppm exceeds {:.1} ppm", reading.h2s_ppm, limits.h2s_max_ppm),
            reference,
        )
    });
    checks.run(reading.co_ppm <= limits.co_max_ppm, || {
        critical(
            "CO_EXCEEDED",
            format!("CO {:.1} ppm exceeds {:.1} ppm", reading.co_ppm, limits.co_max_ppm),
            reference,
        )
    });
}

/// Evaluate a permit against a province table at `now`.
pub fn evaluate(permit: &Permit, rules: &ProvinceRules, now: DateTime<Utc>) -> ComplianceReport {
    let sections = &rules.sections;
    let mut checks = Checks::new();

    if rules.attendant_required {
        let present = permit
            .attendant
            .as_deref()
            .is_some_and(|a| !a.trim().is_empty());
        checks.run(present, || {
            critical(
                "ATTENDANT_MISSING",
                "an attendant must be stationed outside the space",
                sections.attendant,
            )
        });
    }
    if rules.rescue_plan_required {
        checks.run(permit.rescue_plan, || {
            critical("RESCUE_PLAN_MISSING", "no rescue plan on file", sections.rescue)
        });
    }
    if rules.training_required {
        checks.run(permit.entrants_trained, || {
            critical(
                "ENTRANTS_NOT_TRAINED",
                "entrants must be trained for confined-space work",
                sections.training,
            )
        });
    }
    if rules.energy_isolation_required {
        checks.run(permit.energy_isolation_confirmed, || {
            critical(
                "ENERGY_NOT_ISOLATED",
                "energy sources must be isolated and locked out",
                sections.isolation,
            )
        });
    }
    if rules.ventilation_required {
        checks.run(permit.continuous_ventilation, || {
            critical(
                "VENTILATION_MISSING",
                "continuous mechanical ventilation is required",
                sections.ventilation,
            )
        });
    }

    checks.run(permit.valid_from <= now && now < permit.valid_until, || {
        critical(
            "OUTSIDE_VALIDITY_WINDOW",
            format!(
                "permit is valid from {} to {}",
                permit.valid_from.to_rfc3339(),
                permit.valid_until.to_rfc3339()
            ),
            sections.permit,
        )
    });
    checks.run(
        permit.valid_until - permit.valid_from <= Duration::hours(rules.max_validity_hours),
        || ComplianceIssue {
            code: "VALIDITY_TOO_LONG",
            severity: Severity::Warning,
            message: format!(
                "validity of {:.1}h exceeds the {}h maximum",
                permit.validity_hours(),
                rules.max_validity_hours
            ),
            reference: sections.permit,
        },
    );

    let latest = permit.latest_reading(now);
    checks.run(latest.is_some(), || {
        critical(
            "NO_ATMOSPHERIC_READING",
            "the atmosphere must be tested before entry",
            sections.atmosphere,
        )
    });

    if let Some(reading) = latest {
        let age = now - reading.taken_at;
        checks.run(age <= Duration::minutes(rules.retest_interval_minutes), || {
            critical(
                "READING_STALE",
                format!(
                    "latest reading is {} minutes old, retest every {} minutes",
                    age.num_minutes(),
                    rules.retest_interval_minutes
                ),
                sections.atmosphere,
            )
        });
        gas_checks(&mut checks, reading, rules);
    }

    let compliance_percent = if checks.applicable == 0 {
        100
    } else {
        (f64::from(checks.passed) * 100.0 / f64::from(checks.applicable)).round() as u8
    };
    let compliant = !checks.issues.iter().any(|i| i.severity == Severity::Critical);

    ComplianceReport {
        province: rules.province,
        regulation: rules.regulation,
        compliant,
        compliance_percent,
        checks_passed: checks.passed,
        checks_applicable: checks.applicable,
        issues: checks.issues,
        evaluated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::fixtures::permit::{compliant_permit, reading};
    use pretty_assertions::assert_eq;

    fn codes(report: &ComplianceReport) -> Vec<&'static str> {
        report.issues.iter().map(|i| i.code).collect()
    }

    #[test]
    fn test_compliant_permit_passes_every_check() {
        let now = Utc::now();
        let permit = compliant_permit(Province::QC, now);
        let report = evaluate(&permit, rules_for(Province::QC), now);

        assert!(report.compliant, "{:?}", report.issues);
        assert_eq!(report.compliance_percent, 100);
        // 5 requirements + 2 validity + presence + freshness + 4 gases
        assert_eq!(report.checks_applicable, 13);
    }

    #[test]
    fn test_ventilation_not_applicable_everywhere() {
        let now = Utc::now();
        let mut permit = compliant_permit(Province::NS, now);
        permit.continuous_ventilation = false;
        let report = evaluate(&permit, rules_for(Province::NS), now);
        assert!(report.compliant);
        assert_eq!(report.checks_applicable, 12);
    }

    #[test]
    fn test_missing_attendant_and_rescue_plan() {
        let now = Utc::now();
        let mut permit = compliant_permit(Province::ON, now);
        permit.attendant = Some("  ".into());
        permit.rescue_plan = false;

        let report = evaluate(&permit, rules_for(Province::ON), now);
        assert!(!report.compliant);
        assert_eq!(codes(&report), vec!["ATTENDANT_MISSING", "RESCUE_PLAN_MISSING"]);
        assert_eq!(report.compliance_percent, 85);
        assert_eq!(report.issues[0].reference, "O. Reg. 632/05 s. 15");
    }

    #[test]
    fn test_no_reading_skips_gas_checks() {
        let now = Utc::now();
        let mut permit = compliant_permit(Province::AB, now);
        permit.readings.clear();

        let report = evaluate(&permit, rules_for(Province::AB), now);
        assert_eq!(codes(&report), vec!["NO_ATMOSPHERIC_READING"]);
        assert_eq!(report.checks_applicable, 8);
    }

    #[test]
    fn test_stale_reading_uses_province_interval() {
        let now = Utc::now();
        let mut permit = compliant_permit(Province::QC, now);
        permit.readings = vec![reading(now - Duration::minutes(45))];

        let qc = evaluate(&permit, rules_for(Province::QC), now);
        assert_eq!(codes(&qc), vec!["READING_STALE"]);

        permit.province = Province::ON;
        let on = evaluate(&permit, rules_for(Province::ON), now);
        assert!(on.compliant);
    }

    #[test]
    fn test_future_dated_reading_cannot_mask_unsafe_atmosphere() {
        let now = Utc::now();
        let mut permit = compliant_permit(Province::QC, now);
        let mut unsafe_now = reading(now);
        unsafe_now.oxygen_percent = 15.0;
        unsafe_now.h2s_ppm = 50.0;
        permit.readings = vec![reading(now + Duration::days(365)), unsafe_now];

        let report = evaluate(&permit, rules_for(Province::QC), now);
        assert!(!report.compliant);
        let found = codes(&report);
        assert!(found.contains(&"OXYGEN_OUT_OF_RANGE"), "{found:?}");
        assert!(found.contains(&"H2S_EXCEEDED"), "{found:?}");
    }

    #[test]
    fn test_long_validity_is_only_a_warning() {
        let now = Utc::now();
        let mut permit = compliant_permit(Province::NB, now);
        permit.valid_until = now + Duration::hours(10);

        let report = evaluate(&permit, rules_for(Province::NB), now);
        assert!(report.compliant);
        assert_eq!(report.issues[0].severity, Severity::Warning);
        assert_eq!(report.issues[0].code, "VALIDITY_TOO_LONG");
    }

    #[test]
    fn test_expired_permit_is_critical() {
        let now = Utc::now();
        let permit = compliant_permit(Province::QC, now - Duration::hours(9));
        let report = evaluate(&permit, rules_for(Province::QC), now);
        assert!(codes(&report).contains(&"OUTSIDE_VALIDITY_WINDOW"));
        assert!(!report.compliant);
    }

    #[test]
    fn test_reading_violations() {
        let mut bad = reading(Utc::now());
        bad.oxygen_percent = 18.0;
        bad.co_ppm = 30.0;

        let qc = reading_violations(&bad, rules_for(Province::QC));
        assert_eq!(qc.iter().map(|i| i.code).collect::<Vec<_>>(), vec!["OXYGEN_OUT_OF_RANGE"]);

        let on = reading_violations(&bad, rules_for(Province::ON));
        assert_eq!(
            on.iter().map(|i| i.code).collect::<Vec<_>>(),
            vec!["OXYGEN_OUT_OF_RANGE", "CO_EXCEEDED"]
        );

        assert!(reading_violations(&reading(Utc::now()), rules_for(Province::ON)).is_empty());
    }
}
