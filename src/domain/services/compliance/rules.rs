//! Confined-space regulation tables, one per province.

use serde::Serialize;

use crate::domain::value_objects::Province;

/// Acceptable atmosphere for entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AtmosphericLimits {
    pub oxygen_min_percent: f64,
    pub oxygen_max_percent: f64,
    /// Percent of the lower explosive limit
    pub lel_max_percent: f64,
    pub h2s_max_ppm: f64,
    pub co_max_ppm: f64,
}

/// Section references quoted in compliance issues.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SectionRefs {
    pub atmosphere: &'static str,
    pub attendant: &'static str,
    pub rescue: &'static str,
    pub training: &'static str,
    pub isolation: &'static str,
    pub ventilation: &'static str,
    pub permit: &'static str,
}

/// Rules a province applies to confined-space entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProvinceRules {
    pub province: Province,
    pub authority: &'static str,
    pub regulation: &'static str,
    pub sections: SectionRefs,
    pub penalty_min_dollars: i64,
    pub penalty_max_dollars: i64,
    pub limits: AtmosphericLimits,
    pub attendant_required: bool,
    pub rescue_plan_required: bool,
    pub training_required: bool,
    pub energy_isolation_required: bool,
    pub ventilation_required: bool,
    /// Maximum age of the latest reading
    pub retest_interval_minutes: i64,
    /// Maximum permit validity window
    pub max_validity_hours: i64,
}

const STANDARD_LIMITS: AtmosphericLimits = AtmosphericLimits {
    oxygen_min_percent: 19.5,
    oxygen_max_percent: 23.0,
    lel_max_percent: 10.0,
    h2s_max_ppm: 10.0,
    co_max_ppm: 25.0,
};

static RULES: [ProvinceRules; 10] = [
    ProvinceRules {
        province: Province::QC,
        authority: "CNESST",
        regulation: "Règlement sur la santé et la sécurité du travail (RLRQ c. S-2.1, r. 13)",
        sections: SectionRefs {
            atmosphere: "RSST art. 302",
            attendant: "RSST art. 308",
            rescue: "RSST art. 309",
            training: "RSST art. 297.1",
            isolation: "RSST art. 300",
            ventilation: "RSST art. 303",
            permit: "RSST art. 299",
        },
        penalty_min_dollars: 1_767,
        penalty_max_dollars: 353_403,
        limits: AtmosphericLimits {
            oxygen_min_percent: 19.5,
            oxygen_max_percent: 23.0,
            lel_max_percent: 10.0,
            h2s_max_ppm: 10.0,
            co_max_ppm: 35.0,
        },
        attendant_required: true,
        rescue_plan_required: true,
        training_required: true,
        energy_isolation_required: true,
        ventilation_required: true,
        retest_interval_minutes: 30,
        max_validity_hours: 8,
    },
    ProvinceRules {
        province: Province::ON,
        authority: "Ministry of Labour, Immigration, Training and Skills Development",
        regulation: "O. Reg. 632/05 Confined Spaces",
        sections: SectionRefs {
            atmosphere: "O. Reg. 632/05 s. 19",
            attendant: "O. Reg. 632/05 s. 15",
            rescue: "O. Reg. 632/05 s. 11",
            training: "O. Reg. 632/05 s. 8",
            isolation: "O. Reg. 632/05 s. 14",
            ventilation: "O. Reg. 632/05 s. 20",
            permit: "O. Reg. 632/05 s. 10",
        },
        penalty_min_dollars: 0,
        penalty_max_dollars: 1_500_000,
        limits: STANDARD_LIMITS,
        attendant_required: true,
        rescue_plan_required: true,
        training_required: true,
        energy_isolation_required: true,
        ventilation_required: true,
        retest_interval_minutes: 60,
        max_validity_hours: 12,
    },
    ProvinceRules {
        province: Province::BC,
        authority: "WorkSafeBC",
        regulation: "OHS Regulation Part 9 Confined Spaces",
        sections: SectionRefs {
            atmosphere: "OHSR 9.25",
            attendant: "OHSR 9.41",
            rescue: "OHSR 9.12",
            training: "OHSR 9.8",
            isolation: "OHSR 9.19",
            ventilation: "OHSR 9.29",
            permit: "OHSR 9.13",
        },
        penalty_min_dollars: 1_250,
        penalty_max_dollars: 757_954,
        limits: AtmosphericLimits {
            oxygen_min_percent: 19.5,
            oxygen_max_percent: 23.0,
            lel_max_percent: 20.0,
            h2s_max_ppm: 10.0,
            co_max_ppm: 25.0,
        },
        attendant_required: true,
        rescue_plan_required: true,
        training_required: true,
        energy_isolation_required: true,
        ventilation_required: true,
        retest_interval_minutes: 60,
        max_validity_hours: 12,
    },
    ProvinceRules {
        province: Province::AB,
        authority: "Alberta Occupational Health and Safety",
        regulation: "OHS Code Part 5 Confined Spaces",
        sections: SectionRefs {
            atmosphere: "OHS Code s. 53",
            attendant: "OHS Code s. 51",
            rescue: "OHS Code s. 55",
            training: "OHS Code s. 46",
            isolation: "OHS Code s. 50",
            ventilation: "OHS Code s. 53(3)",
            permit: "OHS Code s. 48",
        },
        penalty_min_dollars: 0,
        penalty_max_dollars: 500_000,
        limits: STANDARD_LIMITS,
        attendant_required: true,
        rescue_plan_required: true,
        training_required: true,
        energy_isolation_required: true,
        ventilation_required: true,
        retest_interval_minutes: 60,
        max_validity_hours: 12,
    },
    ProvinceRules {
        province: Province::SK,
        authority: "Saskatchewan Ministry of Labour Relations and Workplace Safety",
        regulation: "OHS Regulations, 2020 Part 18",
        sections: SectionRefs {
            atmosphere: "OHS Reg. 18-5",
            attendant: "OHS Reg. 18-9",
            rescue: "OHS Reg. 18-11",
            training: "OHS Reg. 18-3",
            isolation: "OHS Reg. 18-7",
            ventilation: "OHS Reg. 18-6",
            permit: "OHS Reg. 18-4",
        },
        penalty_min_dollars: 0,
        penalty_max_dollars: 1_500_000,
        limits: STANDARD_LIMITS,
        attendant_required: true,
        rescue_plan_required: true,
        training_required: true,
        energy_isolation_required: true,
        ventilation_required: false,
        retest_interval_minutes: 60,
        max_validity_hours: 12,
    },
    ProvinceRules {
        province: Province::MB,
        authority: "SAFE Work Manitoba",
        regulation: "Workplace Safety and Health Regulation Part 15",
        sections: SectionRefs {
            atmosphere: "M.R. 217/2006 s. 15.6",
            attendant: "M.R. 217/2006 s. 15.9",
            rescue: "M.R. 217/2006 s. 15.11",
            training: "M.R. 217/2006 s. 15.4",
            isolation: "M.R. 217/2006 s. 15.8",
            ventilation: "M.R. 217/2006 s. 15.7",
            permit: "M.R. 217/2006 s. 15.5",
        },
        penalty_min_dollars: 0,
        penalty_max_dollars: 250_000,
        limits: STANDARD_LIMITS,
        attendant_required: true,
        rescue_plan_required: true,
        training_required: true,
        energy_isolation_required: true,
        ventilation_required: false,
        retest_interval_minutes: 60,
        max_validity_hours: 12,
    },
    ProvinceRules {
        province: Province::NB,
        authority: "WorkSafeNB",
        regulation: "General Regulation 91-191 Part XV",
        sections: SectionRefs {
            atmosphere: "Reg. 91-191 s. 265",
            attendant: "Reg. 91-191 s. 268",
            rescue: "Reg. 91-191 s. 270",
            training: "Reg. 91-191 s. 263",
            isolation: "Reg. 91-191 s. 266",
            ventilation: "Reg. 91-191 s. 267",
            permit: "Reg. 91-191 s. 262",
        },
        penalty_min_dollars: 0,
        penalty_max_dollars: 250_000,
        limits: STANDARD_LIMITS,
        attendant_required: true,
        rescue_plan_required: true,
        training_required: true,
        energy_isolation_required: true,
        ventilation_required: false,
        retest_interval_minutes: 60,
        max_validity_hours: 8,
    },
    ProvinceRules {
        province: Province::NS,
        authority: "Nova Scotia Labour, Skills and Immigration",
        regulation: "Occupational Safety General Regulations Part 14",
        sections: SectionRefs {
            atmosphere: "N.S. Reg. 44/99 s. 108",
            attendant: "N.S. Reg. 44/99 s. 112",
            rescue: "N.S. Reg. 44/99 s. 113",
            training: "N.S. Reg. 44/99 s. 106",
            isolation: "N.S. Reg. 44/99 s. 110",
            ventilation: "N.S. Reg. 44/99 s. 109",
            permit: "N.S. Reg. 44/99 s. 107",
        },
        penalty_min_dollars: 0,
        penalty_max_dollars: 250_000,
        limits: STANDARD_LIMITS,
        attendant_required: true,
        rescue_plan_required: true,
        training_required: true,
        energy_isolation_required: true,
        ventilation_required: false,
        retest_interval_minutes: 60,
        max_validity_hours: 8,
    },
    ProvinceRules {
        province: Province::PE,
        authority: "Workers Compensation Board of PEI",
        regulation: "OHS General Regulations Part 42",
        sections: SectionRefs {
            atmosphere: "EC180/87 s. 42.5",
            attendant: "EC180/87 s. 42.9",
            rescue: "EC180/87 s. 42.11",
            training: "EC180/87 s. 42.3",
            isolation: "EC180/87 s. 42.7",
            ventilation: "EC180/87 s. 42.6",
            permit: "EC180/87 s. 42.4",
        },
        penalty_min_dollars: 0,
        penalty_max_dollars: 50_000,
        limits: STANDARD_LIMITS,
        attendant_required: true,
        rescue_plan_required: true,
        training_required: true,
        energy_isolation_required: true,
        ventilation_required: false,
        retest_interval_minutes: 60,
        max_validity_hours: 8,
    },
    ProvinceRules {
        province: Province::NL,
        authority: "WorkplaceNL / OHS Division",
        regulation: "OHS Regulations, 2012 Part X",
        sections: SectionRefs {
            atmosphere: "NLR 5/12 s. 512",
            attendant: "NLR 5/12 s. 515",
            rescue: "NLR 5/12 s. 517",
            training: "NLR 5/12 s. 510",
            isolation: "NLR 5/12 s. 513",
            ventilation: "NLR 5/12 s. 514",
            permit: "NLR 5/12 s. 511",
        },
        penalty_min_dollars: 0,
        penalty_max_dollars: 250_000,
        limits: STANDARD_LIMITS,
        attendant_required: true,
        rescue_plan_required: true,
        training_required: true,
        energy_isolation_required: true,
        ventilation_required: false,
        retest_interval_minutes: 60,
        max_validity_hours: 8,
    },
];

/// Rules of one province.
pub fn rules_for(province: Province) -> &'static ProvinceRules {
    let index = match province {
        Province::QC => 0,
        Province::ON => 1,
        Province::BC => 2,
        Province::AB => 3,
        Province::SK => 4,
        Province::MB => 5,
        Province::NB => 6,
        Province::NS => 7,
        Province::PE => 8,
        Province::NL => 9,
    };
    &RULES[index]
}

/// All tables, in declaration order.
pub fn all_rules() -> &'static [ProvinceRules] {
    &RULES
}
