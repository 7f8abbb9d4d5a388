//! Canadian provinces served by the platform.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Province or territory code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Province {
    QC,
    ON,
    BC,
    AB,
    SK,
    MB,
    NB,
    NS,
    PE,
    NL,
}

/// Error for an unsupported province code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported province: {0}")]
pub struct UnknownProvince(pub String);

/// One sales-tax line applied to invoices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SalesTax {
    pub name: &'static str,
    /// Rate in thousandths of a percent (5% = 5000, 9.975% = 9975)
    pub rate_milli_percent: i64,
}

const GST: SalesTax = SalesTax {
    name: "GST",
    rate_milli_percent: 5_000,
};

impl Province {
    pub const ALL: [Province; 10] = [
        Province::QC,
        Province::ON,
        Province::BC,
        Province::AB,
        Province::SK,
        Province::MB,
        Province::NB,
        Province::NS,
        Province::PE,
        Province::NL,
    ];

    /// Parse a two-letter code, case-insensitive.
    pub fn parse(code: &str) -> Result<Self, UnknownProvince> {
        match code.trim().to_uppercase().as_str() {
            "QC" => Ok(Self::QC),
            "ON" => Ok(Self::ON),
            "BC" => Ok(Self::BC),
            "AB" => Ok(Self::AB),
            "SK" => Ok(Self::SK),
            "MB" => Ok(Self::MB),
            "NB" => Ok(Self::NB),
            "NS" => Ok(Self::NS),
            "PE" => Ok(Self::PE),
            "NL" => Ok(Self::NL),
            _ => Err(UnknownProvince(code.to_string())),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::QC => "QC",
            Self::ON => "ON",
            Self::BC => "BC",
            Self::AB => "AB",
            Self::SK => "SK",
            Self::MB => "MB",
            Self::NB => "NB",
            Self::NS => "NS",
            Self::PE => "PE",
            Self::NL => "NL",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::QC => "Québec",
            Self::ON => "Ontario",
            Self::BC => "British Columbia",
            Self::AB => "Alberta",
            Self::SK => "Saskatchewan",
            Self::MB => "Manitoba",
            Self::NB => "New Brunswick",
            Self::NS => "Nova Scotia",
            Self::PE => "Prince Edward Island",
            Self::NL => "Newfoundland and Labrador",
        }
    }

    /// Sales taxes charged on professional services billed in this province.
    pub fn sales_taxes(&self) -> Vec<SalesTax> {
        match self {
            Self::QC => vec![
                GST,
                SalesTax {
                    name: "QST",
                    rate_milli_percent: 9_975,
                },
            ],
            Self::ON => vec![SalesTax {
                name: "HST",
                rate_milli_percent: 13_000,
            }],
            Self::NB | Self::NS | Self::PE | Self::NL => vec![SalesTax {
                name: "HST",
                rate_milli_percent: 15_000,
            }],
            Self::SK => vec![
                GST,
                SalesTax {
                    name: "PST",
                    rate_milli_percent: 6_000,
                },
            ],
            Self::MB => vec![
                GST,
                SalesTax {
                    name: "RST",
                    rate_milli_percent: 7_000,
                },
            ],
            Self::BC | Self::AB => vec![GST],
        }
    }
}

impl fmt::Display for Province {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
