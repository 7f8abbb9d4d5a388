//! Confined-space volume calculation.
//!
//! Volume drives ventilation sizing on the permit. All dimensions are metres.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Shape factor applied to the bounding box of an irregular space.
pub const IRREGULAR_SHAPE_FACTOR: f64 = 0.85;

/// Geometry of a confined space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum SpaceGeometry {
    /// Box-shaped space (vault, pit, room)
    Rectangular { length: f64, width: f64, height: f64 },
    /// Upright or horizontal cylinder (tank, silo, pipe)
    Cylindrical { diameter: f64, height: f64 },
    /// Spherical vessel
    Spherical { diameter: f64 },
    /// Irregular space, measured by its bounding box
    Irregular { length: f64, width: f64, height: f64 },
}

/// Computed volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Volume {
    /// Cubic metres, rounded to 3 decimals
    pub cubic_meters: f64,
    /// Litres, rounded to 1 decimal
    pub liters: f64,
}

/// Invalid geometry input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VolumeError {
    #[error("{0} must be a positive number")]
    NonPositive(&'static str),

    #[error("dimensions are too large to compute a volume")]
    TooLarge,
}

impl SpaceGeometry {
    /// Compute the volume, rejecting non-positive or non-finite dimensions.
    pub fn volume(&self) -> Result<Volume, VolumeError> {
        let raw = match *self {
            SpaceGeometry::Rectangular {
                length,
                width,
                height,
            } => {
                check("length", length)?;
                check("width", width)?;
                check("height", height)?;
                length * width * height
            }
            SpaceGeometry::Cylindrical { diameter, height } => {
                check("diameter", diameter)?;
                check("height", height)?;
                let radius = diameter / 2.0;
                PI * radius * radius * height
            }
            SpaceGeometry::Spherical { diameter } => {
                check("diameter", diameter)?;
                let radius = diameter / 2.0;
                4.0 / 3.0 * PI * radius.powi(3)
            }
            SpaceGeometry::Irregular {
                length,
                width,
                height,
            } => {
                check("length", length)?;
                check("width", width)?;
                check("height", height)?;
                length * width * height * IRREGULAR_SHAPE_FACTOR
            }
        };

        let volume = Volume {
            cubic_meters: round_to(raw, 3),
            liters: round_to(raw * 1000.0, 1),
        };
        if !(volume.cubic_meters.is_finite() && volume.liters.is_finite()) {
            return Err(VolumeError::TooLarge);
        }
        Ok(volume)
    }

    pub fn shape_name(&self) -> &'static str {
        match self {
            SpaceGeometry::Rectangular { .. } => "rectangular",
            SpaceGeometry::Cylindrical { .. } => "cylindrical",
            SpaceGeometry::Spherical { .. } => "spherical",
            SpaceGeometry::Irregular { .. } => "irregular",
        }
    }
}

fn check(name: &'static str, value: f64) -> Result<(), VolumeError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(VolumeError::NonPositive(name))
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
