use serde::{Deserialize, Serialize};

use super::model::{NutrientQuantity, ServingUnit};
use crate::errors::LedgerError;

/// The amount eaten in a single consumption event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortionRequest {
    pub quantity: f64,
    #[serde(default)]
    pub unit: ServingUnit,
}

impl PortionRequest {
    /// Rejects zero, negative and non-finite quantities.
    pub fn new(quantity: f64, unit: ServingUnit) -> Result<Self, LedgerError> {
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(LedgerError::InvalidInput(format!(
                "portion must be positive, got {quantity}"
            )));
        }
        Ok(Self { quantity, unit })
    }

    pub fn grams(quantity: f64) -> Result<Self, LedgerError> {
        Self::new(quantity, ServingUnit::Gram)
    }

    pub fn to_grams(&self) -> f64 {
        self.unit.to_grams(self.quantity)
    }
}

/// Nutrient values for the consumed amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaledNutrients {
    pub calories: i32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sugar_g: f64,
    pub sodium_mg: f64,
    pub saturated_fat_g: f64,
}

/// Scales a base-serving record to `portion_grams`.
///
/// Every field uses the same factor `portion_grams / base_serving_grams`.
/// When the base serving is not positive the record already describes the
/// consumed amount and its values pass through unchanged. A portion that is
/// not a positive finite number scales everything to zero.
pub fn scale(record: &NutrientQuantity, portion_grams: f64) -> ScaledNutrients {
    let base = record.base_serving_grams();
    let factor = if !portion_grams.is_finite() || portion_grams <= 0.0 {
        0.0
    } else if base > 0.0 && base.is_finite() {
        portion_grams / base
    } else {
        1.0
    };

    ScaledNutrients {
        calories: (f64::from(record.calories) * factor).round() as i32,
        protein_g: record.protein_g * factor,
        carbs_g: record.carbs_g * factor,
        fat_g: record.fat_g * factor,
        fiber_g: record.fiber_g * factor,
        sugar_g: record.sugar_g * factor,
        sodium_mg: record.sodium_mg * factor,
        saturated_fat_g: record.saturated_fat_g * factor,
    }
}

pub fn scale_portion(record: &NutrientQuantity, portion: &PortionRequest) -> ScaledNutrients {
    scale(record, portion.to_grams())
}
