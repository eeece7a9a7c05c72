use serde::{Deserialize, Serialize};

/// Where a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Catalog,
    UserEntered,
}

/// Units a serving or a portion may be expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServingUnit {
    #[default]
    #[serde(alias = "g")]
    Gram,
    #[serde(alias = "kg")]
    Kilogram,
    #[serde(alias = "mg")]
    Milligram,
    #[serde(alias = "oz")]
    Ounce,
    #[serde(alias = "lb")]
    Pound,
    #[serde(alias = "ml")]
    Milliliter,
    #[serde(alias = "l")]
    Liter,
}

impl ServingUnit {
    const GRAMS_PER_OUNCE: f64 = 28.349_523_125;
    const GRAMS_PER_POUND: f64 = 453.592_37;

    /// Converts `amount` of this unit into grams. Volumes assume water density.
    pub fn to_grams(self, amount: f64) -> f64 {
        match self {
            ServingUnit::Gram | ServingUnit::Milliliter => amount,
            ServingUnit::Kilogram | ServingUnit::Liter => amount * 1000.0,
            ServingUnit::Milligram => amount / 1000.0,
            ServingUnit::Ounce => amount * Self::GRAMS_PER_OUNCE,
            ServingUnit::Pound => amount * Self::GRAMS_PER_POUND,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ServingUnit::Gram => "g",
            ServingUnit::Kilogram => "kg",
            ServingUnit::Milligram => "mg",
            ServingUnit::Ounce => "oz",
            ServingUnit::Pound => "lb",
            ServingUnit::Milliliter => "ml",
            ServingUnit::Liter => "l",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "g" | "gram" | "grams" => Some(ServingUnit::Gram),
            "kg" | "kilogram" | "kilograms" => Some(ServingUnit::Kilogram),
            "mg" | "milligram" | "milligrams" => Some(ServingUnit::Milligram),
            "oz" | "ounce" | "ounces" => Some(ServingUnit::Ounce),
            "lb" | "lbs" | "pound" | "pounds" => Some(ServingUnit::Pound),
            "ml" | "milliliter" | "milliliters" => Some(ServingUnit::Milliliter),
            "l" | "liter" | "liters" => Some(ServingUnit::Liter),
            _ => None,
        }
    }
}

/// Descriptive labels. Never used by the scaling math.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthLabels {
    pub nutri_score: Option<String>, // "a" ..= "e"
    pub nova_group: Option<i32>,     // 1..=4 processing level
    pub is_high_sugar: bool,
}

/// A food record with every nutrient expressed per base serving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientQuantity {
    pub id: Option<String>, // barcode or catalog code
    pub name: String,
    pub brand: String,
    pub image_url: Option<String>,

    pub calories: i32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,

    pub fiber_g: f64,
    pub sugar_g: f64,
    pub sodium_mg: f64,
    pub saturated_fat_g: f64,

    pub base_serving_size: f64,
    pub base_serving_unit: ServingUnit,

    pub source: Source,
    pub is_verified: bool,
    #[serde(default)]
    pub labels: HealthLabels,
}

impl NutrientQuantity {
    pub const DEFAULT_BASE_SERVING: f64 = 100.0;

    /// An empty user-entered record on the default 100 g base serving.
    pub fn blank(name: impl Into<String>, brand: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            brand: brand.into(),
            image_url: None,
            calories: 0,
            protein_g: 0.0,
            carbs_g: 0.0,
            fat_g: 0.0,
            fiber_g: 0.0,
            sugar_g: 0.0,
            sodium_mg: 0.0,
            saturated_fat_g: 0.0,
            base_serving_size: Self::DEFAULT_BASE_SERVING,
            base_serving_unit: ServingUnit::Gram,
            source: Source::UserEntered,
            is_verified: false,
            labels: HealthLabels::default(),
        }
    }

    /// A user-editable record that only knows its energy.
    pub fn energy_only(name: impl Into<String>, brand: impl Into<String>, calories: i32) -> Self {
        Self {
            calories: calories.max(0),
            ..Self::blank(name, brand)
        }
    }

    /// Reference size in grams the nutrient fields are defined against.
    pub fn base_serving_grams(&self) -> f64 {
        self.base_serving_unit.to_grams(self.base_serving_size)
    }

    /// Clamps every nutrient field to be finite and non-negative.
    pub fn sanitized(mut self) -> Self {
        self.calories = self.calories.max(0);
        for v in [
            &mut self.protein_g,
            &mut self.carbs_g,
            &mut self.fat_g,
            &mut self.fiber_g,
            &mut self.sugar_g,
            &mut self.sodium_mg,
            &mut self.saturated_fat_g,
        ] {
            *v = non_negative(*v);
        }
        self
    }
}

pub(crate) fn non_negative(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}
