use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{macros::format_description, Date, OffsetDateTime};
use uuid::Uuid;

use crate::food::{NutrientQuantity, ScaledNutrients};

/// When the food was eaten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub fn as_str(self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" => Ok(MealType::Snack),
            other => anyhow::bail!("unknown meal type '{other}'"),
        }
    }
}

/// Day-bucket key, "YYYY-MM-DD".
pub fn day_key(date: Date) -> String {
    date.to_string()
}

pub fn parse_day_key(key: &str) -> Option<Date> {
    Date::parse(key, format_description!("[year]-[month]-[day]")).ok()
}

/// Today's date in local time, UTC when the local offset is unknown.
pub fn today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

/// One consumption event. Values are already scaled to the portion eaten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub calories: i32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sugar_g: f64,
    pub sodium_mg: f64,
    pub saturated_fat_g: f64,
    pub meal_type: MealType,
    pub portion_grams: f64,
    pub image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub logged_at: OffsetDateTime,
    pub day: String, // day-bucket key
}

impl LedgerEntry {
    /// Snapshots a scaled record. The source record is not referenced afterwards.
    pub fn from_scaled(
        record: &NutrientQuantity,
        scaled: &ScaledNutrients,
        portion_grams: f64,
        meal_type: MealType,
        logged_at: OffsetDateTime,
        day: Date,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: record.name.clone(),
            brand: record.brand.clone(),
            calories: scaled.calories,
            protein_g: scaled.protein_g,
            carbs_g: scaled.carbs_g,
            fat_g: scaled.fat_g,
            fiber_g: scaled.fiber_g,
            sugar_g: scaled.sugar_g,
            sodium_mg: scaled.sodium_mg,
            saturated_fat_g: scaled.saturated_fat_g,
            meal_type,
            portion_grams,
            image_url: record.image_url.clone(),
            logged_at,
            day: day_key(day),
        }
    }
}

/// `food_log` row as stored.
#[derive(Debug, FromRow)]
pub struct LedgerEntryRow {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub calories: i32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sugar_g: f64,
    pub sodium_mg: f64,
    pub saturated_fat_g: f64,
    pub meal_type: String,
    pub portion_grams: f64,
    pub image_url: Option<String>,
    pub logged_at: OffsetDateTime,
    pub day_key: String,
}

impl TryFrom<LedgerEntryRow> for LedgerEntry {
    type Error = anyhow::Error;

    fn try_from(r: LedgerEntryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            name: r.name,
            brand: r.brand,
            calories: r.calories,
            protein_g: r.protein_g,
            carbs_g: r.carbs_g,
            fat_g: r.fat_g,
            fiber_g: r.fiber_g,
            sugar_g: r.sugar_g,
            sodium_mg: r.sodium_mg,
            saturated_fat_g: r.saturated_fat_g,
            meal_type: r.meal_type.parse()?,
            portion_grams: r.portion_grams,
            image_url: r.image_url,
            logged_at: r.logged_at,
            day: r.day_key,
        })
    }
}

/// Sum of every entry sharing a day key. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub day: String,
    pub entries: usize,
    pub calories: i64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sugar_g: f64,
    pub sodium_mg: f64,
    pub saturated_fat_g: f64,
}

impl DailyTotal {
    pub fn zero(day: impl Into<String>) -> Self {
        Self {
            day: day.into(),
            entries: 0,
            calories: 0,
            protein_g: 0.0,
            carbs_g: 0.0,
            fat_g: 0.0,
            fiber_g: 0.0,
            sugar_g: 0.0,
            sodium_mg: 0.0,
            saturated_fat_g: 0.0,
        }
    }

    /// Sums the entries whose key matches `day`; others are ignored.
    pub fn from_entries<'a>(day: &str, entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Self {
        entries
            .into_iter()
            .filter(|e| e.day == day)
            .fold(Self::zero(day), |mut t, e| {
                t.entries += 1;
                t.calories += i64::from(e.calories);
                t.protein_g += e.protein_g;
                t.carbs_g += e.carbs_g;
                t.fat_g += e.fat_g;
                t.fiber_g += e.fiber_g;
                t.sugar_g += e.sugar_g;
                t.sodium_mg += e.sodium_mg;
                t.saturated_fat_g += e.saturated_fat_g;
                t
            })
    }
}

#[cfg(test)]
mod repo_types_tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn day_key_round_trips_through_parse() {
        let key = day_key(date!(2024 - 02 - 07));
        assert_eq!(key, "2024-02-07");
        assert_eq!(parse_day_key(&key), Some(date!(2024 - 02 - 07)));
        assert_eq!(parse_day_key("07/02/2024"), None);
    }

    #[test]
    fn meal_type_parses_case_insensitively() {
        assert_eq!("LUNCH".parse::<MealType>().unwrap(), MealType::Lunch);
        assert_eq!(MealType::Snack.to_string(), "snack");
        assert!("brunch".parse::<MealType>().is_err());
    }

    #[test]
    fn entry_snapshots_scaled_values() {
        let mut food = NutrientQuantity::blank("Toast", "Bakery");
        food.calories = 250;
        let scaled = crate::food::scale(&food, 40.0);
        let entry = LedgerEntry::from_scaled(
            &food,
            &scaled,
            40.0,
            MealType::Breakfast,
            datetime!(2024-02-07 08:30 UTC),
            date!(2024 - 02 - 07),
        );
        assert_eq!(entry.calories, 100);
        assert_eq!(entry.day, "2024-02-07");
        assert_eq!(entry.portion_grams, 40.0);
    }

    #[test]
    fn row_with_unknown_meal_type_is_rejected() {
        let row = LedgerEntryRow {
            id: Uuid::new_v4(),
            name: "x".into(),
            brand: "".into(),
            calories: 1,
            protein_g: 0.0,
            carbs_g: 0.0,
            fat_g: 0.0,
            fiber_g: 0.0,
            sugar_g: 0.0,
            sodium_mg: 0.0,
            saturated_fat_g: 0.0,
            meal_type: "elevenses".into(),
            portion_grams: 10.0,
            image_url: None,
            logged_at: datetime!(2024-02-07 08:30 UTC),
            day_key: "2024-02-07".into(),
        };
        assert!(LedgerEntry::try_from(row).is_err());
    }
}
