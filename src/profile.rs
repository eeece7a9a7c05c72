use serde::{Deserialize, Serialize};

use crate::ledger::DailyTotal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    LightlyActive,
    ModeratelyActive,
    VeryActive,
}

impl ActivityLevel {
    pub fn factor(self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::LightlyActive => 1.375,
            ActivityLevel::ModeratelyActive => 1.55,
            ActivityLevel::VeryActive => 1.725,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    LoseWeight,
    Maintain,
    GainWeight,
}

/// Physical data used to derive a daily energy target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub gender: Gender,
    pub age: u32,
    pub height_cm: u32,
    pub weight_kg: f64,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
}

const GOAL_ADJUSTMENT_KCAL: f64 = 500.0;

impl UserProfile {
    /// Mifflin-St Jeor basal metabolic rate, kcal/day.
    pub fn bmr(&self) -> f64 {
        let base = 10.0 * self.weight_kg + 6.25 * f64::from(self.height_cm)
            - 5.0 * f64::from(self.age);
        match self.gender {
            Gender::Male => base + 5.0,
            Gender::Female => base - 161.0,
        }
    }

    /// BMR scaled by activity, then shifted by the goal. Never negative.
    pub fn daily_calorie_target(&self) -> i64 {
        let tdee = self.bmr() * self.activity_level.factor();
        let target = match self.goal {
            Goal::LoseWeight => tdee - GOAL_ADJUSTMENT_KCAL,
            Goal::Maintain => tdee,
            Goal::GainWeight => tdee + GOAL_ADJUSTMENT_KCAL,
        };
        target.max(0.0) as i64
    }
}

/// Daily macro goals in grams.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroTargets {
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

impl Default for MacroTargets {
    fn default() -> Self {
        Self {
            protein_g: 180.0,
            carbs_g: 250.0,
            fat_g: 80.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacroProgress {
    pub consumed_g: f64,
    pub target_g: f64,
    pub fraction: f64,
}

impl MacroProgress {
    fn new(consumed_g: f64, target_g: f64) -> Self {
        Self {
            consumed_g,
            target_g,
            fraction: ratio(consumed_g, target_g),
        }
    }
}

/// A day's intake against a target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyProgress {
    pub consumed: i64,
    pub target: i64,
    pub remaining: i64,
    pub fraction: f64, // 0 when the target is 0
    pub protein: MacroProgress,
    pub carbs: MacroProgress,
    pub fat: MacroProgress,
}

impl DailyProgress {
    pub fn new(total: &DailyTotal, target: i64) -> Self {
        Self::with_macros(total, target, &MacroTargets::default())
    }

    pub fn with_macros(total: &DailyTotal, target: i64, macros: &MacroTargets) -> Self {
        Self {
            consumed: total.calories,
            target,
            remaining: target - total.calories,
            fraction: ratio(total.calories as f64, target as f64),
            protein: MacroProgress::new(total.protein_g, macros.protein_g),
            carbs: MacroProgress::new(total.carbs_g, macros.carbs_g),
            fat: MacroProgress::new(total.fat_g, macros.fat_g),
        }
    }
}

fn ratio(consumed: f64, target: f64) -> f64 {
    if target > 0.0 {
        consumed / target
    } else {
        0.0
    }
}

#[cfg(test)]
mod profile_tests {
    use super::*;

    fn profile(gender: Gender, goal: Goal) -> UserProfile {
        UserProfile {
            gender,
            age: 25,
            height_cm: 175,
            weight_kg: 70.0,
            activity_level: ActivityLevel::ModeratelyActive,
            goal,
        }
    }

    #[test]
    fn mifflin_st_jeor_by_gender() {
        // 700 + 1093.75 - 125
        assert_eq!(profile(Gender::Male, Goal::Maintain).bmr(), 1673.75);
        assert_eq!(profile(Gender::Female, Goal::Maintain).bmr(), 1507.75);
    }

    #[test]
    fn goal_shifts_target() {
        // 1673.75 * 1.55 = 2594.3125
        assert_eq!(profile(Gender::Male, Goal::Maintain).daily_calorie_target(), 2594);
        assert_eq!(profile(Gender::Male, Goal::LoseWeight).daily_calorie_target(), 2094);
        assert_eq!(profile(Gender::Male, Goal::GainWeight).daily_calorie_target(), 3094);
    }

    #[test]
    fn progress_against_target() {
        let mut total = DailyTotal::zero("2024-02-12");
        total.calories = 1250;
        let p = DailyProgress::new(&total, 2500);
        assert_eq!(p.fraction, 0.5);
        assert_eq!(p.remaining, 1250);
        assert_eq!(DailyProgress::new(&total, 0).fraction, 0.0);
    }

    #[test]
    fn macro_progress_against_goals() {
        let mut total = DailyTotal::zero("2024-02-12");
        total.protein_g = 90.0;
        total.carbs_g = 300.0;
        total.fat_g = 20.0;

        let p = DailyProgress::new(&total, 2500);
        assert_eq!(p.protein.fraction, 0.5);
        assert_eq!(p.carbs.fraction, 1.2);
        assert_eq!(p.fat.fraction, 0.25);

        let none = MacroTargets {
            protein_g: 0.0,
            ..MacroTargets::default()
        };
        let p = DailyProgress::with_macros(&total, 2500, &none);
        assert_eq!(p.protein.fraction, 0.0);
        assert_eq!(p.protein.consumed_g, 90.0);
    }
}
