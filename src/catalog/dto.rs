use serde::Deserialize;

/// Barcode lookup envelope. `status` is 1 when found, 0 otherwise.
#[derive(Debug, Deserialize)]
pub struct ProductResponse {
    #[serde(default)]
    pub status: i32,
    pub product: Option<ProductPayload>,
}

/// Search envelope.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub products: Vec<ProductPayload>,
}

/// One catalog product. Nutrients are per 100 g.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPayload {
    pub code: Option<String>,
    pub product_name: Option<String>,
    pub brands: Option<String>, // comma separated, e.g. "Fage, Total"
    pub image_url: Option<String>,
    pub nutriments: Option<Nutriments>,
    pub nutriscore_grade: Option<String>,
    pub nova_group: Option<i32>,
    pub nutrient_levels: Option<NutrientLevels>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Nutriments {
    #[serde(rename = "energy-kcal_100g")]
    pub energy_kcal: Option<f64>,
    #[serde(rename = "proteins_100g")]
    pub proteins: Option<f64>,
    #[serde(rename = "carbohydrates_100g")]
    pub carbohydrates: Option<f64>,
    #[serde(rename = "fat_100g")]
    pub fat: Option<f64>,
    #[serde(rename = "saturated-fat_100g")]
    pub saturated_fat: Option<f64>,
    #[serde(rename = "sugars_100g")]
    pub sugars: Option<f64>,
    #[serde(rename = "fiber_100g")]
    pub fiber: Option<f64>,
    #[serde(rename = "salt_100g")]
    pub salt: Option<f64>, // grams
}

/// Qualitative traffic-light levels: "low", "moderate", "high".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NutrientLevels {
    pub fat: Option<String>,
    pub sugars: Option<String>,
    pub salt: Option<String>,
}
