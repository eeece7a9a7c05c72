use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::label::LabelParser;
use super::model::{non_negative, HealthLabels, NutrientQuantity, ServingUnit, Source};
use crate::catalog::{CatalogClient, ProductPayload};
use crate::errors::ResolveError;

/// Catalogs report salt in grams; sodium is kept in milligrams.
pub const SODIUM_MG_PER_SALT_G: f64 = 400.0;

const FALLBACK_QUERY_MAX_CHARS: usize = 30;
pub const LABEL_RECORD_NAME: &str = "Scanned nutrition label";
pub const LABEL_RECORD_BRAND: &str = "Custom entry";

/// OCR output: the full text plus per-block geometry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecognizedText {
    pub text: String,
    #[serde(default)]
    pub blocks: Vec<TextBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextBlock {
    pub text: String,
    pub height: u32, // bounding box height in pixels
}

impl RecognizedText {
    /// Treats every non-blank line as a block of equal height.
    pub fn from_plain_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let blocks = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| TextBlock {
                text: l.to_string(),
                height: 1,
            })
            .collect();
        Self { text, blocks }
    }

    /// The tallest block, flattened to one line and truncated. Ties keep the first block.
    pub fn most_prominent_block(&self) -> Option<String> {
        let mut best: Option<&TextBlock> = None;
        for block in &self.blocks {
            if best.map_or(true, |b| block.height > b.height) {
                best = Some(block);
            }
        }
        let flat: String = best?
            .text
            .replace('\n', " ")
            .chars()
            .take(FALLBACK_QUERY_MAX_CHARS)
            .collect();
        let flat = flat.trim();
        (!flat.is_empty()).then(|| flat.to_string())
    }
}

/// Result of resolving OCR text. None of these is an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// A calorie value was read off the label; the rest is left for the user.
    LabelEnergy(NutrientQuantity),
    /// No calories found, but the most prominent text matched a catalog product.
    CatalogMatch(NutrientQuantity),
    ManualEntryRequired,
}

/// Turns barcodes, queries and label text into food records.
#[derive(Clone)]
pub struct FoodResolver {
    catalog: Arc<dyn CatalogClient>,
    parser: LabelParser,
}

impl FoodResolver {
    pub fn new(catalog: Arc<dyn CatalogClient>, parser: LabelParser) -> Self {
        Self { catalog, parser }
    }

    #[instrument(skip(self))]
    pub async fn resolve_by_barcode(&self, code: &str) -> Result<NutrientQuantity, ResolveError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ResolveError::InvalidInput("barcode is blank".into()));
        }
        match self.catalog.lookup_by_code(code).await {
            Ok(Some(payload)) => {
                let food = food_from_payload(payload, Some(code.to_string()));
                info!(%code, name = %food.name, "barcode resolved");
                Ok(food)
            }
            Ok(None) => {
                debug!(%code, "barcode not in catalog");
                Err(ResolveError::not_found(code))
            }
            Err(e) => {
                warn!(error = %e, %code, "barcode lookup failed");
                Err(ResolveError::transport(&e))
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn resolve_by_name(&self, query: &str) -> Result<Vec<NutrientQuantity>, ResolveError> {
        if query.trim().is_empty() {
            return Err(ResolveError::InvalidInput("search query is blank".into()));
        }
        let products = match self.catalog.search_by_name(query).await {
            Ok(products) => products,
            Err(e) => {
                warn!(error = %e, %query, "name search failed");
                return Err(ResolveError::transport(&e));
            }
        };
        if products.is_empty() {
            return Err(ResolveError::not_found(query));
        }
        debug!(%query, hits = products.len(), "name search");
        Ok(products
            .into_iter()
            .map(|p| {
                let code = p.code.clone().filter(|c| !c.trim().is_empty());
                food_from_payload(p, code)
            })
            .collect())
    }

    #[instrument(skip(self, ocr), fields(chars = ocr.text.len()))]
    pub async fn resolve_from_label_text(&self, ocr: &RecognizedText) -> ResolutionOutcome {
        if let Some(kcal) = self.parser.parse(&ocr.text) {
            info!(kcal, "calories read from label");
            return ResolutionOutcome::LabelEnergy(NutrientQuantity::energy_only(
                LABEL_RECORD_NAME,
                LABEL_RECORD_BRAND,
                kcal,
            ));
        }

        let Some(query) = ocr.most_prominent_block() else {
            debug!("no usable text block, manual entry");
            return ResolutionOutcome::ManualEntryRequired;
        };
        match self.resolve_by_name(&query).await {
            Ok(mut hits) if !hits.is_empty() => {
                info!(%query, "label fallback matched catalog");
                ResolutionOutcome::CatalogMatch(hits.swap_remove(0))
            }
            Ok(_) => ResolutionOutcome::ManualEntryRequired,
            Err(e) => {
                debug!(error = %e, %query, "label fallback search missed, manual entry");
                ResolutionOutcome::ManualEntryRequired
            }
        }
    }

    pub fn parser(&self) -> &LabelParser {
        &self.parser
    }
}

/// Maps a catalog payload (per 100 g) into a record.
pub fn food_from_payload(payload: ProductPayload, id: Option<String>) -> NutrientQuantity {
    let nut = payload.nutriments.unwrap_or_default();
    let high_sugar = payload
        .nutrient_levels
        .as_ref()
        .and_then(|l| l.sugars.as_deref())
        .is_some_and(|level| level.eq_ignore_ascii_case("high"));

    NutrientQuantity {
        id,
        name: payload
            .product_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Unknown".to_string()),
        brand: payload.brands.unwrap_or_default(),
        image_url: payload.image_url,
        calories: non_negative(nut.energy_kcal.unwrap_or(0.0)).round() as i32,
        protein_g: non_negative(nut.proteins.unwrap_or(0.0)),
        carbs_g: non_negative(nut.carbohydrates.unwrap_or(0.0)),
        fat_g: non_negative(nut.fat.unwrap_or(0.0)),
        fiber_g: non_negative(nut.fiber.unwrap_or(0.0)),
        sugar_g: non_negative(nut.sugars.unwrap_or(0.0)),
        sodium_mg: non_negative(nut.salt.unwrap_or(0.0)) * SODIUM_MG_PER_SALT_G,
        saturated_fat_g: non_negative(nut.saturated_fat.unwrap_or(0.0)),
        base_serving_size: NutrientQuantity::DEFAULT_BASE_SERVING,
        base_serving_unit: ServingUnit::Gram,
        source: Source::Catalog,
        is_verified: true,
        labels: HealthLabels {
            nutri_score: payload.nutriscore_grade,
            nova_group: payload.nova_group,
            is_high_sugar: high_sugar,
        },
    }
}
