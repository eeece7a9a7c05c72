pub mod label;
pub mod model;
pub mod resolver;
pub mod scaler;

pub use label::{parse_label_calories, LabelParser, LabelPatterns};
pub use model::{HealthLabels, NutrientQuantity, ServingUnit, Source};
pub use resolver::{FoodResolver, RecognizedText, ResolutionOutcome, TextBlock};
pub use scaler::{scale, scale_portion, PortionRequest, ScaledNutrients};
