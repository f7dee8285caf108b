use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::dto::validation::validate_not_blank;

/// Fact to attach to a player, replacing any previous one.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FactRequest {
    /// Player the fact is about.
    #[validate(custom(function = "validate_not_blank"))]
    pub player_name: String,
    /// Fact text.
    #[validate(custom(function = "validate_not_blank"))]
    pub fact: String,
}
