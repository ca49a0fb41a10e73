use serde::{Deserialize, Serialize};

/// One registered farm, as listed in the sweep roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Farm {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub county: String,
    pub crop: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Agrovet product recommendation consumed from the catalog collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecommendation {
    pub summary: String,
    pub products: Vec<String>,
}
