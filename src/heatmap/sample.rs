use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Polymer classification of a measurement. Serialized as the short
/// industry code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MicroplasticType {
    #[serde(rename = "PE")]
    Polyethylene,
    #[serde(rename = "PP")]
    Polypropylene,
    #[serde(rename = "PS")]
    Polystyrene,
    #[serde(rename = "PVC")]
    Polyvinylchloride,
    #[serde(rename = "PET")]
    PolyethyleneTerephthalate,
    #[serde(rename = "PA")]
    Polyamide,
}

impl MicroplasticType {
    pub fn code(&self) -> &'static str {
        match self {
            MicroplasticType::Polyethylene => "PE",
            MicroplasticType::Polypropylene => "PP",
            MicroplasticType::Polystyrene => "PS",
            MicroplasticType::Polyvinylchloride => "PVC",
            MicroplasticType::PolyethyleneTerephthalate => "PET",
            MicroplasticType::Polyamide => "PA",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MicroplasticType::Polyethylene => "Polyethylene (PE)",
            MicroplasticType::Polypropylene => "Polypropylene (PP)",
            MicroplasticType::Polystyrene => "Polystyrene (PS)",
            MicroplasticType::Polyvinylchloride => "PVC",
            MicroplasticType::PolyethyleneTerephthalate => "PET",
            MicroplasticType::Polyamide => "Polyamide (PA)",
        }
    }

    pub fn all() -> &'static [MicroplasticType] {
        &[
            MicroplasticType::Polyethylene,
            MicroplasticType::Polypropylene,
            MicroplasticType::Polystyrene,
            MicroplasticType::Polyvinylchloride,
            MicroplasticType::PolyethyleneTerephthalate,
            MicroplasticType::Polyamide,
        ]
    }
}

/// One microplastic measurement tied to a geographic point. Immutable once
/// constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicroplasticSample {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Normalized pollution severity, 0-100.
    pub intensity: f64,
    pub microplastic_type: MicroplasticType,
    pub particle_count: u32,
    pub sample_date: DateTime<Utc>,
    pub location_name: String,
    pub collected_by: String,
}

impl MicroplasticSample {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        latitude: f64,
        longitude: f64,
        intensity: f64,
        microplastic_type: MicroplasticType,
        particle_count: u32,
        sample_date: DateTime<Utc>,
        location_name: impl Into<String>,
        collected_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            latitude,
            longitude,
            intensity,
            microplastic_type,
            particle_count,
            sample_date,
            location_name: location_name.into(),
            collected_by: collected_by.into(),
        }
    }
}
