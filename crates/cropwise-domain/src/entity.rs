//! Entity records - the unit of knowledge Cropwise builds from documents
//!
//! An [`EntityRecord`] describes one crop: identifying scalars, nested
//! requirement groups, ordered attribute lists and a provenance block.
//! Records are keyed by [`normalize_key`](crate::normalize_key) of their name.

use crate::lenient::{self, ListItem};
use crate::merge::{normalize_key, Merge};
use crate::provenance::Provenance;
use serde::{Deserialize, Serialize};

/// One crop and everything extracted about it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityRecord {
    /// Display name as first seen
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,

    /// Scientific (binomial) name
    #[serde(deserialize_with = "lenient::opt_string")]
    pub scientific_name: Option<String>,

    /// Category such as cereal, legume or tuber
    #[serde(deserialize_with = "lenient::opt_string")]
    pub category: Option<String>,

    /// Soil requirements
    #[serde(deserialize_with = "lenient::group")]
    pub soil_requirements: SoilRequirements,

    /// Climate requirements
    #[serde(deserialize_with = "lenient::group")]
    pub climate_requirements: ClimateRequirements,

    /// Fertilizer and nutrient guidance
    #[serde(deserialize_with = "lenient::group")]
    pub nutrients: Nutrients,

    /// Planting calendar and method
    #[serde(deserialize_with = "lenient::group")]
    pub planting_info: PlantingInfo,

    /// Expected yields
    #[serde(deserialize_with = "lenient::group")]
    pub yield_info: YieldInfo,

    /// Farming practices specific to this crop
    #[serde(deserialize_with = "lenient::string_list")]
    pub farming_practices: Vec<String>,

    /// Pests and diseases affecting this crop
    #[serde(deserialize_with = "lenient::item_list")]
    pub pests_diseases: Vec<PestDisease>,

    /// Recommendations for growing this crop
    #[serde(deserialize_with = "lenient::string_list")]
    pub recommendations: Vec<String>,

    /// Region-specific notes
    #[serde(deserialize_with = "lenient::item_list")]
    pub regional_data: Vec<RegionalNote>,

    /// Other names the crop is known by
    #[serde(deserialize_with = "lenient::string_list")]
    pub aliases: Vec<String>,

    /// Names of cultivars or varieties of this crop
    #[serde(deserialize_with = "lenient::string_list")]
    pub variant_names: Vec<String>,

    /// Where this record came from
    #[serde(deserialize_with = "lenient::group")]
    pub provenance: Provenance,
}

impl EntityRecord {
    /// Create an empty record with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The normalized key this record is indexed under
    ///
    /// # Examples
    ///
    /// ```
    /// use cropwise_domain::EntityRecord;
    ///
    /// assert_eq!(EntityRecord::new("  Sweet Potato ").key(), "sweet potato");
    /// ```
    pub fn key(&self) -> String {
        normalize_key(&self.name)
    }
}

impl Merge for EntityRecord {
    fn merge_from(&mut self, other: &Self) {
        self.name.merge_from(&other.name);
        self.scientific_name.merge_from(&other.scientific_name);
        self.category.merge_from(&other.category);
        self.soil_requirements.merge_from(&other.soil_requirements);
        self.climate_requirements
            .merge_from(&other.climate_requirements);
        self.nutrients.merge_from(&other.nutrients);
        self.planting_info.merge_from(&other.planting_info);
        self.yield_info.merge_from(&other.yield_info);
        self.farming_practices.merge_from(&other.farming_practices);
        self.pests_diseases.merge_from(&other.pests_diseases);
        self.recommendations.merge_from(&other.recommendations);
        self.regional_data.merge_from(&other.regional_data);
        self.aliases.merge_from(&other.aliases);
        self.variant_names.merge_from(&other.variant_names);
        self.provenance.merge_from(&other.provenance);
    }
}

/// Soil requirements of a crop
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoilRequirements {
    /// Suitable soil types
    #[serde(deserialize_with = "lenient::string_list")]
    pub types: Vec<String>,

    /// Optimal pH range, e.g. "6.0-7.0"
    #[serde(deserialize_with = "lenient::opt_string")]
    pub ph_range: Option<String>,

    /// Drainage requirements
    #[serde(deserialize_with = "lenient::opt_string")]
    pub drainage: Option<String>,
}

impl SoilRequirements {
    /// True when nothing is known
    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.ph_range.is_none() && self.drainage.is_none()
    }
}

impl Merge for SoilRequirements {
    fn merge_from(&mut self, other: &Self) {
        self.types.merge_from(&other.types);
        self.ph_range.merge_from(&other.ph_range);
        self.drainage.merge_from(&other.drainage);
    }
}

/// Climate requirements of a crop
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateRequirements {
    /// Temperature range or climate zone
    #[serde(deserialize_with = "lenient::opt_string")]
    pub temperature: Option<String>,

    /// Water or rainfall needs
    #[serde(deserialize_with = "lenient::opt_string")]
    pub rainfall: Option<String>,

    /// Humidity preference
    #[serde(deserialize_with = "lenient::opt_string")]
    pub humidity: Option<String>,

    /// Other climate factors ("temperate", "semi-arid")
    #[serde(deserialize_with = "lenient::string_list")]
    pub conditions: Vec<String>,
}

impl ClimateRequirements {
    /// True when nothing is known
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.rainfall.is_none()
            && self.humidity.is_none()
            && self.conditions.is_empty()
    }
}

impl Merge for ClimateRequirements {
    fn merge_from(&mut self, other: &Self) {
        self.temperature.merge_from(&other.temperature);
        self.rainfall.merge_from(&other.rainfall);
        self.humidity.merge_from(&other.humidity);
        self.conditions.merge_from(&other.conditions);
    }
}

/// Application guidance for one nutrient
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutrientRate {
    /// Amount per hectare
    #[serde(deserialize_with = "lenient::opt_string")]
    pub rate: Option<String>,

    /// When to apply
    #[serde(deserialize_with = "lenient::opt_string")]
    pub timing: Option<String>,

    /// Special instructions
    #[serde(deserialize_with = "lenient::opt_string")]
    pub notes: Option<String>,
}

impl ListItem for NutrientRate {
    fn from_text(text: String) -> Self {
        Self {
            rate: Some(text),
            ..Self::default()
        }
    }

    fn is_blank(&self) -> bool {
        self.rate.is_none() && self.timing.is_none() && self.notes.is_none()
    }
}

impl Merge for NutrientRate {
    fn merge_from(&mut self, other: &Self) {
        self.rate.merge_from(&other.rate);
        self.timing.merge_from(&other.timing);
        self.notes.merge_from(&other.notes);
    }
}

/// A secondary nutrient or micronutrient
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtherNutrient {
    /// Nutrient name
    #[serde(deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,

    /// Amount
    #[serde(deserialize_with = "lenient::opt_string")]
    pub rate: Option<String>,

    /// Instructions
    #[serde(deserialize_with = "lenient::opt_string")]
    pub notes: Option<String>,
}

impl ListItem for OtherNutrient {
    fn from_text(text: String) -> Self {
        Self {
            name: Some(text),
            ..Self::default()
        }
    }

    fn is_blank(&self) -> bool {
        self.name.is_none() && self.rate.is_none() && self.notes.is_none()
    }
}

/// Nutrient requirements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Nutrients {
    /// Nitrogen guidance
    #[serde(deserialize_with = "lenient::opt_item")]
    pub nitrogen: Option<NutrientRate>,

    /// Phosphorus guidance
    #[serde(deserialize_with = "lenient::opt_item")]
    pub phosphorus: Option<NutrientRate>,

    /// Potassium guidance
    #[serde(deserialize_with = "lenient::opt_item")]
    pub potassium: Option<NutrientRate>,

    /// Everything else
    #[serde(deserialize_with = "lenient::item_list")]
    pub other_nutrients: Vec<OtherNutrient>,
}

impl Nutrients {
    /// True when nothing is known
    pub fn is_empty(&self) -> bool {
        self.nitrogen.is_none()
            && self.phosphorus.is_none()
            && self.potassium.is_none()
            && self.other_nutrients.is_empty()
    }
}

impl Merge for Nutrients {
    fn merge_from(&mut self, other: &Self) {
        self.nitrogen.merge_from(&other.nitrogen);
        self.phosphorus.merge_from(&other.phosphorus);
        self.potassium.merge_from(&other.potassium);
        self.other_nutrients.merge_from(&other.other_nutrients);
    }
}

/// Planting calendar and method
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantingInfo {
    /// Best planting season
    #[serde(deserialize_with = "lenient::opt_string")]
    pub season: Option<String>,

    /// Planting method
    #[serde(deserialize_with = "lenient::opt_string")]
    pub method: Option<String>,

    /// Plant spacing
    #[serde(deserialize_with = "lenient::opt_string")]
    pub spacing: Option<String>,

    /// Growing period / days to maturity
    #[serde(deserialize_with = "lenient::opt_string")]
    pub duration: Option<String>,
}

impl PlantingInfo {
    /// True when nothing is known
    pub fn is_empty(&self) -> bool {
        self.season.is_none()
            && self.method.is_none()
            && self.spacing.is_none()
            && self.duration.is_none()
    }
}

impl Merge for PlantingInfo {
    fn merge_from(&mut self, other: &Self) {
        self.season.merge_from(&other.season);
        self.method.merge_from(&other.method);
        self.spacing.merge_from(&other.spacing);
        self.duration.merge_from(&other.duration);
    }
}

/// Expected yields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YieldInfo {
    /// Typical yield
    #[serde(deserialize_with = "lenient::opt_string")]
    pub average: Option<String>,

    /// Yield range, e.g. "1-14 tonnes/ha"
    #[serde(deserialize_with = "lenient::opt_string")]
    pub range: Option<String>,

    /// Unit of measurement
    #[serde(deserialize_with = "lenient::opt_string")]
    pub unit: Option<String>,
}

impl YieldInfo {
    /// True when nothing is known
    pub fn is_empty(&self) -> bool {
        self.average.is_none() && self.range.is_none() && self.unit.is_none()
    }
}

impl Merge for YieldInfo {
    fn merge_from(&mut self, other: &Self) {
        self.average.merge_from(&other.average);
        self.range.merge_from(&other.range);
        self.unit.merge_from(&other.unit);
    }
}

/// A pest or disease
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PestDisease {
    /// Pest or disease name
    #[serde(deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,

    /// "pest", "disease" or "weed"
    #[serde(rename = "type", deserialize_with = "lenient::opt_string")]
    pub kind: Option<String>,

    /// Control method
    #[serde(deserialize_with = "lenient::opt_string")]
    pub treatment: Option<String>,
}

impl ListItem for PestDisease {
    fn from_text(text: String) -> Self {
        Self {
            name: Some(text),
            ..Self::default()
        }
    }

    fn is_blank(&self) -> bool {
        self.name.is_none() && self.kind.is_none() && self.treatment.is_none()
    }
}

/// A region-specific note
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionalNote {
    /// Region name
    #[serde(deserialize_with = "lenient::opt_string")]
    pub region: Option<String>,

    /// Region-specific information
    #[serde(deserialize_with = "lenient::opt_string")]
    pub specific_info: Option<String>,
}

impl ListItem for RegionalNote {
    fn from_text(text: String) -> Self {
        Self {
            region: Some(text),
            ..Self::default()
        }
    }

    fn is_blank(&self) -> bool {
        self.region.is_none() && self.specific_info.is_none()
    }
}
