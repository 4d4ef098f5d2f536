//! Prompt for crop-centric extraction

/// Build the extraction prompt for one chunk of text
///
/// The prompt asks for a single JSON object keyed by crop, so that every
/// soil, climate, nutrient and practice detail lands in the entry of the
/// crop it belongs to.
pub fn extraction_prompt(text: &str) -> String {
    let mut prompt = String::with_capacity(text.len() + 4096);
    prompt.push_str(EXTRACTION_INSTRUCTIONS);
    prompt.push_str("\n\nText to analyze:\n---\n");
    prompt.push_str(text);
    prompt.push_str("\n---\n\n");
    prompt.push_str(OUTPUT_SCHEMA);
    prompt.push_str("\n\n");
    prompt.push_str(EXTRACTION_RULES);
    prompt
}

const EXTRACTION_INSTRUCTIONS: &str = "You are an agricultural information extraction expert. \
Extract crop-centric data from the text below.

IMPORTANT: Organize ALL information BY CROP. Each crop should contain all of its related soil, \
climate, nutrient and practice information together, so that a question about one crop can be \
answered from that crop's entry alone.";

const OUTPUT_SCHEMA: &str = r#"Return a JSON object with this structure:
{
  "crops": [
    {
      "name": "Crop name (proper capitalization)",
      "scientific_name": "Scientific name if mentioned, otherwise null",
      "category": "cereal|vegetable|fruit|legume|oilseed|tuber|other",
      "aliases": ["other names used for this crop"],
      "variant_names": ["named varieties or cultivars of this crop"],
      "soil_requirements": {
        "types": ["suitable soil types"],
        "ph_range": "optimal pH range (e.g. '6.0-7.0')",
        "drainage": "drainage requirements"
      },
      "climate_requirements": {
        "temperature": "temperature range or climate zone",
        "rainfall": "water/rainfall needs (e.g. '450-650mm annually')",
        "humidity": "humidity preference",
        "conditions": ["other climate factors like 'temperate', 'semi-arid'"]
      },
      "nutrients": {
        "nitrogen": {"rate": "amount per hectare", "timing": "when to apply", "notes": "special instructions"},
        "phosphorus": {"rate": "amount", "timing": "when to apply", "notes": "notes"},
        "potassium": {"rate": "amount", "timing": "when to apply", "notes": "notes"},
        "other_nutrients": [{"name": "nutrient name", "rate": "amount", "notes": "instructions"}]
      },
      "planting_info": {
        "season": "best planting season",
        "method": "planting method",
        "spacing": "plant spacing",
        "duration": "growing period / days to maturity"
      },
      "farming_practices": ["practices specific to this crop"],
      "pests_diseases": [
        {"name": "pest or disease name", "type": "pest|disease", "treatment": "control method"}
      ],
      "yield_info": {
        "average": "typical yield",
        "range": "yield range (e.g. '1-14 tonnes/ha')",
        "unit": "tonnes/ha or other unit"
      },
      "regional_data": [
        {"region": "region name", "specific_info": "region-specific information for this crop"}
      ],
      "recommendations": ["recommendations for growing this crop successfully"]
    }
  ],
  "general_practices": ["practices not specific to any single crop"],
  "general_recommendations": ["general advice not specific to any crop"],
  "source_summary": "one-sentence summary of what this text covers"
}"#;

const EXTRACTION_RULES: &str = "RULES:
1. Associate every piece of information with the specific crop it relates to
2. Fertilizer rates and practices mentioned for a crop go in that crop's entry
3. Use null for missing fields and [] for empty lists
4. Only extract information explicitly stated in the text
5. Create a separate entry for each crop mentioned
6. Prefer kg/ha for nutrients and tonnes/ha for yield

Return ONLY the JSON object, with no markdown fences or commentary.";
