//! Rendering entity records as grounded context

use cropwise_domain::{EntityRecord, NutrientRate};
use cropwise_store::{IndexedEntity, SearchHit};

const SEPARATOR: &str = "\n\n---\n\n";

/// Context document built from retrieved entities
#[derive(Debug, Clone, PartialEq)]
pub struct ContextDocument {
    /// Rendered text handed to the model
    pub text: String,

    /// Entity and variant names, in render order
    pub entities_used: Vec<String>,
}

/// Render `hits` into one context document
pub fn build_context(hits: &[SearchHit<'_>], list_cap: usize) -> ContextDocument {
    let mut parts = Vec::with_capacity(hits.len());
    let mut entities_used = Vec::new();

    for hit in hits {
        let entity = hit.entity;
        entities_used.push(entity.record.name.clone());
        entities_used.extend(entity.variants.iter().map(|v| v.name.clone()));
        parts.push(format!(
            "# {}\n{}",
            entity.record.name,
            entity_summary(entity, list_cap)
        ));
    }

    ContextDocument {
        text: parts.join(SEPARATOR),
        entities_used,
    }
}

/// Summary of an indexed entity including its variants
pub fn entity_summary(entity: &IndexedEntity, list_cap: usize) -> String {
    let mut out = render_summary(&entity.record, 2, list_cap);
    if !entity.variants.is_empty() {
        out.push_str(&format!("\n\n### Varieties of {}", entity.record.name));
        for variant in &entity.variants {
            out.push_str("\n\n");
            out.push_str(&render_summary(variant, 4, list_cap));
        }
    }
    out
}

/// Structured text summary of one record
///
/// `depth` is the heading level of the name; sections sit one level below.
pub fn render_summary(record: &EntityRecord, depth: usize, list_cap: usize) -> String {
    let title = "#".repeat(depth);
    let section = "#".repeat(depth + 1);
    let mut lines = vec![format!("{} {}", title, display_name(record))];

    if let Some(scientific) = &record.scientific_name {
        lines.push(format!("Scientific name: {}", scientific));
    }
    if let Some(category) = &record.category {
        lines.push(format!("Category: {}", category));
    }

    let soil = &record.soil_requirements;
    if !soil.is_empty() {
        lines.push(format!("\n{} Soil Requirements", section));
        if !soil.types.is_empty() {
            lines.push(format!("- Soil types: {}", soil.types.join(", ")));
        }
        push_field(&mut lines, "pH range", &soil.ph_range);
        push_field(&mut lines, "Drainage", &soil.drainage);
    }

    let climate = &record.climate_requirements;
    if !climate.is_empty() {
        lines.push(format!("\n{} Climate Requirements", section));
        push_field(&mut lines, "Temperature", &climate.temperature);
        push_field(&mut lines, "Rainfall", &climate.rainfall);
        push_field(&mut lines, "Humidity", &climate.humidity);
        if !climate.conditions.is_empty() {
            lines.push(format!("- Conditions: {}", climate.conditions.join(", ")));
        }
    }

    let nutrients = &record.nutrients;
    if !nutrients.is_empty() {
        lines.push(format!("\n{} Nutrient Requirements", section));
        push_nutrient(&mut lines, "Nitrogen", &nutrients.nitrogen);
        push_nutrient(&mut lines, "Phosphorus", &nutrients.phosphorus);
        push_nutrient(&mut lines, "Potassium", &nutrients.potassium);
        for other in &nutrients.other_nutrients {
            lines.push(format!(
                "- {}: {}",
                other.name.as_deref().unwrap_or("Unknown"),
                other.rate.as_deref().unwrap_or("N/A")
            ));
        }
    }

    let planting = &record.planting_info;
    if !planting.is_empty() {
        lines.push(format!("\n{} Planting Information", section));
        push_field(&mut lines, "Season", &planting.season);
        push_field(&mut lines, "Method", &planting.method);
        push_field(&mut lines, "Spacing", &planting.spacing);
        push_field(&mut lines, "Duration", &planting.duration);
    }

    let yield_info = &record.yield_info;
    if !yield_info.is_empty() {
        lines.push(format!("\n{} Yield Information", section));
        push_field(&mut lines, "Average", &yield_info.average);
        push_field(&mut lines, "Range", &yield_info.range);
        push_field(&mut lines, "Unit", &yield_info.unit);
    }

    push_list(&mut lines, &section, "Farming Practices", &record.farming_practices, list_cap);

    let pests: Vec<String> = record
        .pests_diseases
        .iter()
        .filter_map(|p| {
            let name = p.name.as_deref()?;
            let mut line = name.to_string();
            if let Some(kind) = &p.kind {
                line.push_str(&format!(" ({})", kind));
            }
            if let Some(treatment) = &p.treatment {
                line.push_str(&format!(": {}", treatment));
            }
            Some(line)
        })
        .collect();
    push_list(&mut lines, &section, "Pests and Diseases", &pests, list_cap);

    push_list(&mut lines, &section, "Recommendations", &record.recommendations, list_cap);

    lines.join("\n")
}

fn display_name(record: &EntityRecord) -> &str {
    let name = record.name.trim();
    if name.is_empty() {
        "Unknown"
    } else {
        name
    }
}

fn push_field(lines: &mut Vec<String>, label: &str, value: &Option<String>) {
    if let Some(value) = value {
        lines.push(format!("- {}: {}", label, value));
    }
}

fn push_nutrient(lines: &mut Vec<String>, label: &str, rate: &Option<NutrientRate>) {
    let Some(rate) = rate else {
        return;
    };
    let mut line = format!("- {}: {}", label, rate.rate.as_deref().unwrap_or("N/A"));
    if let Some(timing) = &rate.timing {
        line.push_str(&format!(" ({})", timing));
    }
    lines.push(line);
}

fn push_list(lines: &mut Vec<String>, section: &str, title: &str, items: &[String], cap: usize) {
    if items.is_empty() {
        return;
    }
    lines.push(format!("\n{} {}", section, title));
    for item in items.iter().take(cap) {
        lines.push(format!("- {}", item));
    }
}
