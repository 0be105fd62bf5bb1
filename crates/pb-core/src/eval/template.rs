use std::collections::BTreeMap;

use serde::Deserialize;

use crate::eval::{SplitName, TemplateError, Variant};

// ---------------------------------------------------------------------------
// ConditionPhrases — human-readable phrases for one condition category
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Deserialize)]
pub struct ConditionPhrases {
    pub variant: String,
    pub invariant: String,
}

impl ConditionPhrases {
    pub fn phrase(&self, var: Variant) -> &str {
        match var {
            Variant::Variant => &self.variant,
            Variant::Invariant => &self.invariant,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LogisticsSpec {
    #[serde(rename = "data-pairs")]
    data_pairs: Vec<(String, String)>,
}

// ---------------------------------------------------------------------------
// TemplateSet — instruction templates, condition phrases, declared pairs
// ---------------------------------------------------------------------------

/// Immutable template record loaded once per process from the dataset
/// service. The three parts arrive as JSON-encoded strings inside a single
/// dataset row.
#[derive(Clone, Debug)]
pub struct TemplateSet {
    query_templates: BTreeMap<String, String>,
    query_conditions: BTreeMap<String, ConditionPhrases>,
    data_pairs: Vec<(String, String)>,
}

impl TemplateSet {
    pub fn from_parts(
        templates_json: &str,
        conditions_json: &str,
        logistics_json: &str,
    ) -> Result<Self, TemplateError> {
        let query_templates: BTreeMap<String, String> =
            serde_json::from_str(templates_json).map_err(decode)?;
        let query_conditions: BTreeMap<String, ConditionPhrases> =
            serde_json::from_str(conditions_json).map_err(decode)?;
        let logistics: LogisticsSpec = serde_json::from_str(logistics_json).map_err(decode)?;

        if query_templates.is_empty() {
            return Err(TemplateError::NoTemplates);
        }
        if logistics.data_pairs.is_empty() {
            return Err(TemplateError::NoPairs);
        }

        Ok(Self {
            query_templates,
            query_conditions,
            data_pairs: logistics.data_pairs,
        })
    }

    pub fn template_names(&self) -> Vec<&str> {
        self.query_templates.keys().map(String::as_str).collect()
    }

    pub fn data_pairs(&self) -> &[(String, String)] {
        &self.data_pairs
    }

    pub fn resolve_phrase(&self, category: &str, var: Variant) -> Result<&str, TemplateError> {
        self.query_conditions
            .get(category)
            .map(|phrases| phrases.phrase(var))
            .ok_or_else(|| TemplateError::MissingCategory {
                category: category.to_owned(),
            })
    }

    /// Substitutes the condition phrase into the template's `{conditions}`
    /// placeholder and bolds the scoring cue.
    pub fn render_instruction(&self, name: &str, phrase: &str) -> Result<String, TemplateError> {
        let template =
            self.query_templates
                .get(name)
                .ok_or_else(|| TemplateError::MissingTemplate {
                    name: name.to_owned(),
                })?;

        let conditions = format!("\n - **{phrase}**\n\n");
        let rendered = template.replace("{conditions}", &conditions);
        Ok(rendered.replace("Score: <1-10>", "**Score: <1-10>**"))
    }
}

fn decode(err: serde_json::Error) -> TemplateError {
    TemplateError::Decode(err.to_string())
}

// ---------------------------------------------------------------------------
// Split → condition category mapping
// ---------------------------------------------------------------------------

pub fn condition_category(split: &SplitName) -> Result<&'static str, TemplateError> {
    match split.as_str() {
        "colorjitter" => Ok("color_jittering"),
        "rotate" => Ok("rotation"),
        "perspective" => Ok("perspective"),
        _ => Err(TemplateError::UnknownSplit {
            split: split.clone(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
