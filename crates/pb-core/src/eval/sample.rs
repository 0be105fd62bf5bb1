use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use serde_json::Value;

use crate::eval::{
    condition_category, DatasetError, DatasetName, EvalError, PairLabel, SampleUid, SplitName,
    TemplateError, TemplateSet, TemplateVersion, Variant,
};

// ---------------------------------------------------------------------------
// ImageRow — one record from the image dataset
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct ImageRow {
    row_idx: usize,
    fields: serde_json::Map<String, Value>,
}

impl ImageRow {
    pub fn new(row_idx: usize, fields: serde_json::Map<String, Value>) -> Self {
        Self { row_idx, fields }
    }

    pub fn row_idx(&self) -> usize {
        self.row_idx
    }

    pub fn string_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Resolves an image reference: either a bare URL string or an object
    /// carrying a `src` field, as the dataset rows API returns image cells.
    pub fn image_ref(&self, key: &str) -> Result<String, DatasetError> {
        let missing = || DatasetError::MissingImageField {
            row: self.row_idx,
            key: key.to_owned(),
        };

        match self.fields.get(key) {
            Some(Value::String(url)) => Ok(url.clone()),
            Some(Value::Object(cell)) => cell
                .get("src")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(missing),
            _ => Err(missing()),
        }
    }
}

// ---------------------------------------------------------------------------
// Sample — one unit of evaluation work
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, serde::Serialize)]
pub struct Sample {
    pub dataset: DatasetName,
    pub split: SplitName,
    pub uid: SampleUid,
    pub row: usize,
    pub pair: PairLabel,
    pub image1: String,
    pub image2: String,
    pub var: Variant,
    pub instruction: String,
    pub template_version: TemplateVersion,
}

// ---------------------------------------------------------------------------
// Sample builder
// ---------------------------------------------------------------------------

/// Cross-products image rows with the declared pairs, drawing a condition
/// variant and a query template per candidate, then shuffles and truncates
/// to `target_count`. Fewer candidates than the target yields a short list.
pub fn build_samples<R>(
    templates: &TemplateSet,
    rows: &[ImageRow],
    dataset: &DatasetName,
    split: &SplitName,
    target_count: usize,
    rng: &mut R,
) -> Result<Vec<Sample>, EvalError>
where
    R: Rng,
{
    let category = condition_category(split)?;
    let names = templates.template_names();
    let pairs = templates.data_pairs();

    let mut candidates = Vec::with_capacity(rows.len() * pairs.len());
    for row in rows {
        for (pair_idx, (key1, key2)) in pairs.iter().enumerate() {
            let var = if rng.random_bool(0.5) {
                Variant::Variant
            } else {
                Variant::Invariant
            };
            let name = *names.choose(rng).ok_or(TemplateError::NoTemplates)?;

            let phrase = templates.resolve_phrase(category, var)?;
            let instruction = templates.render_instruction(name, phrase)?;

            candidates.push(Sample {
                dataset: dataset.clone(),
                split: split.clone(),
                uid: SampleUid::new(format!("{}_{}", row.row_idx(), pair_idx)),
                row: row.row_idx(),
                pair: PairLabel::new(format!("[{key1}, {key2}]")),
                image1: row.image_ref(key1)?,
                image2: row.image_ref(key2)?,
                var,
                instruction,
                template_version: TemplateVersion::new(name),
            });
        }
    }

    candidates.shuffle(rng);
    candidates.truncate(target_count);
    Ok(candidates)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
