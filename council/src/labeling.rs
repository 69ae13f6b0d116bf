//! Instance labeling: unique, human-readable names for selected models.
//!
//! Duplicate selections of the same provider+model (e.g. one model tested at
//! two temperatures) must stay distinguishable downstream, so every instance
//! gets a collision-free label derived from its model name.

use std::collections::HashMap;

use crate::run::SelectedModel;

/// One model's identity as seen by the labeler.
#[derive(Debug, Clone, Copy)]
pub struct LabelInput<'a> {
    /// Adapter registry key.
    pub provider: &'a str,
    /// Vendor model identifier.
    pub model_name: &'a str,
    /// Pre-existing label; short-circuits derivation when set.
    pub explicit_label: Option<&'a str>,
}

impl<'a> LabelInput<'a> {
    pub fn from_model(model: &'a SelectedModel) -> Self {
        Self {
            provider: &model.provider,
            model_name: &model.model_name,
            explicit_label: model.params.instance_label.as_deref(),
        }
    }
}

/// Compute a unique instance label for every input, in input order.
///
/// Derivation: a model that is the only selection of its (provider,
/// model_name) pair keeps its model name; the k-th duplicate becomes
/// `"{model_name} #{k}"`, where every selection of the pair advances k,
/// explicit-labeled ones included. A global usage count over the resulting
/// strings then appends another `" #{n}"` wherever a label (derived or
/// explicit) collides with one already issued.
///
/// Idempotent: feeding the returned labels back in as explicit labels
/// reproduces them unchanged.
pub fn compute_instance_labels(inputs: &[LabelInput<'_>]) -> Vec<String> {
    let mut duplicates: HashMap<(&str, &str), usize> = HashMap::new();
    for input in inputs {
        *duplicates
            .entry((input.provider, input.model_name))
            .or_insert(0) += 1;
    }

    let mut per_model_counts: HashMap<(&str, &str), usize> = HashMap::new();
    let mut label_usage: HashMap<String, usize> = HashMap::new();
    let mut labels = Vec::with_capacity(inputs.len());

    for input in inputs {
        let key = (input.provider, input.model_name);
        let occurrence = per_model_counts.entry(key).or_insert(0);
        *occurrence += 1;
        let candidate = match input.explicit_label {
            Some(explicit) => explicit.to_string(),
            None => {
                if duplicates[&key] > 1 {
                    format!("{} #{}", input.model_name, *occurrence)
                } else {
                    input.model_name.to_string()
                }
            }
        };

        let usage = label_usage.entry(candidate.clone()).or_insert(0);
        *usage += 1;
        let label = if *usage == 1 {
            candidate
        } else {
            format!("{} #{}", candidate, usage)
        };
        labels.push(label);
    }

    labels
}

/// Label a run's selected models in place, returning the labels.
pub fn apply_instance_labels(models: &mut [SelectedModel]) -> Vec<String> {
    let inputs: Vec<LabelInput<'_>> = models.iter().map(LabelInput::from_model).collect();
    let labels = compute_instance_labels(&inputs);
    for (model, label) in models.iter_mut().zip(labels.iter()) {
        model.params.instance_label = Some(label.clone());
    }
    labels
}
