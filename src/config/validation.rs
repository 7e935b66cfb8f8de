//! Config validation: unknown-key detection with Levenshtein suggestions
//! and range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `NarxConfig`.
///
/// Any new field added to `NarxConfig` must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        "signal_len",
        "input_len",
        "order",
        "n_hidden_layers",
        "hidden_len_1",
        "hidden_len_2",
        "weight_init",
        "learning_rate_init",
        "momentum_init",
        "seed",
        "mse_source",
        // [rate]
        "rate",
        "rate.floor",
        "rate.ceiling",
        "rate.proportional_gain",
        "rate.bold_increase",
        "rate.bold_decrease",
        "rate.bold_tolerance",
        "rate.bold_rollback",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (k, levenshtein(unknown, k)))
        .filter(|&(_, dist)| dist <= 3)
        // tie-break on the key itself so suggestions don't depend on hash order
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.to_string())
}

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Largest feature vector accepted before construction is refused.
const MAX_FEATURE_LEN: usize = 1 << 20;

/// Range checks on a parsed config.
///
/// Returns (errors, warnings). Errors are values that would make the model
/// unusable; warnings are legal but likely to train badly.
pub fn validate_ranges(config: &super::NarxConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let feature_len = config
        .signal_len
        .checked_add(config.input_len)
        .and_then(|b| b.checked_mul(config.order));
    match feature_len {
        Some(len) if len <= MAX_FEATURE_LEN => {}
        _ => errors.push(format!(
            "(signal_len + input_len) * order exceeds {MAX_FEATURE_LEN} features"
        )),
    }

    if config.weight_init > 1.0 {
        warnings.push(ValidationWarning {
            field: "weight_init".to_string(),
            message: format!(
                "weight_init = {} is large; tanh hidden units will start saturated",
                config.weight_init
            ),
            suggestion: None,
        });
    }

    if config.learning_rate_init > 0.2 {
        warnings.push(ValidationWarning {
            field: "learning_rate_init".to_string(),
            message: format!(
                "learning_rate_init = {} is high for per-sample training",
                config.learning_rate_init
            ),
            suggestion: None,
        });
    }

    if config.rate.bold_rollback && config.rate.bold_tolerance == 0.0 {
        warnings.push(ValidationWarning {
            field: "rate.bold_tolerance".to_string(),
            message: "rate.bold_rollback with zero tolerance rejects every noisy step".to_string(),
            suggestion: None,
        });
    }

    (errors, warnings)
}
