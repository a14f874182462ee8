use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

/// Key under which errors that belong to no single field are reported
pub const NON_FIELD: &str = "__all__";

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// Field name -> messages, serialized as a plain JSON object.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn non_field(message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(NON_FIELD, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Hands back `clean` only when nothing was recorded.
    pub fn finish<T>(self, clean: T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(clean) } else { Err(self) }
    }

    pub fn required_id(&mut self, field: &str, value: Option<i64>) -> i64 {
        match value {
            Some(id) if id > 0 => id,
            Some(_) => {
                self.add(field, INVALID_CHOICE);
                0
            }
            None => {
                self.add(field, REQUIRED);
                0
            }
        }
    }

    /// Runs the derived field rules of `form`.
    pub fn of<V: Validate>(form: &V) -> Self {
        form.validate().err().map(Self::from).unwrap_or_default()
    }

    // Nested forms are flattened into the same body, so their fields keep
    // their own names.
    fn collect(&mut self, errors: &ValidationErrors) {
        for (field, kind) in errors.errors() {
            match kind {
                ValidationErrorsKind::Field(list) => {
                    for error in list {
                        self.add(field, message_for(error));
                    }
                }
                ValidationErrorsKind::Struct(inner) => self.collect(inner),
                ValidationErrorsKind::List(items) => {
                    for inner in items.values() {
                        self.collect(inner);
                    }
                }
            }
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        out.collect(&errors);
        out
    }
}

fn message_for(error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    let param = |key: &str| error.params.get(key);
    match &*error.code {
        "required" => REQUIRED.to_string(),
        "email" => "Enter a valid email address.".to_string(),
        "length" => {
            let max = param("max").map(Value::to_string).unwrap_or_default();
            match param("value").and_then(Value::as_str) {
                Some(value) => format!(
                    "Ensure this value has at most {max} characters (it has {}).",
                    value.chars().count()
                ),
                None => format!("Ensure this value has at most {max} characters."),
            }
        }
        "range" => {
            let value = param("value").and_then(Value::as_f64);
            let below = |min: &Value| value.zip(min.as_f64()).is_some_and(|(v, m)| v < m);
            match (param("min"), param("max")) {
                (Some(min), _) if below(min) => {
                    format!("Ensure this value is greater than or equal to {min}.")
                }
                (_, Some(max)) => format!("Ensure this value is less than or equal to {max}."),
                (Some(min), None) => format!("Ensure this value is greater than or equal to {min}."),
                (None, None) => "Enter a valid value.".to_string(),
            }
        }
        _ => "Enter a valid value.".to_string(),
    }
}

/// A request body that validates into a clean value ready to persist.
///
/// Per-field rules come from `#[validate(...)]`; `clean` records what the
/// derive cannot express (choices, cross-field checks) and builds the value.
pub trait Form: DeserializeOwned + Validate {
    type Clean;

    fn clean(self, errors: &mut FieldErrors) -> Self::Clean;
}

/// Decodes `payload` as `F`, validates and cleans it. Type mismatches are
/// reported as non-field errors.
pub fn parse_form<F: Form>(payload: &Value) -> Result<F::Clean, FieldErrors> {
    let form: F = serde_json::from_value(payload.clone())
        .map_err(|e| FieldErrors::non_field(e.to_string()))?;
    let mut errors = FieldErrors::of(&form);
    let clean = form.clean(&mut errors);
    errors.finish(clean)
}

/// Trims text input; blank or missing becomes `None`.
pub fn trimmed<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Accepts `12`, `"12"`, `""` and `null` for an optional integer field, since
/// form posts send everything as strings.
pub fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Int(v)) => Ok(Some(v)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("Enter a whole number (got {s:?})."))),
    }
}

/// Same leniency as [`lenient_int`] for lists of ids.
pub fn lenient_ids<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapped(#[serde(deserialize_with = "lenient_int")] Option<i64>);

    let raw = Option::<Vec<Wrapped>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|Wrapped(v)| v)
        .collect())
}
