use serde_json::Value;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 2.0;

/// Model that only accepts its default sampling temperature.
pub const LOCKED_TEMPERATURE_MODEL: &str = "gpt-5";
pub const LOCKED_TEMPERATURE: f64 = 1.0;

/// Models offered by the conversation client.
pub const AVAILABLE_MODELS: [&str; 5] = ["gpt-4o-mini", "gpt-4o", "gpt-4.1-mini", "gpt-4.1", "gpt-5"];

/// Defaults, clamping and the model-specific temperature override.
///
/// Every entry point (both relays and the conversation client) goes through
/// these functions so the temperature shown to the user is the one applied
/// upstream.
pub struct ParameterPolicy;

impl ParameterPolicy {
    /// A non-blank string is used verbatim; anything else is the default model.
    pub fn normalize_model(value: Option<&Value>) -> String {
        match value.and_then(Value::as_str) {
            Some(model) if !model.trim().is_empty() => model.to_string(),
            _ => DEFAULT_MODEL.to_string(),
        }
    }

    /// Numbers and numeric strings are accepted; everything else is the default.
    pub fn parse_temperature(value: Option<&Value>) -> f64 {
        let parsed = match value {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        Self::clamp_temperature(parsed.unwrap_or(DEFAULT_TEMPERATURE))
    }

    pub fn clamp_temperature(temperature: f64) -> f64 {
        if !temperature.is_finite() {
            return DEFAULT_TEMPERATURE;
        }
        if temperature <= MIN_TEMPERATURE {
            // also folds -0.0 into 0.0
            return MIN_TEMPERATURE;
        }
        temperature.min(MAX_TEMPERATURE)
    }

    pub fn locks_temperature(model: &str) -> bool {
        model == LOCKED_TEMPERATURE_MODEL
    }

    /// Clamp, then apply the model override.
    pub fn apply(model: &str, temperature: f64) -> f64 {
        if Self::locks_temperature(model) {
            LOCKED_TEMPERATURE
        } else {
            Self::clamp_temperature(temperature)
        }
    }

    /// Resolve raw `model` / `temperature` request fields.
    pub fn resolve(model: Option<&Value>, temperature: Option<&Value>) -> (String, f64) {
        let model = Self::normalize_model(model);
        let temperature = Self::apply(&model, Self::parse_temperature(temperature));
        (model, temperature)
    }
}
