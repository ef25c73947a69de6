//! Tool parameter schemas.
//!
//! A schema is rendered into the model prompt and used as a soft check of
//! the model's arguments before dispatch.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// The parameters of one tool, in prompt order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub params: Vec<ToolParam>,
}

impl ToolSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, param: ToolParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn param(&self, name: &str) -> Option<&ToolParam> {
        self.params.iter().find(|p| p.name == name)
    }

    /// The schema as a JSON Schema object, for providers with native
    /// function calling.
    pub fn json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.json_schema()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();
        json!({"type": "object", "properties": properties, "required": required})
    }

    /// Prompt text, one indented line per parameter.
    pub fn render(&self) -> String {
        if self.params.is_empty() {
            return "    (no parameters)".to_string();
        }
        let lines: Vec<String> = self.params.iter().map(ToolParam::render).collect();
        lines.join("\n")
    }

    /// Check `args` against every parameter and report all problems at once.
    /// Unknown keys pass through; a `null` counts as absent.
    pub fn validate(&self, args: &Map<String, Value>) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();
        for param in &self.params {
            match args.get(&param.name).filter(|v| !v.is_null()) {
                Some(value) => {
                    if let Err(problem) = param.validate(value) {
                        problems.push(problem);
                    }
                }
                None => {
                    if param.required {
                        problems.push(format!("missing required parameter `{}`", param.name));
                    }
                }
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }

    /// Name of the only required parameter when it is a string. A bare
    /// string `action_input` binds to it.
    pub fn sole_string_param(&self) -> Option<&str> {
        let required: Vec<&ToolParam> = self.params.iter().filter(|p| p.required).collect();
        match required.as_slice() {
            [only] if only.data_type == DataType::String => Some(only.name.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParam {
    pub name: String,
    pub data_type: DataType,
    pub description: String,
    pub required: bool,

    /// Shown to the model; the handler applies it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<ParamConstraints>,
}

impl ToolParam {
    pub fn required(
        name: impl Into<String>,
        data_type: DataType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type,
            description: description.into(),
            required: true,
            default: None,
            constraints: None,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        data_type: DataType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, data_type, description)
        }
    }

    /// Document a default. The parameter becomes optional.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self.required = false;
        self
    }

    pub fn with_constraints(mut self, constraints: ParamConstraints) -> Self {
        self.constraints = Some(constraints);
        self
    }

    fn json_schema(&self) -> Value {
        let mut schema = json!({
            "type": self.data_type.as_str(),
            "description": self.description,
        });
        if let Some(default) = &self.default {
            schema["default"] = default.clone();
        }
        if let Some(constraints) = &self.constraints {
            constraints.extend_schema(&mut schema);
        }
        schema
    }

    fn render(&self) -> String {
        let necessity = if self.required { "required" } else { "optional" };
        let mut line = format!(
            "    - {} ({}, {necessity}): {}",
            self.name,
            self.data_type.as_str(),
            self.description
        );
        if let Some(default) = &self.default {
            line.push_str(&format!(" Default: {default}."));
        }
        let allowed = self
            .constraints
            .as_ref()
            .and_then(|c| c.enum_values.as_deref());
        if let Some(values) = allowed {
            line.push_str(&format!(" One of: {}.", join_values(values)));
        }
        line
    }

    /// Type check, then constraints.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        if !self.data_type.accepts(value) {
            return Err(format!(
                "parameter `{}` must be {}",
                self.name,
                self.data_type.with_article()
            ));
        }
        match &self.constraints {
            Some(constraints) => constraints.check(&self.name, value),
            None => Ok(()),
        }
    }
}

fn join_values(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// JSON types a parameter may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl DataType {
    /// JSON Schema name of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    fn with_article(self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Integer => "an integer",
            Self::Number => "a number",
            Self::Boolean => "a boolean",
            Self::Array => "an array",
            Self::Object => "an object",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

/// Bounds on a parameter's value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamConstraints {
    /// Inclusive numeric bounds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    /// Inclusive length bounds for strings (in chars) and arrays.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

impl ParamConstraints {
    pub fn range(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            ..Self::default()
        }
    }

    pub fn length(min: usize, max: usize) -> Self {
        Self {
            min_length: Some(min),
            max_length: Some(max),
            ..Self::default()
        }
    }

    pub fn one_of(values: &[&str]) -> Self {
        Self {
            enum_values: Some(values.iter().copied().map(Value::from).collect()),
            ..Self::default()
        }
    }

    fn extend_schema(&self, schema: &mut Value) {
        let keywords = [
            ("minimum", self.min.map(Value::from)),
            ("maximum", self.max.map(Value::from)),
            ("minLength", self.min_length.map(Value::from)),
            ("maxLength", self.max_length.map(Value::from)),
            ("enum", self.enum_values.clone().map(Value::Array)),
        ];
        for (keyword, value) in keywords {
            if let Some(value) = value {
                schema[keyword] = value;
            }
        }
    }

    fn check(&self, name: &str, value: &Value) -> Result<(), String> {
        if let Some(n) = value.as_f64() {
            if self.min.is_some_and(|min| n < min) || self.max.is_some_and(|max| n > max) {
                return Err(format!(
                    "`{name}` must be between {} and {}, got {n}",
                    bound(self.min),
                    bound(self.max)
                ));
            }
        }

        let length = match value {
            Value::String(s) => Some(s.chars().count()),
            Value::Array(items) => Some(items.len()),
            _ => None,
        };
        if let Some(len) = length {
            let too_short = self.min_length.is_some_and(|min| len < min);
            let too_long = self.max_length.is_some_and(|max| len > max);
            if too_short || too_long {
                return Err(format!(
                    "`{name}` must have between {} and {} items or characters, got {len}",
                    bound(self.min_length),
                    bound(self.max_length)
                ));
            }
        }

        match &self.enum_values {
            Some(allowed) if !allowed.contains(value) => Err(format!(
                "`{name}` must be one of: {}",
                join_values(allowed)
            )),
            _ => Ok(()),
        }
    }
}

fn bound<T: ToString>(limit: Option<T>) -> String {
    limit.map_or_else(|| "any".to_string(), |l| l.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn search_spec() -> ToolSpec {
        ToolSpec::new()
            .with_param(ToolParam::required("query", DataType::String, "What to look for."))
            .with_param(
                ToolParam::optional("top_k", DataType::Integer, "How many passages.")
                    .with_constraints(ParamConstraints::range(1.0, 50.0)),
            )
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_json_schema() {
        let schema = search_spec().json_schema();
        assert_eq!(schema["required"], json!(["query"]));
        assert_eq!(schema["properties"]["query"]["type"], json!("string"));
        assert_eq!(schema["properties"]["top_k"]["maximum"], json!(50.0));
    }

    #[test]
    fn test_render_lists_allowed_values() {
        let spec = ToolSpec::new().with_param(
            ToolParam::required("mode", DataType::String, "Kind of analysis.")
                .with_constraints(ParamConstraints::one_of(&["findings", "full"])),
        );
        assert_eq!(
            spec.render(),
            "    - mode (string, required): Kind of analysis. One of: findings, full."
        );
        assert_eq!(ToolSpec::new().render(), "    (no parameters)");
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let problems = search_spec()
            .validate(&args(json!({"top_k": "five", "user_id": 1})))
            .unwrap_err();

        assert_eq!(
            problems,
            vec![
                "missing required parameter `query`".to_string(),
                "parameter `top_k` must be an integer".to_string(),
            ]
        );
    }

    #[test]
    fn test_validate_constraints() {
        let spec = search_spec();
        assert!(spec.validate(&args(json!({"query": "x", "top_k": 5}))).is_ok());
        assert!(spec.validate(&args(json!({"query": "x", "top_k": null}))).is_ok());

        let problems = spec
            .validate(&args(json!({"query": "x", "top_k": 500})))
            .unwrap_err();
        assert_eq!(problems, vec!["`top_k` must be between 1 and 50, got 500".to_string()]);
    }

    #[test]
    fn test_length_and_enum_constraints() {
        let ids = ToolParam::required("paper_ids", DataType::Array, "Papers.")
            .with_constraints(ParamConstraints::length(2, 5));
        assert!(ids.validate(&json!([1, 2])).is_ok());
        assert!(ids.validate(&json!([1])).is_err());

        let mode = ToolParam::required("mode", DataType::String, "Mode.")
            .with_constraints(ParamConstraints::one_of(&["a", "b"]));
        assert_eq!(
            mode.validate(&json!("c")).unwrap_err(),
            "`mode` must be one of: a, b"
        );
    }

    #[test]
    fn test_sole_string_param() {
        assert_eq!(search_spec().sole_string_param(), Some("query"));
        assert_eq!(ToolSpec::new().sole_string_param(), None);
    }
}
