use super::input_guards::{
    ValidationErrors, ValidationResult, as_number, check_number, check_text, check_text_list,
    check_url,
};
use crate::model::{NewRepository, RepositoryChanges};
use serde_json::{Map, Value};

/// Constraint applied to a single body field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Non-empty string.
    Text,
    /// Non-empty string matching the repository URL pattern.
    Url,
    /// Array whose items are all non-empty strings.
    TextList,
    /// Number, or a string holding one.
    Number,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub rule: FieldRule,
    pub required: bool,
}

impl FieldSpec {
    const fn required(name: &'static str, rule: FieldRule) -> Self {
        Self {
            name,
            rule,
            required: true,
        }
    }

    const fn optional(name: &'static str, rule: FieldRule) -> Self {
        Self {
            name,
            rule,
            required: false,
        }
    }
}

/// Declared shape of a request body. Keys outside `fields` are rejected.
#[derive(Debug, Clone, Copy)]
pub struct BodySchema {
    pub endpoint: &'static str,
    pub fields: &'static [FieldSpec],
}

pub const CREATE_REPOSITORY: BodySchema = BodySchema {
    endpoint: "create_repository",
    fields: &[
        FieldSpec::required("title", FieldRule::Text),
        FieldSpec::required("url", FieldRule::Url),
        FieldSpec::optional("techs", FieldRule::TextList),
    ],
};

pub const UPDATE_REPOSITORY: BodySchema = BodySchema {
    endpoint: "update_repository",
    fields: &[
        FieldSpec::optional("title", FieldRule::Text),
        FieldSpec::optional("url", FieldRule::Url),
        FieldSpec::optional("techs", FieldRule::TextList),
        FieldSpec::optional("likes", FieldRule::Number),
    ],
};

impl BodySchema {
    /// Checks `body` against every field rule and collects all violations.
    pub fn check(&self, body: &Value) -> ValidationResult<()> {
        let mut errors = ValidationErrors::new();
        let Some(object) = body.as_object() else {
            errors.push("value", "\"value\" must be of type object");
            return errors.into_result();
        };

        for field in self.fields {
            match object.get(field.name) {
                Some(value) => apply_rule(&mut errors, field, value),
                None if field.required => {
                    errors.push(field.name, format!("\"{}\" is required", field.name));
                }
                None => {}
            }
        }

        for key in object.keys() {
            if !self.fields.iter().any(|field| field.name == key) {
                errors.push(key.as_str(), format!("\"{key}\" is not allowed"));
            }
        }

        if !errors.is_empty() {
            tracing::debug!(
                endpoint = self.endpoint,
                violations = errors.len(),
                "request body rejected"
            );
        }
        errors.into_result()
    }
}

fn apply_rule(errors: &mut ValidationErrors, field: &FieldSpec, value: &Value) {
    match field.rule {
        FieldRule::Text => {
            check_text(errors, field.name, field.name, value);
        }
        FieldRule::Url => check_url(errors, field.name, value),
        FieldRule::TextList => check_text_list(errors, field.name, value),
        FieldRule::Number => check_number(errors, field.name, value),
    }
}

/// Validates a create body and extracts the new repository from it.
pub fn parse_create(body: &Value) -> ValidationResult<NewRepository> {
    CREATE_REPOSITORY.check(body)?;
    let object = body.as_object();
    Ok(NewRepository {
        title: text_field(object, "title").unwrap_or_default(),
        url: text_field(object, "url").unwrap_or_default(),
        techs: text_list_field(object, "techs"),
    })
}

/// Validates an update body and extracts the requested changes from it.
pub fn parse_update(body: &Value) -> ValidationResult<RepositoryChanges> {
    UPDATE_REPOSITORY.check(body)?;
    let object = body.as_object();
    Ok(RepositoryChanges {
        title: text_field(object, "title"),
        url: text_field(object, "url"),
        techs: text_list_field(object, "techs"),
        likes: object.and_then(|object| object.get("likes")).and_then(as_number),
    })
}

fn text_field(object: Option<&Map<String, Value>>, key: &str) -> Option<String> {
    object?.get(key)?.as_str().map(str::to_owned)
}

fn text_list_field(object: Option<&Map<String, Value>>, key: &str) -> Option<Vec<String>> {
    let items = object?.get(key)?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_owned))
            .collect(),
    )
}
