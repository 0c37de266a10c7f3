//! Request body validation.
//!
//! Bodies arrive as raw JSON and are checked against a declared
//! [`BodySchema`] per endpoint before the store is touched. Checks never stop
//! at the first problem: a rejected body reports every violated field.
//!
//! Rules mirror the usual schema-validator defaults:
//! - the body must be an object and unknown keys are not allowed
//! - strings must be non-empty
//! - `url` must match [`URL_PATTERN`]
//! - every `techs` item must be a string
//! - `likes` may be a number or a numeric string, within the safe-integer range

pub mod input_guards;
pub mod schema;

pub use input_guards::{
    MAX_SAFE_INTEGER, URL_PATTERN, ValidationErrors, ValidationResult, is_valid_url,
};
pub use schema::{
    BodySchema, CREATE_REPOSITORY, FieldRule, FieldSpec, UPDATE_REPOSITORY, parse_create,
    parse_update,
};
