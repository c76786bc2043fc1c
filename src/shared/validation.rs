//! Validation Utilities

use validator::{Validate, ValidationErrors};

use super::error::AppError;

/// Run `validator` rules on a request value, mapping failures to `AppError::Validation`
pub fn validate<T: Validate>(value: &T) -> Result<(), AppError> {
    value.validate().map_err(validation_error)
}

/// Convert validation errors to AppError, reporting the first failing field
pub fn validation_error(errors: ValidationErrors) -> AppError {
    let mut fields: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .clone()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{}: {}", field, message)
            })
        })
        .collect();
    fields.sort();

    AppError::Validation(
        fields
            .into_iter()
            .next()
            .unwrap_or_else(|| "Validation failed".into()),
    )
}
