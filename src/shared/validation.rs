//! Validation Utilities

use validator::ValidationErrors;

use super::error::AppError;

/// First `field: message` pair out of a validator error set.
///
/// Inbound payloads are small enough that reporting one failure at a
/// time is fine; the client fixes it and retries.
pub fn first_message(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let detail = e
                    .message
                    .clone()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "invalid value".into());
                format!("{}: {}", field, detail)
            })
        })
        .next()
        .unwrap_or_else(|| "Validation failed".into())
}

/// Flatten validator errors into a single AppError
pub fn validation_error(errors: ValidationErrors) -> AppError {
    AppError::Validation(first_message(&errors))
}
