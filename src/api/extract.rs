/// Request extractors
use crate::error::ApiError;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// JSON extractor that runs declarative validation after deserializing
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?;

        value
            .validate()
            .map_err(|e| ApiError::Validation(format_validation_errors(&e)))?;

        Ok(ValidatedJson(value))
    }
}

fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::ValidationError;

    #[test]
    fn formats_custom_messages() {
        let mut errors = validator::ValidationErrors::new();
        let mut err = ValidationError::new("length");
        err.message = Some("Password must be at least 8 characters".into());
        errors.add("password", err);

        let formatted = format_validation_errors(&errors);
        assert_eq!(formatted, "Password must be at least 8 characters");
    }

    #[test]
    fn falls_back_to_field_name() {
        let mut errors = validator::ValidationErrors::new();
        errors.add("email", ValidationError::new("email"));

        let formatted = format_validation_errors(&errors);
        assert_eq!(formatted, "email is invalid");
    }
}
