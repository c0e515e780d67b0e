/// Request payload validation
///
/// Payloads are deserialized leniently (every field optional, unknown fields
/// ignored), trimmed, checked with `validator`, and only then turned into the
/// typed values the store accepts. A handler never sees a `NewUser` or
/// `UserChanges` that has not passed these checks.
///
/// # Rules
///
/// - `username`: 1 to 64 characters
/// - `email`: valid address, at most 80 characters
/// - bio `keywords`: at most 10, each 1 to 50 characters

use crate::error::ValidationErrorDetail;
use serde::Deserialize;
use userdir_shared::models::user::{NewUser, UserChanges};
use validator::{Validate, ValidationErrors};

pub const MISSING_FIELD: &str = "Missing data for required field.";

pub const MAX_KEYWORDS: usize = 10;
pub const KEYWORD_MAX_LEN: usize = 50;

/// User fields as they arrive in a create or update body
#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct UserPayload {
    #[validate(length(min = 1, max = 64, message = "Length must be between 1 and 64."))]
    pub username: Option<String>,

    #[validate(
        email(message = "Not a valid email address."),
        length(max = 80, message = "Longer than maximum length 80.")
    )]
    pub email: Option<String>,
}

impl UserPayload {
    /// Trims surrounding whitespace from every present field
    pub fn normalized(self) -> Self {
        Self {
            username: self.username.map(|v| v.trim().to_string()),
            email: self.email.map(|v| v.trim().to_string()),
        }
    }
}

/// Validates a create body; both fields are required
pub fn validate_create(payload: UserPayload) -> Result<NewUser, Vec<ValidationErrorDetail>> {
    let payload = payload.normalized();
    let mut errors = field_errors(payload.validate());

    if payload.username.is_none() {
        errors.push(ValidationErrorDetail::new("username", MISSING_FIELD));
    }
    if payload.email.is_none() {
        errors.push(ValidationErrorDetail::new("email", MISSING_FIELD));
    }

    match (payload.username, payload.email) {
        (Some(username), Some(email)) if errors.is_empty() => Ok(NewUser { username, email }),
        _ => Err(sorted(errors)),
    }
}

/// Validates an update body; any subset of fields may be present
pub fn validate_partial(payload: UserPayload) -> Result<UserChanges, Vec<ValidationErrorDetail>> {
    let payload = payload.normalized();
    let errors = field_errors(payload.validate());

    if !errors.is_empty() {
        return Err(sorted(errors));
    }

    Ok(UserChanges {
        username: payload.username,
        email: payload.email,
    })
}

/// Optional body of the bio trigger endpoint
#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct BioRequest {
    #[validate(length(max = 10, message = "At most 10 keywords are allowed."))]
    pub keywords: Option<Vec<String>>,
}

/// Checks the keyword list of a bio request
///
/// Returns `None` when no keywords were given (absent or an empty list),
/// meaning the task defaults apply.
pub fn validate_bio_request(
    request: BioRequest,
) -> Result<Option<Vec<String>>, Vec<ValidationErrorDetail>> {
    let mut errors = field_errors(request.validate());

    let keywords: Vec<String> = request
        .keywords
        .unwrap_or_default()
        .into_iter()
        .map(|k| k.trim().to_string())
        .collect();

    if keywords
        .iter()
        .any(|k| k.is_empty() || k.chars().count() > KEYWORD_MAX_LEN)
    {
        errors.push(ValidationErrorDetail::new(
            "keywords",
            "Each keyword must be between 1 and 50 characters.",
        ));
    }

    if !errors.is_empty() {
        return Err(sorted(errors));
    }

    Ok((!keywords.is_empty()).then_some(keywords))
}

fn field_errors(result: Result<(), ValidationErrors>) -> Vec<ValidationErrorDetail> {
    let Err(e) = result else {
        return Vec::new();
    };

    e.field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| ValidationErrorDetail {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string()),
            })
        })
        .collect()
}

fn sorted(mut errors: Vec<ValidationErrorDetail>) -> Vec<ValidationErrorDetail> {
    errors.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.message.cmp(&b.message)));
    errors
}
