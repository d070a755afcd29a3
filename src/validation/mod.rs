use std::fmt;

pub const PAYMENT_METHOD_MAX_LEN: usize = 50;
pub const SHIPPING_ADDRESS_MAX_LEN: usize = 1000;
pub const NOTES_MAX_LEN: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.chars().count() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

/// Checkout details after sanitizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutFields {
    pub payment_method: String,
    pub shipping_address: String,
    pub notes: String,
}

pub fn validate_checkout(
    payment_method: &str,
    shipping_address: &str,
    notes: Option<&str>,
) -> Result<CheckoutFields, ValidationError> {
    let payment_method = sanitize_string(payment_method);
    validate_required("payment_method", &payment_method)?;
    validate_max_len("payment_method", &payment_method, PAYMENT_METHOD_MAX_LEN)?;

    let shipping_address = sanitize_string(shipping_address);
    validate_required("shipping_address", &shipping_address)?;
    validate_max_len("shipping_address", &shipping_address, SHIPPING_ADDRESS_MAX_LEN)?;

    let notes = notes.map(sanitize_string).unwrap_or_default();
    validate_max_len("notes", &notes, NOTES_MAX_LEN)?;

    Ok(CheckoutFields {
        payment_method,
        shipping_address,
        notes,
    })
}
