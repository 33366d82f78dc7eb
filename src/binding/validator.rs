use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("field {field:?}: {message}")]
    Field { field: String, message: String },

    #[error("{0}")]
    Message(String),

    #[error("{0}")]
    Slice(SliceValidationError),
}

impl ValidationError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::Field {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        ValidationError::Message(message.into())
    }
}

/// Failures of a sequence, keyed by element index in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SliceValidationError {
    errors: Vec<(usize, ValidationError)>,
}

impl SliceValidationError {
    pub fn errors(&self) -> &[(usize, ValidationError)] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for SliceValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (n, (i, e)) in self.errors.iter().enumerate() {
            if n > 0 {
                f.write_str("\n")?;
            }
            write!(f, "[{}]: {}", i, e)?;
        }
        Ok(())
    }
}

impl std::error::Error for SliceValidationError {}

/// A value that can check its own invariants after being decoded.
///
/// The default implementation accepts everything.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

impl<T: Validate + ?Sized> Validate for Box<T> {
    fn validate(&self) -> Result<(), ValidationError> {
        (**self).validate()
    }
}

impl<T: Validate + ?Sized> Validate for &T {
    fn validate(&self) -> Result<(), ValidationError> {
        (**self).validate()
    }
}

impl<T: Validate> Validate for Option<T> {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Some(v) => v.validate(),
            None => Ok(()),
        }
    }
}

/// Every element is checked, failures are collected by index.
impl<T: Validate> Validate for [T] {
    fn validate(&self) -> Result<(), ValidationError> {
        let errors: Vec<_> = self
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.validate().err().map(|e| (i, e)))
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Slice(SliceValidationError { errors }))
        }
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<(), ValidationError> {
        self.as_slice().validate()
    }
}

macro_rules! always_valid {
    ($($ty:ty),+) => {
        $(impl Validate for $ty {})+
    };
}

always_valid!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    String, str, serde_json::Value
);

impl<K, V, S> Validate for HashMap<K, V, S> {}
impl<K, V> Validate for BTreeMap<K, V> {}

/// The validation capability an engine applies to bound values.
pub trait StructValidator: Send + Sync {
    fn validate_struct(&self, obj: &dyn Validate) -> Result<(), ValidationError>;
}

/// Runs each value's own [`Validate`] implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultValidator;

impl StructValidator for DefaultValidator {
    fn validate_struct(&self, obj: &dyn Validate) -> Result<(), ValidationError> {
        obj.validate()
    }
}

/// Accepts everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopValidator;

impl StructValidator for NoopValidator {
    fn validate_struct(&self, _: &dyn Validate) -> Result<(), ValidationError> {
        Ok(())
    }
}
