//! Validation Traits
//!
//! Common validation patterns shared by route handlers.

use crate::error::{ApiError, ApiResult};
use todo_core::{Page, MAX_LIST_LIMIT};

/// Trait for validating non-empty strings.
///
/// # Example
/// ```ignore
/// use todo_api::validation::ValidateNonEmpty;
///
/// fn create_todo(content: &str) -> ApiResult<()> {
///     content.validate_non_empty("content")?;
///     // ... rest of logic
/// }
/// ```
pub trait ValidateNonEmpty {
    /// Validate that the value is non-empty.
    ///
    /// # Errors
    /// Returns `ApiError::missing_field` if the value is empty or whitespace-only.
    fn validate_non_empty(&self, field_name: &str) -> ApiResult<()>;
}

impl ValidateNonEmpty for str {
    fn validate_non_empty(&self, field_name: &str) -> ApiResult<()> {
        if self.trim().is_empty() {
            return Err(ApiError::missing_field(field_name));
        }
        Ok(())
    }
}

impl ValidateNonEmpty for String {
    fn validate_non_empty(&self, field_name: &str) -> ApiResult<()> {
        self.as_str().validate_non_empty(field_name)
    }
}

impl<T: ValidateNonEmpty> ValidateNonEmpty for Option<T> {
    fn validate_non_empty(&self, field_name: &str) -> ApiResult<()> {
        match self {
            Some(value) => value.validate_non_empty(field_name),
            None => Err(ApiError::missing_field(field_name)),
        }
    }
}

/// Trait for validating numeric ranges.
pub trait ValidateRange {
    /// Validate that the value is within an inclusive range.
    fn validate_range(&self, field_name: &str, min: Self, max: Self) -> ApiResult<()>
    where
        Self: Sized;
}

macro_rules! impl_validate_range {
    ($($t:ty),*) => {
        $(
            impl ValidateRange for $t {
                fn validate_range(&self, field_name: &str, min: Self, max: Self) -> ApiResult<()> {
                    if *self < min || *self > max {
                        return Err(ApiError::invalid_range(field_name, min, max));
                    }
                    Ok(())
                }
            }
        )*
    };
}

impl_validate_range!(i64);

/// Check a pagination window: `skip >= 0` and `0 <= limit <= 1000`.
pub fn validate_page(page: &Page) -> ApiResult<()> {
    page.skip.validate_range("skip", 0, i64::MAX)?;
    page.limit.validate_range("limit", 0, MAX_LIST_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_validate_non_empty() {
        assert!("buy milk".validate_non_empty("content").is_ok());
        assert!("".validate_non_empty("content").is_err());
        assert!(" \t".validate_non_empty("content").is_err());

        let missing: Option<String> = None;
        let err = missing.validate_non_empty("username").unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingField);
        assert!(err.message.contains("username"));
    }

    #[test]
    fn test_validate_range() {
        assert!(5i64.validate_range("limit", 0, 10).is_ok());
        assert!(0i64.validate_range("limit", 0, 10).is_ok());
        assert!(10i64.validate_range("limit", 0, 10).is_ok());
        assert_eq!(
            11i64.validate_range("limit", 0, 10).unwrap_err().code,
            ErrorCode::InvalidRange
        );
    }

    #[test]
    fn test_validate_page() {
        assert!(validate_page(&Page::default()).is_ok());
        assert!(validate_page(&Page::new(0, 0)).is_ok());
        assert!(validate_page(&Page::new(50, MAX_LIST_LIMIT)).is_ok());
        assert!(validate_page(&Page::new(-1, 10)).is_err());
        assert!(validate_page(&Page::new(0, -1)).is_err());
        assert!(validate_page(&Page::new(0, MAX_LIST_LIMIT + 1)).is_err());
    }
}
