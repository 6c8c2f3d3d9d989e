//! Property-based tests for datatype coercion

use proptest::prelude::*;
use serde_json::json;
use vss_broker::error::ServerError;
use vss_broker::signals::DataType;

proptest! {
    #[test]
    fn test_uint8_range_is_exact(value in i64::MIN..i64::MAX) {
        let result = DataType::UInt8.coerce(&json!(value));
        if (0..=255).contains(&value) {
            prop_assert_eq!(result.unwrap(), json!(value));
        } else {
            prop_assert!(matches!(result.unwrap_err(), ServerError::OutOfBounds { .. }), "expected OutOfBounds error");
        }
    }

    #[test]
    fn test_int16_range_is_exact(value in -100_000i64..100_000) {
        let result = DataType::Int16.coerce(&json!(value));
        if (i16::MIN as i64..=i16::MAX as i64).contains(&value) {
            prop_assert!(result.is_ok());
        } else {
            prop_assert!(matches!(result.unwrap_err(), ServerError::OutOfBounds { .. }), "expected OutOfBounds error");
        }
    }

    #[test]
    fn test_int32_accepts_its_whole_range(value in i32::MIN..i32::MAX) {
        prop_assert!(DataType::Int32.coerce(&json!(value)).is_ok());
    }

    #[test]
    fn test_finite_floats_always_accepted(value in prop::num::f64::NORMAL) {
        prop_assert!(DataType::Double.coerce(&json!(value)).is_ok());
    }

    #[test]
    fn test_strings_never_coerce_to_integers(text in "[A-Za-z]{1,12}") {
        let result = DataType::Int32.coerce(&json!(text));
        prop_assert!(matches!(result.unwrap_err(), ServerError::TypeMismatch { .. }), "expected TypeMismatch error");
    }

    #[test]
    fn test_any_string_coerces_to_string(text in ".*") {
        let coerced = DataType::String.coerce(&json!(text.clone())).unwrap();
        prop_assert_eq!(coerced, json!(text));
    }

    #[test]
    fn test_booleans_accept_only_bool_and_binary_integers(value in -10i64..10) {
        let result = DataType::Boolean.coerce(&json!(value));
        if value == 0 || value == 1 {
            prop_assert_eq!(result.unwrap(), json!(value == 1));
        } else {
            prop_assert!(result.is_err());
        }
    }
}
