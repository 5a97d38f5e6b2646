//! Source column type string -> [`TargetType`] mapping.

use super::TargetType;

/// Outcome of mapping a source type, keeping whether the input was known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMapping {
    /// Mapped target type
    pub target: TargetType,
    /// False when the input fell through to the string fallback
    pub recognized: bool,
}

/// Lowercases, trims and strips a `System.` prefix (older API generations
/// report CLR type names such as `System.DateTime`).
fn normalize(source_type: &str) -> String {
    let lowered = source_type.trim().to_ascii_lowercase();
    match lowered.strip_prefix("system.") {
        Some(rest) => rest.to_string(),
        None => lowered,
    }
}

/// Returns true for identifier types that are coerced to `string`.
pub fn is_guid_family(source_type: &str) -> bool {
    matches!(
        normalize(source_type).as_str(),
        "guid" | "uniqueidentifier" | "uuid"
    )
}

/// Maps a source type and reports whether it was recognized.
pub fn classify(source_type: &str) -> TypeMapping {
    let target = match normalize(source_type).as_str() {
        "string" | "text" | "varchar" | "nvarchar" | "char" => TargetType::String,
        "guid" | "uniqueidentifier" | "uuid" => TargetType::String,
        "int" | "int32" | "integer" | "int16" | "short" | "smallint" | "tinyint" | "byte" => {
            TargetType::Int
        }
        "long" | "int64" | "bigint" => TargetType::Long,
        "real" | "double" | "float" | "decimal" | "single" => TargetType::Real,
        "bool" | "boolean" | "bit" => TargetType::Boolean,
        "datetime" | "timestamp" | "date" | "time" | "datetimeoffset" | "datetime2" => {
            TargetType::Datetime
        }
        "dynamic" | "object" | "json" | "array" | "dictionary" => TargetType::Dynamic,
        _ => {
            return TypeMapping {
                target: TargetType::String,
                recognized: false,
            }
        }
    };
    TypeMapping {
        target,
        recognized: true,
    }
}

/// Maps a source type to its target type. Total: unknown inputs become
/// `string` and emit a diagnostic.
pub fn map_type(source_type: &str) -> TargetType {
    let mapping = classify(source_type);
    if !mapping.recognized {
        tracing::warn!(source_type, "Unknown source column type, mapping to string");
    }
    mapping.target
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_representative_table() {
        let cases = [
            ("string", TargetType::String),
            ("Int32", TargetType::Int),
            ("INTEGER", TargetType::Int),
            ("bigint", TargetType::Long),
            ("Int64", TargetType::Long),
            ("decimal", TargetType::Real),
            ("Double", TargetType::Real),
            ("bool", TargetType::Boolean),
            ("timestamp", TargetType::Datetime),
            ("System.DateTime", TargetType::Datetime),
            ("json", TargetType::Dynamic),
            ("object", TargetType::Dynamic),
        ];
        for (source, expected) in cases {
            assert_eq!(map_type(source), expected, "source type {}", source);
        }
    }

    #[test]
    fn test_guid_family_is_coerced_and_recognized() {
        for source in ["guid", "UniqueIdentifier", " uuid "] {
            let mapping = classify(source);
            assert_eq!(mapping.target, TargetType::String);
            assert!(mapping.recognized);
            assert!(is_guid_family(source));
        }
        assert!(!is_guid_family("string"));
    }

    #[test]
    fn test_unknown_falls_back_to_string() {
        let mapping = classify("geography");
        assert_eq!(mapping.target, TargetType::String);
        assert!(!mapping.recognized);
        assert_eq!(map_type(""), TargetType::String);
    }

    proptest! {
        #[test]
        fn prop_map_type_is_total(source in ".*") {
            let target = map_type(&source);
            prop_assert!(TargetType::ALL.contains(&target));
        }

        #[test]
        fn prop_case_insensitive(source in "[A-Za-z0-9]{1,12}") {
            prop_assert_eq!(
                classify(&source.to_ascii_uppercase()),
                classify(&source.to_ascii_lowercase())
            );
        }
    }
}
