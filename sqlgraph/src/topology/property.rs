// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Property columns and the property type enumeration

use super::types::{LabelRef, POSTFIX_MARKER};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type tag of a property column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
    // Scalars
    Boolean,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    String,
    Uuid,

    // Temporal types
    LocalDate,
    LocalDateTime,
    LocalTime,
    ZonedDateTime,
    Period,
    Duration,

    // Documents
    Json,

    // Geometry
    Point,
    LineString,
    Polygon,
    GeographyPoint,
    GeographyPolygon,

    // Arrays
    BooleanArray,
    ByteArray,
    ShortArray,
    IntegerArray,
    LongArray,
    FloatArray,
    DoubleArray,
    StringArray,
    LocalDateArray,
    LocalDateTimeArray,
    LocalTimeArray,
}

impl PropertyType {
    /// Extra physical column postfixes; the first column always has none
    pub fn postfixes(&self) -> &'static [&'static str] {
        match self {
            PropertyType::ZonedDateTime => &["zoneId"],
            PropertyType::Period => &["months", "days"],
            PropertyType::Duration => &["nanos"],
            _ => &[],
        }
    }

    /// Physical column names backing a property of this type
    pub fn column_names(&self, property: &str) -> Vec<String> {
        let mut names = Vec::with_capacity(1 + self.postfixes().len());
        names.push(property.to_string());
        for postfix in self.postfixes() {
            names.push(format!("{}{}{}", property, POSTFIX_MARKER, postfix));
        }
        names
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            PropertyType::BooleanArray
                | PropertyType::ByteArray
                | PropertyType::ShortArray
                | PropertyType::IntegerArray
                | PropertyType::LongArray
                | PropertyType::FloatArray
                | PropertyType::DoubleArray
                | PropertyType::StringArray
                | PropertyType::LocalDateArray
                | PropertyType::LocalDateTimeArray
                | PropertyType::LocalTimeArray
        )
    }

    pub fn is_geometry(&self) -> bool {
        matches!(
            self,
            PropertyType::Point
                | PropertyType::LineString
                | PropertyType::Polygon
                | PropertyType::GeographyPoint
                | PropertyType::GeographyPolygon
        )
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Wire name, e.g. LOCAL_DATE_TIME
        match serde_json::to_value(self) {
            Ok(serde_json::Value::String(name)) => write!(f, "{}", name),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// A named, typed attribute of one label
///
/// Identity is `(owner, name)`. Columns are never edited in place; a
/// different type means a different column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyColumn {
    owner: LabelRef,
    name: String,
    property_type: PropertyType,
}

impl PropertyColumn {
    pub(crate) fn new(owner: LabelRef, name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            owner,
            name: name.into(),
            property_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn property_type(&self) -> PropertyType {
        self.property_type
    }

    /// Label owning this column
    pub fn owner(&self) -> &LabelRef {
        &self.owner
    }

    /// Physical column names, one per postfix
    pub fn column_names(&self) -> Vec<String> {
        self.property_type.column_names(&self.name)
    }
}

impl fmt::Display for PropertyColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} ({})", self.owner, self.name, self.property_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_column_types() {
        assert_eq!(PropertyType::String.column_names("name"), vec!["name"]);
        assert!(PropertyType::LongArray.is_array());
        assert!(!PropertyType::Long.is_array());
        assert!(PropertyType::GeographyPoint.is_geometry());
    }

    #[test]
    fn test_multi_column_types() {
        assert_eq!(
            PropertyType::ZonedDateTime.column_names("born"),
            vec!["born", "born~~~zoneId"]
        );
        assert_eq!(
            PropertyType::Period.column_names("p"),
            vec!["p", "p~~~months", "p~~~days"]
        );
        assert_eq!(PropertyType::Duration.column_names("d").len(), 2);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(PropertyType::String.to_string(), "STRING");
        assert_eq!(PropertyType::LocalDateTime.to_string(), "LOCAL_DATE_TIME");
        let parsed: PropertyType = serde_json::from_str("\"STRING_ARRAY\"").unwrap();
        assert_eq!(parsed, PropertyType::StringArray);
    }

    #[test]
    fn test_property_column_identity() {
        let owner = LabelRef::vertex("public", "Person");
        let a = PropertyColumn::new(owner.clone(), "name", PropertyType::String);
        let b = PropertyColumn::new(owner, "name", PropertyType::String);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "public.V_Person.name (STRING)");
    }
}
