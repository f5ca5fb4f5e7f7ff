//! Schema definitions
//!
//! A schema is a tree of [`FieldDef`]s. A field carrying a [`RowGroup`]
//! represents a repeatable list of row records; its sections' fields live
//! in row scope and may be row-groups themselves.

/// Definition of one field in the schema
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldDef {
    /// Field key, unique across the whole flattened schema
    pub key: String,

    /// Formula text for derived fields
    #[cfg_attr(feature = "serde", serde(default))]
    pub expression: Option<String>,

    /// Present when the field is a repeatable list of rows
    #[cfg_attr(feature = "serde", serde(default))]
    pub row_group: Option<RowGroup>,
}

/// A repeatable row-group: each row is a record of the sections' fields
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RowGroup {
    /// Field groupings within a row
    pub sections: Vec<Section>,
}

/// One group of fields within a row-group's row
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Section {
    /// Display title; carried for schema owners, no engine semantics
    #[cfg_attr(feature = "serde", serde(default))]
    pub title: Option<String>,

    /// Fields in this section
    pub fields: Vec<FieldDef>,
}

impl FieldDef {
    /// Create a plain field
    pub fn new<S: Into<String>>(key: S) -> Self {
        FieldDef {
            key: key.into(),
            expression: None,
            row_group: None,
        }
    }

    /// Create a derived field with a formula
    pub fn computed<S: Into<String>, E: Into<String>>(key: S, expression: E) -> Self {
        FieldDef {
            key: key.into(),
            expression: Some(expression.into()),
            row_group: None,
        }
    }

    /// Create a row-group field from a single section of row fields
    pub fn group<S: Into<String>, I: IntoIterator<Item = FieldDef>>(key: S, fields: I) -> Self {
        FieldDef {
            key: key.into(),
            expression: None,
            row_group: Some(RowGroup {
                sections: vec![Section {
                    title: None,
                    fields: fields.into_iter().collect(),
                }],
            }),
        }
    }

    /// Attach a formula to the field
    pub fn with_expression<E: Into<String>>(mut self, expression: E) -> Self {
        self.expression = Some(expression.into());
        self
    }
}

impl Section {
    /// Create a section
    pub fn new<I: IntoIterator<Item = FieldDef>>(title: Option<String>, fields: I) -> Self {
        Section {
            title,
            fields: fields.into_iter().collect(),
        }
    }
}
