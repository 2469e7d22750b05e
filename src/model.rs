//! The resolved, queryable schema model consumed by the rendering stage.

use serde::Serialize;

use crate::diag::{Diagnostic, LineRange, Severity};

/// Top-level aggregate: everything a renderer needs, nothing it has to
/// re-parse. Built once per parse invocation and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SchemaModel {
    pub enums: Vec<EnumType>,
    pub tables: Vec<Table>,
    /// Derived views over the tables' foreign keys, one per resolved
    /// constraint, ordered by (table name, declaration order).
    pub relationships: Vec<Relationship>,
    pub diagnostics: Vec<Diagnostic>,
}

impl SchemaModel {
    /// Look up a table by bare name, case-insensitively.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Look up an enum type by name, case-insensitively.
    pub fn enum_type(&self, name: &str) -> Option<&EnumType> {
        self.enums.iter().find(|e| e.name.eq_ignore_ascii_case(name))
    }

    pub fn has_fatal(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Fatal)
    }

    /// Relationships originating from the given table.
    pub fn relationships_from<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a Relationship> {
        self.relationships
            .iter()
            .filter(move |r| r.from_table.eq_ignore_ascii_case(table))
    }
}

/// An enumerated type: a name and its ordered labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumType {
    pub name: String,
    pub labels: Vec<String>,
    /// Source line of the declaration (the enclosing DO statement for
    /// declarations inside guarded blocks).
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    /// Explicit schema qualifier, if the declaration carried one.
    pub schema: Option<String>,
    pub name: String,
    pub columns: Vec<Column>,
    pub constraints: Vec<Constraint>,
    pub lines: LineRange,
}

impl Table {
    /// Unqualified declarations live in `public`.
    pub fn effective_schema(&self) -> &str {
        self.schema.as_deref().unwrap_or("public")
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.effective_schema(), self.name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// The table's primary key column list, from the first PrimaryKey
    /// constraint if any.
    pub fn primary_key(&self) -> Option<&[String]> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::PrimaryKey { columns, .. } => Some(columns.as_slice()),
            _ => None,
        })
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints
            .iter()
            .filter(|c| matches!(c, Constraint::ForeignKey { .. }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    /// Raw type text as declared, including length/precision parameters and
    /// the `[]` array suffix. Never normalized.
    pub declared_type: String,
    pub nullable: bool,
    /// Default expression as opaque text; never evaluated.
    pub default: Option<String>,
    pub primary_key: bool,
}

impl Column {
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// A table constraint. Column lists preserve declaration order; for foreign
/// keys `columns` and `target_columns` are positionally paired.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    PrimaryKey {
        name: Option<String>,
        columns: Vec<String>,
    },
    ForeignKey {
        name: Option<String>,
        columns: Vec<String>,
        /// Bare referenced table name; resolved case-insensitively.
        target: String,
        /// Empty for the `REFERENCES t` shorthand until resolution fills in
        /// the target's primary key.
        target_columns: Vec<String>,
        on_delete: Option<String>,
        on_update: Option<String>,
    },
    Unique {
        name: Option<String>,
        columns: Vec<String>,
        /// Partial-index filter, retained as opaque text.
        partial_where: Option<String>,
    },
    Check {
        name: Option<String>,
        expression: String,
    },
    /// A recognized but unmodeled clause, preserved verbatim.
    Other {
        name: Option<String>,
        text: String,
    },
}

impl Constraint {
    pub fn name(&self) -> Option<&str> {
        match self {
            Constraint::PrimaryKey { name, .. }
            | Constraint::ForeignKey { name, .. }
            | Constraint::Unique { name, .. }
            | Constraint::Check { name, .. }
            | Constraint::Other { name, .. } => name.as_deref(),
        }
    }
}

/// Edge multiplicity vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    One,       // 1
    ZeroOrOne, // 0..1
    Many,      // *
    OneOrMore, // 1..*
}

impl Cardinality {
    pub fn mark(&self) -> &'static str {
        match self {
            Cardinality::One => "1",
            Cardinality::ZeroOrOne => "0..1",
            Cardinality::Many => "*",
            Cardinality::OneOrMore => "1..*",
        }
    }
}

/// A directed edge derived from one resolved foreign key: many local rows
/// reference one target row, unless the local columns are the table's full
/// primary key, in which case the local side is at most one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relationship {
    pub from_table: String,
    pub from_columns: Vec<String>,
    pub from_cardinality: Cardinality,
    pub to_table: String,
    pub to_columns: Vec<String>,
    pub to_cardinality: Cardinality,
    pub on_delete: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        Table {
            schema: None,
            name: "Order".to_string(),
            columns: vec![
                Column {
                    name: "OrderID".to_string(),
                    declared_type: "uuid".to_string(),
                    nullable: false,
                    default: None,
                    primary_key: true,
                },
                Column {
                    name: "Total".to_string(),
                    declared_type: "NUMERIC(12,2)".to_string(),
                    nullable: true,
                    default: Some("0".to_string()),
                    primary_key: false,
                },
            ],
            constraints: vec![Constraint::PrimaryKey {
                name: None,
                columns: vec!["OrderID".to_string()],
            }],
            lines: LineRange::new(1, 5),
        }
    }

    #[test]
    fn test_effective_schema() {
        let table = sample_table();
        assert_eq!(table.effective_schema(), "public");
        assert_eq!(table.qualified_name(), "public.Order");
    }

    #[test]
    fn test_primary_key_lookup() {
        let table = sample_table();
        assert_eq!(table.primary_key(), Some(&["OrderID".to_string()][..]));
        assert!(table.column("orderid").is_some());
        assert!(table.column("missing").is_none());
    }

    #[test]
    fn test_has_default() {
        let table = sample_table();
        assert!(!table.columns[0].has_default());
        assert!(table.columns[1].has_default());
    }

    #[test]
    fn test_model_lookups() {
        let model = SchemaModel {
            tables: vec![sample_table()],
            ..Default::default()
        };
        assert!(model.table("ORDER").is_some());
        assert!(model.enum_type("missing").is_none());
        assert!(!model.has_fatal());
    }

    #[test]
    fn test_serialize_constraint_tag() {
        let constraint = Constraint::Unique {
            name: Some("uq".to_string()),
            columns: vec!["a".to_string()],
            partial_where: None,
        };
        let json = serde_json::to_string(&constraint).unwrap();
        assert!(json.contains("\"kind\":\"unique\""));
    }
}
