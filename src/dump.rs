//! Plain structural dump of a parsed schema model.
//!
//! The debug/introspection collaborator asks for this instead of a diagram:
//! every enum, table, column, constraint, relationship, and diagnostic in a
//! stable text form.

use crate::model::{Column, Constraint, Relationship, SchemaModel, Table};
use std::fmt;

/// Serialize a SchemaModel to its structural text form.
pub fn dump(model: &SchemaModel) -> String {
    let mut output = String::new();

    for e in &model.enums {
        output.push_str(&format!("enum {} ({})\n", e.name, e.labels.join(", ")));
    }
    if !model.enums.is_empty() {
        output.push('\n');
    }

    for (i, table) in model.tables.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        dump_table(&mut output, table);
    }

    if !model.relationships.is_empty() {
        output.push_str("\nrel {\n");
        for rel in &model.relationships {
            dump_relationship(&mut output, rel);
        }
        output.push_str("}\n");
    }

    if !model.diagnostics.is_empty() {
        output.push_str("\ndiagnostics {\n");
        for diag in &model.diagnostics {
            output.push_str(&format!("    {diag}\n"));
        }
        output.push_str("}\n");
    }

    output
}

impl fmt::Display for SchemaModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", dump(self))
    }
}

fn dump_table(output: &mut String, table: &Table) {
    output.push_str(&format!("table {} {{\n", table.qualified_name()));
    for column in &table.columns {
        dump_column(output, column);
    }
    for constraint in &table.constraints {
        dump_constraint(output, constraint);
    }
    output.push_str("}\n");
}

fn dump_column(output: &mut String, column: &Column) {
    output.push_str(&format!("    {} {}", column.name, column.declared_type));
    if column.primary_key {
        output.push_str(" pk");
    }
    if !column.nullable {
        output.push_str(" not null");
    }
    if let Some(default) = &column.default {
        output.push_str(&format!(" default {default}"));
    }
    output.push('\n');
}

fn dump_constraint(output: &mut String, constraint: &Constraint) {
    let named = |name: &Option<String>| {
        name.as_deref()
            .map(|n| format!(" [{n}]"))
            .unwrap_or_default()
    };
    match constraint {
        Constraint::PrimaryKey { name, columns } => {
            output.push_str(&format!(
                "    primary_key({}){}\n",
                columns.join(", "),
                named(name)
            ));
        }
        Constraint::ForeignKey {
            name,
            columns,
            target,
            target_columns,
            on_delete,
            on_update,
        } => {
            output.push_str(&format!(
                "    foreign_key({}) references {}({})",
                columns.join(", "),
                target,
                target_columns.join(", ")
            ));
            if let Some(action) = on_delete {
                output.push_str(&format!(" on delete {action}"));
            }
            if let Some(action) = on_update {
                output.push_str(&format!(" on update {action}"));
            }
            output.push_str(&named(name));
            output.push('\n');
        }
        Constraint::Unique {
            name,
            columns,
            partial_where,
        } => {
            output.push_str(&format!("    unique({})", columns.join(", ")));
            if let Some(filter) = partial_where {
                output.push_str(&format!(" where {filter}"));
            }
            output.push_str(&named(name));
            output.push('\n');
        }
        Constraint::Check { name, expression } => {
            output.push_str(&format!("    check({expression}){}\n", named(name)));
        }
        Constraint::Other { name, text } => {
            output.push_str(&format!("    unsupported({text}){}\n", named(name)));
        }
    }
}

fn dump_relationship(output: &mut String, rel: &Relationship) {
    output.push_str(&format!(
        "    {} {} -- {} {} ({} -> {})",
        rel.from_table,
        rel.from_cardinality.mark(),
        rel.to_cardinality.mark(),
        rel.to_table,
        rel.from_columns.join(", "),
        rel.to_columns.join(", ")
    ));
    if let Some(action) = &rel.on_delete {
        output.push_str(&format!(" on delete {action}"));
    }
    output.push('\n');
}
