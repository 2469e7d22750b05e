//! Two-pass constraint resolution and relationship derivation.
//!
//! Pass 1 indexes every table and enum regardless of declaration order, so
//! forward references cost nothing. Pass 2 resolves foreign keys against the
//! index and derives the relationship set. Unresolvable constraints stay on
//! their table for diagnostic completeness but never produce an edge.

use crate::diag::{DiagKind, Diagnostic, LineRange};
use crate::model::{Cardinality, Constraint, EnumType, Relationship, SchemaModel, Table};
use crate::table::PendingConstraint;

pub(crate) fn resolve(
    enums: Vec<EnumType>,
    tables: Vec<Table>,
    pending: Vec<PendingConstraint>,
    mut diagnostics: Vec<Diagnostic>,
) -> SchemaModel {
    let enums = dedup_enums(enums, &mut diagnostics);
    let mut tables = dedup_tables(tables, &mut diagnostics);

    attach_pending(&mut tables, pending, &mut diagnostics);
    check_enum_use(&enums, &tables, &mut diagnostics);

    // pass 1: index of declared tables
    let index: Vec<TableRef> = tables
        .iter()
        .map(|t| TableRef {
            name: t.name.clone(),
            primary_key: t.primary_key().map(<[String]>::to_vec),
        })
        .collect();

    // the REFERENCES-without-columns shorthand means the target's primary key
    for table in &mut tables {
        for constraint in &mut table.constraints {
            if let Constraint::ForeignKey {
                target,
                target_columns,
                ..
            } = constraint
            {
                if target_columns.is_empty() {
                    if let Some(entry) = find_table(&index, target) {
                        if let Some(pk) = &entry.primary_key {
                            *target_columns = pk.clone();
                        }
                    }
                }
            }
        }
    }

    // pass 2: derive relationships, ordered by (table name, declaration order)
    let mut order: Vec<usize> = (0..tables.len()).collect();
    order.sort_by(|&a, &b| {
        tables[a]
            .name
            .to_lowercase()
            .cmp(&tables[b].name.to_lowercase())
    });

    let mut relationships = Vec::new();
    for table_idx in order {
        let table = &tables[table_idx];
        let mut emitted: Vec<FkTuple> = Vec::new();
        for constraint in &table.constraints {
            let Constraint::ForeignKey {
                columns,
                target,
                target_columns,
                on_delete,
                ..
            } = constraint
            else {
                continue;
            };

            let Some(entry) = find_table(&index, target) else {
                diagnostics.push(Diagnostic::warning(
                    DiagKind::UnresolvedForeignKey,
                    table.lines,
                    format!(
                        "table {}: foreign key ({}) references unknown table {}",
                        table.name,
                        columns.join(", "),
                        target
                    ),
                ));
                continue;
            };
            if target_columns.is_empty() {
                diagnostics.push(Diagnostic::warning(
                    DiagKind::UnresolvedForeignKey,
                    table.lines,
                    format!(
                        "table {}: foreign key ({}) references {} which has no primary key to infer columns from",
                        table.name,
                        columns.join(", "),
                        entry.name
                    ),
                ));
                continue;
            }
            if columns.len() != target_columns.len() {
                diagnostics.push(Diagnostic::warning(
                    DiagKind::ForeignKeyArityMismatch,
                    table.lines,
                    format!(
                        "table {}: foreign key ({}) and target columns ({}) differ in length",
                        table.name,
                        columns.join(", "),
                        target_columns.join(", ")
                    ),
                ));
                continue;
            }

            // an inline REFERENCES and a table-level FOREIGN KEY over the
            // same tuple describe one edge
            let tuple = fk_tuple(columns, &entry.name, target_columns);
            if emitted.contains(&tuple) {
                continue;
            }
            emitted.push(tuple);

            let from_cardinality = match table.primary_key() {
                Some(pk) if same_column_set(columns, pk) => Cardinality::ZeroOrOne,
                _ => Cardinality::Many,
            };
            relationships.push(Relationship {
                from_table: table.name.clone(),
                from_columns: columns.clone(),
                from_cardinality,
                to_table: entry.name.clone(),
                to_columns: target_columns.clone(),
                to_cardinality: Cardinality::One,
                on_delete: on_delete.clone(),
            });
        }
    }

    tracing::debug!(
        enums = enums.len(),
        tables = tables.len(),
        relationships = relationships.len(),
        diagnostics = diagnostics.len(),
        "schema model resolved"
    );

    SchemaModel {
        enums,
        tables,
        relationships,
        diagnostics,
    }
}

struct TableRef {
    name: String,
    primary_key: Option<Vec<String>>,
}

fn find_table<'a>(index: &'a [TableRef], name: &str) -> Option<&'a TableRef> {
    index.iter().find(|t| t.name.eq_ignore_ascii_case(name))
}

type FkTuple = (Vec<String>, String, Vec<String>);

fn fk_tuple(columns: &[String], target: &str, target_columns: &[String]) -> FkTuple {
    (
        columns.iter().map(|c| c.to_lowercase()).collect(),
        target.to_lowercase(),
        target_columns.iter().map(|c| c.to_lowercase()).collect(),
    )
}

fn same_column_set(a: &[String], b: &[String]) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|x| b.iter().any(|y| y.eq_ignore_ascii_case(x)))
}

/// Later duplicate declarations win; the earlier one is removed.
fn dedup_enums(enums: Vec<EnumType>, diagnostics: &mut Vec<Diagnostic>) -> Vec<EnumType> {
    let mut out: Vec<EnumType> = Vec::new();
    for e in enums {
        if let Some(i) = out
            .iter()
            .position(|x| x.name.eq_ignore_ascii_case(&e.name))
        {
            diagnostics.push(Diagnostic::warning(
                DiagKind::DuplicateEnumType,
                LineRange::single(e.line),
                format!(
                    "enum type {} already declared on line {}; later declaration wins",
                    e.name, out[i].line
                ),
            ));
            out.remove(i);
        }
        out.push(e);
    }
    out
}

fn dedup_tables(tables: Vec<Table>, diagnostics: &mut Vec<Diagnostic>) -> Vec<Table> {
    let mut out: Vec<Table> = Vec::new();
    for t in tables {
        if let Some(i) = out.iter().position(|x| {
            x.name.eq_ignore_ascii_case(&t.name)
                && x.effective_schema().eq_ignore_ascii_case(t.effective_schema())
        }) {
            diagnostics.push(Diagnostic::warning(
                DiagKind::DuplicateTable,
                t.lines,
                format!(
                    "table {} already declared on line {}; later declaration wins",
                    t.qualified_name(),
                    out[i].lines.start
                ),
            ));
            out.remove(i);
        }
        out.push(t);
    }
    out
}

/// Attach constraints collected from ALTER TABLE / CREATE UNIQUE INDEX
/// statements to their tables.
fn attach_pending(
    tables: &mut [Table],
    pending: Vec<PendingConstraint>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for p in pending {
        let Some(table) = tables
            .iter_mut()
            .find(|t| t.name.eq_ignore_ascii_case(&p.table))
        else {
            diagnostics.push(Diagnostic::warning(
                DiagKind::UnknownConstraintTarget,
                p.lines,
                format!("constraint targets undeclared table {}", p.table),
            ));
            continue;
        };
        if let Constraint::PrimaryKey { columns, .. } = &p.constraint {
            for column in &mut table.columns {
                if columns.iter().any(|c| c.eq_ignore_ascii_case(&column.name)) {
                    column.primary_key = true;
                }
            }
        }
        table.constraints.push(p.constraint);
    }
}

/// Warn when a column's type names an enum declared later in the input.
fn check_enum_use(enums: &[EnumType], tables: &[Table], diagnostics: &mut Vec<Diagnostic>) {
    for table in tables {
        for column in &table.columns {
            let base = base_type_name(&column.declared_type);
            let Some(e) = enums.iter().find(|e| e.name.eq_ignore_ascii_case(&base)) else {
                continue;
            };
            if e.line > table.lines.start {
                diagnostics.push(Diagnostic::warning(
                    DiagKind::EnumForwardReference,
                    table.lines,
                    format!(
                        "table {}: column {} uses enum type {} declared later on line {}",
                        table.name, column.name, e.name, e.line
                    ),
                ));
            }
        }
    }
}

/// Strip parameters, array suffix, and quotes off a declared type.
fn base_type_name(declared: &str) -> String {
    let base = declared.split('(').next().unwrap_or(declared);
    let base = base.trim().trim_end_matches("[]").trim();
    base.trim_matches('"').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::LineRange;
    use crate::model::Column;

    fn table(name: &str, line: u32, constraints: Vec<Constraint>) -> Table {
        Table {
            schema: None,
            name: name.to_string(),
            columns: Vec::new(),
            constraints,
            lines: LineRange::single(line),
        }
    }

    fn fk(columns: &[&str], target: &str, target_columns: &[&str]) -> Constraint {
        Constraint::ForeignKey {
            name: None,
            columns: columns.iter().map(|s| s.to_string()).collect(),
            target: target.to_string(),
            target_columns: target_columns.iter().map(|s| s.to_string()).collect(),
            on_delete: None,
            on_update: None,
        }
    }

    fn pk(columns: &[&str]) -> Constraint {
        Constraint::PrimaryKey {
            name: None,
            columns: columns.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_forward_reference_resolves() {
        let tables = vec![
            table("BANKACCOUNT", 1, vec![fk(&["conn_id"], "PROVIDERCONNECTION", &["id"])]),
            table("PROVIDERCONNECTION", 5, vec![pk(&["id"])]),
        ];
        let model = resolve(Vec::new(), tables, Vec::new(), Vec::new());
        assert_eq!(model.relationships.len(), 1);
        assert_eq!(model.relationships[0].from_table, "BANKACCOUNT");
        assert_eq!(model.relationships[0].to_table, "PROVIDERCONNECTION");
        assert!(model.diagnostics.is_empty());
    }

    #[test]
    fn test_unresolved_target_is_excluded() {
        let tables = vec![table("a", 1, vec![fk(&["x"], "missing", &["y"])])];
        let model = resolve(Vec::new(), tables, Vec::new(), Vec::new());
        assert!(model.relationships.is_empty());
        assert_eq!(model.diagnostics.len(), 1);
        assert_eq!(model.diagnostics[0].kind, DiagKind::UnresolvedForeignKey);
        // the constraint itself is retained
        assert_eq!(model.tables[0].constraints.len(), 1);
    }

    #[test]
    fn test_arity_mismatch_is_excluded() {
        let tables = vec![
            table("a", 1, vec![fk(&["x", "y"], "b", &["z"])]),
            table("b", 5, vec![]),
        ];
        let model = resolve(Vec::new(), tables, Vec::new(), Vec::new());
        assert!(model.relationships.is_empty());
        assert_eq!(model.diagnostics[0].kind, DiagKind::ForeignKeyArityMismatch);
    }

    #[test]
    fn test_duplicate_fk_tuple_yields_one_relationship() {
        let tables = vec![
            table(
                "a",
                1,
                vec![fk(&["x"], "b", &["id"]), fk(&["X"], "B", &["ID"])],
            ),
            table("b", 5, vec![]),
        ];
        let model = resolve(Vec::new(), tables, Vec::new(), Vec::new());
        assert_eq!(model.relationships.len(), 1);
    }

    #[test]
    fn test_distinct_fk_tuples_yield_two() {
        let tables = vec![
            table(
                "a",
                1,
                vec![fk(&["x"], "b", &["id"]), fk(&["y"], "b", &["id"])],
            ),
            table("b", 5, vec![]),
        ];
        let model = resolve(Vec::new(), tables, Vec::new(), Vec::new());
        assert_eq!(model.relationships.len(), 2);
    }

    #[test]
    fn test_pk_covering_fk_is_at_most_one() {
        let tables = vec![
            table("profile", 1, vec![pk(&["user_id"]), fk(&["user_id"], "users", &["id"])]),
            table("users", 5, vec![pk(&["id"])]),
        ];
        let model = resolve(Vec::new(), tables, Vec::new(), Vec::new());
        assert_eq!(model.relationships[0].from_cardinality, Cardinality::ZeroOrOne);
        assert_eq!(model.relationships[0].to_cardinality, Cardinality::One);
    }

    #[test]
    fn test_relationship_ordering_by_table_name() {
        let tables = vec![
            table("zebra", 1, vec![fk(&["t"], "target", &["id"])]),
            table("alpha", 5, vec![fk(&["t"], "target", &["id"])]),
            table("target", 9, vec![]),
        ];
        let model = resolve(Vec::new(), tables, Vec::new(), Vec::new());
        assert_eq!(model.relationships[0].from_table, "alpha");
        assert_eq!(model.relationships[1].from_table, "zebra");
    }

    #[test]
    fn test_references_shorthand_uses_target_pk() {
        let tables = vec![
            table("a", 1, vec![fk(&["b_id"], "b", &[])]),
            table("b", 5, vec![pk(&["id"])]),
        ];
        let model = resolve(Vec::new(), tables, Vec::new(), Vec::new());
        assert_eq!(model.relationships.len(), 1);
        assert_eq!(model.relationships[0].to_columns, vec!["id".to_string()]);
    }

    #[test]
    fn test_references_shorthand_without_target_pk_warns() {
        let tables = vec![
            table("a", 1, vec![fk(&["b_id"], "b", &[])]),
            table("b", 5, vec![]),
        ];
        let model = resolve(Vec::new(), tables, Vec::new(), Vec::new());
        assert!(model.relationships.is_empty());
        assert_eq!(model.diagnostics[0].kind, DiagKind::UnresolvedForeignKey);
    }

    #[test]
    fn test_duplicate_table_later_wins() {
        let mut first = table("t", 1, vec![]);
        first.columns.push(Column {
            name: "old".to_string(),
            declared_type: "INT".to_string(),
            nullable: true,
            default: None,
            primary_key: false,
        });
        let second = table("T", 7, vec![]);
        let model = resolve(Vec::new(), vec![first, second], Vec::new(), Vec::new());
        assert_eq!(model.tables.len(), 1);
        assert!(model.tables[0].columns.is_empty());
        assert_eq!(model.diagnostics[0].kind, DiagKind::DuplicateTable);
    }

    #[test]
    fn test_duplicate_enum_later_wins() {
        let enums = vec![
            EnumType {
                name: "status".to_string(),
                labels: vec!["A".to_string()],
                line: 1,
            },
            EnumType {
                name: "STATUS".to_string(),
                labels: vec!["B".to_string()],
                line: 4,
            },
        ];
        let model = resolve(enums, Vec::new(), Vec::new(), Vec::new());
        assert_eq!(model.enums.len(), 1);
        assert_eq!(model.enums[0].labels, vec!["B".to_string()]);
        assert_eq!(model.diagnostics[0].kind, DiagKind::DuplicateEnumType);
    }

    #[test]
    fn test_pending_attaches_and_marks_pk() {
        let mut t = table("t", 1, vec![]);
        t.columns.push(Column {
            name: "id".to_string(),
            declared_type: "INT".to_string(),
            nullable: false,
            default: None,
            primary_key: false,
        });
        let pending = vec![PendingConstraint {
            table: "T".to_string(),
            constraint: pk(&["id"]),
            lines: LineRange::single(9),
        }];
        let model = resolve(Vec::new(), vec![t], pending, Vec::new());
        assert!(model.tables[0].columns[0].primary_key);
        assert_eq!(model.tables[0].primary_key(), Some(&["id".to_string()][..]));
    }

    #[test]
    fn test_pending_unknown_table_warns() {
        let pending = vec![PendingConstraint {
            table: "ghost".to_string(),
            constraint: pk(&["id"]),
            lines: LineRange::single(3),
        }];
        let model = resolve(Vec::new(), Vec::new(), pending, Vec::new());
        assert_eq!(model.diagnostics[0].kind, DiagKind::UnknownConstraintTarget);
    }

    #[test]
    fn test_enum_forward_reference_warns() {
        let enums = vec![EnumType {
            name: "status_enum".to_string(),
            labels: vec!["A".to_string()],
            line: 20,
        }];
        let mut t = table("t", 5, vec![]);
        t.columns.push(Column {
            name: "status".to_string(),
            declared_type: "status_enum".to_string(),
            nullable: true,
            default: None,
            primary_key: false,
        });
        let model = resolve(enums, vec![t], Vec::new(), Vec::new());
        assert_eq!(model.diagnostics[0].kind, DiagKind::EnumForwardReference);
    }

    #[test]
    fn test_enum_declared_before_use_is_quiet() {
        let enums = vec![EnumType {
            name: "status_enum".to_string(),
            labels: vec!["A".to_string()],
            line: 2,
        }];
        let mut t = table("t", 5, vec![]);
        t.columns.push(Column {
            name: "status".to_string(),
            declared_type: "status_enum".to_string(),
            nullable: true,
            default: None,
            primary_key: false,
        });
        let model = resolve(enums, vec![t], Vec::new(), Vec::new());
        assert!(model.diagnostics.is_empty());
    }

    #[test]
    fn test_base_type_name() {
        assert_eq!(base_type_name("VARCHAR(255)"), "VARCHAR");
        assert_eq!(base_type_name("status_enum[]"), "status_enum");
        assert_eq!(base_type_name("\"MyType\""), "MyType");
        assert_eq!(base_type_name("NUMERIC(7,4)"), "NUMERIC");
    }
}
