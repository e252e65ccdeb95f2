//! Statement synthesis from model descriptors.

use tracing::warn;

use crate::model::{FieldDescriptor, ModelDescriptor};
use crate::sql::script::{Binding, Collection, Node, Script};
use crate::sql::{CommandKind, GeneratedKey, Statement, StatementId};
use crate::error::Result;

/// Operations with a synthesized statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    /// Sparse insert.
    Insert,
    /// Dense multi-row insert.
    BatchInsert,
    /// Sparse update by key.
    UpdateById,
    /// Full update by key.
    UpdateByIdFull,
    /// Delete by key.
    DeleteById,
    /// Delete by key set.
    DeleteByIds,
    /// Select by key.
    FindById,
    /// Select by key set.
    ListByIds,
    /// Select matching the present fields of a filter record, optionally sorted.
    ListByCondition,
    /// Count matching the present fields of a filter record.
    CountByCondition,
}

impl Operation {
    /// Every operation, in declaration order.
    pub const ALL: [Operation; 10] = [
        Operation::Insert,
        Operation::BatchInsert,
        Operation::UpdateById,
        Operation::UpdateByIdFull,
        Operation::DeleteById,
        Operation::DeleteByIds,
        Operation::FindById,
        Operation::ListByIds,
        Operation::ListByCondition,
        Operation::CountByCondition,
    ];

    /// Name used in statement ids.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::BatchInsert => "batch_insert",
            Operation::UpdateById => "update_by_id",
            Operation::UpdateByIdFull => "update_by_id_full",
            Operation::DeleteById => "delete_by_id",
            Operation::DeleteByIds => "delete_by_ids",
            Operation::FindById => "find_by_id",
            Operation::ListByIds => "list_by_ids",
            Operation::ListByCondition => "list_by_condition",
            Operation::CountByCondition => "count_by_condition",
        }
    }

    /// Command issued by the operation.
    pub fn command(&self) -> CommandKind {
        match self {
            Operation::Insert | Operation::BatchInsert => CommandKind::Insert,
            Operation::UpdateById | Operation::UpdateByIdFull => CommandKind::Update,
            Operation::DeleteById | Operation::DeleteByIds => CommandKind::Delete,
            Operation::FindById
            | Operation::ListByIds
            | Operation::ListByCondition
            | Operation::CountByCondition => CommandKind::Select,
        }
    }

    /// True when the statement's shape varies with call-site arguments.
    pub fn is_varying(&self) -> bool {
        matches!(self, Operation::ListByCondition)
    }
}

/// Resolved `ORDER BY` term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortColumn {
    /// Sorted column.
    pub column: String,
    /// Ascending when true.
    pub ascending: bool,
}

/// Maps sort properties onto columns, dropping properties the model lacks.
pub fn sort_columns<'p>(
    model: &ModelDescriptor,
    sorts: impl IntoIterator<Item = (&'p str, bool)>,
) -> Vec<SortColumn> {
    sorts
        .into_iter()
        .filter_map(|(property, ascending)| match model.field(property) {
            Some(field) => Some(SortColumn {
                column: field.column.clone(),
                ascending,
            }),
            None => {
                warn!(model = model.type_name(), property, "dropping sort on unmapped property");
                None
            }
        })
        .collect()
}

/// `ORDER BY` clause for `sorts`; `None` when empty.
pub fn sort_clause(sorts: &[SortColumn]) -> Option<String> {
    if sorts.is_empty() {
        return None;
    }
    let terms: Vec<String> = sorts
        .iter()
        .map(|sort| {
            format!(
                "{} {}",
                sort.column,
                if sort.ascending { "ASC" } else { "DESC" }
            )
        })
        .collect();
    Some(format!("ORDER BY {}", terms.join(", ")))
}

/// Synthesizes the statement for a fixed-shape operation.
///
/// [`Operation::ListByCondition`] is synthesized unsorted; use
/// [`list_by_condition`] for sorted variants. Key-scoped operations fail with
/// [`TesseraError::MissingPrimaryKey`](crate::error::TesseraError::MissingPrimaryKey)
/// when the model has no key.
pub fn statement(model: &ModelDescriptor, operation: Operation) -> Result<Statement> {
    let script = match operation {
        Operation::Insert => insert_script(model),
        Operation::BatchInsert => batch_insert_script(model),
        Operation::UpdateById => update_script(model, true)?,
        Operation::UpdateByIdFull => update_script(model, false)?,
        Operation::DeleteById => {
            let key = model.require_id_field()?;
            Script::new(vec![
                Node::text(format!("DELETE FROM {} WHERE {} = ", model.model_name(), key.column)),
                Node::Bind(Binding::Key),
            ])
        }
        Operation::DeleteByIds => {
            let key = model.require_id_field()?;
            Script::new(vec![
                Node::text(format!("DELETE FROM {} WHERE {} IN", model.model_name(), key.column)),
                key_list(),
            ])
        }
        Operation::FindById => {
            let key = model.require_id_field()?;
            Script::new(vec![
                Node::text(format!("{} WHERE {} = ", select_from(model), key.column)),
                Node::Bind(Binding::Key),
            ])
        }
        Operation::ListByIds => {
            let key = model.require_id_field()?;
            Script::new(vec![
                Node::text(format!("{} WHERE {} IN", select_from(model), key.column)),
                key_list(),
            ])
        }
        Operation::ListByCondition => condition_script(model, select_from(model), &[]),
        Operation::CountByCondition => condition_script(
            model,
            format!("SELECT COUNT(*) FROM {}", model.model_name()),
            &[],
        ),
    };
    let generated_key = match operation {
        Operation::Insert | Operation::BatchInsert => generated_key(model),
        _ => None,
    };
    Ok(Statement {
        id: StatementId::new(model.type_name(), operation.name(), operation.command()),
        command: operation.command(),
        script,
        generated_key,
    })
}

/// Synthesizes a sorted condition query keyed by its script hash.
pub fn list_by_condition(model: &ModelDescriptor, sorts: &[SortColumn]) -> Statement {
    let script = condition_script(model, select_from(model), sorts);
    let operation = Operation::ListByCondition;
    Statement {
        id: StatementId::varying(
            model.type_name(),
            operation.name(),
            script.shape_hash(),
            operation.command(),
        ),
        command: operation.command(),
        script,
        generated_key: None,
    }
}

/// Select list aliasing each column to its property where they differ.
pub fn select_columns(model: &ModelDescriptor) -> String {
    model
        .fields()
        .iter()
        .map(|field| {
            if field.column == field.property {
                field.column.clone()
            } else {
                format!("{} AS {}", field.column, field.property)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn select_from(model: &ModelDescriptor) -> String {
    format!("SELECT {} FROM {}", select_columns(model), model.model_name())
}

fn generated_key(model: &ModelDescriptor) -> Option<GeneratedKey> {
    if !model.auto_id() {
        return None;
    }
    model.id_field().map(|field| GeneratedKey {
        column: field.column.clone(),
        property: field.property.clone(),
    })
}

fn guarded(field: &FieldDescriptor, body: Vec<Node>) -> Vec<Node> {
    if field.is_primitive() {
        body
    } else {
        vec![Node::when(field.property.clone(), body)]
    }
}

fn insert_script(model: &ModelDescriptor) -> Script {
    let columns = model
        .insert_fields()
        .flat_map(|field| guarded(field, vec![Node::text(format!("{}, ", field.column))]))
        .collect();
    let values = model
        .insert_fields()
        .flat_map(|field| {
            guarded(
                field,
                vec![Node::property(field.property.clone()), Node::text(", ")],
            )
        })
        .collect();
    Script::new(vec![
        Node::text(format!("INSERT INTO {}", model.model_name())),
        Node::parenthesized(columns),
        Node::text(" VALUES"),
        Node::parenthesized(values),
    ])
}

fn batch_insert_script(model: &ModelDescriptor) -> Script {
    let fields: Vec<&FieldDescriptor> = model.insert_fields().collect();
    let columns = fields
        .iter()
        .map(|field| field.column.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let mut row = vec![Node::text("(")];
    for (idx, field) in fields.iter().enumerate() {
        if idx > 0 {
            row.push(Node::text(", "));
        }
        row.push(Node::Bind(Binding::ElementProperty(field.property.clone())));
    }
    row.push(Node::text(")"));
    Script::new(vec![
        Node::text(format!(
            "INSERT INTO {} ({columns}) VALUES",
            model.model_name()
        )),
        Node::ForEach {
            collection: Collection::Batch,
            open: "",
            separator: ", ",
            close: "",
            body: row,
        },
    ])
}

fn update_script(model: &ModelDescriptor, sparse: bool) -> Result<Script> {
    let key = model.require_id_field()?;
    let assignments = model
        .update_fields()
        .flat_map(|field| {
            let body = vec![
                Node::text(format!("{} = ", field.column)),
                Node::property(field.property.clone()),
                Node::text(", "),
            ];
            if sparse {
                guarded(field, body)
            } else {
                body
            }
        })
        .collect();
    Ok(Script::new(vec![
        Node::text(format!("UPDATE {}", model.model_name())),
        Node::Set(assignments),
        Node::text(format!(" WHERE {} = ", key.column)),
        Node::property(key.property.clone()),
    ]))
}

fn condition_script(model: &ModelDescriptor, head: String, sorts: &[SortColumn]) -> Script {
    let predicates = model
        .fields()
        .iter()
        .map(|field| {
            Node::when(
                field.property.clone(),
                vec![
                    Node::text(format!(" AND {} = ", field.column)),
                    Node::property(field.property.clone()),
                ],
            )
        })
        .collect();
    let mut nodes = vec![Node::text(head), Node::Where(predicates)];
    if let Some(order_by) = sort_clause(sorts) {
        nodes.push(Node::text(format!(" {order_by}")));
    }
    Script::new(nodes)
}

fn key_list() -> Node {
    Node::ForEach {
        collection: Collection::Keys,
        open: "(",
        separator: ", ",
        close: ")",
        body: vec![Node::Bind(Binding::Element)],
    }
}
