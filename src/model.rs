//! Graph data model: table and attribute nodes, columns, relationship edges.
//!
//! Key flags are held as a single [`KeyRole`] so a column can never be both a
//! primary and a foreign key. The serialized form keeps the flat
//! `primaryKey` / `foreignKey` booleans; decoding a record with both set fails.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generate a fresh id for a user-created entity.
pub fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

/// Deterministic id of the table node materialized for `table`.
pub fn table_node_id(table: &str) -> String {
    format!("tbl:{}", table)
}

/// Deterministic id of the attribute node materialized for `table.column`.
pub fn attribute_node_id(table: &str, column: &str) -> String {
    format!("attr:{}.{}", table, column)
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    OneToOne,
    #[default]
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl Cardinality {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "one-to-one" | "1:1" => Some(Self::OneToOne),
            "one-to-many" | "1:n" => Some(Self::OneToMany),
            "many-to-one" | "n:1" => Some(Self::ManyToOne),
            "many-to-many" | "n:m" => Some(Self::ManyToMany),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneToOne => "one-to-one",
            Self::OneToMany => "one-to-many",
            Self::ManyToOne => "many-to-one",
            Self::ManyToMany => "many-to-many",
        }
    }

    /// Whether the source end holds the foreign key. Only `one-to-many`
    /// puts it on the target, the "many" side.
    pub fn fk_on_source(self) -> bool {
        !matches!(self, Self::OneToMany)
    }
}

/// Rejected key-flag transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyConflict {
    #[error("'{0}' is a foreign key; clear the foreign key before marking it as the primary key")]
    AlreadyForeign(String),
    #[error("'{0}' is the primary key; unset the primary key before marking it as a foreign key")]
    AlreadyPrimary(String),
    #[error("foreign key on '{0}' needs both a referenced table and a referenced column")]
    IncompleteReference(String),
}

/// Key role of a column or attribute.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KeyRole {
    #[default]
    None,
    Primary,
    Foreign { table: String, column: String },
}

impl KeyRole {
    pub fn is_primary(&self) -> bool {
        matches!(self, Self::Primary)
    }

    pub fn is_foreign(&self) -> bool {
        matches!(self, Self::Foreign { .. })
    }

    pub fn is_key(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Referenced `(table, column)` for a foreign key.
    pub fn reference(&self) -> Option<(&str, &str)> {
        match self {
            Self::Foreign { table, column } => Some((table, column)),
            _ => None,
        }
    }

    /// Toggle the primary-key flag. Leaves the role untouched on conflict.
    pub fn set_primary(&mut self, subject: &str, on: bool) -> Result<(), KeyConflict> {
        match (on, &*self) {
            (true, Self::Foreign { .. }) => Err(KeyConflict::AlreadyForeign(subject.to_string())),
            (true, _) => {
                *self = Self::Primary;
                Ok(())
            }
            (false, Self::Primary) => {
                *self = Self::None;
                Ok(())
            }
            (false, _) => Ok(()),
        }
    }

    /// Mark as a foreign key to `table.column`. Leaves the role untouched on conflict.
    pub fn set_foreign(&mut self, subject: &str, table: &str, column: &str) -> Result<(), KeyConflict> {
        if self.is_primary() {
            return Err(KeyConflict::AlreadyPrimary(subject.to_string()));
        }
        let (table, column) = (table.trim(), column.trim());
        if table.is_empty() || column.is_empty() {
            return Err(KeyConflict::IncompleteReference(subject.to_string()));
        }
        *self = Self::Foreign {
            table: table.to_string(),
            column: column.to_string(),
        };
        Ok(())
    }

    pub fn clear_foreign(&mut self) {
        if self.is_foreign() {
            *self = Self::None;
        }
    }

    /// Build a role from the flat wire flags.
    pub fn from_flags(
        subject: &str,
        primary: bool,
        foreign: bool,
        referenced_table: Option<&str>,
        referenced_column: Option<&str>,
    ) -> Result<Self, KeyConflict> {
        match (primary, foreign) {
            (true, true) => Err(KeyConflict::AlreadyPrimary(subject.to_string())),
            (true, false) => Ok(Self::Primary),
            (false, true) => {
                let mut role = Self::None;
                role.set_foreign(
                    subject,
                    referenced_table.unwrap_or_default(),
                    referenced_column.unwrap_or_default(),
                )?;
                Ok(role)
            }
            (false, false) => Ok(Self::None),
        }
    }

    fn flags(&self) -> (bool, bool, Option<String>, Option<String>) {
        match self {
            Self::None => (false, false, None, None),
            Self::Primary => (true, false, None, None),
            Self::Foreign { table, column } => (false, true, Some(table.clone()), Some(column.clone())),
        }
    }

    /// Rewrite a reference after the referenced table was renamed.
    pub(crate) fn rename_table(&mut self, from: &str, to: &str) -> bool {
        match self {
            Self::Foreign { table, .. } if table == from => {
                *table = to.to_string();
                true
            }
            _ => false,
        }
    }

    /// Rewrite a reference after `table.from` was renamed to `table.to`.
    pub(crate) fn rename_column(&mut self, owner: &str, from: &str, to: &str) -> bool {
        match self {
            Self::Foreign { table, column } if table == owner && column == from => {
                *column = to.to_string();
                true
            }
            _ => false,
        }
    }
}

/// Split `VARCHAR(255)` into `("VARCHAR", Some(255))`. Anything that is not a
/// single integer argument is kept verbatim in the type.
pub fn split_length(data_type: &str) -> (String, Option<u32>) {
    let trimmed = data_type.trim();
    if let Some(open) = trimmed.find('(') {
        if let Some(inner) = trimmed[open + 1..].strip_suffix(')') {
            if let Ok(n) = inner.trim().parse::<u32>() {
                return (trimmed[..open].trim().to_string(), Some(n));
            }
        }
    }
    (trimmed.to_string(), None)
}

/// A column owned by exactly one table node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ColumnRecord", into = "ColumnRecord")]
pub struct Column {
    pub name: String,
    pub description: Option<String>,
    pub alias: Option<String>,
    pub data_type: String,
    pub length: Option<u32>,
    pub nullable: bool,
    pub key: KeyRole,
    pub is_user_added: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            alias: None,
            data_type: data_type.into(),
            length: None,
            nullable: true,
            key: KeyRole::None,
            is_user_added: false,
        }
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.key = KeyRole::Primary;
        self.nullable = false;
        self
    }

    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.key = KeyRole::Foreign {
            table: table.into(),
            column: column.into(),
        };
        self
    }

    pub fn is_primary_key(&self) -> bool {
        self.key.is_primary()
    }

    pub fn is_foreign_key(&self) -> bool {
        self.key.is_foreign()
    }

    /// Type with its length suffix, e.g. `VARCHAR(255)`.
    pub fn type_with_length(&self) -> String {
        match self.length {
            Some(n) if !self.data_type.contains('(') => format!("{}({})", self.data_type, n),
            _ => self.data_type.clone(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColumnRecord {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alias: Option<String>,
    data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    length: Option<u32>,
    #[serde(default = "default_nullable")]
    nullable: bool,
    #[serde(default)]
    primary_key: bool,
    #[serde(default)]
    foreign_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    referenced_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    referenced_column: Option<String>,
    #[serde(default)]
    is_user_added: bool,
}

fn default_nullable() -> bool {
    true
}

impl TryFrom<ColumnRecord> for Column {
    type Error = KeyConflict;

    fn try_from(r: ColumnRecord) -> Result<Self, Self::Error> {
        let key = KeyRole::from_flags(
            &r.name,
            r.primary_key,
            r.foreign_key,
            r.referenced_table.as_deref(),
            r.referenced_column.as_deref(),
        )?;
        Ok(Column {
            name: r.name,
            description: r.description,
            alias: r.alias,
            data_type: r.data_type,
            length: r.length,
            nullable: r.nullable,
            key,
            is_user_added: r.is_user_added,
        })
    }
}

impl From<Column> for ColumnRecord {
    fn from(c: Column) -> Self {
        let (primary_key, foreign_key, referenced_table, referenced_column) = c.key.flags();
        ColumnRecord {
            name: c.name,
            description: c.description,
            alias: c.alias,
            data_type: c.data_type,
            length: c.length,
            nullable: c.nullable,
            primary_key,
            foreign_key,
            referenced_table,
            referenced_column,
            is_user_added: c.is_user_added,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableNode {
    pub id: String,
    #[serde(default)]
    pub position: Position,
    pub table_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub is_user_added: bool,
}

impl TableNode {
    pub fn new(id: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            position: Position::default(),
            table_name: table_name.into(),
            description: String::new(),
            columns: Vec::new(),
            is_user_added: false,
        }
    }

    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_primary_key())
    }

    pub fn has_key_columns(&self) -> bool {
        self.columns.iter().any(|c| c.key.is_key())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AttributeRecord", into = "AttributeRecord")]
pub struct AttributeNode {
    pub id: String,
    pub position: Position,
    pub attribute_name: String,
    /// Owning table by name. A back-reference, not ownership.
    pub table_name: String,
    pub data_type: String,
    pub key: KeyRole,
    pub is_user_added: bool,
}

impl AttributeNode {
    pub fn new(
        id: impl Into<String>,
        table_name: impl Into<String>,
        attribute_name: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            position: Position::default(),
            attribute_name: attribute_name.into(),
            table_name: table_name.into(),
            data_type: data_type.into(),
            key: KeyRole::None,
            is_user_added: false,
        }
    }

    pub fn is_primary_key(&self) -> bool {
        self.key.is_primary()
    }

    pub fn is_foreign_key(&self) -> bool {
        self.key.is_foreign()
    }

    /// Column equivalent of this attribute.
    pub fn to_column(&self) -> Column {
        let (data_type, length) = split_length(&self.data_type);
        Column {
            name: self.attribute_name.clone(),
            description: None,
            alias: None,
            data_type,
            length,
            nullable: !self.key.is_primary(),
            key: self.key.clone(),
            is_user_added: self.is_user_added,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttributeRecord {
    id: String,
    #[serde(default)]
    position: Position,
    attribute_name: String,
    table_name: String,
    data_type: String,
    #[serde(default)]
    is_primary_key: bool,
    #[serde(default)]
    is_foreign_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    referenced_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    referenced_column: Option<String>,
    #[serde(default)]
    is_user_added: bool,
}

impl TryFrom<AttributeRecord> for AttributeNode {
    type Error = KeyConflict;

    fn try_from(r: AttributeRecord) -> Result<Self, Self::Error> {
        let key = KeyRole::from_flags(
            &r.attribute_name,
            r.is_primary_key,
            r.is_foreign_key,
            r.referenced_table.as_deref(),
            r.referenced_column.as_deref(),
        )?;
        Ok(AttributeNode {
            id: r.id,
            position: r.position,
            attribute_name: r.attribute_name,
            table_name: r.table_name,
            data_type: r.data_type,
            key,
            is_user_added: r.is_user_added,
        })
    }
}

impl From<AttributeNode> for AttributeRecord {
    fn from(a: AttributeNode) -> Self {
        let (is_primary_key, is_foreign_key, referenced_table, referenced_column) = a.key.flags();
        AttributeRecord {
            id: a.id,
            position: a.position,
            attribute_name: a.attribute_name,
            table_name: a.table_name,
            data_type: a.data_type,
            is_primary_key,
            is_foreign_key,
            referenced_table,
            referenced_column,
            is_user_added: a.is_user_added,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Table,
    Attribute,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => f.write_str("table"),
            Self::Attribute => f.write_str("attribute"),
        }
    }
}

/// A graph vertex. Which variant appears depends on the active view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Table(TableNode),
    Attribute(AttributeNode),
}

impl Node {
    pub fn id(&self) -> &str {
        match self {
            Self::Table(t) => &t.id,
            Self::Attribute(a) => &a.id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Table(_) => NodeKind::Table,
            Self::Attribute(_) => NodeKind::Attribute,
        }
    }

    /// Display label: the table or attribute name.
    pub fn label(&self) -> &str {
        match self {
            Self::Table(t) => &t.table_name,
            Self::Attribute(a) => &a.attribute_name,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Self::Table(t) => t.position,
            Self::Attribute(a) => a.position,
        }
    }

    pub fn is_user_added(&self) -> bool {
        match self {
            Self::Table(t) => t.is_user_added,
            Self::Attribute(a) => a.is_user_added,
        }
    }

    pub fn set_user_added(&mut self, added: bool) {
        match self {
            Self::Table(t) => t.is_user_added = added,
            Self::Attribute(a) => a.is_user_added = added,
        }
    }

    /// Whether this node carries a primary or foreign key.
    pub fn is_key_bearing(&self) -> bool {
        match self {
            Self::Table(t) => t.has_key_columns(),
            Self::Attribute(a) => a.key.is_key(),
        }
    }

    pub fn as_table(&self) -> Option<&TableNode> {
        match self {
            Self::Table(t) => Some(t),
            Self::Attribute(_) => None,
        }
    }

    pub fn as_table_mut(&mut self) -> Option<&mut TableNode> {
        match self {
            Self::Table(t) => Some(t),
            Self::Attribute(_) => None,
        }
    }

    pub fn as_attribute(&self) -> Option<&AttributeNode> {
        match self {
            Self::Attribute(a) => Some(a),
            Self::Table(_) => None,
        }
    }

    pub fn as_attribute_mut(&mut self) -> Option<&mut AttributeNode> {
        match self {
            Self::Attribute(a) => Some(a),
            Self::Table(_) => None,
        }
    }

    /// Name of the table this node belongs to.
    pub fn table_name(&self) -> &str {
        match self {
            Self::Table(t) => &t.table_name,
            Self::Attribute(a) => &a.table_name,
        }
    }
}

/// Label of the edge a foreign-key attribute holds to the attribute it
/// references.
pub const REFERENCES: &str = "references";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source_node_id: String,
    pub target_node_id: String,
    /// Relationship description.
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub cardinality: Cardinality,
    #[serde(default)]
    pub is_user_added: bool,
}

impl Edge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            id: id.into(),
            source_node_id: source.into(),
            target_node_id: target.into(),
            label: String::new(),
            cardinality,
            is_user_added: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source_node_id == node_id || self.target_node_id == node_id
    }

    /// A foreign-key edge held by `node_id`.
    pub fn is_reference_from(&self, node_id: &str) -> bool {
        self.source_node_id == node_id && self.label == REFERENCES
    }

    /// The endpoint opposite `node_id`, if the edge touches it.
    pub fn other_end(&self, node_id: &str) -> Option<&str> {
        if self.source_node_id == node_id {
            Some(&self.target_node_id)
        } else if self.target_node_id == node_id {
            Some(&self.source_node_id)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_rejected_on_foreign() {
        let mut role = KeyRole::None;
        role.set_foreign("customer_id", "Customer", "id").unwrap();
        let err = role.set_primary("customer_id", true).unwrap_err();
        assert!(matches!(err, KeyConflict::AlreadyForeign(_)));
        assert!(role.is_foreign());
    }

    #[test]
    fn test_foreign_rejected_on_primary() {
        let mut role = KeyRole::Primary;
        let err = role.set_foreign("id", "Customer", "id").unwrap_err();
        assert!(matches!(err, KeyConflict::AlreadyPrimary(_)));
        assert_eq!(role, KeyRole::Primary);
    }

    #[test]
    fn test_foreign_requires_reference() {
        let mut role = KeyRole::None;
        let err = role.set_foreign("customer_id", "Customer", "  ").unwrap_err();
        assert!(matches!(err, KeyConflict::IncompleteReference(_)));
        assert_eq!(role, KeyRole::None);
    }

    #[test]
    fn test_column_wire_format() {
        let col = Column::new("customer_id", "BIGINT").references("Customer", "id");
        let json = serde_json::to_value(&col).unwrap();
        assert_eq!(json["foreignKey"], true);
        assert_eq!(json["primaryKey"], false);
        assert_eq!(json["referencedTable"], "Customer");
        assert_eq!(json["dataType"], "BIGINT");
    }

    #[test]
    fn test_conflicting_flags_fail_to_decode() {
        let json = r#"{"name":"id","dataType":"INT","primaryKey":true,"foreignKey":true,
                       "referencedTable":"T","referencedColumn":"id"}"#;
        assert!(serde_json::from_str::<Column>(json).is_err());
    }

    #[test]
    fn test_node_tagged_union() {
        let node = Node::Attribute(AttributeNode::new("a1", "Order", "total", "DECIMAL(10,2)"));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "attribute");
        assert_eq!(json["attributeName"], "total");
        assert_eq!(json["tableName"], "Order");

        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_split_length() {
        assert_eq!(split_length("VARCHAR(255)"), ("VARCHAR".to_string(), Some(255)));
        assert_eq!(split_length("DECIMAL(10,2)"), ("DECIMAL(10,2)".to_string(), None));
        assert_eq!(split_length("text"), ("text".to_string(), None));
    }

    #[test]
    fn test_cardinality_names() {
        assert_eq!(
            serde_json::to_string(&Cardinality::ManyToOne).unwrap(),
            "\"many-to-one\""
        );
        assert_eq!(Cardinality::from_str("one-to-many"), Some(Cardinality::OneToMany));
        assert!(Cardinality::ManyToOne.fk_on_source());
        assert!(!Cardinality::OneToMany.fk_on_source());
    }
}
