use super::{require, EditorError};
use crate::model::{new_id, AttributeNode, KeyConflict, KeyRole, Position};
use crate::store::AttributePatch;

/// Form over one attribute. Key flags are kept as the form shows them and
/// turned into a [`KeyRole`] on validation.
#[derive(Debug, Clone)]
pub struct AttributeEditor {
    node_id: String,
    original: Option<AttributeNode>,
    pub attribute_name: String,
    pub table_name: String,
    pub data_type: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub position: Position,
    is_primary_key: bool,
    is_foreign_key: bool,
}

impl AttributeEditor {
    pub fn create(table_name: impl Into<String>) -> Self {
        Self {
            node_id: new_id("attribute"),
            original: None,
            attribute_name: String::new(),
            table_name: table_name.into(),
            data_type: String::new(),
            referenced_table: String::new(),
            referenced_column: String::new(),
            position: Position::default(),
            is_primary_key: false,
            is_foreign_key: false,
        }
    }

    pub fn open(node: &AttributeNode) -> Self {
        let (referenced_table, referenced_column) = node
            .key
            .reference()
            .map(|(t, c)| (t.to_string(), c.to_string()))
            .unwrap_or_default();
        Self {
            node_id: node.id.clone(),
            original: Some(node.clone()),
            attribute_name: node.attribute_name.clone(),
            table_name: node.table_name.clone(),
            data_type: node.data_type.clone(),
            referenced_table,
            referenced_column,
            position: node.position,
            is_primary_key: node.is_primary_key(),
            is_foreign_key: node.is_foreign_key(),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn is_new(&self) -> bool {
        self.original.is_none()
    }

    pub fn is_primary_key(&self) -> bool {
        self.is_primary_key
    }

    pub fn is_foreign_key(&self) -> bool {
        self.is_foreign_key
    }

    /// Flags stay as they were on rejection.
    pub fn set_primary_key(&mut self, on: bool) -> Result<(), EditorError> {
        if on && self.is_foreign_key {
            return Err(KeyConflict::AlreadyForeign(self.attribute_name.clone()).into());
        }
        self.is_primary_key = on;
        Ok(())
    }

    /// Flags stay as they were on rejection.
    pub fn set_foreign_key(&mut self, on: bool) -> Result<(), EditorError> {
        if on && self.is_primary_key {
            return Err(KeyConflict::AlreadyPrimary(self.attribute_name.clone()).into());
        }
        self.is_foreign_key = on;
        Ok(())
    }

    pub fn key_role(&self) -> Result<KeyRole, EditorError> {
        Ok(KeyRole::from_flags(
            &self.attribute_name,
            self.is_primary_key,
            self.is_foreign_key,
            Some(self.referenced_table.as_str()),
            Some(self.referenced_column.as_str()),
        )?)
    }

    pub fn validate(&self) -> Result<KeyRole, EditorError> {
        require("Attribute name", &self.attribute_name)?;
        require("Table name", &self.table_name)?;
        require("Data type", &self.data_type)?;
        self.key_role()
    }

    /// Whether saving replaces a stored key role.
    pub fn drops_key(&self) -> Result<bool, EditorError> {
        let role = self.key_role()?;
        Ok(self.original.as_ref().is_some_and(|o| o.key.is_key() && o.key != role))
    }

    pub fn original(&self) -> Option<&AttributeNode> {
        self.original.as_ref()
    }

    pub fn to_node(&self) -> Result<AttributeNode, EditorError> {
        let mut node = AttributeNode::new(
            self.node_id.clone(),
            self.table_name.trim(),
            self.attribute_name.trim(),
            self.data_type.trim(),
        );
        node.key = self.validate()?;
        node.position = self.position;
        node.is_user_added = true;
        Ok(node)
    }

    pub fn to_patch(&self) -> Result<AttributePatch, EditorError> {
        Ok(AttributePatch {
            key: Some(self.validate()?),
            attribute_name: Some(self.attribute_name.trim().to_string()),
            table_name: Some(self.table_name.trim().to_string()),
            data_type: Some(self.data_type.trim().to_string()),
            position: Some(self.position),
        })
    }
}
