//! DDL generation from graph contents.
//!
//! Output depends only on node order, edge order and the options, so two
//! calls over the same graph produce identical text.

use super::measure::{pad_to, text_width};
use super::types::render_type;
use super::Dialect;
use crate::model::{Column, Edge, Node};
use crate::view::{gather_tables, TableShape};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DdlOptions {
    pub dialect: Dialect,
    /// Pad column names so types line up.
    pub align_columns: bool,
}

impl Default for DdlOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::Generic,
            align_columns: true,
        }
    }
}

struct ForeignKey {
    name: String,
    table: String,
    column: String,
    target: String,
    target_column: String,
}

/// Generate generic DDL with aligned columns.
pub fn generate_ddl(nodes: &[Node], edges: &[Edge]) -> String {
    generate_ddl_with(nodes, edges, &DdlOptions::default())
}

pub fn generate_ddl_with(nodes: &[Node], edges: &[Edge], options: &DdlOptions) -> String {
    let dialect = options.dialect.for_output();
    let mut shapes = gather_tables(nodes);
    let foreign_keys = plan_foreign_keys(nodes, edges, &mut shapes, dialect);
    let covered: HashSet<(&str, &str)> = foreign_keys
        .iter()
        .map(|fk| (fk.table.as_str(), fk.column.as_str()))
        .collect();

    let tables: HashSet<&str> = shapes.iter().map(|s| s.name.as_str()).collect();

    let mut output = String::new();
    for (i, shape) in shapes.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        write_table(&mut output, shape, &covered, &tables, dialect, options.align_columns);
    }

    if !foreign_keys.is_empty() {
        output.push('\n');
        for fk in &foreign_keys {
            output.push_str(&format!(
                "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({});\n",
                dialect.quote_ident(&fk.table),
                dialect.quote_ident(&fk.name),
                dialect.quote_ident(&fk.column),
                dialect.quote_ident(&fk.target),
                dialect.quote_ident(&fk.target_column),
            ));
        }
    }

    output
}

/// One foreign key per resolvable edge. Edges without a key column on the
/// holding side get an implied `<target>_id` column appended to that table.
fn plan_foreign_keys(nodes: &[Node], edges: &[Edge], shapes: &mut [TableShape], dialect: Dialect) -> Vec<ForeignKey> {
    let by_id: HashMap<&str, &Node> = nodes.iter().map(|n| (n.id(), n)).collect();
    let index: HashMap<String, usize> = shapes.iter().enumerate().map(|(i, s)| (s.name.clone(), i)).collect();
    let mut foreign_keys = Vec::new();

    for (i, edge) in edges.iter().enumerate() {
        let (Some(source), Some(target)) = (
            by_id.get(edge.source_node_id.as_str()),
            by_id.get(edge.target_node_id.as_str()),
        ) else {
            tracing::warn!(edge = %edge.id, "skipping edge with a missing endpoint");
            continue;
        };
        let (holder, referenced) = if edge.cardinality.fk_on_source() {
            (*source, *target)
        } else {
            (*target, *source)
        };
        let (holder_table, holder_column) = endpoint(holder);
        let (target_table, target_column) = endpoint(referenced);
        let (Some(&holder_idx), Some(&target_idx)) = (index.get(holder_table), index.get(target_table)) else {
            continue;
        };

        // A key attribute pointing at a table node names its column itself.
        let declared = match holder {
            Node::Attribute(a) => a.key.reference().filter(|(t, _)| *t == target_table).map(|(_, c)| c),
            Node::Table(_) => None,
        };
        let target_shape = &shapes[target_idx];
        let target_column = target_column
            .or(declared)
            .map(str::to_string)
            .or_else(|| {
                target_shape
                    .columns
                    .iter()
                    .find(|c| c.is_primary_key())
                    .map(|c| c.name.clone())
            })
            .unwrap_or_else(|| "id".to_string());
        let (ref_type, ref_length) = match target_shape.columns.iter().find(|c| c.name == target_column) {
            Some(c) => (c.data_type.clone(), c.length),
            None if target_shape.columns.is_empty() => (dialect.identity_reference_type().to_string(), None),
            None => ("INTEGER".to_string(), None),
        };

        let holder_shape = &mut shapes[holder_idx];
        let column = match holder_column {
            Some(c) => c.to_string(),
            None => {
                let existing = holder_shape
                    .columns
                    .iter()
                    .find(|c| c.key.reference().is_some_and(|(t, _)| t == target_table))
                    .map(|c| c.name.clone());
                match existing {
                    Some(name) => name,
                    None => {
                        let implied = format!("{}_id", snake_case(target_table));
                        if holder_shape.columns.iter().all(|c| c.name != implied) {
                            let mut col = Column::new(implied.clone(), ref_type).references(target_table, &target_column);
                            col.length = ref_length;
                            holder_shape.columns.push(col);
                        }
                        implied
                    }
                }
            }
        };

        foreign_keys.push(ForeignKey {
            name: format!("fk_{}_{}_{}", snake_case(holder_table), snake_case(target_table), i),
            table: holder_table.to_string(),
            column,
            target: target_table.to_string(),
            target_column,
        });
    }

    foreign_keys
}

/// Table and, for attribute nodes, column an edge end stands for.
fn endpoint(node: &Node) -> (&str, Option<&str>) {
    match node {
        Node::Table(t) => (&t.table_name, None),
        Node::Attribute(a) => (&a.table_name, Some(&a.attribute_name)),
    }
}

fn write_table(
    output: &mut String,
    shape: &TableShape,
    covered: &HashSet<(&str, &str)>,
    tables: &HashSet<&str>,
    dialect: Dialect,
    align: bool,
) {
    write_comment(output, &shape.description, "");
    output.push_str(&format!("CREATE TABLE {} (\n", dialect.quote_ident(&shape.name)));

    let primary: Vec<&Column> = shape.columns.iter().filter(|c| c.is_primary_key()).collect();
    let inline_pk = primary.len() == 1;

    let mut rows: Vec<(String, String, String)> = Vec::new();
    if shape.columns.is_empty() {
        rows.push((String::new(), "id".to_string(), dialect.identity_column().to_string()));
    }
    for col in &shape.columns {
        let mut def = render_type(&col.data_type, col.length, dialect);
        if inline_pk && col.is_primary_key() {
            def.push_str(" PRIMARY KEY");
        } else if !col.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some((table, column)) = col.key.reference() {
            if !tables.contains(table) {
                tracing::warn!(
                    table = %shape.name,
                    column = %col.name,
                    target = table,
                    "dropping reference to a missing table"
                );
            } else if !covered.contains(&(shape.name.as_str(), col.name.as_str())) {
                def.push_str(&format!(
                    " REFERENCES {} ({})",
                    dialect.quote_ident(table),
                    dialect.quote_ident(column)
                ));
            }
        }
        let mut comment = String::new();
        write_comment(&mut comment, col.description.as_deref().unwrap_or_default(), "  ");
        rows.push((comment, dialect.quote_ident(&col.name), def));
    }

    let width = if align {
        rows.iter().map(|(_, name, _)| text_width(name)).max().unwrap_or(0)
    } else {
        0
    };
    let mut entries: Vec<String> = rows
        .into_iter()
        .map(|(comment, name, def)| format!("{}  {} {}", comment, pad_to(&name, width), def))
        .collect();
    if primary.len() > 1 {
        let names: Vec<String> = primary.iter().map(|c| dialect.quote_ident(&c.name)).collect();
        entries.push(format!("  PRIMARY KEY ({})", names.join(", ")));
    }

    output.push_str(&entries.join(",\n"));
    output.push_str("\n);\n");
}

fn write_comment(output: &mut String, text: &str, indent: &str) {
    for line in text.lines().map(str::trim_end).filter(|l| !l.trim().is_empty()) {
        output.push_str(&format!("{}-- {}\n", indent, line.trim_start()));
    }
}

/// `OrderItem` -> `order_item`, `line item` -> `line_item`.
pub fn snake_case(name: &str) -> String {
    let mut out = String::new();
    let mut prev: Option<char> = None;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if c.is_uppercase() && prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit()) {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
        prev = Some(c);
    }
    out.trim_end_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::parse_sql;
    use crate::model::{AttributeNode, Cardinality, KeyRole, TableNode};
    use crate::roster::{SourceModel, SourceRelationship, SourceTable};
    use crate::view::{GraphProjection, ViewLevel};

    fn shop() -> SourceModel {
        SourceModel {
            tables: vec![
                SourceTable::new(
                    "Customer",
                    vec![
                        Column::new("id", "BIGINT").primary_key(),
                        Column::new("email", "VARCHAR").with_length(255).not_null(),
                    ],
                ),
                SourceTable::new(
                    "Order",
                    vec![
                        Column::new("id", "BIGINT").primary_key(),
                        Column::new("customer_id", "BIGINT").not_null().references("Customer", "id"),
                    ],
                ),
            ],
            relationships: vec![SourceRelationship::new("Customer", "Order", Cardinality::OneToMany)],
        }
    }

    #[test]
    fn test_table_view_output() {
        let p = GraphProjection::from_roster(&shop(), ViewLevel::Table);
        let ddl = generate_ddl(&p.nodes, &p.edges);
        let expected = "\
CREATE TABLE Customer (
  id    BIGINT PRIMARY KEY,
  email VARCHAR(255) NOT NULL
);

CREATE TABLE \"Order\" (
  id          BIGINT PRIMARY KEY,
  customer_id BIGINT NOT NULL
);

ALTER TABLE \"Order\" ADD CONSTRAINT fk_order_customer_0 FOREIGN KEY (customer_id) REFERENCES Customer (id);
";
        assert_eq!(ddl, expected);
    }

    #[test]
    fn test_deterministic() {
        let p = GraphProjection::from_roster(&shop(), ViewLevel::Attribute);
        assert_eq!(generate_ddl(&p.nodes, &p.edges), generate_ddl(&p.nodes, &p.edges));
    }

    #[test]
    fn test_zero_columns_fallback() {
        let nodes = vec![Node::Table(TableNode::new("t1", "Audit"))];
        for (dialect, column) in [
            (Dialect::Generic, "id INTEGER PRIMARY KEY"),
            (Dialect::PostgreSQL, "id SERIAL PRIMARY KEY"),
            (Dialect::MySQL, "id INT AUTO_INCREMENT PRIMARY KEY"),
        ] {
            let options = DdlOptions {
                dialect,
                align_columns: true,
            };
            let ddl = generate_ddl_with(&nodes, &[], &options);
            assert_eq!(ddl, format!("CREATE TABLE Audit (\n  {}\n);\n", column));
        }
    }

    #[test]
    fn test_implied_column() {
        let nodes = vec![
            Node::Table(TableNode::new("o", "Order").with_columns(vec![Column::new("id", "BIGINT").primary_key()])),
            Node::Table(
                TableNode::new("p", "Payment").with_columns(vec![Column::new("payment_id", "BIGINT").primary_key()]),
            ),
        ];
        // Order 1-n Payment: Payment holds the key
        let edges = vec![Edge::new("e", "o", "p", Cardinality::OneToMany)];
        let ddl = generate_ddl(&nodes, &edges);
        assert!(ddl.contains("  order_id   BIGINT\n"));
        assert!(ddl.contains(
            "ALTER TABLE Payment ADD CONSTRAINT fk_payment_order_0 FOREIGN KEY (order_id) REFERENCES \"Order\" (id);"
        ));
    }

    #[test]
    fn test_composite_primary_key() {
        let nodes = vec![Node::Table(TableNode::new("l", "LineItem").with_columns(vec![
            Column::new("order_id", "INTEGER").primary_key(),
            Column::new("item_id", "INTEGER").primary_key(),
        ]))];
        let options = DdlOptions {
            dialect: Dialect::Generic,
            align_columns: false,
        };
        let ddl = generate_ddl_with(&nodes, &[], &options);
        assert_eq!(
            ddl,
            "CREATE TABLE LineItem (\n  order_id INTEGER NOT NULL,\n  item_id INTEGER NOT NULL,\n  PRIMARY KEY (order_id, item_id)\n);\n"
        );
    }

    #[test]
    fn test_attribute_edges_use_columns() {
        let mut fk = AttributeNode::new("a2", "Order", "buyer", "BIGINT");
        fk.key = KeyRole::Foreign {
            table: "Customer".into(),
            column: "id".into(),
        };
        let mut pk = AttributeNode::new("a1", "Customer", "id", "BIGINT");
        pk.key = KeyRole::Primary;
        let nodes = vec![Node::Attribute(pk), Node::Attribute(fk)];
        let edges = vec![Edge::new("e", "a2", "a1", Cardinality::ManyToOne)];

        let ddl = generate_ddl(&nodes, &edges);
        assert!(ddl.contains("CREATE TABLE Customer (\n  id BIGINT PRIMARY KEY\n);"));
        assert!(ddl.contains("FOREIGN KEY (buyer) REFERENCES Customer (id);"));
        assert!(!ddl.contains("buyer BIGINT REFERENCES"));
    }

    #[test]
    fn test_uncovered_reference_inline() {
        let mut roster = shop();
        roster.relationships.clear();
        let p = GraphProjection::from_roster(&roster, ViewLevel::Table);
        let ddl = generate_ddl(&p.nodes, &p.edges);
        assert!(ddl.contains("customer_id BIGINT NOT NULL REFERENCES Customer (id)"));
        assert!(!ddl.contains("ALTER TABLE"));
    }

    #[test]
    fn test_reference_to_missing_table_dropped() {
        let mut roster = shop();
        roster.relationships.clear();
        roster.tables.remove(0);
        let p = GraphProjection::from_roster(&roster, ViewLevel::Table);
        let ddl = generate_ddl(&p.nodes, &p.edges);
        assert!(ddl.contains("customer_id BIGINT NOT NULL\n"));
        assert!(!ddl.contains("REFERENCES"));
    }

    #[test]
    fn test_descriptions_and_wide_names() {
        let mut table = TableNode::new("t", "顧客").with_columns(vec![
            Column::new("名前", "TEXT").with_description("display name"),
            Column::new("id", "INTEGER").primary_key(),
        ]);
        table.description = "Customers".into();
        let ddl = generate_ddl(&[Node::Table(table)], &[]);
        assert_eq!(
            ddl,
            "-- Customers\nCREATE TABLE \"顧客\" (\n  -- display name\n  \"名前\" TEXT,\n  id     INTEGER PRIMARY KEY\n);\n"
        );
    }

    #[test]
    fn test_mysql_quoting() {
        let p = GraphProjection::from_roster(&shop(), ViewLevel::Table);
        let options = DdlOptions {
            dialect: Dialect::MySQL,
            align_columns: true,
        };
        let ddl = generate_ddl_with(&p.nodes, &p.edges, &options);
        assert!(ddl.contains("CREATE TABLE `Order` ("));
    }

    #[test]
    fn test_reimport() {
        let roster = shop();
        let p = GraphProjection::from_roster(&roster, ViewLevel::Table);
        let back = parse_sql(&generate_ddl(&p.nodes, &p.edges), Dialect::Auto).unwrap();
        assert_eq!(back.tables, roster.tables);
        assert_eq!(back.relationships.len(), 1);
        assert!(back.relationships[0].joins("Customer", "Order"));
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("OrderItem"), "order_item");
        assert_eq!(snake_case("line item"), "line_item");
        assert_eq!(snake_case("Customer"), "customer");
        assert_eq!(snake_case("v2Data"), "v2_data");
    }
}
