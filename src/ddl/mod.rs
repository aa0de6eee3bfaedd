//! Schema text in and out: DDL generation from a graph, and a tolerant SQL
//! importer that builds a roster.

mod dialect;
mod generator;
mod lexer;
mod measure;
mod parser;
mod types;

pub use dialect::Dialect;
pub use generator::{generate_ddl, generate_ddl_with, snake_case, DdlOptions};
pub use parser::{parse_sql, SqlParseError};
