pub mod artifacts;
pub mod audit;
pub mod changes;
pub mod collab;
pub mod config;
pub mod ddl;
pub mod editor;
pub mod export;
pub mod import;
pub mod model;
pub mod roster;
pub mod search;
pub mod session;
pub mod store;
pub mod view;

use wasm_bindgen::prelude::*;

use ddl::{generate_ddl_with, parse_sql, DdlOptions, Dialect};
use roster::SourceModel;
use view::{GraphProjection, ViewLevel};

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Render DDL for a roster given as JSON
#[wasm_bindgen(js_name = "rosterToDdl")]
pub fn roster_to_ddl(
    roster: &str,
    view: Option<String>,
    dialect: Option<String>,
) -> Result<String, String> {
    let roster = SourceModel::from_json(roster).map_err(|e| e.to_string())?;
    let view = parse_view(view.as_deref())?;
    let options = output_options(dialect.as_deref(), Dialect::Generic)?;

    let projection = GraphProjection::from_roster(&roster, view);
    Ok(generate_ddl_with(&projection.nodes, &projection.edges, &options))
}

/// Normalize SQL DDL: parse it and generate it again
#[wasm_bindgen(js_name = "sqlToDdl")]
pub fn sql_to_ddl(sql: &str, dialect: Option<String>) -> Result<String, String> {
    let input_dialect = match dialect.as_deref() {
        Some(d) => Dialect::from_str(d).ok_or_else(|| format!("Unknown dialect: {}", d))?,
        None => Dialect::Auto,
    };
    let roster = parse_sql(sql, input_dialect).map_err(|e| e.to_string())?;
    let options = DdlOptions {
        dialect: input_dialect.resolve(sql).for_output(),
        ..DdlOptions::default()
    };

    let projection = GraphProjection::from_roster(&roster, ViewLevel::Table);
    Ok(generate_ddl_with(&projection.nodes, &projection.edges, &options))
}

fn parse_view(view: Option<&str>) -> Result<ViewLevel, String> {
    match view {
        Some(v) => ViewLevel::from_str(v).ok_or_else(|| format!("Unknown view: {}", v)),
        None => Ok(ViewLevel::Table),
    }
}

fn output_options(dialect: Option<&str>, fallback: Dialect) -> Result<DdlOptions, String> {
    let dialect = match dialect {
        Some(d) => Dialect::from_str(d).ok_or_else(|| format!("Unknown dialect: {}", d))?,
        None => fallback,
    };
    Ok(DdlOptions {
        dialect: dialect.for_output(),
        ..DdlOptions::default()
    })
}
