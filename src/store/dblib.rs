// database-library descriptor (.kicad_dbl) pointing EDA tools at the generated SQLite file
use std::fs;
use std::path::Path;

use serde_json::{Value, json};
use tracing::info;

use crate::error::StoreError;
use crate::store::Materializer;

fn field(column: &str, name: &str, visible_on_add: bool, visible_in_chooser: bool, show_name: bool) -> Value {
    json!({
        "column": column,
        "name": name,
        "visible_on_add": visible_on_add,
        "visible_in_chooser": visible_in_chooser,
        "show_name": show_name,
    })
}

fn standard_fields() -> Vec<Value> {
    vec![
        field("reference", "Reference", true, true, false),
        field("value", "Value", true, true, false),
        field("description", "Description", false, true, true),
        field("manufacturer", "Manufacturer", false, true, true),
        field("mpn", "MPN", false, true, true),
        field("package", "Package", false, true, true),
        field("datasheet", "Datasheet", false, false, true),
    ]
}

//extra columns worth showing per view
fn view_fields(view: &str) -> Vec<Value> {
    let mut fields = standard_fields();
    let extra: &[(&str, &str)] = match view {
        "resistors" => &[("tolerance", "Tolerance"), ("power", "Power")],
        "capacitors" => &[("voltage", "Voltage"), ("tolerance", "Tolerance")],
        "inductors" => &[("current", "Current")],
        "integrated_circuits" => &[("voltage", "Supply Voltage")],
        "diodes" => &[("voltage", "Voltage"), ("current", "Current")],
        "transistors" => &[("voltage", "Voltage"), ("current", "Current"), ("power", "Power")],
        _ => &[],
    };
    fields.extend(extra.iter().map(|(column, name)| field(column, name, false, true, true)));
    fields
}

fn library(name: &str, table: &str) -> Value {
    json!({
        "name": name,
        "table": table,
        "key": "id",
        "symbols": "symbol",
        "footprints": "footprint",
        "fields": view_fields(table),
    })
}

fn display_name(view: &str) -> String {
    view.split('_')
        .map(|w| {
            let mut c = w.chars();
            match c.next() {
                Some(first) => first.to_uppercase().chain(c).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl Materializer {
    pub fn library_descriptor(&self) -> Value {
        let db = self
            .db_path
            .as_deref()
            .map(|p| fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf()).display().to_string())
            .unwrap_or_else(|| ":memory:".to_string());

        let mut libraries = vec![library("All Components", "components")];
        libraries.extend(Self::view_names().iter().map(|v| library(&display_name(v), v)));

        json!({
            "meta": { "version": 1.0 },
            "name": self.config.library_name,
            "description": self.config.library_description,
            "source": {
                "type": "odbc",
                "dsn": "",
                "username": "",
                "password": "",
                "timeout_seconds": 10,
                "connection_string": format!("Driver=SQLite3;Database={db};"),
            },
            "libraries": libraries,
        })
    }

    pub fn write_library_descriptor(&self, path: &Path) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(&self.library_descriptor())?;
        fs::write(path, text).map_err(|source| StoreError::Io { path: path.to_path_buf(), source })?;
        info!(path = %path.display(), "wrote library descriptor");
        Ok(())
    }
}
