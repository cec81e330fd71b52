// target database layout
use tracing::{debug, info};

use crate::error::StoreError;
use crate::store::Materializer;

const VIEWS: [&str; 6] = ["resistors", "capacitors", "inductors", "integrated_circuits", "diodes", "transistors"];

const CREATE_TABLES: &str = "
CREATE TABLE categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    parent_id INTEGER REFERENCES categories(id)
);

CREATE TABLE components (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT NOT NULL,
    footprint TEXT NOT NULL,
    reference TEXT NOT NULL,
    value TEXT,
    description TEXT,
    keywords TEXT,
    manufacturer TEXT,
    mpn TEXT,
    datasheet TEXT,
    supplier TEXT,
    spn TEXT,
    package TEXT,
    voltage TEXT,
    current TEXT,
    power TEXT,
    tolerance TEXT,
    temperature TEXT,
    category_id INTEGER REFERENCES categories(id),
    confidence REAL,
    original_raw_symbol TEXT,
    original_raw_footprint TEXT,
    category TEXT,
    subcategory TEXT,
    exclude_from_board BOOLEAN DEFAULT 0,
    exclude_from_bom BOOLEAN DEFAULT 0,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX idx_components_symbol ON components(symbol);
CREATE INDEX idx_components_footprint ON components(footprint);
CREATE INDEX idx_components_mpn ON components(mpn);
CREATE INDEX idx_components_manufacturer ON components(manufacturer);
CREATE INDEX idx_components_category ON components(category_id);
CREATE INDEX idx_components_reference ON components(reference);
";

const CREATE_VIEWS: &str = "
CREATE VIEW resistors AS
SELECT * FROM components
WHERE LOWER(description) LIKE '%resistor%'
   OR symbol LIKE '%:R%'
   OR LOWER(keywords) LIKE '%resistor%';

CREATE VIEW capacitors AS
SELECT * FROM components
WHERE LOWER(description) LIKE '%capacitor%'
   OR symbol LIKE '%:C%'
   OR LOWER(keywords) LIKE '%capacitor%';

CREATE VIEW inductors AS
SELECT * FROM components
WHERE LOWER(description) LIKE '%inductor%'
   OR symbol LIKE '%:L%'
   OR LOWER(keywords) LIKE '%inductor%';

CREATE VIEW integrated_circuits AS
SELECT * FROM components
WHERE LOWER(description) LIKE '%ic%'
   OR LOWER(description) LIKE '%microcontroller%'
   OR LOWER(description) LIKE '%processor%'
   OR symbol LIKE '%:U%';

CREATE VIEW diodes AS
SELECT * FROM components
WHERE LOWER(description) LIKE '%diode%'
   OR symbol LIKE '%:D%'
   OR LOWER(keywords) LIKE '%diode%';

CREATE VIEW transistors AS
SELECT * FROM components
WHERE LOWER(description) LIKE '%transistor%'
   OR LOWER(description) LIKE '%mosfet%'
   OR LOWER(description) LIKE '%fet%'
   OR symbol LIKE '%:Q%';
";

impl Materializer {
    /// Drop and recreate categories, components, their indices and the per-kind views.
    pub fn create_schema(&self) -> Result<(), StoreError> {
        info!("creating database schema");

        let mut drop = String::new();
        for view in VIEWS {
            drop.push_str(&format!("DROP VIEW IF EXISTS {view};\n"));
        }
        drop.push_str("DROP TABLE IF EXISTS components;\nDROP TABLE IF EXISTS categories;\n");

        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(&drop)?;
        debug!("creating tables and indices");
        tx.execute_batch(CREATE_TABLES)?;
        debug!("creating component views");
        tx.execute_batch(CREATE_VIEWS)?;
        tx.commit()?;
        Ok(())
    }

    pub fn view_names() -> &'static [&'static str] {
        &VIEWS
    }
}
