// In-memory catalog model persisted by `schema_segment`. Grounded in
// original_source's `schema.h` (`schema::Table`, `schema::Column`,
// `schema::Type`) for the model shape, and in the teacher's `Catalog`
// (src/catalog/mod.rs: `create_table`/`get_table`/`drop_table`/
// `list_tables`) for the lookup-by-name API.

use crate::error::{PagebaseError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    Integer,
    Timestamp,
    Numeric { length: u32, precision: u32 },
    Char { length: u32 },
    Varchar { length: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: Type,
    pub not_null: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: Vec<String>,
    pub sp_segment_id: u16,
    pub fsi_segment_id: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub tables: Vec<Table>,
}

impl Catalog {
    pub fn create_table(&mut self, table: Table) -> Result<()> {
        if self.tables.iter().any(|t| t.name == table.name) {
            return Err(PagebaseError::Catalog(format!("table {} already exists", table.name)));
        }
        self.tables.push(table);
        Ok(())
    }

    pub fn get_table(&self, name: &str) -> Result<&Table> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| PagebaseError::Catalog(format!("table {name} not found")))
    }

    pub fn get_table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .iter_mut()
            .find(|t| t.name == name)
            .ok_or_else(|| PagebaseError::Catalog(format!("table {name} not found")))
    }

    pub fn drop_table(&mut self, name: &str) -> Result<Table> {
        let idx = self
            .tables
            .iter()
            .position(|t| t.name == name)
            .ok_or_else(|| PagebaseError::Catalog(format!("table {name} not found")))?;
        Ok(self.tables.remove(idx))
    }

    pub fn list_tables(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_round_trips_through_json() {
        let mut catalog = Catalog::default();
        catalog
            .create_table(Table {
                name: "orders".to_string(),
                columns: vec![
                    Column {
                        name: "id".to_string(),
                        data_type: Type::Integer,
                        not_null: true,
                    },
                    Column {
                        name: "note".to_string(),
                        data_type: Type::Varchar { length: 255 },
                        not_null: false,
                    },
                ],
                primary_key: vec!["id".to_string()],
                sp_segment_id: 10,
                fsi_segment_id: 11,
            })
            .unwrap();

        let json = serde_json::to_vec(&catalog).unwrap();
        let restored: Catalog = serde_json::from_slice(&json).unwrap();
        assert_eq!(restored.get_table("orders").unwrap().columns.len(), 2);
    }

    #[test]
    fn create_table_rejects_duplicate_name_and_list_tables_reports_all() {
        let mut catalog = Catalog::default();
        let table = |name: &str| Table {
            name: name.to_string(),
            columns: vec![],
            primary_key: vec![],
            sp_segment_id: 0,
            fsi_segment_id: 1,
        };
        catalog.create_table(table("a")).unwrap();
        catalog.create_table(table("b")).unwrap();
        assert!(catalog.create_table(table("a")).is_err());
        assert_eq!(catalog.list_tables(), vec!["a", "b"]);

        catalog.drop_table("a").unwrap();
        assert_eq!(catalog.list_tables(), vec!["b"]);
        assert!(catalog.drop_table("a").is_err());
        assert!(catalog.get_table("a").is_err());
    }
}
