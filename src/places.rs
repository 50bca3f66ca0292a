use _model::{PlaceRecord, Validated};
use rusqlite::{params, Connection, Transaction};
use tracing::{debug, trace};

use crate::db::Result;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub processed: usize,
    pub new_places: usize,
    pub rejected: usize,
}

pub struct PlaceStore<'a> {
    conn: &'a Connection,
}

impl<'a> PlaceStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Merges a batch of search results into the store. Places, types and
    /// their associations are insert-or-ignore, so overlapping batches and
    /// full re-runs leave the store as the first application did. Records
    /// without an id or a name are skipped.
    pub fn upsert_batch(&self, records: &[PlaceRecord]) -> Result<BatchOutcome> {
        let tx = self.conn.unchecked_transaction()?;
        let mut outcome = BatchOutcome {
            processed: records.len(),
            ..Default::default()
        };

        for record in records {
            let place = match record.validate() {
                Validated::Accepted(x) => x,
                Validated::Rejected(reason) => {
                    trace!(?reason, place_id = ?record.place_id, "skipping record");
                    outcome.rejected += 1;
                    continue;
                }
            };

            let inserted = tx
                .prepare_cached("INSERT OR IGNORE INTO places (place_id, name) VALUES (?1, ?2)")?
                .execute(params![place.place_id, place.name])?;
            if inserted > 0 {
                outcome.new_places += 1;
            }

            for type_name in &place.types {
                let type_id = type_id(&tx, type_name)?;
                tx.prepare_cached(
                    "INSERT OR IGNORE INTO place_types (place_id, type_id) VALUES (?1, ?2)",
                )?
                .execute(params![place.place_id, type_id])?;
            }
        }
        tx.commit()?;

        debug!(
            processed = outcome.processed,
            new_places = outcome.new_places,
            rejected = outcome.rejected,
            "stored batch"
        );
        Ok(outcome)
    }

    pub fn types_of(&self, place_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.type_name FROM place_types pt
             JOIN types t ON t.type_id = pt.type_id
             WHERE pt.place_id = ?1
             ORDER BY t.type_name",
        )?;
        let rows = stmt.query_map([place_id], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }
}

fn type_id(tx: &Transaction, type_name: &str) -> Result<i64> {
    tx.prepare_cached("INSERT OR IGNORE INTO types (type_name) VALUES (?1)")?
        .execute([type_name])?;
    Ok(tx
        .prepare_cached("SELECT type_id FROM types WHERE type_name = ?1")?
        .query_row([type_name], |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, Summary};

    #[test]
    fn duplicate_place_in_one_batch() {
        let conn = db::open_in_memory().unwrap();
        let store = PlaceStore::new(&conn);
        let outcome = store
            .upsert_batch(&[
                PlaceRecord::new("A", "Cafe", &["cafe", "food"]),
                PlaceRecord::new("A", "Cafe", &["cafe"]),
            ])
            .unwrap();

        assert_eq!(
            outcome,
            BatchOutcome {
                processed: 2,
                new_places: 1,
                rejected: 0
            }
        );
        let summary = db::summary(&conn).unwrap();
        assert_eq!((summary.places, summary.types, summary.associations), (1, 2, 2));
    }

    #[test]
    fn second_application_changes_nothing() {
        let conn = db::open_in_memory().unwrap();
        let store = PlaceStore::new(&conn);
        let batch = [
            PlaceRecord::new("A", "Cafe", &["cafe", "food"]),
            PlaceRecord::new("B", "Bakery", &["bakery", "food"]),
            PlaceRecord::new("C", "Park", &[]),
        ];

        let first = store.upsert_batch(&batch).unwrap();
        assert_eq!(first.new_places, 3);
        let before = db::summary(&conn).unwrap();

        let second = store.upsert_batch(&batch).unwrap();
        assert_eq!(second.new_places, 0);
        assert_eq!(db::summary(&conn).unwrap(), before);
    }

    #[test]
    fn shared_type() {
        let conn = db::open_in_memory().unwrap();
        let store = PlaceStore::new(&conn);
        store
            .upsert_batch(&[
                PlaceRecord::new("A", "Cafe", &["food"]),
                PlaceRecord::new("B", "Bakery", &["food"]),
            ])
            .unwrap();

        let summary = db::summary(&conn).unwrap();
        assert_eq!(summary.types, 1);
        assert_eq!(summary.associations, 2);
        assert_eq!(store.types_of("A").unwrap(), vec!["food".to_string()]);
        assert_eq!(store.types_of("B").unwrap(), vec!["food".to_string()]);
    }

    #[test]
    fn malformed_records_leave_no_rows() {
        let conn = db::open_in_memory().unwrap();
        let store = PlaceStore::new(&conn);
        let no_id = PlaceRecord {
            place_id: None,
            name: Some("Cafe".to_string()),
            types: vec!["cafe".to_string()],
        };
        let no_name = PlaceRecord {
            place_id: Some("A".to_string()),
            name: None,
            types: vec!["cafe".to_string()],
        };

        let outcome = store.upsert_batch(&[no_id, no_name]).unwrap();
        assert_eq!(
            outcome,
            BatchOutcome {
                processed: 2,
                new_places: 0,
                rejected: 2
            }
        );
        assert_eq!(db::summary(&conn).unwrap(), Summary::default());
    }

    #[test]
    fn later_sightings_add_types() {
        let conn = db::open_in_memory().unwrap();
        let store = PlaceStore::new(&conn);
        store
            .upsert_batch(&[PlaceRecord::new("A", "Cafe", &["cafe"])])
            .unwrap();
        let outcome = store
            .upsert_batch(&[PlaceRecord::new("A", "Cafe Renamed", &["cafe", "bar"])])
            .unwrap();

        assert_eq!(outcome.new_places, 0);
        assert_eq!(
            store.types_of("A").unwrap(),
            vec!["bar".to_string(), "cafe".to_string()]
        );
        let name: String = conn
            .query_row("SELECT name FROM places WHERE place_id = 'A'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(name, "Cafe");
    }
}
