//! One-time CSV ingestion into the `Student` table.
//!
//! The CSV header drives the insert: every header must name a writable column of the table once,
//! in any order. Empty cells are stored as NULL. Cells of integer columns must parse as integers;
//! a row holding any other value is skipped, so every stored row reads back as a student record.

use crate::error::StudentPerfError;
use crate::store::{self, INTEGER_COLUMNS, STUDENT_COLUMNS};

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Outcome of an ingestion run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Rows inserted.
    pub inserted: usize,
    /// Rows with a malformed integer or rejected by the database. These are logged and skipped.
    pub failed: usize,
}

/// Check the CSV header against the table columns.
fn header_columns(headers: &csv::StringRecord) -> Result<Vec<String>, StudentPerfError> {
    let mut columns: Vec<String> = Vec::with_capacity(headers.len());
    for header in headers.iter() {
        if !STUDENT_COLUMNS.contains(&header) {
            return Err(StudentPerfError::UnknownColumn {
                column: header.to_string(),
            });
        }
        if columns.iter().any(|column| column == header) {
            return Err(StudentPerfError::DuplicateColumn {
                column: header.to_string(),
            });
        }
        columns.push(header.to_string());
    }
    Ok(columns)
}

/// Convert the cells of one CSV record into values to bind for `columns`.
fn record_values(
    columns: &[String],
    record: &csv::StringRecord,
) -> Result<Vec<Value>, StudentPerfError> {
    columns
        .iter()
        .zip(record.iter())
        .map(|(column, cell)| {
            if cell.is_empty() {
                Ok(Value::Null)
            } else if INTEGER_COLUMNS.contains(&column.as_str()) {
                cell.trim().parse().map(Value::Integer).map_err(|_| {
                    StudentPerfError::Validation(format!(
                        "{column} value {cell:?} is not an integer"
                    ))
                })
            } else {
                Ok(Value::Text(cell.to_string()))
            }
        })
        .collect()
}

fn delimiter_byte(delimiter: char) -> Result<u8, StudentPerfError> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| {
            StudentPerfError::Validation(format!("delimiter {delimiter:?} is not an ASCII character"))
        })
}

/// Insert every CSV record of `input` into the `Student` table.
///
/// All inserts run in one transaction. A row with a malformed integer cell, or one rejected by
/// the database, is logged and counted; a malformed CSV file aborts the whole run.
///
/// # Arguments
///
/// * `connection`: Connection to a database holding the `Student` table
/// * `input`: CSV data with a header row
/// * `delimiter`: CSV field delimiter
pub fn ingest_csv<R: Read>(
    connection: &mut Connection,
    input: R,
    delimiter: char,
) -> Result<IngestSummary, StudentPerfError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_byte(delimiter)?)
        .from_reader(input);
    let columns = header_columns(reader.headers()?)?;
    let sql = format!(
        "INSERT INTO Student ({}) VALUES ({})",
        columns.join(", "),
        vec!["?"; columns.len()].join(", ")
    );

    let transaction = connection.transaction()?;
    let mut summary = IngestSummary::default();
    {
        let mut statement = transaction.prepare(&sql)?;
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            let values = match record_values(&columns, &record) {
                Ok(values) => values,
                Err(err) => {
                    summary.failed += 1;
                    tracing::warn!(row = index + 1, "skipping row: {err}");
                    continue;
                }
            };
            match statement.execute(params_from_iter(values)) {
                Ok(_) => {
                    summary.inserted += 1;
                    tracing::debug!(row = index + 1, "inserted row {:?}", record);
                }
                Err(err) => {
                    summary.failed += 1;
                    tracing::warn!(row = index + 1, "failed to insert row: {err}");
                }
            }
        }
    }
    transaction.commit()?;
    Ok(summary)
}

/// Create the `Student` table in `database` if required and load `csv_file` into it.
///
/// # Arguments
///
/// * `csv_file`: Path to the CSV file
/// * `database`: Path to the SQLite database file
/// * `delimiter`: CSV field delimiter
pub fn ingest_file<P: AsRef<Path>, Q: AsRef<Path>>(
    csv_file: P,
    database: Q,
    delimiter: char,
) -> Result<IngestSummary, StudentPerfError> {
    let input = File::open(csv_file)?;
    let mut connection = store::open_connection(database)?;
    tracing::info!("Student table ready");
    ingest_csv(&mut connection, input, delimiter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StudentFields;
    use crate::store::StudentStore;

    use std::io::Write;

    const STUDENT_CSV: &str = "\
G3,school,sex,age,Medu,G1,G2,Mjob
12,GP,F,18,4,10,11,at_home
16,GP,M,17,,14,15,teacher
";

    #[test]
    fn header_must_name_columns() {
        let headers = csv::StringRecord::from(vec!["school", "lunch"]);
        match header_columns(&headers) {
            Err(StudentPerfError::UnknownColumn { column }) => assert_eq!("lunch", column),
            other => panic!("unexpected result {other:?}"),
        }
        let headers = csv::StringRecord::from(vec!["id", "school"]);
        assert!(header_columns(&headers).is_err());
        let headers = csv::StringRecord::from(vec!["G3", "school"]);
        assert_eq!(vec!["G3", "school"], header_columns(&headers).unwrap());
    }

    #[test]
    fn header_must_not_repeat_columns() {
        let headers = csv::StringRecord::from(vec!["school", "sex", "school"]);
        match header_columns(&headers) {
            Err(StudentPerfError::DuplicateColumn { column }) => assert_eq!("school", column),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn ingest_duplicate_header_inserts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut connection = store::open_connection(dir.path().join("student_perf.db")).unwrap();
        let input = "school,school\nGP,MS\n";
        let result = ingest_csv(&mut connection, input.as_bytes(), ',');
        assert!(matches!(
            result,
            Err(StudentPerfError::DuplicateColumn { column: _ })
        ));
        let count: i64 = connection
            .query_row("SELECT COUNT(*) FROM Student", [], |row| row.get(0))
            .unwrap();
        assert_eq!(0, count);
    }

    #[test]
    fn record_values_parse_integers() {
        let columns = vec!["school".to_string(), "age".to_string(), "G1".to_string()];
        let record = csv::StringRecord::from(vec!["GP", " 18", ""]);
        assert_eq!(
            vec![Value::Text("GP".to_string()), Value::Integer(18), Value::Null],
            record_values(&columns, &record).unwrap()
        );
        let record = csv::StringRecord::from(vec!["GP", "18", "12.5"]);
        assert!(matches!(
            record_values(&columns, &record),
            Err(StudentPerfError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn ingest_skips_non_integer_cells() {
        let dir = tempfile::tempdir().unwrap();
        let database = dir.path().join("student_perf.db");
        let mut connection = store::open_connection(&database).unwrap();
        let input = "school,sex,age,G1\nGP,F,18,10\nGP,M,17,12.5\nMS,F,n/a,9\nMS,M,16,11\n";
        let summary = ingest_csv(&mut connection, input.as_bytes(), ',').unwrap();
        assert_eq!(
            IngestSummary {
                inserted: 2,
                failed: 2
            },
            summary
        );
        drop(connection);

        let store = StudentStore::open(&database).unwrap();
        let students = store.list_all().await.unwrap();
        assert_eq!(2, students.len());
        assert_eq!(Some(10), students[0].fields.g1);
        assert_eq!(Some(11), students[1].fields.g1);
        assert_eq!(1, store.find_by_school("GP".to_string()).await.unwrap().len());
        assert_eq!(Some(10.5), store.get_average_scores().await.unwrap().avg_g1);
    }

    #[test]
    fn delimiter_must_be_ascii() {
        assert_eq!(b';', delimiter_byte(';').unwrap());
        assert!(delimiter_byte('§').is_err());
    }

    #[tokio::test]
    async fn ingest_rows() {
        let dir = tempfile::tempdir().unwrap();
        let database = dir.path().join("student_perf.db");
        let mut connection = store::open_connection(&database).unwrap();
        let summary = ingest_csv(&mut connection, STUDENT_CSV.as_bytes(), ',').unwrap();
        assert_eq!(
            IngestSummary {
                inserted: 2,
                failed: 0
            },
            summary
        );
        drop(connection);

        let store = StudentStore::open(&database).unwrap();
        let students = store.list_all().await.unwrap();
        assert_eq!(2, students.len());
        assert_eq!(
            StudentFields {
                school: Some("GP".to_string()),
                sex: Some("F".to_string()),
                age: Some(18),
                medu: Some(4),
                mjob: Some("at_home".to_string()),
                g1: Some(10),
                g2: Some(11),
                g3: Some(12),
                ..Default::default()
            },
            students[0].fields
        );
        // Empty cells are stored as NULL.
        assert_eq!(None, students[1].fields.medu);
        assert_eq!(Some(16), students[1].fields.g3);
    }

    #[test]
    fn ingest_semicolon_file() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("student-por.csv");
        let mut file = File::create(&csv_path).unwrap();
        write!(file, "{}", STUDENT_CSV.replace(',', ";")).unwrap();
        drop(file);

        let database = dir.path().join("student_perf.db");
        let summary = ingest_file(&csv_path, &database, ';').unwrap();
        assert_eq!(2, summary.inserted);
    }

    #[test]
    fn ingest_unknown_header_inserts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let database = dir.path().join("student_perf.db");
        let mut connection = store::open_connection(&database).unwrap();
        let input = "school,lunch\nGP,free\n";
        let result = ingest_csv(&mut connection, input.as_bytes(), ',');
        assert!(matches!(
            result,
            Err(StudentPerfError::UnknownColumn { column: _ })
        ));
        let count: i64 = connection
            .query_row("SELECT COUNT(*) FROM Student", [], |row| row.get(0))
            .unwrap();
        assert_eq!(0, count);
    }

    #[test]
    fn ingest_ragged_rows_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let database = dir.path().join("student_perf.db");
        let mut connection = store::open_connection(&database).unwrap();
        let input = "school,sex,age\nGP,F,18\nGP,M\n";
        let result = ingest_csv(&mut connection, input.as_bytes(), ',');
        assert!(matches!(result, Err(StudentPerfError::Csv(_))));
        let count: i64 = connection
            .query_row("SELECT COUNT(*) FROM Student", [], |row| row.get(0))
            .unwrap();
        assert_eq!(0, count);
    }

    #[test]
    fn ingest_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ingest_file(
            dir.path().join("missing.csv"),
            dir.path().join("student_perf.db"),
            ',',
        );
        assert!(matches!(result, Err(StudentPerfError::Io(_))));
    }
}
