//! Record store
//!
//! [StudentStore] owns the single `Student` table of a SQLite database. Every operation is
//! exposed as an async function that runs one statement on a blocking worker thread, so request
//! handlers can await it without stalling the runtime.

use crate::error::StudentPerfError;
use crate::models::{
    AverageScores, CategoryPerformance, FilterCriteria, GenderPerformance, Grades, StudentFields,
    StudentRecord,
};

use lazy_static::lazy_static;
use rusqlite::types::{ToSql, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use validator::Validate;

/// Writable columns of the `Student` table, in declaration order.
pub const STUDENT_COLUMNS: [&str; 33] = [
    "school",
    "sex",
    "age",
    "address",
    "famsize",
    "Pstatus",
    "Medu",
    "Fedu",
    "Mjob",
    "Fjob",
    "reason",
    "guardian",
    "traveltime",
    "studytime",
    "failures",
    "schoolsup",
    "famsup",
    "paid",
    "activities",
    "nursery",
    "higher",
    "internet",
    "romantic",
    "famrel",
    "freetime",
    "goout",
    "Dalc",
    "Walc",
    "health",
    "absences",
    "G1",
    "G2",
    "G3",
];

/// Columns of [STUDENT_COLUMNS] that hold integers.
pub const INTEGER_COLUMNS: [&str; 16] = [
    "age",
    "Medu",
    "Fedu",
    "traveltime",
    "studytime",
    "failures",
    "famrel",
    "freetime",
    "goout",
    "Dalc",
    "Walc",
    "health",
    "absences",
    "G1",
    "G2",
    "G3",
];

const CREATE_STUDENT_TABLE: &str = "CREATE TABLE IF NOT EXISTS Student (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    school TEXT,
    sex TEXT,
    age NUMERIC,
    address TEXT,
    famsize TEXT,
    Pstatus TEXT,
    Medu NUMERIC,
    Fedu NUMERIC,
    Mjob TEXT,
    Fjob TEXT,
    reason TEXT,
    guardian TEXT,
    traveltime NUMERIC,
    studytime NUMERIC,
    failures NUMERIC,
    schoolsup TEXT,
    famsup TEXT,
    paid TEXT,
    activities TEXT,
    nursery TEXT,
    higher TEXT,
    internet TEXT,
    romantic TEXT,
    famrel NUMERIC,
    freetime NUMERIC,
    goout NUMERIC,
    Dalc NUMERIC,
    Walc NUMERIC,
    health NUMERIC,
    absences NUMERIC,
    G1 NUMERIC,
    G2 NUMERIC,
    G3 NUMERIC
);";

/// Grade averages selected by every aggregate query.
const AVERAGE_COLUMNS: &str = "AVG(G1) AS avgG1, AVG(G2) AS avgG2, AVG(G3) AS avgG3";

pub const CREATE_REQUIRED_MESSAGE: &str =
    "Required information (school, sex, age) is missing for creating a new student";
pub const UPDATE_REQUIRED_MESSAGE: &str =
    "Required information (school, sex, age) is missing for updating the student";
pub const FILTER_CRITERIA_MISSING_MESSAGE: &str = "Filter criteria is missing";

lazy_static! {
    static ref INSERT_STUDENT: String = format!(
        "INSERT INTO Student ({}) VALUES ({})",
        STUDENT_COLUMNS.join(", "),
        vec!["?"; STUDENT_COLUMNS.len()].join(", ")
    );
    static ref UPDATE_STUDENT: String = format!(
        "UPDATE Student SET {} WHERE id = ?",
        STUDENT_COLUMNS
            .iter()
            .map(|column| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ")
    );
}

/// Open a SQLite database file, creating the `Student` table if it does not exist.
///
/// # Arguments
///
/// * `path`: Path to the database file
pub fn open_connection<P: AsRef<Path>>(path: P) -> Result<Connection, StudentPerfError> {
    let connection = Connection::open(path)?;
    connection.execute_batch(CREATE_STUDENT_TABLE)?;
    Ok(connection)
}

/// Check that the fields required by create and update are present.
///
/// # Arguments
///
/// * `fields`: Fields supplied by the client
/// * `message`: Error message to return if a required field is missing
pub fn require_fields(fields: &StudentFields, message: &str) -> Result<(), StudentPerfError> {
    fields
        .validate()
        .map_err(|_| StudentPerfError::Validation(message.to_string()))
}

/// Whether `name` may be spliced into SQL as a bare column name.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Bind values for [STUDENT_COLUMNS], in the same order.
fn column_values(fields: &StudentFields) -> [&dyn ToSql; 33] {
    [
        &fields.school,
        &fields.sex,
        &fields.age,
        &fields.address,
        &fields.famsize,
        &fields.pstatus,
        &fields.medu,
        &fields.fedu,
        &fields.mjob,
        &fields.fjob,
        &fields.reason,
        &fields.guardian,
        &fields.traveltime,
        &fields.studytime,
        &fields.failures,
        &fields.schoolsup,
        &fields.famsup,
        &fields.paid,
        &fields.activities,
        &fields.nursery,
        &fields.higher,
        &fields.internet,
        &fields.romantic,
        &fields.famrel,
        &fields.freetime,
        &fields.goout,
        &fields.dalc,
        &fields.walc,
        &fields.health,
        &fields.absences,
        &fields.g1,
        &fields.g2,
        &fields.g3,
    ]
}

/// Map a `SELECT *` row of the `Student` table to a [StudentRecord].
fn student_from_row(row: &Row) -> rusqlite::Result<StudentRecord> {
    Ok(StudentRecord {
        id: row.get("id")?,
        fields: StudentFields {
            school: row.get("school")?,
            sex: row.get("sex")?,
            age: row.get("age")?,
            address: row.get("address")?,
            famsize: row.get("famsize")?,
            pstatus: row.get("Pstatus")?,
            medu: row.get("Medu")?,
            fedu: row.get("Fedu")?,
            mjob: row.get("Mjob")?,
            fjob: row.get("Fjob")?,
            reason: row.get("reason")?,
            guardian: row.get("guardian")?,
            traveltime: row.get("traveltime")?,
            studytime: row.get("studytime")?,
            failures: row.get("failures")?,
            schoolsup: row.get("schoolsup")?,
            famsup: row.get("famsup")?,
            paid: row.get("paid")?,
            activities: row.get("activities")?,
            nursery: row.get("nursery")?,
            higher: row.get("higher")?,
            internet: row.get("internet")?,
            romantic: row.get("romantic")?,
            famrel: row.get("famrel")?,
            freetime: row.get("freetime")?,
            goout: row.get("goout")?,
            dalc: row.get("Dalc")?,
            walc: row.get("Walc")?,
            health: row.get("health")?,
            absences: row.get("absences")?,
            g1: row.get("G1")?,
            g2: row.get("G2")?,
            g3: row.get("G3")?,
        },
    })
}

fn grades_from_row(row: &Row) -> rusqlite::Result<Grades> {
    Ok(Grades {
        g1: row.get("G1")?,
        g2: row.get("G2")?,
        g3: row.get("G3")?,
    })
}

fn averages_from_row(row: &Row) -> rusqlite::Result<AverageScores> {
    Ok(AverageScores {
        avg_g1: row.get("avgG1")?,
        avg_g2: row.get("avgG2")?,
        avg_g3: row.get("avgG3")?,
    })
}

/// Convert a dynamically typed SQLite value into JSON.
fn json_value(value: Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => i.into(),
        Value::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => s.into(),
        Value::Blob(b) => b.into(),
    }
}

/// Store of student records backed by a single SQLite connection.
///
/// Cloning is cheap; clones share the connection.
#[derive(Clone, Debug)]
pub struct StudentStore {
    connection: Arc<Mutex<Connection>>,
}

impl StudentStore {
    /// Open a store on a database file, creating the `Student` table if required.
    ///
    /// # Arguments
    ///
    /// * `path`: Path to the database file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StudentPerfError> {
        Ok(Self::from_connection(open_connection(path)?))
    }

    /// Open a store on a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StudentPerfError> {
        let connection = Connection::open_in_memory()?;
        connection.execute_batch(CREATE_STUDENT_TABLE)?;
        Ok(Self::from_connection(connection))
    }

    fn from_connection(connection: Connection) -> Self {
        Self {
            connection: Arc::new(Mutex::new(connection)),
        }
    }

    /// Run `f` against the connection on a blocking worker thread.
    async fn run<F, T>(&self, f: F) -> Result<T, StudentPerfError>
    where
        F: FnOnce(&Connection) -> Result<T, StudentPerfError> + Send + 'static,
        T: Send + 'static,
    {
        let connection = self.connection.clone();
        tokio::task::spawn_blocking(move || {
            let connection = connection
                .lock()
                .map_err(|_| StudentPerfError::ConnectionPoisoned)?;
            f(&*connection)
        })
        .await?
    }

    /// Run a query returning zero or more students.
    async fn query_students<P>(
        &self,
        sql: String,
        params: P,
    ) -> Result<Vec<StudentRecord>, StudentPerfError>
    where
        P: rusqlite::Params + Send + 'static,
    {
        self.run(move |connection| {
            let mut statement = connection.prepare(&sql)?;
            let students = statement
                .query_map(params, student_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(students)
        })
        .await
    }

    /// Return every student, ordered by id.
    #[tracing::instrument(level = "DEBUG", skip(self))]
    pub async fn list_all(&self) -> Result<Vec<StudentRecord>, StudentPerfError> {
        self.query_students("SELECT * FROM Student ORDER BY id".to_string(), [])
            .await
    }

    /// Return each distinct school once.
    #[tracing::instrument(level = "DEBUG", skip(self))]
    pub async fn list_distinct_schools(&self) -> Result<Vec<Option<String>>, StudentPerfError> {
        self.run(|connection| {
            let mut statement = connection.prepare("SELECT DISTINCT school FROM Student")?;
            let schools = statement
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(schools)
        })
        .await
    }

    /// Return the students of a school.
    #[tracing::instrument(level = "DEBUG", skip(self))]
    pub async fn find_by_school(
        &self,
        school: String,
    ) -> Result<Vec<StudentRecord>, StudentPerfError> {
        self.query_students(
            "SELECT * FROM Student WHERE school = ?1 ORDER BY id".to_string(),
            [school],
        )
        .await
    }

    /// Return the students with the given `sex` value.
    #[tracing::instrument(level = "DEBUG", skip(self))]
    pub async fn find_by_gender(
        &self,
        sex: String,
    ) -> Result<Vec<StudentRecord>, StudentPerfError> {
        self.query_students(
            "SELECT * FROM Student WHERE sex = ?1 ORDER BY id".to_string(),
            [sex],
        )
        .await
    }

    /// Return the grades of one student, or `None` if no student has this id.
    #[tracing::instrument(level = "DEBUG", skip(self))]
    pub async fn get_performance(&self, id: i64) -> Result<Option<Grades>, StudentPerfError> {
        self.run(move |connection| {
            let grades = connection
                .query_row(
                    "SELECT G1, G2, G3 FROM Student WHERE id = ?1",
                    params![id],
                    grades_from_row,
                )
                .optional()?;
            Ok(grades)
        })
        .await
    }

    /// Return the grades of every student of a school.
    #[tracing::instrument(level = "DEBUG", skip(self))]
    pub async fn get_performance_by_school(
        &self,
        school: String,
    ) -> Result<Vec<Grades>, StudentPerfError> {
        self.run(move |connection| {
            let mut statement =
                connection.prepare("SELECT G1, G2, G3 FROM Student WHERE school = ?1 ORDER BY id")?;
            let grades = statement
                .query_map([school], grades_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(grades)
        })
        .await
    }

    /// Return the mean of each grade over all students.
    #[tracing::instrument(level = "DEBUG", skip(self))]
    pub async fn get_average_scores(&self) -> Result<AverageScores, StudentPerfError> {
        self.run(|connection| {
            let averages = connection.query_row(
                &format!("SELECT {AVERAGE_COLUMNS} FROM Student"),
                [],
                averages_from_row,
            )?;
            Ok(averages)
        })
        .await
    }

    /// Return grade averages per distinct `sex` value.
    #[tracing::instrument(level = "DEBUG", skip(self))]
    pub async fn get_performance_by_gender(
        &self,
    ) -> Result<Vec<GenderPerformance>, StudentPerfError> {
        self.run(|connection| {
            let mut statement = connection.prepare(&format!(
                "SELECT sex, {AVERAGE_COLUMNS} FROM Student GROUP BY sex ORDER BY sex"
            ))?;
            let rows = statement
                .query_map([], |row| {
                    Ok(GenderPerformance {
                        sex: row.get("sex")?,
                        averages: averages_from_row(row)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    /// Return grade averages per distinct value of a column.
    ///
    /// The column name is passed to SQLite as is, so a name that is not a column of the
    /// `Student` table fails with the engine's storage error.
    ///
    /// # Arguments
    ///
    /// * `category_field`: Name of the column to group by
    #[tracing::instrument(level = "DEBUG", skip(self))]
    pub async fn get_performance_by_category(
        &self,
        category_field: &str,
    ) -> Result<Vec<CategoryPerformance>, StudentPerfError> {
        if !is_identifier(category_field) {
            return Err(StudentPerfError::Validation(format!(
                "invalid category field {category_field}"
            )));
        }
        let sql = format!(
            "SELECT {category_field} AS category, {AVERAGE_COLUMNS} \
             FROM Student GROUP BY {category_field} ORDER BY {category_field}"
        );
        self.run(move |connection| {
            let mut statement = connection.prepare(&sql)?;
            let rows = statement
                .query_map([], |row| {
                    Ok(CategoryPerformance {
                        category: json_value(row.get("category")?),
                        averages: averages_from_row(row)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    /// Insert a new student and return it with its assigned id.
    ///
    /// # Arguments
    ///
    /// * `fields`: Fields of the new student. `school`, `sex` and `age` are required.
    #[tracing::instrument(level = "DEBUG", skip(self, fields))]
    pub async fn create(&self, fields: StudentFields) -> Result<StudentRecord, StudentPerfError> {
        require_fields(&fields, CREATE_REQUIRED_MESSAGE)?;
        self.run(move |connection| {
            connection.execute(&INSERT_STUDENT, column_values(&fields).as_slice())?;
            let id = connection.last_insert_rowid();
            tracing::debug!(id, "created student");
            Ok(StudentRecord { id, fields })
        })
        .await
    }

    /// Replace every field of an existing student.
    ///
    /// Returns the record as supplied; it is not read back from the database.
    ///
    /// # Arguments
    ///
    /// * `id`: Id of the student to update
    /// * `fields`: New fields of the student. `school`, `sex` and `age` are required.
    #[tracing::instrument(level = "DEBUG", skip(self, fields))]
    pub async fn update(
        &self,
        id: i64,
        fields: StudentFields,
    ) -> Result<StudentRecord, StudentPerfError> {
        require_fields(&fields, UPDATE_REQUIRED_MESSAGE)?;
        self.run(move |connection| {
            let mut values = column_values(&fields).to_vec();
            values.push(&id);
            let changes = connection.execute(&UPDATE_STUDENT, values.as_slice())?;
            if changes == 0 {
                return Err(StudentPerfError::NotFound);
            }
            Ok(StudentRecord { id, fields })
        })
        .await
    }

    /// Permanently remove a student.
    #[tracing::instrument(level = "DEBUG", skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), StudentPerfError> {
        self.run(move |connection| {
            let changes = connection.execute("DELETE FROM Student WHERE id = ?1", params![id])?;
            if changes == 0 {
                return Err(StudentPerfError::NotFound);
            }
            Ok(())
        })
        .await
    }

    /// Return the students matching every supplied criterion.
    ///
    /// Criteria with neither key set match every student. Absent criteria are an error.
    #[tracing::instrument(level = "DEBUG", skip(self))]
    pub async fn filter(
        &self,
        criteria: Option<FilterCriteria>,
    ) -> Result<Vec<StudentRecord>, StudentPerfError> {
        let criteria = criteria.ok_or_else(|| {
            StudentPerfError::Validation(FILTER_CRITERIA_MISSING_MESSAGE.to_string())
        })?;
        let mut sql = String::from("SELECT * FROM Student WHERE 1 = 1");
        let mut values = Vec::new();
        if let Some(school) = criteria.school {
            sql.push_str(" AND school = ?");
            values.push(school);
        }
        if let Some(gender) = criteria.gender {
            sql.push_str(" AND sex = ?");
            values.push(gender);
        }
        sql.push_str(" ORDER BY id");
        self.query_students(sql, params_from_iter(values)).await
    }
}
