//! Data types exchanged between the API and the record store.

use serde::{Deserialize, Serialize, Serializer};
use validator::Validate;

/// Writable fields of a student record.
///
/// Used both as the body of create and update requests and as the stored part of a
/// [StudentRecord]. Field names on the wire match the columns of the `Student` table.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize, Validate)]
pub struct StudentFields {
    #[validate(required, length(min = 1))]
    pub school: Option<String>,
    #[validate(required, length(min = 1))]
    pub sex: Option<String>,
    #[validate(required, range(min = 1))]
    pub age: Option<i64>,
    pub address: Option<String>,
    pub famsize: Option<String>,
    #[serde(rename = "Pstatus")]
    pub pstatus: Option<String>,
    #[serde(rename = "Medu")]
    pub medu: Option<i64>,
    #[serde(rename = "Fedu")]
    pub fedu: Option<i64>,
    #[serde(rename = "Mjob")]
    pub mjob: Option<String>,
    #[serde(rename = "Fjob")]
    pub fjob: Option<String>,
    pub reason: Option<String>,
    pub guardian: Option<String>,
    pub traveltime: Option<i64>,
    pub studytime: Option<i64>,
    pub failures: Option<i64>,
    pub schoolsup: Option<String>,
    pub famsup: Option<String>,
    pub paid: Option<String>,
    pub activities: Option<String>,
    pub nursery: Option<String>,
    pub higher: Option<String>,
    pub internet: Option<String>,
    pub romantic: Option<String>,
    pub famrel: Option<i64>,
    pub freetime: Option<i64>,
    pub goout: Option<i64>,
    #[serde(rename = "Dalc")]
    pub dalc: Option<i64>,
    #[serde(rename = "Walc")]
    pub walc: Option<i64>,
    pub health: Option<i64>,
    pub absences: Option<i64>,
    #[serde(rename = "G1")]
    pub g1: Option<i64>,
    #[serde(rename = "G2")]
    pub g2: Option<i64>,
    #[serde(rename = "G3")]
    pub g3: Option<i64>,
}

/// A stored student: the store-assigned id plus every writable field.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct StudentRecord {
    pub id: i64,
    #[serde(flatten)]
    pub fields: StudentFields,
}

/// The three grades of a single student.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Grades {
    #[serde(rename = "G1")]
    pub g1: Option<i64>,
    #[serde(rename = "G2")]
    pub g2: Option<i64>,
    #[serde(rename = "G3")]
    pub g3: Option<i64>,
}

/// Mean of each grade over a set of students.
///
/// An average is `None` when the set holds no non-null value for that grade. Whole averages are
/// written as JSON integers, so a mean of exactly 10 appears as `10` rather than `10.0`.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct AverageScores {
    #[serde(rename = "avgG1", serialize_with = "serialize_average")]
    pub avg_g1: Option<f64>,
    #[serde(rename = "avgG2", serialize_with = "serialize_average")]
    pub avg_g2: Option<f64>,
    #[serde(rename = "avgG3", serialize_with = "serialize_average")]
    pub avg_g3: Option<f64>,
}

/// Largest magnitude below which every whole `f64` converts to `i64` exactly.
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

fn serialize_average<S>(average: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match average {
        Some(value) if value.fract() == 0.0 && value.abs() <= EXACT_INTEGER_LIMIT => {
            serializer.serialize_some(&(*value as i64))
        }
        _ => average.serialize(serializer),
    }
}

/// Grade averages for the students sharing one `sex` value.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GenderPerformance {
    pub sex: Option<String>,
    #[serde(flatten)]
    pub averages: AverageScores,
}

/// Grade averages for the students sharing one value of a categorical column.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CategoryPerformance {
    pub category: serde_json::Value,
    #[serde(flatten)]
    pub averages: AverageScores,
}

/// Optional equality constraints for the filter endpoint.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct FilterCriteria {
    pub school: Option<String>,
    /// Matched against the `sex` column.
    pub gender: Option<String>,
}

/// Body of a filter request.
#[derive(Debug, Deserialize, PartialEq)]
pub struct FilterRequest {
    pub criteria: Option<FilterCriteria>,
}

/// `GET /api/schools`
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct SchoolsResponse {
    pub schools: Vec<Option<String>>,
}

/// Any endpoint returning a list of students.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct StudentsResponse {
    pub students: Vec<StudentRecord>,
}

/// `GET /api/performance/:studentId`
#[derive(Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceResponse {
    pub performance_data: Option<Grades>,
}

/// `GET /api/schools/:id/performance`
#[derive(Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolPerformanceResponse {
    pub performance_data: Vec<Grades>,
}

/// `GET /api/performance-by-lunch`
#[derive(Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LunchImpactResponse {
    pub impact_by_lunch: Vec<CategoryPerformance>,
}

/// `GET /api/average-scores`
#[derive(Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AverageScoresResponse {
    pub average_scores: AverageScores,
}

/// `GET /api/performance-by-gender`
#[derive(Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenderPerformanceResponse {
    pub performance_by_gender: Vec<GenderPerformance>,
}

/// Successful create or update of a student.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct StudentWriteResponse {
    pub success: bool,
    pub message: String,
    pub student: StudentRecord,
}

impl StudentWriteResponse {
    /// Return a successful StudentWriteResponse
    pub fn new(message: &str, student: StudentRecord) -> Self {
        StudentWriteResponse {
            success: true,
            message: message.to_string(),
            student,
        }
    }
}

/// Successful delete of a student.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDeleteResponse {
    pub success: bool,
    pub message: String,
    pub student_id: i64,
}

/// `POST /api/students/filter`
#[derive(Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterResponse {
    pub filtered_students: Vec<StudentRecord>,
}
