use crate::models::*;
use crate::store::StudentStore;

/// Create a StudentFields object with only required fields set.
pub(crate) fn get_test_student_fields() -> StudentFields {
    StudentFields {
        school: Some("GP".to_string()),
        sex: Some("F".to_string()),
        age: Some(18),
        ..Default::default()
    }
}

/// Create a StudentFields object with all fields set.
pub(crate) fn get_test_student_fields_complete() -> StudentFields {
    StudentFields {
        school: Some("MS".to_string()),
        sex: Some("M".to_string()),
        age: Some(17),
        address: Some("U".to_string()),
        famsize: Some("GT3".to_string()),
        pstatus: Some("T".to_string()),
        medu: Some(4),
        fedu: Some(3),
        mjob: Some("teacher".to_string()),
        fjob: Some("services".to_string()),
        reason: Some("course".to_string()),
        guardian: Some("mother".to_string()),
        traveltime: Some(2),
        studytime: Some(3),
        failures: Some(0),
        schoolsup: Some("no".to_string()),
        famsup: Some("yes".to_string()),
        paid: Some("no".to_string()),
        activities: Some("yes".to_string()),
        nursery: Some("yes".to_string()),
        higher: Some("yes".to_string()),
        internet: Some("yes".to_string()),
        romantic: Some("no".to_string()),
        famrel: Some(4),
        freetime: Some(3),
        goout: Some(2),
        dalc: Some(1),
        walc: Some(2),
        health: Some(5),
        absences: Some(6),
        g1: Some(13),
        g2: Some(14),
        g3: Some(15),
    }
}

/// Create a StudentFields object with required fields and grades set.
pub(crate) fn get_test_student_graded(school: &str, sex: &str, grades: [i64; 3]) -> StudentFields {
    StudentFields {
        school: Some(school.to_string()),
        sex: Some(sex.to_string()),
        age: Some(16),
        g1: Some(grades[0]),
        g2: Some(grades[1]),
        g3: Some(grades[2]),
        ..Default::default()
    }
}

/// Open an in-memory store holding the two GP students used by the aggregate tests.
pub(crate) async fn get_test_store() -> StudentStore {
    let store = StudentStore::open_in_memory().unwrap();
    store
        .create(get_test_student_graded("GP", "F", [10, 11, 12]))
        .await
        .unwrap();
    store
        .create(get_test_student_graded("GP", "M", [14, 15, 16]))
        .await
        .unwrap();
    store
}
