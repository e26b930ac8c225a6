mod test_support;

use serde_json::json;
use test_support::{
    assert_close, mark, request_err, request_ok, select_workspace, spawn_sidecar,
};

fn list_entries(
    stdin: &mut std::process::ChildStdin,
    reader: &mut std::io::BufReader<std::process::ChildStdout>,
    id: &str,
    params: serde_json::Value,
) -> Vec<serde_json::Value> {
    request_ok(stdin, reader, id, "marks.list", params)
        .get("entries")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

#[test]
fn upsert_rejects_impossible_marks() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "resultsd-marks-reject");

    let err = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "marks.upsert",
        json!({ "entry": mark("amina", "math", "Opener", 55.0, 50.0) }),
        "bad_params",
    );
    assert_eq!(
        err.pointer("/details/marksObtained").and_then(|v| v.as_f64()),
        Some(55.0)
    );
    let _ = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "marks.upsert",
        json!({ "entry": mark("amina", "math", "Opener", -1.0, 50.0) }),
        "bad_params",
    );
    let _ = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "marks.upsert",
        json!({ "entry": mark("amina", "math", "Opener", 0.0, 0.0) }),
        "bad_params",
    );

    let mut blank_student = mark("amina", "math", "Opener", 10.0, 50.0);
    blank_student["studentId"] = json!("  ");
    let _ = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "marks.upsert",
        json!({ "entry": blank_student }),
        "bad_params",
    );

    let mut bad_exam = mark("amina", "math", "Opener", 10.0, 50.0);
    bad_exam["examType"] = json!("Quiz");
    let _ = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "marks.upsert",
        json!({ "entry": bad_exam }),
        "bad_params",
    );

    let _ = request_err(&mut stdin, &mut reader, "6", "marks.upsert", json!({}), "bad_params");

    let entries = list_entries(
        &mut stdin,
        &mut reader,
        "7",
        json!({ "classId": "form3e", "termId": "t2" }),
    );
    assert!(entries.is_empty(), "rejected marks must not be stored");
}

#[test]
fn upsert_grades_and_overwrites_in_place() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "resultsd-marks-overwrite");

    let first = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "marks.upsert",
        json!({ "entry": mark("amina", "math", "Midterm", 36.0, 50.0) }),
    );
    assert_eq!(first.get("outcome").and_then(|v| v.as_str()), Some("created"));
    assert_close(
        first.pointer("/entry/percentage").and_then(|v| v.as_f64()),
        72.0,
    );
    assert_eq!(
        first.pointer("/entry/grade").and_then(|v| v.as_str()),
        Some("B+")
    );
    assert_eq!(first.pointer("/entry/points").and_then(|v| v.as_i64()), Some(10));

    // Same student/subject/term/year/exam replaces the earlier mark.
    let mut corrected = mark("amina", "math", "Midterm", 2.0, 3.0);
    corrected["comment"] = json!("re-marked");
    let second = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "marks.upsert",
        json!({ "entry": corrected }),
    );
    assert_eq!(second.get("outcome").and_then(|v| v.as_str()), Some("updated"));
    assert_close(
        second.pointer("/entry/percentage").and_then(|v| v.as_f64()),
        66.67,
    );
    assert_eq!(
        second.pointer("/entry/grade").and_then(|v| v.as_str()),
        Some("B")
    );

    let entries = list_entries(
        &mut stdin,
        &mut reader,
        "3",
        json!({ "classId": "form3e", "termId": "t2", "examType": "Midterm" }),
    );
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].get("comment").and_then(|v| v.as_str()),
        Some("re-marked")
    );
    assert_close(entries[0].get("marksObtained").and_then(|v| v.as_f64()), 2.0);

    // A different exam type is a separate entry.
    let third = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "marks.upsert",
        json!({ "entry": mark("amina", "math", "Endterm", 100.0, 100.0) }),
    );
    assert_eq!(third.get("outcome").and_then(|v| v.as_str()), Some("created"));
    assert_eq!(
        third.pointer("/entry/grade").and_then(|v| v.as_str()),
        Some("A")
    );

    let by_student = list_entries(
        &mut stdin,
        &mut reader,
        "5",
        json!({ "studentId": "amina", "termId": "t2" }),
    );
    assert_eq!(by_student.len(), 2);

    let _ = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "marks.list",
        json!({ "termId": "t2" }),
        "bad_params",
    );
}

#[test]
fn bulk_upsert_is_all_or_nothing() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "resultsd-marks-bulk");

    let err = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "marks.bulkUpsert",
        json!({ "entries": [
            mark("amina", "math", "Opener", 40.0, 50.0),
            mark("brian", "math", "Opener", 60.0, 50.0),
            mark("chao", "math", "Opener", 30.0, 50.0),
        ] }),
        "bad_params",
    );
    let rejected = err
        .pointer("/details/rejected")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].get("index").and_then(|v| v.as_u64()), Some(1));

    let entries = list_entries(
        &mut stdin,
        &mut reader,
        "2",
        json!({ "classId": "form3e", "termId": "t2" }),
    );
    assert!(entries.is_empty(), "a rejected batch must write nothing");

    let ok = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "marks.bulkUpsert",
        json!({ "entries": [
            mark("amina", "math", "Opener", 40.0, 50.0),
            mark("chao", "math", "Opener", 30.0, 50.0),
        ] }),
    );
    assert_eq!(ok.get("created").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(ok.get("updated").and_then(|v| v.as_u64()), Some(0));

    let again = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "marks.bulkUpsert",
        json!({ "entries": [
            mark("amina", "math", "Opener", 45.0, 50.0),
            mark("dora", "math", "Opener", 10.0, 50.0),
        ] }),
    );
    assert_eq!(again.get("created").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(again.get("updated").and_then(|v| v.as_u64()), Some(1));
}

#[test]
fn bulk_upsert_enforces_batch_limit() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "resultsd-marks-bulk-limit");

    let entries: Vec<serde_json::Value> = (0..5001)
        .map(|i| mark(&format!("s{}", i), "math", "Opener", 1.0, 2.0))
        .collect();
    let err = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "marks.bulkUpsert",
        json!({ "entries": entries }),
        "bad_params",
    );
    assert_eq!(
        err.pointer("/details/count").and_then(|v| v.as_u64()),
        Some(5001)
    );
}

#[test]
fn delete_removes_exactly_one_entry() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "resultsd-marks-delete");

    // Exam types in entries are accepted in any casing.
    for (i, exam) in ["opener", "MIDTERM"].iter().enumerate() {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("u{}", i),
            "marks.upsert",
            json!({ "entry": mark("amina", "math", exam, 20.0, 40.0) }),
        );
    }

    let key = json!({
        "studentId": "amina",
        "subjectId": "math",
        "termId": "t2",
        "academicYear": "2025",
        "examType": "Opener"
    });
    let _ = request_ok(&mut stdin, &mut reader, "1", "marks.delete", key.clone());
    let _ = request_err(&mut stdin, &mut reader, "2", "marks.delete", key, "not_found");

    let entries = list_entries(
        &mut stdin,
        &mut reader,
        "3",
        json!({ "studentId": "amina", "termId": "t2" }),
    );
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].get("examType").and_then(|v| v.as_str()),
        Some("Midterm")
    );
}
