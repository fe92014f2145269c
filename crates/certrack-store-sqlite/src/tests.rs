//! Integration tests for `SqliteStore` against an in-memory database.

use certrack_core::{
  import::{RawRow, reconcile},
  model::{CertStatus, ClassLabel, Enrollment, NewTeacher},
  overview::{GroupCount, OverviewQuery},
  store::{CertStore, Outcome},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn row(n: usize, zone: &str, school: &str, teacher: &str, year: &str, class: &str) -> RawRow {
  RawRow {
    row:     n,
    zone:    zone.into(),
    school:  school.into(),
    teacher: teacher.into(),
    year:    year.into(),
    class:   class.into(),
  }
}

// ─── Zones and schools ───────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_list_zones_by_name() {
  let s = store().await;
  s.create_zone("North".into()).await.unwrap().applied().unwrap();
  s.create_zone("East".into()).await.unwrap().applied().unwrap();

  let names: Vec<_> = s.list_zones().await.unwrap().into_iter().map(|z| z.name).collect();
  assert_eq!(names, ["East", "North"]);
}

#[tokio::test]
async fn duplicate_zone_name_is_a_conflict() {
  let s = store().await;
  assert!(s.create_zone("North".into()).await.unwrap().is_applied());

  let again = s.create_zone("North".into()).await.unwrap();
  assert!(matches!(again, Outcome::Conflict(_)));
  assert_eq!(s.list_zones().await.unwrap().len(), 1);
}

#[tokio::test]
async fn rename_missing_zone_is_not_found() {
  let s = store().await;
  let outcome = s.rename_zone(42, "Nowhere".into()).await.unwrap();
  assert_eq!(outcome, Outcome::NotFound);
}

#[tokio::test]
async fn rename_zone_persists() {
  let s = store().await;
  let zone = s.create_zone("Nrth".into()).await.unwrap().applied().unwrap();
  s.rename_zone(zone.id, "North".into()).await.unwrap().applied().unwrap();
  assert_eq!(s.get_zone(zone.id).await.unwrap().unwrap().name, "North");
}

#[tokio::test]
async fn school_needs_an_existing_zone() {
  let s = store().await;
  let outcome = s.create_school("S1".into(), 99).await.unwrap();
  assert_eq!(outcome, Outcome::NotFound);
}

#[tokio::test]
async fn update_school_moves_it_between_zones() {
  let s = store().await;
  let north = s.create_zone("North".into()).await.unwrap().applied().unwrap();
  let south = s.create_zone("South".into()).await.unwrap().applied().unwrap();
  let school = s.create_school("S1".into(), north.id).await.unwrap().applied().unwrap();

  s.update_school(school.id, "S1 renamed".into(), south.id)
    .await
    .unwrap()
    .applied()
    .unwrap();

  let fetched = s.get_school(school.id).await.unwrap().unwrap();
  assert_eq!(fetched.name, "S1 renamed");
  assert_eq!(fetched.zone_id, south.id);
}

#[tokio::test]
async fn deleting_zone_with_schools_is_restricted() {
  let s = store().await;
  let zone = s.create_zone("North".into()).await.unwrap().applied().unwrap();
  s.create_school("S1".into(), zone.id).await.unwrap().applied().unwrap();

  let outcome = s.delete_zone(zone.id).await.unwrap();
  assert!(matches!(outcome, Outcome::Conflict(_)), "{outcome:?}");
  assert!(s.get_zone(zone.id).await.unwrap().is_some());
}

#[tokio::test]
async fn deleting_empty_zone_succeeds() {
  let s = store().await;
  let zone = s.create_zone("North".into()).await.unwrap().applied().unwrap();
  assert_eq!(s.delete_zone(zone.id).await.unwrap(), Outcome::Applied(()));
  assert_eq!(s.delete_zone(zone.id).await.unwrap(), Outcome::NotFound);
}

// ─── Teachers ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_teacher_with_enrollment_creates_certification() {
  let s = store().await;
  let zone = s.create_zone("North".into()).await.unwrap().applied().unwrap();
  let school = s.create_school("S1".into(), zone.id).await.unwrap().applied().unwrap();

  let teacher = s
    .create_teacher(NewTeacher {
      name:       "Alice".into(),
      school_id:  school.id,
      document:   Some("123".into()),
      email:      None,
      // The explicit year wins over the label's year.
      enrollment: Some(Enrollment { year: 2025, class: ClassLabel { number: 2, year: 2024 } }),
    })
    .await
    .unwrap()
    .applied()
    .unwrap();
  assert_eq!(teacher.document.as_deref(), Some("123"));

  let classes = s.list_classes(Some(2025)).await.unwrap();
  assert_eq!(classes.len(), 1);
  assert_eq!(classes[0].label().to_string(), "2/2025");

  let pending = s.list_certifications(CertStatus::NotCertified).await.unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].certification.teacher_id, teacher.id);
  assert_eq!(pending[0].certification.year_id, classes[0].year_id);
  assert_eq!(pending[0].class, "2/2025");
  assert_eq!(pending[0].zone, "North");
}

#[tokio::test]
async fn deleting_teacher_cascades_to_certifications() {
  let s = store().await;
  reconcile(&s, [row(2, "Z1", "S1", "Alice", "2024", "1/2024")]).await;
  let teacher = s.list_teachers().await.unwrap().remove(0);
  let cert_id = s.overview(&OverviewQuery::default()).await.unwrap().rows[0].certification_id;

  assert_eq!(s.delete_teacher(teacher.id).await.unwrap(), Outcome::Applied(()));
  assert!(s.get_certification(cert_id).await.unwrap().is_none());
  assert!(s.overview(&OverviewQuery::default()).await.unwrap().rows.is_empty());
}

#[tokio::test]
async fn deleting_school_with_teachers_is_restricted() {
  let s = store().await;
  reconcile(&s, [row(2, "Z1", "S1", "Alice", "2024", "1/2024")]).await;
  let school = s.list_schools().await.unwrap().remove(0);
  assert!(matches!(s.delete_school(school.id).await.unwrap(), Outcome::Conflict(_)));
}

// ─── Years and classes ───────────────────────────────────────────────────────

#[tokio::test]
async fn next_class_numbers_count_up_per_year() {
  let s = store().await;
  let first = s.create_next_class(2024).await.unwrap();
  let second = s.create_next_class(2024).await.unwrap();
  let other = s.create_next_class(2025).await.unwrap();

  assert_eq!(first.label().to_string(), "1/2024");
  assert_eq!(second.label().to_string(), "2/2024");
  assert_eq!(other.label().to_string(), "1/2025");
  assert_eq!(s.list_years().await.unwrap().len(), 2);

  let labels: Vec<_> = s
    .list_classes(None)
    .await
    .unwrap()
    .iter()
    .map(|c| c.label().to_string())
    .collect();
  assert_eq!(labels, ["1/2024", "2/2024", "1/2025"]);
}

#[tokio::test]
async fn deleting_year_with_classes_is_restricted() {
  let s = store().await;
  let class = s.create_next_class(2024).await.unwrap();
  assert!(matches!(s.delete_year(class.year_id).await.unwrap(), Outcome::Conflict(_)));
}

#[tokio::test]
async fn deleting_class_with_certifications_is_restricted() {
  let s = store().await;
  reconcile(&s, [row(2, "Z1", "S1", "Alice", "2024", "1/2024")]).await;
  let enrolled = s.list_classes(Some(2024)).await.unwrap().remove(0);
  let empty = s.create_next_class(2024).await.unwrap();

  assert!(matches!(s.delete_class(enrolled.id).await.unwrap(), Outcome::Conflict(_)));
  assert_eq!(s.delete_class(empty.id).await.unwrap(), Outcome::Applied(()));
  assert_eq!(s.delete_class(empty.id).await.unwrap(), Outcome::NotFound);
  assert_eq!(s.list_classes(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_year_is_a_conflict() {
  let s = store().await;
  assert!(s.create_year(2024).await.unwrap().is_applied());
  assert!(matches!(s.create_year(2024).await.unwrap(), Outcome::Conflict(_)));
}

// ─── Import ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_rows_create_once_and_skip_once() {
  let s = store().await;
  let rows = vec![
    row(2, "Z1", "S1", "Alice", "2024", "1/2024"),
    row(3, "Z1", "S1", "Alice", "2024", "1/2024"),
  ];

  let summary = reconcile(&s, rows).await;

  let c = summary.created;
  assert_eq!(
    (c.zone, c.school, c.teacher, c.year, c.class, c.certification),
    (1, 1, 1, 1, 1, 1)
  );
  assert_eq!(summary.skipped_existing, 1);
  assert!(summary.failures.is_empty());
  assert!(summary.relinked.is_empty());
}

#[tokio::test]
async fn reimport_creates_no_new_certifications() {
  let s = store().await;
  let rows = vec![
    row(2, "Z1", "S1", "Alice", "2024", "1/2024"),
    row(3, "Z1", "S1", "Bob", "2024", "1/2024"),
    row(4, "Z2", "S2", "Carol", "2025", "3/2025"),
  ];

  let first = reconcile(&s, rows.clone()).await;
  assert_eq!(first.created.certification, 3);

  let second = reconcile(&s, rows).await;
  assert_eq!(second.created.certification, 0);
  assert_eq!(second.created.teacher, 0);
  assert_eq!(second.skipped_existing, 3);
}

#[tokio::test]
async fn class_label_without_slash_lands_in_class_one() {
  let s = store().await;
  let summary = reconcile(&s, [row(2, "Z1", "S1", "Alice", "2024", "Morning")]).await;

  assert!(summary.failures.is_empty());
  let classes = s.list_classes(Some(2024)).await.unwrap();
  assert_eq!(classes.len(), 1);
  assert_eq!(classes[0].number, 1);
}

#[tokio::test]
async fn empty_teacher_fails_row_without_side_effects() {
  let s = store().await;
  let summary = reconcile(
    &s,
    [
      row(2, "Z1", "S1", "Alice", "2024", "1/2024"),
      row(3, "Z9", "S9", "  ", "2030", "1/2030"),
    ],
  )
  .await;

  assert_eq!(summary.failures.len(), 1);
  assert_eq!(summary.failures[0].row, 3);
  assert_eq!(summary.failures[0].error, "row has empty fields");
  assert_eq!(summary.created.certification, 1);

  assert_eq!(s.list_zones().await.unwrap().len(), 1);
  assert!(s.list_classes(Some(2030)).await.unwrap().is_empty());
}

#[tokio::test]
async fn bad_year_fails_only_that_row() {
  let s = store().await;
  let summary = reconcile(
    &s,
    [
      row(2, "Z1", "S1", "Alice", "soon", "1/2024"),
      row(3, "Z1", "S1", "Bob", "2024", "1/2024"),
    ],
  )
  .await;

  assert_eq!(summary.failures.len(), 1);
  assert_eq!(summary.failures[0].row, 2);
  assert!(summary.failures[0].error.contains("invalid year"));
  assert_eq!(summary.created.certification, 1);
}

#[tokio::test]
async fn same_teacher_name_in_two_schools_is_two_teachers() {
  let s = store().await;
  let summary = reconcile(
    &s,
    [
      row(2, "Z1", "S1", "Alice", "2024", "1/2024"),
      row(3, "Z1", "S2", "Alice", "2024", "1/2024"),
    ],
  )
  .await;

  assert_eq!(summary.created.teacher, 2);
  assert_eq!(summary.created.certification, 2);
  assert_eq!(s.list_teachers().await.unwrap().len(), 2);
}

#[tokio::test]
async fn school_under_new_zone_is_relinked_and_reported() {
  let s = store().await;
  let summary = reconcile(
    &s,
    [
      row(2, "Z1", "S1", "Alice", "2024", "1/2024"),
      row(3, "Z2", "S1", "Bob", "2024", "1/2024"),
    ],
  )
  .await;

  assert!(summary.failures.is_empty());
  assert_eq!(summary.created.school, 1);
  assert_eq!(summary.relinked.len(), 1);
  assert_eq!(summary.relinked[0].row, 3);
  assert!(summary.relinked[0].message.contains("\"Z1\""));

  let zones = s.list_zones().await.unwrap();
  let z2 = zones.iter().find(|z| z.name == "Z2").unwrap();
  let school = s.list_schools().await.unwrap().remove(0);
  assert_eq!(school.zone_id, z2.id);
}

// ─── Certifications ──────────────────────────────────────────────────────────

#[tokio::test]
async fn set_certificate_file_updates_status_and_path() {
  let s = store().await;
  reconcile(&s, [row(2, "Z1", "S1", "Alice", "2024", "1/2024")]).await;
  let id = s.overview(&OverviewQuery::default()).await.unwrap().rows[0].certification_id;

  let fresh = s.get_certification(id).await.unwrap().unwrap();
  assert_eq!(fresh.status, CertStatus::NotCertified);
  assert!(!fresh.has_file());

  let updated = s
    .set_certificate_file(id, Some("a/b.pdf".into()), CertStatus::Certified)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.status, CertStatus::Certified);
  assert_eq!(updated.file_path.as_deref(), Some("a/b.pdf"));
  assert_eq!(updated.created_at, fresh.created_at);

  assert!(s.set_certificate_file(id + 100, None, CertStatus::Certified).await.unwrap().is_none());
}

// ─── Overview ────────────────────────────────────────────────────────────────

fn pairs(groups: &[GroupCount]) -> Vec<(&str, i64)> {
  groups.iter().map(|g| (g.label.as_str(), g.value)).collect()
}

async fn seeded() -> SqliteStore {
  let s = store().await;
  reconcile(
    &s,
    [
      row(2, "North", "Alpha", "Carol", "2024", "1/2024"),
      row(3, "North", "Alpha", "Alice", "2024", "2/2024"),
      row(4, "North", "Beta", "Bob", "2025", "1/2025"),
      row(5, "East", "Gamma", "Dan", "2024", "1/2024"),
    ],
  )
  .await;
  s
}

#[tokio::test]
async fn overview_rows_are_ordered_by_zone_school_teacher() {
  let s = seeded().await;
  let overview = s.overview(&OverviewQuery::default()).await.unwrap();

  let teachers: Vec<_> = overview.rows.iter().map(|r| r.teacher.as_str()).collect();
  assert_eq!(teachers, ["Dan", "Alice", "Carol", "Bob"]);
  assert_eq!(overview.rows[1].class, "2/2024");
  assert!(overview.rows.iter().all(|r| !r.has_file && r.status == CertStatus::NotCertified));
}

#[tokio::test]
async fn overview_groups_are_ordered_by_key() {
  let s = seeded().await;
  let overview = s.overview(&OverviewQuery::default()).await.unwrap();

  assert_eq!(pairs(&overview.by_zone), [("East", 1), ("North", 3)]);
  assert_eq!(pairs(&overview.by_school), [("Alpha", 2), ("Beta", 1), ("Gamma", 1)]);
  assert_eq!(pairs(&overview.by_year), [("2024", 3), ("2025", 1)]);
}

#[tokio::test]
async fn overview_filters_by_class_and_status() {
  let s = seeded().await;

  let by_class = s
    .overview(&OverviewQuery { class: ClassLabel::parse("1/2024"), only_certified: false })
    .await
    .unwrap();
  let teachers: Vec<_> = by_class.rows.iter().map(|r| r.teacher.as_str()).collect();
  assert_eq!(teachers, ["Dan", "Carol"]);
  assert_eq!(by_class.by_year.len(), 1);

  let id = by_class.rows[0].certification_id;
  s.set_certificate_file(id, Some("x.pdf".into()), CertStatus::Certified)
    .await
    .unwrap();

  let certified = s
    .overview(&OverviewQuery { class: None, only_certified: true })
    .await
    .unwrap();
  assert_eq!(certified.rows.len(), 1);
  assert_eq!(certified.rows[0].teacher, "Dan");
  assert!(certified.rows[0].has_file);
  assert_eq!(certified.by_zone.len(), 1);
  assert_eq!(certified.by_zone[0].label, "East");
}
