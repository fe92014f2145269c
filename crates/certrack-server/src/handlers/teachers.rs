//! Handlers for `/teachers`.
//!
//! Creating a teacher with both a `year` and a `class` (`"N/YYYY"`) also
//! enrols it: the year and class are created when missing and a
//! `NOT_CERTIFIED` certification links them. A `class` that does not parse
//! skips the enrolment but still creates the teacher.

use axum::{
  Form, Json,
  extract::{Path, State},
  response::Redirect,
};
use certrack_core::{
  import::parse_year,
  model::{ClassLabel, Enrollment, NewTeacher, Teacher},
  store::CertStore,
};
use serde::Deserialize;

use crate::{
  AppState,
  error::{Error, Result},
  handlers::{non_blank, settle},
};

const LIST: &str = "/teachers";

#[derive(Debug, Deserialize)]
pub struct TeacherForm {
  pub name:      String,
  pub school_id: i64,
  pub document:  Option<String>,
  pub email:     Option<String>,
  pub year:      Option<String>,
  pub class:     Option<String>,
}

impl TeacherForm {
  fn enrollment(&self) -> Option<Enrollment> {
    let year = non_blank(self.year.clone()).and_then(|y| parse_year(&y))?;
    let class = non_blank(self.class.clone()).and_then(|c| ClassLabel::parse(&c))?;
    Some(Enrollment { year, class })
  }
}

/// `GET /teachers`
pub async fn list<S: CertStore>(State(state): State<AppState<S>>) -> Result<Json<Vec<Teacher>>> {
  let teachers = state.store.list_teachers().await.map_err(Error::store)?;
  Ok(Json(teachers))
}

/// `POST /teachers`
pub async fn create<S: CertStore>(
  State(state): State<AppState<S>>,
  Form(form): Form<TeacherForm>,
) -> Result<Redirect> {
  let name = form.name.trim().to_owned();
  if name.is_empty() {
    return Ok(Redirect::to(LIST));
  }

  let enrollment = form.enrollment();
  let input = NewTeacher {
    name,
    school_id: form.school_id,
    document: non_blank(form.document),
    email: non_blank(form.email),
    enrollment,
  };
  let outcome = state.store.create_teacher(input).await.map_err(Error::store)?;
  Ok(settle(outcome, "create teacher", LIST))
}

/// `POST /teachers/{id}/delete` also removes the teacher's certificate
/// files.
pub async fn delete<S: CertStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<Redirect> {
  let outcome = state.store.delete_teacher(id).await.map_err(Error::store)?;
  if outcome.is_applied() {
    state.documents.purge_teacher(id).await;
  }
  Ok(settle(outcome, "delete teacher", LIST))
}
