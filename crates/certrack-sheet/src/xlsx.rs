//! Minimal Office Open XML workbook reader.
//!
//! Only the first worksheet is read, and only cell values: shared strings,
//! inline strings, formula results, booleans and numbers. Styles, dates and
//! merged cells are not interpreted.

use std::io::{Cursor, Read as _};

use quick_xml::{
  Reader,
  events::{BytesStart, BytesText, Event},
};
use zip::{ZipArchive, result::ZipError};

use crate::{Error, Record, Result};

const WORKBOOK: &str = "xl/workbook.xml";
const WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS: &str = "xl/sharedStrings.xml";
const FALLBACK_SHEET: &str = "xl/worksheets/sheet1.xml";
/// Columns `A` through `XFD`.
const MAX_COLUMNS: usize = 16_384;
/// Cap on the decompressed size of any archive entry.
const MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

pub(crate) fn read_records(bytes: &[u8]) -> Result<Vec<Record>> {
  let mut archive = ZipArchive::new(Cursor::new(bytes))?;

  let shared = match read_entry(&mut archive, SHARED_STRINGS, MAX_ENTRY_BYTES)? {
    Some(xml) => shared_strings(&xml)?,
    None => Vec::new(),
  };

  let sheet_path = first_sheet_path(&mut archive)?.unwrap_or_else(|| FALLBACK_SHEET.to_owned());
  let sheet = read_entry(&mut archive, &sheet_path, MAX_ENTRY_BYTES)?
    .ok_or_else(|| Error::Xlsx(format!("worksheet {sheet_path} not found")))?;

  sheet_records(&sheet, &shared)
}

/// Read entry `name` as UTF-8, refusing more than `limit` decompressed
/// bytes.
fn read_entry(archive: &mut Archive<'_>, name: &str, limit: u64) -> Result<Option<String>> {
  let file = match archive.by_name(name) {
    Ok(file) => file,
    Err(ZipError::FileNotFound) => return Ok(None),
    Err(e) => return Err(e.into()),
  };
  let mut bytes = Vec::new();
  file
    .take(limit + 1)
    .read_to_end(&mut bytes)
    .map_err(|e| Error::Xlsx(format!("{name}: {e}")))?;
  if bytes.len() as u64 > limit {
    return Err(Error::Xlsx(format!("{name} is larger than {limit} bytes")));
  }
  String::from_utf8(bytes)
    .map(Some)
    .map_err(|e| Error::Xlsx(format!("{name}: {e}")))
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn local_name(name: &[u8]) -> &[u8] {
  match name.iter().rposition(|&b| b == b':') {
    Some(pos) => &name[pos + 1..],
    None => name,
  }
}

/// Value of the attribute whose local name is `key`.
fn attr(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
  for a in e.attributes() {
    let a = a.map_err(|e| Error::Xml(e.to_string()))?;
    if local_name(a.key.as_ref()) == key {
      let value = a.unescape_value().map_err(|e| Error::Xml(e.to_string()))?;
      return Ok(Some(value.into_owned()));
    }
  }
  Ok(None)
}

fn text(e: &BytesText<'_>) -> Result<String> {
  e.unescape()
    .map(|t| t.into_owned())
    .map_err(|e| Error::Xml(e.to_string()))
}

// ─── Workbook ────────────────────────────────────────────────────────────────

/// Resolve the archive path of the first `<sheet>` in the workbook.
fn first_sheet_path(archive: &mut Archive<'_>) -> Result<Option<String>> {
  let Some(workbook) = read_entry(archive, WORKBOOK, MAX_ENTRY_BYTES)? else {
    return Ok(None);
  };
  let Some(rel_id) = first_sheet_rel_id(&workbook)? else {
    return Ok(None);
  };
  let Some(rels) = read_entry(archive, WORKBOOK_RELS, MAX_ENTRY_BYTES)? else {
    return Ok(None);
  };
  Ok(relationship_target(&rels, &rel_id)?.map(|target| resolve_target(&target)))
}

fn first_sheet_rel_id(workbook: &str) -> Result<Option<String>> {
  let mut reader = Reader::from_reader(workbook.as_bytes());
  let mut buf = Vec::new();

  loop {
    match reader.read_event_into(&mut buf) {
      Ok(Event::Start(ref e) | Event::Empty(ref e))
        if local_name(e.name().as_ref()) == b"sheet" =>
      {
        return attr(e, b"id");
      }
      Ok(Event::Eof) => return Ok(None),
      Err(e) => return Err(Error::Xml(e.to_string())),
      _ => {}
    }
    buf.clear();
  }
}

fn relationship_target(rels: &str, id: &str) -> Result<Option<String>> {
  let mut reader = Reader::from_reader(rels.as_bytes());
  let mut buf = Vec::new();

  loop {
    match reader.read_event_into(&mut buf) {
      Ok(Event::Start(ref e) | Event::Empty(ref e))
        if local_name(e.name().as_ref()) == b"Relationship" =>
      {
        if attr(e, b"Id")?.as_deref() == Some(id) {
          return attr(e, b"Target");
        }
      }
      Ok(Event::Eof) => return Ok(None),
      Err(e) => return Err(Error::Xml(e.to_string())),
      _ => {}
    }
    buf.clear();
  }
}

/// Relationship targets are relative to `xl/` unless absolute.
fn resolve_target(target: &str) -> String {
  match target.strip_prefix('/') {
    Some(absolute) => absolute.to_owned(),
    None => format!("xl/{target}"),
  }
}

// ─── Shared strings ──────────────────────────────────────────────────────────

/// Each `<si>` is the concatenation of its `<t>` runs. Phonetic runs
/// (`<rPh>`) are skipped.
fn shared_strings(xml: &str) -> Result<Vec<String>> {
  let mut reader = Reader::from_reader(xml.as_bytes());
  let mut strings = Vec::new();
  let mut current = String::new();
  let mut in_t = false;
  let mut in_phonetic = false;
  let mut buf = Vec::new();

  loop {
    match reader.read_event_into(&mut buf) {
      Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
        b"si" => current.clear(),
        b"t" => in_t = !in_phonetic,
        b"rPh" => in_phonetic = true,
        _ => {}
      },
      Ok(Event::Empty(ref e)) if local_name(e.name().as_ref()) == b"si" => {
        strings.push(String::new());
      }
      Ok(Event::Text(ref e)) if in_t => current.push_str(&text(e)?),
      Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
        b"si" => strings.push(std::mem::take(&mut current)),
        b"t" => in_t = false,
        b"rPh" => in_phonetic = false,
        _ => {}
      },
      Ok(Event::Eof) => break,
      Err(e) => return Err(Error::Xml(e.to_string())),
      _ => {}
    }
    buf.clear();
  }

  Ok(strings)
}

// ─── Worksheet ───────────────────────────────────────────────────────────────

/// Where character data inside a `<c>` is going.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Capture {
  None,
  Value,
  Inline,
}

#[derive(Default)]
struct Cell {
  column: usize,
  kind:   Option<String>,
  value:  String,
  inline: String,
}

impl Cell {
  fn render(self, shared: &[String]) -> Result<String> {
    match self.kind.as_deref() {
      Some("s") => {
        let index: usize = self
          .value
          .trim()
          .parse()
          .map_err(|_| Error::Xlsx(format!("bad shared string index {:?}", self.value)))?;
        shared
          .get(index)
          .cloned()
          .ok_or_else(|| Error::Xlsx(format!("shared string {index} out of range")))
      }
      Some("inlineStr") => Ok(self.inline),
      Some("b") => Ok(if self.value.trim() == "1" { "TRUE" } else { "FALSE" }.to_owned()),
      Some("str" | "e") => Ok(self.value),
      _ => Ok(render_number(&self.value)),
    }
  }
}

/// Integral numbers lose their fraction (`2024.0` → `2024`); anything else
/// is kept as written.
fn render_number(raw: &str) -> String {
  let raw = raw.trim();
  match raw.parse::<f64>() {
    Ok(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", n as i64),
    _ => raw.to_owned(),
  }
}

/// Zero-based column index of a cell reference such as `"AB12"`.
///
/// `None` when the reference has no column letters. Columns past `XFD`
/// are an error.
fn column_index(reference: &str) -> Result<Option<usize>> {
  let out_of_range = || Error::Xlsx(format!("cell reference {reference:?} out of range"));
  let mut index = 0usize;
  let mut any = false;
  for b in reference.bytes().take_while(u8::is_ascii_alphabetic) {
    index = index
      .checked_mul(26)
      .and_then(|i| i.checked_add(usize::from(b.to_ascii_uppercase() - b'A' + 1)))
      .filter(|&i| i <= MAX_COLUMNS)
      .ok_or_else(out_of_range)?;
    any = true;
  }
  Ok(any.then(|| index - 1))
}

fn sheet_records(xml: &str, shared: &[String]) -> Result<Vec<Record>> {
  let mut reader = Reader::from_reader(xml.as_bytes());
  let mut records = Vec::new();
  let mut row: Option<Record> = None;
  let mut cell: Option<Cell> = None;
  let mut capture = Capture::None;
  let mut buf = Vec::new();

  loop {
    match reader.read_event_into(&mut buf) {
      Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
        b"row" => row = Some(open_row(e, &records)?),
        b"c" => cell = Some(open_cell(e, row.as_ref())?),
        b"v" if cell.is_some() => capture = Capture::Value,
        b"t" if cell.is_some() => capture = Capture::Inline,
        _ => {}
      },
      Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
        b"row" => records.push(open_row(e, &records)?),
        b"c" => {
          if let Some(r) = row.as_mut() {
            let empty = open_cell(e, Some(&*r))?;
            place(r, empty.column, String::new());
          }
        }
        _ => {}
      },
      Ok(Event::Text(ref e)) => match capture {
        Capture::Value => {
          if let Some(c) = cell.as_mut() {
            c.value.push_str(&text(e)?);
          }
        }
        Capture::Inline => {
          if let Some(c) = cell.as_mut() {
            c.inline.push_str(&text(e)?);
          }
        }
        Capture::None => {}
      },
      Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
        b"v" | b"t" => capture = Capture::None,
        b"c" => {
          if let (Some(c), Some(r)) = (cell.take(), row.as_mut()) {
            let column = c.column;
            place(r, column, c.render(shared)?);
          }
        }
        b"row" => records.extend(row.take()),
        _ => {}
      },
      Ok(Event::Eof) => break,
      Err(e) => return Err(Error::Xml(e.to_string())),
      _ => {}
    }
    buf.clear();
  }

  Ok(records)
}

fn open_row(e: &BytesStart<'_>, done: &[Record]) -> Result<Record> {
  let previous = done.last().map_or(0, |r| r.number);
  let number = attr(e, b"r")?
    .and_then(|r| r.trim().parse().ok())
    .unwrap_or(previous + 1);
  Ok(Record { number, cells: Vec::new() })
}

fn open_cell(e: &BytesStart<'_>, row: Option<&Record>) -> Result<Cell> {
  let next = row.map_or(0, |r| r.cells.len());
  let column = match attr(e, b"r")? {
    Some(reference) => column_index(&reference)?.unwrap_or(next),
    None => next,
  };
  Ok(Cell { column, kind: attr(e, b"t")?, ..Cell::default() })
}

fn place(row: &mut Record, column: usize, value: String) {
  if row.cells.len() <= column {
    row.cells.resize(column + 1, String::new());
  }
  row.cells[column] = value;
}
