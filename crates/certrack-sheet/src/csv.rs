//! RFC 4180 CSV reader.
//!
//! Quoted fields may contain commas, line breaks and `""` escapes. Records
//! end at LF, CRLF or a lone CR. A UTF-8 byte-order mark is ignored.

use crate::{Error, Record, Result};

const BOM: char = '\u{feff}';

pub(crate) fn read_records(bytes: &[u8]) -> Result<Vec<Record>> {
  let text = std::str::from_utf8(bytes)
    .map_err(|e| Error::Csv(format!("file is not UTF-8: {e}")))?;
  let text = text.strip_prefix(BOM).unwrap_or(text);

  let mut records = Vec::new();
  let mut cells: Vec<String> = Vec::new();
  let mut buf = String::new();
  let mut in_quotes = false;
  // Whether anything has been read since the last record ended.
  let mut started = false;

  let mut chars = text.chars().peekable();
  while let Some(ch) = chars.next() {
    if in_quotes {
      match ch {
        '"' if chars.peek() == Some(&'"') => {
          chars.next();
          buf.push('"');
        }
        '"' => in_quotes = false,
        _ => buf.push(ch),
      }
      continue;
    }

    match ch {
      '"' => {
        in_quotes = true;
        started = true;
      }
      ',' => {
        cells.push(std::mem::take(&mut buf));
        started = true;
      }
      '\r' | '\n' => {
        if ch == '\r' && chars.peek() == Some(&'\n') {
          chars.next();
        }
        cells.push(std::mem::take(&mut buf));
        records.push(Record {
          number: records.len() + 1,
          cells:  std::mem::take(&mut cells),
        });
        started = false;
      }
      _ => {
        buf.push(ch);
        started = true;
      }
    }
  }

  if in_quotes {
    return Err(Error::Csv(format!(
      "unterminated quoted field in record {}",
      records.len() + 1
    )));
  }
  if started {
    cells.push(buf);
    records.push(Record { number: records.len() + 1, cells });
  }

  Ok(records)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn cells(input: &str) -> Vec<Vec<String>> {
    read_records(input.as_bytes())
      .unwrap()
      .into_iter()
      .map(|r| r.cells)
      .collect()
  }

  #[test]
  fn plain_records() {
    assert_eq!(cells("a,b\nc,d\n"), [["a", "b"], ["c", "d"]]);
  }

  #[test]
  fn last_record_without_newline() {
    assert_eq!(cells("a,b\r\nc,d"), [["a", "b"], ["c", "d"]]);
  }

  #[test]
  fn quoted_fields_keep_commas_quotes_and_newlines() {
    assert_eq!(
      cells("\"Smith, J\",\"say \"\"hi\"\"\",\"two\nlines\"\n"),
      [["Smith, J", "say \"hi\"", "two\nlines"]]
    );
  }

  #[test]
  fn byte_order_mark_is_stripped() {
    assert_eq!(cells("\u{feff}Zone,School\n"), [["Zone", "School"]]);
  }

  #[test]
  fn empty_lines_are_records() {
    let records = read_records(b"a\n\nb\n").unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[1].cells, [""]);
    assert_eq!(records[2].number, 3);
  }

  #[test]
  fn quoted_newline_does_not_advance_record_number() {
    let records = read_records(b"h\n\"x\ny\"\nz\n").unwrap();
    assert_eq!(records[2].number, 3);
    assert_eq!(records[2].cells, ["z"]);
  }

  #[test]
  fn unterminated_quote_is_an_error() {
    assert!(matches!(read_records(b"a,\"b\n"), Err(Error::Csv(_))));
  }

  #[test]
  fn invalid_utf8_is_an_error() {
    assert!(matches!(read_records(&[0xff, 0xfe, b'a']), Err(Error::Csv(_))));
  }
}
