//! SQL schema for the certrack SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS zones (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name  TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS schools (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    name     TEXT NOT NULL UNIQUE,
    zone_id  INTEGER NOT NULL REFERENCES zones(id) ON DELETE RESTRICT
);

-- (name, school_id) is a lookup key for the importer, not a constraint.
CREATE TABLE IF NOT EXISTS teachers (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL,
    document   TEXT,
    email      TEXT,
    school_id  INTEGER NOT NULL REFERENCES schools(id) ON DELETE RESTRICT
);

CREATE TABLE IF NOT EXISTS years (
    id     INTEGER PRIMARY KEY AUTOINCREMENT,
    value  INTEGER NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS classes (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    number   INTEGER NOT NULL,
    year_id  INTEGER NOT NULL REFERENCES years(id) ON DELETE RESTRICT,
    UNIQUE (number, year_id)
);

-- year_id mirrors classes.year_id at insert time.
CREATE TABLE IF NOT EXISTS certifications (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    teacher_id  INTEGER NOT NULL REFERENCES teachers(id) ON DELETE CASCADE,
    class_id    INTEGER NOT NULL REFERENCES classes(id)  ON DELETE RESTRICT,
    year_id     INTEGER NOT NULL REFERENCES years(id)    ON DELETE RESTRICT,
    status      TEXT NOT NULL DEFAULT 'NOT_CERTIFIED'
                CHECK (status IN ('CERTIFIED', 'NOT_CERTIFIED')),
    file_path   TEXT,
    created_at  TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    UNIQUE (teacher_id, class_id)
);

CREATE INDEX IF NOT EXISTS schools_zone_idx         ON schools(zone_id);
CREATE INDEX IF NOT EXISTS teachers_school_name_idx ON teachers(school_id, name);
CREATE INDEX IF NOT EXISTS classes_year_idx         ON classes(year_id);
CREATE INDEX IF NOT EXISTS certs_class_idx          ON certifications(class_id);
CREATE INDEX IF NOT EXISTS certs_year_idx           ON certifications(year_id);
CREATE INDEX IF NOT EXISTS certs_status_idx         ON certifications(status);

PRAGMA user_version = 1;
";
