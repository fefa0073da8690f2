//! Multi-statement fixture scripts.
//!
//! A script is plain text with statements terminated by `;`. Lines whose
//! first non-whitespace character is `#` are comments.

use crate::error::{Error, Result, StatementError, StoreError};
use std::path::Path;

/// Anything that can execute a single SQL statement.
pub trait ExecuteStatement {
    fn execute_statement(&mut self, sql: &str) -> std::result::Result<(), StoreError>;
}

/// Split a script into statements, dropping comment lines and blank
/// statements. Returned statements are trimmed and carry no trailing `;`.
///
/// Comment lines are removed before splitting, so a `;` inside a comment
/// never ends a statement. A `;` inside a string literal is not special.
pub fn split_statements(source: &str) -> Vec<String> {
    let uncommented: Vec<&str> = source
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect();
    uncommented
        .join("\n")
        .split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty())
        .map(str::to_string)
        .collect()
}

/// Execute every statement of `source` in order, stopping at the first
/// failure.
///
/// Nothing is rolled back: statements before the failing one keep their
/// effects.
pub fn exec_multi<S>(store: &mut S, source: &str) -> std::result::Result<(), StatementError>
where
    S: ExecuteStatement + ?Sized,
{
    for (index, statement) in split_statements(source).into_iter().enumerate() {
        tracing::debug!(index, statement = %statement, "executing setup statement");
        if let Err(cause) = store.execute_statement(&statement) {
            return Err(StatementError {
                index,
                statement,
                cause,
            });
        }
    }
    Ok(())
}

/// Execute the fixture script `sql`.
pub fn load_setup_string<S>(store: &mut S, sql: &str) -> Result<()>
where
    S: ExecuteStatement + ?Sized,
{
    exec_multi(store, sql).map_err(Error::Statement)
}

/// Read the fixture script at `path` and execute it.
pub fn load_setup_file<S>(store: &mut S, path: &Path) -> Result<()>
where
    S: ExecuteStatement + ?Sized,
{
    let sql = std::fs::read_to_string(path).map_err(|e| {
        Error::resource(format!("error reading setup file {}", path.display()), e)
    })?;
    tracing::debug!(setup = %path.display(), "loading setup file");
    load_setup_string(store, &sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FixtureStore;
    use tempfile::tempdir;

    /// Records statements and fails on any containing `FAIL`.
    #[derive(Default)]
    struct Recorder {
        executed: Vec<String>,
    }

    impl ExecuteStatement for Recorder {
        fn execute_statement(&mut self, sql: &str) -> std::result::Result<(), StoreError> {
            if sql.contains("FAIL") {
                return Err(StoreError::new("intentional failure"));
            }
            self.executed.push(sql.to_string());
            Ok(())
        }
    }

    #[derive(Debug, PartialEq)]
    struct Row {
        n: i64,
        s: String,
    }

    fn collect_rows(store: &FixtureStore, query: &str) -> Vec<Row> {
        let conn = store.lock().unwrap();
        let mut stmt = conn.prepare(query).unwrap();
        let rows = stmt
            .query_map([], |row| {
                Ok(Row {
                    n: row.get(0)?,
                    s: row.get(1)?,
                })
            })
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        rows
    }

    fn row(n: i64, s: &str) -> Row {
        Row { n, s: s.to_string() }
    }

    #[test]
    fn test_split_statements() {
        let stmts = split_statements("CREATE TABLE t (n int);\n\nINSERT INTO t VALUES (1);  ;\n");
        assert_eq!(stmts, vec!["CREATE TABLE t (n int)", "INSERT INTO t VALUES (1)"]);
    }

    #[test]
    fn test_split_statement_without_terminator() {
        assert_eq!(split_statements("SELECT 1"), vec!["SELECT 1"]);
        assert!(split_statements("  \n ; ;\n").is_empty());
    }

    #[test]
    fn test_split_strips_comment_lines() {
        let stmts = split_statements(
            "# leading comment; with semicolon\nINSERT INTO t\n   # indented comment\n  VALUES (1);\n# only a comment;\n",
        );
        assert_eq!(stmts, vec!["INSERT INTO t\n  VALUES (1)"]);
    }

    #[test]
    fn test_exec_multi() {
        let setup = "
CREATE table test(n int, s string);
INSERT into test(n, s) values(1, 'a'), (2, 'b'), (3, 'c');
";
        let mut store = FixtureStore::open_in_memory().unwrap();
        exec_multi(&mut store, setup).unwrap();

        let rows = collect_rows(&store, "SELECT n, s from test order by n;");
        assert_eq!(rows, vec![row(1, "a"), row(2, "b"), row(3, "c")]);
    }

    #[test]
    fn test_comments() {
        let setup = "
CREATE table test(n int, s string);
# This is a comment
INSERT into test(n, s)
# another comment
  values(1, 'a');
";
        let mut store = FixtureStore::open_in_memory().unwrap();
        exec_multi(&mut store, setup).unwrap();

        let rows = collect_rows(&store, "SELECT n, s from test order by n;");
        assert_eq!(rows, vec![row(1, "a")]);
    }

    #[test]
    fn test_sql_comment_only_statement_is_noop() {
        let setup = "
CREATE TABLE t (n int);
INSERT INTO t VALUES (1); /* block comment */;
-- trailing sql comment
";
        let mut store = FixtureStore::open_in_memory().unwrap();
        exec_multi(&mut store, setup).unwrap();
        assert_eq!(store.query_text("SELECT n FROM t").unwrap(), "1");
    }

    #[test]
    fn test_exec_errors() {
        let mut store = FixtureStore::open_in_memory().unwrap();
        let err = exec_multi(&mut store, "invalid sql").unwrap_err();
        assert_eq!(err.index, 0);
        assert_eq!(err.statement, "invalid sql");
    }

    #[test]
    fn test_fail_fast_without_rollback() {
        let setup = "
CREATE TABLE t (n int);
INSERT INTO t VALUES (1);
INSERT INTO missing VALUES (2);
INSERT INTO t VALUES (3);
";
        let mut store = FixtureStore::open_in_memory().unwrap();
        let err = exec_multi(&mut store, setup).unwrap_err();
        assert_eq!(err.index, 2);
        assert!(err.statement.contains("missing"));
        // The statements before the failure stay applied; the one after never ran.
        assert_eq!(store.query_text("SELECT n FROM t").unwrap(), "1");
    }

    #[test]
    fn test_stops_at_first_failure() {
        let mut rec = Recorder::default();
        let err = exec_multi(&mut rec, "one; two FAIL; three;").unwrap_err();
        assert_eq!(rec.executed, vec!["one"]);
        assert_eq!(err.index, 1);
    }

    #[test]
    fn test_load_setup_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db1.setup");
        std::fs::write(
            &path,
            "CREATE TABLE test(n int, s string);\nINSERT INTO test VALUES (1, 'a'), (2, 'b'), (3, 'c');\n",
        )
        .unwrap();
        let mut store = FixtureStore::open_in_memory().unwrap();
        load_setup_file(&mut store, &path).unwrap();

        let rows = collect_rows(&store, "SELECT n, s from test order by n;");
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_load_setup_string_wraps_statement_error() {
        let mut rec = Recorder::default();
        let err = load_setup_string(&mut rec, "FAIL").unwrap_err();
        assert!(matches!(err, Error::Statement(_)));
    }
}
