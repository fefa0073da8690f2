//! Integration tests for the database tester against the checked-in testdata.

use golden::store::FixtureStore;
use golden::{DbTester, Error, Lifecycle, OutputSink, from_setup_to_golden, run};
use std::io::Write;

fn write_rows(store: &FixtureStore, w: &mut OutputSink) -> anyhow::Result<()> {
    let conn = store.lock()?;
    let mut stmt = conn.prepare("SELECT n, s FROM test ORDER BY n")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let n: i64 = row.get(0)?;
        let s: String = row.get(1)?;
        writeln!(w, "n={n} s={s}")?;
    }
    Ok(())
}

#[test]
fn test_rows_match_golden() {
    let mut t = DbTester::new("rows", write_rows);
    run(&mut t).unwrap();
}

#[test]
fn test_changed_row_is_mismatch() {
    let mut t = DbTester::new("rows-changed", write_rows);
    t.config_mut().setup.base_name = Some("rows".to_string());
    t.config_mut().golden.base_name = Some("rows-z".to_string());
    let err = run(&mut t).unwrap_err();
    match err {
        Error::Mismatch { first_line, .. } => assert_eq!(first_line, 3),
        other => panic!("expected mismatch, got {other}"),
    }
}

#[test]
fn test_from_setup_to_golden() {
    from_setup_to_golden("db-example", |store, w| {
        writeln!(w, "{}", store.query_text("SELECT id, name FROM users ORDER BY id")?)?;
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_bad_setup_reports_statement() {
    let mut t = DbTester::new("bad-setup", write_rows);
    let err = run(&mut t).unwrap_err();
    match &err {
        Error::Statement(e) => {
            assert_eq!(e.index, 1);
            assert!(e.statement.contains("no_such_table"));
        }
        other => panic!("expected statement error, got {other}"),
    }
    assert!(err.to_string().contains("setup statement #2"), "{err}");
    assert!(t.store().is_none());
}

#[test]
fn test_each_tester_gets_a_fresh_store() {
    // Both testers load the same setup; a shared store would fail on the
    // second CREATE TABLE.
    let mut first = DbTester::new("rows-first", write_rows);
    let mut second = DbTester::new("rows-second", write_rows);
    for t in [&mut first, &mut second] {
        t.config_mut().setup.base_name = Some("rows".to_string());
    }
    first.init().unwrap();
    second.init().unwrap();
    first.arrange().unwrap();
    second.arrange().unwrap();
    first.close().unwrap();
    second.close().unwrap();
}
