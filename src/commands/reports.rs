//! `mdpublish reports` command.

use crate::adapters::live::sqlite::SqliteStore;
use crate::config::Settings;
use crate::ports::{ReportRow, ReportTable};

/// Execute the `reports` command.
///
/// Prints the newest audit-table rows as a table.
///
/// # Errors
///
/// Returns an error string if the database cannot be opened or queried.
pub fn run(settings: &Settings, limit: usize) -> Result<(), String> {
    let store = SqliteStore::open(&settings.db_path)
        .map_err(|e| format!("Failed to open database {}: {e}", settings.db_path.display()))?;
    let rows = store.recent_reports(limit).map_err(|e| format!("Failed to read reports: {e}"))?;
    print!("{}", render(&rows));
    Ok(())
}

fn render(rows: &[ReportRow]) -> String {
    if rows.is_empty() {
        return "No reports found.\n".to_string();
    }

    let date_width = rows.iter().map(|r| r.date.len()).max().unwrap_or(4).max(4);
    let result_width = rows.iter().map(|r| r.result.len()).max().unwrap_or(6).max(6);
    let lang_width = rows.iter().map(|r| r.lang.len()).max().unwrap_or(4).max(4);
    let user_width = rows.iter().map(|r| r.user.len()).max().unwrap_or(4).max(4);

    let mut out = format!(
        "{:<date_width$}  {:<result_width$}  {:<lang_width$}  {:<user_width$}  TITLE\n",
        "DATE", "RESULT", "LANG", "USER",
    );
    out.push_str(&format!(
        "{:-<date_width$}  {:-<result_width$}  {:-<lang_width$}  {:-<user_width$}  -----\n",
        "", "", "", "",
    ));
    for r in rows {
        out.push_str(&format!(
            "{:<date_width$}  {:<result_width$}  {:<lang_width$}  {:<user_width$}  {}\n",
            r.date, r.result, r.lang, r.user, r.title,
        ));
    }
    out.push_str(&format!("\n{} report(s).\n", rows.len()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, result: &str) -> ReportRow {
        ReportRow {
            id,
            date: "2024-05-01 12:00:00".into(),
            title: "Foo".into(),
            user: "Alice".into(),
            lang: "fr".into(),
            sourcetitle: "Foo".into(),
            result: result.into(),
            data: "{}".into(),
        }
    }

    #[test]
    fn empty_table_says_so() {
        assert_eq!(render(&[]), "No reports found.\n");
    }

    #[test]
    fn rows_are_aligned_under_headers() {
        let text = render(&[row(2, "success"), row(1, "noaccess")]);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("DATE"));
        assert!(lines[2].contains("success"));
        assert!(lines[3].contains("noaccess"));
        assert_eq!(lines[2].find("fr"), lines[3].find("fr"));
        assert!(text.ends_with("2 report(s).\n"));
    }

    #[test]
    fn run_on_fresh_database_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings { db_path: dir.path().join("p.db"), ..Settings::default() };
        run(&settings, 5).unwrap();
    }
}
