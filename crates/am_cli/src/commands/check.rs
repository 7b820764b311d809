use am_core::app_error::AppResult;
use am_core::db::resolve_store_path;
use am_core::sanity::check_archive;
use am_core::store_sqlite::SqliteStore;

pub fn run_check(profile: &str) -> AppResult<()> {
    let path = resolve_store_path(profile, "profile")?;
    let store = SqliteStore::open_read_only(&path)?;
    let report = check_archive(&store, "profile")?;
    println!(
        "{} contacts, {} conversations, {} messages. All checks passed.",
        report.parties, report.threads, report.messages
    );
    Ok(())
}
