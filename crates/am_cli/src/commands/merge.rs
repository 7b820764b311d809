use am_core::app_error::{AppError, AppResult};
use am_core::config::MergeConfig;
use am_core::db::resolve_store_path;
use am_core::run;
use am_core::store_sqlite::SqliteStore;
use std::path::{Path, PathBuf};

pub struct MergeArgs {
    pub pretend: bool,
    pub timestamp_leeway: i64,
    pub close_call_window: i64,
    pub json: bool,
}

fn canonical(path: &Path) -> AppResult<PathBuf> {
    path.canonicalize().map_err(|e| {
        AppError::config(
            "failed to resolve store path",
            serde_json::json!({ "error": e.to_string(), "path": path }),
        )
    })
}

pub fn run_merge(source: &str, target: &str, args: MergeArgs) -> AppResult<()> {
    let config = MergeConfig {
        timestamp_leeway_secs: args.timestamp_leeway,
        close_call_window_secs: args.close_call_window,
        pretend: args.pretend,
    };
    config.validate()?;

    let source_path = canonical(&resolve_store_path(source, "source")?)?;
    let target_path = canonical(&resolve_store_path(target, "target")?)?;
    if source_path == target_path {
        return Err(AppError::config(
            "source and target are the same archive",
            serde_json::json!({ "path": source_path }),
        ));
    }

    let source_store = SqliteStore::open_read_only(&source_path)?;
    tracing::info!(path = %source_store.path().display(), "source archive opened");
    let mut target_store = SqliteStore::open(&target_path)?;
    tracing::info!(path = %target_store.path().display(), "target archive opened");

    let audit = run::run_merge(&source_store, &mut target_store, &config)?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&audit).map_err(|e| {
            AppError::new(
                "AM_AUDIT_SERIALIZE_FAILED",
                "internal",
                "failed to serialize merge audit",
                false,
                serde_json::json!({ "error": e.to_string() }),
            )
        })?;
        println!("{}", rendered);
    } else {
        println!("{}", audit);
        if audit.pretend {
            println!("Saving nothing.");
        }
    }
    Ok(())
}
