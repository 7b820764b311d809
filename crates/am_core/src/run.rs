use crate::app_error::AppResult;
use crate::audit::MergeAudit;
use crate::config::MergeConfig;
use crate::fingerprint::FingerprintIndex;
use crate::identity::{build_thread_id_map, reconcile_parties, reconcile_threads};
use crate::merge::MergeEngine;
use crate::sanity::check_archive;
use crate::store::RecordStore;

/// Merges `source` into `target`.
///
/// Both archives must pass the sanity checks first. Everything then runs
/// inside one target transaction. It is committed only when
/// every phase succeeded and `pretend` is off; any error rolls it back, so
/// the target is either fully merged or untouched.
pub fn run_merge<S, T>(source: &S, target: &mut T, config: &MergeConfig) -> AppResult<MergeAudit>
where
    S: RecordStore + ?Sized,
    T: RecordStore + ?Sized,
{
    config.validate()?;
    check_archive(source, "source")?;
    check_archive(target, "target")?;

    target.begin()?;
    let result = merge_in_transaction(source, target, config);
    match result {
        Ok(audit) => {
            if config.pretend {
                target.rollback()?;
                tracing::info!("pretend run, nothing saved");
            } else {
                target.commit()?;
                tracing::info!(added = audit.added, "merge committed");
            }
            Ok(audit)
        }
        Err(err) => {
            if let Err(rollback_err) = target.rollback() {
                tracing::error!(code = %rollback_err.code, "rollback after failed merge failed");
            }
            tracing::error!(code = %err.code, "merge aborted, nothing saved");
            Err(err)
        }
    }
}

fn merge_in_transaction<S, T>(source: &S, target: &mut T, config: &MergeConfig) -> AppResult<MergeAudit>
where
    S: RecordStore + ?Sized,
    T: RecordStore + ?Sized,
{
    tracing::info!("synchronizing contacts");
    let new_parties = reconcile_parties(&source.parties()?, &target.parties()?);
    for party in &new_parties {
        target.insert_party(party)?;
    }

    tracing::info!("synchronizing conversations");
    let source_threads = source.threads()?;
    let new_threads = reconcile_threads(&source_threads, &target.threads()?);
    for thread in &new_threads {
        target.insert_thread(thread)?;
    }
    let thread_map = build_thread_id_map(&source_threads, &target.threads()?)?;

    tracing::info!("synchronizing messages");
    let index = FingerprintIndex::build(target.messages()?)?;
    let outcome = MergeEngine::new(&index, &thread_map, config).merge(&source.messages()?)?;
    for row in &outcome.inserts {
        target.insert_message(row)?;
    }

    let mut audit = outcome.audit;
    audit.parties_added = new_parties.len();
    audit.threads_added = new_threads.len();
    Ok(audit)
}
