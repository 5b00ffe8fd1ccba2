//! ScanLab Runner: scan orchestration, alert building, persistence.
//!
//! This crate builds on `scanlab-core` to provide:
//! - Bar source selection (CSV, Parquet, synthetic) and dataset hashing
//! - The scan runner: regime first, per-symbol fan-out, deterministic fan-in
//! - Alert building (ids, provenance, regime snapshot, compliance notice)
//! - Run reports with per-symbol skips
//! - JSONL alert persistence and the "latest" publishing export

pub mod data_loader;
pub mod export;
pub mod runner;

pub use data_loader::{dataset_hash, open_source, FileFormat, LoadOptions, SyntheticBarSource};
pub use export::{
    alert_line, publish_latest, read_alerts_jsonl, save_alerts_jsonl, save_report_json,
    LatestPayload,
};
pub use runner::{
    alert_id, build_alert, run_scan, AlertContext, ScanError, ScanOptions, ScanReport, SkipStage,
    SymbolSkip, COMPLIANCE_NOTICE,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn scan_report_is_send_sync() {
        assert_send::<ScanReport>();
        assert_sync::<ScanReport>();
    }

    #[test]
    fn scan_error_is_send_sync() {
        assert_send::<ScanError>();
        assert_sync::<ScanError>();
    }

    #[test]
    fn sources_are_send_sync() {
        assert_send::<SyntheticBarSource>();
        assert_sync::<SyntheticBarSource>();
        assert_send::<LoadOptions>();
        assert_sync::<LoadOptions>();
    }
}
