// ═══════════════════════════════════════════════════════════════════
// Storage Tests — file format, snapshot versions & migration,
// StorageManager
// ═══════════════════════════════════════════════════════════════════

use chrono::Utc;
use stack_budget_core::errors::CoreError;
use stack_budget_core::models::draft::{DraftInvestment, PortfolioDraft};
use stack_budget_core::models::portfolio::Portfolio;
use stack_budget_core::services::template_service::TemplateService;
use stack_budget_core::storage::format::{self, CURRENT_VERSION, MAGIC, MIN_HEADER_SIZE};
use stack_budget_core::storage::manager::StorageManager;
use stack_budget_core::storage::snapshot::SnapshotV2;

fn sample_portfolio() -> Portfolio {
    let draft = PortfolioDraft::new(
        "Sample",
        100.0,
        vec![
            DraftInvestment::new("Index Fund", 60.0),
            DraftInvestment::new("Gold", 40.0),
        ],
    );
    TemplateService::new().build(&draft).unwrap()
}

fn sample_snapshot() -> SnapshotV2 {
    let portfolio = sample_portfolio();
    SnapshotV2 {
        saved_at: Utc::now(),
        active_portfolio_id: Some(portfolio.id),
        portfolios: vec![portfolio],
    }
}

// ═══════════════════════════════════════════════════════════════════
// File Format
// ═══════════════════════════════════════════════════════════════════

mod file_format {
    use super::*;

    #[test]
    fn write_then_read_roundtrip() {
        let payload = br#"{"hello":"world"}"#;
        let bytes = format::write_file(CURRENT_VERSION, payload);
        let (header, read_payload) = format::read_file(&bytes).unwrap();
        assert_eq!(header.version, CURRENT_VERSION);
        assert_eq!(header.payload_len, payload.len() as u64);
        assert_eq!(read_payload, payload);
    }

    #[test]
    fn header_layout() {
        let bytes = format::write_file(CURRENT_VERSION, b"x");
        assert_eq!(&bytes[0..4], MAGIC);
        assert_eq!(bytes.len(), MIN_HEADER_SIZE + 1);
    }

    #[test]
    fn rejects_short_input() {
        let err = format::read_file(b"SBGT").unwrap_err();
        assert!(matches!(err, CoreError::InvalidFileFormat(_)));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = format::write_file(CURRENT_VERSION, b"payload");
        bytes[0..4].copy_from_slice(b"NOPE");
        let err = format::read_file(&bytes).unwrap_err();
        assert!(matches!(err, CoreError::InvalidFileFormat(_)));
    }

    #[test]
    fn rejects_version_zero() {
        let bytes = format::write_file(0, b"payload");
        let err = format::read_file(&bytes).unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedVersion(0)));
    }

    #[test]
    fn rejects_future_version() {
        let bytes = format::write_file(99, b"payload");
        let err = format::read_file(&bytes).unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedVersion(99)));
    }

    #[test]
    fn rejects_truncated_payload() {
        let mut bytes = format::write_file(CURRENT_VERSION, b"a longer payload");
        bytes.truncate(bytes.len() - 4);
        let err = format::read_file(&bytes).unwrap_err();
        assert!(matches!(err, CoreError::InvalidFileFormat(_)));
    }

    #[test]
    fn accepts_legacy_version_one() {
        let bytes = format::write_file(1, b"{}");
        let (header, _) = format::read_file(&bytes).unwrap();
        assert_eq!(header.version, 1);
    }
}

// ═══════════════════════════════════════════════════════════════════
// StorageManager — current version roundtrip
// ═══════════════════════════════════════════════════════════════════

mod manager {
    use super::*;

    #[test]
    fn bytes_roundtrip_preserves_portfolios() {
        let snapshot = sample_snapshot();
        let bytes = StorageManager::save_to_bytes(&snapshot).unwrap();
        let loaded = StorageManager::load_from_bytes(&bytes).unwrap();
        assert_eq!(loaded.portfolios, snapshot.portfolios);
        assert_eq!(loaded.active_portfolio_id, snapshot.active_portfolio_id);
    }

    #[test]
    fn roundtrip_preserves_money_state() {
        let mut snapshot = sample_snapshot();
        snapshot.portfolios[0].cash_balance = 37.5;
        snapshot.portfolios[0].waiting_room_blocks = 2;
        snapshot.portfolios[0].month_counter = 9;
        snapshot.portfolios[0].elapsed_ms_in_period = 4_200;

        let bytes = StorageManager::save_to_bytes(&snapshot).unwrap();
        let loaded = StorageManager::load_from_bytes(&bytes).unwrap();
        let p = &loaded.portfolios[0];
        assert_eq!(p.cash_balance, 37.5);
        assert_eq!(p.waiting_room_blocks, 2);
        assert_eq!(p.month_counter, 9);
        assert_eq!(p.elapsed_ms_in_period, 4_200);
    }

    #[test]
    fn garbage_bytes_fail() {
        let err = StorageManager::load_from_bytes(b"definitely not a snapshot").unwrap_err();
        assert!(matches!(err, CoreError::InvalidFileFormat(_)));
    }

    #[test]
    fn corrupt_json_payload_fails() {
        let bytes = format::write_file(CURRENT_VERSION, b"{not json");
        let err = StorageManager::load_from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, CoreError::Deserialization(_)));
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.sbgt");
        let path = path.to_str().unwrap();

        let snapshot = sample_snapshot();
        StorageManager::save_to_file(&snapshot, path).unwrap();
        let loaded = StorageManager::load_from_file(path).unwrap();
        assert_eq!(loaded.portfolios, snapshot.portfolios);
    }

    #[test]
    fn missing_file_fails_with_io_error() {
        let err = StorageManager::load_from_file("/nonexistent/state.sbgt").unwrap_err();
        assert!(matches!(err, CoreError::FileIO(_)));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Legacy migration — version 1 capacity crates
// ═══════════════════════════════════════════════════════════════════

mod migration {
    use super::*;

    fn v1_bytes(payload: &str) -> Vec<u8> {
        format::write_file(1, payload.as_bytes())
    }

    #[test]
    fn v1_crates_become_percent_slot_model() {
        let payload = r#"{
            "month": 3,
            "progress_percent": 50.0,
            "block_available": true,
            "crates": [
                {"id": "HDIV", "capacity": 6, "filled": 2},
                {"id": "VDY", "capacity": 3, "filled": 0}
            ]
        }"#;
        let loaded = StorageManager::load_from_bytes(&v1_bytes(payload)).unwrap();

        assert_eq!(loaded.portfolios.len(), 1);
        let p = &loaded.portfolios[0];
        assert_eq!(p.investments.len(), 2);
        assert_eq!(p.investments[0].name, "HDIV");
        assert_eq!(p.investments[0].slot_target, 6);
        assert_eq!(p.investments[1].slot_target, 3);
        // Percentages are even-split during migration.
        assert_eq!(p.investments[0].requested_percent, 50.0);
        assert_eq!(p.investments[1].requested_percent, 50.0);
        assert_eq!(p.full_stack_size, 9);
    }

    #[test]
    fn v1_filled_blocks_materialize_as_one_card() {
        let payload = r#"{
            "month": 3,
            "crates": [
                {"id": "HDIV", "capacity": 6, "filled": 2},
                {"id": "VDY", "capacity": 3, "filled": 0}
            ]
        }"#;
        let loaded = StorageManager::load_from_bytes(&v1_bytes(payload)).unwrap();
        let p = &loaded.portfolios[0];

        assert_eq!(p.stack_cards.len(), 1);
        let card = &p.stack_cards[0];
        assert_eq!(card.crate_state(p.investments[0].id).unwrap().filled, 2);
        // The legacy prototype minted 500-dollar blocks.
        assert_eq!(p.block_value, 500.0);
        assert_eq!(
            card.crate_state(p.investments[0].id).unwrap().value_dollars,
            1_000.0
        );
        assert_eq!(p.investments[0].existing_amount, 1_000.0);
    }

    #[test]
    fn v1_clock_state_carries_over() {
        let payload = r#"{
            "month": 3,
            "progress_percent": 50.0,
            "block_available": true,
            "crates": [
                {"id": "A", "capacity": 2, "filled": 0},
                {"id": "B", "capacity": 2, "filled": 0}
            ]
        }"#;
        let loaded = StorageManager::load_from_bytes(&v1_bytes(payload)).unwrap();
        let p = &loaded.portfolios[0];
        assert_eq!(p.month_counter, 3);
        assert_eq!(p.waiting_room_blocks, 1);
        assert_eq!(p.elapsed_ms_in_period, 7_500);
    }

    #[test]
    fn v1_missing_fields_default() {
        let loaded = StorageManager::load_from_bytes(&v1_bytes(r#"{"crates":[{"id":"A"}]}"#)).unwrap();
        let p = &loaded.portfolios[0];
        assert_eq!(p.investments[0].slot_target, 1);
        assert_eq!(p.month_counter, 1);
        assert_eq!(p.waiting_room_blocks, 0);
    }

    #[test]
    fn v1_empty_snapshot_yields_no_portfolios() {
        let loaded = StorageManager::load_from_bytes(&v1_bytes(r#"{"crates":[]}"#)).unwrap();
        assert!(loaded.portfolios.is_empty());
        assert!(loaded.active_portfolio_id.is_none());
    }

    #[test]
    fn v1_migrated_portfolio_becomes_active() {
        let loaded = StorageManager::load_from_bytes(&v1_bytes(
            r#"{"crates":[{"id":"A","capacity":2},{"id":"B","capacity":2}]}"#,
        ))
        .unwrap();
        assert_eq!(loaded.active_portfolio_id, Some(loaded.portfolios[0].id));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Normalization — best-effort repair of corrupt persisted data
// ═══════════════════════════════════════════════════════════════════

mod normalization {
    use super::*;

    fn roundtrip(snapshot: &SnapshotV2) -> SnapshotV2 {
        let bytes = StorageManager::save_to_bytes(snapshot).unwrap();
        StorageManager::load_from_bytes(&bytes).unwrap()
    }

    #[test]
    fn percent_drift_is_rescaled_to_100() {
        let mut snapshot = sample_snapshot();
        snapshot.portfolios[0].investments[0].requested_percent = 90.0;
        snapshot.portfolios[0].investments[1].requested_percent = 60.0;

        let loaded = roundtrip(&snapshot);
        let sum: f64 = loaded.portfolios[0]
            .investments
            .iter()
            .map(|i| i.requested_percent)
            .sum();
        assert!((sum - 100.0).abs() < 0.01);
        assert!((loaded.portfolios[0].investments[0].requested_percent - 60.0).abs() < 1e-9);
    }

    #[test]
    fn zero_slot_target_is_clamped() {
        let mut snapshot = sample_snapshot();
        snapshot.portfolios[0].investments[0].slot_target = 0;

        let loaded = roundtrip(&snapshot);
        assert_eq!(loaded.portfolios[0].investments[0].slot_target, 1);
        // full_stack_size is re-derived from the repaired slots.
        assert_eq!(loaded.portfolios[0].full_stack_size, 3);
    }

    #[test]
    fn excess_cash_mints_waiting_blocks() {
        let mut snapshot = sample_snapshot();
        snapshot.portfolios[0].cash_balance = 250.0;

        let loaded = roundtrip(&snapshot);
        let p = &loaded.portfolios[0];
        assert_eq!(p.waiting_room_blocks, 2);
        assert_eq!(p.cash_balance, 50.0);
    }

    #[test]
    fn ledger_filled_is_rederived_from_values() {
        let mut snapshot = sample_snapshot();
        let id = snapshot.portfolios[0].investments[0].id;
        let state = snapshot.portfolios[0].stack_cards[0]
            .crate_state_mut(id)
            .unwrap();
        state.value_dollars = 200.0;
        state.filled = 9;

        let loaded = roundtrip(&snapshot);
        let state = loaded.portfolios[0].stack_cards[0].crate_state(id).unwrap();
        assert_eq!(state.filled, 2);
        assert_eq!(state.value_dollars, 200.0);
    }

    #[test]
    fn missing_cards_are_recreated() {
        let mut snapshot = sample_snapshot();
        snapshot.portfolios[0].stack_cards.clear();

        let loaded = roundtrip(&snapshot);
        assert_eq!(loaded.portfolios[0].stack_cards.len(), 1);
    }

    #[test]
    fn elapsed_period_is_wrapped_below_month_duration() {
        let mut snapshot = sample_snapshot();
        snapshot.portfolios[0].elapsed_ms_in_period = 40_000;

        let loaded = roundtrip(&snapshot);
        assert!(loaded.portfolios[0].elapsed_ms_in_period < 15_000);
    }

    #[test]
    fn unknown_active_id_falls_back_on_facade_load() {
        use stack_budget_core::StackBudget;

        let mut snapshot = sample_snapshot();
        snapshot.active_portfolio_id = Some(uuid::Uuid::new_v4());
        let bytes = StorageManager::save_to_bytes(&snapshot).unwrap();

        let app = StackBudget::load_from_bytes(&bytes).unwrap();
        assert_eq!(app.active_portfolio_id(), Some(snapshot.portfolios[0].id));
    }
}
