//! End-to-end vault scenarios.

use async_trait::async_trait;
use std::sync::Arc;
use tempfile::TempDir;

use hushvault_common::{Error, ManualClock};
use hushvault_crypto::KdfParams;
use hushvault_custody::{BiometricOutcome, BiometricPrompt, KeyStore, PromptRequest, SoftwareKeyStore};
use hushvault_gesture::{GestureConfig, GestureRecognizer, TapOutcome, TapSequence};
use hushvault_storage::{ItemType, MemoryStore, SqliteStore, VaultStore};
use hushvault_vault::{VaultManager, VaultMetadata, VaultSettings};

const PASSWORD: &[u8] = b"Correct1!";

fn settings() -> VaultSettings {
    VaultSettings {
        kdf_params: KdfParams::new(1024, 1, 1).unwrap(),
        ..Default::default()
    }
}

fn manager_with(
    key_store: Arc<dyn KeyStore>,
    store: Arc<dyn VaultStore>,
    clock: &ManualClock,
) -> VaultManager {
    VaultManager::with_clock(key_store, store, settings(), Arc::new(clock.clone())).unwrap()
}

fn memory_manager(clock: &ManualClock) -> VaultManager {
    manager_with(
        Arc::new(SoftwareKeyStore::new()),
        Arc::new(MemoryStore::new()),
        clock,
    )
}

struct FixedPrompt(BiometricOutcome);

#[async_trait]
impl BiometricPrompt for FixedPrompt {
    async fn authenticate(&self, _request: &PromptRequest) -> BiometricOutcome {
        self.0.clone()
    }
}

#[tokio::test]
async fn note_survives_lock_and_rejects_wrong_password() {
    let clock = ManualClock::default();
    let manager = memory_manager(&clock);
    manager.initialize(PASSWORD).await.unwrap();
    manager.unlock(PASSWORD).await.unwrap();

    let note = manager
        .create_item(
            ItemType::Note,
            "greeting",
            b"hello",
            None,
            Some(VaultMetadata::Note {
                word_count: 1,
                is_formatted: false,
            }),
        )
        .await
        .unwrap();
    manager.lock().await;

    let err = manager.unlock(b"Wrong1!").await.unwrap_err();
    assert!(matches!(err, Error::AuthenticationFailure));
    assert_eq!(err.user_message(), "Incorrect password");
    assert!(matches!(
        manager.get_item(&note.item.id).await,
        Err(Error::SessionNotActive)
    ));

    manager.unlock(PASSWORD).await.unwrap();
    let read = manager.get_item(&note.item.id).await.unwrap();
    assert_eq!(read.content.as_bytes(), b"hello");
}

#[tokio::test]
async fn deleted_item_restores_intact() {
    let clock = ManualClock::default();
    let manager = memory_manager(&clock);
    manager.initialize(PASSWORD).await.unwrap();
    manager.unlock(PASSWORD).await.unwrap();

    let secret = manager
        .create_item(ItemType::Password, "bank", b"hunter2", None, None)
        .await
        .unwrap();
    let entry = manager.delete_item(&secret.item.id).await.unwrap();

    let stats = manager.get_vault_stats().await.unwrap();
    assert_eq!(stats.total_items, 0);
    assert_eq!(stats.trash, 1);

    manager.restore_from_trash(&entry.id).await.unwrap();
    let read = manager.get_item(&secret.item.id).await.unwrap();
    assert_eq!(read.content.as_bytes(), b"hunter2");
    assert_eq!(read.item.title, "bank");
}

#[tokio::test]
async fn trash_retention_boundary() {
    let clock = ManualClock::default();
    let manager = memory_manager(&clock);
    manager.initialize(PASSWORD).await.unwrap();
    manager.unlock(PASSWORD).await.unwrap();

    let item = manager
        .create_item(ItemType::Document, "scan", b"%PDF", None, None)
        .await
        .unwrap();
    manager.delete_item(&item.item.id).await.unwrap();

    clock.advance(chrono::Duration::days(29));
    assert_eq!(manager.purge_expired_trash().await.unwrap(), 0);

    clock.advance(chrono::Duration::days(1) + chrono::Duration::seconds(1));
    assert_eq!(manager.purge_expired_trash().await.unwrap(), 1);
    assert!(manager.get_trash().await.unwrap().is_empty());
}

#[tokio::test]
async fn gesture_reveals_then_password_unlocks() {
    let clock = ManualClock::default();
    let recognizer = GestureRecognizer::with_clock(
        GestureConfig::new(vec![TapSequence::new("reveal", ["7", "3", "9"])]),
        Arc::new(clock.clone()),
    )
    .unwrap();
    let manager = memory_manager(&clock);
    manager.initialize(PASSWORD).await.unwrap();

    assert!(!recognizer.record_tap("7").is_match());
    clock.advance(chrono::Duration::seconds(2));
    assert!(!recognizer.record_tap("3").is_match());
    clock.advance(chrono::Duration::seconds(2));
    let outcome = recognizer.record_tap("9");
    assert!(matches!(outcome, TapOutcome::Matched { index: 0, .. }));

    manager.unlock(PASSWORD).await.unwrap();
    assert!(manager.is_unlocked().await);
}

#[tokio::test]
async fn biometric_unlock_after_enrollment() {
    let clock = ManualClock::default();
    let manager = memory_manager(&clock);
    manager.initialize(PASSWORD).await.unwrap();

    let approve = FixedPrompt(BiometricOutcome::Authenticated);
    assert!(manager.unlock_with_biometric(&approve).await.is_err());

    manager.custodian().enroll_biometric(PASSWORD).unwrap();

    let cancel = FixedPrompt(BiometricOutcome::Cancelled);
    assert!(matches!(
        manager.unlock_with_biometric(&cancel).await,
        Err(Error::BiometricCancelled)
    ));
    assert!(!manager.is_unlocked().await);

    manager.unlock_with_biometric(&approve).await.unwrap();
    assert!(manager.is_unlocked().await);
}

#[tokio::test]
async fn password_change_revokes_biometric() {
    let clock = ManualClock::default();
    let manager = memory_manager(&clock);
    manager.initialize(PASSWORD).await.unwrap();
    manager.custodian().enroll_biometric(PASSWORD).unwrap();

    assert!(manager.change_password(PASSWORD, b"Newer2!").await.unwrap());

    let approve = FixedPrompt(BiometricOutcome::Authenticated);
    assert!(manager.unlock_with_biometric(&approve).await.is_err());
    manager.unlock(b"Newer2!").await.unwrap();
}

#[tokio::test]
async fn auto_lock_after_background_timeout() {
    let clock = ManualClock::default();
    let manager = memory_manager(&clock);
    manager.initialize(PASSWORD).await.unwrap();
    manager.unlock(PASSWORD).await.unwrap();

    manager.enter_background();
    clock.advance(chrono::Duration::seconds(61));

    assert!(manager.enter_foreground().await);
    assert!(matches!(
        manager.get_all_items().await,
        Err(Error::SessionNotActive)
    ));
}

#[tokio::test]
async fn folder_nesting_stops_at_depth_three() {
    let clock = ManualClock::default();
    let manager = memory_manager(&clock);
    manager.initialize(PASSWORD).await.unwrap();
    manager.unlock(PASSWORD).await.unwrap();

    let a = manager.create_folder("a", None, None).await.unwrap();
    let b = manager.create_folder("b", Some(&a.id), None).await.unwrap();
    let c = manager.create_folder("c", Some(&b.id), None).await.unwrap();
    let d = manager.create_folder("d", Some(&c.id), None).await.unwrap();
    assert_eq!(d.depth, 3);

    assert!(matches!(
        manager.create_folder("e", Some(&d.id), None).await,
        Err(Error::DepthExceeded { .. })
    ));
}

#[tokio::test]
async fn sqlite_vault_survives_restart() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("vault.db");
    let clock = ManualClock::default();
    let key_store: Arc<dyn KeyStore> = Arc::new(SoftwareKeyStore::new());

    let id = {
        let store = Arc::new(SqliteStore::open(&db_path).unwrap());
        let manager = manager_with(key_store.clone(), store, &clock);
        manager.initialize(PASSWORD).await.unwrap();
        manager.unlock(PASSWORD).await.unwrap();

        let folder = manager.create_folder("photos", None, None).await.unwrap();
        let item = manager
            .create_item(ItemType::Photo, "beach", b"jpeg bytes", Some(&folder.id), None)
            .await
            .unwrap();
        manager.lock().await;
        item.item.id
    };

    let store = Arc::new(SqliteStore::open(&db_path).unwrap());
    let manager = manager_with(key_store, store, &clock);
    assert!(manager.is_initialized().unwrap());
    manager.unlock(PASSWORD).await.unwrap();

    let read = manager.get_item(&id).await.unwrap();
    assert_eq!(read.content.as_bytes(), b"jpeg bytes");
    assert_eq!(manager.get_folders().await.unwrap().len(), 1);
}

#[tokio::test]
async fn wipe_destroys_everything() {
    let clock = ManualClock::default();
    let manager = memory_manager(&clock);
    manager.initialize(PASSWORD).await.unwrap();
    manager.unlock(PASSWORD).await.unwrap();
    manager
        .create_item(ItemType::Contact, "mum", b"555-0100", None, None)
        .await
        .unwrap();

    manager.wipe().await.unwrap();

    assert!(!manager.is_initialized().unwrap());
    assert!(matches!(
        manager.unlock(PASSWORD).await,
        Err(Error::NotInitialized)
    ));

    manager.initialize(PASSWORD).await.unwrap();
    manager.unlock(PASSWORD).await.unwrap();
    assert!(manager.get_all_items().await.unwrap().is_empty());
}
