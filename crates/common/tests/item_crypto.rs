//! Integration tests for item create / open / update

mod common;

use ::common::codec::{CustomFieldValue, ItemContent};
use ::common::crypto::EncryptionTag;
use ::common::error::{CryptoIntegrityError, KeyResolutionError, VaultCryptoError};
use ::common::share::{CryptoScheme, Rotation};
use ::common::wire;
use proptest::prelude::*;

const SCHEMES: [CryptoScheme; 2] = [CryptoScheme::ShareKey, CryptoScheme::LegacyVaultKey];

#[test]
fn test_note_round_trip() {
    for scheme in SCHEMES {
        let (user, _, keyring) = common::setup_test_env(scheme);
        let note = ItemContent::note("T", "N");
        let item = user.items.create_item(&keyring, &note).unwrap();
        assert_eq!(item.content.key_rotation, Rotation::FIRST);
        assert_eq!(user.items.open(&item, &keyring).unwrap(), note);
    }
}

#[test]
fn test_login_with_custom_fields_round_trip() {
    let (user, _, keyring) = common::setup_test_env(CryptoScheme::ShareKey);
    let login = ItemContent::login(
        "bank",
        "alice@example.com",
        "hunter2",
        vec!["https://bank.example.com".to_string()],
    )
    .with_custom_field("pin", CustomFieldValue::Hidden("1234".to_string()))
    .with_custom_field("branch", CustomFieldValue::Text("north".to_string()));

    let item = user.items.create_item(&keyring, &login).unwrap();
    assert_eq!(user.items.open(&item, &keyring).unwrap(), login);
}

#[test]
fn test_rotation_correctness() {
    for scheme in SCHEMES {
        let (user, _, keyring) = common::setup_test_env(scheme);
        let old = user
            .items
            .create_item(&keyring, &ItemContent::note("old", "r1"))
            .unwrap();

        let rotated = common::rotate_to(&user, &keyring, 2);
        let new = user
            .items
            .create_item(&rotated, &ItemContent::note("new", "r2"))
            .unwrap();
        assert_eq!(new.content.key_rotation, Rotation::new(2));

        // retired rotations still open what they encrypted
        assert_eq!(
            user.items.open(&old, &rotated).unwrap(),
            ItemContent::note("old", "r1")
        );

        let pruned = rotated.without_rotation(Rotation::FIRST);
        let err = user.items.open(&old, &pruned).unwrap_err();
        assert!(matches!(
            err,
            VaultCryptoError::KeyResolution(KeyResolutionError::KeyRotationNotFound { rotation, .. })
                if rotation == Rotation::FIRST
        ));
        assert_eq!(
            user.items.open(&new, &pruned).unwrap(),
            ItemContent::note("new", "r2")
        );
    }
}

#[test]
fn test_no_active_key() {
    let (user, _, keyring) = common::setup_test_env(CryptoScheme::ShareKey);
    let retired = ::common::share::ShareKeyring::new(
        keyring.share_id(),
        keyring.scheme(),
        keyring.keys().iter().map(|k| k.retired()).collect(),
    )
    .unwrap();
    let err = user
        .items
        .create(&retired, &ItemContent::note("T", "N"))
        .unwrap_err();
    assert!(matches!(
        err,
        VaultCryptoError::KeyResolution(KeyResolutionError::NoActiveKey { .. })
    ));
}

#[test]
fn test_update_keeps_history_verbatim() {
    let (user, _, keyring) = common::setup_test_env(CryptoScheme::LegacyVaultKey);
    let v1 = user
        .items
        .create_item(&keyring, &ItemContent::note("T", "v1"))
        .unwrap();
    let v2 = user
        .items
        .update(&v1, &keyring, &ItemContent::note("T", "v2"))
        .unwrap();

    assert_eq!(v2.revision, 2);
    assert_eq!(v2.history[0].content, v1.content);
    assert_eq!(v2.history[0].item_key, v1.item_key);
    assert_eq!(
        user.items
            .open_revision(&v2, &v2.history[0], &keyring)
            .unwrap(),
        ItemContent::note("T", "v1")
    );
}

#[test]
fn test_keystore_refusal_surfaces() {
    let (user, _, keyring) = common::setup_test_env(CryptoScheme::ShareKey);
    let item = user
        .items
        .create_item(&keyring, &ItemContent::note("T", "N"))
        .unwrap();

    user.keystore.lock();
    let err = user.items.open(&item, &keyring).unwrap_err();
    assert_eq!(err.class(), ::common::error::ErrorClass::Keystore);
    user.keystore.unlock();
    assert!(user.items.open(&item, &keyring).is_ok());
}

#[test]
fn test_legacy_wrapped_key_every_bit_flip_fails() {
    let (user, _, keyring) = common::setup_test_env(CryptoScheme::LegacyVaultKey);
    let item = user
        .items
        .create_item(&keyring, &ItemContent::note("T", "N"))
        .unwrap();
    let wrapped = wire::decode(&item.item_key.key, "item key").unwrap();

    for index in 0..wrapped.len() {
        for bit in 0..8 {
            let mut flipped = wrapped.clone();
            flipped[index] ^= 1 << bit;
            let mut tampered = item.clone();
            tampered.item_key.key = wire::encode(&flipped);

            let err = user.items.open(&tampered, &keyring).unwrap_err();
            assert!(
                matches!(
                    err,
                    VaultCryptoError::Integrity(CryptoIntegrityError::DecryptionFailed {
                        tag: EncryptionTag::ItemKey
                    })
                ),
                "flip of byte {} bit {} gave {}",
                index,
                bit,
                err
            );
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_round_trip(title in ".{0,40}", note in ".{0,200}", legacy in any::<bool>()) {
        let scheme = if legacy { CryptoScheme::LegacyVaultKey } else { CryptoScheme::ShareKey };
        let (user, _, keyring) = common::setup_test_env(scheme);
        let content = ItemContent::note(title, note);
        let item = user.items.create_item(&keyring, &content).unwrap();
        prop_assert_eq!(user.items.open(&item, &keyring).unwrap(), content);
    }

    #[test]
    fn prop_bit_flip_is_detected(index in any::<usize>(), bit in 0u8..8, legacy in any::<bool>()) {
        let scheme = if legacy { CryptoScheme::LegacyVaultKey } else { CryptoScheme::ShareKey };
        let (user, _, keyring) = common::setup_test_env(scheme);
        let mut item = user
            .items
            .create_item(&keyring, &ItemContent::note("T", "N"))
            .unwrap();

        let mut ciphertext = wire::decode(&item.content.ciphertext, "ciphertext").unwrap();
        let index = index % ciphertext.len();
        ciphertext[index] ^= 1 << bit;
        item.content.ciphertext = wire::encode(&ciphertext);

        let err = user.items.open(&item, &keyring).unwrap_err();
        let is_decryption_failure = matches!(
            err,
            VaultCryptoError::Integrity(CryptoIntegrityError::DecryptionFailed {
                tag: EncryptionTag::ItemContent
            })
        );
        prop_assert!(is_decryption_failure);
    }
}
