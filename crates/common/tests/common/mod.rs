//! Shared test utilities for the integration suites
#![allow(dead_code)]

use std::sync::Once;

use common::codec::VaultMetadata;
use common::share::{CryptoScheme, ShareKeyring};
use common::testkit::TestUser;
use common::vault::VaultProvisioningBundle;

static TRACING: Once = Once::new();

/// Route engine logs to the test writer. Filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Set up a test environment with a fresh user and one vault under `scheme`
pub fn setup_test_env(scheme: CryptoScheme) -> (TestUser, VaultProvisioningBundle, ShareKeyring) {
    init_tracing();
    let user = TestUser::new().unwrap();
    let bundle = user
        .vaults
        .create_vault_with_scheme(scheme, &VaultMetadata::new("test", "integration"))
        .unwrap();
    let keyring = bundle.keyring().unwrap();
    (user, bundle, keyring)
}

/// Rotate `keyring` until its active key is at `rotation`
pub fn rotate_to(user: &TestUser, keyring: &ShareKeyring, rotation: u64) -> ShareKeyring {
    let mut keyring = keyring.clone();
    while keyring.active().unwrap().rotation.get() < rotation {
        keyring = user.vaults.rotate(&keyring).unwrap().apply(&keyring).unwrap();
    }
    keyring
}
