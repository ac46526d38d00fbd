//! Wallet Challenge and Linking Tests
//!
//! Drives challenge issuance, both proof modes, and connect/disconnect
//! through the public API over the in-memory store.

use chrono::Utc;
use ed25519_dalek::{Signer, SigningKey};
use std::sync::Arc;

use solana_hash::Hash;
use solana_message::compiled_instruction::CompiledInstruction;
use solana_message::{v0, MessageHeader, VersionedMessage};
use solana_pubkey::Pubkey;
use solana_transaction::versioned::VersionedTransaction;
use folio_auth::auth::{ChallengeStore, SignatureVerifier, VerificationError};
use folio_auth::config::DEFAULT_SIGN_MESSAGE_PREFIX;
use folio_auth::models::{Creator, PrincipalRef, Role, User, VerificationMode};
use folio_auth::store::MemoryStore;
use folio_auth::wallet::{NoLabelResolver, WalletError, WalletEvent, WalletEvents, WalletLinker};

// ============================================================================
// Fixtures
// ============================================================================

struct Harness {
    challenges: ChallengeStore,
    verifier: SignatureVerifier,
    linker: WalletLinker,
}

async fn harness() -> Harness {
    let store = MemoryStore::new();
    store
        .insert_user(User {
            id: 7,
            email: "reader@example.com".to_string(),
            name: "reader".to_string(),
            role: Role::User,
            password_hash: String::new(),
            nonce: None,
            last_login: None,
            created_at: Utc::now(),
        })
        .await;
    store
        .insert_creator(Creator {
            id: 7,
            email: "studio@example.com".to_string(),
            name: "studio".to_string(),
            password_hash: String::new(),
            nonce: None,
            last_login: None,
            created_at: Utc::now(),
        })
        .await;

    let principals = Arc::new(store.clone());
    let prefix = DEFAULT_SIGN_MESSAGE_PREFIX.to_string();
    let verifier = SignatureVerifier::new(principals.clone(), prefix.clone());

    Harness {
        challenges: ChallengeStore::new(principals.clone(), prefix),
        linker: WalletLinker::new(
            verifier.clone(),
            Arc::new(store),
            Arc::new(NoLabelResolver),
            WalletEvents::default(),
        ),
        verifier,
    }
}

fn keypair(seed: u8) -> (SigningKey, String) {
    let key = SigningKey::from_bytes(&[seed; 32]);
    let address = bs58::encode(key.verifying_key().as_bytes()).into_string();
    (key, address)
}

fn sign_message(key: &SigningKey, message: &str) -> String {
    bs58::encode(key.sign(message.as_bytes()).to_bytes()).into_string()
}

/// Memo-style v0 transaction carrying `data` in its last instruction
fn signed_transaction(signers: &[&SigningKey], data: &[u8]) -> String {
    let mut account_keys: Vec<Pubkey> = signers
        .iter()
        .map(|k| Pubkey::new_from_array(k.verifying_key().to_bytes()))
        .collect();
    account_keys.push(Pubkey::new_from_array([42u8; 32]));
    let program_id_index = (account_keys.len() - 1) as u8;

    let message = VersionedMessage::V0(v0::Message {
        header: MessageHeader {
            num_required_signatures: signers.len() as u8,
            num_readonly_signed_accounts: 0,
            num_readonly_unsigned_accounts: 1,
        },
        account_keys,
        recent_blockhash: Hash::new_from_array([3u8; 32]),
        instructions: vec![CompiledInstruction {
            program_id_index,
            accounts: vec![0],
            data: data.to_vec(),
        }],
        address_table_lookups: vec![],
    });

    let bytes = bincode::serialize(&message).unwrap();
    let transaction = VersionedTransaction {
        signatures: signers
            .iter()
            .map(|k| solana_signature::Signature::from(k.sign(&bytes).to_bytes()))
            .collect(),
        message,
    };
    bs58::encode(bincode::serialize(&transaction).unwrap()).into_string()
}

// ============================================================================
// Challenge Scenario
// ============================================================================

#[tokio::test]
async fn test_connect_disconnect_reconnect_scenario() {
    let h = harness().await;
    let user = PrincipalRef::user(7);
    let (key, address) = keypair(11);

    let first_challenge = h.challenges.issue_challenge(user).await.unwrap();
    assert!(first_challenge.starts_with("Sign this message for authenticating with your wallet: "));
    let first_signature = sign_message(&key, &first_challenge);

    let wallet = h
        .linker
        .connect(user, &address, &first_signature, VerificationMode::Message)
        .await
        .unwrap();
    assert_eq!(wallet.owner, Some(user));

    h.linker.disconnect(&address).await.unwrap();

    let second_challenge = h.challenges.issue_challenge(user).await.unwrap();
    assert_ne!(first_challenge, second_challenge);

    // The old signature no longer matches the live challenge
    let err = h
        .linker
        .connect(user, &address, &first_signature, VerificationMode::Message)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WalletError::Verification(VerificationError::SignatureMismatch)
    ));

    let second_signature = sign_message(&key, &second_challenge);
    let wallet = h
        .linker
        .connect(user, &address, &second_signature, VerificationMode::Message)
        .await
        .unwrap();
    assert_eq!(wallet.owner, Some(user));
}

#[tokio::test]
async fn test_disconnect_twice_leaves_unowned_row() {
    let h = harness().await;
    let user = PrincipalRef::user(7);
    let (key, address) = keypair(12);

    let challenge = h.challenges.issue_challenge(user).await.unwrap();
    h.linker
        .connect(user, &address, &sign_message(&key, &challenge), VerificationMode::Message)
        .await
        .unwrap();

    h.linker.disconnect(&address).await.unwrap();
    h.linker.disconnect(&address).await.unwrap();

    let wallet = h.linker.find(&address).await.unwrap().unwrap();
    assert!(wallet.owner.is_none());
}

#[tokio::test]
async fn test_reconnect_by_other_principal_reassigns() {
    let h = harness().await;
    let (key, address) = keypair(13);
    let mut events = h.linker.events().subscribe();

    for principal in [PrincipalRef::user(7), PrincipalRef::creator(7)] {
        let challenge = h.challenges.issue_challenge(principal).await.unwrap();
        h.linker
            .connect(
                principal,
                &address,
                &sign_message(&key, &challenge),
                VerificationMode::Message,
            )
            .await
            .unwrap();
    }

    assert!(h.linker.list(PrincipalRef::user(7)).await.unwrap().is_empty());
    assert_eq!(h.linker.list(PrincipalRef::creator(7)).await.unwrap().len(), 1);

    let mut owners = Vec::new();
    for _ in 0..2 {
        if let WalletEvent::Connected { owner, .. } = events.recv().await.unwrap() {
            owners.push(owner);
        }
    }
    assert_eq!(owners, [PrincipalRef::user(7), PrincipalRef::creator(7)]);
}

#[tokio::test]
async fn test_verification_without_challenge() {
    let h = harness().await;
    let (key, address) = keypair(14);
    let sig = sign_message(&key, "anything");

    let err = h
        .verifier
        .verify_ownership(PrincipalRef::user(7), &address, &sig, VerificationMode::Message)
        .await
        .unwrap_err();
    assert!(matches!(err, VerificationError::NoActiveChallenge));

    let err = h
        .verifier
        .verify_ownership(PrincipalRef::user(99), &address, &sig, VerificationMode::Message)
        .await
        .unwrap_err();
    assert!(matches!(err, VerificationError::PrincipalNotFound));
}

#[tokio::test]
async fn test_challenges_are_per_principal() {
    let h = harness().await;
    let (key, address) = keypair(15);

    let user_challenge = h.challenges.issue_challenge(PrincipalRef::user(7)).await.unwrap();
    h.challenges
        .issue_challenge(PrincipalRef::creator(7))
        .await
        .unwrap();

    // A signature over the user's challenge does not prove anything for the creator
    let sig = sign_message(&key, &user_challenge);
    assert!(h
        .verifier
        .verify_ownership(PrincipalRef::user(7), &address, &sig, VerificationMode::Message)
        .await
        .is_ok());
    assert!(matches!(
        h.verifier
            .verify_ownership(PrincipalRef::creator(7), &address, &sig, VerificationMode::Message)
            .await,
        Err(VerificationError::SignatureMismatch)
    ));
}

// ============================================================================
// Transaction Mode
// ============================================================================

#[tokio::test]
async fn test_transaction_mode_connect() {
    let h = harness().await;
    let user = PrincipalRef::user(7);
    let (key, address) = keypair(21);

    let challenge = h.challenges.issue_challenge(user).await.unwrap();
    let tx = signed_transaction(&[&key], challenge.as_bytes());

    let wallet = h
        .linker
        .connect(user, &address, &tx, VerificationMode::Transaction)
        .await
        .unwrap();
    assert_eq!(wallet.owner, Some(user));
}

#[tokio::test]
async fn test_transaction_mode_rejections() {
    let h = harness().await;
    let user = PrincipalRef::user(7);
    let (key, address) = keypair(22);
    let (other, _) = keypair(23);

    let challenge = h.challenges.issue_challenge(user).await.unwrap();

    // Two signers, even though the first one matches and signs correctly
    let tx = signed_transaction(&[&key, &other], challenge.as_bytes());
    assert!(matches!(
        h.verifier
            .verify_ownership(user, &address, &tx, VerificationMode::Transaction)
            .await,
        Err(VerificationError::SignerCountInvalid)
    ));

    // Sole signer is not the claimed address
    let tx = signed_transaction(&[&other], challenge.as_bytes());
    assert!(matches!(
        h.verifier
            .verify_ownership(user, &address, &tx, VerificationMode::Transaction)
            .await,
        Err(VerificationError::SignerAddressMismatch)
    ));

    // Challenge differs by one byte
    let mut data = challenge.clone().into_bytes();
    let last = data.len() - 1;
    data[last] ^= 0x01;
    let tx = signed_transaction(&[&key], &data);
    assert!(matches!(
        h.verifier
            .verify_ownership(user, &address, &tx, VerificationMode::Transaction)
            .await,
        Err(VerificationError::ChallengeDataMismatch)
    ));

    // A detached message signature is not a transaction
    let sig = sign_message(&key, &challenge);
    assert!(h
        .verifier
        .verify_ownership(user, &address, &sig, VerificationMode::Transaction)
        .await
        .is_err());

    // Nothing was linked along the way
    assert!(h.linker.find(&address).await.unwrap().is_none());
}

#[tokio::test]
async fn test_malformed_encodings() {
    let h = harness().await;
    let user = PrincipalRef::user(7);
    let (key, address) = keypair(24);
    let challenge = h.challenges.issue_challenge(user).await.unwrap();
    let sig = sign_message(&key, &challenge);

    let err = h
        .verifier
        .verify_ownership(user, "not-base58-0OIl", &sig, VerificationMode::Message)
        .await
        .unwrap_err();
    assert!(err.is_malformed());

    let err = h
        .verifier
        .verify_ownership(user, &address, "0OIl", VerificationMode::Message)
        .await
        .unwrap_err();
    assert!(err.is_malformed());

    let err = h
        .verifier
        .verify_ownership(user, &address, "3yZe7d", VerificationMode::Transaction)
        .await
        .unwrap_err();
    assert!(err.is_malformed());
}
