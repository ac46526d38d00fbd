//! Wallet signature verification
//!
//! Proves that a base58 wallet address controls the key that signed the
//! principal's live challenge, either as a detached message signature or
//! through a signed transaction whose last instruction carries the challenge.

use bincode::Options;
use ed25519_dalek::{Signature, VerifyingKey};
use solana_transaction::versioned::VersionedTransaction;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{PrincipalRef, VerificationMode};
use crate::store::{PrincipalStore, StoreError};

use super::challenge::challenge_message;

pub const PUBKEY_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 64;

/// Reasons a wallet ownership proof is rejected
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Principal not found")]
    PrincipalNotFound,

    #[error("No challenge has been issued")]
    NoActiveChallenge,

    #[error("Malformed encoding: {0}")]
    MalformedEncoding(String),

    #[error("Signature does not match")]
    SignatureMismatch,

    #[error("Transaction must have exactly one signer")]
    SignerCountInvalid,

    #[error("Transaction signer does not match the claimed address")]
    SignerAddressMismatch,

    #[error("Transaction does not carry the challenge")]
    ChallengeDataMismatch,

    #[error("Unsupported signed data: {0}")]
    UnsupportedSignedData(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl VerificationError {
    /// Undecodable input, as opposed to a well-formed proof that failed
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            VerificationError::MalformedEncoding(_) | VerificationError::UnsupportedSignedData(_)
        )
    }
}

impl From<StoreError> for VerificationError {
    fn from(e: StoreError) -> Self {
        VerificationError::Storage(e.to_string())
    }
}

/// Decode a base58 wallet address into its public key bytes
pub fn decode_address(address: &str) -> Result<[u8; PUBKEY_LEN], VerificationError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| VerificationError::MalformedEncoding(format!("address: {}", e)))?;

    bytes.try_into().map_err(|b: Vec<u8>| {
        VerificationError::MalformedEncoding(format!(
            "address must decode to {} bytes, got {}",
            PUBKEY_LEN,
            b.len()
        ))
    })
}

/// Check a detached signature over `message`
pub fn verify_message_signature(
    address: &str,
    message: &[u8],
    signature_b58: &str,
) -> Result<(), VerificationError> {
    let public_key = decode_address(address)?;

    let signature_bytes = bs58::decode(signature_b58)
        .into_vec()
        .map_err(|e| VerificationError::MalformedEncoding(format!("signature: {}", e)))?;
    let signature: [u8; SIGNATURE_LEN] = signature_bytes.try_into().map_err(|b: Vec<u8>| {
        VerificationError::MalformedEncoding(format!(
            "signature must decode to {} bytes, got {}",
            SIGNATURE_LEN,
            b.len()
        ))
    })?;

    if verify_ed25519(&public_key, message, &signature) {
        Ok(())
    } else {
        Err(VerificationError::SignatureMismatch)
    }
}

/// Check a signed transaction that smuggles `challenge` through its last instruction.
///
/// Checks run in a fixed order and stop at the first failure.
pub fn verify_transaction_signature(
    address: &str,
    challenge: &[u8],
    transaction_b58: &str,
) -> Result<(), VerificationError> {
    let public_key = decode_address(address)?;

    let bytes = bs58::decode(transaction_b58)
        .into_vec()
        .map_err(|e| VerificationError::MalformedEncoding(format!("transaction: {}", e)))?;
    let transaction: VersionedTransaction = bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
        .deserialize(&bytes)
        .map_err(|e| VerificationError::UnsupportedSignedData(e.to_string()))?;

    let required = transaction.message.header().num_required_signatures as usize;
    let account_keys = transaction.message.static_account_keys();
    if transaction.signatures.len() != required || account_keys.len() < required {
        return Err(VerificationError::UnsupportedSignedData(format!(
            "{} signatures for {} required signers",
            transaction.signatures.len(),
            required
        )));
    }

    if required != 1 {
        return Err(VerificationError::SignerCountInvalid);
    }

    let signer = account_keys[0].to_bytes();
    if signer != public_key {
        return Err(VerificationError::SignerAddressMismatch);
    }

    match transaction.message.instructions().last() {
        Some(ix) if ix.data == challenge => {}
        _ => return Err(VerificationError::ChallengeDataMismatch),
    }

    let message_bytes = bincode::serialize(&transaction.message)
        .map_err(|e| VerificationError::UnsupportedSignedData(e.to_string()))?;
    let signature: [u8; SIGNATURE_LEN] = transaction.signatures[0]
        .as_ref()
        .try_into()
        .map_err(|_| VerificationError::UnsupportedSignedData("signature length".to_string()))?;
    if !verify_ed25519(&signer, &message_bytes, &signature) {
        return Err(VerificationError::SignatureMismatch);
    }

    Ok(())
}

/// Strict ed25519 check; keys that are not valid points never verify
fn verify_ed25519(
    public_key: &[u8; PUBKEY_LEN],
    message: &[u8],
    signature: &[u8; SIGNATURE_LEN],
) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let signature = Signature::from_bytes(signature);
    verifying_key.verify_strict(message, &signature).is_ok()
}

/// Verifies wallet ownership against a principal's live challenge.
///
/// Verification never mutates state. A valid signature keeps verifying until
/// the principal requests a new challenge, so callers must consume it at once.
#[derive(Clone)]
pub struct SignatureVerifier {
    principals: Arc<dyn PrincipalStore>,
    sign_message_prefix: String,
}

impl SignatureVerifier {
    pub fn new(principals: Arc<dyn PrincipalStore>, sign_message_prefix: String) -> Self {
        Self {
            principals,
            sign_message_prefix,
        }
    }

    pub async fn verify_ownership(
        &self,
        principal: PrincipalRef,
        claimed_address: &str,
        signed_data: &str,
        mode: VerificationMode,
    ) -> Result<(), VerificationError> {
        let record = self
            .principals
            .find_principal(principal)
            .await?
            .ok_or(VerificationError::PrincipalNotFound)?;

        let nonce = record.nonce().ok_or(VerificationError::NoActiveChallenge)?;
        let challenge = challenge_message(&self.sign_message_prefix, nonce);

        let result = match mode {
            VerificationMode::Message => {
                verify_message_signature(claimed_address, challenge.as_bytes(), signed_data)
            }
            VerificationMode::Transaction => {
                verify_transaction_signature(claimed_address, challenge.as_bytes(), signed_data)
            }
        };

        if let Err(e) = &result {
            tracing::debug!(
                principal = %principal,
                address = %claimed_address,
                mode = ?mode,
                reason = %e,
                "Wallet ownership proof rejected"
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use solana_hash::Hash;
    use solana_message::compiled_instruction::CompiledInstruction;
    use solana_message::{legacy, MessageHeader, VersionedMessage};
    use solana_pubkey::Pubkey;

    const CHALLENGE: &[u8] = b"Sign this message for authenticating with your wallet: 3fa85f64";

    fn keypair(seed: u8) -> (SigningKey, String) {
        let key = SigningKey::from_bytes(&[seed; 32]);
        let address = bs58::encode(key.verifying_key().as_bytes()).into_string();
        (key, address)
    }

    fn message_for(signers: &[&SigningKey], data: &[u8]) -> legacy::Message {
        let mut account_keys: Vec<Pubkey> = signers
            .iter()
            .map(|k| Pubkey::new_from_array(k.verifying_key().to_bytes()))
            .collect();
        account_keys.push(Pubkey::new_from_array([5u8; 32])); // memo program
        let program_id_index = (account_keys.len() - 1) as u8;
        legacy::Message {
            header: MessageHeader {
                num_required_signatures: signers.len() as u8,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 1,
            },
            account_keys,
            recent_blockhash: Hash::new_from_array([0u8; 32]),
            instructions: vec![
                CompiledInstruction {
                    program_id_index,
                    accounts: vec![],
                    data: b"unrelated".to_vec(),
                },
                CompiledInstruction {
                    program_id_index,
                    accounts: vec![0],
                    data: data.to_vec(),
                },
            ],
        }
    }

    fn encode_transaction(signatures: Vec<[u8; SIGNATURE_LEN]>, message: legacy::Message) -> String {
        let transaction = VersionedTransaction {
            signatures: signatures
                .into_iter()
                .map(solana_signature::Signature::from)
                .collect(),
            message: VersionedMessage::Legacy(message),
        };
        bs58::encode(bincode::serialize(&transaction).unwrap()).into_string()
    }

    fn sign_transaction(signers: &[&SigningKey], message: legacy::Message) -> String {
        let bytes = bincode::serialize(&VersionedMessage::Legacy(message.clone())).unwrap();
        let signatures = signers.iter().map(|k| k.sign(&bytes).to_bytes()).collect();
        encode_transaction(signatures, message)
    }

    #[test]
    fn test_message_signature_valid() {
        let (key, address) = keypair(1);
        let sig = bs58::encode(key.sign(CHALLENGE).to_bytes()).into_string();
        assert!(verify_message_signature(&address, CHALLENGE, &sig).is_ok());
    }

    #[test]
    fn test_message_signature_single_byte_flips() {
        let (key, address) = keypair(1);
        let sig_bytes = key.sign(CHALLENGE).to_bytes();
        let sig = bs58::encode(sig_bytes).into_string();

        let mut challenge = CHALLENGE.to_vec();
        challenge[10] ^= 0x01;
        assert!(matches!(
            verify_message_signature(&address, &challenge, &sig),
            Err(VerificationError::SignatureMismatch)
        ));

        let mut flipped_sig = sig_bytes;
        flipped_sig[0] ^= 0x01;
        let flipped_sig = bs58::encode(flipped_sig).into_string();
        assert!(verify_message_signature(&address, CHALLENGE, &flipped_sig).is_err());

        let mut key_bytes = key.verifying_key().to_bytes();
        key_bytes[31] ^= 0x01;
        let other_address = bs58::encode(key_bytes).into_string();
        assert!(matches!(
            verify_message_signature(&other_address, CHALLENGE, &sig),
            Err(VerificationError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_message_signature_wrong_key() {
        let (key, _) = keypair(1);
        let (_, other_address) = keypair(2);
        let sig = bs58::encode(key.sign(CHALLENGE).to_bytes()).into_string();
        assert!(matches!(
            verify_message_signature(&other_address, CHALLENGE, &sig),
            Err(VerificationError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_malformed_encodings() {
        let (key, address) = keypair(1);
        let sig = bs58::encode(key.sign(CHALLENGE).to_bytes()).into_string();

        // '0' is not in the base58 alphabet
        let err = verify_message_signature("0OIl", CHALLENGE, &sig).unwrap_err();
        assert!(err.is_malformed());

        let short = bs58::encode([1u8; 16]).into_string();
        let err = verify_message_signature(&short, CHALLENGE, &sig).unwrap_err();
        assert!(matches!(err, VerificationError::MalformedEncoding(_)));

        let short_sig = bs58::encode([1u8; 63]).into_string();
        let err = verify_message_signature(&address, CHALLENGE, &short_sig).unwrap_err();
        assert!(matches!(err, VerificationError::MalformedEncoding(_)));
    }

    #[test]
    fn test_transaction_valid() {
        let (key, address) = keypair(1);
        let tx = sign_transaction(&[&key], message_for(&[&key], CHALLENGE));
        assert!(verify_transaction_signature(&address, CHALLENGE, &tx).is_ok());
    }

    #[test]
    fn test_transaction_two_signers_rejected() {
        let (key, address) = keypair(1);
        let (other, _) = keypair(2);
        let tx = sign_transaction(&[&key, &other], message_for(&[&key, &other], CHALLENGE));
        assert!(matches!(
            verify_transaction_signature(&address, CHALLENGE, &tx),
            Err(VerificationError::SignerCountInvalid)
        ));
    }

    #[test]
    fn test_transaction_signer_mismatch() {
        let (key, _) = keypair(1);
        let (_, other_address) = keypair(2);
        let tx = sign_transaction(&[&key], message_for(&[&key], CHALLENGE));
        assert!(matches!(
            verify_transaction_signature(&other_address, CHALLENGE, &tx),
            Err(VerificationError::SignerAddressMismatch)
        ));
    }

    #[test]
    fn test_transaction_challenge_data_mismatch() {
        let (key, address) = keypair(1);
        let mut data = CHALLENGE.to_vec();
        let last = data.len() - 1;
        data[last] ^= 0x01;
        let tx = sign_transaction(&[&key], message_for(&[&key], &data));
        assert!(matches!(
            verify_transaction_signature(&address, CHALLENGE, &tx),
            Err(VerificationError::ChallengeDataMismatch)
        ));
    }

    #[test]
    fn test_transaction_challenge_not_in_last_instruction() {
        let (key, address) = keypair(1);
        let mut message = message_for(&[&key], CHALLENGE);
        message.instructions.reverse();
        let tx = sign_transaction(&[&key], message);
        assert!(matches!(
            verify_transaction_signature(&address, CHALLENGE, &tx),
            Err(VerificationError::ChallengeDataMismatch)
        ));
    }

    #[test]
    fn test_transaction_bad_embedded_signature() {
        let (key, address) = keypair(1);
        let message = message_for(&[&key], CHALLENGE);
        let bytes = bincode::serialize(&VersionedMessage::Legacy(message.clone())).unwrap();
        let mut forged = key.sign(&bytes).to_bytes();
        forged[5] ^= 0x01;
        let tx = encode_transaction(vec![forged], message);
        assert!(matches!(
            verify_transaction_signature(&address, CHALLENGE, &tx),
            Err(VerificationError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_transaction_missing_signature_is_unsupported() {
        let (key, address) = keypair(1);
        let tx = encode_transaction(vec![], message_for(&[&key], CHALLENGE));
        assert!(matches!(
            verify_transaction_signature(&address, CHALLENGE, &tx),
            Err(VerificationError::UnsupportedSignedData(_))
        ));
    }

    #[test]
    fn test_transaction_trailing_bytes_are_unsupported() {
        let (key, address) = keypair(1);
        let tx = sign_transaction(&[&key], message_for(&[&key], CHALLENGE));
        let mut bytes = bs58::decode(&tx).into_vec().unwrap();
        bytes.push(0);
        let tx = bs58::encode(bytes).into_string();
        assert!(matches!(
            verify_transaction_signature(&address, CHALLENGE, &tx),
            Err(VerificationError::UnsupportedSignedData(_))
        ));
    }

    #[test]
    fn test_transaction_garbage_is_unsupported() {
        let (_, address) = keypair(1);
        let garbage = bs58::encode([1u8, 2, 3]).into_string();
        assert!(matches!(
            verify_transaction_signature(&address, CHALLENGE, &garbage),
            Err(VerificationError::UnsupportedSignedData(_))
        ));
    }

    #[test]
    fn test_detached_signature_is_not_a_transaction() {
        let (key, address) = keypair(1);
        let sig = bs58::encode(key.sign(CHALLENGE).to_bytes()).into_string();
        assert!(verify_transaction_signature(&address, CHALLENGE, &sig).is_err());
    }
}
