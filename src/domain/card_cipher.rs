//! Encryption of card data at rest.
//!
//! Card number, expiry and cvc are joined with `|` and sealed as one blob.
//! The key is derived from the transaction id that owns the card data, so a
//! CANCEL record's blob is always opened with its parent's id.

use crate::domain::transaction::TRANSACTION_ID_LEN;
use crate::error::{PaymentError, Result};
use aes_gcm::aead::Aead;
use aes_gcm::{Aes128Gcm, KeyInit, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::fmt;

const DELIMITER: char = '|';
const KEY_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// Plaintext card fields. Built only through [`CardInfo::new`], so every
/// instance holds digits of the right lengths.
#[derive(Clone, PartialEq, Eq)]
pub struct CardInfo {
    card_number: String,
    expiry: String,
    cvc: String,
}

impl CardInfo {
    pub fn new(
        card_number: impl Into<String>,
        expiry: impl Into<String>,
        cvc: impl Into<String>,
    ) -> Result<Self> {
        let card_number = card_number.into();
        let expiry = expiry.into();
        let cvc = cvc.into();

        if !is_digits(&card_number, 10..=16) {
            return Err(PaymentError::ValidationError(
                "card number must be 10 to 16 digits".to_string(),
            ));
        }
        if !is_digits(&expiry, 4..=4) {
            return Err(PaymentError::ValidationError(
                "expiry must be 4 digits (MMYY)".to_string(),
            ));
        }
        if !is_digits(&cvc, 3..=3) {
            return Err(PaymentError::ValidationError(
                "cvc must be 3 digits".to_string(),
            ));
        }

        Ok(Self {
            card_number,
            expiry,
            cvc,
        })
    }

    pub fn card_number(&self) -> &str {
        &self.card_number
    }

    pub fn expiry(&self) -> &str {
        &self.expiry
    }

    pub fn cvc(&self) -> &str {
        &self.cvc
    }
}

// Card data must never reach a log line in clear.
impl fmt::Debug for CardInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardInfo")
            .field("card_number", &"<redacted>")
            .field("expiry", &"<redacted>")
            .field("cvc", &"<redacted>")
            .finish()
    }
}

fn is_digits(value: &str, len: std::ops::RangeInclusive<usize>) -> bool {
    len.contains(&value.len()) && value.bytes().all(|b| b.is_ascii_digit())
}

/// Seals and opens [`CardInfo`] under a key derived from a transaction id.
pub struct CardInfoCipher;

impl CardInfoCipher {
    /// Encrypts the card fields, returning base64 of `nonce || ciphertext`.
    pub fn encrypt(transaction_id: &str, card: &CardInfo) -> Result<String> {
        let cipher = cipher_for(transaction_id)?;
        let plaintext = format!(
            "{}{DELIMITER}{}{DELIMITER}{}",
            card.card_number(),
            card.expiry(),
            card.cvc()
        );

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| PaymentError::CryptoError("fail to encrypt card info".to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(sealed))
    }

    pub fn decrypt(transaction_id: &str, encrypted: &str) -> Result<CardInfo> {
        let cipher = cipher_for(transaction_id)?;
        let sealed = BASE64
            .decode(encrypted.as_bytes())
            .map_err(|e| PaymentError::CryptoError(format!("malformed card info: {e}")))?;
        if sealed.len() <= NONCE_LEN {
            return Err(PaymentError::CryptoError(
                "malformed card info: too short".to_string(),
            ));
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| PaymentError::CryptoError("fail to decrypt card info".to_string()))?;
        let plaintext = String::from_utf8(plaintext)
            .map_err(|_| PaymentError::CryptoError("card info is not utf-8".to_string()))?;

        let mut parts = plaintext.split(DELIMITER);
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(card_number), Some(expiry), Some(cvc), None) => {
                CardInfo::new(card_number, expiry, cvc).map_err(|e| {
                    PaymentError::CryptoError(format!("decrypted card info is invalid: {e}"))
                })
            }
            _ => Err(PaymentError::CryptoError(
                "decrypted card info has wrong field count".to_string(),
            )),
        }
    }
}

fn cipher_for(transaction_id: &str) -> Result<Aes128Gcm> {
    if transaction_id.len() != TRANSACTION_ID_LEN {
        return Err(PaymentError::ValidationError(format!(
            "transaction id must be {TRANSACTION_ID_LEN} characters"
        )));
    }
    let digest = Sha256::digest(transaction_id.as_bytes());
    Aes128Gcm::new_from_slice(&digest[..KEY_LEN])
        .map_err(|_| PaymentError::CryptoError("key derivation failed".to_string()))
}
