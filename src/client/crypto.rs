//! Login credential obfuscation
//!
//! The marketplace signin endpoint expects username and password fields
//! run through a reversible "encryption" the web app performs client-side:
//! AES-256-CBC with a fixed, publicly known key and an all-zero IV, PKCS#7
//! padding, base64-encoded and then URL-escaped. It has no security value
//! (the key ships in their JavaScript bundle) but the endpoint rejects
//! anything else, so it is reproduced here bit for bit.

use aes::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;

/// The key the marketplace web app ships to every browser.
const LOGIN_KEY: &[u8; 32] = b"6696D2E6F042FEC4D6E3F32AD541143B";
/// Sixteen ASCII zeros, not sixteen zero bytes.
const LOGIN_IV: &[u8; 16] = b"0000000000000000";

/// Obfuscate a credential field for the signin endpoint.
///
/// Deterministic: the same plaintext always yields the same output, so
/// pre-encrypted values can be stored in configuration and compared.
pub fn encrypt_credential(plaintext: &str) -> String {
    let ciphertext = Aes256CbcEnc::new(LOGIN_KEY.into(), LOGIN_IV.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
    urlencoding::encode(&STANDARD.encode(ciphertext)).into_owned()
}
