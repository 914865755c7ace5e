//! PKCS#12 archive decoding.
//!
//! Handles both archive generations in circulation:
//!
//! - OpenSSL 3 defaults: SHA-256 MAC, PBES2 (PBKDF2 + AES-CBC) encrypted bags
//! - legacy exports (Keychain Access, `openssl -legacy`): SHA-1 MAC,
//!   RC2/3DES PKCS#12 PBE encrypted bags
//!
//! The MAC is always verified here. Bags encrypted with a PKCS#12 PBE
//! algorithm are handed to the `p12` crate, which implements those ciphers.

use std::fmt;

use cms::content_info::CmsVersion;
use cms::encrypted_data::EncryptedData;
use der::asn1::{ContextSpecific, OctetString};
use der::{Any, Decode, Encode, Sequence};
use hmac::digest::core_api::BlockSizeUser;
use hmac::digest::{FixedOutputReset, KeyInit};
use hmac::{Hmac, Mac};
use p256::pkcs8::ObjectIdentifier;
use pkcs12::authenticated_safe::AuthenticatedSafe;
use pkcs12::cert_type::CertBag;
use pkcs12::kdf::{derive_key_utf8, Pkcs12KeyType};
use pkcs12::mac_data::MacData;
use pkcs12::pfx::Pfx;
use pkcs12::safe_bag::SafeContents;
use pkcs12::{
    PKCS_12_CERT_BAG_OID, PKCS_12_KEY_BAG_OID, PKCS_12_PKCS8_KEY_BAG_OID, PKCS_12_X509_CERT_OID,
};
use pkcs5::EncryptionScheme;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use spki::AlgorithmIdentifierOwned;

use crate::{ApnsError, Result};

const OID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
const OID_ENCRYPTED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.6");
const OID_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");
const OID_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");
const OID_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.2");
const OID_SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.3");
/// Parent arc of the `pbeWithSHAAnd*` algorithms (RFC 7292 appendix C).
const OID_PKCS12_PBE: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.1");

/// Certificates (DER, archive order) and the PKCS#8 DER private key.
#[cfg_attr(test, derive(Debug))]
pub(crate) struct DecodedArchive {
    pub certificates: Vec<Vec<u8>>,
    pub private_key: Option<Vec<u8>>,
}

/// `pkcs8ShroudedKeyBag` contents. Decoded loosely so legacy algorithm
/// identifiers survive until we can route them.
#[derive(Sequence)]
struct ShroudedKeyBag {
    encryption_algorithm: AlgorithmIdentifierOwned,
    encrypted_data: OctetString,
}

enum Bags {
    Decoded(SafeContents),
    Legacy,
}

fn decode_error<E: fmt::Display>(context: &'static str) -> impl FnOnce(E) -> ApnsError {
    move |e| ApnsError::Decode(format!("{}: {}", context, e))
}

fn is_legacy_pbe(oid: &ObjectIdentifier) -> bool {
    oid.parent() == Some(OID_PKCS12_PBE)
}

/// Decode `bytes` with `password`, verifying the archive MAC first.
pub(crate) fn decode(bytes: &[u8], password: &str) -> Result<DecodedArchive> {
    let pfx = Pfx::from_der(bytes).map_err(decode_error("invalid PKCS#12 archive"))?;

    if pfx.auth_safe.content_type != OID_DATA {
        return Err(ApnsError::Decode(format!(
            "unsupported PKCS#12 integrity mode {}",
            pfx.auth_safe.content_type
        )));
    }

    let auth_safe = pfx
        .auth_safe
        .content
        .to_der()
        .and_then(|der| OctetString::from_der(&der))
        .map_err(decode_error("invalid PKCS#12 content"))?;

    if let Some(mac_data) = &pfx.mac_data {
        if !verify_mac(mac_data, auth_safe.as_bytes(), password)? {
            return Err(ApnsError::Decode(
                "PKCS#12 integrity check failed (wrong password?)".to_string(),
            ));
        }
    }

    let contents = AuthenticatedSafe::from_der(auth_safe.as_bytes())
        .map_err(decode_error("invalid PKCS#12 content"))?;

    let mut archive = DecodedArchive {
        certificates: Vec::new(),
        private_key: None,
    };

    for content in contents {
        let bags = match open_content(content.content_type, &content.content, password)? {
            Bags::Decoded(bags) => bags,
            Bags::Legacy => return decode_legacy(bytes, password),
        };

        for bag in bags {
            match bag.bag_id {
                PKCS_12_CERT_BAG_OID => {
                    let cert = ContextSpecific::<CertBag>::from_der(&bag.bag_value)
                        .map_err(decode_error("invalid PKCS#12 certificate bag"))?
                        .value;
                    if cert.cert_id == PKCS_12_X509_CERT_OID {
                        archive.certificates.push(cert.cert_value.as_bytes().to_vec());
                    }
                }
                PKCS_12_PKCS8_KEY_BAG_OID => {
                    let shrouded = ContextSpecific::<ShroudedKeyBag>::from_der(&bag.bag_value)
                        .map_err(decode_error("invalid PKCS#12 key bag"))?
                        .value;
                    if is_legacy_pbe(&shrouded.encryption_algorithm.oid) {
                        return decode_legacy(bytes, password);
                    }
                    let key = decrypt(
                        &shrouded.encryption_algorithm,
                        shrouded.encrypted_data.as_bytes(),
                        password,
                    )
                    .map_err(|e| ApnsError::Decode(format!("failed to decrypt PKCS#12 key: {}", e)))?;
                    archive.private_key.get_or_insert(key);
                }
                PKCS_12_KEY_BAG_OID => {
                    let key = ContextSpecific::<Any>::from_der(&bag.bag_value)
                        .and_then(|cs| cs.value.to_der())
                        .map_err(decode_error("invalid PKCS#12 key bag"))?;
                    archive.private_key.get_or_insert(key);
                }
                _ => {}
            }
        }
    }

    Ok(archive)
}

fn open_content(content_type: ObjectIdentifier, content: &Any, password: &str) -> Result<Bags> {
    let der = content
        .to_der()
        .map_err(decode_error("invalid PKCS#12 content"))?;

    let plaintext = match content_type {
        OID_DATA => OctetString::from_der(&der)
            .map_err(decode_error("invalid PKCS#12 content"))?
            .as_bytes()
            .to_vec(),
        OID_ENCRYPTED_DATA => {
            let data = EncryptedData::from_der(&der)
                .map_err(decode_error("invalid PKCS#12 encrypted content"))?;
            let info = data.enc_content_info;

            if data.version != CmsVersion::V0 || info.content_type != OID_DATA {
                return Err(ApnsError::Decode(
                    "unsupported PKCS#12 encrypted content".to_string(),
                ));
            }
            if is_legacy_pbe(&info.content_enc_alg.oid) {
                return Ok(Bags::Legacy);
            }

            let ciphertext = info.encrypted_content.ok_or_else(|| {
                ApnsError::Decode("PKCS#12 encrypted content is empty".to_string())
            })?;
            decrypt(&info.content_enc_alg, ciphertext.as_bytes(), password).map_err(|e| {
                ApnsError::Decode(format!("failed to decrypt PKCS#12 certificate: {}", e))
            })?
        }
        other => {
            return Err(ApnsError::Decode(format!(
                "unsupported PKCS#12 content type {}",
                other
            )))
        }
    };

    SafeContents::from_der(&plaintext)
        .map(Bags::Decoded)
        .map_err(decode_error("invalid PKCS#12 bags"))
}

fn decrypt(
    algorithm: &AlgorithmIdentifierOwned,
    ciphertext: &[u8],
    password: &str,
) -> std::result::Result<Vec<u8>, String> {
    let der = algorithm.to_der().map_err(|e| e.to_string())?;
    let scheme = EncryptionScheme::try_from(der.as_slice()).map_err(|e| e.to_string())?;
    scheme
        .decrypt(password, ciphertext)
        .map_err(|e| e.to_string())
}

fn verify_mac(mac_data: &MacData, data: &[u8], password: &str) -> Result<bool> {
    let salt = mac_data.mac_salt.as_bytes();
    let rounds = mac_data.iterations;
    let expected = mac_data.mac.digest.as_bytes();

    match mac_data.mac.algorithm.oid {
        OID_SHA1 => hmac_matches::<Sha1, Hmac<Sha1>>(password, salt, rounds, data, expected),
        OID_SHA256 => hmac_matches::<Sha256, Hmac<Sha256>>(password, salt, rounds, data, expected),
        OID_SHA384 => hmac_matches::<Sha384, Hmac<Sha384>>(password, salt, rounds, data, expected),
        OID_SHA512 => hmac_matches::<Sha512, Hmac<Sha512>>(password, salt, rounds, data, expected),
        other => Err(ApnsError::Decode(format!(
            "unsupported PKCS#12 MAC algorithm {}",
            other
        ))),
    }
}

fn hmac_matches<D, M>(
    password: &str,
    salt: &[u8],
    rounds: i32,
    data: &[u8],
    expected: &[u8],
) -> Result<bool>
where
    D: Digest + FixedOutputReset + BlockSizeUser,
    M: Mac + KeyInit,
{
    let key_len = <D as Digest>::output_size();
    let key = derive_key_utf8::<D>(password, salt, Pkcs12KeyType::Mac, rounds, key_len)
        .map_err(decode_error("invalid PKCS#12 password"))?;

    let mut mac = <M as KeyInit>::new_from_slice(&key)
        .map_err(decode_error("invalid PKCS#12 MAC key"))?;
    mac.update(data);
    Ok(mac.verify_slice(expected).is_ok())
}

/// Decode bags encrypted with the legacy PKCS#12 PBE ciphers. The MAC has
/// already been checked by [`decode`].
fn decode_legacy(bytes: &[u8], password: &str) -> Result<DecodedArchive> {
    let pfx = p12::PFX::parse(bytes).map_err(decode_error("invalid PKCS#12 archive"))?;

    let private_key = pfx
        .key_bags(password)
        .map_err(decode_error("failed to decrypt PKCS#12 key"))?
        .into_iter()
        .next();

    let certificates = pfx
        .cert_x509_bags(password)
        .map_err(decode_error("failed to decrypt PKCS#12 certificate"))?;

    Ok(DecodedArchive {
        certificates,
        private_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY_P12: &[u8] = include_bytes!("../tests/fixtures/secret.p12");
    const MODERN_P12: &[u8] = include_bytes!("../tests/fixtures/modern.p12");
    const MIXED_P12: &[u8] = include_bytes!("../tests/fixtures/mixed.p12");

    #[test]
    fn test_legacy_pbe_detection() {
        let rc2 = ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.1.6");
        let des3 = ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.1.3");
        let pbes2 = ObjectIdentifier::new_unwrap("1.2.840.113549.1.5.13");

        assert!(is_legacy_pbe(&rc2));
        assert!(is_legacy_pbe(&des3));
        assert!(!is_legacy_pbe(&pbes2));
    }

    #[test]
    fn test_mac_algorithms_of_fixtures() {
        let legacy = Pfx::from_der(LEGACY_P12).unwrap();
        assert_eq!(legacy.mac_data.unwrap().mac.algorithm.oid, OID_SHA1);

        let modern = Pfx::from_der(MODERN_P12).unwrap();
        assert_eq!(modern.mac_data.unwrap().mac.algorithm.oid, OID_SHA256);
    }

    #[test]
    fn test_decode_modern_archive() {
        let archive = decode(MODERN_P12, "secret").unwrap();
        assert_eq!(archive.certificates.len(), 1);
        assert!(archive.private_key.is_some());
    }

    #[test]
    fn test_sha256_mac_with_legacy_bags() {
        let archive = decode(MIXED_P12, "secret").unwrap();
        assert_eq!(archive.certificates.len(), 1);
        assert!(archive.private_key.is_some());

        assert!(matches!(
            decode(MIXED_P12, "wrong").unwrap_err(),
            ApnsError::Decode(_)
        ));
    }
}
