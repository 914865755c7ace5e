//! Credential loading for APNs authentication.
//!
//! Two credential kinds are supported:
//!
//! - **Certificate auth**: a PKCS#12 archive (`.p12`) holding the APNs client
//!   certificate and its private key, presented during the TLS handshake.
//! - **Token auth**: a PKCS#8 PEM private key (`.p8`) used to sign provider
//!   tokens with ES256.
//!
//! Loaders work on bytes or readers only. Opening files is the caller's job.

use std::fmt;
use std::io::Read;

use p256::elliptic_curve::ALGORITHM_OID;
use p256::pkcs8::{AssociatedOid, LineEnding, ObjectIdentifier, PrivateKeyInfo};
use p256::NistP256;
use rustls_pemfile::Item;

use crate::archive;
use crate::{ApnsError, Result};

const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";
const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// A TLS client certificate and its private key, decoded from PKCS#12.
#[derive(Clone)]
pub struct ClientCertificate {
    certificates: Vec<Vec<u8>>,
    private_key: Vec<u8>,
}

impl ClientCertificate {
    /// DER encoding of the leaf certificate.
    pub fn certificate_der(&self) -> &[u8] {
        &self.certificates[0]
    }

    /// All certificates from the archive, leaf first.
    pub fn chain(&self) -> &[Vec<u8>] {
        &self.certificates
    }

    /// PKCS#8 DER encoding of the private key.
    pub fn private_key_der(&self) -> &[u8] {
        &self.private_key
    }

    /// Encode the key and certificates as a single PEM bundle.
    pub fn to_pem(&self) -> Result<String> {
        let mut out = encode_pem(PRIVATE_KEY_LABEL, &self.private_key)?;
        for cert in &self.certificates {
            out.push_str(&encode_pem(CERTIFICATE_LABEL, cert)?);
        }
        Ok(out)
    }

    /// Build the identity presented during the TLS handshake.
    pub(crate) fn identity(&self) -> Result<reqwest::Identity> {
        let pem = self.to_pem()?;
        reqwest::Identity::from_pem(pem.as_bytes())
            .map_err(|e| ApnsError::Transport(format!("unusable client certificate: {}", e)))
    }
}

impl fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCertificate")
            .field("certificates", &self.certificates.len())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// An ECDSA private key in PKCS#8 form, used to sign provider tokens.
#[derive(Clone)]
pub struct EcdsaPrivateKey {
    pkcs8_der: Vec<u8>,
    curve: Option<ObjectIdentifier>,
}

impl EcdsaPrivateKey {
    /// PKCS#8 DER encoding of the key.
    pub fn pkcs8_der(&self) -> &[u8] {
        &self.pkcs8_der
    }

    /// Named curve of the key, when the key declares one.
    pub fn curve(&self) -> Option<ObjectIdentifier> {
        self.curve
    }

    /// Whether the key is on P-256, the only curve ES256 accepts.
    pub fn is_p256(&self) -> bool {
        self.curve == Some(NistP256::OID)
    }
}

impl fmt::Debug for EcdsaPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcdsaPrivateKey")
            .field("curve", &self.curve.map(|oid| oid.to_string()))
            .field("pkcs8_der", &"<redacted>")
            .finish()
    }
}

/// Decode a PKCS#12 archive into a client certificate.
///
/// Accepts OpenSSL 3 archives (SHA-256 MAC, PBES2) as well as legacy
/// SHA-1/3DES/RC2 exports. An empty `password` is the conventional marker for archives exported
/// without one and is passed through unchanged.
pub fn load_certificate(bytes: &[u8], password: &str) -> Result<ClientCertificate> {
    let archive = archive::decode(bytes, password)?;

    let private_key = archive
        .private_key
        .ok_or_else(|| ApnsError::Decode("PKCS#12 archive contains no private key".to_string()))?;

    PrivateKeyInfo::try_from(private_key.as_slice())
        .map_err(|e| ApnsError::Decode(format!("invalid PKCS#12 private key: {}", e)))?;

    if archive.certificates.is_empty() {
        return Err(ApnsError::Decode(
            "PKCS#12 archive contains no certificate".to_string(),
        ));
    }

    Ok(ClientCertificate {
        certificates: archive.certificates,
        private_key,
    })
}

/// Read a PKCS#12 archive from `reader` and decode it.
pub fn load_certificate_from_reader(mut reader: impl Read, password: &str) -> Result<ClientCertificate> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    load_certificate(&bytes, password)
}

/// Decode a PEM `PRIVATE KEY` block and check that it holds an ECDSA key.
pub fn load_private_key(bytes: &[u8]) -> Result<EcdsaPrivateKey> {
    let mut reader = bytes;
    let item = rustls_pemfile::read_one(&mut reader)
        .map_err(|e| ApnsError::Decode(format!("failed to read PEM data: {}", e)))?;

    let pkcs8_der = match item {
        Some(Item::Pkcs8Key(key)) => key.secret_pkcs8_der().to_vec(),
        _ => {
            return Err(ApnsError::Decode(
                "failed to decode PEM block containing private key".to_string(),
            ))
        }
    };

    let info = PrivateKeyInfo::try_from(pkcs8_der.as_slice())
        .map_err(|e| ApnsError::Decode(format!("invalid PKCS#8 private key: {}", e)))?;

    if info.algorithm.oid != ALGORITHM_OID {
        return Err(ApnsError::KeyType(format!(
            "expected an ECDSA private key, found algorithm {}",
            info.algorithm.oid
        )));
    }

    let curve = info.algorithm.parameters_oid().ok();

    Ok(EcdsaPrivateKey { pkcs8_der, curve })
}

/// Read a PEM private key from `reader` and decode it.
pub fn load_private_key_from_reader(mut reader: impl Read) -> Result<EcdsaPrivateKey> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    load_private_key(&bytes)
}

fn encode_pem(label: &str, der: &[u8]) -> Result<String> {
    p256::pkcs8::der::pem::encode_string(label, LineEnding::LF, der)
        .map_err(|e| ApnsError::Decode(format!("failed to encode {}: {}", label, e)))
}
