//! HTTPS listener configuration.
//!
//! Reads a PEM certificate chain and private key from disk and builds the rustls
//! server config the listener terminates TLS with. Startup fails when either file is
//! unreadable, so the service never falls back to plain HTTP once TLS is configured.

use crate::config::TlsConfig;
use anyhow::{anyhow, Context, Result};
use rustls::{
    crypto::ring,
    pki_types::{CertificateDer, PrivateKeyDer},
    ServerConfig,
};
use std::{fs::File, io::BufReader, path::Path, sync::Arc};
use tokio_rustls::TlsAcceptor;

/// Build the server config, advertising HTTP/2 and HTTP/1.1 over ALPN.
///
/// # Errors
/// Returns an error if the certificate or key cannot be read, or rustls rejects them.
pub fn load_server_config(config: &TlsConfig) -> Result<ServerConfig> {
    let cert_chain = load_cert_chain(&config.cert)?;
    let key = load_private_key(&config.key)?;

    let mut server_config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()
        .context("Failed to select TLS protocol versions")?
        .with_no_client_auth()
        .with_single_cert(cert_chain, key)
        .context("Failed to build TLS server config")?;
    server_config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(server_config)
}

/// # Errors
/// Same as [`load_server_config`].
pub fn acceptor(config: &TlsConfig) -> Result<TlsAcceptor> {
    Ok(TlsAcceptor::from(Arc::new(load_server_config(config)?)))
}

fn load_cert_chain(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open TLS certificate: {}", path.display()))?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read TLS certificate: {}", path.display()))?;
    if certs.is_empty() {
        return Err(anyhow!("TLS certificate is empty: {}", path.display()));
    }
    Ok(certs)
}

// First PKCS#8, PKCS#1 or SEC1 key in the file.
fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open TLS key: {}", path.display()))?;
    rustls_pemfile::private_key(&mut BufReader::new(file))
        .with_context(|| format!("Failed to read TLS key: {}", path.display()))?
        .ok_or_else(|| anyhow!("TLS private key not found: {}", path.display()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use std::{io::Write, path::PathBuf};

    pub(crate) fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures/tls")
            .join(name)
    }

    pub(crate) fn fixture_config() -> TlsConfig {
        TlsConfig {
            cert: fixture("cert.pem"),
            key: fixture("key.pem"),
        }
    }

    #[test]
    fn loads_fixture_pair() -> Result<()> {
        let config = load_server_config(&fixture_config())?;
        assert_eq!(
            config.alpn_protocols,
            vec![b"h2".to_vec(), b"http/1.1".to_vec()]
        );
        Ok(())
    }

    #[test]
    fn missing_files_fail() {
        let missing = std::env::temp_dir().join(format!("web3dav-tls-{}", ulid::Ulid::new()));
        assert!(load_cert_chain(&missing).is_err());
        assert!(load_private_key(&missing).is_err());
    }

    #[test]
    fn certificate_is_not_a_key() {
        let err = load_private_key(&fixture("cert.pem")).unwrap_err();
        assert!(err.to_string().contains("TLS private key not found"));
    }

    #[test]
    fn empty_certificate_fails() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "not a pem")?;
        let err = load_cert_chain(file.path()).unwrap_err();
        assert!(err.to_string().contains("TLS certificate is empty"));
        Ok(())
    }
}
