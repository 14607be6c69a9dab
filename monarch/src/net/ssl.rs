//! TLS configuration as data only — no handshake implementation ships
//! here. A hosting binary that needs a live TLS connection wraps its own
//! socket crate and reads a `TlsConfig` to decide how to configure it.

use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
    pub ca_path: Option<PathBuf>,
    pub verify_peer: bool,
}

impl TlsConfig {
    pub fn new() -> Self {
        TlsConfig {
            verify_peer: true,
            ..Default::default()
        }
    }

    pub fn with_cert(mut self, cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        self.cert_path = Some(cert_path.into());
        self.key_path = Some(key_path.into());
        self
    }

    pub fn insecure() -> Self {
        TlsConfig {
            verify_peer: false,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_verifies_peer() {
        assert!(TlsConfig::new().verify_peer);
    }

    #[test]
    fn insecure_config_disables_verification() {
        assert!(!TlsConfig::insecure().verify_peer);
    }
}
