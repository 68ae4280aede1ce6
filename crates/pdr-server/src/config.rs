use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pdr_crypto::{ContentHasher, HashAlgorithm, SigningKey};
use pdr_repo::{CommitChain, InMemoryStore, RepoStore, RepositoryManager, SqliteStore};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub storage: StorageConfig,
    pub hash_algorithm: HashAlgorithm,
    /// Hex-encoded Ed25519 secret; when set, every commit is signed.
    pub signing_key: Option<String>,
    /// Answer cross-origin requests from any origin.
    pub permissive_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8082)),
            storage: StorageConfig::Memory,
            hash_algorithm: HashAlgorithm::Blake3,
            signing_key: None,
            permissive_cors: false,
        }
    }
}

/// Where repositories are kept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    Memory,
    Sqlite { path: PathBuf },
}

impl ServerConfig {
    /// Read a TOML config file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn open_store(&self) -> ServerResult<Arc<dyn RepoStore>> {
        Ok(match &self.storage {
            StorageConfig::Memory => Arc::new(InMemoryStore::new()),
            StorageConfig::Sqlite { path } => Arc::new(SqliteStore::open(path)?),
        })
    }

    pub fn commit_chain(&self) -> ServerResult<CommitChain> {
        let chain = CommitChain::new(ContentHasher::new(self.hash_algorithm));
        Ok(match &self.signing_key {
            Some(hex) => chain.with_signer(
                SigningKey::from_hex(hex)
                    .map_err(|e| ServerError::Config(format!("signing_key: {e}")))?,
            ),
            None => chain,
        })
    }

    /// Build the manager this configuration describes.
    pub fn build_manager(&self) -> ServerResult<RepositoryManager> {
        Ok(RepositoryManager::new(self.open_store()?, self.commit_chain()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:8082".parse::<SocketAddr>().unwrap());
        assert_eq!(c.storage, StorageConfig::Memory);
        assert_eq!(c.hash_algorithm, HashAlgorithm::Blake3);
        assert!(c.signing_key.is_none());
        assert!(!c.permissive_cors);
    }

    #[test]
    fn empty_file_is_default() {
        let c = ServerConfig::from_toml("").unwrap();
        assert_eq!(c.bind_addr, ServerConfig::default().bind_addr);
    }

    #[test]
    fn full_file() {
        let c = ServerConfig::from_toml(
            r#"
            bind_addr = "0.0.0.0:9000"
            hash_algorithm = "sha256"
            permissive_cors = true

            [storage]
            backend = "sqlite"
            path = "/var/lib/pdr/pdr.db"
            "#,
        )
        .unwrap();
        assert_eq!(c.bind_addr.port(), 9000);
        assert_eq!(c.hash_algorithm, HashAlgorithm::Sha256);
        assert!(c.permissive_cors);
        assert_eq!(
            c.storage,
            StorageConfig::Sqlite {
                path: "/var/lib/pdr/pdr.db".into()
            }
        );
    }

    #[test]
    fn bad_values_are_config_errors() {
        assert!(matches!(
            ServerConfig::from_toml(r#"hash_algorithm = "md5""#).unwrap_err(),
            ServerError::Config(_)
        ));
        assert!(matches!(
            ServerConfig::from_toml(r#"bind_addr = "nowhere""#).unwrap_err(),
            ServerError::Config(_)
        ));
    }

    #[test]
    fn bad_signing_key_is_rejected() {
        let c = ServerConfig {
            signing_key: Some("zz".into()),
            ..ServerConfig::default()
        };
        assert!(matches!(c.commit_chain().unwrap_err(), ServerError::Config(_)));
    }

    #[test]
    fn signing_key_enables_signatures() {
        let c = ServerConfig {
            signing_key: Some("11".repeat(32)),
            ..ServerConfig::default()
        };
        assert!(c.commit_chain().unwrap().signer().is_some());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pdr.toml");
        std::fs::write(&path, "bind_addr = \"127.0.0.1:7000\"\n").unwrap();
        assert_eq!(ServerConfig::load(&path).unwrap().bind_addr.port(), 7000);
        assert!(ServerConfig::load(dir.path().join("missing.toml")).is_err());
    }
}
