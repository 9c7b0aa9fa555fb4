// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use anyhow::Result;
use arbor_core::{GraphSubjects, IdentifierMinter, PairtreeShape, TokenForm};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// File name of the repository inside `data_dir`
pub const REPOSITORY_FILE: &str = "repository.bin";

/// Arbor Server Configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpServerConfig,
    #[serde(default)]
    pub repository: RepositoryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServerConfig {
    /// HTTP API listen address (e.g., "127.0.0.1:8080")
    #[serde(default = "default_http_addr")]
    pub listen_addr: String,

    /// Public base URL of the repository; subjects are minted under it and
    /// COPY/MOVE destinations must lie beneath it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Enable CORS
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,

    /// Triples serialized per response body chunk
    #[serde(default = "default_stream_chunk_triples")]
    pub stream_chunk_triples: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepositoryConfig {
    /// Characters per pairtree segment of minted child ids
    #[serde(default = "default_pairtree_length")]
    pub pairtree_length: usize,

    /// Pairtree segments per minted id (0 = flat ids)
    #[serde(default = "default_pairtree_count")]
    pub pairtree_count: usize,

    /// Token form minted ids are sliced from
    #[serde(default)]
    pub token_form: TokenForm,

    /// Persist the repository here; in-memory when unset
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

// Default values
fn default_http_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080/rest/".to_string()
}

fn default_enable_cors() -> bool {
    true
}

fn default_stream_chunk_triples() -> usize {
    256
}

fn default_pairtree_length() -> usize {
    2
}

fn default_pairtree_count() -> usize {
    4
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_http_addr(),
            base_url: default_base_url(),
            enable_cors: default_enable_cors(),
            stream_chunk_triples: default_stream_chunk_triples(),
        }
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            pairtree_length: default_pairtree_length(),
            pairtree_count: default_pairtree_count(),
            token_form: TokenForm::default(),
            data_dir: None,
        }
    }
}

const ENV_HTTP_ADDR: &str = "ARBOR_HTTP_ADDR";
const ENV_BASE_URL: &str = "ARBOR_BASE_URL";
const ENV_DATA_DIR: &str = "ARBOR_DATA_DIR";
const ENV_PAIRTREE_LENGTH: &str = "ARBOR_PAIRTREE_LENGTH";
const ENV_PAIRTREE_COUNT: &str = "ARBOR_PAIRTREE_COUNT";
const ENV_TOKEN_FORM: &str = "ARBOR_TOKEN_FORM";

impl ServerConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - ARBOR_HTTP_ADDR: HTTP listen address (default: 127.0.0.1:8080)
    /// - ARBOR_BASE_URL: public base URL (default: http://127.0.0.1:8080/rest/)
    /// - ARBOR_DATA_DIR: data directory (default: in-memory)
    /// - ARBOR_PAIRTREE_LENGTH / ARBOR_PAIRTREE_COUNT: minted id shape (default: 2 / 4)
    /// - ARBOR_TOKEN_FORM: `hyphenated` or `simple` (default: hyphenated)
    pub fn from_env() -> Self {
        Self::merge_with_env(Self::default())
    }

    /// Load configuration with priority: env > file > defaults
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let config = match config_file {
            Some(path) if path.exists() => {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            }
            Some(path) => {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
            None => Self::default(),
        };

        Ok(Self::merge_with_env(config))
    }

    /// Override fields whose environment variable is set
    fn merge_with_env(mut config: Self) -> Self {
        if let Ok(addr) = std::env::var(ENV_HTTP_ADDR) {
            config.server.listen_addr = addr;
        }
        if let Ok(base_url) = std::env::var(ENV_BASE_URL) {
            config.server.base_url = base_url;
        }
        if let Ok(data_dir) = std::env::var(ENV_DATA_DIR) {
            config.repository.data_dir = Some(PathBuf::from(data_dir));
        }
        if let Some(length) = env_parse(ENV_PAIRTREE_LENGTH) {
            config.repository.pairtree_length = length;
        }
        if let Some(count) = env_parse(ENV_PAIRTREE_COUNT) {
            config.repository.pairtree_count = count;
        }
        if let Some(form) = env_parse(ENV_TOKEN_FORM) {
            config.repository.token_form = form;
        }
        config
    }

    /// Parse listen address as SocketAddr
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(self.server.listen_addr.parse()?)
    }

    pub fn subjects(&self) -> Result<GraphSubjects> {
        Ok(GraphSubjects::new(&self.server.base_url)?)
    }

    pub fn pairtree_shape(&self) -> PairtreeShape {
        PairtreeShape {
            length: self.repository.pairtree_length,
            count: self.repository.pairtree_count,
        }
    }

    pub fn minter(&self) -> IdentifierMinter {
        IdentifierMinter::new(self.repository.token_form)
    }

    /// Repository file, when persistence is configured
    pub fn data_file(&self) -> Option<PathBuf> {
        self.repository
            .data_dir
            .as_ref()
            .map(|dir| dir.join(REPOSITORY_FILE))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        self.subjects()?;

        if self.server.stream_chunk_triples == 0 {
            anyhow::bail!("stream_chunk_triples must be at least 1");
        }

        let shape = self.pairtree_shape();
        if shape.count > 0 && shape.length == 0 {
            anyhow::bail!("pairtree_length must be at least 1 when pairtree_count is set");
        }
        self.minter().check_shape(shape)?;

        if let Some(dir) = &self.repository.data_dir {
            if !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid {}={:?}", name, raw);
            None
        }
    }
}
