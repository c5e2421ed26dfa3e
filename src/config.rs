use crate::storage::{self, StorageManager};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "config.yaml";

/// Hard cap on a single page fetch.
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
const MAX_FETCH_TIMEOUT_SECS: u64 = 60;
/// Number of address-bar suggestions returned per query
const DEFAULT_SEARCH_LIMIT: usize = 10;
const DEFAULT_SYNC_PARALLELISM: u16 = 4;
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
const USER_AGENT_DEFAULT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "search_limit")]
    pub search_limit: usize,
    /// How many pages are fetched at once during a full sync
    #[serde(default = "sync_parallelism")]
    pub sync_parallelism: u16,
    #[serde(default = "user_agent")]
    pub user_agent: String,
    /// Proxy url handed to reqwest (http, https or socks5)
    #[serde(default)]
    pub proxy: Option<String>,
    /// Browser bookmark tree to read on `sync` and `import`
    #[serde(default)]
    pub bookmarks_file: Option<String>,
    #[serde(default = "listen_addr")]
    pub listen_addr: String,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            search_limit: DEFAULT_SEARCH_LIMIT,
            sync_parallelism: DEFAULT_SYNC_PARALLELISM,
            user_agent: USER_AGENT_DEFAULT.to_string(),
            proxy: None,
            bookmarks_file: None,
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            base_path: String::new(),
        }
    }
}

fn fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

fn sync_parallelism() -> u16 {
    DEFAULT_SYNC_PARALLELISM
}

fn user_agent() -> String {
    USER_AGENT_DEFAULT.to_string()
}

fn listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

impl Config {
    fn validate(&mut self) -> anyhow::Result<()> {
        if self.sync_parallelism == 0 {
            self.sync_parallelism = 1
        }

        if !(1..=MAX_FETCH_TIMEOUT_SECS).contains(&self.fetch_timeout_secs) {
            bail!(
                "fetch_timeout_secs must be between 1 and {MAX_FETCH_TIMEOUT_SECS}, got {}",
                self.fetch_timeout_secs
            );
        }

        if self.search_limit == 0 {
            bail!("search_limit must be greater than 0");
        }

        if let Some(proxy) = &self.proxy {
            url::Url::parse(proxy).with_context(|| format!("proxy {proxy:?} is not a valid url"))?;
        }

        Ok(())
    }

    pub fn load_with(base_path: &str) -> anyhow::Result<Self> {
        let store = storage::BackendLocal::new(base_path)?;

        // create new if does not exist
        if !store.exists(CONFIG_FILE) {
            log::info!("writing default config to {base_path}/{CONFIG_FILE}");
            store.write(CONFIG_FILE, serde_yml::to_string(&Self::default())?.as_bytes())?;
        }

        let config_str =
            String::from_utf8(store.read(CONFIG_FILE)?).context("config file is not valid utf8")?;
        let mut config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_string();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let store = storage::BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write(CONFIG_FILE, config_str.as_bytes())?;
        Ok(())
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}
