//! Application configuration, loaded from the environment (and `.env` in
//! development).

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Port the HTTP/WS server binds to.
    #[serde(default = "default_server_port")]
    pub server_port: u16,

    /// Base URL of the clearinghouse the channel sessions talk to.
    #[serde(default = "default_clearinghouse_url")]
    pub clearinghouse_url: String,

    /// Hex private key the broker signs channel states with.
    #[serde(default = "default_broker_private_key")]
    pub broker_private_key: String,

    /// Address of the on-chain adjudicator contract channels are opened
    /// against.
    #[serde(default = "default_adjudicator_address")]
    pub adjudicator_address: String,

    /// Identifier of the quote asset channels allocate.
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,

    /// Secret for validating push-channel JWTs.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Cadence of the market auto-lock loop.
    #[serde(default = "default_auto_lock_interval_secs")]
    pub auto_lock_interval_secs: u64,
}

fn default_server_port() -> u16 {
    8080
}

fn default_clearinghouse_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_broker_private_key() -> String {
    // Well-known development key (anvil account #0); never fund it.
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_string()
}

fn default_adjudicator_address() -> String {
    "0x0000000000000000000000000000000000000000".to_string()
}

fn default_quote_asset() -> String {
    "usdc".to_string()
}

fn default_jwt_secret() -> String {
    "dev-secret-change-me".to_string()
}

fn default_auto_lock_interval_secs() -> u64 {
    10
}

impl AppConfig {
    /// Load from environment variables (`SERVER_PORT`, `CLEARINGHOUSE_URL`,
    /// `BROKER_PRIVATE_KEY`, `ADJUDICATOR_ADDRESS`, `QUOTE_ASSET`,
    /// `JWT_SECRET`, `AUTO_LOCK_INTERVAL_SECS`).
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?;
        Ok(config.try_deserialize()?)
    }
}
