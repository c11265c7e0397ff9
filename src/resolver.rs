/// Wallet resolution: client id in, credential records out.
///
/// The resolver is built once before the batch loop and opens only the
/// backends its mode needs, so a bad connection string or registry URL fails
/// the run up front instead of on the first client.
use anyhow::Result;
use uuid::Uuid;

use crate::config::{ToolConfig, WalletType};
use crate::errors::ConfigError;
use crate::records::WalletCredentialRecord;
use crate::registry::BlockchainWalletsClient;
use crate::storage::WalletStorage;

/// Registry pages are drained in chunks of this size.
const REGISTRY_PAGE_SIZE: u32 = 10;

pub struct WalletResolver {
    mode: ResolutionMode,
}

/// Each wallet population carries exactly the backends it reads from.
enum ResolutionMode {
    Private {
        storage: WalletStorage,
    },
    Deposit {
        storage: WalletStorage,
        registry: BlockchainWalletsClient,
    },
    BilDeposit {
        registry: BlockchainWalletsClient,
    },
}

impl WalletResolver {
    pub fn new(config: &ToolConfig) -> Result<Self> {
        let open_storage = || -> Result<WalletStorage> {
            let conn_string = config
                .db
                .client_personal_info_conn_string
                .as_deref()
                .ok_or(ConfigError::MissingSetting("db.clientPersonalInfoConnString"))?;
            WalletStorage::open(conn_string)
        };
        let open_registry = || -> Result<BlockchainWalletsClient> {
            let url = config
                .blockchain_wallets_url
                .as_deref()
                .ok_or(ConfigError::MissingSetting("blockchainWalletsUrl"))?;
            Ok(BlockchainWalletsClient::new(url))
        };

        let mode = match config.wallet_type {
            WalletType::Private => ResolutionMode::Private {
                storage: open_storage()?,
            },
            WalletType::Deposit => ResolutionMode::Deposit {
                storage: open_storage()?,
                registry: open_registry()?,
            },
            WalletType::BilDeposit => ResolutionMode::BilDeposit {
                registry: open_registry()?,
            },
        };

        Ok(Self { mode })
    }

    /// Every credential record the configured wallet population holds for
    /// the client. Clients with no wallets resolve to an empty list.
    pub async fn resolve(&self, client_id: &str) -> Result<Vec<WalletCredentialRecord>> {
        let mut records = Vec::new();

        match &self.mode {
            ResolutionMode::Private { storage } => {
                for wallet in storage.get_private_wallets(client_id)? {
                    records.push(WalletCredentialRecord::PrivateWallet(wallet));
                }

                // The legacy record's base address is an implicit private
                // wallet that predates the private-wallets table.
                if let Some(credentials) = storage.get_wallet_credentials(client_id)? {
                    if let Some(default) = credentials.to_default_private_wallet() {
                        records.push(WalletCredentialRecord::PrivateWallet(default));
                    }
                }
            }
            ResolutionMode::Deposit { storage, registry } => {
                for bcn in storage.get_bcn_credentials(client_id)? {
                    records.push(WalletCredentialRecord::BcnCredentials(bcn));
                }

                if let Some(credentials) = storage.get_wallet_credentials(client_id)? {
                    records.push(WalletCredentialRecord::LegacyCredentials(credentials));
                }

                append_registry_wallets(registry, client_id, &mut records).await?;
            }
            ResolutionMode::BilDeposit { registry } => {
                append_registry_wallets(registry, client_id, &mut records).await?;
            }
        }

        Ok(records)
    }
}

/// The registry keys wallets by GUID; a client id that is not one simply
/// has nothing registered there.
async fn append_registry_wallets(
    registry: &BlockchainWalletsClient,
    client_id: &str,
    records: &mut Vec<WalletCredentialRecord>,
) -> Result<()> {
    let client_uuid = match Uuid::parse_str(client_id) {
        Ok(uuid) => uuid,
        Err(_) => return Ok(()),
    };

    for wallet in registry
        .get_all_client_wallets(client_uuid, REGISTRY_PAGE_SIZE)
        .await?
    {
        records.push(WalletCredentialRecord::DepositWallet(wallet));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BitcoinConfig, DbConfig};
    use rusqlite::Connection;
    use tempfile::tempdir;

    fn config_for(wallet_type: WalletType, conn_string: Option<String>) -> ToolConfig {
        ToolConfig {
            asset_service_url: "http://assets.local".to_string(),
            client_account_url: Some("http://clients.local".to_string()),
            blockchain_wallets_url: Some("http://registry.local".to_string()),
            asset_id: Some("BTC".to_string()),
            wallet_type,
            db: DbConfig {
                client_personal_info_conn_string: conn_string,
            },
            result_file_path: "result.csv".to_string(),
            error_file_path: "errors.csv".to_string(),
            include_zero_balances: false,
            client_ids_file_path: None,
            bitcoin: Some(BitcoinConfig {
                network: "main".to_string(),
                ninja_url: "http://ninja.local".to_string(),
            }),
            ethereum: None,
        }
    }

    fn seeded_db(dir: &tempfile::TempDir) -> String {
        let path = dir.path().join("wallets.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE private_wallets (
                 client_id TEXT NOT NULL,
                 address TEXT NOT NULL,
                 blockchain TEXT NOT NULL,
                 wallet_name TEXT,
                 encoded_private_key TEXT,
                 is_cold_storage INTEGER,
                 number INTEGER
             );
             CREATE TABLE wallet_credentials (
                 client_id TEXT PRIMARY KEY,
                 address TEXT,
                 multi_sig TEXT,
                 colored_multi_sig TEXT,
                 eth_address TEXT,
                 btc_conversion_address TEXT,
                 solar_coin_address TEXT,
                 chrono_bank_contract TEXT,
                 quanta_contract TEXT
             );
             CREATE TABLE bcn_credentials (
                 client_id TEXT NOT NULL,
                 asset_id TEXT NOT NULL,
                 address TEXT,
                 asset_address TEXT,
                 encoded_key TEXT
             );
             INSERT INTO private_wallets VALUES
                 ('client-1', '1AAA', 'Bitcoin', 'hot', NULL, 0, 1);
             INSERT INTO wallet_credentials (client_id, address, eth_address)
                 VALUES ('client-1', '1CCC', '0xdef');
             INSERT INTO bcn_credentials VALUES
                 ('client-1', 'TOKEN', '0x111', '0x222', NULL);",
        )
        .unwrap();
        drop(conn);

        path.to_str().unwrap().to_string()
    }

    #[test]
    fn private_mode_requires_a_connection_string() {
        let config = config_for(WalletType::Private, None);
        assert!(WalletResolver::new(&config).is_err());
    }

    #[tokio::test]
    async fn private_mode_includes_the_legacy_default_wallet() {
        let dir = tempdir().unwrap();
        let config = config_for(WalletType::Private, Some(seeded_db(&dir)));
        let resolver = WalletResolver::new(&config).unwrap();

        let records = resolver.resolve("client-1").await.unwrap();
        assert_eq!(records.len(), 2);

        let default = match &records[1] {
            WalletCredentialRecord::PrivateWallet(wallet) => wallet,
            other => panic!("unexpected record: {:?}", other),
        };
        assert_eq!(default.address, "1CCC");
        assert_eq!(default.wallet_name.as_deref(), Some("default"));
    }

    #[tokio::test]
    async fn private_mode_without_legacy_record_yields_stored_wallets_only() {
        let dir = tempdir().unwrap();
        let config = config_for(WalletType::Private, Some(seeded_db(&dir)));
        let resolver = WalletResolver::new(&config).unwrap();

        let records = resolver.resolve("client-2").await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn deposit_mode_collects_bcn_and_legacy_records() {
        let dir = tempdir().unwrap();
        let config = config_for(WalletType::Deposit, Some(seeded_db(&dir)));
        let resolver = WalletResolver::new(&config).unwrap();

        // "client-1" is not a GUID, so the registry contributes nothing and
        // no request leaves the process.
        let records = resolver.resolve("client-1").await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(matches!(records[0], WalletCredentialRecord::BcnCredentials(_)));
        assert!(matches!(records[1], WalletCredentialRecord::LegacyCredentials(_)));
    }
}
