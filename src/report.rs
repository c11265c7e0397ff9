/// The batch driver: enumerates clients, resolves their wallets, reads
/// balances and appends the ledgers.
///
/// One failing address never aborts the run; its error is logged to the
/// error file and the loop moves on. Failures before the loop (settings,
/// storage, the asset service) end the run immediately.
use anyhow::Result;
use rust_decimal::Decimal;

use crate::assets::{Asset, AssetsClient};
use crate::clients::{ClientAccountClient, DirectorySource, FileSource, IdentitySource};
use crate::config::ToolConfig;
use crate::errors::ConfigError;
use crate::logger::{self, LogTag};
use crate::output::ReportWriter;
use crate::readers::{create_balance_readers, ensure_reader_for_asset, BalanceReader};
use crate::resolver::WalletResolver;
use crate::retry::RetryPolicy;

pub struct BatchDriver {
    readers: Vec<Box<dyn BalanceReader>>,
    resolver: WalletResolver,
    writer: ReportWriter,
    retry: RetryPolicy,
    /// The single target asset, or every known asset in multi-asset mode.
    assets: Vec<Asset>,
    include_zero_balances: bool,
}

/// Runs a full report batch for the given settings. Returns `Ok` both on
/// completion and on the clean "asset not found" stop.
pub async fn run(config: &ToolConfig) -> Result<()> {
    let assets_client = AssetsClient::new(&config.asset_service_url);

    let assets = match &config.asset_id {
        Some(asset_id) => {
            logger::info(
                LogTag::Assets,
                &format!("Loading asset {} from the asset service", asset_id),
            );
            match assets_client.get(asset_id).await? {
                Some(asset) => vec![asset],
                None => {
                    logger::warning(LogTag::Assets, &format!("Asset not found: {}", asset_id));
                    return Ok(());
                }
            }
        }
        None => {
            logger::info(LogTag::Assets, "Loading all assets from the asset service");
            assets_client.get_all().await?
        }
    };

    let readers = create_balance_readers(config)?;
    if let Some(asset) = assets.first() {
        if config.asset_id.is_some() {
            ensure_reader_for_asset(&readers, asset)?;
        }
    }

    let resolver = WalletResolver::new(config)?;
    let writer = ReportWriter::open(
        &config.result_file_path,
        &config.error_file_path,
        config.asset_id.is_none(),
    )?;

    let mut driver = BatchDriver {
        readers,
        resolver,
        writer,
        retry: RetryPolicy::default(),
        assets,
        include_zero_balances: config.include_zero_balances,
    };

    let mut source = build_identity_source(config)?;
    driver.process(source.as_mut()).await
}

fn build_identity_source(config: &ToolConfig) -> Result<Box<dyn IdentitySource>> {
    if let Some(path) = &config.client_ids_file_path {
        logger::info(LogTag::Clients, &format!("Reading client ids from {}", path));
        return Ok(Box::new(FileSource::new(path)));
    }

    let url = config
        .client_account_url
        .as_deref()
        .ok_or(ConfigError::MissingSetting("clientAccountUrl"))?;
    logger::info(
        LogTag::Clients,
        &format!("Enumerating the client directory at {}", url),
    );
    Ok(Box::new(DirectorySource::new(ClientAccountClient::new(url))))
}

impl BatchDriver {
    /// Drains the identity source page by page, processing every client.
    pub async fn process(&mut self, source: &mut dyn IdentitySource) -> Result<()> {
        let mut counter = 0u64;

        while let Some(client_ids) = source.next_page().await? {
            logger::debug(
                LogTag::Clients,
                &format!("Processing a page of {} client ids", client_ids.len()),
            );

            for client_id in client_ids {
                self.process_client(&client_id).await?;
                counter += 1;
                logger::info(
                    LogTag::Report,
                    &format!("{} done -- {}", client_id, counter),
                );
            }
        }

        logger::success(LogTag::Report, "All done");
        Ok(())
    }

    async fn process_client(&mut self, client_id: &str) -> Result<()> {
        let records = self.resolver.resolve(client_id).await?;
        logger::debug(
            LogTag::Resolver,
            &format!("{}: {} credential records", client_id, records.len()),
        );
        if records.is_empty() {
            return Ok(());
        }

        for reader in &self.readers {
            let mut raw_addresses = Vec::new();
            for record in &records {
                raw_addresses.extend(reader.get_addresses(record));
            }

            let addresses = reader.select_unique_addresses(&raw_addresses);
            if addresses.is_empty() {
                continue;
            }

            let related_assets = reader.select_related_assets(&self.assets);

            for address in addresses {
                let outcome = self
                    .retry
                    .run(|| reader.read_balance(related_assets, &address))
                    .await;

                match outcome {
                    Ok(results) => {
                        for result in results {
                            if should_emit(result.amount, self.include_zero_balances) {
                                self.writer.write_balance(
                                    client_id,
                                    &result.address,
                                    result.amount,
                                    &result.asset_id,
                                )?;
                            }
                        }
                    }
                    Err(error) => {
                        logger::error(
                            LogTag::Reader,
                            &format!("{} failed for {}: {}", reader.name(), address, error),
                        );
                        self.writer
                            .write_error(client_id, &address, &error.to_string())?;
                    }
                }
            }
        }

        Ok(())
    }
}

/// Zero balances are dropped unless the run asked to keep them.
fn should_emit(amount: Decimal, include_zero_balances: bool) -> bool {
    include_zero_balances || !amount.is_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::Blockchain;
    use crate::config::{BitcoinConfig, DbConfig, WalletType};
    use crate::errors::ReadError;
    use crate::readers::BalanceResult;
    use crate::records::WalletCredentialRecord;
    use async_trait::async_trait;
    use rusqlite::Connection;
    use std::collections::VecDeque;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn zero_balances_are_filtered_by_default() {
        assert!(!should_emit(Decimal::ZERO, false));
        assert!(should_emit(Decimal::ZERO, true));
        assert!(should_emit(Decimal::new(5, 1), false));
    }

    struct PagedSource {
        pages: VecDeque<Vec<String>>,
    }

    #[async_trait]
    impl IdentitySource for PagedSource {
        async fn next_page(&mut self) -> Result<Option<Vec<String>>> {
            Ok(self.pages.pop_front())
        }
    }

    fn empty_db(dir: &tempfile::TempDir) -> String {
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
             );",
        )
        .unwrap();
        drop(conn);

        path.to_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn drains_every_page_and_finishes() {
        let dir = tempdir().unwrap();
        let result_path = dir.path().join("result.csv");
        let error_path = dir.path().join("errors.csv");

        let config = ToolConfig {
            asset_service_url: "http://assets.local".to_string(),
            client_account_url: None,
            blockchain_wallets_url: None,
            asset_id: Some("BTC".to_string()),
            wallet_type: WalletType::Private,
            db: DbConfig {
                client_personal_info_conn_string: Some(empty_db(&dir)),
            },
            result_file_path: result_path.to_str().unwrap().to_string(),
            error_file_path: error_path.to_str().unwrap().to_string(),
            include_zero_balances: false,
            client_ids_file_path: None,
            bitcoin: Some(BitcoinConfig {
                network: "main".to_string(),
                ninja_url: "http://ninja.local".to_string(),
            }),
            ethereum: None,
        };

        let mut driver = BatchDriver {
            readers: create_balance_readers(&config).unwrap(),
            resolver: WalletResolver::new(&config).unwrap(),
            writer: ReportWriter::open(
                &config.result_file_path,
                &config.error_file_path,
                false,
            )
            .unwrap(),
            retry: RetryPolicy::default(),
            assets: Vec::new(),
            include_zero_balances: false,
        };

        // No client has wallets, so no indexer request is ever made.
        let mut source = PagedSource {
            pages: VecDeque::from(vec![
                vec!["client-1".to_string(), "client-2".to_string()],
                vec!["client-3".to_string()],
            ]),
        };

        driver.process(&mut source).await.unwrap();

        assert_eq!(fs::read_to_string(&result_path).unwrap(), "");
        assert_eq!(fs::read_to_string(&error_path).unwrap(), "");
    }

    /// Reads every private-wallet address verbatim; fails fatally for one
    /// designated address.
    struct ScriptedReader;

    const BROKEN_ADDRESS: &str = "broken-address";

    #[async_trait]
    impl BalanceReader for ScriptedReader {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn family(&self) -> Blockchain {
            Blockchain::Bitcoin
        }

        fn get_addresses(&self, record: &WalletCredentialRecord) -> Vec<String> {
            match record {
                WalletCredentialRecord::PrivateWallet(wallet) => vec![wallet.address.clone()],
                _ => Vec::new(),
            }
        }

        fn select_unique_addresses(&self, addresses: &[String]) -> Vec<String> {
            addresses.to_vec()
        }

        fn select_related_assets<'a>(&'a self, _assets: &[Asset]) -> &'a [Asset] {
            &[]
        }

        async fn read_balance(
            &self,
            _assets: &[Asset],
            address: &str,
        ) -> Result<Vec<BalanceResult>, ReadError> {
            if address == BROKEN_ADDRESS {
                return Err(ReadError::fatal("indexer rejected the address"));
            }

            Ok(vec![BalanceResult {
                address: address.to_string(),
                amount: Decimal::ONE,
                asset_id: "BTC".to_string(),
            }])
        }
    }

    #[tokio::test]
    async fn one_failing_address_does_not_block_the_rest() {
        let dir = tempdir().unwrap();
        let result_path = dir.path().join("result.csv");
        let error_path = dir.path().join("errors.csv");

        let db_path = empty_db(&dir);
        let conn = Connection::open(&db_path).unwrap();
        conn.execute_batch(
            "INSERT INTO private_wallets VALUES
                 ('client-1', 'broken-address', 'Bitcoin', NULL, NULL, NULL, NULL),
                 ('client-1', 'intact-address', 'Bitcoin', NULL, NULL, NULL, NULL);",
        )
        .unwrap();
        drop(conn);

        let config = ToolConfig {
            asset_service_url: "http://assets.local".to_string(),
            client_account_url: None,
            blockchain_wallets_url: None,
            asset_id: Some("BTC".to_string()),
            wallet_type: WalletType::Private,
            db: DbConfig {
                client_personal_info_conn_string: Some(db_path),
            },
            result_file_path: result_path.to_str().unwrap().to_string(),
            error_file_path: error_path.to_str().unwrap().to_string(),
            include_zero_balances: false,
            client_ids_file_path: None,
            bitcoin: Some(BitcoinConfig {
                network: "main".to_string(),
                ninja_url: "http://ninja.local".to_string(),
            }),
            ethereum: None,
        };

        let mut driver = BatchDriver {
            readers: vec![Box::new(ScriptedReader)],
            resolver: WalletResolver::new(&config).unwrap(),
            writer: ReportWriter::open(
                &config.result_file_path,
                &config.error_file_path,
                false,
            )
            .unwrap(),
            retry: RetryPolicy::default(),
            assets: Vec::new(),
            include_zero_balances: false,
        };

        let mut source = PagedSource {
            pages: VecDeque::from(vec![vec!["client-1".to_string()]]),
        };

        driver.process(&mut source).await.unwrap();

        // The intact address still got its result line.
        let results = fs::read_to_string(&result_path).unwrap();
        assert_eq!(results, "client-1;intact-address;1\n");

        // The broken one got exactly one error-ledger line.
        let errors = fs::read_to_string(&error_path).unwrap();
        let lines: Vec<&str> = errors.lines().collect();
        assert_eq!(lines.len(), 1);
        let fields: Vec<&str> = lines[0].split(';').collect();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[1], "client-1");
        assert_eq!(fields[2], BROKEN_ADDRESS);
        assert!(fields[3].contains("indexer rejected"));
    }
}
