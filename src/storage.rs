/// Credential table access.
///
/// The three wallet-credential tables live in one sqlite database whose path
/// is the configured connection string. All reads are per client; a client
/// with no rows is an empty result, never a failure. The tables are owned by
/// other systems and strictly read-only here.
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use crate::assets::Blockchain;
use crate::errors::ConfigError;
use crate::records::{BcnCredentialsRecord, LegacyWalletCredentials, PrivateWallet};

pub struct WalletStorage {
    conn: Mutex<Connection>,
}

impl WalletStorage {
    /// Opens the credential database. A missing file is a configuration
    /// error, caught once before the batch loop begins.
    pub fn open(conn_string: &str) -> Result<Self> {
        if !Path::new(conn_string).exists() {
            return Err(ConfigError::InvalidSetting {
                field: "db.clientPersonalInfoConnString",
                reason: format!("database not found: {}", conn_string),
            }
            .into());
        }

        let conn = Connection::open(conn_string)
            .with_context(|| format!("Failed to open credential database: {}", conn_string))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// All stored private wallets of a client, except the implicit default
    /// (that one is synthesized from the legacy record by the resolver).
    pub fn get_private_wallets(&self, client_id: &str) -> Result<Vec<PrivateWallet>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT client_id, address, blockchain, wallet_name, encoded_private_key, \
             is_cold_storage, number \
             FROM private_wallets WHERE client_id = ?1",
        )?;

        let rows = stmt.query_map(params![client_id], |row| {
            let blockchain: String = row.get(2)?;
            Ok(PrivateWallet {
                client_id: row.get(0)?,
                address: row.get(1)?,
                blockchain: parse_blockchain(&blockchain),
                wallet_name: row.get(3)?,
                encoded_private_key: row.get(4)?,
                is_cold_storage: row.get(5)?,
                number: row.get(6)?,
            })
        })?;

        let mut wallets = Vec::new();
        for wallet in rows {
            wallets.push(wallet?);
        }

        Ok(wallets)
    }

    /// The legacy wallet-credentials singleton record, if the client has one.
    pub fn get_wallet_credentials(&self, client_id: &str) -> Result<Option<LegacyWalletCredentials>> {
        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(
                "SELECT client_id, address, multi_sig, colored_multi_sig, eth_address, \
                 btc_conversion_address, solar_coin_address, chrono_bank_contract, quanta_contract \
                 FROM wallet_credentials WHERE client_id = ?1",
                params![client_id],
                |row| {
                    Ok(LegacyWalletCredentials {
                        client_id: row.get(0)?,
                        address: row.get(1)?,
                        multi_sig: row.get(2)?,
                        colored_multi_sig: row.get(3)?,
                        eth_address: row.get(4)?,
                        btc_conversion_address: row.get(5)?,
                        solar_coin_address: row.get(6)?,
                        chrono_bank_contract: row.get(7)?,
                        quanta_contract: row.get(8)?,
                    })
                },
            )
            .optional()?;

        Ok(record)
    }

    /// All bcn-credential rows of a client, one per asset id.
    pub fn get_bcn_credentials(&self, client_id: &str) -> Result<Vec<BcnCredentialsRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT client_id, asset_id, address, asset_address, encoded_key \
             FROM bcn_credentials WHERE client_id = ?1",
        )?;

        let rows = stmt.query_map(params![client_id], |row| {
            Ok(BcnCredentialsRecord {
                client_id: row.get(0)?,
                asset_id: row.get(1)?,
                address: row.get(2)?,
                asset_address: row.get(3)?,
                encoded_key: row.get(4)?,
            })
        })?;

        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }

        Ok(records)
    }
}

fn parse_blockchain(value: &str) -> Blockchain {
    match value.to_ascii_lowercase().as_str() {
        "bitcoin" => Blockchain::Bitcoin,
        "ethereum" => Blockchain::Ethereum,
        _ => Blockchain::Unsupported,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seeded_storage(dir: &tempfile::TempDir) -> WalletStorage {
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
                 ('client-1', '1AAA', 'Bitcoin', 'hot', NULL, 0, 1),
                 ('client-1', '0xabc', 'Ethereum', NULL, NULL, NULL, NULL),
                 ('client-2', '1BBB', 'Bitcoin', NULL, NULL, 1, NULL);
             INSERT INTO wallet_credentials (client_id, address, multi_sig, eth_address)
                 VALUES ('client-1', '1CCC', '3DDD', '0xdef');
             INSERT INTO bcn_credentials VALUES
                 ('client-1', 'TOKEN', '0x111', '0x222', NULL);",
        )
        .unwrap();
        drop(conn);

        WalletStorage::open(path.to_str().unwrap()).unwrap()
    }

    #[test]
    fn missing_database_is_a_config_error() {
        assert!(WalletStorage::open("/nonexistent/wallets.db").is_err());
    }

    #[test]
    fn reads_are_partitioned_by_client() {
        let dir = tempdir().unwrap();
        let storage = seeded_storage(&dir);

        let wallets = storage.get_private_wallets("client-1").unwrap();
        assert_eq!(wallets.len(), 2);
        assert_eq!(wallets[0].blockchain, Blockchain::Bitcoin);
        assert_eq!(wallets[1].blockchain, Blockchain::Ethereum);

        let wallets = storage.get_private_wallets("client-2").unwrap();
        assert_eq!(wallets.len(), 1);
    }

    #[test]
    fn absent_rows_are_empty_results() {
        let dir = tempdir().unwrap();
        let storage = seeded_storage(&dir);

        assert!(storage.get_private_wallets("unknown").unwrap().is_empty());
        assert!(storage.get_wallet_credentials("unknown").unwrap().is_none());
        assert!(storage.get_bcn_credentials("unknown").unwrap().is_empty());
    }

    #[test]
    fn legacy_record_round_trips() {
        let dir = tempdir().unwrap();
        let storage = seeded_storage(&dir);

        let record = storage.get_wallet_credentials("client-1").unwrap().unwrap();
        assert_eq!(record.address.as_deref(), Some("1CCC"));
        assert_eq!(record.multi_sig.as_deref(), Some("3DDD"));
        assert_eq!(record.eth_address.as_deref(), Some("0xdef"));
        assert!(record.colored_multi_sig.is_none());
    }

    #[test]
    fn bcn_rows_keep_both_address_fields() {
        let dir = tempdir().unwrap();
        let storage = seeded_storage(&dir);

        let records = storage.get_bcn_credentials("client-1").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].asset_id, "TOKEN");
        assert_eq!(records[0].address.as_deref(), Some("0x111"));
        assert_eq!(records[0].asset_address.as_deref(), Some("0x222"));
    }
}
