/// Address classification per blockchain family.
///
/// The classifier answers three questions about a raw address string: is it
/// syntactically valid for the family, what is its canonical form, and is it
/// a plain address or an asset-colored encoding. Canonical forms are the
/// deduplication keys: two raw strings that decode to the same underlying
/// address collapse to one balance query. Filtering calls never fail on
/// malformed input; they return false or `None`.
use once_cell::sync::Lazy;
use regex::Regex;

/// Encoding variant of a classified address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Plain,
    Colored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalAddress {
    /// Normalized address string, used as the dedup key. For a colored
    /// encoding this is the underlying plain address.
    pub canonical: String,
    pub kind: AddressKind,
}

/// Bitcoin network flavor, selecting the base58 version bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitcoinNetwork {
    Main,
    Test,
}

impl BitcoinNetwork {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "main" | "mainnet" => Some(BitcoinNetwork::Main),
            "test" | "testnet" | "regtest" => Some(BitcoinNetwork::Test),
            _ => None,
        }
    }

    fn plain_versions(&self) -> [u8; 2] {
        match self {
            // P2PKH, P2SH
            BitcoinNetwork::Main => [0x00, 0x05],
            BitcoinNetwork::Test => [0x6F, 0xC4],
        }
    }

    fn asset_id_version(&self) -> u8 {
        match self {
            BitcoinNetwork::Main => 23,
            BitcoinNetwork::Test => 115,
        }
    }
}

/// Open Assets colored-address namespace marker.
const COLORED_MARKER: u8 = 0x13;

/// Base58check address logic for the Bitcoin family.
#[derive(Debug, Clone, Copy)]
pub struct BitcoinClassifier {
    network: BitcoinNetwork,
}

impl BitcoinClassifier {
    pub fn new(network: BitcoinNetwork) -> Self {
        Self { network }
    }

    pub fn is_valid(&self, address: &str) -> bool {
        self.canonicalize(address).is_some()
    }

    /// Decodes the address and normalizes a colored encoding to its
    /// underlying plain address. `None` for anything that is not a valid
    /// address on this network.
    pub fn canonicalize(&self, address: &str) -> Option<CanonicalAddress> {
        let payload = decode_base58check(address)?;

        if self.is_plain_payload(&payload) {
            return Some(CanonicalAddress {
                canonical: encode_base58check(&payload),
                kind: AddressKind::Plain,
            });
        }

        // Colored: marker byte wrapping a full plain payload.
        if payload.len() > 1
            && payload[0] == COLORED_MARKER
            && self.is_plain_payload(&payload[1..])
        {
            return Some(CanonicalAddress {
                canonical: encode_base58check(&payload[1..]),
                kind: AddressKind::Colored,
            });
        }

        None
    }

    /// Whether a string is a valid Open Assets asset id on this network.
    pub fn is_colored_asset_id(&self, asset_id: &str) -> bool {
        match decode_base58check(asset_id) {
            Some(payload) => {
                payload.len() == 21 && payload[0] == self.network.asset_id_version()
            }
            None => false,
        }
    }

    fn is_plain_payload(&self, payload: &[u8]) -> bool {
        payload.len() == 21 && self.network.plain_versions().contains(&payload[0])
    }
}

fn decode_base58check(input: &str) -> Option<Vec<u8>> {
    if input.is_empty() {
        return None;
    }
    bs58::decode(input).with_check(None).into_vec().ok()
}

fn encode_base58check(payload: &[u8]) -> String {
    bs58::encode(payload).with_check().into_string()
}

static ETH_ADDRESS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new("^(0x)?[0-9a-fA-F]{40}$").expect("eth address regex"));

/// Hex address logic for the Ethereum family. Case variants of one address
/// normalize to the same lowercase form.
#[derive(Debug, Clone, Copy, Default)]
pub struct EthereumClassifier;

impl EthereumClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn is_valid(&self, address: &str) -> bool {
        ETH_ADDRESS_REGEX.is_match(address)
    }

    pub fn canonicalize(&self, address: &str) -> Option<CanonicalAddress> {
        if !self.is_valid(address) {
            return None;
        }

        let hex = address.trim_start_matches("0x").to_ascii_lowercase();
        Some(CanonicalAddress {
            canonical: format!("0x{}", hex),
            kind: AddressKind::Plain,
        })
    }
}
