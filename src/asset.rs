//! Asset Model
//!
//! A closed set of swappable asset kinds. Each kind is resolved once against
//! the available chain clients into an [`AssetOps`] implementation; callers
//! never switch on the kind again.
//!
//! | Kind | Swapper | Balance | Transfer intent |
//! |------|---------|---------|-----------------|
//! | `Native` | yes | `eth_getBalance` | value transfer |
//! | `Token` | yes | ERC-20 `balanceOf` | `transfer(address,uint256)` |
//! | `NonFungible` | no | ERC-721 `balanceOf` | `transferFrom(address,address,uint256)` |
//! | `Utxo` | no | sum of outputs | pay-to-address |

use async_trait::async_trait;
use primitive_types::{H160, U256};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use crate::common::error::{Result, SwapError};
use crate::evm::abi;
use crate::evm::reader::ContractReader;
use crate::utxo::indexer::UtxoIndexer;

const BALANCE_OF_SIGNATURE: &str = "balanceOf(address)";
const TRANSFER_SIGNATURE: &str = "transfer(address,uint256)";
const TRANSFER_FROM_SIGNATURE: &str = "transferFrom(address,address,uint256)";

/// A swappable asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Asset {
    /// Chain-native coin held by a swapper contract
    Native { swapper: H160 },
    /// ERC-20 token held by a swapper contract
    Token { token: H160, swapper: H160 },
    /// One ERC-721 token
    NonFungible { token: H160, token_id: U256 },
    /// Bitcoin-family coin locked in a P2WSH HTLC
    Utxo { network: bitcoin::Network },
}

/// Unsigned description of a transfer; signing and broadcast happen elsewhere
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransferIntent {
    /// Plain value transfer on the account chain
    Value { to: H160, amount: U256 },
    /// Contract call on the account chain
    Call {
        to: H160,
        #[serde(with = "hex::serde")]
        data: Vec<u8>,
    },
    /// Payment to a UTXO-chain address
    Utxo { address: String, sats: u64 },
}

/// Chain clients available for asset resolution
#[derive(Clone, Default)]
pub struct ChainClients {
    pub evm: Option<Arc<dyn ContractReader>>,
    pub utxo: Option<Arc<dyn UtxoIndexer>>,
}

impl ChainClients {
    pub fn with_evm(mut self, reader: Arc<dyn ContractReader>) -> Self {
        self.evm = Some(reader);
        self
    }

    pub fn with_utxo(mut self, indexer: Arc<dyn UtxoIndexer>) -> Self {
        self.utxo = Some(indexer);
        self
    }
}

/// Operations every asset kind supports
#[async_trait]
pub trait AssetOps: Send + Sync {
    /// HTLC contract holding orders for this asset
    fn swapper_address(&self) -> Result<H160>;

    /// Balance of `owner` in the asset's smallest unit
    async fn balance_of(&self, owner: &str) -> Result<U256>;

    /// Build the transfer of `amount` from `from` to `to`
    fn transfer(&self, from: &str, to: &str, amount: U256) -> Result<TransferIntent>;
}

impl Asset {
    /// Swapper contract of a contract-held asset
    pub fn swapper_address(&self) -> Result<H160> {
        match self {
            Asset::Native { swapper } | Asset::Token { swapper, .. } => Ok(*swapper),
            Asset::NonFungible { .. } => Err(SwapError::unsupported("non-fungible asset has no swapper")),
            Asset::Utxo { .. } => Err(SwapError::unsupported("utxo asset has no swapper")),
        }
    }

    /// Bind this asset to the client for its chain family
    pub fn resolve(&self, clients: &ChainClients) -> Result<Box<dyn AssetOps>> {
        let evm = || {
            clients
                .evm
                .clone()
                .ok_or_else(|| SwapError::unsupported(format!("no account-chain client for {}", self)))
        };

        Ok(match self {
            Asset::Native { swapper } => Box::new(NativeAsset {
                swapper: *swapper,
                reader: evm()?,
            }),
            Asset::Token { token, swapper } => Box::new(TokenAsset {
                token: *token,
                swapper: *swapper,
                reader: evm()?,
            }),
            Asset::NonFungible { token, token_id } => Box::new(NonFungibleAsset {
                token: *token,
                token_id: *token_id,
                reader: evm()?,
            }),
            Asset::Utxo { network } => Box::new(UtxoAsset {
                network: *network,
                indexer: clients
                    .utxo
                    .clone()
                    .ok_or_else(|| SwapError::unsupported(format!("no utxo indexer for {}", self)))?,
            }),
        })
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Asset::Native { swapper } => write!(f, "native@{:#x}", swapper),
            Asset::Token { token, .. } => write!(f, "token {:#x}", token),
            Asset::NonFungible { token, token_id } => write!(f, "nft {:#x}#{}", token, token_id),
            Asset::Utxo { network } => write!(f, "utxo/{}", network),
        }
    }
}

fn parse_account(s: &str) -> Result<H160> {
    abi::parse_h160(s).map_err(|e| SwapError::InvalidAddress(format!("{}: {}", s, e)))
}

/// ERC-20 / ERC-721 `balanceOf(owner)`
async fn erc_balance_of(reader: &dyn ContractReader, token: &H160, owner: &H160) -> Result<U256> {
    let data = abi::encode_call(
        abi::selector(BALANCE_OF_SIGNATURE),
        &[abi::encode_address(owner)],
    );
    let ret = reader.call(token, &data).await?;
    Ok(abi::decode_u256(&ret, 0)?)
}

// ============================================================================
// Resolved asset kinds
// ============================================================================

struct NativeAsset {
    swapper: H160,
    reader: Arc<dyn ContractReader>,
}

#[async_trait]
impl AssetOps for NativeAsset {
    fn swapper_address(&self) -> Result<H160> {
        Ok(self.swapper)
    }

    async fn balance_of(&self, owner: &str) -> Result<U256> {
        Ok(self.reader.get_balance(&parse_account(owner)?).await?)
    }

    fn transfer(&self, _from: &str, to: &str, amount: U256) -> Result<TransferIntent> {
        Ok(TransferIntent::Value {
            to: parse_account(to)?,
            amount,
        })
    }
}

struct TokenAsset {
    token: H160,
    swapper: H160,
    reader: Arc<dyn ContractReader>,
}

#[async_trait]
impl AssetOps for TokenAsset {
    fn swapper_address(&self) -> Result<H160> {
        Ok(self.swapper)
    }

    async fn balance_of(&self, owner: &str) -> Result<U256> {
        erc_balance_of(self.reader.as_ref(), &self.token, &parse_account(owner)?).await
    }

    fn transfer(&self, _from: &str, to: &str, amount: U256) -> Result<TransferIntent> {
        Ok(TransferIntent::Call {
            to: self.token,
            data: abi::encode_call(
                abi::selector(TRANSFER_SIGNATURE),
                &[abi::encode_address(&parse_account(to)?), abi::encode_u256(&amount)],
            ),
        })
    }
}

struct NonFungibleAsset {
    token: H160,
    token_id: U256,
    reader: Arc<dyn ContractReader>,
}

#[async_trait]
impl AssetOps for NonFungibleAsset {
    fn swapper_address(&self) -> Result<H160> {
        Err(SwapError::unsupported("non-fungible asset has no swapper"))
    }

    async fn balance_of(&self, owner: &str) -> Result<U256> {
        erc_balance_of(self.reader.as_ref(), &self.token, &parse_account(owner)?).await
    }

    /// `amount` is ignored; the intent moves the bound token id
    fn transfer(&self, from: &str, to: &str, _amount: U256) -> Result<TransferIntent> {
        Ok(TransferIntent::Call {
            to: self.token,
            data: abi::encode_call(
                abi::selector(TRANSFER_FROM_SIGNATURE),
                &[
                    abi::encode_address(&parse_account(from)?),
                    abi::encode_address(&parse_account(to)?),
                    abi::encode_u256(&self.token_id),
                ],
            ),
        })
    }
}

struct UtxoAsset {
    network: bitcoin::Network,
    indexer: Arc<dyn UtxoIndexer>,
}

#[async_trait]
impl AssetOps for UtxoAsset {
    fn swapper_address(&self) -> Result<H160> {
        Err(SwapError::unsupported("utxo asset has no swapper"))
    }

    async fn balance_of(&self, owner: &str) -> Result<U256> {
        let utxos = self.indexer.get_utxos(owner).await?;
        Ok(utxos
            .iter()
            .fold(U256::zero(), |total, utxo| total + U256::from(utxo.value)))
    }

    fn transfer(&self, _from: &str, to: &str, amount: U256) -> Result<TransferIntent> {
        let address = bitcoin::Address::from_str(to)
            .and_then(|a| a.require_network(self.network))
            .map_err(|e| SwapError::InvalidAddress(format!("{}: {}", to, e)))?;

        Ok(TransferIntent::Utxo {
            address: address.to_string(),
            sats: abi::u256_to_u64(amount, "sats")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evm::reader::MockContractReader;
    use crate::utxo::swap::tests::{utxo, FakeIndexer};
    use crate::utxo::UtxoSwap;

    const OWNER: &str = "0x1111111111111111111111111111111111111111";
    const RECIPIENT: &str = "0x2222222222222222222222222222222222222222";

    fn evm_clients(reader: MockContractReader) -> ChainClients {
        ChainClients::default().with_evm(Arc::new(reader))
    }

    #[test]
    fn test_swapper_by_kind() {
        let swapper = H160::repeat_byte(0x5a);
        assert_eq!(Asset::Native { swapper }.swapper_address().unwrap(), swapper);
        assert_eq!(
            Asset::Token { token: H160::zero(), swapper }.swapper_address().unwrap(),
            swapper
        );

        let nft = Asset::NonFungible { token: H160::zero(), token_id: U256::one() };
        assert!(matches!(nft.swapper_address(), Err(SwapError::UnsupportedAssetKind(_))));

        let btc = Asset::Utxo { network: bitcoin::Network::Regtest };
        assert!(matches!(btc.swapper_address(), Err(SwapError::UnsupportedAssetKind(_))));
    }

    #[test]
    fn test_resolve_without_client_is_unsupported() {
        let native = Asset::Native { swapper: H160::zero() };
        assert!(matches!(
            native.resolve(&ChainClients::default()),
            Err(SwapError::UnsupportedAssetKind(_))
        ));

        let btc = Asset::Utxo { network: bitcoin::Network::Regtest };
        assert!(matches!(
            btc.resolve(&evm_clients(MockContractReader::new())),
            Err(SwapError::UnsupportedAssetKind(_))
        ));
    }

    #[tokio::test]
    async fn test_native_balance_and_transfer() {
        let mut reader = MockContractReader::new();
        reader
            .expect_get_balance()
            .withf(|owner: &H160| *owner == H160::repeat_byte(0x11))
            .returning(|_| Ok(U256::from(77u64)));

        let ops = Asset::Native { swapper: H160::repeat_byte(0x5a) }
            .resolve(&evm_clients(reader))
            .unwrap();

        assert_eq!(ops.balance_of(OWNER).await.unwrap(), U256::from(77u64));
        assert_eq!(
            ops.transfer(OWNER, RECIPIENT, U256::from(5u64)).unwrap(),
            TransferIntent::Value { to: H160::repeat_byte(0x22), amount: U256::from(5u64) }
        );
        assert!(matches!(ops.balance_of("0x12").await, Err(SwapError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_token_balance_calls_balance_of() {
        let token = H160::repeat_byte(0x70);
        let mut reader = MockContractReader::new();
        reader
            .expect_call()
            .withf(move |to: &H160, data: &[u8]| {
                *to == token && data[..4] == abi::selector("balanceOf(address)") && data.len() == 36
            })
            .returning(|_, _| Ok(abi::encode_u256(&U256::from(1_000u64)).to_vec()));

        let ops = Asset::Token { token, swapper: H160::repeat_byte(0x5a) }
            .resolve(&evm_clients(reader))
            .unwrap();

        assert_eq!(ops.balance_of(OWNER).await.unwrap(), U256::from(1_000u64));

        match ops.transfer(OWNER, RECIPIENT, U256::from(9u64)).unwrap() {
            TransferIntent::Call { to, data } => {
                assert_eq!(to, token);
                assert_eq!(hex::encode(&data[..4]), "a9059cbb");
                assert_eq!(abi::decode_address(&data[4..], 0).unwrap(), H160::repeat_byte(0x22));
                assert_eq!(abi::decode_u256(&data[4..], 1).unwrap(), U256::from(9u64));
            }
            other => panic!("unexpected intent: {:?}", other),
        }
    }

    #[test]
    fn test_nft_transfer_moves_token_id() {
        let ops = Asset::NonFungible { token: H160::repeat_byte(0x70), token_id: U256::from(42u64) }
            .resolve(&evm_clients(MockContractReader::new()))
            .unwrap();

        assert!(ops.swapper_address().is_err());
        match ops.transfer(OWNER, RECIPIENT, U256::one()).unwrap() {
            TransferIntent::Call { data, .. } => {
                assert_eq!(hex::encode(&data[..4]), "23b872dd");
                assert_eq!(abi::decode_address(&data[4..], 0).unwrap(), H160::repeat_byte(0x11));
                assert_eq!(abi::decode_u256(&data[4..], 2).unwrap(), U256::from(42u64));
            }
            other => panic!("unexpected intent: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_utxo_balance_and_transfer() {
        let indexer = FakeIndexer {
            utxos: vec![utxo("a", 6_000, Some(10)), utxo("b", 4_000, None)],
            ..Default::default()
        };
        let clients = ChainClients::default().with_utxo(Arc::new(indexer));
        let ops = Asset::Utxo { network: bitcoin::Network::Regtest }.resolve(&clients).unwrap();

        assert_eq!(ops.balance_of("bcrt1qowner").await.unwrap(), U256::from(10_000u64));

        let recipient = UtxoSwap::new(
            bitcoin::Network::Regtest,
            crate::utxo::htlc::tests::KEY_1,
            crate::utxo::htlc::tests::KEY_2,
            1,
            [0; 32],
            10,
        )
        .unwrap()
        .redeemer()
        .to_string();

        assert_eq!(
            ops.transfer("", &recipient, U256::from(2_500u64)).unwrap(),
            TransferIntent::Utxo { address: recipient.clone(), sats: 2_500 }
        );
        assert!(matches!(
            ops.transfer("", "not-an-address", U256::one()),
            Err(SwapError::InvalidAddress(_))
        ));
    }
}
