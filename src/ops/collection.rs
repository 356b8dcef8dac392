// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

use super::{OpCodec, Reader, Writer};
use crate::errors::CodecError;
use crate::types::Address;

/// Operations accepted by a collection contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionOp {
    /// Deploys item `index` with `amount` attached and its individual content
    DeployItem {
        query_id: u64,
        index: u64,
        amount: u128,
        content: Vec<u8>,
    },
    ChangeOwner {
        query_id: u64,
        new_owner: Address,
    },
}

impl CollectionOp {
    pub const DEPLOY_ITEM: u32 = 1;
    pub const CHANGE_OWNER: u32 = 3;

    pub fn query_id(&self) -> u64 {
        match self {
            CollectionOp::DeployItem { query_id, .. } | CollectionOp::ChangeOwner { query_id, .. } => {
                *query_id
            }
        }
    }
}

impl OpCodec for CollectionOp {
    fn encode(&self) -> Vec<u8> {
        match self {
            CollectionOp::DeployItem {
                query_id,
                index,
                amount,
                content,
            } => {
                let mut writer = Writer::new(Self::DEPLOY_ITEM);
                writer.u64(*query_id);
                writer.u64(*index);
                writer.amount(*amount);
                writer.bytes(content);
                writer.finish()
            }
            CollectionOp::ChangeOwner {
                query_id,
                new_owner,
            } => {
                let mut writer = Writer::new(Self::CHANGE_OWNER);
                writer.u64(*query_id);
                writer.address(Some(*new_owner));
                writer.finish()
            }
        }
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = Reader::new(bytes);
        let op = match reader.u32("discriminator")? {
            Self::DEPLOY_ITEM => CollectionOp::DeployItem {
                query_id: reader.u64("query_id")?,
                index: reader.u64("index")?,
                amount: reader.amount("amount")?,
                content: reader.bytes("content")?,
            },
            Self::CHANGE_OWNER => CollectionOp::ChangeOwner {
                query_id: reader.u64("query_id")?,
                new_owner: reader
                    .address("new_owner")?
                    .ok_or(CodecError::InvalidTag {
                        field: "new_owner",
                        tag: 0,
                    })?,
            },
            found => {
                return Err(CodecError::UnknownDiscriminator {
                    family: "collection",
                    found,
                })
            }
        };
        reader.finish()?;
        Ok(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    #[test]
    fn test_deploy_item() {
        let op = CollectionOp::DeployItem {
            query_id: 7,
            index: 3,
            amount: 50_000_000,
            content: b"3.json".to_vec(),
        };
        let bytes = op.encode();
        assert_eq!(&bytes[..4], &1u32.to_be_bytes());
        assert_eq!(CollectionOp::decode(&bytes), Ok(op));
    }

    #[test]
    fn test_change_owner_requires_an_owner() {
        let op = CollectionOp::ChangeOwner {
            query_id: 9,
            new_owner: Address::new(0, B256::repeat_byte(5)),
        };
        let mut bytes = op.encode();
        assert_eq!(op.query_id(), 9);
        assert_eq!(CollectionOp::decode(&bytes), Ok(op));

        // Replace the address with the empty tag
        bytes.truncate(12);
        bytes.push(0);
        assert!(matches!(
            CollectionOp::decode(&bytes),
            Err(CodecError::InvalidTag { field: "new_owner", .. })
        ));
    }

    #[test]
    fn test_empty_input_is_truncated() {
        assert!(matches!(
            CollectionOp::decode(&[]),
            Err(CodecError::Truncated { field: "discriminator", needed: 4, remaining: 0 })
        ));
    }
}
