// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

use super::{OpCodec, Reader, Writer};
use crate::errors::CodecError;
use crate::types::Address;

/// Ownership transfer of an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOp {
    pub query_id: u64,
    pub new_owner: Option<Address>,
    /// Receives the excess of the attached value
    pub response_destination: Option<Address>,
    pub custom_payload: Option<Vec<u8>>,
    /// Value forwarded to the new owner with the notification
    pub forward_amount: u128,
    pub forward_payload: Vec<u8>,
}

/// Operations accepted by an item contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOp {
    Transfer(TransferOp),
}

impl ItemOp {
    pub const TRANSFER: u32 = 0x5fcc3d14;

    /// Addresses the operation names, in field order
    pub fn touched_addresses(&self) -> Vec<Address> {
        match self {
            ItemOp::Transfer(transfer) => {
                let mut addresses: Vec<Address> = [transfer.new_owner, transfer.response_destination]
                    .into_iter()
                    .flatten()
                    .collect();
                addresses.dedup();
                addresses
            }
        }
    }
}

impl OpCodec for ItemOp {
    fn encode(&self) -> Vec<u8> {
        match self {
            ItemOp::Transfer(transfer) => {
                let mut writer = Writer::new(Self::TRANSFER);
                writer.u64(transfer.query_id);
                writer.address(transfer.new_owner);
                writer.address(transfer.response_destination);
                writer.optional_bytes(transfer.custom_payload.as_deref());
                writer.amount(transfer.forward_amount);
                writer.bytes(&transfer.forward_payload);
                writer.finish()
            }
        }
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = Reader::new(bytes);
        let op = match reader.u32("discriminator")? {
            Self::TRANSFER => ItemOp::Transfer(TransferOp {
                query_id: reader.u64("query_id")?,
                new_owner: reader.address("new_owner")?,
                response_destination: reader.address("response_destination")?,
                custom_payload: reader.optional_bytes("custom_payload")?,
                forward_amount: reader.amount("forward_amount")?,
                forward_payload: reader.bytes("forward_payload")?,
            }),
            found => {
                return Err(CodecError::UnknownDiscriminator {
                    family: "item",
                    found,
                })
            }
        };
        reader.finish()?;
        Ok(op)
    }
}
