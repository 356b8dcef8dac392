// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Binary codec for the ledger operations the marketplace recognises.
//!
//! Every operation starts with a 32-bit big-endian discriminator selecting
//! the variant, followed by that variant's fixed field layout:
//!
//! | field kind | encoding                                                      |
//! |------------|---------------------------------------------------------------|
//! | `u64`      | 8 bytes big-endian                                            |
//! | address    | tag `0` (none) or tag `1`, workchain `i32` BE, 32-byte hash   |
//! | amount     | 1 length byte (`0..=16`), then that many big-endian bytes      |
//! | bytes      | `u32` BE length, then the bytes                               |
//! | optional   | tag `0` (none) or tag `1` followed by the value               |
//!
//! The codec is separate from the caching layer; it is used to work out
//! which addresses an operation mentions.

use alloy_primitives::B256;

use crate::errors::CodecError;
use crate::types::Address;

mod collection;
mod item;

pub use collection::CollectionOp;
pub use item::{ItemOp, TransferOp};

/// A closed family of tagged binary operations
pub trait OpCodec: Sized {
    fn encode(&self) -> Vec<u8>;

    /// Decodes exactly one operation; trailing bytes are an error.
    fn decode(bytes: &[u8]) -> Result<Self, CodecError>;
}

#[derive(Debug, Default)]
pub(crate) struct Writer {
    buffer: Vec<u8>,
}

impl Writer {
    pub(crate) fn new(discriminator: u32) -> Self {
        let mut writer = Self::default();
        writer.u32(discriminator);
        writer
    }

    pub(crate) fn u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub(crate) fn u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub(crate) fn address(&mut self, address: Option<Address>) {
        match address {
            None => self.buffer.push(0),
            Some(address) => {
                self.buffer.push(1);
                self.buffer
                    .extend_from_slice(&address.workchain().to_be_bytes());
                self.buffer.extend_from_slice(address.hash().as_slice());
            }
        }
    }

    /// Minimal big-endian form
    pub(crate) fn amount(&mut self, value: u128) {
        let bytes = value.to_be_bytes();
        let skip = bytes.iter().take_while(|byte| **byte == 0).count();
        self.buffer.push((bytes.len() - skip) as u8);
        self.buffer.extend_from_slice(&bytes[skip..]);
    }

    pub(crate) fn bytes(&mut self, value: &[u8]) {
        self.u32(value.len() as u32);
        self.buffer.extend_from_slice(value);
    }

    pub(crate) fn optional_bytes(&mut self, value: Option<&[u8]>) {
        match value {
            None => self.buffer.push(0),
            Some(value) => {
                self.buffer.push(1);
                self.bytes(value);
            }
        }
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.buffer
    }
}

pub(crate) struct Reader<'a> {
    remaining: &'a [u8],
}

impl<'a> Reader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { remaining: bytes }
    }

    fn take(&mut self, field: &'static str, needed: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining.len() < needed {
            return Err(CodecError::Truncated {
                field,
                needed,
                remaining: self.remaining.len(),
            });
        }
        let (head, tail) = self.remaining.split_at(needed);
        self.remaining = tail;
        Ok(head)
    }

    fn array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], CodecError> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.take(field, N)?);
        Ok(array)
    }

    fn tag(&mut self, field: &'static str) -> Result<bool, CodecError> {
        match self.array::<1>(field)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            tag => Err(CodecError::InvalidTag { field, tag }),
        }
    }

    pub(crate) fn u32(&mut self, field: &'static str) -> Result<u32, CodecError> {
        self.array(field).map(u32::from_be_bytes)
    }

    pub(crate) fn u64(&mut self, field: &'static str) -> Result<u64, CodecError> {
        self.array(field).map(u64::from_be_bytes)
    }

    pub(crate) fn address(&mut self, field: &'static str) -> Result<Option<Address>, CodecError> {
        if !self.tag(field)? {
            return Ok(None);
        }
        let workchain = i32::from_be_bytes(self.array(field)?);
        let hash = B256::from(self.array::<32>(field)?);
        Ok(Some(Address::new(workchain, hash)))
    }

    pub(crate) fn amount(&mut self, field: &'static str) -> Result<u128, CodecError> {
        let length = usize::from(self.array::<1>(field)?[0]);
        if length > 16 {
            return Err(CodecError::AmountTooLong { length });
        }
        let mut padded = [0u8; 16];
        padded[16 - length..].copy_from_slice(self.take(field, length)?);
        Ok(u128::from_be_bytes(padded))
    }

    pub(crate) fn bytes(&mut self, field: &'static str) -> Result<Vec<u8>, CodecError> {
        let length = self.u32(field)? as usize;
        self.take(field, length).map(<[u8]>::to_vec)
    }

    pub(crate) fn optional_bytes(&mut self, field: &'static str) -> Result<Option<Vec<u8>>, CodecError> {
        if self.tag(field)? {
            self.bytes(field).map(Some)
        } else {
            Ok(None)
        }
    }

    pub(crate) fn finish(self) -> Result<(), CodecError> {
        if self.remaining.is_empty() {
            Ok(())
        } else {
            Err(CodecError::TrailingBytes {
                count: self.remaining.len(),
            })
        }
    }
}
