use bytes::Bytes;
use mac_address::MacAddress;
use nom::bytes::complete::take;
use nom::number::complete::be_u16;
use nom::sequence::tuple;
use num_traits::FromPrimitive;

use super::mac;
use crate::dissectors::{Error, EtherType, EtherTypeRange, IResult, Layer, LayerType};

pub const HEADER_LEN: usize = 14;

/// Ethernet II frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ethernet {
    pub dst: MacAddress,
    pub src: MacAddress,
    pub etype: u16,
    contents: Bytes,
    payload: Bytes,
}

impl Ethernet {
    /// Get the ether type, None if there is no dissector for it
    pub fn ether_type(&self) -> Option<EtherType> {
        EtherType::from_u16(self.etype)
    }

    #[inline]
    pub fn payload_bytes(&self) -> &Bytes {
        &self.payload
    }
}

impl Layer for Ethernet {
    fn layer_type(&self) -> LayerType {
        LayerType::ETHERNET
    }

    fn contents(&self) -> &[u8] {
        &self.contents
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }
}

fn header(data: &[u8]) -> IResult<'_, (&[u8], &[u8], u16)> {
    tuple((take(6usize), take(6usize), be_u16))(data)
}

pub fn dissect(data: &Bytes, etypes: EtherTypeRange) -> Result<Ethernet, Error> {
    if data.len() < HEADER_LEN {
        return Err(Error::PacketTooShort(LayerType::ETHERNET, data.len()));
    }

    let (_, (dst, src, etype)) = header(data)?;
    if !etypes.contains(etype) {
        return Err(Error::UnknownEtype(etype));
    }

    Ok(Ethernet {
        dst: mac(dst),
        src: mac(src),
        etype,
        contents: data.clone(),
        payload: data.slice(HEADER_LEN..),
    })
}
