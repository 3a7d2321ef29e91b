use std::net::Ipv4Addr;

use bytes::Bytes;
use nom::number::complete::{be_u16, be_u32, be_u8};
use nom::sequence::tuple;

use crate::dissectors::{Error, IResult, Layer, LayerType};

/// IPv4 header length without options
pub const HEADER_LEN: usize = 20;

pub const FLAG_DONT_FRAGMENT: u8 = 0b010;
pub const FLAG_MORE_FRAGMENTS: u8 = 0b001;

/// IPv4 header, options are not supported
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ipv4 {
    pub version: u8,
    /// Header length in 32 bit words
    pub ihl: u8,
    pub dscp: u8,
    pub ecn: u8,
    pub total_len: u16,
    pub id: u16,
    pub flags: u8,
    pub frag_offset: u16,
    pub ttl: u8,
    pub protocol: u8,
    /// Carried as is, never verified
    pub checksum: u16,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    contents: Bytes,
    payload: Bytes,
}

impl Ipv4 {
    #[inline]
    pub fn dont_fragment(&self) -> bool {
        self.flags & FLAG_DONT_FRAGMENT != 0
    }

    #[inline]
    pub fn more_fragments(&self) -> bool {
        self.flags & FLAG_MORE_FRAGMENTS != 0
    }
}

impl Layer for Ipv4 {
    fn layer_type(&self) -> LayerType {
        LayerType::IPV4
    }

    fn contents(&self) -> &[u8] {
        &self.contents
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }
}

#[allow(clippy::type_complexity)]
fn header(data: &[u8]) -> IResult<'_, (u8, u8, u16, u16, u16, u8, u8, u16, u32, u32)> {
    tuple((
        be_u8, be_u8, be_u16, be_u16, be_u16, be_u8, be_u8, be_u16, be_u32, be_u32,
    ))(data)
}

pub fn dissect(data: &Bytes) -> Result<Ipv4, Error> {
    if data.len() < HEADER_LEN {
        return Err(Error::PacketTooShort(LayerType::IPV4, data.len()));
    }

    let (_, (vhl, tos, total_len, id, flags_frag, ttl, protocol, checksum, src, dst)) =
        header(data)?;

    let version = vhl >> 4;
    if version != 4 {
        return Err(Error::UnsupportVersion(version));
    }

    let ihl = vhl & 0x0f;
    if ihl != 5 {
        return Err(Error::UnsupportOptions(ihl));
    }

    Ok(Ipv4 {
        version,
        ihl,
        dscp: tos >> 2,
        ecn: tos & 0x03,
        total_len,
        id,
        flags: (flags_frag >> 13) as u8,
        frag_offset: flags_frag & 0x1fff,
        ttl,
        protocol,
        checksum,
        src: Ipv4Addr::from(src),
        dst: Ipv4Addr::from(dst),
        contents: data.clone(),
        payload: data.slice(HEADER_LEN..),
    })
}
