use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use bytes::Bytes;
use mac_address::MacAddress;
use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u8};
use nom::sequence::tuple;
use num_traits::FromPrimitive;

use super::mac;
use crate::dissectors::{Error, EtherType, IResult, Layer, LayerType};

/// Length of the fixed part of an ARP message
pub const FIXED_LEN: usize = 8;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Primitive)]
#[repr(u16)]
pub enum ArpHardware {
    Ethernet = 1,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Primitive)]
#[repr(u16)]
pub enum ArpOperation {
    Request = 1,
    Reply = 2,
}

/// ARP message, address lengths are driven by `hlen` and `plen`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Arp {
    pub htype: u16,
    pub ptype: u16,
    pub hlen: u8,
    pub plen: u8,
    pub oper: u16,
    pub src_hw: Bytes,
    pub src_ip: IpAddr,
    pub dst_hw: Bytes,
    pub dst_ip: IpAddr,
    contents: Bytes,
    payload: Bytes,
}

impl Arp {
    pub fn hardware(&self) -> Option<ArpHardware> {
        ArpHardware::from_u16(self.htype)
    }

    pub fn protocol(&self) -> Option<EtherType> {
        EtherType::from_u16(self.ptype)
    }

    pub fn operation(&self) -> Option<ArpOperation> {
        ArpOperation::from_u16(self.oper)
    }

    /// Get the sender's mac address, None unless hardware addresses are 6 bytes
    pub fn sender_mac(&self) -> Option<MacAddress> {
        match self.src_hw.len() {
            6 => Some(mac(&self.src_hw)),
            _ => None,
        }
    }

    /// Get the target's mac address, None unless hardware addresses are 6 bytes
    pub fn target_mac(&self) -> Option<MacAddress> {
        match self.dst_hw.len() {
            6 => Some(mac(&self.dst_hw)),
            _ => None,
        }
    }

    /// Get the number of bytes the message claims for itself
    #[inline]
    pub fn message_len(&self) -> usize {
        message_len(self.hlen, self.plen)
    }
}

impl Layer for Arp {
    fn layer_type(&self) -> LayerType {
        LayerType::ARP
    }

    fn contents(&self) -> &[u8] {
        &self.contents
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }
}

#[inline]
fn message_len(hlen: u8, plen: u8) -> usize {
    FIXED_LEN + 2 * hlen as usize + 2 * plen as usize
}

fn ip_from_slice(data: &[u8]) -> Option<IpAddr> {
    match data.len() {
        4 => {
            let mut octets = [0u8; 4];
            octets.copy_from_slice(data);
            Some(IpAddr::V4(Ipv4Addr::from(octets)))
        }
        16 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(data);
            Some(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        _ => None,
    }
}

fn fixed(data: &[u8]) -> IResult<'_, (u16, u16, u8, u8, u16)> {
    tuple((be_u16, be_u16, be_u8, be_u8, be_u16))(data)
}

fn addresses(data: &[u8], hlen: usize, plen: usize) -> IResult<'_, (&[u8], &[u8], &[u8], &[u8])> {
    tuple((take(hlen), take(plen), take(hlen), take(plen)))(data)
}

pub fn dissect(data: &Bytes) -> Result<Arp, Error> {
    if data.len() < FIXED_LEN {
        return Err(Error::PacketTooShort(LayerType::ARP, data.len()));
    }

    let (remain, (htype, ptype, hlen, plen, oper)) = fixed(data)?;
    let len = message_len(hlen, plen);
    if data.len() < len {
        return Err(Error::InvalidLength(len, data.len()));
    }

    let (_, (src_hw, src_ip, dst_hw, dst_ip)) = addresses(remain, hlen as usize, plen as usize)?;
    let src_ip =
        ip_from_slice(src_ip).ok_or(Error::InvalidAddress("Invalid ARP source protocol address"))?;
    let dst_ip = ip_from_slice(dst_ip)
        .ok_or(Error::InvalidAddress("Invalid ARP destination protocol address"))?;

    Ok(Arp {
        htype,
        ptype,
        hlen,
        plen,
        oper,
        src_hw: data.slice_ref(src_hw),
        src_ip,
        dst_hw: data.slice_ref(dst_hw),
        dst_ip,
        contents: data.clone(),
        payload: data.slice(len..),
    })
}
