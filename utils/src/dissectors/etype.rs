/// ETHER TYPES
///
/// From Wireshark's etypes.h
/// https://github.com/wireshark/wireshark/blob/master/epan/etypes.h

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Primitive)]
#[repr(u16)]
pub enum EtherType {
    IPV4 = 0x0800,
    ARP = 0x0806,
    IPV6 = 0x86DD,
}

/// Inclusive range of ether type values an ethernet frame may carry
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct EtherTypeRange {
    pub min: u16,
    pub max: u16,
}

impl EtherTypeRange {
    /// Values below 0x0600 are IEEE 802.3 length fields, not ether types
    pub const IEEE_802_3: EtherTypeRange = EtherTypeRange {
        min: 0x0600,
        max: 0x86DD,
    };

    /// Accepts anything strictly above 0x07FF, the floor used by the packet decoder
    pub const ABOVE_0X07FF: EtherTypeRange = EtherTypeRange {
        min: 0x0800,
        max: 0x86DD,
    };

    /// Accepts anything strictly above 0x7FFF, the floor used by the frame decoder.
    /// Rejects IPv4 and ARP frames.
    pub const ABOVE_0X7FFF: EtherTypeRange = EtherTypeRange {
        min: 0x8000,
        max: 0x86DD,
    };

    pub const fn new(min: u16, max: u16) -> Self {
        EtherTypeRange { min, max }
    }

    #[inline]
    pub fn contains(&self, etype: u16) -> bool {
        etype >= self.min && etype <= self.max
    }
}

impl Default for EtherTypeRange {
    fn default() -> Self {
        Self::IEEE_802_3
    }
}
