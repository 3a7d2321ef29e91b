use mac_address::MacAddress;

pub mod arp;
pub mod ethernet;

/// Build a mac address from exactly 6 bytes
#[inline]
pub(crate) fn mac(data: &[u8]) -> MacAddress {
    let mut bytes = [0u8; 6];
    bytes.copy_from_slice(&data[..6]);
    MacAddress::new(bytes)
}
