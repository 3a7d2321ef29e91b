//! Decoded protocol layers share nothing but a view of the bytes they came from:
//! the full slice a layer consumed and the suffix it hands over to the next layer.

#[repr(u8)]
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Primitive, strum::Display)]
/// Layer type collection, 1 byte
pub enum LayerType {
    #[strum(serialize = "unknown")]
    UNKNOWN = 0,
    #[strum(serialize = "ethernet")]
    ETHERNET = 1,
    #[strum(serialize = "ipv4")]
    IPV4 = 2,
    #[strum(serialize = "arp")]
    ARP = 3,
}

impl Default for LayerType {
    fn default() -> Self {
        LayerType::UNKNOWN
    }
}

pub trait Layer {
    /// Get this layer's type
    fn layer_type(&self) -> LayerType;

    /// Get every byte this layer was decoded from, header and payload
    fn contents(&self) -> &[u8];

    /// Get the bytes handed over to the next layer, always a suffix of `contents`
    fn payload(&self) -> &[u8];

    /// Get this layer's header length
    #[inline]
    fn header_len(&self) -> usize {
        self.contents().len() - self.payload().len()
    }

    /// Get this layer's header bytes
    #[inline]
    fn header(&self) -> &[u8] {
        &self.contents()[..self.header_len()]
    }
}

#[cfg(test)]
mod tests {
    use num_traits::FromPrimitive;

    use super::*;

    struct Fixed {
        raw: Vec<u8>,
        hdr_len: usize,
    }

    impl Layer for Fixed {
        fn layer_type(&self) -> LayerType {
            LayerType::UNKNOWN
        }

        fn contents(&self) -> &[u8] {
            &self.raw
        }

        fn payload(&self) -> &[u8] {
            &self.raw[self.hdr_len..]
        }
    }

    #[test]
    fn header_is_contents_minus_payload() {
        let layer = Fixed {
            raw: vec![1, 2, 3, 4, 5],
            hdr_len: 2,
        };
        assert_eq!(layer.header_len(), 2);
        assert_eq!(layer.header(), &[1, 2]);
        assert_eq!(layer.payload(), &[3, 4, 5]);
    }

    #[test]
    fn layer_type_from_raw() {
        assert_eq!(LayerType::from_u8(3), Some(LayerType::ARP));
        assert_eq!(LayerType::from_u8(9), None);
        assert_eq!(LayerType::IPV4.to_string(), "ipv4");
    }
}
