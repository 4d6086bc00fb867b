/// Calculate the key tag for a DNSKEY record (RFC 4034 Appendix B)
pub fn calculate_key_tag(flags: u16, protocol: u8, algorithm: u8, public_key: &[u8]) -> u16 {
    // RSAMD5: most significant 16 of the least significant 24 bits of the
    // modulus (RFC 4034 B.1)
    if algorithm == 1 {
        let len = public_key.len();
        if len >= 3 {
            return u16::from_be_bytes([public_key[len - 3], public_key[len - 2]]);
        }
        return 0;
    }

    let header = [
        (flags >> 8) as u8,
        (flags & 0xFF) as u8,
        protocol,
        algorithm,
    ];
    let mut accumulator: u32 = 0;
    for (i, &byte) in header.iter().chain(public_key.iter()).enumerate() {
        if i % 2 == 0 {
            accumulator += u32::from(byte) << 8;
        } else {
            accumulator += u32::from(byte);
        }
    }

    accumulator += accumulator >> 16;
    (accumulator & 0xFFFF) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn test_key_tag_rfc4034_vector() {
        // RFC 4034 Appendix B.5 sample RSASHA1 key
        let public_key = hex::decode(
            "030101a80020a95566ba42e886bb804cda84e47ef56dbd7aec612615552cec906d3e9b72dc4f90d3fc09b8e9d0ff2ae8ee5ed8cd61d7622c39ee2d76a2153bc0ac8b9e254125c46e0a224507fb358d7f6b5d7a42f75e60b9748e7c0747e2447f4bd7d10ca24bb1498de34a504406bbeb3b041fe48d0ad2b1de5adadb87d0c8824e7cc4dc3e5b7f0b3e8ac72c3d3d8aa7251abcaad82ad5ececed8cd83825d19ffd95e93bca729fdd88901b20fc598fb6a0779ddfa95e3e42ca9d0a7739d3c4ad3a7a5a30b3c60a73a6f09fdb812746e0d69edfba06754465f2e1dd5e3802e6d05bd6148e38fd8ca1632b71f6559fe9b6e18d73c5a750e3e2f2f205972e7b28ae04ddae5e27915a08d217db5ce090c119d23f79fb"
        ).unwrap();
        assert_eq!(calculate_key_tag(0x0101, 3, 5, &public_key), 55495);
    }

    #[test]
    fn test_key_tag_root_ksk_2017() {
        let public_key = STANDARD
            .decode(super::super::trust_anchor::tests::ROOT_KSK_2017)
            .unwrap();
        assert_eq!(calculate_key_tag(257, 3, 8, &public_key), 20326);
    }

    #[test]
    fn test_key_tag_private_algorithm_keys() {
        // Keys used by test deployments: algorithm 253, empty or tiny key
        assert_eq!(calculate_key_tag(256, 3, 253, &[]), 1277);
        assert_eq!(calculate_key_tag(257, 3, 253, &[]), 1278);
        assert_eq!(calculate_key_tag(257, 3, 253, &[0x11, 0x11]), 5647);
    }

    #[test]
    fn test_key_tag_rsamd5() {
        assert_eq!(calculate_key_tag(0x0101, 3, 1, &[0x12, 0x34, 0x56, 0x78]), 0x3456);
        assert_eq!(calculate_key_tag(0x0101, 3, 1, &[0xAB, 0xCD, 0xEF]), 0xABCD);
        assert_eq!(calculate_key_tag(0x0101, 3, 1, &[0x12, 0x34]), 0);
    }
}
