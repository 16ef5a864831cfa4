//! Inline signing for the synthesized root zone.
//!
//! The resolver acts as the authoritative server for the whole namespace,
//! so it carries its own zone and key signing keys. The keys are well
//! known: clients validate against a pinned trust anchor, not against the
//! ICANN root. Key material is derived once at first use and immutable
//! afterwards; concurrent readers are safe.

use chrono::Utc;
use norn_proto::buffer::{BytePacketBuffer, WriterError};
use norn_proto::packet::record::{RData, Record};
use norn_proto::packet::QueryType;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

/// ECDSAP256SHA256
pub const ALGORITHM: u8 = 13;
/// SHA-256
pub const DIGEST_TYPE: u8 = 2;
/// TTL on DNSKEY and DS records of the root.
pub const KEY_TTL: u32 = 86400;

const FLAG_ZONE: u16 = 0x0100;
const FLAG_SEP: u16 = 0x0001;
const DNSKEY_PROTOCOL: u8 = 3;

/// Signatures are valid two weeks forward from the most recent UTC
/// midnight and one day backward, so re-signing the same records within
/// a day produces identical output.
const VALIDITY_WINDOW: u32 = 14 * 86400;
const INCEPTION_SKEW: u32 = 86400;

const ZSK_SECRET: [u8; 32] = [
    0x8b, 0x14, 0xbd, 0xa5, 0x37, 0x78, 0xe8, 0x0d, //
    0x27, 0x90, 0x0e, 0x1c, 0x62, 0xa9, 0x56, 0x3f, //
    0x71, 0x45, 0xbe, 0x33, 0x5a, 0x0f, 0xd1, 0x84, //
    0x29, 0xe6, 0x7c, 0x0a, 0x93, 0x5d, 0xf2, 0x61,
];

const KSK_SECRET: [u8; 32] = [
    0x4f, 0xe3, 0x12, 0x9f, 0x76, 0x0b, 0xca, 0x58, //
    0x33, 0x61, 0xf8, 0x2d, 0x14, 0x5e, 0xbb, 0x09, //
    0xc0, 0x97, 0x28, 0x4d, 0x6e, 0xa1, 0x05, 0xf3, //
    0x8a, 0x1c, 0xd9, 0x47, 0x30, 0xb2, 0x66, 0x15,
];

struct KeyPair {
    key: SigningKey,
    record: Record,
    tag: u16,
}

struct Keys {
    zsk: KeyPair,
    ksk: KeyPair,
    ds: Record,
}

static KEYS: OnceLock<Keys> = OnceLock::new();

fn dnskey_rdata(key: &SigningKey, flags: u16) -> RData {
    let point = key.verifying_key().to_encoded_point(false);
    RData::Dnskey {
        flags,
        protocol: DNSKEY_PROTOCOL,
        algorithm: ALGORITHM,
        // Drop the uncompressed-point marker, the wire format is x || y.
        public_key: point.as_bytes()[1..].to_vec(),
    }
}

/// RFC 4034 appendix B checksum over the DNSKEY RDATA.
fn compute_key_tag(rdata: &RData) -> Result<u16, WriterError> {
    let mut buffer = BytePacketBuffer::default();
    rdata.write(&mut buffer)?;

    let mut accumulator: u32 = 0;
    for (index, byte) in buffer.filled().iter().enumerate() {
        if index & 1 == 0 {
            accumulator += (*byte as u32) << 8;
        } else {
            accumulator += *byte as u32;
        }
    }
    accumulator += (accumulator >> 16) & 0xFFFF;

    Ok((accumulator & 0xFFFF) as u16)
}

fn key_pair(secret: &[u8; 32], flags: u16) -> KeyPair {
    let key = SigningKey::from_slice(secret).expect("embedded key material invalid");
    let rdata = dnskey_rdata(&key, flags);
    let tag = compute_key_tag(&rdata).expect("dnskey rdata never overflows a packet");
    let record = Record::new(String::from("."), KEY_TTL, rdata);

    KeyPair { key, record, tag }
}

fn ds_record(ksk: &KeyPair) -> Record {
    let mut buffer = BytePacketBuffer::default();
    // Digest input is the owner name in wire form followed by the RDATA;
    // the owner is the root, a single zero byte.
    buffer
        .write_u8(0)
        .expect("dnskey rdata never overflows a packet");
    ksk.record
        .data
        .write(&mut buffer)
        .expect("dnskey rdata never overflows a packet");

    let digest = Sha256::digest(buffer.filled());

    Record::new(
        String::from("."),
        KEY_TTL,
        RData::Ds {
            key_tag: ksk.tag,
            algorithm: ALGORITHM,
            digest_type: DIGEST_TYPE,
            digest: digest.to_vec(),
        },
    )
}

fn keys() -> &'static Keys {
    KEYS.get_or_init(|| {
        let zsk = key_pair(&ZSK_SECRET, FLAG_ZONE);
        let ksk = key_pair(&KSK_SECRET, FLAG_ZONE | FLAG_SEP);
        let ds = ds_record(&ksk);
        Keys { zsk, ksk, ds }
    })
}

/// The zone signing DNSKEY record.
pub fn zsk() -> Record {
    keys().zsk.record.clone()
}

/// The key signing DNSKEY record.
pub fn ksk() -> Record {
    keys().ksk.record.clone()
}

/// The DS record of the trust anchor, as a parent zone would publish it.
pub fn ds() -> Record {
    keys().ds.clone()
}

/// The canonical form covered by a signature: the RRSIG RDATA with an
/// empty signature field, then every record of the set with owner names
/// uncompressed and RDATAs in ascending byte order.
fn signing_data(prefix: &RData, rrset: &[&Record]) -> Result<Vec<u8>, WriterError> {
    let mut buffer = BytePacketBuffer::default();
    prefix.write(&mut buffer)?;

    let mut rdatas = Vec::with_capacity(rrset.len());
    for record in rrset {
        let mut rdata = BytePacketBuffer::default();
        record.data.write(&mut rdata)?;
        rdatas.push(rdata.filled().to_vec());
    }
    rdatas.sort();

    let owner = &rrset[0].name;
    let rrtype = rrset[0].rrtype().to_num();
    let ttl = rrset[0].ttl;

    for rdata in rdatas {
        buffer.write_qname_raw(owner)?;
        buffer.write_u16(rrtype)?;
        buffer.write_u16(norn_proto::packet::question::DnsClass::Internet as u16)?;
        buffer.write_u32(ttl)?;
        buffer.write_u16(rdata.len() as u16)?;
        buffer.write_bytes(&rdata)?;
    }

    Ok(buffer.filled().to_vec())
}

fn sign_section(
    section: &mut Vec<Record>,
    covered: QueryType,
    pair: &KeyPair,
) -> Result<(), WriterError> {
    let rrset: Vec<&Record> = section
        .iter()
        .filter(|record| record.rrtype() == covered)
        .collect();

    if rrset.is_empty() {
        return Ok(());
    }

    let owner = rrset[0].name.clone();
    let ttl = rrset[0].ttl;
    let labels = norn_proto::name::label_count(&owner) as u8;

    let now = Utc::now().timestamp() as u32;
    let midnight = now - (now % 86400);

    let prefix = RData::Rrsig {
        type_covered: covered.to_num(),
        algorithm: ALGORITHM,
        labels,
        orig_ttl: ttl,
        expiration: midnight + VALIDITY_WINDOW,
        inception: midnight - INCEPTION_SKEW,
        key_tag: pair.tag,
        signer_name: String::from("."),
        signature: Vec::new(),
    };

    let message = signing_data(&prefix, &rrset)?;
    let signature: Signature = pair.key.sign(&message);

    let data = match prefix {
        RData::Rrsig {
            type_covered,
            algorithm,
            labels,
            orig_ttl,
            expiration,
            inception,
            key_tag,
            signer_name,
            ..
        } => RData::Rrsig {
            type_covered,
            algorithm,
            labels,
            orig_ttl,
            expiration,
            inception,
            key_tag,
            signer_name,
            signature: signature.to_bytes().to_vec(),
        },
        _ => unreachable!(),
    };

    section.push(Record::new(owner, ttl, data));

    Ok(())
}

/// Append an RRSIG made with the zone signing key, covering every record
/// in `section` whose type is `covered`. Does nothing when the section
/// holds no such record.
pub fn sign_zsk(section: &mut Vec<Record>, covered: QueryType) -> Result<(), WriterError> {
    sign_section(section, covered, &keys().zsk)
}

/// Append an RRSIG made with the key signing key. Only DNSKEY sets are
/// ever signed this way.
pub fn sign_ksk(section: &mut Vec<Record>, covered: QueryType) -> Result<(), WriterError> {
    sign_section(section, covered, &keys().ksk)
}

#[cfg(test)]
mod tests {
    use norn_proto::packet::record::{RData, Record};
    use norn_proto::packet::QueryType;
    use p256::ecdsa::signature::Verifier;
    use p256::ecdsa::Signature;
    use std::net::Ipv4Addr;

    #[test]
    fn should_expose_zone_and_key_signing_keys() {
        let zsk = super::zsk();
        let ksk = super::ksk();

        let (zsk_flags, zsk_key) = match zsk.data {
            RData::Dnskey {
                flags, public_key, ..
            } => (flags, public_key),
            other => panic!("unexpected rdata {other:?}"),
        };
        let ksk_flags = match ksk.data {
            RData::Dnskey { flags, .. } => flags,
            other => panic!("unexpected rdata {other:?}"),
        };

        assert_eq!(zsk_flags, 256);
        assert_eq!(ksk_flags, 257);
        assert_eq!(zsk_key.len(), 64);
    }

    #[test]
    fn should_publish_matching_ds() {
        let ksk_tag = super::keys().ksk.tag;
        match super::ds().data {
            RData::Ds {
                key_tag,
                algorithm,
                digest_type,
                digest,
            } => {
                assert_eq!(key_tag, ksk_tag);
                assert_eq!(algorithm, super::ALGORITHM);
                assert_eq!(digest_type, super::DIGEST_TYPE);
                assert_eq!(digest.len(), 32);
            }
            other => panic!("unexpected rdata {other:?}"),
        }
    }

    #[test]
    fn should_skip_signing_an_empty_set() {
        let mut section = vec![Record::new(
            "alice.".into(),
            21600,
            RData::A(Ipv4Addr::new(192, 0, 2, 1)),
        )];
        super::sign_zsk(&mut section, QueryType::AAAA).unwrap();
        assert_eq!(section.len(), 1);
    }

    #[test]
    fn should_append_verifiable_rrsig() {
        let mut section = vec![
            Record::new("alice.".into(), 21600, RData::A(Ipv4Addr::new(192, 0, 2, 1))),
            Record::new("alice.".into(), 21600, RData::A(Ipv4Addr::new(192, 0, 2, 2))),
        ];
        super::sign_zsk(&mut section, QueryType::A).unwrap();

        assert_eq!(section.len(), 3);
        let rrsig = section.pop().unwrap();
        assert_eq!(rrsig.name, "alice.");

        let (prefix, signature) = match rrsig.data {
            RData::Rrsig {
                type_covered,
                algorithm,
                labels,
                orig_ttl,
                expiration,
                inception,
                key_tag,
                signer_name,
                signature,
            } => {
                assert_eq!(type_covered, QueryType::A.to_num());
                assert_eq!(algorithm, super::ALGORITHM);
                assert_eq!(labels, 1);
                assert_eq!(orig_ttl, 21600);
                assert_eq!(key_tag, super::keys().zsk.tag);
                assert_eq!(signer_name, ".");
                (
                    RData::Rrsig {
                        type_covered,
                        algorithm,
                        labels,
                        orig_ttl,
                        expiration,
                        inception,
                        key_tag,
                        signer_name,
                        signature: Vec::new(),
                    },
                    signature,
                )
            }
            other => panic!("unexpected rdata {other:?}"),
        };

        let rrset: Vec<&Record> = section.iter().collect();
        let message = super::signing_data(&prefix, &rrset).unwrap();
        let signature = Signature::from_slice(&signature).unwrap();
        super::keys()
            .zsk
            .key
            .verifying_key()
            .verify(&message, &signature)
            .unwrap();
    }

    #[test]
    fn should_sign_deterministically() {
        let section = || {
            vec![Record::new(
                "alice.".into(),
                21600,
                RData::A(Ipv4Addr::new(192, 0, 2, 1)),
            )]
        };
        let mut first = section();
        let mut second = section();
        super::sign_zsk(&mut first, QueryType::A).unwrap();
        super::sign_zsk(&mut second, QueryType::A).unwrap();
        assert_eq!(first, second);
    }
}
