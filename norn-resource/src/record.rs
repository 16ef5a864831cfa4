//! Decoded form of the record set committed for a top-level label.
//!
//! The on-chain serialization is a version byte followed by records,
//! each a one-byte type tag and a type-specific payload. The decode is
//! total: either the whole byte string parses or the resource is
//! rejected, nothing partial ever escapes.

use crate::pointer;
use crate::reader::Cursor;
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Record cap, fixed by the serialization format.
pub const MAX_RECORDS: usize = 255;

/// Longest stored text field.
const MAX_TEXT: usize = 255;

/// Longest label field (stored dot-terminated).
const MAX_LABEL: usize = 32;

/// Longest digest, fingerprint, certificate or hash field.
const MAX_DIGEST: usize = 64;

#[derive(Debug, PartialEq, Eq)]
pub enum DecodeError {
    Truncated,
    PointerLoop,
    BadLabelLength(u8),
    BadCharacter(u8),
    NameTooLong,
    FieldTooLong,
    BadVersion(u8),
    UnknownTag(u8),
    UnknownTargetKind(u8),
    TooManyRecords,
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncated => write!(f, "unexpected end of resource"),
            Self::PointerLoop => write!(f, "compression pointer loop"),
            Self::BadLabelLength(len) => write!(f, "invalid label length {len}"),
            Self::BadCharacter(ch) => write!(f, "invalid character {ch:#04x}"),
            Self::NameTooLong => write!(f, "name exceeds 255 bytes"),
            Self::FieldTooLong => write!(f, "field exceeds its cap"),
            Self::BadVersion(version) => write!(f, "unsupported resource version {version}"),
            Self::UnknownTag(tag) => write!(f, "unknown record type {tag}"),
            Self::UnknownTargetKind(kind) => write!(f, "unknown target kind {kind}"),
            Self::TooManyRecords => write!(f, "more than {MAX_RECORDS} records"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Record type tags. The wire byte values are part of the consensus
/// format and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    Inet4 = 1,
    Inet6 = 2,
    Onion = 3,
    OnionNg = 4,
    Name = 5,
    Glue = 6,
    Canonical = 7,
    Delegate = 8,
    Ns = 9,
    Service = 10,
    Url = 11,
    Email = 12,
    Text = 13,
    Location = 14,
    Magnet = 15,
    Ds = 16,
    Tls = 17,
    Ssh = 18,
    Pgp = 19,
    Addr = 20,
    Extra = 255,
}

/// A polymorphic destination reference: a name, a name with inline
/// glue, a raw address, or an onion key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Name(String),
    Glue {
        name: String,
        inet4: Ipv4Addr,
        inet6: Ipv6Addr,
    },
    Inet4(Ipv4Addr),
    Inet6(Ipv6Addr),
    Onion([u8; 33]),
    OnionNg([u8; 33]),
}

impl Target {
    fn read(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let kind = cursor.read_u8()?;
        match kind {
            1 => Ok(Self::Inet4(read_inet4(cursor)?)),
            2 => Ok(Self::Inet6(read_inet6(cursor)?)),
            3 => Ok(Self::Onion(read_onion(cursor)?)),
            4 => Ok(Self::OnionNg(read_onion(cursor)?)),
            5 => Ok(Self::Name(cursor.read_name()?)),
            6 => Ok(Self::Glue {
                name: cursor.read_name()?,
                inet4: read_inet4(cursor)?,
                inet6: read_inet6(cursor)?,
            }),
            other => Err(DecodeError::UnknownTargetKind(other)),
        }
    }

    /// Resolve the target into a hostname usable in an RDATA field.
    /// Raw addresses become synthetic pointer labels under the TLD of
    /// the queried name; onion targets have no DNS form.
    pub fn to_dns(&self, name: &str) -> Option<String> {
        match self {
            Self::Name(host) | Self::Glue { name: host, .. } => Some(host.clone()),
            Self::Inet4(ip) => synth_host(IpAddr::V4(*ip), name),
            Self::Inet6(ip) => synth_host(IpAddr::V6(*ip), name),
            Self::Onion(_) | Self::OnionNg(_) => None,
        }
    }
}

fn synth_host(ip: IpAddr, name: &str) -> Option<String> {
    let tld = norn_proto::name::label_from(name, -1)?;
    let encoded = pointer::ip_to_b32(&ip);
    Some(format!("_{encoded}.{tld}."))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Inet4(Ipv4Addr),
    Inet6(Ipv6Addr),
    Onion([u8; 33]),
    OnionNg([u8; 33]),
    Name(String),
    Glue {
        name: String,
        inet4: Ipv4Addr,
        inet6: Ipv6Addr,
    },
    Canonical(Target),
    Delegate(Target),
    Ns(Target),
    Service {
        service: String,
        protocol: String,
        priority: u8,
        weight: u8,
        target: Target,
        port: u16,
    },
    Url(String),
    Email(String),
    Text(String),
    Location {
        version: u8,
        size: u8,
        horiz_pre: u8,
        vert_pre: u8,
        latitude: u32,
        longitude: u32,
        altitude: u32,
    },
    Magnet {
        nid: String,
        nin: Vec<u8>,
    },
    Ds {
        key_tag: u16,
        algorithm: u8,
        digest_type: u8,
        digest: Vec<u8>,
    },
    Tls {
        protocol: String,
        port: u16,
        usage: u8,
        selector: u8,
        matching_type: u8,
        certificate: Vec<u8>,
    },
    Ssh {
        algorithm: u8,
        key_type: u8,
        fingerprint: Vec<u8>,
    },
    Pgp {
        algorithm: u8,
        key_type: u8,
        fingerprint: Vec<u8>,
    },
    Addr {
        currency: String,
        address: String,
        ctype: u8,
        testnet: bool,
        version: u8,
        hash: Vec<u8>,
    },
    Extra {
        rtype: u8,
        data: Vec<u8>,
    },
}

impl Record {
    pub fn tag(&self) -> Tag {
        match self {
            Self::Inet4(_) => Tag::Inet4,
            Self::Inet6(_) => Tag::Inet6,
            Self::Onion(_) => Tag::Onion,
            Self::OnionNg(_) => Tag::OnionNg,
            Self::Name(_) => Tag::Name,
            Self::Glue { .. } => Tag::Glue,
            Self::Canonical(_) => Tag::Canonical,
            Self::Delegate(_) => Tag::Delegate,
            Self::Ns(_) => Tag::Ns,
            Self::Service { .. } => Tag::Service,
            Self::Url(_) => Tag::Url,
            Self::Email(_) => Tag::Email,
            Self::Text(_) => Tag::Text,
            Self::Location { .. } => Tag::Location,
            Self::Magnet { .. } => Tag::Magnet,
            Self::Ds { .. } => Tag::Ds,
            Self::Tls { .. } => Tag::Tls,
            Self::Ssh { .. } => Tag::Ssh,
            Self::Pgp { .. } => Tag::Pgp,
            Self::Addr { .. } => Tag::Addr,
            Self::Extra { .. } => Tag::Extra,
        }
    }

    fn read(tag: u8, cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        match tag {
            1 => Ok(Self::Inet4(read_inet4(cursor)?)),
            2 => Ok(Self::Inet6(read_inet6(cursor)?)),
            3 => Ok(Self::Onion(read_onion(cursor)?)),
            4 => Ok(Self::OnionNg(read_onion(cursor)?)),
            5 => Ok(Self::Name(cursor.read_name()?)),
            6 => Ok(Self::Glue {
                name: cursor.read_name()?,
                inet4: read_inet4(cursor)?,
                inet6: read_inet6(cursor)?,
            }),
            7 => Ok(Self::Canonical(Target::read(cursor)?)),
            8 => Ok(Self::Delegate(Target::read(cursor)?)),
            9 => Ok(Self::Ns(Target::read(cursor)?)),
            10 => Ok(Self::Service {
                service: read_label(cursor)?,
                protocol: read_label(cursor)?,
                priority: cursor.read_u8()?,
                weight: cursor.read_u8()?,
                target: Target::read(cursor)?,
                port: cursor.read_u16()?,
            }),
            11 => Ok(Self::Url(read_text(cursor)?)),
            12 => Ok(Self::Email(read_text(cursor)?)),
            13 => Ok(Self::Text(read_text(cursor)?)),
            14 => Ok(Self::Location {
                version: cursor.read_u8()?,
                size: cursor.read_u8()?,
                horiz_pre: cursor.read_u8()?,
                vert_pre: cursor.read_u8()?,
                latitude: cursor.read_u32()?,
                longitude: cursor.read_u32()?,
                altitude: cursor.read_u32()?,
            }),
            15 => Ok(Self::Magnet {
                nid: read_label(cursor)?,
                nin: cursor.read_sized(MAX_DIGEST)?.to_vec(),
            }),
            16 => Ok(Self::Ds {
                key_tag: cursor.read_u16()?,
                algorithm: cursor.read_u8()?,
                digest_type: cursor.read_u8()?,
                digest: cursor.read_sized(MAX_DIGEST)?.to_vec(),
            }),
            17 => Ok(Self::Tls {
                protocol: read_label(cursor)?,
                port: cursor.read_u16()?,
                usage: cursor.read_u8()?,
                selector: cursor.read_u8()?,
                matching_type: cursor.read_u8()?,
                certificate: cursor.read_sized(MAX_DIGEST)?.to_vec(),
            }),
            18 => Ok(Self::Ssh {
                algorithm: cursor.read_u8()?,
                key_type: cursor.read_u8()?,
                fingerprint: cursor.read_sized(MAX_DIGEST)?.to_vec(),
            }),
            19 => Ok(Self::Pgp {
                algorithm: cursor.read_u8()?,
                key_type: cursor.read_u8()?,
                fingerprint: cursor.read_sized(MAX_DIGEST)?.to_vec(),
            }),
            20 => Ok(Self::Addr {
                currency: read_label(cursor)?,
                address: read_text(cursor)?,
                ctype: cursor.read_u8()?,
                testnet: cursor.read_u8()? != 0,
                version: cursor.read_u8()?,
                hash: cursor.read_sized(MAX_DIGEST)?.to_vec(),
            }),
            255 => Ok(Self::Extra {
                rtype: cursor.read_u8()?,
                data: cursor.read_sized(MAX_TEXT)?.to_vec(),
            }),
            other => Err(DecodeError::UnknownTag(other)),
        }
    }
}

fn read_inet4(cursor: &mut Cursor<'_>) -> Result<Ipv4Addr, DecodeError> {
    let octets: [u8; 4] = cursor
        .read_bytes(4)?
        .try_into()
        .map_err(|_| DecodeError::Truncated)?;
    Ok(Ipv4Addr::from(octets))
}

fn read_inet6(cursor: &mut Cursor<'_>) -> Result<Ipv6Addr, DecodeError> {
    let octets: [u8; 16] = cursor
        .read_bytes(16)?
        .try_into()
        .map_err(|_| DecodeError::Truncated)?;
    Ok(Ipv6Addr::from(octets))
}

fn read_onion(cursor: &mut Cursor<'_>) -> Result<[u8; 33], DecodeError> {
    cursor
        .read_bytes(33)?
        .try_into()
        .map_err(|_| DecodeError::Truncated)
}

/// Printable ASCII; tab, line feed and carriage return stay valid, DEL
/// and everything else rejects the resource.
fn check_text(chunk: &[u8]) -> Result<(), DecodeError> {
    for ch in chunk {
        if *ch == 0x7f || *ch >= 0x80 || (*ch < 0x20 && !matches!(*ch, 0x09 | 0x0a | 0x0d)) {
            return Err(DecodeError::BadCharacter(*ch));
        }
    }
    Ok(())
}

fn read_text(cursor: &mut Cursor<'_>) -> Result<String, DecodeError> {
    let chunk = cursor.read_sized(MAX_TEXT)?;
    check_text(chunk)?;
    Ok(chunk.iter().map(|ch| *ch as char).collect())
}

/// A single bare label, stored dot-terminated so it compares directly
/// against service names such as `smtp.`.
fn read_label(cursor: &mut Cursor<'_>) -> Result<String, DecodeError> {
    let chunk = cursor.read_sized(MAX_LABEL)?;
    check_text(chunk)?;
    let mut label: String = chunk.iter().map(|ch| *ch as char).collect();
    label.push('.');
    Ok(label)
}

/// The decoded record set for one top-level label. Read-only once
/// decoded; every emitted RR inherits `ttl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub version: u8,
    pub ttl: u32,
    records: Vec<Record>,
}

impl Resource {
    /// Decode a raw resource. Total: any malformed, unknown or
    /// over-cap content rejects the whole value.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut cursor = Cursor::new(data);

        let version = cursor.read_u8()?;
        if version != 0 {
            return Err(DecodeError::BadVersion(version));
        }

        let mut records = Vec::new();
        while !cursor.is_empty() {
            let tag = cursor.read_u8()?;
            let record = Record::read(tag, &mut cursor)?;
            if records.len() == MAX_RECORDS {
                return Err(DecodeError::TooManyRecords);
            }
            records.push(record);
        }

        Ok(Self {
            version,
            ttl: crate::DEFAULT_TTL,
            records,
        })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// First record of the given type, in insertion order.
    pub fn get(&self, tag: Tag) -> Option<&Record> {
        self.records.iter().find(|record| record.tag() == tag)
    }

    pub fn has(&self, tag: Tag) -> bool {
        self.get(tag).is_some()
    }

    /// Whether any record delegates to a name server, whatever the
    /// shape of its target.
    pub fn has_ns(&self) -> bool {
        self.has(Tag::Ns)
    }
}

#[cfg(test)]
mod tests {
    use super::{DecodeError, Record, Resource, Tag, Target};
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn should_decode_empty_resource() {
        let resource = Resource::decode(&[0x00]).unwrap();
        assert_eq!(resource.version, 0);
        assert_eq!(resource.ttl, crate::DEFAULT_TTL);
        assert!(resource.records().is_empty());
    }

    #[test]
    fn should_reject_empty_input() {
        assert_eq!(Resource::decode(&[]).unwrap_err(), DecodeError::Truncated);
    }

    #[test]
    fn should_reject_future_version() {
        assert_eq!(
            Resource::decode(&[0x01]).unwrap_err(),
            DecodeError::BadVersion(1)
        );
    }

    #[test]
    fn should_decode_inet4_record() {
        let resource = Resource::decode(&[0x00, 0x01, 0xc0, 0x00, 0x02, 0x01]).unwrap();
        assert_eq!(
            resource.records(),
            &[Record::Inet4(Ipv4Addr::new(192, 0, 2, 1))]
        );
        assert!(resource.has(Tag::Inet4));
        assert!(!resource.has(Tag::Inet6));
    }

    #[test]
    fn should_reject_truncated_inet4_record() {
        assert_eq!(
            Resource::decode(&[0x00, 0x01, 0xc0, 0x00]).unwrap_err(),
            DecodeError::Truncated
        );
    }

    #[test]
    fn should_reject_unknown_tag() {
        assert_eq!(
            Resource::decode(&[0x00, 0x63]).unwrap_err(),
            DecodeError::UnknownTag(0x63)
        );
    }

    #[test]
    fn should_decode_ns_record_with_name_target() {
        let mut data = vec![0x00, 0x09, 0x05];
        data.extend_from_slice(b"\x03ns1\x07example\x00");
        let resource = Resource::decode(&data).unwrap();
        assert_eq!(
            resource.records(),
            &[Record::Ns(Target::Name("ns1.example.".into()))]
        );
        assert!(resource.has_ns());
    }

    #[test]
    fn should_decode_glue_target_with_compression() {
        // A NAME record followed by an NS record whose glue target
        // points back into the first name.
        let mut data = vec![0x00, 0x05];
        data.extend_from_slice(b"\x03www\x05alice\x00"); // offset 2
        data.extend_from_slice(&[0x09, 0x06]);
        data.extend_from_slice(b"\x03ns1\xc0\x06"); // pointer to "alice."
        data.extend_from_slice(&[198, 51, 100, 7]);
        data.extend_from_slice(&[0u8; 16]);

        let resource = Resource::decode(&data).unwrap();
        assert_eq!(resource.records().len(), 2);
        assert_eq!(
            resource.records()[1],
            Record::Ns(Target::Glue {
                name: "ns1.alice.".into(),
                inet4: Ipv4Addr::new(198, 51, 100, 7),
                inet6: Ipv6Addr::UNSPECIFIED,
            })
        );
    }

    #[test]
    fn should_decode_service_record() {
        let mut data = vec![0x00, 0x0a];
        data.extend_from_slice(b"\x04smtp");
        data.extend_from_slice(b"\x03tcp");
        data.extend_from_slice(&[10, 0]);
        data.extend_from_slice(b"\x05\x04mail\x05alice\x00");
        data.extend_from_slice(&[0x00, 0x19]);

        let resource = Resource::decode(&data).unwrap();
        assert_eq!(
            resource.records(),
            &[Record::Service {
                service: "smtp.".into(),
                protocol: "tcp.".into(),
                priority: 10,
                weight: 0,
                target: Target::Name("mail.alice.".into()),
                port: 25,
            }]
        );
    }

    #[test]
    fn should_decode_text_record() {
        let resource = Resource::decode(b"\x00\x0d\x05hello").unwrap();
        assert_eq!(resource.records(), &[Record::Text("hello".into())]);
    }

    #[test]
    fn should_reject_del_in_text() {
        assert_eq!(
            Resource::decode(b"\x00\x0d\x03he\x7f").unwrap_err(),
            DecodeError::BadCharacter(0x7f)
        );
    }

    #[test]
    fn should_accept_tab_in_text() {
        let resource = Resource::decode(b"\x00\x0d\x03he\x09").unwrap();
        assert_eq!(resource.records(), &[Record::Text("he\t".into())]);
    }

    #[test]
    fn should_reject_oversized_digest() {
        let mut data = vec![0x00, 0x10, 0x30, 0x39, 0x0d, 0x02, 0x41];
        data.extend_from_slice(&[0u8; 65]);
        assert_eq!(
            Resource::decode(&data).unwrap_err(),
            DecodeError::FieldTooLong
        );
    }

    #[test]
    fn should_decode_ds_record() {
        let mut data = vec![0x00, 0x10, 0x30, 0x39, 0x0d, 0x02, 0x20];
        data.extend_from_slice(&[0u8; 32]);
        let resource = Resource::decode(&data).unwrap();
        assert_eq!(
            resource.records(),
            &[Record::Ds {
                key_tag: 12345,
                algorithm: 13,
                digest_type: 2,
                digest: vec![0u8; 32],
            }]
        );
    }

    #[test]
    fn should_reject_overflowing_record_list() {
        // 256 TEXT records of one empty string each.
        let mut data = vec![0x00];
        for _ in 0..256 {
            data.extend_from_slice(&[0x0d, 0x00]);
        }
        assert_eq!(
            Resource::decode(&data).unwrap_err(),
            DecodeError::TooManyRecords
        );
    }

    #[test]
    fn should_keep_insertion_order() {
        let resource = Resource::decode(b"\x00\x0d\x01a\x0b\x01b\x0d\x01c").unwrap();
        assert_eq!(
            resource.records(),
            &[
                Record::Text("a".into()),
                Record::Url("b".into()),
                Record::Text("c".into()),
            ]
        );
        assert_eq!(resource.get(Tag::Text), Some(&Record::Text("a".into())));
    }

    #[test]
    fn should_resolve_targets_to_hosts() {
        let target = Target::Name("mail.alice.".into());
        assert_eq!(target.to_dns("alice."), Some("mail.alice.".into()));

        let target = Target::Inet4(Ipv4Addr::new(198, 51, 100, 7));
        let host = target.to_dns("sub.alice.").unwrap();
        assert!(host.starts_with('_'));
        assert!(host.ends_with(".alice."));
        assert_eq!(
            crate::pointer::pointer_to_ip(&host),
            Some(std::net::IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7)))
        );

        let target = Target::Onion([0u8; 33]);
        assert_eq!(target.to_dns("alice."), None);
    }
}
