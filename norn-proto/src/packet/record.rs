use super::QueryType;
use crate::buffer::reader::ReaderError;
use crate::buffer::writer::WriterError;
use crate::buffer::BytePacketBuffer;
use std::net::{Ipv4Addr, Ipv6Addr};

/// RDATA for every record type the resolver can emit. Names embedded in
/// RDATA are stored fully qualified and written without compression so
/// that the wire form matches the canonical form covered by signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Ns {
        host: String,
    },
    Cname {
        target: String,
    },
    Dname {
        target: String,
    },
    Mx {
        preference: u16,
        exchange: String,
    },
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
    /// A single character-string of at most 255 bytes.
    Txt {
        data: Vec<u8>,
    },
    Loc {
        version: u8,
        size: u8,
        horiz_pre: u8,
        vert_pre: u8,
        latitude: u32,
        longitude: u32,
        altitude: u32,
    },
    Ds {
        key_tag: u16,
        algorithm: u8,
        digest_type: u8,
        digest: Vec<u8>,
    },
    Sshfp {
        algorithm: u8,
        digest_type: u8,
        fingerprint: Vec<u8>,
    },
    Uri {
        priority: u16,
        weight: u16,
        target: Vec<u8>,
    },
    Rp {
        mbox: String,
        txt: String,
    },
    Soa {
        ns: String,
        mbox: String,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minttl: u32,
    },
    /// `type_map` carries the whole bitmap field, window headers included.
    Nsec {
        next_domain: String,
        type_map: Vec<u8>,
    },
    Dnskey {
        flags: u16,
        protocol: u8,
        algorithm: u8,
        public_key: Vec<u8>,
    },
    Rrsig {
        type_covered: u16,
        algorithm: u8,
        labels: u8,
        orig_ttl: u32,
        expiration: u32,
        inception: u32,
        key_tag: u16,
        signer_name: String,
        signature: Vec<u8>,
    },
    /// EDNS pseudo-record. The requestor payload size rides in the class
    /// field and the extended flags in the ttl field, so `Record::write`
    /// treats this variant specially.
    Opt {
        udp_size: u16,
        ext_rcode: u8,
        version: u8,
        dnssec_ok: bool,
        data: Vec<u8>,
    },
    Unknown {
        qtype: u16,
        data: Vec<u8>,
    },
}

impl RData {
    pub fn rrtype(&self) -> QueryType {
        match self {
            Self::A(_) => QueryType::A,
            Self::Aaaa(_) => QueryType::AAAA,
            Self::Ns { .. } => QueryType::NS,
            Self::Cname { .. } => QueryType::CNAME,
            Self::Dname { .. } => QueryType::DNAME,
            Self::Mx { .. } => QueryType::MX,
            Self::Srv { .. } => QueryType::SRV,
            Self::Txt { .. } => QueryType::TXT,
            Self::Loc { .. } => QueryType::LOC,
            Self::Ds { .. } => QueryType::DS,
            Self::Sshfp { .. } => QueryType::SSHFP,
            Self::Uri { .. } => QueryType::URI,
            Self::Rp { .. } => QueryType::RP,
            Self::Soa { .. } => QueryType::SOA,
            Self::Nsec { .. } => QueryType::NSEC,
            Self::Dnskey { .. } => QueryType::DNSKEY,
            Self::Rrsig { .. } => QueryType::RRSIG,
            Self::Opt { .. } => QueryType::OPT,
            Self::Unknown { qtype, .. } => QueryType::from_num(*qtype),
        }
    }

    /// Write the RDATA portion only.
    pub fn write(&self, buffer: &mut BytePacketBuffer) -> Result<(), WriterError> {
        match self {
            Self::A(addr) => buffer.write_bytes(&addr.octets()),
            Self::Aaaa(addr) => buffer.write_bytes(&addr.octets()),
            Self::Ns { host } => buffer.write_qname_raw(host),
            Self::Cname { target } => buffer.write_qname_raw(target),
            Self::Dname { target } => buffer.write_qname_raw(target),
            Self::Mx {
                preference,
                exchange,
            } => {
                buffer.write_u16(*preference)?;
                buffer.write_qname_raw(exchange)
            }
            Self::Srv {
                priority,
                weight,
                port,
                target,
            } => {
                buffer.write_u16(*priority)?;
                buffer.write_u16(*weight)?;
                buffer.write_u16(*port)?;
                buffer.write_qname_raw(target)
            }
            Self::Txt { data } => {
                buffer.write_u8(data.len() as u8)?;
                buffer.write_bytes(data)
            }
            Self::Loc {
                version,
                size,
                horiz_pre,
                vert_pre,
                latitude,
                longitude,
                altitude,
            } => {
                buffer.write_u8(*version)?;
                buffer.write_u8(*size)?;
                buffer.write_u8(*horiz_pre)?;
                buffer.write_u8(*vert_pre)?;
                buffer.write_u32(*latitude)?;
                buffer.write_u32(*longitude)?;
                buffer.write_u32(*altitude)
            }
            Self::Ds {
                key_tag,
                algorithm,
                digest_type,
                digest,
            } => {
                buffer.write_u16(*key_tag)?;
                buffer.write_u8(*algorithm)?;
                buffer.write_u8(*digest_type)?;
                buffer.write_bytes(digest)
            }
            Self::Sshfp {
                algorithm,
                digest_type,
                fingerprint,
            } => {
                buffer.write_u8(*algorithm)?;
                buffer.write_u8(*digest_type)?;
                buffer.write_bytes(fingerprint)
            }
            Self::Uri {
                priority,
                weight,
                target,
            } => {
                buffer.write_u16(*priority)?;
                buffer.write_u16(*weight)?;
                buffer.write_bytes(target)
            }
            Self::Rp { mbox, txt } => {
                buffer.write_qname_raw(mbox)?;
                buffer.write_qname_raw(txt)
            }
            Self::Soa {
                ns,
                mbox,
                serial,
                refresh,
                retry,
                expire,
                minttl,
            } => {
                buffer.write_qname_raw(ns)?;
                buffer.write_qname_raw(mbox)?;
                buffer.write_u32(*serial)?;
                buffer.write_u32(*refresh)?;
                buffer.write_u32(*retry)?;
                buffer.write_u32(*expire)?;
                buffer.write_u32(*minttl)
            }
            Self::Nsec {
                next_domain,
                type_map,
            } => {
                buffer.write_qname_raw(next_domain)?;
                buffer.write_bytes(type_map)
            }
            Self::Dnskey {
                flags,
                protocol,
                algorithm,
                public_key,
            } => {
                buffer.write_u16(*flags)?;
                buffer.write_u8(*protocol)?;
                buffer.write_u8(*algorithm)?;
                buffer.write_bytes(public_key)
            }
            Self::Rrsig {
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
                buffer.write_u16(*type_covered)?;
                buffer.write_u8(*algorithm)?;
                buffer.write_u8(*labels)?;
                buffer.write_u32(*orig_ttl)?;
                buffer.write_u32(*expiration)?;
                buffer.write_u32(*inception)?;
                buffer.write_u16(*key_tag)?;
                buffer.write_qname_raw(signer_name)?;
                buffer.write_bytes(signature)
            }
            Self::Opt { data, .. } => buffer.write_bytes(data),
            Self::Unknown { data, .. } => buffer.write_bytes(data),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Owner name, fully qualified.
    pub name: String,
    pub ttl: u32,
    pub data: RData,
}

impl Record {
    pub fn new(name: String, ttl: u32, data: RData) -> Self {
        Self { name, ttl, data }
    }

    pub fn rrtype(&self) -> QueryType {
        self.data.rrtype()
    }

    pub fn read(buffer: &mut BytePacketBuffer) -> Result<Record, ReaderError> {
        let name = buffer.read_qname()?;
        let qtype_num = buffer.read_u16()?;
        let qtype = QueryType::from_num(qtype_num);

        if qtype == QueryType::OPT {
            let udp_size = buffer.read_u16()?;
            let flags = buffer.read_u32()?;
            let data_len = buffer.read_u16()?;
            let data = buffer.read_range(data_len as usize)?;

            return Ok(Record {
                name,
                ttl: 0,
                data: RData::Opt {
                    udp_size,
                    ext_rcode: (flags >> 24) as u8,
                    version: (flags >> 16) as u8,
                    dnssec_ok: (flags & 0x8000) > 0,
                    data,
                },
            });
        }

        let _qclass = buffer.read_u16()?;
        let ttl = buffer.read_u32()?;
        let data_len = buffer.read_u16()?;
        let end = buffer.pos() + data_len as usize;

        let data = match qtype {
            QueryType::A => {
                let octets = buffer.read_range(4)?;
                RData::A(Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]))
            }
            QueryType::AAAA => {
                let octets: [u8; 16] = buffer
                    .read_range(16)?
                    .try_into()
                    .map_err(|_| ReaderError::EndOfBuffer)?;
                RData::Aaaa(Ipv6Addr::from(octets))
            }
            QueryType::NS => RData::Ns {
                host: buffer.read_qname()?,
            },
            QueryType::CNAME => RData::Cname {
                target: buffer.read_qname()?,
            },
            QueryType::DNAME => RData::Dname {
                target: buffer.read_qname()?,
            },
            QueryType::MX => RData::Mx {
                preference: buffer.read_u16()?,
                exchange: buffer.read_qname()?,
            },
            QueryType::SRV => RData::Srv {
                priority: buffer.read_u16()?,
                weight: buffer.read_u16()?,
                port: buffer.read_u16()?,
                target: buffer.read_qname()?,
            },
            QueryType::TXT => {
                let size = buffer.read()?;
                RData::Txt {
                    data: buffer.read_range(size as usize)?,
                }
            }
            QueryType::LOC => RData::Loc {
                version: buffer.read()?,
                size: buffer.read()?,
                horiz_pre: buffer.read()?,
                vert_pre: buffer.read()?,
                latitude: buffer.read_u32()?,
                longitude: buffer.read_u32()?,
                altitude: buffer.read_u32()?,
            },
            QueryType::DS => RData::Ds {
                key_tag: buffer.read_u16()?,
                algorithm: buffer.read()?,
                digest_type: buffer.read()?,
                digest: buffer.read_range(end.saturating_sub(buffer.pos()))?,
            },
            QueryType::SSHFP => RData::Sshfp {
                algorithm: buffer.read()?,
                digest_type: buffer.read()?,
                fingerprint: buffer.read_range(end.saturating_sub(buffer.pos()))?,
            },
            QueryType::URI => RData::Uri {
                priority: buffer.read_u16()?,
                weight: buffer.read_u16()?,
                target: buffer.read_range(end.saturating_sub(buffer.pos()))?,
            },
            QueryType::RP => RData::Rp {
                mbox: buffer.read_qname()?,
                txt: buffer.read_qname()?,
            },
            QueryType::SOA => RData::Soa {
                ns: buffer.read_qname()?,
                mbox: buffer.read_qname()?,
                serial: buffer.read_u32()?,
                refresh: buffer.read_u32()?,
                retry: buffer.read_u32()?,
                expire: buffer.read_u32()?,
                minttl: buffer.read_u32()?,
            },
            QueryType::NSEC => {
                let next_domain = buffer.read_qname()?;
                RData::Nsec {
                    type_map: buffer.read_range(end.saturating_sub(buffer.pos()))?,
                    next_domain,
                }
            }
            QueryType::DNSKEY => RData::Dnskey {
                flags: buffer.read_u16()?,
                protocol: buffer.read()?,
                algorithm: buffer.read()?,
                public_key: buffer.read_range(end.saturating_sub(buffer.pos()))?,
            },
            QueryType::RRSIG => {
                let type_covered = buffer.read_u16()?;
                let algorithm = buffer.read()?;
                let labels = buffer.read()?;
                let orig_ttl = buffer.read_u32()?;
                let expiration = buffer.read_u32()?;
                let inception = buffer.read_u32()?;
                let key_tag = buffer.read_u16()?;
                let signer_name = buffer.read_qname()?;
                RData::Rrsig {
                    type_covered,
                    algorithm,
                    labels,
                    orig_ttl,
                    expiration,
                    inception,
                    key_tag,
                    signer_name,
                    signature: buffer.read_range(end.saturating_sub(buffer.pos()))?,
                }
            }
            _ => RData::Unknown {
                qtype: qtype_num,
                data: buffer.read_range(data_len as usize)?,
            },
        };

        if buffer.pos() != end {
            return Err(ReaderError::BadRdataLength(data_len));
        }

        Ok(Record { name, ttl, data })
    }

    pub fn write(&self, buffer: &mut BytePacketBuffer) -> Result<usize, WriterError> {
        let start_pos = buffer.pos();

        if let RData::Opt {
            udp_size,
            ext_rcode,
            version,
            dnssec_ok,
            data,
        } = &self.data
        {
            buffer.write_qname(".")?;
            buffer.write_u16(QueryType::OPT.to_num())?;
            buffer.write_u16(*udp_size)?;
            buffer.write_u32(
                ((*ext_rcode as u32) << 24)
                    | ((*version as u32) << 16)
                    | ((*dnssec_ok as u32) << 15),
            )?;
            buffer.write_u16(data.len() as u16)?;
            buffer.write_bytes(data)?;

            return Ok(buffer.pos() - start_pos);
        }

        buffer.write_qname(&self.name)?;
        buffer.write_u16(self.rrtype().to_num())?;
        buffer.write_u16(super::question::DnsClass::Internet as u16)?;
        buffer.write_u32(self.ttl)?;

        let pos = buffer.pos();
        buffer.write_u16(0)?;

        self.data.write(buffer)?;

        let size = buffer.pos() - (pos + 2);
        buffer.set_u16(pos, size as u16)?;

        Ok(buffer.pos() - start_pos)
    }
}

#[cfg(test)]
mod tests {
    use super::{RData, Record};
    use crate::buffer::BytePacketBuffer;
    use std::net::Ipv6Addr;

    fn roundtrip(record: Record) -> Record {
        let mut buffer = BytePacketBuffer::default();
        record.write(&mut buffer).unwrap();
        buffer.pos = 0;
        Record::read(&mut buffer).unwrap()
    }

    #[test]
    fn should_roundtrip_aaaa_record() {
        let record = Record::new(
            "alice.".into(),
            21600,
            RData::Aaaa(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1)),
        );
        assert_eq!(roundtrip(record.clone()), record);
    }

    #[test]
    fn should_roundtrip_mx_record() {
        let record = Record::new(
            "alice.".into(),
            21600,
            RData::Mx {
                preference: 10,
                exchange: "mail.alice.".into(),
            },
        );
        assert_eq!(roundtrip(record.clone()), record);
    }

    #[test]
    fn should_roundtrip_soa_record() {
        let record = Record::new(
            ".".into(),
            86400,
            RData::Soa {
                ns: ".".into(),
                mbox: ".".into(),
                serial: 2023052011,
                refresh: 1800,
                retry: 900,
                expire: 604800,
                minttl: 86400,
            },
        );
        assert_eq!(roundtrip(record.clone()), record);
    }

    #[test]
    fn should_roundtrip_nsec_record() {
        let record = Record::new(
            ".".into(),
            86400,
            RData::Nsec {
                next_domain: ".".into(),
                type_map: vec![0x00, 0x07, 0x22, 0x00, 0x00, 0x00, 0x00, 0x03, 0x80],
            },
        );
        assert_eq!(roundtrip(record.clone()), record);
    }

    #[test]
    fn should_roundtrip_rrsig_record() {
        let record = Record::new(
            "alice.".into(),
            21600,
            RData::Rrsig {
                type_covered: 1,
                algorithm: 13,
                labels: 1,
                orig_ttl: 21600,
                expiration: 1700000000,
                inception: 1690000000,
                key_tag: 12345,
                signer_name: ".".into(),
                signature: vec![0xab; 64],
            },
        );
        assert_eq!(roundtrip(record.clone()), record);
    }

    #[test]
    fn should_roundtrip_opt_record() {
        let record = Record::new(
            ".".into(),
            0,
            RData::Opt {
                udp_size: 4096,
                ext_rcode: 0,
                version: 0,
                dnssec_ok: true,
                data: Vec::new(),
            },
        );
        assert_eq!(roundtrip(record.clone()), record);
    }

    #[test]
    fn should_roundtrip_uri_record() {
        let record = Record::new(
            "alice.".into(),
            21600,
            RData::Uri {
                priority: 0,
                weight: 0,
                target: b"https://example.com/".to_vec(),
            },
        );
        assert_eq!(roundtrip(record.clone()), record);
    }

    #[test]
    fn should_skip_unknown_record() {
        let record = Record::new(
            "alice.".into(),
            300,
            RData::Unknown {
                qtype: 99,
                data: vec![1, 2, 3],
            },
        );
        assert_eq!(roundtrip(record.clone()), record);
    }
}
