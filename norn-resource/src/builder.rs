//! Section builders: each scans the resource records and appends the
//! matching RRs to a destination section. Records whose target cannot
//! be expressed for the RRtype at hand are skipped silently, a partial
//! valid answer beats no answer.

use crate::pointer;
use crate::record::{Record, Resource, Tag, Target};
use chrono::{DateTime, Datelike, Timelike, Utc};
use norn_proto::packet::record::{RData, Record as DnsRecord};
use norn_proto::packet::QueryType;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// TTL on the root zone NS record and its address glue.
pub const ROOT_NS_TTL: u32 = 518400;

/// TTL on the root SOA and on every NSEC proof.
pub const ROOT_SOA_TTL: u32 = 86400;

/// NSEC bitmap of the root: NS, SOA, RRSIG, NSEC, DNSKEY.
const ROOT_TYPE_MAP: [u8; 9] = [0x00, 0x07, 0x22, 0x00, 0x00, 0x00, 0x00, 0x03, 0x80];

pub fn to_a(res: &Resource, name: &str, section: &mut Vec<DnsRecord>) {
    for record in res.records() {
        if let Record::Inet4(addr) = record {
            section.push(DnsRecord::new(name.to_string(), res.ttl, RData::A(*addr)));
        }
    }
}

pub fn to_aaaa(res: &Resource, name: &str, section: &mut Vec<DnsRecord>) {
    for record in res.records() {
        if let Record::Inet6(addr) = record {
            section.push(DnsRecord::new(name.to_string(), res.ttl, RData::Aaaa(*addr)));
        }
    }
}

pub fn to_cname(res: &Resource, name: &str, section: &mut Vec<DnsRecord>) {
    for record in res.records() {
        let Record::Canonical(target) = record else {
            continue;
        };
        if !matches!(target, Target::Name(_) | Target::Glue { .. }) {
            continue;
        }
        let Some(host) = target.to_dns(name) else {
            continue;
        };
        section.push(DnsRecord::new(
            name.to_string(),
            res.ttl,
            RData::Cname { target: host },
        ));
    }
}

pub fn to_dname(res: &Resource, name: &str, section: &mut Vec<DnsRecord>) {
    for record in res.records() {
        let Record::Delegate(target) = record else {
            continue;
        };
        if !matches!(target, Target::Name(_) | Target::Glue { .. }) {
            continue;
        }
        let Some(host) = target.to_dns(name) else {
            continue;
        };
        section.push(DnsRecord::new(
            name.to_string(),
            res.ttl,
            RData::Dname { target: host },
        ));
    }
}

pub fn to_ns(res: &Resource, name: &str, section: &mut Vec<DnsRecord>) {
    for record in res.records() {
        let Record::Ns(target) = record else {
            continue;
        };

        let host = match target {
            // Raw addresses only carry data for the additional section.
            // The NS name is computed on the fly by encoding the IP into
            // base32 under the magic pseudo-TLD, which this resolver can
            // answer for directly.
            Target::Inet4(ip) => format!("_{}._synth.", pointer::ip_to_b32(&IpAddr::V4(*ip))),
            Target::Inet6(ip) => format!("_{}._synth.", pointer::ip_to_b32(&IpAddr::V6(*ip))),
            // NS and glue targets have the name ready to go.
            Target::Name(host) | Target::Glue { name: host, .. } => host.clone(),
            Target::Onion(_) | Target::OnionNg(_) => continue,
        };

        section.push(DnsRecord::new(
            name.to_string(),
            res.ttl,
            RData::Ns { host },
        ));
    }
}

/// Address records for name servers that are raw addresses, owned by
/// their synthetic pointer name.
pub fn to_nsip(res: &Resource, name: &str, section: &mut Vec<DnsRecord>) {
    for record in res.records() {
        let Record::Ns(target) = record else {
            continue;
        };
        push_target_ip(target, name, res.ttl, section);
    }
}

fn push_target_ip(target: &Target, name: &str, ttl: u32, section: &mut Vec<DnsRecord>) {
    let data = match target {
        Target::Inet4(ip) => RData::A(*ip),
        Target::Inet6(ip) => RData::Aaaa(*ip),
        _ => return,
    };
    let Some(owner) = target.to_dns(name) else {
        return;
    };
    section.push(DnsRecord::new(owner, ttl, data));
}

fn is_smtp(service: &str, protocol: &str) -> bool {
    service.eq_ignore_ascii_case("smtp.") && protocol.eq_ignore_ascii_case("tcp.")
}

pub fn to_mx(res: &Resource, name: &str, section: &mut Vec<DnsRecord>) {
    for record in res.records() {
        let Record::Service {
            service,
            protocol,
            priority,
            target,
            ..
        } = record
        else {
            continue;
        };
        if !is_smtp(service, protocol) {
            continue;
        }
        let Some(host) = target.to_dns(name) else {
            continue;
        };
        section.push(DnsRecord::new(
            name.to_string(),
            res.ttl,
            RData::Mx {
                preference: *priority as u16,
                exchange: host,
            },
        ));
    }
}

pub fn to_mxip(res: &Resource, name: &str, section: &mut Vec<DnsRecord>) {
    to_srvip(res, name, "smtp.", "tcp.", section);
}

pub fn to_srv(
    res: &Resource,
    name: &str,
    service: &str,
    protocol: &str,
    section: &mut Vec<DnsRecord>,
) {
    for record in res.records() {
        let Record::Service {
            service: svc,
            protocol: proto,
            priority,
            weight,
            target,
            port,
        } = record
        else {
            continue;
        };
        if !svc.eq_ignore_ascii_case(service) || !proto.eq_ignore_ascii_case(protocol) {
            continue;
        }
        let Some(host) = target.to_dns(name) else {
            continue;
        };
        section.push(DnsRecord::new(
            name.to_string(),
            res.ttl,
            RData::Srv {
                priority: *priority as u16,
                weight: *weight as u16,
                port: *port,
                target: host,
            },
        ));
    }
}

/// Address records for matching service targets that are raw addresses,
/// owned by their synthetic pointer name.
pub fn to_srvip(
    res: &Resource,
    name: &str,
    service: &str,
    protocol: &str,
    section: &mut Vec<DnsRecord>,
) {
    for record in res.records() {
        let Record::Service {
            service: svc,
            protocol: proto,
            target,
            ..
        } = record
        else {
            continue;
        };
        if !svc.eq_ignore_ascii_case(service) || !proto.eq_ignore_ascii_case(protocol) {
            continue;
        }
        push_target_ip(target, name, res.ttl, section);
    }
}

pub fn to_txt(res: &Resource, name: &str, section: &mut Vec<DnsRecord>) {
    for record in res.records() {
        if let Record::Text(text) = record {
            section.push(DnsRecord::new(
                name.to_string(),
                res.ttl,
                RData::Txt {
                    data: text.as_bytes().to_vec(),
                },
            ));
        }
    }
}

pub fn to_loc(res: &Resource, name: &str, section: &mut Vec<DnsRecord>) {
    for record in res.records() {
        let Record::Location {
            version,
            size,
            horiz_pre,
            vert_pre,
            latitude,
            longitude,
            altitude,
        } = record
        else {
            continue;
        };
        section.push(DnsRecord::new(
            name.to_string(),
            res.ttl,
            RData::Loc {
                version: *version,
                size: *size,
                horiz_pre: *horiz_pre,
                vert_pre: *vert_pre,
                latitude: *latitude,
                longitude: *longitude,
                altitude: *altitude,
            },
        ));
    }
}

pub fn to_ds(res: &Resource, name: &str, section: &mut Vec<DnsRecord>) {
    for record in res.records() {
        let Record::Ds {
            key_tag,
            algorithm,
            digest_type,
            digest,
        } = record
        else {
            continue;
        };
        section.push(DnsRecord::new(
            name.to_string(),
            res.ttl,
            RData::Ds {
                key_tag: *key_tag,
                algorithm: *algorithm,
                digest_type: *digest_type,
                digest: digest.clone(),
            },
        ));
    }
}

pub fn to_sshfp(res: &Resource, name: &str, section: &mut Vec<DnsRecord>) {
    for record in res.records() {
        let Record::Ssh {
            algorithm,
            key_type,
            fingerprint,
        } = record
        else {
            continue;
        };
        section.push(DnsRecord::new(
            name.to_string(),
            res.ttl,
            RData::Sshfp {
                algorithm: *algorithm,
                digest_type: *key_type,
                fingerprint: fingerprint.clone(),
            },
        ));
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn push_uri(name: &str, ttl: u32, target: Vec<u8>, section: &mut Vec<DnsRecord>) {
    section.push(DnsRecord::new(
        name.to_string(),
        ttl,
        RData::Uri {
            priority: 0,
            weight: 0,
            target,
        },
    ));
}

pub fn to_uri(res: &Resource, name: &str, section: &mut Vec<DnsRecord>) {
    for record in res.records() {
        if let Record::Url(text) = record {
            push_uri(name, res.ttl, text.as_bytes().to_vec(), section);
        }
    }

    for record in res.records() {
        let Record::Magnet { nid, nin } = record else {
            continue;
        };
        let Some(nid) = norn_proto::name::label_get(nid) else {
            continue;
        };
        let rendered = format!(
            "magnet:?xt=urn:{}:{}",
            nid.to_ascii_lowercase(),
            hex_encode(nin)
        );
        if rendered.len() + 1 > 255 {
            continue;
        }
        push_uri(name, res.ttl, rendered.into_bytes(), section);
    }

    for record in res.records() {
        let Record::Addr {
            currency,
            address,
            ctype,
            hash,
            ..
        } = record
        else {
            continue;
        };
        if *ctype != 0 && *ctype != 3 {
            continue;
        }
        let Some(currency) = norn_proto::name::label_get(currency) else {
            continue;
        };
        let addr = if *ctype == 0 {
            address.clone()
        } else {
            format!("0x{}", hex_encode(hash))
        };
        let rendered = format!("{}:{}", currency.to_ascii_lowercase(), addr);
        if rendered.len() + 1 > 255 {
            continue;
        }
        push_uri(name, res.ttl, rendered.into_bytes(), section);
    }
}

pub fn to_rp(res: &Resource, name: &str, section: &mut Vec<DnsRecord>) {
    for record in res.records() {
        let Record::Email(text) = record else {
            continue;
        };
        if text.len() > 63 {
            continue;
        }
        let mbox = format!("{text}.");
        if !norn_proto::name::verify(&mbox) {
            continue;
        }
        section.push(DnsRecord::new(
            name.to_string(),
            res.ttl,
            RData::Rp {
                mbox,
                txt: String::from("."),
            },
        ));
    }
}

/// Inline glue for records of the type that owns the given RRtype:
/// address records owned by the glue name, one per non-zero family.
pub fn to_glue(res: &Resource, rrtype: QueryType, section: &mut Vec<DnsRecord>) {
    for record in res.records() {
        let target = match record {
            Record::Canonical(target) if rrtype == QueryType::CNAME => target,
            Record::Delegate(target) if rrtype == QueryType::DNAME => target,
            Record::Ns(target) if rrtype == QueryType::NS => target,
            Record::Service {
                service,
                protocol,
                target,
                ..
            } if rrtype == QueryType::SRV
                || (rrtype == QueryType::MX && is_smtp(service, protocol)) =>
            {
                target
            }
            _ => continue,
        };

        let Target::Glue { name, inet4, inet6 } = target else {
            continue;
        };

        if *inet4 != Ipv4Addr::UNSPECIFIED {
            section.push(DnsRecord::new(name.clone(), res.ttl, RData::A(*inet4)));
        }
        if *inet6 != Ipv6Addr::UNSPECIFIED {
            section.push(DnsRecord::new(name.clone(), res.ttl, RData::Aaaa(*inet6)));
        }
    }
}

/// An NSEC denying every type at `name`, the owner of an empty proof.
pub fn to_empty(name: &str, type_map: &[u8], section: &mut Vec<DnsRecord>) {
    section.push(DnsRecord::new(
        name.to_string(),
        ROOT_SOA_TTL,
        RData::Nsec {
            next_domain: String::from("."),
            type_map: type_map.to_vec(),
        },
    ));
}

/// `YYYYMMDDHH` from the UTC clock.
pub fn soa_serial(now: DateTime<Utc>) -> u32 {
    now.year() as u32 * 1_000_000 + now.month() * 10_000 + now.day() * 100 + now.hour()
}

pub fn root_to_soa(section: &mut Vec<DnsRecord>, now: DateTime<Utc>) {
    section.push(DnsRecord::new(
        String::from("."),
        ROOT_SOA_TTL,
        RData::Soa {
            ns: String::from("."),
            mbox: String::from("."),
            serial: soa_serial(now),
            refresh: 1800,
            retry: 900,
            expire: 604800,
            minttl: 86400,
        },
    ));
}

pub fn root_to_ns(section: &mut Vec<DnsRecord>) {
    section.push(DnsRecord::new(
        String::from("."),
        ROOT_NS_TTL,
        RData::Ns {
            host: String::from("."),
        },
    ));
}

pub fn root_to_a(section: &mut Vec<DnsRecord>, addr: Option<IpAddr>) {
    if let Some(IpAddr::V4(ip)) = addr {
        section.push(DnsRecord::new(String::from("."), ROOT_NS_TTL, RData::A(ip)));
    }
}

pub fn root_to_aaaa(section: &mut Vec<DnsRecord>, addr: Option<IpAddr>) {
    if let Some(IpAddr::V6(ip)) = addr {
        section.push(DnsRecord::new(
            String::from("."),
            ROOT_NS_TTL,
            RData::Aaaa(ip),
        ));
    }
}

pub fn root_to_dnskey(section: &mut Vec<DnsRecord>) {
    section.push(norn_dnssec::ksk());
    section.push(norn_dnssec::zsk());
}

pub fn root_to_ds(section: &mut Vec<DnsRecord>) {
    section.push(norn_dnssec::ds());
}

/// The root's own NSEC: an empty proof whose bitmap shows exactly the
/// types the root zone signs.
pub fn root_to_nsec(section: &mut Vec<DnsRecord>) {
    to_empty(".", &ROOT_TYPE_MAP, section);
}
