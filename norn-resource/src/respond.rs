//! Turns a decoded resource and a question into a signed DNS message.
//!
//! Queries below a top-level name become referrals when the resource
//! delegates, authoritative answers when it matches, and signed empty
//! proofs otherwise. The root zone and the negative responses are
//! synthesized here as well, without any resource at all.

use crate::builder;
use crate::pointer;
use crate::record::{Resource, Tag};
use chrono::Utc;
use norn_proto::buffer::WriterError;
use norn_proto::name;
use norn_proto::packet::record::{RData, Record as DnsRecord};
use norn_proto::packet::{DnsPacket, QueryType};
use std::net::IpAddr;

/// Answer a query against the resource of a top-level label. `fqdn`
/// must be fully qualified, anything else is a programming error.
/// `None` means the caller should respond with SERVFAIL.
pub fn to_dns(res: &Resource, fqdn: &str, qtype: QueryType) -> Option<DnsPacket> {
    assert!(name::is_fqdn(fqdn));

    build(res, fqdn, qtype).ok()
}

fn build(res: &Resource, fqdn: &str, qtype: QueryType) -> Result<DnsPacket, BuildError> {
    let labels = name::label_count(fqdn);
    if labels == 0 {
        return Err(BuildError::NotInZone);
    }

    let tld = format!("{}.", name::label_from(fqdn, -1).ok_or(BuildError::NotInZone)?);

    let mut msg = DnsPacket::default();
    let an = &mut msg.answers;
    let ns = &mut msg.authorities;
    let ar = &mut msg.additionals;

    if labels > 1 {
        // Referral.
        if res.has_ns() {
            builder::to_ns(res, &tld, ns);
            builder::to_ds(res, &tld, ns);
            builder::to_nsip(res, &tld, ar);
            builder::to_glue(res, QueryType::NS, ar);
            if !res.has(Tag::Ds) {
                norn_dnssec::sign_zsk(ns, QueryType::NS)?;
            } else {
                norn_dnssec::sign_zsk(ns, QueryType::DS)?;
            }
        } else if res.has(Tag::Delegate) {
            builder::to_dname(res, fqdn, an);
            builder::to_glue(res, QueryType::DNAME, ar);
            norn_dnssec::sign_zsk(an, QueryType::DNAME)?;
            norn_dnssec::sign_zsk(ar, QueryType::A)?;
            norn_dnssec::sign_zsk(ar, QueryType::AAAA)?;
        } else {
            // Needs SOA.
            // Empty proof:
            builder::to_empty(&tld, &[], ns);
            norn_dnssec::sign_zsk(ns, QueryType::NSEC)?;
            builder::root_to_soa(ns, Utc::now());
            norn_dnssec::sign_zsk(ns, QueryType::SOA)?;
        }

        return Ok(finish(msg));
    }

    match qtype {
        QueryType::A => {
            builder::to_a(res, fqdn, an);
            norn_dnssec::sign_zsk(an, QueryType::A)?;
        }
        QueryType::AAAA => {
            builder::to_aaaa(res, fqdn, an);
            norn_dnssec::sign_zsk(an, QueryType::AAAA)?;
        }
        QueryType::CNAME => {
            builder::to_cname(res, fqdn, an);
            builder::to_glue(res, QueryType::CNAME, ar);
            norn_dnssec::sign_zsk(an, QueryType::CNAME)?;
            norn_dnssec::sign_zsk(ar, QueryType::A)?;
            norn_dnssec::sign_zsk(ar, QueryType::AAAA)?;
        }
        QueryType::DNAME => {
            builder::to_dname(res, fqdn, an);
            builder::to_glue(res, QueryType::DNAME, ar);
            norn_dnssec::sign_zsk(an, QueryType::DNAME)?;
            norn_dnssec::sign_zsk(ar, QueryType::A)?;
            norn_dnssec::sign_zsk(ar, QueryType::AAAA)?;
        }
        QueryType::NS => {
            builder::to_ns(res, fqdn, ns);
            builder::to_glue(res, QueryType::NS, ar);
            builder::to_nsip(res, fqdn, ar);
            norn_dnssec::sign_zsk(ns, QueryType::NS)?;
        }
        QueryType::MX => {
            builder::to_mx(res, fqdn, an);
            builder::to_mxip(res, fqdn, ar);
            builder::to_glue(res, QueryType::MX, ar);
            norn_dnssec::sign_zsk(an, QueryType::MX)?;
        }
        QueryType::TXT => {
            builder::to_txt(res, fqdn, an);
            norn_dnssec::sign_zsk(an, QueryType::TXT)?;
        }
        QueryType::LOC => {
            builder::to_loc(res, fqdn, an);
            norn_dnssec::sign_zsk(an, QueryType::LOC)?;
        }
        QueryType::DS => {
            builder::to_ds(res, fqdn, an);
            norn_dnssec::sign_zsk(an, QueryType::DS)?;
        }
        QueryType::SSHFP => {
            builder::to_sshfp(res, fqdn, an);
            norn_dnssec::sign_zsk(an, QueryType::SSHFP)?;
        }
        QueryType::URI => {
            builder::to_uri(res, fqdn, an);
            norn_dnssec::sign_zsk(an, QueryType::URI)?;
        }
        QueryType::RP => {
            builder::to_rp(res, fqdn, an);
            norn_dnssec::sign_zsk(an, QueryType::RP)?;
        }
        _ => {}
    }

    if msg.answers.is_empty() && msg.authorities.is_empty() {
        let an = &mut msg.answers;
        let ns = &mut msg.authorities;
        let ar = &mut msg.additionals;

        if res.has(Tag::Canonical) {
            // The alias stands in for every type we have no data for.
            builder::to_cname(res, fqdn, an);
            builder::to_glue(res, QueryType::CNAME, ar);
            norn_dnssec::sign_zsk(an, QueryType::CNAME)?;
            norn_dnssec::sign_zsk(ar, QueryType::A)?;
            norn_dnssec::sign_zsk(ar, QueryType::AAAA)?;
        } else if res.has_ns() {
            builder::to_ns(res, fqdn, ns);
            builder::to_ds(res, fqdn, ns);
            builder::to_nsip(res, fqdn, ar);
            builder::to_glue(res, QueryType::NS, ar);
            if !res.has(Tag::Ds) {
                norn_dnssec::sign_zsk(ns, QueryType::NS)?;
            } else {
                norn_dnssec::sign_zsk(ns, QueryType::DS)?;
            }
        } else {
            // Needs SOA.
            // Empty proof:
            builder::to_empty(fqdn, &[], ns);
            norn_dnssec::sign_zsk(ns, QueryType::NSEC)?;
            builder::root_to_soa(ns, Utc::now());
            norn_dnssec::sign_zsk(ns, QueryType::SOA)?;
        }
    }

    Ok(finish(msg))
}

/// A non-empty answer makes the message authoritative.
fn finish(mut msg: DnsPacket) -> DnsPacket {
    if !msg.answers.is_empty() {
        msg.header.authoritative_answer = true;
    }
    msg
}

enum BuildError {
    NotInZone,
    Writer,
}

impl From<WriterError> for BuildError {
    fn from(_: WriterError) -> Self {
        Self::Writer
    }
}

/// Answer a query against the root zone itself.
pub fn root(qtype: QueryType, addr: Option<IpAddr>) -> DnsPacket {
    build_root(qtype, addr).unwrap_or_else(|_| servfail())
}

fn build_root(qtype: QueryType, addr: Option<IpAddr>) -> Result<DnsPacket, WriterError> {
    let mut msg = DnsPacket::default();
    msg.header.authoritative_answer = true;

    let an = &mut msg.answers;
    let ns = &mut msg.authorities;
    let ar = &mut msg.additionals;

    match qtype {
        QueryType::ANY | QueryType::NS => {
            builder::root_to_ns(an);
            norn_dnssec::sign_zsk(an, QueryType::NS)?;

            builder::root_to_a(ar, addr);
            norn_dnssec::sign_zsk(ar, QueryType::A)?;
            builder::root_to_aaaa(ar, addr);
            norn_dnssec::sign_zsk(ar, QueryType::AAAA)?;
        }
        QueryType::SOA => {
            builder::root_to_soa(an, Utc::now());
            norn_dnssec::sign_zsk(an, QueryType::SOA)?;

            builder::root_to_ns(ns);
            norn_dnssec::sign_zsk(ns, QueryType::NS)?;

            builder::root_to_a(ar, addr);
            norn_dnssec::sign_zsk(ar, QueryType::A)?;
            builder::root_to_aaaa(ar, addr);
            norn_dnssec::sign_zsk(ar, QueryType::AAAA)?;
        }
        QueryType::DNSKEY => {
            builder::root_to_dnskey(an);
            norn_dnssec::sign_ksk(an, QueryType::DNSKEY)?;
        }
        QueryType::DS => {
            builder::root_to_ds(an);
            norn_dnssec::sign_zsk(an, QueryType::DS)?;
        }
        _ => {
            // Empty Proof:
            // Show all the types that we signed.
            builder::root_to_nsec(ns);
            norn_dnssec::sign_zsk(ns, QueryType::NSEC)?;
            builder::root_to_soa(ns, Utc::now());
            norn_dnssec::sign_zsk(ns, QueryType::SOA)?;
        }
    }

    Ok(msg)
}

/// Answer a query for a synthetic pointer name under the `_synth.`
/// pseudo-TLD, straight from the address packed in the label.
pub fn synth(fqdn: &str, qtype: QueryType) -> Option<DnsPacket> {
    let ip = pointer::pointer_to_ip(fqdn)?;

    build_synth(fqdn, qtype, ip).ok()
}

fn build_synth(fqdn: &str, qtype: QueryType, ip: IpAddr) -> Result<DnsPacket, WriterError> {
    let mut msg = DnsPacket::default();
    msg.header.authoritative_answer = true;

    let an = &mut msg.answers;
    let ns = &mut msg.authorities;

    match (qtype, ip) {
        (QueryType::A | QueryType::ANY, IpAddr::V4(ip)) => {
            an.push(DnsRecord::new(
                fqdn.to_string(),
                crate::DEFAULT_TTL,
                RData::A(ip),
            ));
            norn_dnssec::sign_zsk(an, QueryType::A)?;
        }
        (QueryType::AAAA | QueryType::ANY, IpAddr::V6(ip)) => {
            an.push(DnsRecord::new(
                fqdn.to_string(),
                crate::DEFAULT_TTL,
                RData::Aaaa(ip),
            ));
            norn_dnssec::sign_zsk(an, QueryType::AAAA)?;
        }
        _ => {
            builder::to_empty(fqdn, &[], ns);
            norn_dnssec::sign_zsk(ns, QueryType::NSEC)?;
            builder::root_to_soa(ns, Utc::now());
            norn_dnssec::sign_zsk(ns, QueryType::SOA)?;
        }
    }

    Ok(msg)
}

/// The domain provably does not exist: an authoritative NXDOMAIN that
/// presents the namespace as an empty signed zone.
pub fn nx() -> DnsPacket {
    build_nx().unwrap_or_else(|_| servfail())
}

fn build_nx() -> Result<DnsPacket, WriterError> {
    let mut msg = DnsPacket::default();
    msg.header.response_code = norn_proto::packet::header::ResponseCode::NameError;
    msg.header.authoritative_answer = true;

    let ns = &mut msg.authorities;

    // NX Proof:
    // Just make it look like an empty zone. It seems to fool validating
    // resolvers without breaking anything.
    builder::root_to_nsec(ns);
    builder::root_to_nsec(ns);
    norn_dnssec::sign_zsk(ns, QueryType::NSEC)?;

    builder::root_to_soa(ns, Utc::now());
    norn_dnssec::sign_zsk(ns, QueryType::SOA)?;

    Ok(msg)
}

pub fn servfail() -> DnsPacket {
    let mut msg = DnsPacket::default();
    msg.header.response_code = norn_proto::packet::header::ResponseCode::ServerFailure;
    msg
}

pub fn notimp() -> DnsPacket {
    let mut msg = DnsPacket::default();
    msg.header.response_code = norn_proto::packet::header::ResponseCode::NotImplemented;
    msg
}
