use super::error::HandleError;
use crate::repository::chain::ChainService;
use norn_proto::buffer::{BytePacketBuffer, WriterError};
use norn_proto::name;
use norn_proto::packet::header::ResponseCode;
use norn_proto::packet::question::Question;
use norn_proto::packet::record::{RData, Record};
use norn_proto::packet::DnsPacket;
use norn_resource::Resource;
use std::net::IpAddr;
use std::sync::Arc;

/// Payload size granted to EDNS clients.
const EDNS_SIZE: u16 = 4096;

/// Hard cap for clients that did not negotiate anything.
const PLAIN_SIZE: usize = 512;

/// Pseudo-TLD under which synthetic pointer names resolve directly.
const SYNTH_TLD: &str = "_synth";

pub(crate) struct DnsHandler {
    chain: Arc<dyn ChainService + Send + Sync>,
    public_address: Option<IpAddr>,
}

impl DnsHandler {
    pub fn new(
        chain: Arc<dyn ChainService + Send + Sync>,
        public_address: Option<IpAddr>,
    ) -> Self {
        Self {
            chain,
            public_address,
        }
    }

    /// Resolve one question into the body of a response: sections, the
    /// AA flag and the response code. The message identity is merged in
    /// by [`DnsHandler::respond`].
    async fn answer(&self, question: &Question) -> Result<DnsPacket, HandleError> {
        let qname = question.name.as_str();
        let qtype = question.qtype;

        if !name::verify(qname) {
            let mut refused = DnsPacket::default();
            refused.header.response_code = ResponseCode::Refused;
            return Ok(refused);
        }

        // The root zone is synthesized, no resource backs it.
        if name::label_count(qname) == 0 {
            return Ok(norn_resource::root(qtype, self.public_address));
        }

        let tld = name::label_from(qname, -1).unwrap_or_default().to_string();

        // Names under the magic pseudo-TLD carry their address in the
        // first label and resolve without any lookup.
        if tld == SYNTH_TLD {
            return Ok(norn_resource::synth(qname, qtype).unwrap_or_else(norn_resource::nx));
        }

        let raw = self
            .chain
            .resource(&tld)
            .await
            .map_err(HandleError::Chain)?;

        let Some(raw) = raw else {
            return Ok(norn_resource::nx());
        };

        let resource = match Resource::decode(&raw) {
            Ok(resource) => resource,
            Err(error) => {
                tracing::warn!("committed resource for {tld:?} does not decode: {error}");
                return Ok(norn_resource::servfail());
            }
        };

        Ok(norn_resource::to_dns(&resource, qname, qtype).unwrap_or_else(norn_resource::servfail))
    }

    /// Build the full response packet for a parsed request.
    #[tracing::instrument(skip_all, fields(id = request.header.id))]
    pub async fn respond(&self, request: &DnsPacket) -> DnsPacket {
        let mut response = DnsPacket::response_from(request);

        if request.header.opcode != 0 {
            tracing::debug!("unsupported opcode {}", request.header.opcode);
            let body = norn_resource::notimp();
            response.header.response_code = body.header.response_code;
            return response;
        }

        let Some(question) = request.questions.first() else {
            tracing::debug!("no question in query");
            response.header.response_code = ResponseCode::FormatError;
            return response;
        };

        tracing::debug!("query: {} {:?}", question.name, question.qtype);

        let body = match self.answer(question).await {
            Ok(body) => body,
            Err(error) => {
                tracing::error!("unable to answer question: {error}");
                norn_resource::servfail()
            }
        };

        response.header.response_code = body.header.response_code;
        response.header.authoritative_answer = body.header.authoritative_answer;
        response.questions.push(question.clone());
        response.answers = body.answers;
        response.authorities = body.authorities;
        response.additionals = body.additionals;

        response
    }
}

fn edns_request(request: &DnsPacket) -> Option<(u16, bool)> {
    request.additionals.iter().find_map(|record| match &record.data {
        RData::Opt {
            udp_size,
            dnssec_ok,
            ..
        } => Some((*udp_size, *dnssec_ok)),
        _ => None,
    })
}

fn opt_record(dnssec_ok: bool) -> Record {
    Record::new(
        String::from("."),
        0,
        RData::Opt {
            udp_size: EDNS_SIZE,
            ext_rcode: 0,
            version: 0,
            dnssec_ok,
            data: Vec::new(),
        },
    )
}

/// Attach the EDNS record when the client spoke EDNS and write the
/// packet out. Responses too large for the negotiated payload collapse
/// to a truncated header-and-question message.
pub(crate) fn finalize(
    request: &DnsPacket,
    mut response: DnsPacket,
) -> Result<BytePacketBuffer, WriterError> {
    let edns = edns_request(request);

    if let Some((_, dnssec_ok)) = edns {
        response.additionals.push(opt_record(dnssec_ok));
    }

    let max_size = match edns {
        Some((udp_size, _)) => (udp_size.max(PLAIN_SIZE as u16) as usize).min(EDNS_SIZE as usize),
        None => PLAIN_SIZE,
    };

    let buffer = response.create_buffer()?;
    if buffer.pos() <= max_size {
        return Ok(buffer);
    }

    tracing::debug!("response of {} bytes truncated to {max_size}", buffer.pos());

    let mut truncated = DnsPacket::new(response.header.clone());
    truncated.header.truncated_message = true;
    truncated.questions = response.questions.clone();
    if let Some((_, dnssec_ok)) = edns {
        truncated.additionals.push(opt_record(dnssec_ok));
    }
    truncated.create_buffer()
}

#[cfg(test)]
mod tests {
    use super::DnsHandler;
    use crate::repository::chain::MockChainService;
    use norn_proto::packet::header::{Header, ResponseCode};
    use norn_proto::packet::question::Question;
    use norn_proto::packet::record::RData;
    use norn_proto::packet::{DnsPacket, QueryType};
    use similar_asserts::assert_eq;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;

    fn handler(chain: MockChainService) -> DnsHandler {
        DnsHandler::new(
            Arc::new(chain),
            Some(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
        )
    }

    fn query(name: &str, qtype: QueryType) -> DnsPacket {
        DnsPacket::new(Header::question(42))
            .with_question(Question::new(name.to_string(), qtype))
    }

    #[tokio::test]
    async fn should_answer_address_query() {
        let chain = MockChainService::default()
            .with_resource("alice", vec![0x00, 0x01, 0xc0, 0x00, 0x02, 0x01]);

        let response = handler(chain).respond(&query("alice.", QueryType::A)).await;

        assert_eq!(response.header.id, 42);
        assert!(response.header.response);
        assert!(response.header.authoritative_answer);
        assert_eq!(response.header.response_code, ResponseCode::NoError);
        assert_eq!(response.questions[0].name, "alice.");
        assert_eq!(response.answers.len(), 2);
        assert_eq!(
            response.answers[0].data,
            RData::A(Ipv4Addr::new(192, 0, 2, 1))
        );
        assert!(matches!(response.answers[1].data, RData::Rrsig { .. }));
    }

    #[tokio::test]
    async fn should_answer_nxdomain_for_unknown_name() {
        let response = handler(MockChainService::default())
            .respond(&query("ghost.", QueryType::A))
            .await;

        assert_eq!(response.header.response_code, ResponseCode::NameError);
        assert!(response.header.authoritative_answer);
        assert!(response.answers.is_empty());
        assert!(!response.authorities.is_empty());
    }

    #[tokio::test]
    async fn should_servfail_on_undecodable_resource() {
        let chain = MockChainService::default().with_resource("alice", vec![0xff, 0x01]);

        let response = handler(chain).respond(&query("alice.", QueryType::A)).await;

        assert_eq!(response.header.response_code, ResponseCode::ServerFailure);
        assert!(response.answers.is_empty());
    }

    #[tokio::test]
    async fn should_answer_for_the_root() {
        let response = handler(MockChainService::default())
            .respond(&query(".", QueryType::NS))
            .await;

        assert_eq!(response.header.response_code, ResponseCode::NoError);
        assert!(response.header.authoritative_answer);
        assert_eq!(
            response.answers[0].data,
            RData::Ns { host: ".".into() }
        );
        // Our own address rides along as glue.
        assert_eq!(
            response.additionals[0].data,
            RData::A(Ipv4Addr::new(127, 0, 0, 1))
        );
    }

    #[tokio::test]
    async fn should_answer_synthetic_pointer_without_lookup() {
        let encoded =
            norn_resource::pointer::ip_to_b32(&IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7)));
        let name = format!("_{encoded}._synth.");

        let response = handler(MockChainService::default())
            .respond(&query(&name, QueryType::A))
            .await;

        assert_eq!(response.header.response_code, ResponseCode::NoError);
        assert_eq!(
            response.answers[0].data,
            RData::A(Ipv4Addr::new(198, 51, 100, 7))
        );
    }

    #[tokio::test]
    async fn should_refuse_invalid_qname() {
        let response = handler(MockChainService::default())
            .respond(&query("alice@example.", QueryType::A))
            .await;

        assert_eq!(response.header.response_code, ResponseCode::Refused);
    }

    #[tokio::test]
    async fn should_notimp_exotic_opcode() {
        let mut request = query("alice.", QueryType::A);
        request.header.opcode = 2;

        let response = handler(MockChainService::default()).respond(&request).await;

        assert_eq!(response.header.response_code, ResponseCode::NotImplemented);
    }

    #[tokio::test]
    async fn should_formerr_without_question() {
        let request = DnsPacket::new(Header::question(7));

        let response = handler(MockChainService::default()).respond(&request).await;

        assert_eq!(response.header.response_code, ResponseCode::FormatError);
        assert!(response.questions.is_empty());
    }

    #[tokio::test]
    async fn should_truncate_oversized_plain_udp_response() {
        // Enough TXT records to overflow 512 bytes once signed.
        let mut raw = vec![0x00];
        for _ in 0..8 {
            raw.push(0x0d);
            raw.push(60);
            raw.extend_from_slice(&[b'x'; 60]);
        }
        let chain = MockChainService::default().with_resource("alice", raw);

        let request = query("alice.", QueryType::TXT);
        let response = handler(chain).respond(&request).await;

        let buffer = super::finalize(&request, response.clone()).unwrap();
        let truncated = DnsPacket::try_from(buffer).unwrap();
        assert!(truncated.header.truncated_message);
        assert!(truncated.answers.is_empty());
        assert_eq!(truncated.questions.len(), 1);

        // The same response fits once the client negotiates EDNS.
        let mut edns_request = request.clone();
        edns_request.additionals.push(super::opt_record(false));
        let buffer = super::finalize(&edns_request, response).unwrap();
        let full = DnsPacket::try_from(buffer).unwrap();
        assert!(!full.header.truncated_message);
        assert_eq!(full.answers.len(), 9);
        assert!(matches!(
            full.additionals.last().unwrap().data,
            RData::Opt { udp_size: 4096, .. }
        ));
    }
}
