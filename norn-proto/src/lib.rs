pub mod buffer;
pub mod name;
pub mod packet;

pub use buffer::{BytePacketBuffer, ReaderError, WriterError, PACKET_SIZE};
pub use packet::{DnsPacket, QueryType};

#[cfg(test)]
mod tests {
    use crate::packet::header::Header;
    use crate::packet::question::Question;
    use crate::packet::{DnsPacket, QueryType};

    #[test]
    fn should_roundtrip_query_packet() {
        let packet = DnsPacket::new(Header::question(38005))
            .with_question(Question::new("example.com.".into(), QueryType::A));
        let buffer = packet.clone().create_buffer().unwrap();

        let parsed = DnsPacket::try_from(buffer).unwrap();
        assert_eq!(parsed.header.id, 38005);
        assert_eq!(parsed.questions.len(), 1);
        assert_eq!(parsed.questions[0].name, "example.com.");
        assert_eq!(parsed.questions[0].qtype, QueryType::A);
        assert!(parsed.answers.is_empty());
        assert!(parsed.authorities.is_empty());
        assert!(parsed.additionals.is_empty());
    }

    #[test]
    fn should_roundtrip_response_packet() {
        use crate::packet::record::{RData, Record};
        use std::net::Ipv4Addr;

        let packet = DnsPacket::new(Header::response(38005))
            .with_question(Question::new("example.com.".into(), QueryType::A))
            .with_answer(Record::new(
                "example.com.".into(),
                8,
                RData::A(Ipv4Addr::new(172, 217, 20, 206)),
            ));
        let buffer = packet.clone().create_buffer().unwrap();

        let parsed = DnsPacket::try_from(buffer).unwrap();
        assert_eq!(parsed.answers.len(), 1);
        assert_eq!(parsed.answers[0].name, "example.com.");
        assert_eq!(parsed.answers[0].ttl, 8);
        assert_eq!(
            parsed.answers[0].data,
            RData::A(Ipv4Addr::new(172, 217, 20, 206))
        );
    }
}
