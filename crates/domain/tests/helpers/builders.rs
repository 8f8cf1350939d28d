#![allow(dead_code)]
use ferrous_netkit_domain::{
    DnsDatagram, DnsHeader, DnsQuestionRecord, DnsResourceRecord, RecordClass, RecordType,
    ResponseCode,
};

pub struct DatagramBuilder {
    header: DnsHeader,
    question: Vec<DnsQuestionRecord>,
    answer: Vec<DnsResourceRecord>,
    authority: Vec<DnsResourceRecord>,
    additional: Vec<DnsResourceRecord>,
}

impl DatagramBuilder {
    pub fn query(id: u16, domain: &str, record_type: RecordType) -> Self {
        Self {
            header: DnsHeader::query(id, true),
            question: vec![DnsQuestionRecord::new(domain, record_type, RecordClass::IN)],
            answer: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
        }
    }

    pub fn response(id: u16, domain: &str, record_type: RecordType) -> Self {
        let mut builder = Self::query(id, domain, record_type);
        builder.header.is_response = true;
        builder.header.recursion_available = true;
        builder
    }

    pub fn rcode(mut self, rcode: ResponseCode) -> Self {
        self.header.rcode = rcode;
        self
    }

    pub fn truncated(mut self) -> Self {
        self.header.truncation = true;
        self
    }

    pub fn answer(mut self, record: DnsResourceRecord) -> Self {
        self.answer.push(record);
        self
    }

    pub fn authority(mut self, record: DnsResourceRecord) -> Self {
        self.authority.push(record);
        self
    }

    pub fn additional(mut self, record: DnsResourceRecord) -> Self {
        self.additional.push(record);
        self
    }

    pub fn build(self) -> DnsDatagram {
        DnsDatagram::new(
            self.header,
            self.question,
            self.answer,
            self.authority,
            self.additional,
        )
    }
}
