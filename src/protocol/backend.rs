//! Backend (server-to-client) messages.
use std::ops::ControlFlow;

use bytes::{Buf, Bytes, BytesMut};

use super::{read_cstr, split_body, BackendProtocol, ProtocolError};

const HEADER_LEN: usize = 1 + 4;

/// Every backend message this crate understands (SPEC_FULL.md §4.3).
#[derive(Debug)]
pub enum BackendMessage {
    Authentication(Authentication),
    BackendKeyData(BackendKeyData),
    ParameterStatus(ParameterStatus),
    ReadyForQuery(ReadyForQuery),
    ParseComplete,
    BindComplete,
    CloseComplete,
    NoData,
    PortalSuspended,
    EmptyQueryResponse,
    ParameterDescription(ParameterDescription),
    RowDescription(RowDescription),
    DataRow(DataRow),
    CommandComplete(CommandComplete),
    ErrorResponse(ErrorResponse),
    NoticeResponse(NoticeResponse),
    NotificationResponse(NotificationResponse),
    FunctionCallResponse(FunctionCallResponse),
}

impl BackendMessage {
    pub fn unexpected(&self, context: &'static str) -> ProtocolError {
        ProtocolError::Unexpected { context, message: format!("{self:?}") }
    }
}

impl BackendProtocol for BackendMessage {
    fn decode(buf: &mut BytesMut) -> Result<ControlFlow<Self, usize>, ProtocolError> {
        let Some(&msgtype) = buf.first() else {
            return Ok(ControlFlow::Continue(HEADER_LEN));
        };
        let body = match split_body(buf, HEADER_LEN)? {
            ControlFlow::Continue(n) => return Ok(ControlFlow::Continue(n)),
            ControlFlow::Break(body) => body,
        };

        let message = match msgtype {
            b'R' => Self::Authentication(Authentication::parse(body)?),
            b'K' => Self::BackendKeyData(BackendKeyData::parse(body)?),
            b'S' => Self::ParameterStatus(ParameterStatus::parse(body)?),
            b'Z' => Self::ReadyForQuery(ReadyForQuery::parse(body)?),
            b'1' => Self::ParseComplete,
            b'2' => Self::BindComplete,
            b'3' => Self::CloseComplete,
            b'n' => Self::NoData,
            b's' => Self::PortalSuspended,
            b'I' => Self::EmptyQueryResponse,
            b't' => Self::ParameterDescription(ParameterDescription::parse(body)?),
            b'T' => Self::RowDescription(RowDescription::parse(body)?),
            b'D' => Self::DataRow(DataRow::parse(body)?),
            b'C' => Self::CommandComplete(CommandComplete::parse(body)?),
            b'E' => Self::ErrorResponse(ErrorResponse::parse(body)?),
            b'N' => Self::NoticeResponse(NoticeResponse(ErrorResponse::parse(body)?)),
            b'A' => Self::NotificationResponse(NotificationResponse::parse(body)?),
            b'V' => Self::FunctionCallResponse(FunctionCallResponse::parse(body)?),
            other => return Err(ProtocolError::UnsupportedMessage(other)),
        };
        Ok(ControlFlow::Break(message))
    }
}

/// One step of an authentication exchange.
#[derive(Debug)]
pub enum Authentication {
    Ok,
    CleartextPassword,
    Md5Password { salt: [u8; 4] },
    Sasl { mechanisms: Vec<String> },
    SaslContinue { data: Bytes },
    SaslFinal { data: Bytes },
}

impl Authentication {
    fn parse(mut body: Bytes) -> Result<Self, ProtocolError> {
        let tag = body.get_i32();
        Ok(match tag {
            0 => Authentication::Ok,
            3 => Authentication::CleartextPassword,
            5 => {
                if body.len() < 4 {
                    return Err(ProtocolError::Malformed("AuthenticationMD5Password too short".into()));
                }
                let mut salt = [0u8; 4];
                salt.copy_from_slice(&body[..4]);
                Authentication::Md5Password { salt }
            }
            10 => {
                let mut mechanisms = Vec::new();
                while body.first().is_some_and(|&b| b != 0) {
                    mechanisms.push(read_cstr(&mut body)?);
                }
                Authentication::Sasl { mechanisms }
            }
            11 => Authentication::SaslContinue { data: body },
            12 => Authentication::SaslFinal { data: body },
            other => {
                return Err(ProtocolError::Malformed(format!("unsupported authentication method {other}")))
            }
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BackendKeyData {
    pub process_id: i32,
    pub secret_key: i32,
}

impl BackendKeyData {
    fn parse(mut body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { process_id: body.get_i32(), secret_key: body.get_i32() })
    }
}

#[derive(Debug, Clone)]
pub struct ParameterStatus {
    pub name: String,
    pub value: String,
}

impl ParameterStatus {
    fn parse(mut body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { name: read_cstr(&mut body)?, value: read_cstr(&mut body)? })
    }
}

/// Backend transaction status, as reported in `ReadyForQuery`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Idle,
    InTransaction,
    InFailedTransaction,
}

#[derive(Debug, Clone, Copy)]
pub struct ReadyForQuery {
    pub status: TransactionStatus,
}

impl ReadyForQuery {
    fn parse(mut body: Bytes) -> Result<Self, ProtocolError> {
        let status = match body.get_u8() {
            b'I' => TransactionStatus::Idle,
            b'T' => TransactionStatus::InTransaction,
            b'E' => TransactionStatus::InFailedTransaction,
            other => return Err(ProtocolError::Malformed(format!("unknown transaction status {other:#x}"))),
        };
        Ok(Self { status })
    }
}

#[derive(Debug, Clone)]
pub struct ParameterDescription {
    pub type_oids: Vec<u32>,
}

impl ParameterDescription {
    fn parse(mut body: Bytes) -> Result<Self, ProtocolError> {
        let count = body.get_i16() as usize;
        let mut type_oids = Vec::with_capacity(count);
        for _ in 0..count {
            type_oids.push(body.get_u32());
        }
        Ok(Self { type_oids })
    }
}

#[derive(Debug, Clone)]
pub struct FieldDescription {
    pub name: String,
    pub table_oid: u32,
    pub table_column_number: i16,
    pub type_oid: u32,
    pub type_size: i16,
    pub type_modifier: i32,
    pub format: i16,
}

#[derive(Debug, Clone)]
pub struct RowDescription {
    pub fields: Vec<FieldDescription>,
}

impl RowDescription {
    fn parse(mut body: Bytes) -> Result<Self, ProtocolError> {
        let count = body.get_i16() as usize;
        let mut fields = Vec::with_capacity(count);
        for _ in 0..count {
            fields.push(FieldDescription {
                name: read_cstr(&mut body)?,
                table_oid: body.get_u32(),
                table_column_number: body.get_i16(),
                type_oid: body.get_u32(),
                type_size: body.get_i16(),
                type_modifier: body.get_i32(),
                format: body.get_i16(),
            });
        }
        Ok(Self { fields })
    }
}

#[derive(Debug, Clone)]
pub struct DataRow {
    pub values: Vec<Option<Bytes>>,
}

impl DataRow {
    fn parse(mut body: Bytes) -> Result<Self, ProtocolError> {
        let count = body.get_i16() as usize;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            let len = body.get_i32();
            if len < 0 {
                values.push(None);
            } else {
                values.push(Some(body.split_to(len as usize)));
            }
        }
        Ok(Self { values })
    }
}

#[derive(Debug, Clone)]
pub struct CommandComplete {
    pub tag: String,
}

impl CommandComplete {
    fn parse(mut body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { tag: read_cstr(&mut body)? })
    }
}

/// A field of an `ErrorResponse`/`NoticeResponse`, keyed by its single-byte code.
/// Codes per SPEC_FULL.md §6: `S V C M D H P p q W s t c d n F L R`.
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    fields: Vec<(u8, String)>,
}

impl ErrorResponse {
    fn parse(mut body: Bytes) -> Result<Self, ProtocolError> {
        let mut fields = Vec::new();
        while body.first().is_some_and(|&b| b != 0) {
            let code = body.get_u8();
            let value = read_cstr(&mut body)?;
            fields.push((code, value));
        }
        Ok(Self { fields })
    }

    fn field(&self, code: u8) -> Option<&str> {
        self.fields.iter().find(|(c, _)| *c == code).map(|(_, v)| v.as_str())
    }

    pub fn severity(&self) -> &str {
        self.field(b'S').unwrap_or("ERROR")
    }

    pub fn sqlstate(&self) -> &str {
        self.field(b'C').unwrap_or("XX000")
    }

    pub fn message(&self) -> &str {
        self.field(b'M').unwrap_or("")
    }

    pub fn detail(&self) -> Option<&str> {
        self.field(b'D')
    }

    pub fn hint(&self) -> Option<&str> {
        self.field(b'H')
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({})", self.severity(), self.message(), self.sqlstate())
    }
}

impl std::error::Error for ErrorResponse {}

#[derive(Debug, Clone)]
pub struct NoticeResponse(pub ErrorResponse);

#[derive(Debug, Clone)]
pub struct NotificationResponse {
    pub process_id: i32,
    pub channel: String,
    pub payload: String,
}

impl NotificationResponse {
    fn parse(mut body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            process_id: body.get_i32(),
            channel: read_cstr(&mut body)?,
            payload: read_cstr(&mut body)?,
        })
    }
}

/// Result of a fastpath `FunctionCall`, used by the large-object API.
#[derive(Debug, Clone)]
pub struct FunctionCallResponse {
    pub value: Option<Bytes>,
}

impl FunctionCallResponse {
    fn parse(mut body: Bytes) -> Result<Self, ProtocolError> {
        let len = body.get_i32();
        let value = if len < 0 { None } else { Some(body.split_to(len as usize)) };
        Ok(Self { value })
    }
}
