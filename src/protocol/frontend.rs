//! Frontend (client-to-server) messages.
use bytes::{BufMut, BytesMut};

use super::{put_cstr, write_message, FrontendProtocol};

/// The very first message sent on a connection. Has no message-type byte.
pub struct Startup<'a> {
    pub user: &'a str,
    pub database: Option<&'a str>,
    pub extra: &'a [(&'a str, &'a str)],
}

impl FrontendProtocol for Startup<'_> {
    const MSGTYPE: Option<u8> = None;

    fn encode(&self, buf: &mut BytesMut) {
        write_message(buf, None, |buf| {
            buf.put_i32(0x0003_0000); // protocol version 3.0
            put_cstr(buf, "user");
            put_cstr(buf, self.user);
            if let Some(database) = self.database {
                put_cstr(buf, "database");
                put_cstr(buf, database);
            }
            for (key, value) in self.extra {
                put_cstr(buf, key);
                put_cstr(buf, value);
            }
            buf.put_u8(0);
        });
    }
}

macro_rules! simple {
    ($name:ident, $msgtype:expr, |$self:ident, $buf:ident| $body:block) => {
        impl FrontendProtocol for $name<'_> {
            const MSGTYPE: Option<u8> = Some($msgtype);

            fn encode(&$self, $buf: &mut BytesMut) {
                write_message($buf, Self::MSGTYPE, |$buf| $body);
            }
        }
    };
}

pub struct Query<'a> {
    pub sql: &'a str,
}
simple!(Query, b'Q', |self, buf| { put_cstr(buf, self.sql); });

pub struct Parse<'a> {
    pub statement: &'a str,
    pub sql: &'a str,
    pub param_types: &'a [u32],
}
simple!(Parse, b'P', |self, buf| {
    put_cstr(buf, self.statement);
    put_cstr(buf, self.sql);
    buf.put_i16(self.param_types.len() as i16);
    for oid in self.param_types {
        buf.put_u32(*oid);
    }
});

pub struct Bind<'a> {
    pub portal: &'a str,
    pub statement: &'a str,
    pub param_formats: &'a [i16],
    pub params: &'a [Option<&'a [u8]>],
    pub result_formats: &'a [i16],
}
simple!(Bind, b'B', |self, buf| {
    put_cstr(buf, self.portal);
    put_cstr(buf, self.statement);
    buf.put_i16(self.param_formats.len() as i16);
    for format in self.param_formats {
        buf.put_i16(*format);
    }
    buf.put_i16(self.params.len() as i16);
    for param in self.params {
        match param {
            Some(bytes) => {
                buf.put_i32(bytes.len() as i32);
                buf.put_slice(bytes);
            }
            None => buf.put_i32(-1),
        }
    }
    buf.put_i16(self.result_formats.len() as i16);
    for format in self.result_formats {
        buf.put_i16(*format);
    }
});

#[derive(Clone, Copy)]
pub enum DescribeTarget {
    Statement,
    Portal,
}

pub struct Describe<'a> {
    pub target: DescribeTarget,
    pub name: &'a str,
}
simple!(Describe, b'D', |self, buf| {
    buf.put_u8(match self.target {
        DescribeTarget::Statement => b'S',
        DescribeTarget::Portal => b'P',
    });
    put_cstr(buf, self.name);
});

pub struct Execute<'a> {
    pub portal: &'a str,
    pub max_rows: i32,
}
simple!(Execute, b'E', |self, buf| {
    put_cstr(buf, self.portal);
    buf.put_i32(self.max_rows);
});

pub struct Close<'a> {
    pub target: DescribeTarget,
    pub name: &'a str,
}
simple!(Close, b'C', |self, buf| {
    buf.put_u8(match self.target {
        DescribeTarget::Statement => b'S',
        DescribeTarget::Portal => b'P',
    });
    put_cstr(buf, self.name);
});

pub struct Sync;
impl FrontendProtocol for Sync {
    const MSGTYPE: Option<u8> = Some(b'S');
    fn encode(&self, buf: &mut BytesMut) {
        write_message(buf, Self::MSGTYPE, |_| {});
    }
}

pub struct Flush;
impl FrontendProtocol for Flush {
    const MSGTYPE: Option<u8> = Some(b'H');
    fn encode(&self, buf: &mut BytesMut) {
        write_message(buf, Self::MSGTYPE, |_| {});
    }
}

pub struct Terminate;
impl FrontendProtocol for Terminate {
    const MSGTYPE: Option<u8> = Some(b'X');
    fn encode(&self, buf: &mut BytesMut) {
        write_message(buf, Self::MSGTYPE, |_| {});
    }
}

pub struct PasswordMessage<'a> {
    pub password: &'a str,
}
simple!(PasswordMessage, b'p', |self, buf| { put_cstr(buf, self.password); });

pub struct SaslInitialResponse<'a> {
    pub mechanism: &'a str,
    pub data: &'a [u8],
}
simple!(SaslInitialResponse, b'p', |self, buf| {
    put_cstr(buf, self.mechanism);
    buf.put_i32(self.data.len() as i32);
    buf.put_slice(self.data);
});

pub struct SaslResponse<'a> {
    pub data: &'a [u8],
}
simple!(SaslResponse, b'p', |self, buf| { buf.put_slice(self.data); });

pub struct CancelRequest {
    pub process_id: i32,
    pub secret_key: i32,
}
impl FrontendProtocol for CancelRequest {
    const MSGTYPE: Option<u8> = None;
    fn encode(&self, buf: &mut BytesMut) {
        write_message(buf, None, |buf| {
            buf.put_i32((1234 << 16) | 5678);
            buf.put_i32(self.process_id);
            buf.put_i32(self.secret_key);
        });
    }
}

/// The fastpath function-call request, used by the large-object API.
pub struct FunctionCall<'a> {
    pub oid: u32,
    pub args: &'a [Option<&'a [u8]>],
}
simple!(FunctionCall, b'F', |self, buf| {
    buf.put_i32(self.oid as i32);
    buf.put_i16(1); // one arg-format code applies to all args
    buf.put_i16(1); // binary
    buf.put_i16(self.args.len() as i16);
    for arg in self.args {
        match arg {
            Some(bytes) => {
                buf.put_i32(bytes.len() as i32);
                buf.put_slice(bytes);
            }
            None => buf.put_i32(-1),
        }
    }
    buf.put_i16(1); // result format: binary
});
