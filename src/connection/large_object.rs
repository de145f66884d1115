//! Large-object fastpath API (SPEC_FULL.md §4.6): `lo_create`/`lo_open`/`lo_close`/
//! `lo_read`/`lo_write`/`lo_seek`/`lo_tell`/`lo_truncate`. Every operation requires an
//! open transaction and goes over PostgreSQL's fastpath function-call interface, whose
//! target OIDs (`lo_creat`, `lo_open`, ...) are discovered lazily from `pg_proc`.
use bytes::Buf;

use super::Connection;
use crate::error::{ClientError, Error, Result};
use crate::protocol::backend::BackendMessage;
use crate::protocol::frontend::FunctionCall;

/// Seek origin for [`Connection::lo_seek`], mirroring POSIX `lseek(2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Begin,
    Current,
    End,
}

impl Whence {
    fn code(self) -> i32 {
        match self {
            Whence::Begin => 0,
            Whence::Current => 1,
            Whence::End => 2,
        }
    }
}

/// OIDs of the `lo_*` fastpath functions, resolved once per connection.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct LargeObjectOids {
    pub creat: u32,
    pub open: u32,
    pub close: u32,
    pub read: u32,
    pub write: u32,
    pub lseek64: u32,
    pub tell64: u32,
    pub truncate64: u32,
}

const READ_WRITE: i32 = 0x20000 | 0x40000;

impl Connection {
    fn lo_oids(&mut self) -> Result<LargeObjectOids> {
        if let Some(oids) = self.lo_oids_mut() {
            return Ok(*oids);
        }
        let names = ["lo_creat", "lo_open", "lo_close", "loread", "lowrite", "lo_lseek64", "lo_tell64", "lo_truncate64"];
        let sql = format!(
            "SELECT proname, oid FROM pg_proc WHERE proname = ANY(ARRAY[{}])",
            names.iter().map(|n| format!("'{n}'")).collect::<Vec<_>>().join(",")
        );
        let responses = self.perform(&sql)?;
        let mut oids = LargeObjectOids::default();
        for response in responses {
            if let super::Response::Row(row) = response {
                let name = row.get(0).and_then(|d| d.as_str().ok().map(str::to_string));
                let oid: Option<u32> = row.get(1).and_then(|d| d.as_str().ok().and_then(|s| s.parse().ok()));
                match (name.as_deref(), oid) {
                    (Some("lo_creat"), Some(oid)) => oids.creat = oid,
                    (Some("lo_open"), Some(oid)) => oids.open = oid,
                    (Some("lo_close"), Some(oid)) => oids.close = oid,
                    (Some("loread"), Some(oid)) => oids.read = oid,
                    (Some("lowrite"), Some(oid)) => oids.write = oid,
                    (Some("lo_lseek64"), Some(oid)) => oids.lseek64 = oid,
                    (Some("lo_tell64"), Some(oid)) => oids.tell64 = oid,
                    (Some("lo_truncate64"), Some(oid)) => oids.truncate64 = oid,
                    _ => {}
                }
            }
        }
        if oids.creat == 0 || oids.open == 0 {
            return Err(Error::client(ClientError::Generic(
                "large-object fastpath functions not found in pg_proc".into(),
            )));
        }
        *self.lo_oids_mut() = Some(oids);
        Ok(oids)
    }

    fn function_call(&mut self, oid: u32, args: &[Option<&[u8]>]) -> Result<Option<bytes::Bytes>> {
        self.require_lo_ready()?;
        self.transport_mut().send(FunctionCall { oid, args });
        self.transport_mut().flush(None)?;
        loop {
            match self.transport_mut().recv::<BackendMessage>(None)? {
                BackendMessage::FunctionCallResponse(r) => {
                    // drain the trailing ReadyForQuery before returning
                    loop {
                        if let BackendMessage::ReadyForQuery(_) = self.transport_mut().recv::<BackendMessage>(None)? {
                            break;
                        }
                    }
                    return Ok(r.value);
                }
                BackendMessage::ErrorResponse(e) => return Err(e.into()),
                BackendMessage::NoticeResponse(_) => {}
                other => return Err(other.unexpected("fastpath function call").into()),
            }
        }
    }

    fn require_lo_ready(&self) -> Result<()> {
        if !self.is_ready_for_nio_request() {
            return Err(Error::client(ClientError::NotReadyForRequest));
        }
        Ok(())
    }

    /// Create a new large object, returning its OID. Requires an open transaction.
    pub fn lo_create(&mut self) -> Result<u32> {
        let oid = self.lo_oids()?.creat;
        let result = self.function_call(oid, &[Some(&(-1i32).to_be_bytes())])?;
        Ok(result.map(|mut b| b.get_u32()).unwrap_or(0))
    }

    /// Open a large object for reading and/or writing, returning its fastpath
    /// descriptor.
    pub fn lo_open(&mut self, lo_oid: u32) -> Result<i32> {
        let oid = self.lo_oids()?.open;
        let result = self.function_call(oid, &[Some(&lo_oid.to_be_bytes()), Some(&READ_WRITE.to_be_bytes())])?;
        Ok(result.map(|mut b| b.get_i32()).unwrap_or(-1))
    }

    pub fn lo_close(&mut self, fd: i32) -> Result<()> {
        let oid = self.lo_oids()?.close;
        self.function_call(oid, &[Some(&fd.to_be_bytes())])?;
        Ok(())
    }

    pub fn lo_read(&mut self, fd: i32, max_len: i32) -> Result<Vec<u8>> {
        let oid = self.lo_oids()?.read;
        let result = self.function_call(oid, &[Some(&fd.to_be_bytes()), Some(&max_len.to_be_bytes())])?;
        Ok(result.map(|b| b.to_vec()).unwrap_or_default())
    }

    pub fn lo_write(&mut self, fd: i32, data: &[u8]) -> Result<i32> {
        let oid = self.lo_oids()?.write;
        let result = self.function_call(oid, &[Some(&fd.to_be_bytes()), Some(data)])?;
        Ok(result.map(|mut b| b.get_i32()).unwrap_or(-1))
    }

    pub fn lo_seek(&mut self, fd: i32, offset: i64, whence: Whence) -> Result<i64> {
        let oid = self.lo_oids()?.lseek64;
        let result = self.function_call(oid, &[Some(&fd.to_be_bytes()), Some(&offset.to_be_bytes()), Some(&whence.code().to_be_bytes())])?;
        Ok(result.map(|mut b| b.get_i64()).unwrap_or(-1))
    }

    pub fn lo_tell(&mut self, fd: i32) -> Result<i64> {
        let oid = self.lo_oids()?.tell64;
        let result = self.function_call(oid, &[Some(&fd.to_be_bytes())])?;
        Ok(result.map(|mut b| b.get_i64()).unwrap_or(-1))
    }

    pub fn lo_truncate(&mut self, fd: i32, size: i64) -> Result<()> {
        let oid = self.lo_oids()?.truncate64;
        self.function_call(oid, &[Some(&fd.to_be_bytes()), Some(&size.to_be_bytes())])?;
        Ok(())
    }
}
