//! The per-connection session state machine (SPEC_FULL.md §4.6–4.7).
pub mod large_object;
mod request;

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::common::{span, verbose};
use crate::data::{Data, Format, Row, RowInfo};
use crate::error::{ClientError, Error, Result};
use crate::io::{Transport, Want};
use crate::options::Options;
use crate::protocol::auth::{md5_password, ScramSha256};
use crate::protocol::backend::{
    Authentication, BackendKeyData, BackendMessage, NotificationResponse, ReadyForQuery, TransactionStatus,
};
use crate::protocol::frontend::{
    Bind, Close, DescribeTarget, Execute, Parse, PasswordMessage, Query, SaslInitialResponse, SaslResponse, Startup,
    Sync as SyncMessage, Terminate,
};
use crate::statement::{PreparedStatement, StatementName};

pub use request::{DatabaseError, Response};
use request::{PendingRequest, RequestKind};

static NEXT_SESSION_EPOCH: AtomicU64 = AtomicU64::new(1);

/// Lifecycle state of a [`Connection`]'s transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    Connected,
    /// The transport broke mid-request; every pending request now resolves to
    /// `connection_lost`.
    Lost,
}

/// A single PostgreSQL session (SPEC_FULL.md §4.6). Not `Sync`; callers wanting
/// concurrent connections use multiple `Connection`s, typically via [`crate::pool::Pool`].
pub struct Connection {
    transport: Transport,
    options: Options,
    state: ConnectionState,
    session_epoch: u64,
    transaction_status: TransactionStatus,
    backend_key_data: Option<BackendKeyData>,
    queue: VecDeque<PendingRequest>,
    statements: HashMap<String, PreparedStatement>,
    notice_queue: VecDeque<crate::protocol::backend::ErrorResponse>,
    notification_queue: VecDeque<NotificationResponse>,
    on_notice: Option<Box<dyn FnMut(crate::protocol::backend::ErrorResponse) + Send>>,
    on_notification: Option<Box<dyn FnMut(NotificationResponse) + Send>>,
    result_format: Format,
    current_row_info: Option<Arc<RowInfo>>,
    lo_oids: Option<large_object::LargeObjectOids>,
}

impl Connection {
    /// Establish a transport, optionally negotiate TLS, and run the startup/auth
    /// handshake (SPEC_FULL.md §4.6's "establishment" responsibility).
    pub fn connect(options: Options) -> Result<Self> {
        span!("connect");
        options.validate().map_err(Error::from)?;

        let mut transport = Transport::connect(&options.endpoint, options.connect_timeout)?;

        #[cfg(feature = "tls")]
        if options.tls.enabled {
            crate::io::tls::negotiate(&mut transport, options.host_for_tls(), &options.tls, options.connect_timeout)?;
        }

        let mut conn = Self {
            transport,
            session_epoch: NEXT_SESSION_EPOCH.fetch_add(1, Ordering::SeqCst),
            options,
            state: ConnectionState::Connected,
            transaction_status: TransactionStatus::Idle,
            backend_key_data: None,
            queue: VecDeque::new(),
            statements: HashMap::new(),
            notice_queue: VecDeque::new(),
            notification_queue: VecDeque::new(),
            on_notice: None,
            on_notification: None,
            result_format: Format::Text,
            current_row_info: None,
            lo_oids: None,
        };
        conn.startup()?;
        Ok(conn)
    }

    fn timeout(&self) -> Option<Duration> {
        self.options.wait_response_timeout
    }

    fn startup(&mut self) -> Result<()> {
        let extra: &[(&str, &str)] = &[];
        self.transport.send(Startup { user: &self.options.username, database: self.options.database.as_deref(), extra });
        self.transport.flush(self.options.connect_timeout)?;

        self.authenticate()?;

        loop {
            match self.transport.recv::<BackendMessage>(self.options.connect_timeout)? {
                BackendMessage::ReadyForQuery(ReadyForQuery { status }) => {
                    self.transaction_status = status;
                    break;
                }
                BackendMessage::BackendKeyData(key_data) => self.backend_key_data = Some(key_data),
                BackendMessage::ParameterStatus(_) => {} // observed and discarded; no session GUC cache is kept
                BackendMessage::ErrorResponse(e) => return Err(e.into()),
                other => return Err(other.unexpected("startup").into()),
            }
        }
        Ok(())
    }

    fn authenticate(&mut self) -> Result<()> {
        loop {
            match self.transport.recv::<BackendMessage>(self.options.connect_timeout)? {
                BackendMessage::Authentication(Authentication::Ok) => return Ok(()),
                BackendMessage::Authentication(Authentication::CleartextPassword) => {
                    let password = self.password()?;
                    self.transport.send(PasswordMessage { password });
                    self.transport.flush(self.options.connect_timeout)?;
                }
                BackendMessage::Authentication(Authentication::Md5Password { salt }) => {
                    let password = self.password()?;
                    let hashed = md5_password(&self.options.username, password, salt);
                    self.transport.send(PasswordMessage { password: &hashed });
                    self.transport.flush(self.options.connect_timeout)?;
                }
                BackendMessage::Authentication(Authentication::Sasl { mechanisms }) => {
                    if !mechanisms.iter().any(|m| m == "SCRAM-SHA-256") {
                        return Err(Error::client(ClientError::AuthenticationFailed(
                            "server offered no supported SASL mechanism".into(),
                        )));
                    }
                    self.scram_exchange()?;
                    return Ok(());
                }
                BackendMessage::ErrorResponse(e) => return Err(e.into()),
                other => return Err(other.unexpected("authentication").into()),
            }
        }
    }

    fn password(&self) -> Result<&str> {
        self.options
            .password
            .as_deref()
            .ok_or_else(|| Error::client(ClientError::AuthenticationFailed("server requires a password".into())))
    }

    fn scram_exchange(&mut self) -> Result<()> {
        let channel_binding = self.channel_binding();
        let mut scram = ScramSha256::new(self.password()?, channel_binding);

        let first = scram.client_first_message();
        self.transport.send(SaslInitialResponse { mechanism: "SCRAM-SHA-256", data: first.as_bytes() });
        self.transport.flush(self.options.connect_timeout)?;

        let server_first = match self.transport.recv::<BackendMessage>(self.options.connect_timeout)? {
            BackendMessage::Authentication(Authentication::SaslContinue { data }) => data,
            BackendMessage::ErrorResponse(e) => return Err(e.into()),
            other => return Err(other.unexpected("SCRAM server-first-message").into()),
        };

        let final_msg = scram.client_final_message(&server_first)?;
        self.transport.send(SaslResponse { data: final_msg.as_bytes() });
        self.transport.flush(self.options.connect_timeout)?;

        let server_final = match self.transport.recv::<BackendMessage>(self.options.connect_timeout)? {
            BackendMessage::Authentication(Authentication::SaslFinal { data }) => data,
            BackendMessage::ErrorResponse(e) => return Err(e.into()),
            other => return Err(other.unexpected("SCRAM server-final-message").into()),
        };
        scram.verify_server_final(&server_final)?;

        match self.transport.recv::<BackendMessage>(self.options.connect_timeout)? {
            BackendMessage::Authentication(Authentication::Ok) => Ok(()),
            BackendMessage::ErrorResponse(e) => Err(e.into()),
            other => Err(other.unexpected("post-SCRAM AuthenticationOk").into()),
        }
    }

    #[cfg(feature = "tls")]
    fn channel_binding(&self) -> Option<Vec<u8>> {
        self.transport.tls_server_end_point_binding()
    }

    #[cfg(not(feature = "tls"))]
    fn channel_binding(&self) -> Option<Vec<u8>> {
        None
    }

    /// `true` iff the queue is empty and the last-known transaction status is idle.
    pub fn is_ready_for_request(&self) -> bool {
        self.state == ConnectionState::Connected
            && self.queue.is_empty()
            && self.transaction_status == TransactionStatus::Idle
    }

    /// `true` iff a non-blocking (extended-protocol) request can be enqueued: the
    /// transport is alive and not mid-request, regardless of transaction status.
    pub fn is_ready_for_nio_request(&self) -> bool {
        self.state == ConnectionState::Connected && self.queue.is_empty()
    }

    pub fn backend_key_data(&self) -> Option<BackendKeyData> {
        self.backend_key_data
    }

    pub fn session_epoch(&self) -> u64 {
        self.session_epoch
    }

    pub fn on_notice(&mut self, callback: impl FnMut(crate::protocol::backend::ErrorResponse) + Send + 'static) {
        self.on_notice = Some(Box::new(callback));
    }

    pub fn on_notification(&mut self, callback: impl FnMut(NotificationResponse) + Send + 'static) {
        self.on_notification = Some(Box::new(callback));
    }

    pub fn drain_notices(&mut self) -> Vec<crate::protocol::backend::ErrorResponse> {
        self.notice_queue.drain(..).collect()
    }

    pub fn drain_notifications(&mut self) -> Vec<NotificationResponse> {
        self.notification_queue.drain(..).collect()
    }

    fn require_ready(&self) -> Result<()> {
        if self.state == ConnectionState::Lost {
            return Err(Error::client(ClientError::ConnectionLost));
        }
        if !self.queue.is_empty() {
            return Err(Error::client(ClientError::NotReadyForRequest));
        }
        Ok(())
    }

    /// Simple-query submission (SPEC_FULL.md §4.6): sends `Query` and collects every
    /// response up to and including `ReadyForQuery`. Row data, unlike a naive
    /// discard-everything implementation, is fully assembled and returned.
    pub fn perform(&mut self, sql: &str) -> Result<Vec<Response>> {
        self.require_ready()?;
        self.transport.send(Query { sql });
        self.transport.flush(self.timeout())?;
        self.queue.push_back(PendingRequest { kind: RequestKind::SimpleQuery, row_info: None });

        let mut responses = Vec::new();
        loop {
            match self.wait_response(self.timeout())? {
                Response::Ready => break,
                other => responses.push(other),
            }
        }
        Ok(responses)
    }

    /// Send `Parse`+`Sync` for `sql` under the wire name `name` (`""` for the unnamed
    /// statement, implicitly closed at the next `Parse` against it). On success the
    /// statement is registered and its handle returned.
    pub fn prepare(&mut self, name: &str, sql: &str) -> Result<StatementName> {
        self.require_ready()?;
        let mut stmt = PreparedStatement::draft(name, sql, self.session_epoch);
        let statement_name = stmt.name().clone();

        self.transport.send(Parse { statement: statement_name.as_str(), sql, param_types: &[] });
        self.transport.send(SyncMessage);
        self.transport.flush(self.timeout())?;
        self.queue.push_back(PendingRequest { kind: RequestKind::Parse { name: statement_name.clone() }, row_info: None });

        loop {
            match self.wait_response(self.timeout())? {
                Response::Ready => break,
                Response::PreparedStatementRef(_) => {}
                _ => {}
            }
        }
        stmt.mark_prepared();
        self.statements.insert(statement_name.as_str().to_string(), stmt);
        Ok(statement_name)
    }

    /// Send `Describe(Statement)`+`Sync`; populates parameter OIDs and row shape.
    pub fn describe(&mut self, name: &StatementName) -> Result<()> {
        self.require_ready()?;
        self.statements
            .get(name.as_str())
            .ok_or_else(|| Error::client(ClientError::InvalidArgument(format!("unknown statement {name}"))))?;

        self.transport.send(crate::protocol::frontend::Describe { target: DescribeTarget::Statement, name: name.as_str() });
        self.transport.send(SyncMessage);
        self.transport.flush(self.timeout())?;
        self.queue.push_back(PendingRequest { kind: RequestKind::Describe { name: name.clone() }, row_info: None });

        let mut param_types = Vec::new();
        let mut row_info = None;
        loop {
            match self.transport.recv::<BackendMessage>(self.timeout())? {
                BackendMessage::ParameterDescription(desc) => param_types = desc.type_oids,
                BackendMessage::RowDescription(desc) => row_info = Some(Arc::new(RowInfo::from_description(desc.fields))),
                BackendMessage::NoData => row_info = None,
                BackendMessage::ReadyForQuery(rfq) => {
                    self.transaction_status = rfq.status;
                    self.queue.pop_front();
                    break;
                }
                BackendMessage::ErrorResponse(e) => {
                    self.drain_to_ready()?;
                    return Err(e.into());
                }
                BackendMessage::NoticeResponse(n) => self.route_notice(n.0),
                other => return Err(other.unexpected("describe").into()),
            }
        }

        if let Some(stmt) = self.statements.get_mut(name.as_str()) {
            stmt.mark_described(param_types, row_info);
        }
        Ok(())
    }

    /// Send `Bind`+`Execute`+`Sync` against `name` (or the unnamed portal), collecting
    /// every row and the final completion tag.
    pub fn execute(&mut self, name: &StatementName, params: &[Option<Data>], result_format: Format) -> Result<Vec<Response>> {
        self.require_ready()?;
        let row_info = self
            .statements
            .get(name.as_str())
            .ok_or_else(|| Error::client(ClientError::InvalidArgument(format!("unknown statement {name}"))))?
            .row_info()
            .cloned();

        let param_formats = [Format::Text.code()];
        let result_formats = [result_format.code()];
        let owned_params: Vec<Option<&[u8]>> = params.iter().map(|p| p.as_ref().map(Data::bytes)).collect();

        self.transport.send(Bind {
            portal: "",
            statement: name.as_str(),
            param_formats: &param_formats,
            params: &owned_params,
            result_formats: &result_formats,
        });
        self.transport.send(Execute { portal: "", max_rows: 0 });
        self.transport.send(SyncMessage);
        self.transport.flush(self.timeout())?;
        self.queue.push_back(PendingRequest {
            kind: RequestKind::BindExecute { name: name.clone(), portal: String::new() },
            row_info,
        });

        let mut responses = Vec::new();
        loop {
            match self.wait_response(self.timeout())? {
                Response::Ready => break,
                other => responses.push(other),
            }
        }
        if let Some(stmt) = self.statements.get_mut(name.as_str()) {
            stmt.mark_executed();
        }
        Ok(responses)
    }

    /// Send `Close(Statement)`+`Sync` and drop the local entry.
    pub fn unprepare(&mut self, name: &StatementName) -> Result<()> {
        self.require_ready()?;
        self.transport.send(Close { target: DescribeTarget::Statement, name: name.as_str() });
        self.transport.send(SyncMessage);
        self.transport.flush(self.timeout())?;
        self.queue.push_back(PendingRequest { kind: RequestKind::Close { name: name.clone() }, row_info: None });

        loop {
            if let Response::Ready = self.wait_response(self.timeout())? {
                break;
            }
        }
        if let Some(mut stmt) = self.statements.remove(name.as_str()) {
            stmt.mark_closed();
        }
        Ok(())
    }

    /// Block until the next response frame for the head-of-queue request arrives.
    pub fn wait_response(&mut self, timeout: Option<Duration>) -> Result<Response> {
        if self.state == ConnectionState::Lost {
            return Err(Error::client(ClientError::ConnectionLost));
        }
        loop {
            let message = match self.transport.recv::<BackendMessage>(timeout) {
                Ok(message) => message,
                Err(e) => {
                    self.fail_queue();
                    return Err(e);
                }
            };

            if let Some(response) = self.dispatch(message)? {
                return Ok(response);
            }
        }
    }

    /// Repeatedly call [`Connection::wait_response`] until the current request's
    /// `ReadyForQuery` is observed, invoking `callback` with every response in between.
    pub fn process_responses(&mut self, mut callback: impl FnMut(Response) -> Result<()>) -> Result<()> {
        loop {
            match self.wait_response(self.timeout())? {
                Response::Ready => return Ok(()),
                other => callback(other)?,
            }
        }
    }

    /// Dispatch one inbound frame to (a) the head request's response, (b) a signal
    /// queue, or (c) the prepared-statement registry. Returns `Some` when the frame
    /// produces a caller-visible [`Response`].
    fn dispatch(&mut self, message: BackendMessage) -> Result<Option<Response>> {
        match message {
            BackendMessage::RowDescription(desc) => {
                self.current_row_info = Some(Arc::new(RowInfo::from_description(desc.fields)));
                Ok(None)
            }
            BackendMessage::NoData => {
                self.current_row_info = None;
                Ok(None)
            }
            BackendMessage::DataRow(row) => {
                let info = self
                    .current_row_info
                    .clone()
                    .or_else(|| self.queue.front().and_then(|r| r.row_info.clone()))
                    .ok_or_else(|| Error::client(ClientError::ProtocolViolation("DataRow with no known RowInfo".into())))?;
                Ok(Some(Response::Row(Row::new(info, row.values))))
            }
            BackendMessage::CommandComplete(tag) => {
                self.current_row_info = None;
                Ok(Some(Response::Completion(tag)))
            }
            BackendMessage::EmptyQueryResponse => Ok(None),
            BackendMessage::ParseComplete => {
                if let Some(PendingRequest { kind: RequestKind::Parse { name }, .. }) = self.queue.front() {
                    Ok(Some(Response::PreparedStatementRef(name.clone())))
                } else {
                    Ok(None)
                }
            }
            BackendMessage::BindComplete | BackendMessage::CloseComplete | BackendMessage::PortalSuspended => Ok(None),
            BackendMessage::ParameterDescription(_) => Ok(None),
            BackendMessage::ParameterStatus(_) => Ok(None),
            BackendMessage::BackendKeyData(key_data) => {
                self.backend_key_data = Some(key_data);
                Ok(None)
            }
            BackendMessage::NoticeResponse(notice) => {
                self.route_notice(notice.0);
                Ok(None)
            }
            BackendMessage::NotificationResponse(notification) => {
                self.route_notification(notification);
                Ok(None)
            }
            BackendMessage::ErrorResponse(error) => {
                self.drain_to_ready()?;
                Err(error.into())
            }
            BackendMessage::ReadyForQuery(rfq) => {
                self.transaction_status = rfq.status;
                self.queue.pop_front();
                self.current_row_info = None;
                Ok(Some(Response::Ready))
            }
            BackendMessage::Authentication(_) => {
                Err(Error::client(ClientError::ProtocolViolation("unexpected authentication message".into())))
            }
            BackendMessage::FunctionCallResponse(_) => {
                Err(Error::client(ClientError::ProtocolViolation("unrouted FunctionCallResponse".into())))
            }
        }
    }

    /// After an `ErrorResponse`, the backend sends no further per-request messages
    /// except a trailing `ReadyForQuery`; consume up to and including it.
    fn drain_to_ready(&mut self) -> Result<()> {
        loop {
            match self.transport.recv::<BackendMessage>(self.timeout())? {
                BackendMessage::ReadyForQuery(rfq) => {
                    self.transaction_status = rfq.status;
                    self.queue.pop_front();
                    self.current_row_info = None;
                    return Ok(());
                }
                BackendMessage::NoticeResponse(notice) => self.route_notice(notice.0),
                BackendMessage::NotificationResponse(notification) => self.route_notification(notification),
                _ => {}
            }
        }
    }

    fn route_notice(&mut self, notice: crate::protocol::backend::ErrorResponse) {
        verbose!(message = notice.message(), "notice");
        match &mut self.on_notice {
            Some(cb) => cb(notice),
            None => self.notice_queue.push_back(notice),
        }
    }

    fn route_notification(&mut self, notification: NotificationResponse) {
        match &mut self.on_notification {
            Some(cb) => cb(notification),
            None => self.notification_queue.push_back(notification),
        }
    }

    /// Resolve every pending request with `connection_lost` and mark the connection dead.
    fn fail_queue(&mut self) {
        self.state = ConnectionState::Lost;
        self.queue.clear();
    }

    pub(crate) fn transport_mut(&mut self) -> &mut Transport {
        &mut self.transport
    }

    pub(crate) fn lo_oids_mut(&mut self) -> &mut Option<large_object::LargeObjectOids> {
        &mut self.lo_oids
    }

    /// Block on readiness without consuming a message; exposed for callers that want
    /// to multiplex on the underlying descriptor themselves.
    pub fn poll(&mut self, want: Want, timeout: Option<Duration>) -> Result<()> {
        self.transport.wait(want, timeout)?;
        Ok(())
    }

    /// Send `Terminate` and close the transport. Does not flush a pending request.
    pub fn disconnect(mut self) -> Result<()> {
        self.transport.send(Terminate);
        let _ = self.transport.flush(self.timeout());
        self.transport.close();
        Ok(())
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state)
            .field("transaction_status", &self.transaction_status)
            .field("session_epoch", &self.session_epoch)
            .finish_non_exhaustive()
    }
}

/// Discover the cancellation key (process id + secret key) for an established
/// connection, used to build a `CancelRequest` on a separate transport.
pub fn cancel_key(conn: &Connection) -> Option<BackendKeyData> {
    conn.backend_key_data()
}

/// Issue a `CancelRequest` on a fresh transport (SPEC_FULL.md §4.2/§4.7). Does not
/// touch `main`'s transport; safe to call from another thread while `main` blocks in
/// [`Connection::wait_response`].
pub fn cancel(options: &Options, key: BackendKeyData, timeout: Option<Duration>) -> Result<()> {
    let mut transport = Transport::connect(&options.endpoint, timeout)?;
    transport.send(crate::protocol::frontend::CancelRequest { process_id: key.process_id, secret_key: key.secret_key });
    transport.flush(timeout)?;
    transport.close();
    Ok(())
}
