//! Per-connection handler: handshake, auth, and request dispatch.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive Handshake → validate version
//!   2. Authenticate token → get a `Caller`
//!   3. Send HandshakeAck
//!   4. Loop: receive a request → check the caller's role → reply once
//!
//! Errors after the handshake are answered with `Response::Error` and
//! the connection stays open.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rollcall_protocol::{
    ClassroomId, Codec, Envelope, ExceptionEntry, Identity, ProtocolError, Request, Response, Role,
};
use rollcall_registry::{AttendanceStore, ClassroomDirectory, RegistryError, SessionHandle};
use rollcall_session::{Authenticator, Caller};
use rollcall_transport::{Connection, WebSocketConnection};

use crate::RollcallError;
use crate::server::{PROTOCOL_VERSION, ServerState};

// ---------------------------------------------------------------------------
// Rejection
// ---------------------------------------------------------------------------

/// A request the server refuses, as it goes out on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Rejection {
    code: u16,
    reason: &'static str,
    message: String,
}

impl Rejection {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: 400,
            reason: "bad_request",
            message: message.into(),
        }
    }

    fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            code: 401,
            reason: "unauthorized",
            message: message.into(),
        }
    }

    fn forbidden(message: impl Into<String>) -> Self {
        Self {
            code: 403,
            reason: "forbidden",
            message: message.into(),
        }
    }

    fn into_response(self) -> Response {
        Response::Error {
            code: self.code,
            reason: self.reason.to_string(),
            message: self.message,
        }
    }
}

impl From<RegistryError> for Rejection {
    fn from(err: RegistryError) -> Self {
        let code = match &err {
            RegistryError::ClassroomNotFound(_) => 404,
            RegistryError::Store(_) | RegistryError::Session(_) => 500,
            _ => 400,
        };
        Self {
            code,
            reason: err.reason(),
            message: err.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Connection lifecycle
// ---------------------------------------------------------------------------

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A, D, S, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A, D, S, C>>,
) -> Result<(), RollcallError>
where
    A: Authenticator,
    D: ClassroomDirectory,
    S: AttendanceStore,
    C: Codec,
{
    let conn_id = conn.id();
    let start = Instant::now();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    // --- Step 1: Handshake ---
    let caller = perform_handshake(&conn, &state, &start).await?;
    tracing::info!(
        %conn_id,
        identity = %caller.identity,
        role = %caller.role,
        "connection authenticated"
    );

    // --- Step 2: Request loop ---
    let mut seq: u64 = 1;
    let idle_timeout = state.config.idle_timeout();

    loop {
        let data = match tokio::time::timeout(idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%conn_id, identity = %caller.identity, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%conn_id, identity = %caller.identity, "connection timed out");
                break;
            }
        };

        let envelope: Envelope<Request> = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode envelope");
                let rejection = Rejection::bad_request(format!("malformed request: {e}"));
                send_error(&conn, &state.codec, rejection, next_seq(&mut seq), None, &start)
                    .await?;
                continue;
            }
        };

        let reply_to = envelope.seq;
        if let Request::Disconnect { reason } = &envelope.payload {
            tracing::info!(%conn_id, identity = %caller.identity, %reason, "client disconnected");
            let _ = conn.close().await;
            break;
        }

        let kind = envelope.payload.kind();
        let response = match handle_request(&state, &caller, envelope.payload).await {
            Ok(response) => response,
            Err(rejection) => {
                tracing::debug!(
                    %conn_id,
                    identity = %caller.identity,
                    request = kind,
                    code = rejection.code,
                    reason = rejection.reason,
                    "request rejected"
                );
                rejection.into_response()
            }
        };

        let reply = Envelope::reply(next_seq(&mut seq), elapsed_ms(&start), reply_to, response);
        send(&conn, &state.codec, &reply).await?;
    }

    Ok(())
}

/// Performs the initial handshake: receive Handshake, validate, auth, send Ack.
async fn perform_handshake<A, D, S, C>(
    conn: &WebSocketConnection,
    state: &ServerState<A, D, S, C>,
    start: &Instant,
) -> Result<Caller, RollcallError>
where
    A: Authenticator,
    D: ClassroomDirectory,
    S: AttendanceStore,
    C: Codec,
{
    let data = match tokio::time::timeout(state.config.handshake_timeout(), conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before handshake".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let envelope: Envelope<Request> = match state.codec.decode(&data) {
        Ok(env) => env,
        Err(e) => {
            let rejection = Rejection::bad_request(format!("malformed handshake: {e}"));
            send_error(conn, &state.codec, rejection, 0, None, start).await?;
            return Err(e.into());
        }
    };
    let reply_to = Some(envelope.seq);

    let (version, token) = match envelope.payload {
        Request::Handshake { version, token } => (version, token),
        other => {
            let rejection = Rejection::bad_request("expected Handshake");
            send_error(conn, &state.codec, rejection, 0, reply_to, start).await?;
            return Err(ProtocolError::InvalidMessage(format!(
                "first message must be Handshake, got {}",
                other.kind()
            ))
            .into());
        }
    };

    if version != PROTOCOL_VERSION {
        let rejection = Rejection::bad_request(format!(
            "version mismatch: expected {PROTOCOL_VERSION}, got {version}"
        ));
        send_error(conn, &state.codec, rejection, 0, reply_to, start).await?;
        return Err(ProtocolError::InvalidMessage("protocol version mismatch".into()).into());
    }

    let caller = match state.auth.authenticate(&token).await {
        Ok(caller) => caller,
        Err(e) => {
            send_error(
                conn,
                &state.codec,
                Rejection::unauthorized("unauthorized"),
                0,
                reply_to,
                start,
            )
            .await?;
            return Err(e.into());
        }
    };

    let ack = Envelope {
        seq: 0,
        timestamp: elapsed_ms(start),
        reply_to,
        payload: Response::HandshakeAck {
            identity: caller.identity.clone(),
            role: caller.role,
            server_time: wall_clock_ms(),
        },
    };
    send(conn, &state.codec, &ack).await?;

    Ok(caller)
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Answers one authenticated request.
async fn handle_request<A, D, S, C>(
    state: &ServerState<A, D, S, C>,
    caller: &Caller,
    request: Request,
) -> Result<Response, Rejection>
where
    A: Authenticator,
    D: ClassroomDirectory,
    S: AttendanceStore,
    C: Codec,
{
    match request {
        Request::Handshake { .. } => Err(Rejection::bad_request("already authenticated")),

        Request::Heartbeat { client_time } => Ok(Response::HeartbeatAck {
            client_time,
            server_time: wall_clock_ms(),
        }),

        // Intercepted by the connection loop before dispatch.
        Request::Disconnect { .. } => Err(Rejection::bad_request("disconnect is not a request")),

        Request::StartSession { classroom_id } => {
            require_role(caller, Role::Teacher)?;
            let classroom = state.directory.classroom(classroom_id).await?;
            if classroom.teacher != caller.identity {
                return Err(Rejection::forbidden(format!(
                    "{} does not teach classroom {classroom_id}",
                    caller.identity
                )));
            }
            let started = state
                .registry
                .start(classroom_id, classroom.teacher, classroom.students)
                .await?;
            Ok(Response::SessionStarted {
                classroom_id,
                round_id: started.round_id,
                students: started.students,
            })
        }

        Request::PassToken {
            classroom_id,
            from,
            to,
        } => {
            state.registry.pass_token(classroom_id, &from, &to).await?;
            Ok(Response::TokenPassed {
                classroom_id,
                from,
                to,
            })
        }

        Request::AddException {
            classroom_id,
            identity,
        } => {
            state.registry.add_exception(classroom_id, &identity).await?;
            Ok(Response::ExceptionAdded {
                classroom_id,
                identity,
            })
        }

        Request::ListExceptions { classroom_id } => {
            let handle = session_for_teacher(state, caller, classroom_id).await?;
            let identities = handle.exceptions().await?;
            let mut exceptions = Vec::with_capacity(identities.len());
            for identity in identities {
                let name = state.directory.display_name(&identity).await;
                exceptions.push(ExceptionEntry { identity, name });
            }
            Ok(Response::ExceptionList {
                classroom_id,
                exceptions,
            })
        }

        Request::MarkPresent {
            classroom_id,
            identities,
        } => {
            if identities.is_empty() {
                return Err(Rejection::bad_request("identities must not be empty"));
            }
            let handle = session_for_teacher(state, caller, classroom_id).await?;
            // Fresh roster, so overrides follow enrollment changes made
            // since the round started.
            let classroom = state.directory.classroom(classroom_id).await?;
            let count = handle
                .mark_present(&identities, &classroom.students)
                .await?;
            Ok(Response::MarkedPresent {
                classroom_id,
                count,
            })
        }

        Request::Finalize {
            classroom_id,
            present_from_exceptions,
        } => {
            session_for_teacher(state, caller, classroom_id).await?;
            let date = Utc::now().date_naive();
            let report = state
                .registry
                .finalize_and_remove(classroom_id, &present_from_exceptions, &state.store, date)
                .await?;
            Ok(Response::Finalized {
                classroom_id,
                summary: report.summary(),
                attendance: report.attendance.entries(),
                round_id: report.round_id,
                date: report.date,
            })
        }

        Request::SessionStatus { classroom_id } => Ok(Response::SessionStatus {
            classroom_id,
            active: state.registry.is_active(classroom_id).await,
        }),

        Request::ListActive => {
            require_role(caller, Role::Teacher)?;
            Ok(Response::ActiveSessions {
                classrooms: state.registry.list_active().await,
            })
        }

        Request::AttendanceHistory => {
            require_role(caller, Role::Student)?;
            let records = state
                .store
                .history(&caller.identity)
                .await
                .map_err(RegistryError::from)?;
            Ok(Response::AttendanceHistory { records })
        }
    }
}

fn require_role(caller: &Caller, role: Role) -> Result<(), Rejection> {
    if caller.role == role {
        Ok(())
    } else {
        Err(Rejection::forbidden(format!("requires the {role} role")))
    }
}

/// The live round for `classroom_id`, provided `caller` is the teacher
/// who started it.
async fn session_for_teacher<A, D, S, C>(
    state: &ServerState<A, D, S, C>,
    caller: &Caller,
    classroom_id: ClassroomId,
) -> Result<SessionHandle, Rejection> {
    let handle = state
        .registry
        .get(classroom_id)
        .await
        .ok_or(RegistryError::NoActiveSession(classroom_id))?;
    let teacher: Identity = handle.teacher().await;
    if teacher != caller.identity {
        return Err(Rejection::forbidden(format!(
            "only the teacher of classroom {classroom_id} may do this"
        )));
    }
    Ok(handle)
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

async fn send(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    envelope: &Envelope<Response>,
) -> Result<(), RollcallError> {
    let bytes = codec.encode(envelope)?;
    conn.send(&bytes).await?;
    Ok(())
}

/// Sends a `Response::Error` envelope to the client.
async fn send_error(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    rejection: Rejection,
    seq: u64,
    reply_to: Option<u64>,
    start: &Instant,
) -> Result<(), RollcallError> {
    let envelope = Envelope {
        seq,
        timestamp: elapsed_ms(start),
        reply_to,
        payload: rejection.into_response(),
    };
    send(conn, codec, &envelope).await
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}

fn elapsed_ms(start: &Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn wall_clock_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use rollcall_registry::StoreError;

    use super::*;

    #[test]
    fn test_next_seq_increments() {
        let mut seq = 1;
        assert_eq!(next_seq(&mut seq), 1);
        assert_eq!(next_seq(&mut seq), 2);
        assert_eq!(seq, 3);
    }

    #[test]
    fn test_rejection_from_registry_error_codes() {
        let cases = [
            (RegistryError::SessionAlreadyActive(ClassroomId(1)), 400, "session_already_active"),
            (RegistryError::NoActiveSession(ClassroomId(1)), 400, "no_active_session"),
            (RegistryError::UnknownParticipant("Z".into()), 400, "unknown_participant"),
            (RegistryError::IdentityNotEnrolled("Z".into()), 400, "identity_not_enrolled"),
            (RegistryError::ClassroomNotFound(ClassroomId(1)), 404, "classroom_not_found"),
            (
                RegistryError::Store(StoreError::Unavailable("down".into())),
                500,
                "store_failure",
            ),
        ];
        for (err, code, reason) in cases {
            let rejection = Rejection::from(err);
            assert_eq!(rejection.code, code, "{reason}");
            assert_eq!(rejection.reason, reason);
        }
    }

    #[test]
    fn test_require_role_mismatch_is_forbidden() {
        let student = Caller::new("A", Role::Student);
        let rejection = require_role(&student, Role::Teacher).unwrap_err();
        assert_eq!(rejection.code, 403);
        assert_eq!(rejection.message, "requires the teacher role");
        assert!(require_role(&student, Role::Student).is_ok());
    }

    #[test]
    fn test_rejection_into_response_shape() {
        let response = Rejection::bad_request("nope").into_response();
        assert_eq!(
            response,
            Response::Error {
                code: 400,
                reason: "bad_request".into(),
                message: "nope".into(),
            }
        );
    }
}
