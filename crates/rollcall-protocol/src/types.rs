//! Core protocol types for Rollcall's wire format.
//!
//! Everything here is serialized, sent over the socket, and parsed on
//! the other side. The JSON shapes are part of the contract with the
//! mobile clients, so the tests at the bottom pin them down.

use std::borrow::Borrow;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifier of a classroom, as assigned by the classroom directory.
///
/// Serialized as a plain number (`#[serde(transparent)]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassroomId(pub u64);

impl fmt::Display for ClassroomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// The opaque identity of a participant (a student's or teacher's
/// college UID).
///
/// Identities carry no meaning in their content. Whether an identity is
/// the teacher is decided by the session that holds it, never by
/// inspecting the string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Wraps a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for Identity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// Lets maps keyed by `Identity` be queried with a `&str`.
impl Borrow<str> for Identity {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Identifier of one attendance round (one start → finalize cycle).
///
/// Generated by the session engine when a round starts and stamped on
/// every record it produces, so records from two rounds on the same
/// day stay distinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoundId(String);

impl RoundId {
    /// Wraps a raw round identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What an authenticated caller is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Starts, inspects, and finalizes rounds for their classrooms.
    Teacher,
    /// Passes tokens and reports exceptions.
    Student,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Teacher => f.write_str("teacher"),
            Self::Student => f.write_str("student"),
        }
    }
}

// ---------------------------------------------------------------------------
// Attendance results
// ---------------------------------------------------------------------------

/// Final status of a student for one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    /// Maps the engine's boolean presence onto a status.
    pub fn from_present(present: bool) -> Self {
        if present { Self::Present } else { Self::Absent }
    }

    pub fn is_present(self) -> bool {
        matches!(self, Self::Present)
    }
}

/// A dated attendance record, as handed to the attendance store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// The student this record is about.
    pub student: Identity,
    /// The classroom the round ran in.
    pub classroom_id: ClassroomId,
    /// The round that produced the record.
    pub round_id: RoundId,
    /// Calendar date (UTC) the round was finalized on.
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

/// Counts folded out of a finalized round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttendanceSummary {
    /// Students in the round, taken from the roster when it started.
    pub total: usize,
    pub present: usize,
    pub absent: usize,
}

/// One line of a finalized round's result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub identity: Identity,
    pub present: bool,
}

/// One exception-list entry, enriched with the student's display name
/// when the directory knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionEntry {
    pub identity: Identity,
    #[serde(default)]
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Request: client → server
// ---------------------------------------------------------------------------

/// Everything a client can ask of the server.
///
/// Internally tagged: `{ "type": "PassToken", "classroom_id": 1, ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    // -- Connection lifecycle --
    /// Must be the first message on a connection. `token` is the bearer
    /// token issued by the auth provider.
    Handshake { version: u32, token: String },

    /// Keep-alive. Echoed back with the server's clock.
    Heartbeat { client_time: u64 },

    /// "I'm leaving." The server closes the connection.
    Disconnect { reason: String },

    // -- Teacher --
    /// Opens an attendance round for a classroom.
    StartSession { classroom_id: ClassroomId },

    /// Lists students who reported having no device.
    ListExceptions { classroom_id: ClassroomId },

    /// Links the given participants straight to the teacher.
    MarkPresent {
        classroom_id: ClassroomId,
        identities: Vec<Identity>,
    },

    /// Closes the round. Exception-listed students named here count as
    /// present; anything else in the list is ignored.
    Finalize {
        classroom_id: ClassroomId,
        #[serde(default)]
        present_from_exceptions: Vec<Identity>,
    },

    /// Lists classrooms with a live round.
    ListActive,

    // -- Student --
    /// "`from` handed the token to `to`."
    PassToken {
        classroom_id: ClassroomId,
        from: Identity,
        to: Identity,
    },

    /// Puts a student on the no-device exception list.
    AddException {
        classroom_id: ClassroomId,
        identity: Identity,
    },

    /// The caller's own attendance records.
    AttendanceHistory,

    // -- Anyone --
    /// Is a round running for this classroom?
    SessionStatus { classroom_id: ClassroomId },
}

impl Request {
    /// Short name of the request, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Handshake { .. } => "handshake",
            Self::Heartbeat { .. } => "heartbeat",
            Self::Disconnect { .. } => "disconnect",
            Self::StartSession { .. } => "start_session",
            Self::ListExceptions { .. } => "list_exceptions",
            Self::MarkPresent { .. } => "mark_present",
            Self::Finalize { .. } => "finalize",
            Self::ListActive => "list_active",
            Self::PassToken { .. } => "pass_token",
            Self::AddException { .. } => "add_exception",
            Self::AttendanceHistory => "attendance_history",
            Self::SessionStatus { .. } => "session_status",
        }
    }
}

// ---------------------------------------------------------------------------
// Response: server → client
// ---------------------------------------------------------------------------

/// Everything the server sends back. Every request gets exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    HandshakeAck {
        identity: Identity,
        role: Role,
        server_time: u64,
    },

    HeartbeatAck {
        client_time: u64,
        server_time: u64,
    },

    SessionStarted {
        classroom_id: ClassroomId,
        round_id: RoundId,
        /// Students in the roster snapshot the round was built from.
        students: usize,
    },

    TokenPassed {
        classroom_id: ClassroomId,
        from: Identity,
        to: Identity,
    },

    ExceptionAdded {
        classroom_id: ClassroomId,
        identity: Identity,
    },

    ExceptionList {
        classroom_id: ClassroomId,
        exceptions: Vec<ExceptionEntry>,
    },

    MarkedPresent {
        classroom_id: ClassroomId,
        count: usize,
    },

    Finalized {
        classroom_id: ClassroomId,
        round_id: RoundId,
        date: NaiveDate,
        summary: AttendanceSummary,
        attendance: Vec<AttendanceEntry>,
    },

    SessionStatus {
        classroom_id: ClassroomId,
        active: bool,
    },

    ActiveSessions {
        classrooms: Vec<ClassroomId>,
    },

    AttendanceHistory {
        records: Vec<AttendanceRecord>,
    },

    /// The request was rejected.
    ///
    /// `code` follows HTTP conventions (400, 401, 403, 404, 500).
    /// `reason` is a stable snake_case tag clients can match on;
    /// `message` is for humans.
    Error {
        code: u16,
        reason: String,
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The top-level wire wrapper around a [`Request`] or [`Response`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Sender-side sequence number.
    pub seq: u64,

    /// Milliseconds since the sender started.
    #[serde(default)]
    pub timestamp: u64,

    /// On responses, the `seq` of the request being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<u64>,

    pub payload: T,
}

impl<T> Envelope<T> {
    /// Builds an envelope that doesn't answer anything.
    pub fn new(seq: u64, timestamp: u64, payload: T) -> Self {
        Self {
            seq,
            timestamp,
            reply_to: None,
            payload,
        }
    }

    /// Builds an envelope answering the request with sequence `reply_to`.
    pub fn reply(seq: u64, timestamp: u64, reply_to: u64, payload: T) -> Self {
        Self {
            seq,
            timestamp,
            reply_to: Some(reply_to),
            payload,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The JSON shapes here are what the mobile clients parse, so a
    //! mismatch is a breaking change.

    use super::*;

    #[test]
    fn test_classroom_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&ClassroomId(12)).unwrap();
        assert_eq!(json, "12");
    }

    #[test]
    fn test_classroom_id_display() {
        assert_eq!(ClassroomId(3).to_string(), "C-3");
    }

    #[test]
    fn test_identity_serializes_as_plain_string() {
        let json = serde_json::to_string(&Identity::from("S-2021CS01")).unwrap();
        assert_eq!(json, "\"S-2021CS01\"");
    }

    #[test]
    fn test_identity_borrows_as_str_for_map_lookup() {
        let mut map = std::collections::HashMap::new();
        map.insert(Identity::from("S-1"), 1);
        assert_eq!(map.get("S-1"), Some(&1));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Teacher).unwrap(), "\"teacher\"");
        assert_eq!(serde_json::to_string(&Role::Student).unwrap(), "\"student\"");
    }

    #[test]
    fn test_attendance_status_serializes_screaming_case() {
        let json = serde_json::to_string(&AttendanceStatus::Present).unwrap();
        assert_eq!(json, "\"PRESENT\"");
        assert_eq!(AttendanceStatus::from_present(false), AttendanceStatus::Absent);
    }

    #[test]
    fn test_attendance_record_date_is_iso8601() {
        let record = AttendanceRecord {
            student: "S-1".into(),
            classroom_id: ClassroomId(1),
            round_id: RoundId::new("abc"),
            date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            status: AttendanceStatus::Absent,
        };
        let json: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(json["date"], "2025-03-14");
        assert_eq!(json["status"], "ABSENT");
        assert_eq!(json["round_id"], "abc");
    }

    #[test]
    fn test_request_pass_token_json_format() {
        let req = Request::PassToken {
            classroom_id: ClassroomId(5),
            from: "S-1".into(),
            to: "S-2".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&req).unwrap();
        assert_eq!(json["type"], "PassToken");
        assert_eq!(json["classroom_id"], 5);
        assert_eq!(json["from"], "S-1");
        assert_eq!(json["to"], "S-2");
    }

    #[test]
    fn test_request_finalize_defaults_empty_exception_list() {
        let req: Request =
            serde_json::from_str(r#"{"type":"Finalize","classroom_id":9}"#).unwrap();
        assert_eq!(
            req,
            Request::Finalize {
                classroom_id: ClassroomId(9),
                present_from_exceptions: vec![],
            }
        );
    }

    #[test]
    fn test_request_unit_variant_json_format() {
        let json = serde_json::to_string(&Request::ListActive).unwrap();
        assert_eq!(json, r#"{"type":"ListActive"}"#);
    }

    #[test]
    fn test_request_kind_names() {
        assert_eq!(Request::AttendanceHistory.kind(), "attendance_history");
        let req = Request::MarkPresent {
            classroom_id: ClassroomId(1),
            identities: vec![],
        };
        assert_eq!(req.kind(), "mark_present");
    }

    #[test]
    fn test_response_error_json_format() {
        let resp = Response::Error {
            code: 400,
            reason: "no_active_session".into(),
            message: "no active session for classroom C-1".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["type"], "Error");
        assert_eq!(json["code"], 400);
        assert_eq!(json["reason"], "no_active_session");
    }

    #[test]
    fn test_response_finalized_carries_summary() {
        let resp = Response::Finalized {
            classroom_id: ClassroomId(1),
            round_id: RoundId::new("r1"),
            date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            summary: AttendanceSummary {
                total: 4,
                present: 3,
                absent: 1,
            },
            attendance: vec![AttendanceEntry {
                identity: "S-1".into(),
                present: true,
            }],
        };
        let json: serde_json::Value = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["summary"]["total"], 4);
        assert_eq!(json["summary"]["absent"], 1);
        assert_eq!(json["attendance"][0]["present"], true);
    }

    #[test]
    fn test_exception_entry_name_is_optional() {
        let entry: ExceptionEntry = serde_json::from_str(r#"{"identity":"S-4"}"#).unwrap();
        assert_eq!(entry.name, None);
    }

    #[test]
    fn test_envelope_reply_to_omitted_when_none() {
        let env = Envelope::new(1, 10, Request::ListActive);
        let json: serde_json::Value = serde_json::to_value(&env).unwrap();
        assert!(json.get("reply_to").is_none());

        let reply = Envelope::reply(2, 11, 1, Response::ActiveSessions { classrooms: vec![] });
        let json: serde_json::Value = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["reply_to"], 1);
    }

    #[test]
    fn test_envelope_timestamp_defaults_when_missing() {
        let raw = r#"{"seq":1,"payload":{"type":"ListActive"}}"#;
        let env: Envelope<Request> = serde_json::from_str(raw).unwrap();
        assert_eq!(env.timestamp, 0);
        assert_eq!(env.reply_to, None);
    }

    #[test]
    fn test_decode_unknown_request_type_returns_error() {
        let unknown = r#"{"type": "StealAttendance", "classroom_id": 1}"#;
        let result: Result<Request, _> = serde_json::from_str(unknown);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_request_missing_field_returns_error() {
        let missing = r#"{"type": "PassToken", "classroom_id": 1, "from": "S-1"}"#;
        let result: Result<Request, _> = serde_json::from_str(missing);
        assert!(result.is_err());
    }
}
