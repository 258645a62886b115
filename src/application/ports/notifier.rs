//! Outbound push contract used by auth, profile and media flows.
//!
//! Implementations must absorb delivery failures: an identity with no live
//! session is not an error for the caller that triggered the push.

use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::domain::entities::user::User;

pub const USER_REGISTERED: &str = "user_registered";
pub const USER_LOGGED_IN: &str = "user_logged_in";
pub const USER_PROFILE_UPDATED: &str = "user_profile_updated";
pub const USER_ACCOUNT_DEACTIVATED: &str = "user_account_deactivated";
pub const FILE_UPLOADED: &str = "file_uploaded";
pub const FILE_DELETED: &str = "file_deleted";
pub const SYSTEM_MESSAGE: &str = "system_message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemMessageKind {
    Info,
    Warning,
    Error,
}

impl SystemMessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemMessageKind::Info => "info",
            SystemMessageKind::Warning => "warning",
            SystemMessageKind::Error => "error",
        }
    }
}

/// RFC 3339 timestamp in UTC with millisecond precision.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub trait Notifier: Send + Sync {
    /// Push to every connection bound to `user_id`.
    fn push_to_identity(&self, user_id: Uuid, event: &str, payload: Value);

    /// Push to every connection that joined `group`.
    fn push_to_group(&self, group: &str, event: &str, payload: Value);

    /// Push to every connection.
    fn broadcast(&self, event: &str, payload: Value);

    fn notify_user_registered(&self, user: &User) {
        self.push_to_identity(
            user.id,
            USER_REGISTERED,
            json!({
                "message": "User registered successfully",
                "user": { "id": user.id, "name": user.name, "email": user.email },
                "timestamp": timestamp(),
            }),
        );
    }

    fn notify_user_logged_in(&self, user_id: Uuid) {
        let now = timestamp();
        self.push_to_identity(
            user_id,
            USER_LOGGED_IN,
            json!({
                "message": "User logged in successfully",
                "user": { "id": user_id, "timestamp": now },
                "timestamp": now,
            }),
        );
    }

    fn notify_user_profile_updated(&self, user: &User) {
        self.push_to_identity(
            user.id,
            USER_PROFILE_UPDATED,
            json!({
                "message": "User profile updated successfully",
                "user": { "id": user.id, "name": user.name, "email": user.email },
                "timestamp": timestamp(),
            }),
        );
    }

    fn notify_user_account_deactivated(&self, user_id: Uuid) {
        self.push_to_identity(
            user_id,
            USER_ACCOUNT_DEACTIVATED,
            json!({
                "message": "User account deactivated",
                "timestamp": timestamp(),
            }),
        );
    }

    fn notify_file_uploaded(&self, user_id: Uuid, file: Value) {
        self.push_to_identity(
            user_id,
            FILE_UPLOADED,
            json!({
                "message": "File uploaded successfully",
                "file": file,
                "timestamp": timestamp(),
            }),
        );
    }

    fn notify_file_deleted(&self, user_id: Uuid, file_id: Uuid) {
        self.push_to_identity(
            user_id,
            FILE_DELETED,
            json!({
                "message": "File deleted successfully",
                "fileId": file_id,
                "timestamp": timestamp(),
            }),
        );
    }

    fn notify_system_message(&self, user_id: Uuid, message: &str, kind: SystemMessageKind) {
        self.push_to_identity(
            user_id,
            SYSTEM_MESSAGE,
            json!({
                "message": message,
                "type": kind.as_str(),
                "timestamp": timestamp(),
            }),
        );
    }
}
