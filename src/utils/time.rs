use chrono::{DateTime, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Millisecond stamp used to keep uploaded object names unique.
pub fn upload_stamp() -> i64 {
    now().timestamp_millis()
}
