//! Local time in the configured timezone

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

const TIME_FORMAT: &str = "%A, %d %B %Y, %I:%M %p";

/// Renders the current time for one IANA timezone
#[derive(Debug, Clone)]
pub struct Clock {
    timezone: String,
}

impl Clock {
    pub fn new(timezone: impl Into<String>) -> Self {
        Self {
            timezone: timezone.into(),
        }
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    pub fn now_html(&self) -> String {
        self.render_at(Utc::now())
    }

    /// Render `instant` in the clock's timezone
    pub fn render_at(&self, instant: DateTime<Utc>) -> String {
        match self.timezone.parse::<Tz>() {
            Ok(tz) => {
                let local = tz.from_utc_datetime(&instant.naive_utc());
                format!(
                    "<p>🕒 Current time in {}: <b>{}</b></p>",
                    self.timezone,
                    local.format(TIME_FORMAT)
                )
            }
            Err(e) => {
                tracing::warn!(timezone = %self.timezone, error = %e, "Unknown timezone");
                format!("<p>Could not retrieve time: {}</p>", e)
            }
        }
    }
}
