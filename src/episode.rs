use std::sync::LazyLock;

use chrono::{DateTime, Days, NaiveDate, Utc};
use regex::Regex;

/// Episodes older than this many days are removed by cleanup.
pub const RETENTION_DAYS: u64 = 30;

const DATE_FORMAT: &str = "%Y-%m-%d";

static EPISODE_FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{4}-[0-9]{2}-[0-9]{2})\.mp3$").expect("episode file name pattern must compile")
});

/// A retained episode as seen by the feed flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Episode {
    pub file_name: String,
    pub date: NaiveDate,
    /// `YYYY-MM-DD`; sorts the same way as `date`.
    pub date_key: String,
}

impl Episode {
    pub fn new(file_name: String, date: NaiveDate) -> Self {
        Episode {
            file_name,
            date,
            date_key: date.format(DATE_FORMAT).to_string(),
        }
    }

    /// Parses a `YYYY-MM-DD.mp3` file name. Anything else, including names
    /// whose digits are not a calendar date, is not an episode.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let captures = EPISODE_FILE_NAME.captures(file_name)?;
        let date = NaiveDate::parse_from_str(&captures[1], DATE_FORMAT).ok()?;
        Some(Episode {
            file_name: file_name.to_owned(),
            date,
            date_key: captures[1].to_owned(),
        })
    }
}

/// Sorts newest first. The date key is compared as a string.
pub fn sort_newest_first(episodes: &mut [Episode]) {
    episodes.sort_by(|a, b| {
        b.date_key
            .cmp(&a.date_key)
            .then_with(|| b.file_name.cmp(&a.file_name))
    });
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, whose UTC date is used.
pub fn parse_upload_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
}

/// The retention boundary for one run. Dates are plain calendar dates in UTC.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Retention {
    cutoff: NaiveDate,
}

impl Retention {
    pub fn from_today(today: NaiveDate) -> Self {
        let cutoff = today
            .checked_sub_days(Days::new(RETENTION_DAYS))
            .unwrap_or(NaiveDate::MIN);
        Retention { cutoff }
    }

    pub fn now() -> Self {
        Retention::from_today(Utc::now().date_naive())
    }

    pub fn cutoff(&self) -> NaiveDate {
        self.cutoff
    }

    pub fn is_expired(&self, date: NaiveDate) -> bool {
        date < self.cutoff
    }

    /// Only `YYYY-MM-DD.mp3` names with a valid date can ever be old.
    pub fn is_old_episode(&self, file_name: &str) -> bool {
        Episode::from_file_name(file_name)
            .map(|episode| self.is_expired(episode.date))
            .unwrap_or(false)
    }
}
