use crate::shortcode::ShortCode;
use jiff::civil::Date;
use jiff::tz::TimeZone;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

pub const UNKNOWN_COUNTRY: &str = "unknown";
pub const DIRECT_REFERER: &str = "direct";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Mobile,
    Tablet,
    Bot,
    Curl,
    Wget,
    Desktop,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Mobile => "mobile",
            DeviceClass::Tablet => "tablet",
            DeviceClass::Bot => "bot",
            DeviceClass::Curl => "curl",
            DeviceClass::Wget => "wget",
            DeviceClass::Desktop => "desktop",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mobile" => Ok(DeviceClass::Mobile),
            "tablet" => Ok(DeviceClass::Tablet),
            "bot" => Ok(DeviceClass::Bot),
            "curl" => Ok(DeviceClass::Curl),
            "wget" => Ok(DeviceClass::Wget),
            "desktop" => Ok(DeviceClass::Desktop),
            other => Err(format!("unknown device class '{other}'")),
        }
    }
}

/// Request metadata captured at resolution time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickContext {
    pub ip: String,
    pub user_agent: String,
    pub referer: String,
}

/// One completed resolution. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub short_code: ShortCode,
    pub ip: String,
    pub user_agent: String,
    pub referer: String,
    pub device: DeviceClass,
    pub country: String,
    pub created_at: Timestamp,
}

/// Half-open range `[since, until)` of click timestamps. A missing bound is
/// unbounded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickWindow {
    pub since: Option<Timestamp>,
    pub until: Option<Timestamp>,
}

impl ClickWindow {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn since(since: Timestamp) -> Self {
        Self {
            since: Some(since),
            until: None,
        }
    }

    pub fn contains(&self, at: Timestamp) -> bool {
        self.since.is_none_or(|since| at >= since) && self.until.is_none_or(|until| at < until)
    }

    /// A window whose upper bound is not after its lower bound matches nothing.
    pub fn is_empty(&self) -> bool {
        matches!((self.since, self.until), (Some(since), Some(until)) if until <= since)
    }
}

/// The UTC calendar day a click is bucketed under.
pub fn utc_date(at: Timestamp) -> Date {
    at.to_zoned(TimeZone::UTC).date()
}

/// Clicks on one UTC day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyClicks {
    pub date: Date,
    pub clicks: u64,
    pub unique_ips: u64,
}

/// Accumulates [`DailyClicks`] from individual events.
#[derive(Debug, Default)]
pub struct DailyTally {
    days: BTreeMap<Date, (u64, HashSet<String>)>,
}

impl DailyTally {
    pub fn add(&mut self, event: &ClickEvent) {
        let (clicks, ips) = self.days.entry(utc_date(event.created_at)).or_default();
        *clicks += 1;
        ips.insert(event.ip.clone());
    }

    /// Newest day first.
    pub fn into_days(self) -> Vec<DailyClicks> {
        self.days
            .into_iter()
            .rev()
            .map(|(date, (clicks, ips))| DailyClicks {
                date,
                clicks,
                unique_ips: ips.len() as u64,
            })
            .collect()
    }
}

/// Aggregated click counts for one code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClickSummary {
    pub short_code: ShortCode,
    pub total: u64,
    pub devices: BTreeMap<String, u64>,
    pub referers: BTreeMap<String, u64>,
    pub countries: BTreeMap<String, u64>,
    /// Newest day first.
    pub daily: Vec<DailyClicks>,
}

impl ClickSummary {
    pub fn empty(short_code: ShortCode) -> Self {
        Self {
            short_code,
            total: 0,
            devices: BTreeMap::new(),
            referers: BTreeMap::new(),
            countries: BTreeMap::new(),
            daily: Vec::new(),
        }
    }

    /// Summarizes `events`, including the per-day breakdown.
    pub fn collect<'a>(
        short_code: ShortCode,
        events: impl IntoIterator<Item = &'a ClickEvent>,
    ) -> Self {
        let mut summary = Self::empty(short_code);
        let mut daily = DailyTally::default();
        for event in events {
            summary.add(event);
            daily.add(event);
        }
        summary.daily = daily.into_days();
        summary
    }

    /// Folds one event into the counters.
    ///
    /// An empty referer is reported as `direct`; unknown countries are not
    /// broken out.
    pub fn add(&mut self, event: &ClickEvent) {
        self.total += 1;
        *self
            .devices
            .entry(event.device.as_str().to_string())
            .or_default() += 1;

        let referer = if event.referer.is_empty() {
            DIRECT_REFERER
        } else {
            event.referer.as_str()
        };
        *self.referers.entry(referer.to_string()).or_default() += 1;

        if !event.country.is_empty() && event.country != UNKNOWN_COUNTRY {
            *self.countries.entry(event.country.clone()).or_default() += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ip: &str, ts: &str) -> ClickEvent {
        ClickEvent {
            ip: ip.into(),
            created_at: ts.parse().unwrap(),
            ..event("", UNKNOWN_COUNTRY, DeviceClass::Desktop)
        }
    }

    fn event(referer: &str, country: &str, device: DeviceClass) -> ClickEvent {
        ClickEvent {
            short_code: ShortCode::new_unchecked("abc"),
            ip: "10.0.0.1".into(),
            user_agent: "test".into(),
            referer: referer.into(),
            device,
            country: country.into(),
            created_at: Timestamp::now(),
        }
    }

    #[test]
    fn summary_groups_events() {
        let mut summary = ClickSummary::empty(ShortCode::new_unchecked("abc"));
        summary.add(&event("", UNKNOWN_COUNTRY, DeviceClass::Desktop));
        summary.add(&event("https://news.ycombinator.com", "NL", DeviceClass::Mobile));
        summary.add(&event("", "NL", DeviceClass::Mobile));

        assert_eq!(summary.total, 3);
        assert_eq!(summary.referers.get(DIRECT_REFERER), Some(&2));
        assert_eq!(summary.referers.get("https://news.ycombinator.com"), Some(&1));
        assert_eq!(summary.countries.get("NL"), Some(&2));
        assert!(!summary.countries.contains_key(UNKNOWN_COUNTRY));
        assert_eq!(summary.devices.get("mobile"), Some(&2));
        assert_eq!(summary.devices.get("desktop"), Some(&1));
    }

    #[test]
    fn device_class_round_trips_through_str() {
        for device in [
            DeviceClass::Mobile,
            DeviceClass::Tablet,
            DeviceClass::Bot,
            DeviceClass::Curl,
            DeviceClass::Wget,
            DeviceClass::Desktop,
        ] {
            assert_eq!(device.as_str().parse::<DeviceClass>(), Ok(device));
        }
    }

    #[test]
    fn daily_counts_clicks_and_distinct_ips_newest_first() {
        let events = [
            at("10.0.0.1", "2024-03-01T08:00:00Z"),
            at("10.0.0.1", "2024-03-01T23:59:59Z"),
            at("10.0.0.2", "2024-03-01T12:00:00Z"),
            at("10.0.0.1", "2024-03-03T00:00:00Z"),
        ];
        let summary = ClickSummary::collect(ShortCode::new_unchecked("abc"), &events);

        assert_eq!(summary.total, 4);
        assert_eq!(
            summary.daily,
            vec![
                DailyClicks {
                    date: jiff::civil::date(2024, 3, 3),
                    clicks: 1,
                    unique_ips: 1,
                },
                DailyClicks {
                    date: jiff::civil::date(2024, 3, 1),
                    clicks: 3,
                    unique_ips: 2,
                },
            ]
        );
    }

    #[test]
    fn window_is_half_open() {
        let since: Timestamp = "2024-03-01T00:00:00Z".parse().unwrap();
        let until: Timestamp = "2024-03-02T00:00:00Z".parse().unwrap();
        let window = ClickWindow {
            since: Some(since),
            until: Some(until),
        };

        assert!(window.contains(since));
        assert!(!window.contains(until));
        assert!(!window.contains("2024-02-29T23:59:59Z".parse().unwrap()));
        assert!(ClickWindow::all().contains(until));
        assert!(!window.is_empty());
        assert!(ClickWindow {
            since: Some(until),
            until: Some(since),
        }
        .is_empty());
    }
}
