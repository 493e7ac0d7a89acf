use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};

use crate::format::{lenient_f64, lenient_i64};
use crate::xpath::TagScanner;

/// Lifecycle state of an SMSC link as reported in `<smsc><status>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkState {
    Online,
    Disconnected,
    Connecting,
    ReConnecting,
    Dead,
    Unknown,
}

impl LinkState {
    pub const ALL: [LinkState; 6] = [
        LinkState::Online,
        LinkState::Disconnected,
        LinkState::Connecting,
        LinkState::ReConnecting,
        LinkState::Dead,
        LinkState::Unknown,
    ];

    /// Wording used by the gateway. Must match byte for byte.
    pub fn keyword(&self) -> &'static str {
        match self {
            LinkState::Online => "online",
            LinkState::Disconnected => "disconnected",
            LinkState::Connecting => "connecting",
            LinkState::ReConnecting => "re-connecting",
            LinkState::Dead => "dead",
            LinkState::Unknown => "unknown",
        }
    }

    /// Prefix comparison used for counting.
    pub fn matches(&self, status: &str) -> bool {
        status.starts_with(self.keyword())
    }

    /// State named by the first word of a status text.
    pub fn classify(status: &str) -> Option<LinkState> {
        let word = status.split_whitespace().next()?;
        Self::ALL.into_iter().find(|state| state.keyword() == word)
    }

    /// Whether a non-zero count of links in this state is an alert.
    pub fn is_alert(&self) -> bool {
        matches!(
            self,
            LinkState::Disconnected | LinkState::Connecting | LinkState::ReConnecting
        )
    }
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A `<d>d <h>h <m>m <s>s` duration as printed by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uptime {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Uptime {
    /// Parse the leading `2d 3h 10m 5s` part of `text`.
    pub fn parse(text: &str) -> Option<Uptime> {
        let mut parts = text.split_whitespace();
        let mut field = |suffix: char| -> Option<u64> {
            parts.next()?.strip_suffix(suffix)?.parse().ok()
        };
        let uptime = Uptime {
            days: field('d')?,
            hours: field('h')?,
            minutes: field('m')?,
            seconds: field('s')?,
        };
        // A duration that does not fit in seconds is treated as malformed.
        uptime.total_seconds()?;
        Some(uptime)
    }

    /// Total length in seconds, `None` on overflow.
    pub fn total_seconds(&self) -> Option<u64> {
        self.days
            .checked_mul(86_400)?
            .checked_add(self.hours.checked_mul(3_600)?)?
            .checked_add(self.minutes.checked_mul(60)?)?
            .checked_add(self.seconds)
    }

    pub fn started_at(&self, now: DateTime<Local>) -> Option<DateTime<Local>> {
        self.total_seconds().map(|secs| started_secs_ago(now, secs))
    }
}

impl std::fmt::Display for Uptime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}d {}h {}m {}s",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// `now` minus `secs`, saturating at `now` for absurd values.
pub fn started_secs_ago(now: DateTime<Local>, secs: u64) -> DateTime<Local> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ago| now.checked_sub_signed(ago))
        .unwrap_or(now)
}

/// Parsed `<gateway><status>` text: `"running, uptime 2d 3h 10m 5s"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayUptime {
    pub label: String,
    pub uptime: Uptime,
}

impl GatewayUptime {
    pub fn parse(status: &str) -> Option<GatewayUptime> {
        let (label, rest) = status.rsplit_once(", uptime ")?;
        Some(GatewayUptime {
            label: label.trim().to_string(),
            uptime: Uptime::parse(rest)?,
        })
    }
}

/// One connected box (smsbox, wapbox, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub ip: String,
    pub queue: i64,
    pub status: String,
    pub uptime: Option<Uptime>,
    pub ssl: String,
}

/// One SMSC link row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub id: String,
    pub name: String,
    pub status: String,
    pub state: Option<LinkState>,
    /// Seconds online, from an `online <n>s` status.
    pub online_secs: Option<u64>,
    pub received: i64,
    pub sent: i64,
    pub failed: i64,
    pub queued: i64,
}

fn box_uptime(status: &str) -> Option<Uptime> {
    let at = status.find("on-line ")?;
    Uptime::parse(&status[at + "on-line ".len()..])
}

fn link_online_secs(status: &str) -> Option<u64> {
    let rest = status.strip_prefix("online ")?;
    rest.split_whitespace().next()?.strip_suffix('s')?.parse().ok()
}

/// Raw `status.xml` body of one instance. Values are extracted on demand.
#[derive(Debug, Clone, Default)]
pub struct StatusDocument {
    body: String,
    scanner: TagScanner,
}

impl StatusDocument {
    pub fn new(body: impl Into<String>, scanner: TagScanner) -> Self {
        Self {
            body: body.into(),
            scanner,
        }
    }

    /// Document standing in for a failed fetch.
    pub fn empty(scanner: TagScanner) -> Self {
        Self::new(String::new(), scanner)
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn value(&self, path: &str) -> Option<&str> {
        self.scanner.extract(path, &self.body)
    }

    /// Extracted text or the empty string.
    pub fn text(&self, path: &str) -> &str {
        self.value(path).unwrap_or_default()
    }

    pub fn integer(&self, path: &str) -> i64 {
        lenient_i64(self.text(path))
    }

    pub fn rate(&self, path: &str) -> f64 {
        lenient_f64(self.text(path))
    }

    pub fn gateway_status(&self) -> Option<GatewayUptime> {
        GatewayUptime::parse(self.value("gateway/status")?)
    }

    pub fn version(&self) -> &str {
        self.text("gateway/version")
    }

    pub fn link_count(&self) -> i64 {
        self.integer("gateway/smscs/count")
    }

    pub fn boxes(&self) -> impl Iterator<Item = BoxInfo> + '_ {
        let scanner = self.scanner;
        let body = self.text("gateway/boxes").trim();
        scanner.elements("box", body).map(move |item| {
            let field = |name: &str| scanner.element(item, name).unwrap_or_default();
            let status = field("status");
            BoxInfo {
                kind: field("type").to_string(),
                id: field("id").to_string(),
                ip: field("IP").to_string(),
                queue: lenient_i64(field("queue")),
                status: status.to_string(),
                uptime: box_uptime(status),
                ssl: field("ssl").to_string(),
            }
        })
    }

    pub fn links(&self) -> impl Iterator<Item = LinkInfo> + '_ {
        let scanner = self.scanner;
        self.smsc_bodies().map(move |item| {
            let field = |name: &str| scanner.element(item, name).unwrap_or_default();
            let status = field("status");
            LinkInfo {
                id: field("id").to_string(),
                name: field("name").to_string(),
                status: status.to_string(),
                state: LinkState::classify(status),
                online_secs: link_online_secs(status),
                received: lenient_i64(field("received")),
                sent: lenient_i64(field("sent")),
                failed: lenient_i64(field("failed")),
                queued: lenient_i64(field("queued")),
            }
        })
    }

    fn smsc_bodies(&self) -> impl Iterator<Item = &str> + '_ {
        self.scanner.elements("smsc", self.text("gateway/smscs"))
    }

    fn link_statuses(&self) -> impl Iterator<Item = &str> + '_ {
        let scanner = self.scanner;
        self.smsc_bodies()
            .map(move |item| scanner.element(item, "status").unwrap_or_default())
    }

    pub fn count_links_in_state(&self, state: LinkState) -> usize {
        self.link_statuses().filter(|s| state.matches(s)).count()
    }

    pub fn ids_in_state(&self, state: LinkState) -> Vec<String> {
        let scanner = self.scanner;
        self.smsc_bodies()
            .filter(|item| state.matches(scanner.element(item, "status").unwrap_or_default()))
            .map(|item| scanner.element(item, "id").unwrap_or_default().to_string())
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) const FIXTURE: &str = r#"<?xml version="1.0"?>
<gateway>
  <version>Kannel bearerbox version `1.4.5'.
Build `Jan  1 2020 00:00:00', compiler `9.3.0'.</version>
  <status>running, uptime 2d 3h 10m 5s</status>
  <wdp><received><total>0</total><queued>0</queued></received></wdp>
  <sms>
    <received><total>1500</total><queued>4</queued></received>
    <sent><total>2500</total><queued>7</queued></sent>
    <storesize>0</storesize>
    <inbound>0.52,0.48,0.40</inbound>
    <outbound>1.25,1.10,1.00</outbound>
  </sms>
  <boxes>
    <box><type>smsbox</type><id>sms1</id><IP>10.0.0.5</IP><queue>3</queue><status>on-line 0d 1h 2m 3s</status><ssl>no</ssl></box>
    <box><type>wapbox</type><id></id><IP>10.0.0.6</IP><queue>0</queue><status>on-line 1d 0h 0m 0s</status><ssl>yes</ssl></box>
  </boxes>
  <smscs>
    <count>4</count>
    <smsc><name>SMPP:a:2775</name><id>alpha</id><status>online 3600s</status><received>100</received><sent>200</sent><failed>1</failed><queued>5</queued></smsc>
    <smsc><name>SMPP:b:2775</name><id>beta</id><status>disconnected</status><received>0</received><sent>0</sent><failed>0</failed><queued>9</queued></smsc>
    <smsc><name>SMPP:c:2775</name><id>gamma</id><status>re-connecting</status><received>0</received><sent>0</sent><failed>0</failed><queued>0</queued></smsc>
    <smsc><name>SMPP:d:2775</name><id>delta</id><status>online 60s</status><received>7</received><sent>8</sent><failed>0</failed><queued>0</queued></smsc>
  </smscs>
</gateway>
"#;

    fn doc() -> StatusDocument {
        StatusDocument::new(FIXTURE, TagScanner::default())
    }

    #[test]
    fn test_link_state_classification() {
        assert_eq!(LinkState::classify("online 10s"), Some(LinkState::Online));
        assert_eq!(LinkState::classify("re-connecting"), Some(LinkState::ReConnecting));
        assert_eq!(LinkState::classify("on-line 0d 0h 0m 1s"), None);
        assert_eq!(LinkState::classify(""), None);
        assert!(!LinkState::Connecting.matches("re-connecting"));
        assert!(LinkState::Online.matches("online 3600s"));
    }

    #[test]
    fn test_count_links_in_state() {
        let doc = doc();
        assert_eq!(doc.count_links_in_state(LinkState::Online), 2);
        assert_eq!(doc.count_links_in_state(LinkState::Disconnected), 1);
        assert_eq!(doc.count_links_in_state(LinkState::ReConnecting), 1);
        assert_eq!(doc.count_links_in_state(LinkState::Connecting), 0);
        assert_eq!(doc.count_links_in_state(LinkState::Dead), 0);
    }

    #[test]
    fn test_state_counts_sum_to_link_count() {
        let doc = doc();
        let sum: usize = LinkState::ALL
            .iter()
            .map(|s| doc.count_links_in_state(*s))
            .sum();
        assert_eq!(sum as i64, doc.link_count());
    }

    #[test]
    fn test_ids_in_state() {
        let doc = doc();
        assert_eq!(doc.ids_in_state(LinkState::Online), vec!["alpha", "delta"]);
        assert_eq!(doc.ids_in_state(LinkState::Disconnected), vec!["beta"]);
        assert!(doc.ids_in_state(LinkState::Unknown).is_empty());
    }

    #[test]
    fn test_empty_document_yields_defaults() {
        let doc = StatusDocument::empty(TagScanner::default());
        assert_eq!(doc.integer("gateway/sms/received/total"), 0);
        assert_eq!(doc.rate("gateway/sms/inbound"), 0.0);
        assert!(doc.gateway_status().is_none());
        assert_eq!(doc.boxes().count(), 0);
        assert_eq!(doc.count_links_in_state(LinkState::Online), 0);
    }

    #[test]
    fn test_gateway_uptime_parse() {
        let parsed = GatewayUptime::parse("running, uptime 2d 3h 10m 5s").unwrap();
        assert_eq!(parsed.label, "running");
        assert_eq!(parsed.uptime.total_seconds(), Some(2 * 86400 + 3 * 3600 + 10 * 60 + 5));
        assert!(GatewayUptime::parse("running").is_none());
        assert!(GatewayUptime::parse("running, uptime soon").is_none());
    }

    #[test]
    fn test_oversized_uptime_is_omitted() {
        assert!(GatewayUptime::parse("running, uptime 999999999999999999d 0h 0m 0s").is_none());
        assert!(Uptime::parse("0d 18446744073709551615h 0m 0s").is_none());

        let doc = StatusDocument::new(
            "<gateway><status>running, uptime 999999999999999999d 0h 0m 0s</status></gateway>",
            TagScanner::default(),
        );
        assert!(doc.gateway_status().is_none());

        let huge = Uptime {
            days: u64::MAX,
            hours: 0,
            minutes: 0,
            seconds: 0,
        };
        assert_eq!(huge.total_seconds(), None);
        assert!(huge.started_at(Local::now()).is_none());
    }

    #[test]
    fn test_start_time_from_uptime() {
        let now = Local.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let status = doc().gateway_status().unwrap();
        let started = status.uptime.started_at(now).unwrap();
        let expected = 2 * 86400 + 3 * 3600 + 10 * 60 + 5;
        assert_eq!((now - started).num_seconds(), expected);
    }

    #[test]
    fn test_boxes_and_links() {
        let doc = doc();
        let boxes: Vec<_> = doc.boxes().collect();
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].kind, "smsbox");
        assert_eq!(boxes[0].ip, "10.0.0.5");
        assert_eq!(boxes[0].queue, 3);
        assert_eq!(boxes[0].uptime.and_then(|u| u.total_seconds()), Some(3723));
        assert_eq!(boxes[1].ssl, "yes");

        let links: Vec<_> = doc.links().collect();
        assert_eq!(links.len(), 4);
        assert_eq!(links[0].online_secs, Some(3600));
        assert_eq!(links[1].state, Some(LinkState::Disconnected));
        assert_eq!(links[1].queued, 9);
        assert_eq!(links[3].sent, 8);
    }
}
