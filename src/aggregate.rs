use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::info;

use crate::fetch::{Fetched, StatusClient};
use crate::settings::{InstanceConfig, MonitorConfig};
use crate::status::{started_secs_ago, BoxInfo, GatewayUptime, LinkInfo, LinkState, StatusDocument};

/// Links of one instance in one state.
#[derive(Debug, Clone, Serialize)]
pub struct StateCount {
    pub state: LinkState,
    pub count: usize,
    pub ids: Vec<String>,
}

/// An SMSC link with its start time resolved.
#[derive(Debug, Clone, Serialize)]
pub struct LinkRow {
    #[serde(flatten)]
    pub link: LinkInfo,
    pub started: Option<DateTime<Local>>,
}

/// A box with its start time resolved.
#[derive(Debug, Clone, Serialize)]
pub struct BoxRow {
    #[serde(flatten)]
    pub info: BoxInfo,
    pub started: Option<DateTime<Local>>,
}

/// Everything shown for one configured instance.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceReport {
    pub index: usize,
    pub name: String,
    pub url: String,
    pub reachable: bool,
    pub error: Option<String>,
    pub fetch_ms: u64,
    #[serde(skip)]
    pub config: InstanceConfig,
    pub gateway: Option<GatewayUptime>,
    pub started: Option<DateTime<Local>>,
    pub inbound: String,
    pub outbound: String,
    pub version: String,
    pub received_total: i64,
    pub inbound_rate: f64,
    pub sent_total: i64,
    pub outbound_rate: f64,
    pub queued_mo: i64,
    pub queued_mt: i64,
    pub boxes: Vec<BoxRow>,
    /// `None` when no status document was retrieved.
    pub link_count: Option<i64>,
    pub link_states: Vec<StateCount>,
    pub links: Vec<LinkRow>,
}

impl InstanceReport {
    pub fn state(&self, state: LinkState) -> Option<&StateCount> {
        self.link_states.iter().find(|c| c.state == state)
    }

    pub fn state_count(&self, state: LinkState) -> usize {
        self.state(state).map_or(0, |c| c.count)
    }
}

/// Cross-instance sums.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Totals {
    pub received_total: i64,
    pub inbound_rate: f64,
    pub sent_total: i64,
    pub outbound_rate: f64,
    pub queued_mo: i64,
    pub queued_mt: i64,
    pub links: i64,
    pub online: usize,
    pub disconnected: usize,
    pub connecting: usize,
    pub re_connecting: usize,
    pub dead: usize,
    pub unknown: usize,
}

impl Totals {
    fn add(&mut self, report: &InstanceReport) {
        self.received_total = self.received_total.saturating_add(report.received_total);
        self.inbound_rate += report.inbound_rate;
        self.sent_total = self.sent_total.saturating_add(report.sent_total);
        self.outbound_rate += report.outbound_rate;
        self.queued_mo = self.queued_mo.saturating_add(report.queued_mo);
        self.queued_mt = self.queued_mt.saturating_add(report.queued_mt);
        self.links = self.links.saturating_add(report.link_count.unwrap_or(0));
        for state in LinkState::ALL {
            *self.slot(state) += report.state_count(state);
        }
    }

    fn slot(&mut self, state: LinkState) -> &mut usize {
        match state {
            LinkState::Online => &mut self.online,
            LinkState::Disconnected => &mut self.disconnected,
            LinkState::Connecting => &mut self.connecting,
            LinkState::ReConnecting => &mut self.re_connecting,
            LinkState::Dead => &mut self.dead,
            LinkState::Unknown => &mut self.unknown,
        }
    }

    pub fn in_state(&self, state: LinkState) -> usize {
        match state {
            LinkState::Online => self.online,
            LinkState::Disconnected => self.disconnected,
            LinkState::Connecting => self.connecting,
            LinkState::ReConnecting => self.re_connecting,
            LinkState::Dead => self.dead,
            LinkState::Unknown => self.unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub generated_at: DateTime<Local>,
    pub queue_alert_threshold: i64,
    pub instances: Vec<InstanceReport>,
    pub totals: Totals,
}

impl DashboardReport {
    pub fn queued_mo_alert(&self) -> bool {
        self.totals.queued_mo > self.queue_alert_threshold
    }

    pub fn queued_mt_alert(&self) -> bool {
        self.totals.queued_mt > self.queue_alert_threshold
    }
}

fn instance_report(
    index: usize,
    config: &InstanceConfig,
    fetched: &Fetched,
    now: DateTime<Local>,
) -> InstanceReport {
    let doc: &StatusDocument = &fetched.document;
    let gateway = doc.gateway_status();
    let started = gateway.as_ref().and_then(|g| g.uptime.started_at(now));

    let boxes = doc
        .boxes()
        .map(|info| BoxRow {
            started: info.uptime.and_then(|u| u.started_at(now)),
            info,
        })
        .collect();

    let links = doc
        .links()
        .map(|link| LinkRow {
            started: link.online_secs.map(|secs| started_secs_ago(now, secs)),
            link,
        })
        .collect();

    let link_states = LinkState::ALL
        .into_iter()
        .map(|state| StateCount {
            state,
            count: doc.count_links_in_state(state),
            ids: doc.ids_in_state(state),
        })
        .collect();

    InstanceReport {
        index,
        name: config.name.clone(),
        url: config.display_url(),
        reachable: fetched.is_ok(),
        error: fetched.error.as_ref().map(|e| e.to_string()),
        fetch_ms: fetched.elapsed.as_millis() as u64,
        config: config.clone(),
        gateway,
        started,
        inbound: doc.text("gateway/sms/inbound").to_string(),
        outbound: doc.text("gateway/sms/outbound").to_string(),
        version: doc.version().to_string(),
        received_total: doc.integer("gateway/sms/received/total"),
        inbound_rate: doc.rate("gateway/sms/inbound"),
        sent_total: doc.integer("gateway/sms/sent/total"),
        outbound_rate: doc.rate("gateway/sms/outbound"),
        queued_mo: doc.integer("gateway/sms/received/queued"),
        queued_mt: doc.integer("gateway/sms/sent/queued"),
        boxes,
        link_count: (!doc.is_empty()).then(|| doc.link_count()),
        link_states,
        links,
    }
}

/// Build per-instance rows and totals from already fetched documents.
///
/// `fetched` is matched to `instances` by position.
pub fn aggregate(
    instances: &[InstanceConfig],
    fetched: &[Fetched],
    now: DateTime<Local>,
    queue_alert_threshold: i64,
) -> DashboardReport {
    let mut totals = Totals::default();
    let reports: Vec<InstanceReport> = instances
        .iter()
        .zip(fetched)
        .enumerate()
        .map(|(index, (config, fetched))| {
            let report = instance_report(index, config, fetched, now);
            totals.add(&report);
            report
        })
        .collect();

    DashboardReport {
        generated_at: now,
        queue_alert_threshold,
        instances: reports,
        totals,
    }
}

/// Poll every configured instance and aggregate the results.
pub async fn collect(client: &StatusClient, config: &MonitorConfig) -> DashboardReport {
    let fetched = client.fetch_all(&config.instances).await;
    let report = aggregate(
        &config.instances,
        &fetched,
        Local::now(),
        config.queue_alert_threshold,
    );

    let reachable = report.instances.iter().filter(|i| i.reachable).count();
    info!(
        instances = report.instances.len(),
        reachable,
        received = report.totals.received_total,
        sent = report.totals.sent_total,
        links = report.totals.links,
        online = report.totals.online,
        "Collected gateway status"
    );
    report
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use crate::status::tests::FIXTURE;
    use crate::xpath::TagScanner;
    use std::time::Duration;

    pub(crate) fn instance(name: &str, base_url: &str) -> InstanceConfig {
        InstanceConfig {
            base_url: base_url.to_string(),
            status_password: "foobar".to_string(),
            admin_password: "admin".to_string(),
            name: name.to_string(),
        }
    }

    pub(crate) fn ok(body: &str) -> Fetched {
        Fetched {
            document: StatusDocument::new(body, TagScanner::default()),
            error: None,
            elapsed: Duration::ZERO,
        }
    }

    pub(crate) fn failed() -> Fetched {
        Fetched {
            document: StatusDocument::empty(TagScanner::default()),
            error: Some(FetchError::Connect("connection refused".to_string())),
            elapsed: Duration::ZERO,
        }
    }

    pub(crate) fn sample_report() -> DashboardReport {
        let instances = vec![
            instance("Kannel 1", "http://k1:13000"),
            instance("Kannel 2", "http://k2:13000"),
            instance("Kannel 3", "http://k3:13000"),
        ];
        let fetched = vec![ok(FIXTURE), failed(), ok(FIXTURE)];
        aggregate(&instances, &fetched, Local::now(), 10)
    }

    #[test]
    fn test_failed_instance_contributes_zero() {
        let report = sample_report();
        assert_eq!(report.instances.len(), 3);
        assert_eq!(report.totals.received_total, 3000);
        assert_eq!(report.totals.sent_total, 5000);
        assert_eq!(report.totals.queued_mo, 8);
        assert_eq!(report.totals.queued_mt, 14);
        assert!((report.totals.inbound_rate - 1.04).abs() < 1e-9);
        assert!((report.totals.outbound_rate - 2.5).abs() < 1e-9);
        assert_eq!(report.totals.links, 8);
        assert_eq!(report.totals.online, 4);
        assert_eq!(report.totals.disconnected, 2);

        let broken = &report.instances[1];
        assert!(!broken.reachable);
        assert!(broken.error.is_some());
        assert_eq!(broken.received_total, 0);
        assert_eq!(broken.link_count, None);
        assert!(broken.boxes.is_empty());
        assert!(broken.gateway.is_none());
    }

    #[test]
    fn test_huge_counters_saturate() {
        let body = "<gateway><sms><received><total>9223372036854775807</total><queued>9223372036854775807</queued></received></sms></gateway>";
        let instances = vec![
            instance("Kannel 1", "http://k1:13000"),
            instance("Kannel 2", "http://k2:13000"),
        ];
        let fetched = vec![ok(body), ok(body)];
        let report = aggregate(&instances, &fetched, Local::now(), 100);

        assert_eq!(report.instances[0].received_total, i64::MAX);
        assert_eq!(report.totals.received_total, i64::MAX);
        assert_eq!(report.totals.queued_mo, i64::MAX);
        assert!(report.queued_mo_alert());
    }

    #[test]
    fn test_queue_alert_threshold() {
        let report = sample_report();
        // 14 queued MT over a threshold of 10, 8 queued MO under it.
        assert!(report.queued_mt_alert());
        assert!(!report.queued_mo_alert());
    }

    #[test]
    fn test_instance_details_resolved() {
        let report = sample_report();
        let first = &report.instances[0];
        assert_eq!(first.gateway.as_ref().map(|g| g.label.as_str()), Some("running"));
        let started = first.started.unwrap();
        assert_eq!((report.generated_at - started).num_seconds(), 2 * 86400 + 3 * 3600 + 10 * 60 + 5);
        assert_eq!(first.boxes.len(), 2);
        assert_eq!(first.links.len(), 4);
        assert_eq!(
            first.links[0].started.map(|s| (report.generated_at - s).num_seconds()),
            Some(3600)
        );
        assert_eq!(first.state(LinkState::Disconnected).unwrap().ids, vec!["beta"]);
        assert_eq!(first.state_count(LinkState::Online), 2);
    }

    #[tokio::test]
    async fn test_collect_with_unreachable_instance() {
        use axum::{routing::get, Router};

        async fn serve(body: &'static str) -> String {
            let app = Router::new().route("/status.xml", get(move || async move { body }));
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            format!("http://{}", addr)
        }

        // Reserve a port and close it again so nothing is listening there.
        let dead = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            format!("http://{}", listener.local_addr().unwrap())
        };

        let second = FIXTURE.replace("<total>1500</total>", "<total>500</total>");
        let second: &'static str = Box::leak(second.into_boxed_str());

        let config = MonitorConfig {
            instances: vec![
                instance("Kannel 1", &serve(FIXTURE).await),
                instance("Kannel 2", &dead),
                instance("Kannel 3", &serve(second).await),
            ],
            ..MonitorConfig::default()
        };
        let client = StatusClient::new(Duration::from_secs(5), TagScanner::default()).unwrap();
        let report = collect(&client, &config).await;

        assert!(report.instances[0].reachable);
        assert!(!report.instances[1].reachable);
        assert!(report.instances[2].reachable);
        assert_eq!(report.totals.received_total, 1500 + 500);
        assert_eq!(report.instances[2].received_total, 500);
    }
}
