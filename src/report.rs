use crate::aggregate::DashboardReport;
use crate::format::{format_decimal, format_integer};
use crate::status::LinkState;

const RULE: &str = "───────────────────────────────────────────────────────────────────\n";
const DOUBLE_RULE: &str = "═══════════════════════════════════════════════════════════════════\n";

fn section(report: &mut String, title: &str) {
    report.push_str(RULE);
    report.push_str(&format!("{:^67}\n", title));
    report.push_str(RULE);
    report.push('\n');
}

/// Plain text rendering of the dashboard for terminals and cron mail.
pub fn generate_report(data: &DashboardReport) -> String {
    let mut report = String::new();
    let totals = &data.totals;

    report.push_str(DOUBLE_RULE);
    report.push_str(&format!("{:^67}\n", "Kannel Status Report"));
    report.push_str(DOUBLE_RULE);
    report.push('\n');
    report.push_str(&format!(
        "Generated: {}\n",
        data.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    report.push_str(&format!("Instances: {}\n\n", data.instances.len()));

    section(&mut report, "INSTANCES");
    for inst in &data.instances {
        let state = if inst.reachable { "ok" } else { "FAILED" };
        report.push_str(&format!(
            "  ({}) {} [{}] {} ({} ms)\n",
            inst.index, inst.name, state, inst.url, inst.fetch_ms
        ));
        if let Some(error) = &inst.error {
            report.push_str(&format!("      error:    {}\n", error));
        }
        if let (Some(gateway), Some(started)) = (&inst.gateway, &inst.started) {
            report.push_str(&format!(
                "      status:   {}, started {}, uptime {}\n",
                gateway.label,
                started.format("%Y-%m-%d %H:%M:%S"),
                gateway.uptime
            ));
        }
        if inst.reachable {
            report.push_str(&format!("      inbound:  {}\n", inst.inbound));
            report.push_str(&format!("      outbound: {}\n", inst.outbound));
            if let Some(first_line) = inst.version.lines().next() {
                report.push_str(&format!("      version:  {}\n", first_line.trim()));
            }
        }
    }
    report.push('\n');

    section(&mut report, "SMS TRAFFIC");
    report.push_str(&format!("  Received (MO):  {:>15} msgs\n", format_integer(totals.received_total)));
    report.push_str(&format!("  Inbound (MO):   {:>15} msgs/s\n", format_decimal(totals.inbound_rate)));
    report.push_str(&format!("  Sent (MT):      {:>15} msgs\n", format_integer(totals.sent_total)));
    report.push_str(&format!("  Outbound (MT):  {:>15} msgs/s\n", format_decimal(totals.outbound_rate)));
    report.push_str(&format!(
        "  Queued (MO):    {:>15} msgs{}\n",
        format_integer(totals.queued_mo),
        if data.queued_mo_alert() { "  (!)" } else { "" }
    ));
    report.push_str(&format!(
        "  Queued (MT):    {:>15} msgs{}\n",
        format_integer(totals.queued_mt),
        if data.queued_mt_alert() { "  (!)" } else { "" }
    ));
    report.push('\n');

    section(&mut report, "BOX CONNECTIONS");
    for inst in &data.instances {
        if inst.boxes.is_empty() {
            report.push_str(&format!("  ({}) no boxes connected\n", inst.index));
        }
        for row in &inst.boxes {
            report.push_str(&format!(
                "  ({}) {:<8} {:<12} {:<16} queue {:>6}  ssl {}  {}\n",
                inst.index,
                row.info.kind,
                row.info.id,
                row.info.ip,
                format_integer(row.info.queue),
                row.info.ssl,
                row.info.uptime.map(|u| u.to_string()).unwrap_or_default()
            ));
        }
    }
    report.push('\n');

    section(&mut report, "SMSC CONNECTIONS");
    report.push_str(&format!("  Links:          {:>6}\n", totals.links));
    for state in LinkState::ALL {
        report.push_str(&format!("  {:<15} {:>6}\n", format!("{}:", state), totals.in_state(state)));
    }
    report.push('\n');

    let problems: Vec<String> = data
        .instances
        .iter()
        .flat_map(|inst| {
            inst.link_states
                .iter()
                .filter(|c| c.state != LinkState::Online && c.count > 0)
                .map(move |c| format!("({}) {}: {}", inst.index, c.state, c.ids.join(" ")))
        })
        .collect();
    if !problems.is_empty() {
        report.push_str("  Links not online:\n");
        for problem in &problems {
            report.push_str(&format!("    - {}\n", problem));
        }
        report.push('\n');
    }

    report.push_str(DOUBLE_RULE);
    report.push_str(&format!("{:^67}\n", "END OF REPORT"));
    report.push_str(DOUBLE_RULE);
    report
}
