//! HTML rendering of a [`DashboardReport`].

use chrono::{DateTime, Local};
use std::fmt::Write;

use crate::admin::{AdminCommand, LinkCommand};
use crate::aggregate::{DashboardReport, InstanceReport};
use crate::format::{format_decimal, format_integer};
use crate::status::LinkState;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Per-request page settings taken from the query string.
#[derive(Debug, Clone)]
pub struct PageOptions {
    /// Refresh interval in seconds.
    pub refresh: u64,
    /// Show the per-SMSC details table.
    pub details: bool,
    /// Path and query of the current request, used for the meta refresh.
    pub request_uri: String,
}

impl PageOptions {
    fn path(&self) -> &str {
        self.request_uri
            .split_once('?')
            .map_or(self.request_uri.as_str(), |(path, _)| path)
    }

    /// Current URI with any `details` pair replaced by `details=1`.
    fn details_uri(&self) -> String {
        let (path, query) = self
            .request_uri
            .split_once('?')
            .unwrap_or((self.request_uri.as_str(), ""));
        let mut pairs: Vec<&str> = query
            .split('&')
            .filter(|pair| !pair.is_empty() && pair.split('=').next() != Some("details"))
            .collect();
        pairs.push("details=1");
        format!("{}?{}", path, pairs.join("&"))
    }
}

/// Escape text for HTML element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Single-quoted JavaScript string literal body, HTML escaped for use inside
/// an `onclick` attribute.
fn js_str(text: &str) -> String {
    let mut js = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => js.push_str("\\\\"),
            '\'' => js.push_str("\\'"),
            '\n' => js.push_str("\\n"),
            '\r' => {}
            _ => js.push(c),
        }
    }
    escape(&js)
}

fn timestamp(t: &DateTime<Local>) -> String {
    t.format(TIME_FORMAT).to_string()
}

pub fn render_page(report: &DashboardReport, opts: &PageOptions) -> String {
    let mut html = String::with_capacity(16 * 1024);
    // Writing into a String cannot fail.
    let _ = write_page(&mut html, report, opts);
    html
}

fn write_page(html: &mut String, report: &DashboardReport, opts: &PageOptions) -> std::fmt::Result {
    write_head(html, report, opts)?;
    write_instances(html, report)?;
    write_traffic(html, report)?;
    write_boxes(html, report)?;
    write_link_summary(html, report)?;
    if opts.details {
        write_link_details(html, report)?;
    } else {
        writeln!(
            html,
            "<a class=\"href\" href=\"{}\">SMSC connection details</a>",
            escape(&opts.details_uri())
        )?;
    }
    html.push_str("</body>\n</html>\n");
    Ok(())
}

fn write_head(html: &mut String, report: &DashboardReport, opts: &PageOptions) -> std::fmt::Result {
    let down = opts.refresh.div_ceil(2).max(1);
    let up = opts.refresh.saturating_mul(2);
    let path = escape(opts.path());

    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html>\n<head>")?;
    writeln!(html, "    <meta charset=\"UTF-8\">")?;
    writeln!(
        html,
        "    <meta http-equiv=\"refresh\" content=\"{}; URL={}\">",
        opts.refresh,
        escape(&opts.request_uri)
    )?;
    writeln!(html, "    <title>Kannel Status</title>")?;
    writeln!(html, "    <link href=\"/static/kannel.css\" rel=\"stylesheet\" type=\"text/css\">")?;
    writeln!(html, "    <script src=\"/static/kannel.js\" type=\"text/javascript\"></script>")?;
    writeln!(html, "</head>\n<body>\n")?;

    writeln!(html, "<table width=\"100%\" cellspacing=\"0\" cellpadding=\"0\" border=\"0\">")?;
    writeln!(html, "<tr><td valign=\"top\">\n  <h3>Kannel Status Monitor</h3>")?;
    writeln!(
        html,
        "</td><td valign=\"top\" align=\"left\" class=\"text\">\n  Current date and time: <br />\n  <b>{}</b>",
        timestamp(&report.generated_at)
    )?;
    writeln!(html, "</td><td valign=\"top\" align=\"right\" class=\"text\">\n  Refresh rate: <br />")?;
    writeln!(
        html,
        "  <a class=\"href\" href=\"{path}?refresh={down}\">{down}s</a> |\n  <b>{}s</b> |\n  <a class=\"href\" href=\"{path}?refresh={up}\">{up}s</a>",
        opts.refresh
    )?;
    writeln!(html, "</td></tr>\n</table>\n")
}

fn write_instances(html: &mut String, report: &DashboardReport) -> std::fmt::Result {
    writeln!(html, "<table width=\"100%\" cellspacing=\"0\" cellpadding=\"5\" border=\"0\">")?;
    writeln!(
        html,
        "<tr><td valign=\"top\" align=\"left\" class=\"text\">\n  {} instance(s) configured for this monitor: <br />\n</td><td valign=\"top\" align=\"right\" class=\"text\">\n  Admin commands:\n</td></tr>",
        report.instances.len()
    )?;

    for inst in &report.instances {
        writeln!(html, "<tr><td class=\"text\" valign=\"top\" align=\"left\">")?;
        let class = if inst.reachable { "green" } else { "red" };
        writeln!(
            html,
            "<span class=\"{}\">({}) ({}) <b>{}</b></span> <br />",
            class,
            inst.index,
            escape(&inst.name),
            escape(&inst.url)
        )?;
        if let Some(error) = &inst.error {
            writeln!(html, "&nbsp;&nbsp;<span class=\"red\">{}</span> <br />", escape(error))?;
        }

        if let (Some(gateway), Some(started)) = (&inst.gateway, &inst.started) {
            writeln!(
                html,
                "&nbsp;&nbsp;&nbsp;<b>{}</b>, started {}, uptime {} <br />",
                escape(&gateway.label),
                timestamp(started),
                gateway.uptime
            )?;
        }
        writeln!(html, "&nbsp;&nbsp;&nbsp;<b>Inbound:</b> {}<br />", escape(&inst.inbound))?;
        writeln!(html, "&nbsp;&nbsp;&nbsp;<b>Outbound:</b> {}<br />", escape(&inst.outbound))?;
        let version = escape(&inst.version.replace('\r', ""))
            .replace('\n', "<br />\n&nbsp;&nbsp;&nbsp;&nbsp;&nbsp;&nbsp;&nbsp;&nbsp;&nbsp;&nbsp;&nbsp;&nbsp;");
        writeln!(html, "&nbsp;&nbsp;&nbsp;<b>Version:</b> {}<br />", version)?;

        writeln!(html, "</td><td class=\"text\" valign=\"top\" align=\"right\">")?;
        write_admin_links(html, inst)?;
        writeln!(html, "</td></tr>")?;
    }
    writeln!(html, "</table>\n")
}

fn write_admin_links(html: &mut String, inst: &InstanceReport) -> std::fmt::Result {
    for (i, command) in AdminCommand::ALL.iter().enumerate() {
        let separator = match i {
            2 => " <br />",
            5 => "",
            _ => " |",
        };
        writeln!(
            html,
            "  <a class=\"href\" href=\"#\" onclick=\"return admin_url('{}', '{}');\">{}</a>{}",
            command.name(),
            js_str(&command.url(&inst.config)),
            command.name(),
            separator
        )?;
    }
    Ok(())
}

/// One cell of the traffic table: per-instance values, a rule, and the sum.
fn write_sum_cell<F>(
    html: &mut String,
    report: &DashboardReport,
    value: F,
    total: String,
    unit: &str,
    bold: bool,
    alert: bool,
) -> std::fmt::Result
where
    F: Fn(&InstanceReport) -> String,
{
    writeln!(html, "<td valign=\"top\" align=\"right\" class=\"text\">")?;
    for inst in &report.instances {
        if bold {
            writeln!(html, "({}) <b>{}</b> {}<br />", inst.index, value(inst), unit)?;
        } else {
            writeln!(html, "({}) {} {}<br />", inst.index, value(inst), unit)?;
        }
    }
    writeln!(html, "<hr size=\"1\">")?;
    if alert {
        writeln!(html, "(all) <span class=\"red\">{} {}</span> <br />", total, unit)?;
    } else if bold {
        writeln!(html, "(all) <b>{}</b> {} <br />", total, unit)?;
    } else {
        writeln!(html, "(all) {} {} <br />", total, unit)?;
    }
    writeln!(html, "</td>")
}

fn write_traffic(html: &mut String, report: &DashboardReport) -> std::fmt::Result {
    let totals = &report.totals;
    writeln!(html, "<h4>Overall SMS traffic</h4>\n")?;
    writeln!(html, "<div class=\"bord\">")?;
    writeln!(html, "<table width=\"100%\" cellspacing=\"0\" cellpadding=\"5\" border=\"1\">")?;
    write!(html, "<tr>")?;
    for heading in [
        "Received (MO)",
        "Inbound (MO)",
        "Sent (MT)",
        "Outbound (MT)",
        "Queued (MO)",
        "Queued (MT)",
    ] {
        write!(html, "<td valign=\"top\" align=\"right\" class=\"text\">{}</td>", heading)?;
    }
    writeln!(html, "</tr>\n<tr>")?;

    write_sum_cell(html, report, |i| format_integer(i.received_total), format_integer(totals.received_total), "msgs", true, false)?;
    write_sum_cell(html, report, |i| format_decimal(i.inbound_rate), format_decimal(totals.inbound_rate), "msgs/s", true, false)?;
    write_sum_cell(html, report, |i| format_integer(i.sent_total), format_integer(totals.sent_total), "msgs", true, false)?;
    write_sum_cell(html, report, |i| format_decimal(i.outbound_rate), format_decimal(totals.outbound_rate), "msgs/s", true, false)?;
    write_sum_cell(html, report, |i| format_integer(i.queued_mo), format_integer(totals.queued_mo), "msgs", false, report.queued_mo_alert())?;
    write_sum_cell(html, report, |i| format_integer(i.queued_mt), format_integer(totals.queued_mt), "msgs", false, report.queued_mt_alert())?;

    writeln!(html, "</tr>\n</table>\n</div>\n")
}

fn write_boxes(html: &mut String, report: &DashboardReport) -> std::fmt::Result {
    writeln!(html, "<h4>Box connections</h4>\n")?;
    writeln!(html, "<div class=\"bord\">")?;
    writeln!(html, "<table width=\"100%\" cellspacing=\"0\" cellpadding=\"1\" border=\"0\">")?;
    writeln!(
        html,
        "<tr><td class=\"text\" align=\"center\">Instance</td><td class=\"text\">Type</td><td class=\"text\">ID</td><td class=\"text\">IP</td><td class=\"text\" align=\"right\">Queued (MO)</td><td class=\"text\">Started</td><td class=\"text\">SSL</td></tr>"
    )?;

    for inst in &report.instances {
        if inst.boxes.is_empty() {
            writeln!(
                html,
                "<tr><td valign=\"top\" align=\"center\" class=\"text\">({})</td><td valign=\"top\" align=\"left\" colspan=\"6\" class=\"text\"><span class=\"red\"><b>no boxes connected to this bearerbox!</b></span></td></tr>",
                inst.index
            )?;
            continue;
        }
        for row in &inst.boxes {
            let started = match (&row.started, &row.info.uptime) {
                (Some(started), Some(uptime)) => format!("{}, uptime {}", timestamp(started), uptime),
                _ => String::new(),
            };
            writeln!(
                html,
                "<tr><td valign=\"top\" align=\"center\" class=\"text\">({})</td><td valign=\"top\" class=\"text\"><b>{}</b></td><td valign=\"top\" class=\"text\" nowrap>{}</td><td valign=\"top\" class=\"text\" nowrap>{}</td><td valign=\"top\" align=\"right\" class=\"text\" nowrap><b>{}</b> msgs</td><td valign=\"top\" class=\"text\" nowrap>{}</td><td valign=\"top\" class=\"text\" nowrap>{}</td></tr>",
                inst.index,
                escape(&row.info.kind),
                escape(&row.info.id),
                escape(&row.info.ip),
                format_integer(row.info.queue),
                started,
                escape(&row.info.ssl)
            )?;
        }
    }
    writeln!(html, "</table>\n</div>\n")
}

fn state_heading(state: LinkState) -> &'static str {
    match state {
        LinkState::Online => "Online",
        LinkState::Disconnected => "Disconnected",
        LinkState::Connecting => "Connecting",
        LinkState::ReConnecting => "Re-connecting",
        LinkState::Dead => "Dead",
        LinkState::Unknown => "Unknown",
    }
}

fn write_link_summary(html: &mut String, report: &DashboardReport) -> std::fmt::Result {
    writeln!(html, "<h4>SMSC connections</h4>\n")?;
    writeln!(html, "<div class=\"bord\">")?;
    writeln!(html, "<table width=\"100%\" cellspacing=\"0\" cellpadding=\"5\" border=\"0\">")?;
    write!(html, "<tr><td valign=\"top\" align=\"right\" class=\"text\">Links</td>")?;
    for state in LinkState::ALL {
        write!(html, "<td valign=\"top\" align=\"right\" class=\"text\">{}</td>", state_heading(state))?;
    }
    writeln!(html, "</tr>")?;

    // Configured link count
    writeln!(html, "<tr><td valign=\"top\" align=\"right\" class=\"text\">")?;
    for inst in &report.instances {
        match inst.link_count {
            Some(count) => writeln!(html, "({}) {} links<br />", inst.index, count)?,
            None => writeln!(html, "({}) none<br />", inst.index)?,
        }
    }
    writeln!(html, "<hr size=\"1\">\n(all) {} links <br />", report.totals.links)?;

    for state in LinkState::ALL {
        writeln!(html, "</td><td valign=\"top\" align=\"right\" class=\"text\">")?;
        if state == LinkState::Online {
            write_online_cell(html, report)?;
        } else {
            write_state_cell(html, report, state)?;
        }
    }
    writeln!(html, "</td></tr>\n</table>\n</div>\n")
}

fn write_online_cell(html: &mut String, report: &DashboardReport) -> std::fmt::Result {
    writeln!(html, "<span class=\"green\">")?;
    for inst in &report.instances {
        let online = inst.state_count(LinkState::Online);
        match inst.link_count {
            Some(count) if count == online as i64 => {
                writeln!(html, "({}) <b>all</b> links<br />", inst.index)?
            }
            Some(_) => writeln!(html, "({}) {} links<br />", inst.index, online)?,
            None => writeln!(html, "({}) none<br />", inst.index)?,
        }
    }
    writeln!(html, "<hr size=\"1\">\n(all) {} links <br />", report.totals.online)?;
    writeln!(html, "</span>")
}

fn write_state_cell(html: &mut String, report: &DashboardReport, state: LinkState) -> std::fmt::Result {
    let class = if state.is_alert() { "red" } else { "text" };
    for inst in &report.instances {
        let ids = inst.state(state).map(|c| c.ids.join(" ")).unwrap_or_default();
        match inst.state_count(state) {
            0 => writeln!(html, "({}) <span class=\"text\">none</span><br />", inst.index)?,
            count => writeln!(
                html,
                "({}) <a href=\"#\" class=\"href\" onclick=\"return do_alert('{}');\"><span class=\"{}\"><b>{}</b> links</span></a><br />",
                inst.index,
                js_str(&format!("smsc-ids in {} state are\n\n{}", state.keyword(), ids)),
                class,
                count
            )?,
        }
    }
    writeln!(html, "<hr size=\"1\">\n(all) {} links <br />", report.totals.in_state(state))
}

fn state_badge(state: Option<LinkState>, status: &str) -> String {
    match state {
        Some(LinkState::Online) => "<span class=\"green\">online</span>".to_string(),
        Some(s) if s.is_alert() => format!("<span class=\"red\">{}</span>", s.keyword()),
        Some(s) => format!("<span class=\"text\">{}</span>", s.keyword()),
        None => format!("<span class=\"text\">{}</span>", escape(status)),
    }
}

fn write_link_details(html: &mut String, report: &DashboardReport) -> std::fmt::Result {
    writeln!(html, "<h4>SMSC connection details</h4>\n")?;
    writeln!(html, "<div class=\"bord\">")?;
    writeln!(html, "<table width=\"100%\" cellspacing=\"0\" cellpadding=\"1\" border=\"0\">")?;
    writeln!(
        html,
        "<tr><td width=\"10%\" class=\"text\">Instance</td><td class=\"text\">SMSC-ID</td><td class=\"text\">Status</td><td align=\"right\" class=\"text\">Received (MO)</td><td align=\"right\" class=\"text\">Sent (MT)</td><td align=\"right\" class=\"text\">Failed (MT)</td><td align=\"right\" class=\"text\">Queued (MT)</td><td align=\"right\" class=\"text\">Admin</td></tr>"
    )?;

    for inst in &report.instances {
        for row in &inst.links {
            let link = &row.link;
            writeln!(html, "<tr><td valign=\"top\" align=\"center\" class=\"text\">({})</td>", inst.index)?;
            write!(
                html,
                "<td valign=\"top\" class=\"text\"><b>{}</b> <br />{} <br />",
                escape(&link.id),
                escape(&link.name)
            )?;
            if let Some(started) = &row.started {
                write!(html, "started {}", timestamp(started))?;
            }
            writeln!(html, "</td>")?;

            write!(html, "<td valign=\"top\" class=\"text\" nowrap>{}", state_badge(link.state, &link.status))?;
            if let Some(secs) = link.online_secs {
                write!(html, " <br /> ({}s)", secs)?;
            }
            writeln!(html, "</td>")?;

            for value in [link.received, link.sent, link.failed, link.queued] {
                writeln!(
                    html,
                    "<td valign=\"top\" align=\"right\" class=\"text\" nowrap>{}</td>",
                    format_integer(value)
                )?;
            }

            writeln!(html, "<td valign=\"top\" align=\"right\" class=\"text\" nowrap>")?;
            for (i, command) in [LinkCommand::Stop, LinkCommand::Start].iter().enumerate() {
                writeln!(
                    html,
                    "<a class=\"href\" href=\"#\" onclick=\"return admin_smsc_url('{}', '{}', '{}');\">{}</a>{}",
                    command.name(),
                    js_str(&command.url(&inst.config, &link.id)),
                    js_str(&link.id),
                    command.label(),
                    if i == 0 { " <br />" } else { "" }
                )?;
            }
            writeln!(html, "</td></tr>")?;
        }
    }
    writeln!(html, "</table>\n</div>\n")
}
