//! `GET /metrics` (`spec.md` §6): Prometheus text exposition format.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::state::AppState;

pub async fn metrics(State(state): State<AppState>) -> Response {
    let body = match state.supervisor.stats().await {
        Ok(snapshot) => render(&snapshot),
        Err(_) => String::from("# no simulation is running\n"),
    };
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response()
}

fn render(s: &niac_engine::stats::StatsSnapshot) -> String {
    let mut out = String::new();
    let mut line = |name: &str, help: &str, value: String| {
        out.push_str(&format!("# HELP niac_{name} {help}\n# TYPE niac_{name} counter\nniac_{name} {value}\n"));
    };
    line("packets_received_total", "Frames read from the capture handle.", s.packets_received.to_string());
    line("packets_sent_total", "Frames written to the capture handle.", s.packets_sent.to_string());
    line("arp_requests_total", "ARP requests observed.", s.arp_requests.to_string());
    line("arp_replies_total", "ARP replies sent.", s.arp_replies.to_string());
    line("icmp_requests_total", "ICMP echo requests observed.", s.icmp_requests.to_string());
    line("icmp_replies_total", "ICMP echo replies sent.", s.icmp_replies.to_string());
    line("dns_queries_total", "DNS queries observed.", s.dns_queries.to_string());
    line("dhcp_requests_total", "DHCP requests observed.", s.dhcp_requests.to_string());
    line("errors_total", "Capture or transmit errors.", s.errors.to_string());
    out.push_str("# HELP niac_active_workers Handler worker tasks currently running.\n# TYPE niac_active_workers gauge\nniac_active_workers ");
    out.push_str(&s.active_workers.to_string());
    out.push('\n');
    for (handler, drops) in &s.handler_drops {
        out.push_str(&format!("niac_handler_drops_total{{handler=\"{handler}\"}} {drops}\n"));
    }
    out
}
