use sqlx::SqlitePool;

use crate::{
    auth::{self, Operation, Principal, UserDirectory},
    matrix, time, trips, AppResult,
};

/// Minimal HTML escaping for interpolated values.
fn esc(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn card(body: &str) -> String {
    format!(r#"<div class="hb-wrap"><div class="hb-card">{body}</div></div>"#)
}

fn denied() -> String {
    card("<p>Access denied.</p>")
}

/// The driver-facing submission form. The selector only ever offers
/// active+complete rows; the server re-checks the selection on submit
/// regardless of what was rendered here.
pub async fn render_trip_form(
    pool: &SqlitePool,
    principal: &Principal,
    nonce: &str,
) -> AppResult<String> {
    if !principal.is_authenticated() {
        return Ok(card("<p>Please login to submit a trip.</p>"));
    }
    if !auth::allows(principal.role, Operation::SubmitTrip) {
        return Ok(denied());
    }

    let options = matrix::list_selectable(pool).await?;

    let mut html = String::new();
    html.push_str(r#"<h2 class="hb-title">Submit Trip</h2>"#);
    html.push_str(r#"<form class="hb-form" method="post" data-hb-trip-form="1">"#);
    html.push_str(&format!(
        r#"<input type="hidden" name="nonce" value="{}">"#,
        esc(nonce)
    ));
    html.push_str(&format!(
        r#"<p><label>Date</label><input type="date" name="trip_date" value="{}" required></p>"#,
        esc(&time::today())
    ));

    html.push_str(r#"<p><label>Client List Selection (Route + Client + Unit)</label>"#);
    html.push_str(r#"<select name="matrix_row_id" data-hb-master="1" required>"#);
    html.push_str(r#"<option value="">Select...</option>"#);
    for row in &options {
        html.push_str(&format!(
            r#"<option value="{}" data-origin="{}" data-destination="{}">{} &rarr; {} | {} | {}</option>"#,
            esc(&row.id),
            esc(&row.origin),
            esc(&row.destination),
            esc(&row.origin),
            esc(&row.destination),
            esc(&row.client_name),
            esc(&row.unit_name),
        ));
    }
    html.push_str("</select>");
    if options.is_empty() {
        html.push_str(
            r#"<div class="hb-muted">No client list rows yet. Logistic Manager must add them in Client List first.</div>"#,
        );
    }
    html.push_str("</p>");

    html.push_str(
        r#"<p><label>Origin</label><input type="text" name="origin" data-hb-origin="1" readonly required></p>"#,
    );
    html.push_str(
        r#"<p><label>Destination</label><input type="text" name="destination" data-hb-destination="1" readonly required></p>"#,
    );
    html.push_str(
        r#"<p><label>Weight / Trip</label><input type="number" step="0.01" name="weight" required></p>"#,
    );
    html.push_str(
        r#"<p><label>Bill Number</label><input type="text" name="bill_number" required></p>"#,
    );
    html.push_str(r#"<p><input type="submit" class="hb-btn" name="save_trip" value="Submit Trip"></p>"#);
    html.push_str("</form>");

    Ok(card(&html))
}

/// The logistic-manager editing grid. Key fields render locked; only the
/// rate cell stays editable, and delete is a soft delete.
pub async fn render_client_list(
    pool: &SqlitePool,
    principal: &Principal,
    nonce: &str,
) -> AppResult<String> {
    if !auth::allows(principal.role, Operation::EditMatrix) {
        return Ok(denied());
    }

    let rows = matrix::list_active(pool).await?;

    let mut html = String::new();
    html.push_str(r#"<h2 class="hb-title">Client List</h2>"#);
    html.push_str(
        r#"<p class="hb-muted">Click + to add a row. Fill Origin, Destination, Client, Unit (required). Rate optional. After save, Routes/Client/Unit are locked; only Rate remains editable. Delete is soft-delete (keeps old trip records).</p>"#,
    );
    html.push_str(&format!(
        r#"<table class="hb-grid" data-hb-clientlist="1" data-nonce="{}">"#,
        esc(nonce)
    ));
    html.push_str(
        r#"<thead><tr><th rowspan="2">#</th><th colspan="2">Routes</th><th rowspan="2">Clients</th><th rowspan="2">Units</th><th rowspan="2">Rates</th></tr><tr><th>Origin</th><th>Destination</th></tr></thead>"#,
    );
    html.push_str("<tbody>");
    if rows.is_empty() {
        html.push_str(r#"<tr class="hb-empty-row"><td></td><td></td><td></td><td></td><td></td><td></td></tr>"#);
    }
    for (i, row) in rows.iter().enumerate() {
        html.push_str(&format!(
            concat!(
                r#"<tr data-id="{id}">"#,
                r#"<td class="numcell"><span class="row-num">{num}</span>"#,
                r#"<span class="row-actions"><button class="mini-btn hb-del" type="button" title="Delete">Del</button></span></td>"#,
                r#"<td><input class="hb-cell-input" data-col="origin" type="text" value="{origin}" readonly></td>"#,
                r#"<td><input class="hb-cell-input" data-col="destination" type="text" value="{destination}" readonly></td>"#,
                r#"<td><input class="hb-cell-input" data-col="client_name" type="text" value="{client}" readonly></td>"#,
                r#"<td><input class="hb-cell-input" data-col="unit_name" type="text" value="{unit}" readonly></td>"#,
                r#"<td><input class="hb-cell-input hb-edit" data-col="rate" type="number" step="0.01" value="{rate}" placeholder="(blank)"></td>"#,
                "</tr>",
            ),
            id = esc(&row.id),
            num = i + 1,
            origin = esc(&row.origin),
            destination = esc(&row.destination),
            client = esc(&row.client_name),
            unit = esc(&row.unit_name),
            rate = esc(&row.rate_text()),
        ));
    }
    html.push_str(
        r#"<tr class="hb-plus-row"><td class="center hb-plus" title="Add">+</td><td></td><td></td><td></td><td></td><td></td></tr>"#,
    );
    html.push_str("</tbody></table>");

    Ok(card(&html))
}

/// The all-trips report: latest records, newest first, with driver names
/// resolved through the host's user storage.
pub async fn render_trips_report(
    pool: &SqlitePool,
    principal: &Principal,
    users: &dyn UserDirectory,
) -> AppResult<String> {
    if !auth::allows(principal.role, Operation::ViewTripsReport) {
        return Ok(denied());
    }

    let rows = trips::list_recent(pool, trips::DEFAULT_REPORT_LIMIT).await?;

    let mut html = String::new();
    html.push_str(r#"<h2 class="hb-title">All Driver Trips</h2>"#);
    html.push_str(&format!(
        r#"<p class="hb-muted">Showing latest {} records.</p>"#,
        trips::DEFAULT_REPORT_LIMIT
    ));

    if rows.is_empty() {
        html.push_str("<p>No trips recorded yet.</p>");
        return Ok(card(&html));
    }

    html.push_str(
        r#"<table class="hb-table"><thead><tr><th>Date</th><th>Driver</th><th>Origin</th><th>Destination</th><th>Weight</th><th>Bill No</th></tr></thead><tbody>"#,
    );
    for trip in &rows {
        let driver = users
            .display_name(&trip.user_id)
            .unwrap_or_else(|| "Unknown".to_string());
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            esc(&trip.trip_date),
            esc(&driver),
            esc(&trip.origin),
            esc(&trip.destination),
            esc(&format!("{}", trip.weight)),
            esc(&trip.bill_number),
        ));
    }
    html.push_str("</tbody></table>");

    Ok(card(&html))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html_metacharacters() {
        assert_eq!(esc("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&#39;");
        assert_eq!(esc("plain"), "plain");
    }
}
