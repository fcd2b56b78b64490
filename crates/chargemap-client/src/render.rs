//! HTML and SVG output for a [`MapView`].

use std::fmt::Write as _;

use chargemap_core::LocationId;
use reqwest::Url;

use crate::view::{LoadState, MapView};

const POINT_RADIUS: u32 = 8;

/// The point set as a standalone SVG document.
#[must_use]
pub fn render_svg(view: &MapView) -> String {
    render_svg_with(view, |_| None)
}

/// The full map page: header with offline badge, filter form, count, legend,
/// then the map (or the load error) and the detail panel.
#[must_use]
pub fn render_page(view: &MapView) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<title>EV Charging Locations</title>\n</head>\n<body>\n<main>\n");
    out.push_str("<h1>EV Charging Locations");
    if view.is_offline() {
        out.push_str(" <span class=\"badge badge-destructive\">Offline</span>");
    }
    out.push_str("</h1>\n");

    match view.load_state() {
        LoadState::Loading => out.push_str("<div class=\"loading\">Loading...</div>\n"),
        LoadState::Failed(message) => {
            let _ = writeln!(out, "<div class=\"error\">{}</div>", escape(message));
        }
        LoadState::Ready => {
            write_filters(&mut out, view);
            write_legend(&mut out);
            out.push_str(&render_svg_with(view, |id| Some(selection_href(view, id))));
            write_detail(&mut out, view);
        }
    }

    out.push_str("</main>\n</body>\n</html>\n");
    out
}

fn render_svg_with(view: &MapView, href: impl Fn(&LocationId) -> Option<String>) -> String {
    let canvas = view.projection().canvas();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
        w = canvas.width,
        h = canvas.height,
    );
    for point in view.points() {
        let id = escape(&point.id.to_string());
        let link = href(&point.id);
        if let Some(link) = &link {
            let _ = write!(out, "<a href=\"{}\">", escape(link));
        }
        let _ = write!(
            out,
            "<g transform=\"translate({x},{y})\" data-location-id=\"{id}\"><title>{name}</title>\
             <circle r=\"{POINT_RADIUS}\" class=\"{class}\" stroke=\"white\" stroke-width=\"2\" fill=\"{fill}\"/></g>",
            x = point.x,
            y = point.y,
            name = escape(&point.name),
            class = point.color.class,
            fill = point.color.rgb,
        );
        if link.is_some() {
            out.push_str("</a>");
        }
        out.push('\n');
    }
    out.push_str("</svg>\n");
    out
}

fn write_filters(out: &mut String, view: &MapView) {
    let filter = view.filter();
    out.push_str("<form method=\"get\" action=\"/\">\n");
    let _ = writeln!(
        out,
        "<input type=\"text\" name=\"search\" value=\"{}\" placeholder=\"Search by location name or address...\" aria-label=\"Search locations\">",
        escape(filter.search_term())
    );
    for status in chargemap_core::status::TOGGLE_STATUSES {
        let checked = if filter.is_status_selected(status) {
            " checked"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "<label><input type=\"checkbox\" name=\"status\" value=\"{value}\"{checked}> {status}</label>",
            value = escape(&status.to_lowercase()),
        );
    }
    out.push_str("<button type=\"submit\">Filter</button>\n</form>\n");
    let _ = writeln!(out, "<p class=\"count\">{}</p>", view.count_text());
}

fn write_legend(out: &mut String) {
    out.push_str("<ul class=\"legend\">\n");
    for entry in MapView::legend() {
        let _ = writeln!(
            out,
            "<li><span class=\"dot {}\" style=\"background:{}\"></span>{}</li>",
            entry.color.class, entry.color.rgb, entry.label
        );
    }
    out.push_str("</ul>\n");
}

fn write_detail(out: &mut String, view: &MapView) {
    let Some(detail) = view.selected_detail() else {
        return;
    };
    out.push_str("<aside class=\"detail\">\n");
    let _ = writeln!(out, "<h3>{}</h3>", escape(&detail.name));
    let _ = writeln!(out, "<p>{}</p>", escape(&detail.street));
    let _ = writeln!(
        out,
        "<p>{} {}</p>",
        escape(&detail.zip_code),
        escape(&detail.city)
    );
    let _ = writeln!(
        out,
        "<span class=\"badge {}\">{}</span> <span class=\"badge\">{}kW</span> <span class=\"badge\">{}</span>",
        detail.color.class,
        escape(&detail.status),
        detail.max_power_kw,
        escape(&detail.connector_type)
    );
    let _ = writeln!(out, "<a href=\"{}\">&times;</a>", escape(&page_href(view, None)));
    out.push_str("</aside>\n");
}

/// Link that keeps the current filters and selects `id`.
fn selection_href(view: &MapView, id: &LocationId) -> String {
    page_href(view, Some(id))
}

fn page_href(view: &MapView, selected: Option<&LocationId>) -> String {
    let Ok(mut url) = Url::parse("http://page/") else {
        return "/".to_owned();
    };
    {
        let filter = view.filter();
        let mut query = url.query_pairs_mut();
        if !filter.search_term().is_empty() {
            query.append_pair("search", filter.search_term());
        }
        if !filter.status_filters().is_empty() {
            let statuses: Vec<&str> = filter.status_filters().iter().map(String::as_str).collect();
            query.append_pair("status", &statuses.join(","));
        }
        if let Some(id) = selected {
            query.append_pair("selected", &id.to_string());
        }
    }
    match url.query() {
        Some(q) if !q.is_empty() => format!("/?{q}"),
        _ => "/".to_owned(),
    }
}

/// Escapes text for HTML/XML content and attribute values.
#[must_use]
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

#[cfg(test)]
mod tests {
    use chargemap_core::{Address, Coordinates, Location};

    use super::*;

    fn location(id: i64, name: &str, status: Option<&str>, lat: f64, lon: f64) -> Location {
        Location {
            location_id: LocationId::Number(id),
            address: Address {
                name: name.to_owned(),
                street: "Main St 1".to_owned(),
                zip_code: "10115".to_owned(),
                city: "Berlin".to_owned(),
                country_iso: "DE".to_owned(),
            },
            coordinates: Coordinates { lat, lon },
            connector_type: "Type 2".to_owned(),
            status: status.map(str::to_owned),
            max_power: 22.0,
            public: true,
            kind: "slow".to_owned(),
        }
    }

    fn view() -> MapView {
        let mut view = MapView::default();
        view.set_locations(vec![
            location(1, "Alpha & Sons", Some("Available"), 10.0, 10.0),
            location(2, "Beta", Some("In Use"), 20.0, 20.0),
        ]);
        view
    }

    #[test]
    fn escape_handles_markup() {
        assert_eq!(escape("<a href=\"x\">&'</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn svg_has_one_circle_per_filtered_point() {
        let mut view = view();
        let svg = render_svg(&view);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("width=\"800\" height=\"600\""));
        assert_eq!(svg.matches("<circle").count(), 2);
        assert!(svg.contains("translate(40,560)"));
        assert!(svg.contains("fill=\"rgb(59, 130, 246)\""));
        assert!(svg.contains("<title>Alpha &amp; Sons</title>"));

        view.toggle_status("In Use");
        assert_eq!(render_svg(&view).matches("<circle").count(), 1);
    }

    #[test]
    fn page_shows_error_instead_of_map() {
        let mut view = MapView::default();
        view.apply_load(Err(crate::error::LoadError::UnexpectedStatus {
            status: 502,
            url: "http://api/api/locations".to_owned(),
        }));
        let html = render_page(&view);
        assert!(html.contains("class=\"error\""));
        assert!(!html.contains("<svg"));
    }

    #[test]
    fn page_shows_badge_count_legend_and_detail() {
        let mut view = view();
        view.set_offline(true);
        view.set_search("beta");
        view.select(&LocationId::Number(2));
        let html = render_page(&view);

        assert!(html.contains(">Offline</span>"));
        assert!(html.contains("Showing 1 locations"));
        assert!(html.contains("bg-gray-500"), "legend lists unknown");
        assert!(html.contains("<aside class=\"detail\">"));
        assert!(html.contains("22kW"));
        assert!(html.contains("href=\"/?search=beta&amp;selected=2\""));
    }

    #[test]
    fn status_checkboxes_reflect_filter() {
        let mut view = view();
        view.toggle_status("Suspended");
        let html = render_page(&view);
        assert!(html.contains("value=\"suspended\" checked"));
        assert!(html.contains("value=\"available\">"));
    }
}
