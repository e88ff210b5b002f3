use crate::config::AppConfig;
use crate::diagnostics::{Diagnostic, Severity};
use crate::format::escape_html;
use crate::map::MapView;
use crate::shell::Frame;
use anyhow::{Context, Result};

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const AWESOME_MARKERS_CSS: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.css";
const AWESOME_MARKERS_JS: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.js";
const GLYPHICONS_CSS: &str = "https://netdna.bootstrapcdn.com/bootstrap/3.0.0/css/bootstrap-glyphicons.css";

pub const BUDGET_HEADING: &str = "💰Budget";

/// How the budget control behaves on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    /// Editing the budget reloads the page from the server.
    Interactive,
    /// Standalone file; the budget is shown but cannot be changed.
    Static,
}

/// Render a frame as a complete HTML document.
pub fn render_page(config: &AppConfig, frame: &Frame, mode: PageMode) -> Result<String> {
    let map_section = match &frame.map {
        Some(view) => render_map_section(config, view)?,
        None => String::new(),
    };

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="fr">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="{leaflet_css}">
    <link rel="stylesheet" href="{glyphicons_css}">
    <link rel="stylesheet" href="{awesome_css}">
    <style>{css}</style>
</head>
<body>
    {header}
    {diagnostics}
    {map_section}
</body>
</html>"#,
        title = escape_html(&config.display.title),
        leaflet_css = LEAFLET_CSS,
        glyphicons_css = GLYPHICONS_CSS,
        awesome_css = AWESOME_MARKERS_CSS,
        css = inline_css(),
        header = render_header(config, frame.budget, mode),
        diagnostics = render_diagnostics(&frame.diagnostics),
        map_section = map_section,
    ))
}

fn render_header(config: &AppConfig, budget: u64, mode: PageMode) -> String {
    let control = match mode {
        PageMode::Interactive => format!(
            r#"<form method="get" action="/" class="budget-form">
            <label class="custom-label" for="budget"></label>
            <input type="number" id="budget" name="budget" min="0" step="{step}" value="{budget}" onchange="this.form.submit()">
        </form>"#,
            step = config.budget.step,
            budget = budget,
        ),
        PageMode::Static => format!(
            r#"<div class="budget-form"><input type="number" id="budget" value="{}" disabled></div>"#,
            budget
        ),
    };

    format!(
        r#"<header class="columns">
        <div class="col-title"><h1>{title}</h1></div>
        <div class="col-budget"><h1>{heading}</h1></div>
        <div class="col-input">{control}</div>
    </header>"#,
        title = escape_html(&config.display.title),
        heading = BUDGET_HEADING,
        control = control,
    )
}

fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    if diagnostics.is_empty() {
        return String::new();
    }
    let items: String = diagnostics
        .iter()
        .map(|d| {
            let (class, mark) = match d.severity {
                Severity::Info => ("info", "✅"),
                Severity::Warning => ("warning", "⚠️"),
                Severity::Error => ("error", "❌"),
            };
            format!(r#"<li class="{}">{} {}</li>"#, class, mark, escape_html(&d.message))
        })
        .collect();
    format!(r#"<ul class="diagnostics">{}</ul>"#, items)
}

fn render_map_section(config: &AppConfig, view: &MapView) -> Result<String> {
    // "</" would end the script element early
    let data = serde_json::to_string(view)
        .context("Failed to serialize map view")?
        .replace("</", "<\\/");

    Ok(format!(
        r#"<div id="map" style="width: {width}px; height: {height}px;"></div>
    <script src="{leaflet_js}"></script>
    <script src="{awesome_js}"></script>
    <script>const view = {data};</script>
    <script>{js}</script>"#,
        width = config.display.width,
        height = config.display.height,
        leaflet_js = LEAFLET_JS,
        awesome_js = AWESOME_MARKERS_JS,
        data = data,
        js = inline_javascript(),
    ))
}

fn inline_css() -> &'static str {
    r#"
body {
    background-color: #110c4b !important;
    margin: 0;
    padding: 1rem 2rem;
    font-family: system-ui, -apple-system, 'Segoe UI', sans-serif;
}

h1, h2, h3, h4, h5, h6 {
    color: #ff9807;
}

.columns {
    display: grid;
    grid-template-columns: 5fr 1fr 1fr;
    align-items: center;
    gap: 1rem;
}

.custom-label {
    font-size: 20px !important;
    font-weight: bold;
    color: rgb(250, 250, 250);
    display: flex;
    min-height: 1.5rem;
    margin-bottom: 0.25rem;
    align-items: center;
}

.budget-form input {
    font-size: 25px !important;
    width: 10ch !important;
    text-align: right;
}

.diagnostics {
    list-style: none;
    padding: 0;
    color: rgb(250, 250, 250);
}

.diagnostics .warning { color: #facc15; }
.diagnostics .error { color: #f87171; }

.leaflet-tooltip h1, .leaflet-tooltip h4 {
    color: #111827;
}
"#
}

fn inline_javascript() -> &'static str {
    r#"
const map = L.map('map', { center: view.center, zoom: view.zoom });
L.tileLayer(view.tiles.url, { attribution: view.tiles.attribution, subdomains: 'abcd', maxZoom: 20 }).addTo(map);
if (view.control_scale) {
    L.control.scale().addTo(map);
}
view.zones.forEach(function (zone) {
    L.geoJSON(zone.feature, { style: zone.style })
        .bindTooltip(zone.tooltip, { sticky: true })
        .addTo(map);
});
view.markers.forEach(function (marker) {
    const icon = L.AwesomeMarkers.icon({ icon: marker.icon, markerColor: marker.color, prefix: 'glyphicon' });
    L.marker(marker.location, { opacity: marker.opacity, icon: icon })
        .bindTooltip(marker.tooltip)
        .addTo(map);
});
"#
}
