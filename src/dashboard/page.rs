//! The single HTML page of a dashboard.

use super::state::DashboardData;

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn render(data: &DashboardData) -> String {
    let kind = data.kind();

    let options: String = data
        .provinces()
        .iter()
        .map(|p| format!("<option value=\"{0}\">{0}</option>", escape(p)))
        .collect();

    let (min, max) = data
        .date_bounds()
        .map(|(min, max)| (min.to_string(), max.to_string()))
        .unwrap_or_default();

    let slots: String = kind
        .charts()
        .iter()
        .map(|c| {
            format!(
                "<figure><img id=\"{id}\" alt=\"{title}\" src=\"/charts/{id}\"></figure>",
                id = c.id,
                title = escape(c.title)
            )
        })
        .collect();

    let ids = kind
        .charts()
        .iter()
        .map(|c| format!("\"{}\"", c.id))
        .collect::<Vec<_>>()
        .join(",");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>COVID-19 Belgium - {title}</title>
<style>
body {{ font-family: sans-serif; margin: 1rem 2rem; }}
.controls {{ display: flex; gap: 1rem; align-items: flex-start; margin-bottom: 1rem; }}
.charts {{ display: grid; grid-template-columns: repeat(auto-fit, minmax(480px, 1fr)); gap: 1rem; }}
figure {{ margin: 0; }}
img {{ width: 100%; }}
small {{ color: #666; }}
</style>
</head>
<body>
<h1>{title}</h1>
<small>Data source: Sciensano</small>
<div class="controls">
  <select id="dd_province" multiple size="6" title="Select Province">{options}</select>
  <label>Start <input type="date" id="start" min="{min}" max="{max}"></label>
  <label>End <input type="date" id="end" min="{min}" max="{max}"></label>
  <button id="clear" type="button">Clear</button>
</div>
<div class="charts">{slots}</div>
<script>
const charts = [{ids}];
function refresh() {{
  const params = new URLSearchParams();
  const selected = Array.from(document.getElementById("dd_province").selectedOptions).map(o => o.value);
  if (selected.length) params.set("provinces", selected.join(","));
  for (const key of ["start", "end"]) {{
    const value = document.getElementById(key).value;
    if (value) params.set(key, value);
  }}
  for (const id of charts) document.getElementById(id).src = "/charts/" + id + "?" + params.toString();
}}
for (const id of ["dd_province", "start", "end"]) document.getElementById(id).addEventListener("change", refresh);
document.getElementById("clear").addEventListener("click", () => {{
  document.getElementById("dd_province").selectedIndex = -1;
  document.getElementById("start").value = "";
  document.getElementById("end").value = "";
  refresh();
}});
</script>
</body>
</html>
"#,
        title = kind.title(),
    )
}
