//! Embedded HTML/CSS/JS frontend for the metrix web dashboard.
//!
//! The whole page is compiled into the binary as a string constant. It polls
//! `/api/dashboard` and renders the payload; the connection badge is driven
//! only by the snapshot's `state` field. Summary cards show the server-side
//! `totals`, not the latest sample.

/// The complete single-page dashboard HTML.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>metrix</title>
<style>
:root {
  --bg: #0d1117; --surface: #161b22; --border: #30363d;
  --text: #e6edf3; --muted: #8b949e; --accent: #58a6ff;
  --green: #3fb950; --yellow: #d29922; --red: #f85149;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
}
* { margin: 0; padding: 0; box-sizing: border-box; }
body { background: var(--bg); color: var(--text); font-family: var(--font); font-size: 14px; }
.app { max-width: 1200px; margin: 0 auto; padding: 24px; }
header { display: flex; justify-content: space-between; align-items: center;
  padding-bottom: 16px; margin-bottom: 24px; border-bottom: 1px solid var(--border); }
h1 { font-size: 22px; } h1 span { color: var(--accent); }
h2 { font-size: 15px; margin-bottom: 12px; color: var(--muted); font-weight: 600; }
.badge { padding: 4px 10px; border-radius: 12px; font-size: 12px; font-weight: 600; }
.badge.connected { background: rgba(63,185,80,.15); color: var(--green); }
.badge.demo { background: rgba(210,153,34,.15); color: var(--yellow); }
.badge.disconnected { background: rgba(248,81,73,.15); color: var(--red); }
.grid { display: grid; grid-template-columns: repeat(4, 1fr); gap: 16px; margin-bottom: 24px; }
.card { background: var(--surface); border: 1px solid var(--border); border-radius: 8px; padding: 16px; }
.card .value { font-size: 26px; font-weight: 600; }
.card .label { color: var(--muted); font-size: 12px; }
.panels { display: grid; grid-template-columns: 2fr 1fr; gap: 16px; margin-bottom: 24px; }
svg { width: 100%; height: 160px; }
table { width: 100%; border-collapse: collapse; }
td, th { text-align: left; padding: 6px 4px; border-bottom: 1px solid var(--border); }
th { color: var(--muted); font-weight: 500; font-size: 12px; }
button { background: var(--accent); color: #0d1117; border: 0; border-radius: 6px;
  padding: 6px 14px; font-weight: 600; cursor: pointer; }
button:disabled { opacity: .5; cursor: default; }
input { width: 100%; background: var(--bg); color: var(--text); border: 1px solid var(--border);
  border-radius: 6px; padding: 6px 8px; margin: 4px 0 10px; }
.notice { color: var(--muted); margin-bottom: 16px; }
.notice.error { color: var(--red); }
.check { display: flex; gap: 6px; align-items: center; margin-bottom: 10px; color: var(--muted); }
.check input { width: auto; margin: 0; }
a { color: var(--accent); }
ul { padding-left: 18px; } li { margin: 4px 0; }
</style>
</head>
<body>
<div class="app">
  <header>
    <h1><span>metrix</span> dashboard</h1>
    <div>
      <span id="badge" class="badge">loading</span>
      <button id="refresh">Refresh</button>
    </div>
  </header>
  <p id="notice" class="notice"></p>

  <div class="grid">
    <div class="card"><div class="label">Total visitors</div><div class="value" id="visitors">-</div></div>
    <div class="card"><div class="label">Total page views</div><div class="value" id="pageviews">-</div></div>
    <div class="card"><div class="label">Total errors</div><div class="value" id="errors">-</div></div>
    <div class="card"><div class="label">Avg latency ms</div><div class="value" id="latency">-</div></div>
  </div>

  <div class="panels">
    <div class="card"><h2>Traffic</h2><svg id="traffic" viewBox="0 0 600 160" preserveAspectRatio="none"></svg></div>
    <div class="card"><h2>Latency</h2><svg id="latencyChart" viewBox="0 0 300 160" preserveAspectRatio="none"></svg></div>
  </div>

  <div class="panels">
    <div class="card"><h2>Top endpoints</h2>
      <table><thead><tr><th>Path</th><th>Calls</th><th>Avg ms</th><th>Status</th></tr></thead><tbody id="endpoints"></tbody></table>
    </div>
    <div class="card"><h2>Locations</h2>
      <table><thead><tr><th>City</th><th>Country</th><th>Users</th></tr></thead><tbody id="geo"></tbody></table>
    </div>
  </div>

  <div class="panels">
    <div class="card"><h2>Insight</h2>
      <button id="analyze">Analyze</button>
      <div id="insight" style="margin-top:12px"></div>
    </div>
    <div class="card"><h2>Data source</h2>
      <form id="settings">
        <label>Endpoint URL</label><input id="endpoint" placeholder="https://example.com/metrics">
        <label>Bearer token</label><input id="credential" type="password" placeholder="optional">
        <label class="check"><input id="clearCredential" type="checkbox"> Remove stored token</label>
        <button type="submit">Save</button>
      </form>
      <p class="notice" style="margin-top:12px">Expected response format: <a href="/api/schema" target="_blank">/api/schema</a></p>
    </div>
  </div>
</div>
<script>
const $ = (id) => document.getElementById(id);
const num = (v) => (typeof v === 'number' && isFinite(v)) ? v : 0;
const esc = (s) => String(s ?? '').replace(/[&<>"]/g, c => ({'&':'&amp;','<':'&lt;','>':'&gt;','"':'&quot;'}[c]));

function line(values, w, h, color) {
  if (values.length < 2) return '';
  const max = Math.max(...values, 1);
  const pts = values.map((v, i) => `${(i / (values.length - 1)) * w},${h - (v / max) * (h - 10)}`);
  return `<polyline fill="none" stroke="${color}" stroke-width="2" points="${pts.join(' ')}"/>`;
}

function render(snap) {
  const badge = $('badge');
  badge.className = 'badge ' + snap.state;
  badge.textContent = snap.state;

  const notice = $('notice');
  notice.className = 'notice';
  if (snap.state === 'demo') {
    notice.textContent = 'No data source configured. Showing demo data.';
  } else if (snap.state === 'disconnected' && snap.refreshes > 0) {
    notice.className = 'notice error';
    notice.textContent = 'Data source unreachable: ' + (snap.failure || 'unknown error');
  } else {
    notice.textContent = snap.dropped_records ? `${snap.dropped_records} malformed records skipped.` : '';
  }

  const m = snap.payload.metrics || [];
  const t = snap.totals || {};
  $('visitors').textContent = num(t.visitors).toLocaleString();
  $('pageviews').textContent = num(t.page_views).toLocaleString();
  $('errors').textContent = num(t.errors).toLocaleString();
  $('latency').textContent = Math.round(num(t.avg_latency_ms));

  $('traffic').innerHTML = line(m.map(x => num(x.visitors)), 600, 160, '#58a6ff')
    + line(m.map(x => num(x.pageViews)), 600, 160, '#bc8cff');
  $('latencyChart').innerHTML = line(m.map(x => num(x.latency)), 300, 160, '#d29922');

  const eps = [...(snap.payload.endpoints || [])].sort((a, b) => num(b.calls) - num(a.calls)).slice(0, 10);
  $('endpoints').innerHTML = eps.map(e =>
    `<tr><td>${esc(e.path)}</td><td>${num(e.calls)}</td><td>${num(e.avgLatency)}</td><td>${num(e.status)}</td></tr>`).join('');
  $('geo').innerHTML = (snap.payload.geoData || []).map(g =>
    `<tr><td>${esc(g.city)}</td><td>${esc(g.country)}</td><td>${num(g.users)}</td></tr>`).join('');
}

async function load() {
  const res = await fetch('/api/dashboard');
  render(await res.json());
}

$('refresh').onclick = async () => {
  $('refresh').disabled = true;
  try { await fetch('/api/refresh', { method: 'POST' }); await load(); }
  finally { $('refresh').disabled = false; }
};

$('analyze').onclick = async () => {
  $('analyze').disabled = true;
  try {
    const ins = await (await fetch('/api/insight', { method: 'POST' })).json();
    const list = (xs) => '<ul>' + (xs || []).map(x => `<li>${esc(x)}</li>`).join('') + '</ul>';
    $('insight').innerHTML = `<p>${esc(ins.summary)}</p><h2 style="margin-top:12px">Anomalies</h2>${list(ins.anomalies)}`
      + `<h2 style="margin-top:12px">Recommendations</h2>${list(ins.recommendations)}`;
  } finally { $('analyze').disabled = false; }
};

function showConfig(c) {
  $('endpoint').value = c.endpoint || '';
  $('credential').value = '';
  $('credential').placeholder = c.has_credential ? `saved (${c.credential}), leave blank to keep` : 'optional';
  $('clearCredential').checked = false;
}

$('settings').onsubmit = async (ev) => {
  ev.preventDefault();
  // A blank token field keeps the stored token.
  const update = { endpoint: $('endpoint').value };
  if ($('credential').value.trim()) update.credential = $('credential').value;
  if ($('clearCredential').checked) update.clear_credential = true;
  const res = await (await fetch('/api/config', {
    method: 'PUT',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify(update),
  })).json();
  if (res.config) showConfig(res.config);
  await load();
};

fetch('/api/config').then(r => r.json()).then(showConfig);
load();
setInterval(load, 15000);
</script>
</body>
</html>
"##;
