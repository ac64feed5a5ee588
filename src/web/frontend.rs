//! Embedded HTML/CSS/JS frontend for the clusterboard web dashboard.
//!
//! The entire SPA is compiled into the binary as a string constant.
//! No external assets, no build tools, no CDN dependencies. All state that
//! matters (filters, sort, page, selection) lives server-side; the page
//! only renders what `/api/*` returns.

/// The complete single-page dashboard HTML.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>clusterboard</title>
<style>
:root {
  --bg: #0d1117;
  --surface: #161b22;
  --border: #30363d;
  --text: #e6edf3;
  --text-muted: #8b949e;
  --accent: #58a6ff;
  --green: #3fb950;
  --yellow: #d29922;
  --red: #f85149;
  --radius: 8px;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
  --mono: 'SF Mono', 'Cascadia Code', 'Fira Code', monospace;
}

* { margin: 0; padding: 0; box-sizing: border-box; }
body { background: var(--bg); color: var(--text); font-family: var(--font); font-size: 14px; line-height: 1.5; }
.app { max-width: 1280px; margin: 0 auto; padding: 24px; }

header {
  display: flex; align-items: center; justify-content: space-between;
  margin-bottom: 24px; padding-bottom: 16px; border-bottom: 1px solid var(--border);
}
header h1 { font-size: 22px; font-weight: 600; }
header h1 .logo { color: var(--accent); font-family: var(--mono); }
.actions { display: flex; gap: 8px; align-items: center; }

.badge {
  display: inline-flex; align-items: center; gap: 4px; padding: 4px 10px;
  border-radius: 12px; font-size: 12px; background: var(--surface); border: 1px solid var(--border);
}
.badge.ok { border-color: var(--green); color: var(--green); }
.badge.warn { border-color: var(--yellow); color: var(--yellow); }
.badge.err { border-color: var(--red); color: var(--red); }

button {
  padding: 6px 14px; border: 1px solid var(--border); border-radius: 6px;
  background: var(--surface); color: var(--text); font-size: 13px; cursor: pointer;
}
button:hover { border-color: var(--accent); }
button:disabled { opacity: 0.4; cursor: default; }
button.primary { background: var(--accent); border-color: var(--accent); color: #fff; }

nav {
  display: flex; gap: 4px; margin-bottom: 24px; background: var(--surface);
  border-radius: var(--radius); padding: 4px; border: 1px solid var(--border);
}
nav button { flex: 1; border: none; background: transparent; color: var(--text-muted); }
nav button.active { background: var(--accent); color: #fff; }

.panel { display: none; }
.panel.active { display: block; }

.card {
  background: var(--surface); border: 1px solid var(--border);
  border-radius: var(--radius); padding: 20px; margin-bottom: 16px;
}
.card h2 { font-size: 16px; font-weight: 600; margin-bottom: 16px; }

.filters { display: grid; grid-template-columns: repeat(auto-fit, minmax(150px, 1fr)); gap: 10px; margin-bottom: 16px; }
.filters label { font-size: 11px; color: var(--text-muted); text-transform: uppercase; display: block; margin-bottom: 2px; }
.filters input, .filters select {
  width: 100%; padding: 6px 8px; background: var(--bg); color: var(--text);
  border: 1px solid var(--border); border-radius: 6px; font-size: 13px;
}

table { width: 100%; border-collapse: collapse; font-size: 13px; }
th, td { text-align: left; padding: 8px 10px; border-bottom: 1px solid var(--border); vertical-align: top; }
th { color: var(--text-muted); font-weight: 500; font-size: 12px; text-transform: uppercase; cursor: pointer; white-space: nowrap; }
th.sorted { color: var(--accent); }
td.num, th.num { text-align: right; font-family: var(--mono); }
tr:hover { background: rgba(255,255,255,0.02); }
tr.selected { background: rgba(88,166,255,0.12); outline: 1px solid var(--accent); }
.Positive, .Fully { color: var(--green); }
.Negative, .Not { color: var(--red); }
.Partially { color: var(--yellow); }
.Unknown { color: var(--text-muted); }

.pager { display: flex; justify-content: space-between; align-items: center; margin-top: 12px; color: var(--text-muted); font-size: 12px; }
.pager .buttons { display: flex; gap: 6px; }

.stats-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(180px, 1fr)); gap: 16px; margin-bottom: 16px; }
.stat-card { background: var(--surface); border: 1px solid var(--border); border-radius: var(--radius); padding: 16px; text-align: center; }
.stat-card .value { font-size: 28px; font-weight: 700; font-family: var(--mono); color: var(--accent); }
.stat-card .label { font-size: 12px; color: var(--text-muted); text-transform: uppercase; }

.dist-bar { display: flex; height: 26px; border-radius: 6px; overflow: hidden; margin-bottom: 8px; }
.dist-bar .seg { display: flex; align-items: center; justify-content: center; font-size: 11px; color: #fff; min-width: 2px; }
.seg.Positive, .seg.Fully { background: var(--green); color: #fff; }
.seg.Neutral { background: var(--text-muted); }
.seg.Negative, .seg.Not { background: var(--red); color: #fff; }
.seg.Partially { background: var(--yellow); color: #fff; }

.chart { display: flex; align-items: flex-end; gap: 4px; height: 160px; }
.chart .col { flex: 1; display: flex; flex-direction: column-reverse; height: 100%; }
.chart .col div { width: 100%; min-height: 0; }
.chart-labels { display: flex; gap: 4px; font-size: 10px; color: var(--text-muted); }
.chart-labels span { flex: 1; text-align: center; overflow: hidden; }

svg.map { width: 100%; height: 480px; background: var(--bg); border-radius: var(--radius); }
svg.map circle { cursor: pointer; opacity: 0.8; }
svg.map circle:hover { opacity: 1; stroke: #fff; }

.suggestion { border-left: 3px solid var(--accent); padding: 8px 12px; margin-bottom: 12px; }
.suggestion .q { font-weight: 600; }
.suggestion .meta { color: var(--text-muted); font-size: 12px; }

.empty { text-align: center; padding: 32px; color: var(--text-muted); }
.error-banner { display: none; margin-bottom: 16px; padding: 10px 14px; border: 1px solid var(--red); color: var(--red); border-radius: var(--radius); }

.toast {
  position: fixed; bottom: 24px; right: 24px; background: var(--surface); border: 1px solid var(--green);
  color: var(--green); padding: 10px 16px; border-radius: var(--radius); opacity: 0; transition: opacity 0.2s;
}
.toast.show { opacity: 1; }
.toast.error { border-color: var(--red); color: var(--red); }
</style>
</head>
<body>
<div class="app">

  <header>
    <h1><span class="logo">clusterboard</span> FAQ Clusters</h1>
    <div class="actions">
      <span id="status-badge"></span>
      <span id="session-badge"></span>
      <button id="refresh-btn">Refresh</button>
      <button id="trigger-btn" class="primary" style="display:none">Run pipeline</button>
    </div>
  </header>

  <div class="error-banner" id="error-banner"></div>

  <nav id="nav">
    <button class="active" data-panel="clusters">Clusters</button>
    <button data-panel="map">Map</button>
    <button data-panel="insights">Insights</button>
    <button data-panel="timeline">Timeline</button>
    <button data-panel="suggestions">Suggestions</button>
    <button data-panel="gaps">Gaps</button>
  </nav>

  <!-- Clusters -->
  <div class="panel active" id="panel-clusters">
    <div class="card">
      <div class="filters" id="filters">
        <div><label>Search</label><input id="f-search" placeholder="message, summary, keyword"></div>
        <div><label>Sentiment</label><select id="f-sentiment">
          <option value="">All</option><option>Positive</option><option>Neutral</option><option>Negative</option>
        </select></div>
        <div><label>Coverage</label><select id="f-coverage">
          <option value="">All</option><option>Fully</option><option>Partially</option><option>Not</option><option>Unknown</option>
        </select></div>
        <div><label>Keyword</label><input id="f-keyword"></div>
        <div><label>Min score</label><select id="f-min-score">
          <option value="0">Any</option><option>1</option><option>2</option><option>3</option><option>4</option><option>5</option>
        </select></div>
        <div><label>From</label><input id="f-date-from" type="date"></div>
        <div><label>To</label><input id="f-date-to" type="date"></div>
      </div>
      <table>
        <thead><tr id="table-head"></tr></thead>
        <tbody id="table-body"></tbody>
      </table>
      <div class="empty" id="table-empty" style="display:none">No clusters match the current filters.</div>
      <div class="pager">
        <span id="pager-info"></span>
        <span class="buttons">
          <button id="prev-btn">&larr; Prev</button>
          <button id="next-btn">Next &rarr;</button>
        </span>
      </div>
    </div>
  </div>

  <!-- Map -->
  <div class="panel" id="panel-map">
    <div class="card">
      <h2>Cluster Map</h2>
      <svg class="map" id="map" viewBox="0 0 1000 480" preserveAspectRatio="none"></svg>
      <div class="empty" id="map-empty" style="display:none">No map points in this snapshot.</div>
    </div>
  </div>

  <!-- Insights -->
  <div class="panel" id="panel-insights">
    <label class="meta"><input type="checkbox" id="insights-filtered" onchange="loadInsights()"> Only clusters matching the table filters</label>
    <div class="stats-grid">
      <div class="stat-card"><div class="value" id="stat-clusters">-</div><div class="label">Clusters</div></div>
      <div class="stat-card"><div class="value" id="stat-messages">-</div><div class="label">Messages</div></div>
      <div class="stat-card"><div class="value" id="stat-covered">-</div><div class="label">Fully Covered</div></div>
      <div class="stat-card"><div class="value" id="stat-mismatches">-</div><div class="label">Weak Matches</div></div>
    </div>
    <div class="card"><h2>Coverage</h2><div class="dist-bar" id="coverage-bar"></div></div>
    <div class="card"><h2>Sentiment</h2><div class="dist-bar" id="sentiment-bar"></div><div id="resolution-by-sentiment" class="pager"></div></div>
    <div class="card"><h2>Resolution Scores</h2><div class="chart" id="histogram"></div><div class="chart-labels" id="histogram-labels"></div></div>
    <div class="card"><h2>Weak FAQ Matches</h2>
      <table><thead><tr><th>Cluster</th><th>Top message</th><th>Matched FAQ</th><th class="num">Similarity</th></tr></thead>
      <tbody id="mismatch-body"></tbody></table>
    </div>
    <div class="card"><h2>Top Questions</h2><ol id="top-questions" style="padding-left:20px"></ol></div>
  </div>

  <!-- Timeline -->
  <div class="panel" id="panel-timeline">
    <div class="card">
      <h2>Message Sentiment Over Time</h2>
      <div class="chart" id="timeline-chart"></div>
      <div class="chart-labels" id="timeline-labels"></div>
      <div class="pager"><span id="timeline-undated"></span></div>
    </div>
  </div>

  <!-- Suggestions -->
  <div class="panel" id="panel-suggestions">
    <div class="card"><h2>Suggested FAQ Entries</h2><div id="suggestions"></div></div>
  </div>

  <!-- Gaps -->
  <div class="panel" id="panel-gaps">
    <div class="card"><h2>Coverage Gaps by Topic</h2>
      <table><thead><tr><th>Topic</th><th class="num">Clusters</th></tr></thead><tbody id="topic-gaps"></tbody></table>
    </div>
    <div class="card"><h2>Process Gaps</h2><div id="process-gaps"></div></div>
  </div>

  <div class="toast" id="toast"></div>
</div>

<script>
// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------
const COLUMNS = [
  ['cluster_id', 'ID', 'num'], ['message_count', 'Msgs', 'num'], ['top_message', 'Top message'],
  ['matched_faq', 'Matched FAQ'], ['similarity', 'Sim', 'num'], ['sentiment', 'Sentiment'],
  ['coverage', 'Coverage'], ['resolution_score', 'Score', 'num'], ['topic_label', 'Topic'],
  ['keywords', 'Keywords'], ['created_at', 'Created'],
];
let table = null;
let sort = { key: null, order: null };
let page = 1;
let session = null;

// ---------------------------------------------------------------------------
// API helpers
// ---------------------------------------------------------------------------
async function api(method, path) {
  const res = await fetch(path, { method });
  const data = await res.json();
  if (res.status === 401) {
    showError(`Not logged in. <a href="${esc(data.login_url)}">Log in</a> and reload.`);
    throw new Error('auth');
  }
  if (!res.ok) throw new Error(data.error || res.statusText);
  return data;
}

function toast(msg, isError) {
  const el = document.getElementById('toast');
  el.textContent = msg;
  el.className = 'toast show' + (isError ? ' error' : '');
  setTimeout(() => el.className = 'toast', 3000);
}

function showError(html) {
  const el = document.getElementById('error-banner');
  el.innerHTML = html;
  el.style.display = html ? 'block' : 'none';
}

function fmt(n) {
  if (n === undefined || n === null) return '-';
  return n.toLocaleString();
}

function esc(s) {
  if (s === undefined || s === null) return '';
  return String(s).replace(/&/g,'&amp;').replace(/</g,'&lt;').replace(/>/g,'&gt;').replace(/"/g,'&quot;');
}

function faqText(m) {
  if (!m) return 'None';
  return typeof m === 'string' ? m : m.question;
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------
function showPanel(panel) {
  document.querySelectorAll('nav button').forEach(b => b.classList.toggle('active', b.dataset.panel === panel));
  document.querySelectorAll('.panel').forEach(p => p.classList.toggle('active', p.id === 'panel-' + panel));
  loadPanel(panel).catch(e => e.message !== 'auth' && toast(e.message, true));
}

document.getElementById('nav').addEventListener('click', e => {
  if (e.target.dataset.panel) showPanel(e.target.dataset.panel);
});

async function loadPanel(panel) {
  switch (panel) {
    case 'clusters': return loadTable();
    case 'map': return loadMap();
    case 'insights': return loadInsights();
    case 'timeline': return loadTimeline();
    case 'suggestions': return loadSuggestions();
    case 'gaps': return loadGaps();
  }
}

// ---------------------------------------------------------------------------
// Clusters table
// ---------------------------------------------------------------------------
function tableQuery(extra) {
  const v = id => document.getElementById(id).value;
  const params = new URLSearchParams({
    search: v('f-search'), sentiment: v('f-sentiment'), coverage: v('f-coverage'),
    keyword: v('f-keyword'), min_score: v('f-min-score'), date_from: v('f-date-from'),
    date_to: v('f-date-to'), page: String(page),
  });
  if (sort.key) { params.set('sort', sort.key); params.set('order', sort.order); }
  for (const [k, val] of Object.entries(extra || {})) params.set(k, val);
  return params.toString();
}

async function loadTable(extra) {
  renderTable(await api('GET', '/api/table?' + tableQuery(extra)));
}

function renderTable(data) {
  table = data.table;
  page = table.page;
  sort = table.sort;

  document.getElementById('table-head').innerHTML = COLUMNS.map(([key, label, cls]) => {
    const arrow = sort.key === key ? (sort.order === 'asc' ? ' &uarr;' : ' &darr;') : '';
    return `<th class="${cls || ''} ${sort.key === key ? 'sorted' : ''}" data-key="${key}">${label}${arrow}</th>`;
  }).join('');

  document.getElementById('table-body').innerHTML = table.rows.map(r => `
    <tr id="row-${esc(r.cluster_id)}" class="${r.cluster_id === table.selected_cluster_id ? 'selected' : ''}">
      <td class="num">${esc(r.cluster_id)}</td>
      <td class="num">${fmt(r.message_count)}</td>
      <td>${esc(r.top_message)}</td>
      <td>${esc(faqText(r.matched_faq))}</td>
      <td class="num">${r.similarity === null ? 'N/A' : (r.similarity * 100).toFixed(1) + '%'}</td>
      <td class="${r.sentiment}">${r.sentiment}</td>
      <td class="${r.coverage}">${r.coverage}</td>
      <td class="num">${r.resolution_score ?? '-'}</td>
      <td>${esc(r.topic_label)}</td>
      <td>${esc(r.keywords.slice(0, 3).join(', '))}${r.keywords.length > 3 ? '...' : ''}</td>
      <td>${esc(r.created_at)}</td>
    </tr>`).join('');

  document.getElementById('table-empty').style.display = table.rows.length ? 'none' : 'block';
  document.getElementById('pager-info').textContent =
    `Page ${table.page} of ${table.total_pages} · ${fmt(table.filtered_count)} of ${fmt(table.total_count)} clusters`;
  document.getElementById('prev-btn').disabled = table.page <= 1;
  document.getElementById('next-btn').disabled = table.page >= table.total_pages;

  if (data.focus) {
    const row = document.getElementById('row-' + data.focus.cluster_id);
    if (row) row.scrollIntoView({ block: 'center', behavior: 'smooth' });
  }
  renderStatus(data.status);
}

document.getElementById('table-head').addEventListener('click', e => {
  const key = e.target.closest('th')?.dataset.key;
  if (!key) return;
  sort = { key, order: sort.key === key && sort.order === 'asc' ? 'desc' : 'asc' };
  loadTable();
});

document.getElementById('filters').addEventListener('change', () => { page = 1; loadTable(); });
document.getElementById('f-search').addEventListener('input', () => { page = 1; loadTable(); });
document.getElementById('prev-btn').addEventListener('click', () => { page -= 1; loadTable(); });
document.getElementById('next-btn').addEventListener('click', () => { page += 1; loadTable(); });

async function selectCluster(id) {
  showPanel('clusters');
  const data = await api('POST', '/api/select?cluster_id=' + encodeURIComponent(id));
  renderTable(data);
  if (!data.focus) toast(`Cluster ${id} is hidden by the current filters`, true);
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------
async function loadMap() {
  const series = await api('GET', '/api/map');
  const points = series.flatMap(s => s.points.map(p => ({ ...p, hue: s.hue })));
  document.getElementById('map-empty').style.display = points.length ? 'none' : 'block';
  if (!points.length) { document.getElementById('map').innerHTML = ''; return; }

  const xs = points.map(p => p.x), ys = points.map(p => p.y);
  const [x0, x1, y0, y1] = [Math.min(...xs), Math.max(...xs), Math.min(...ys), Math.max(...ys)];
  const sx = x => 20 + (x - x0) / ((x1 - x0) || 1) * 960;
  const sy = y => 460 - (y - y0) / ((y1 - y0) || 1) * 440;

  document.getElementById('map').innerHTML = points.map(p => {
    const e = p.enrichment;
    const tip = e ? `#${p.label} ${e.top_message}\n${e.sentiment} · ${e.coverage} · score ${e.resolution_score ?? '-'}` : `#${p.label}`;
    return `<circle cx="${sx(p.x)}" cy="${sy(p.y)}" r="5" fill="hsl(${p.hue},70%,60%)" data-id="${esc(p.label)}"><title>${esc(tip)}</title></circle>`;
  }).join('');
}

document.getElementById('map').addEventListener('click', e => {
  const id = e.target.dataset?.id;
  if (id) selectCluster(id).catch(err => toast(err.message, true));
});

// ---------------------------------------------------------------------------
// Insights
// ---------------------------------------------------------------------------
function distBar(id, entries) {
  document.getElementById(id).innerHTML = entries
    .filter(([, p]) => p > 0)
    .map(([label, p]) => `<div class="seg ${label}" style="width:${p}%">${label} ${p.toFixed(1)}%</div>`)
    .join('');
}

function pctOf(count, total) { return total ? count * 100 / total : 0; }

async function loadInsights() {
  const scope = document.getElementById('insights-filtered').checked ? 'filtered' : 'all';
  const o = await api('GET', '/api/stats?scope=' + scope);
  const cov = o.coverage, rated = cov.fully + cov.partially + cov.not;
  const sen = o.sentiment, senTotal = sen.positive + sen.neutral + sen.negative;

  document.getElementById('stat-clusters').textContent = fmt(o.total_clusters);
  document.getElementById('stat-messages').textContent = fmt(o.total_messages);
  document.getElementById('stat-covered').textContent = pctOf(cov.fully, rated).toFixed(1) + '%';
  document.getElementById('stat-mismatches').textContent = fmt(o.mismatches.length);

  distBar('coverage-bar', [['Fully', pctOf(cov.fully, rated)], ['Partially', pctOf(cov.partially, rated)], ['Not', pctOf(cov.not, rated)]]);
  distBar('sentiment-bar', [['Positive', pctOf(sen.positive, senTotal)], ['Neutral', pctOf(sen.neutral, senTotal)], ['Negative', pctOf(sen.negative, senTotal)]]);
  const r = o.resolution_by_sentiment;
  document.getElementById('resolution-by-sentiment').textContent =
    `Avg resolution: positive ${r.positive.toFixed(2)} · neutral ${r.neutral.toFixed(2)} · negative ${r.negative.toFixed(2)}`;

  const max = Math.max(1, ...o.resolution.buckets);
  document.getElementById('histogram').innerHTML = o.resolution.buckets
    .map(n => `<div class="col"><div style="height:${n * 100 / max}%;background:var(--accent)" title="${n}"></div></div>`).join('');
  document.getElementById('histogram-labels').innerHTML = [1, 2, 3, 4, 5].map(s => `<span>${s}</span>`).join('');

  document.getElementById('mismatch-body').innerHTML = o.mismatches.map(m => `
    <tr onclick="selectCluster('${esc(m.cluster_id)}')">
      <td class="num">${esc(m.cluster_id)}</td><td>${esc(m.top_message)}</td>
      <td>${esc(m.matched_faq)}</td><td class="num">${(m.similarity * 100).toFixed(1)}%</td>
    </tr>`).join('');
  document.getElementById('top-questions').innerHTML = o.top_questions.map(q => `<li>${esc(q)}</li>`).join('');
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------
async function loadTimeline() {
  const t = await api('GET', '/api/timeline');
  const max = Math.max(1, ...t.buckets.map(b => b.positive + b.neutral + b.negative));
  const seg = (n, color) => `<div style="height:${n * 100 / max}%;background:${color}" title="${n}"></div>`;
  document.getElementById('timeline-chart').innerHTML = t.buckets.map(b =>
    `<div class="col">${seg(b.positive, 'var(--green)')}${seg(b.neutral, 'var(--text-muted)')}${seg(b.negative, 'var(--red)')}</div>`).join('');
  document.getElementById('timeline-labels').innerHTML = t.buckets.map(b => `<span>${b.date.slice(5)}</span>`).join('');
  document.getElementById('timeline-undated').textContent = t.undated ? `${t.undated} message(s) without a timestamp` : '';
}

// ---------------------------------------------------------------------------
// Suggestions and gaps
// ---------------------------------------------------------------------------
async function loadSuggestions() {
  const list = await api('GET', '/api/suggestions');
  document.getElementById('suggestions').innerHTML = list.length ? list.map(s => `
    <div class="suggestion">
      <div class="q">${esc(s.question)}</div>
      <div>${esc(s.answer)}</div>
      <div class="meta">#${esc(s.cluster_id)} · <span class="${s.coverage}">${s.coverage}</span>
        ${s.matched_faq ? ' · replaces: ' + esc(faqText(s.matched_faq)) : ''}
        ${s.reason ? ' · ' + esc(s.reason) : ''}</div>
    </div>`).join('') : '<div class="empty">No FAQ suggestions.</div>';
}

async function loadGaps() {
  const g = await api('GET', '/api/gaps');
  document.getElementById('topic-gaps').innerHTML = g.topic_gaps
    .map(t => `<tr><td>${esc(t.topic)}</td><td class="num">${fmt(t.count)}</td></tr>`).join('');
  document.getElementById('process-gaps').innerHTML = (g.process_gaps_error
    ? `<div class="empty">Process gaps unavailable: ${esc(g.process_gaps_error)}</div>` : '') +
    g.process_gaps.map(p => `
    <div class="suggestion"><div class="q">${esc(p.topic)} <span class="meta">(${fmt(p.count)})</span></div>
    ${p.examples.slice(0, 5).map(e => `<div class="meta">· ${esc(e)}</div>`).join('')}</div>`).join('');
}

// ---------------------------------------------------------------------------
// Session, status and refresh
// ---------------------------------------------------------------------------
function badge(label, cls) {
  return `<span class="badge ${cls}">${esc(label)}</span>`;
}

function renderStatus(s) {
  const label = s.loading ? 'loading' : s.error ? 'stale' : s.has_data ? 'live' : 'empty';
  const cls = s.loading ? 'warn' : s.error ? 'err' : 'ok';
  document.getElementById('status-badge').innerHTML = badge(label, cls);
  if (s.error && s.has_data) showError('Last refresh failed: ' + esc(s.error) + '. Showing the previous snapshot.');
  else if (s.error) showError('Could not load clusters: ' + esc(s.error));
  else showError('');
}

async function loadSession() {
  session = await api('GET', '/api/session');
  document.getElementById('session-badge').innerHTML = session.logged_in
    ? badge(session.username + (session.is_admin ? ' (admin)' : ''), 'ok')
    : `<a class="badge err" href="${esc(session.login_url)}">log in</a>`;
  document.getElementById('trigger-btn').style.display = session.is_admin ? '' : 'none';
}

async function waitForRefresh(token) {
  for (let i = 0; i < 60; i++) {
    const s = await api('GET', '/api/status');
    renderStatus(s);
    if (!s.loading || s.last_token !== token) break;
    await new Promise(r => setTimeout(r, 1000));
  }
  const active = document.querySelector('nav button.active').dataset.panel;
  await loadPanel(active);
}

document.getElementById('refresh-btn').addEventListener('click', async () => {
  try {
    const r = await api('POST', '/api/refresh');
    await waitForRefresh(r.token);
  } catch (e) { if (e.message !== 'auth') toast(e.message, true); }
});

document.getElementById('trigger-btn').addEventListener('click', async () => {
  try {
    const r = await api('POST', '/api/trigger-pipeline');
    toast('Pipeline triggered' + (r.status ? ': ' + r.status : ''));
  } catch (e) { if (e.message !== 'auth') toast(e.message, true); }
});

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------
loadSession().catch(() => {});
api('GET', '/api/status').then(s => waitForRefresh(s.last_token)).catch(() => {});
</script>
</body>
</html>"##;
