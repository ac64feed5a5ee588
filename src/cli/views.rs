//! Data views: every command that renders backend data.
//!
//! Each handler fetches what it needs, derives through the same engines the
//! web API uses, and prints in the requested [`OutputFormat`].

use anyhow::Result;
use colored::Colorize;

use super::{
    OutputFormat, colorize_coverage, colorize_sentiment, connect, csv_field, format_number,
    load_dashboard, print_json, truncate,
};
use crate::analytics::aggregate::{self, FaqCandidate, Overview, SentimentTimeline, TopicGap};
use crate::backend::{Direction, FaqPerformance, LeaderboardEntry, ProcessGap};
use crate::dashboard::TableQuery;
use crate::model::{ClusterRecord, Coverage, Sentiment};
use crate::view::TableView;

// ---------------------------------------------------------------------------
// clusterboard clusters
// ---------------------------------------------------------------------------

/// Show one page of the filtered, sorted cluster table.
pub fn run_clusters(query: &TableQuery, format: OutputFormat) -> Result<()> {
    let (cfg, client) = connect()?;
    let mut dash = load_dashboard(&cfg, &client, false)?;

    let focus = dash.apply_query(query)?;
    if let Some(id) = query.select.as_deref()
        && !id.trim().is_empty()
        && focus.is_none()
        && format == OutputFormat::Table
    {
        eprintln!(
            "{} cluster {} is not visible under the current filters",
            "note:".dimmed(),
            id
        );
    }

    let table = dash.table();
    match format {
        OutputFormat::Json => print_json(&table)?,
        OutputFormat::Csv => print_clusters_csv(&table.rows),
        OutputFormat::Table => print_clusters_table(&table),
    }
    Ok(())
}

fn print_clusters_table(table: &TableView<'_>) {
    if table.total_count == 0 {
        println!("{}", "No clusters yet. Has the pipeline run?".yellow());
        return;
    }

    println!(
        "  {:<1} {:>6} {:>6} {:<40} {:<9} {:<9} {:>5} {:>7} {:<18}",
        "", "ID", "Msgs", "Top message", "Sentiment", "Coverage", "Score", "Sim", "Topic"
    );
    println!("  {}", "-".repeat(112));

    for (i, row) in table.rows.iter().enumerate() {
        let marker = if table.is_selected(&row.cluster_id) {
            "▶".cyan().bold()
        } else {
            " ".normal()
        };
        // Pad before colorizing so escape codes don't skew the columns.
        let sentiment = colorize_sentiment(row.sentiment);
        let sentiment_pad = " ".repeat(9usize.saturating_sub(row.sentiment.label().len()));
        let coverage = colorize_coverage(row.coverage);
        let coverage_pad = " ".repeat(9usize.saturating_sub(row.coverage.label().len()));

        let line = format!(
            "{:>6} {:>6} {:<40}",
            row.cluster_id.to_string(),
            format_number(row.message_count as usize),
            truncate(&row.top_message, 40),
        );
        let rest = format!(
            "{:>5} {:>7} {:<18}",
            row.resolution_score
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
            row.similarity_display(),
            truncate(&row.topic_label, 18),
        );

        let (line, rest) = if i % 2 == 0 {
            (line.normal(), rest.normal())
        } else {
            (line.dimmed(), rest.dimmed())
        };
        println!(
            "  {} {} {}{} {}{} {}",
            marker, line, sentiment, sentiment_pad, coverage, coverage_pad, rest
        );
    }

    println!();
    println!(
        "  {}",
        format!(
            "Page {}/{} · {} of {} clusters · sorted by {} {}",
            table.page,
            table.total_pages,
            table.filtered_count,
            table.total_count,
            table.sort.key,
            table.sort.order
        )
        .dimmed()
    );
}

fn print_clusters_csv(rows: &[&ClusterRecord]) {
    println!(
        "cluster_id,message_count,top_message,matched_faq,similarity,sentiment,coverage,resolution_score,topic_label,keywords,created_at"
    );
    for c in rows {
        println!(
            "{},{},{},{},{},{},{},{},{},{},{}",
            csv_field(c.cluster_id.as_str()),
            c.message_count,
            csv_field(&c.top_message),
            csv_field(c.matched_faq_display()),
            c.similarity.map(|s| format!("{s:.4}")).unwrap_or_default(),
            c.sentiment,
            c.coverage,
            c.resolution_score.map(|s| s.to_string()).unwrap_or_default(),
            csv_field(&c.topic_label),
            csv_field(&c.keywords.join("; ")),
            c.created_at.known().map(|d| d.to_string()).unwrap_or_default(),
        );
    }
}

// ---------------------------------------------------------------------------
// clusterboard stats
// ---------------------------------------------------------------------------

/// Show coverage, sentiment, resolution and mismatch summaries over the
/// clusters that pass `filters` (all of them when no filter is set).
pub fn run_stats(filters: &TableQuery, format: OutputFormat) -> Result<()> {
    let (cfg, client) = connect()?;
    let mut dash = load_dashboard(&cfg, &client, false)?;
    dash.apply_query(filters)?;
    let overview = aggregate::overview(
        dash.filtered(),
        cfg.dashboard.top_questions,
        cfg.dashboard.mismatch_similarity_threshold,
    );
    if format == OutputFormat::Table && !dash.view_state().filter.is_empty() {
        println!(
            "{}",
            format!(
                "{} of {} clusters match the filters",
                overview.total_clusters,
                dash.clusters().len()
            )
            .dimmed()
        );
    }

    match format {
        OutputFormat::Json => print_json(&overview)?,
        OutputFormat::Csv => print_stats_csv(&overview),
        OutputFormat::Table => print_stats_table(&overview),
    }
    Ok(())
}

fn print_stats_table(o: &Overview) {
    println!("{}", "FAQ Coverage Report".bold().cyan());
    println!("{}", "=".repeat(60));
    println!();
    println!("  {} {}", "Clusters:".bold(), format_number(o.total_clusters));
    println!(
        "  {} {}",
        "Messages:".bold(),
        format_number(o.total_messages as usize)
    );
    println!();

    println!("{}", "Coverage".bold().cyan());
    for c in Coverage::RATED {
        println!(
            "  {:<10} {:>6} {:>6.1}%",
            colorize_coverage(c),
            o.coverage.count(c),
            o.coverage.pct(c)
        );
    }
    if o.coverage.unknown > 0 {
        println!(
            "  {}",
            format!("{} cluster(s) without a coverage verdict", o.coverage.unknown).dimmed()
        );
    }
    println!();

    println!("{}", "Sentiment".bold().cyan());
    for s in Sentiment::ALL {
        let avg = match s {
            Sentiment::Positive => o.resolution_by_sentiment.positive,
            Sentiment::Neutral => o.resolution_by_sentiment.neutral,
            Sentiment::Negative => o.resolution_by_sentiment.negative,
        };
        println!(
            "  {:<10} {:>6} {:>6.1}%   avg resolution {:.2}",
            colorize_sentiment(s),
            o.sentiment.count(s),
            o.sentiment.pct(s),
            avg
        );
    }
    println!();

    println!("{}", "Resolution Scores".bold().cyan());
    let widest = o.resolution.buckets.iter().copied().max().unwrap_or(0).max(1);
    for score in 1..=5u8 {
        let count = o.resolution.count(score);
        let bar = "█".repeat((count * 30).div_ceil(widest).min(30));
        println!("  {score} {:>6} {}", count, bar.blue());
    }
    if o.resolution.unscored > 0 {
        println!(
            "  {}",
            format!("{} unscored", o.resolution.unscored).dimmed()
        );
    }
    println!();

    if !o.mismatches.is_empty() {
        println!("{}", "Weak FAQ Matches".bold().cyan());
        for (i, m) in o.mismatches.iter().take(15).enumerate() {
            let line = format!(
                "  {:>6} {:>6.1}% {:<36} → {}",
                m.cluster_id.to_string(),
                m.similarity * 100.0,
                truncate(&m.top_message, 36),
                truncate(&m.matched_faq, 36),
            );
            if i % 2 == 0 {
                println!("{line}");
            } else {
                println!("{}", line.dimmed());
            }
        }
        println!();
    }

    if !o.top_questions.is_empty() {
        println!("{}", "Top Questions".bold().cyan());
        for (i, q) in o.top_questions.iter().enumerate() {
            println!("  {:>2}. {}", i + 1, truncate(q, 70));
        }
    }
}

fn print_stats_csv(o: &Overview) {
    println!("metric,label,count,pct");
    for c in Coverage::RATED {
        println!("coverage,{},{},{:.1}", c, o.coverage.count(c), o.coverage.pct(c));
    }
    println!("coverage,Unknown,{},", o.coverage.unknown);
    for s in Sentiment::ALL {
        println!("sentiment,{},{},{:.1}", s, o.sentiment.count(s), o.sentiment.pct(s));
    }
    for score in 1..=5u8 {
        println!("resolution_score,{},{},", score, o.resolution.count(score));
    }
    println!("resolution_score,unscored,{},", o.resolution.unscored);
}

// ---------------------------------------------------------------------------
// clusterboard gaps
// ---------------------------------------------------------------------------

/// Show topics lacking FAQ coverage, plus the backend's process gaps.
pub fn run_gaps(format: OutputFormat) -> Result<()> {
    let (cfg, client) = connect()?;
    let dash = load_dashboard(&cfg, &client, false)?;
    let topics = aggregate::topic_gaps(dash.clusters());
    let (process, process_error) = client.process_gaps_or_empty()?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "topic_gaps": topics,
            "process_gaps": process,
            "process_gaps_error": process_error,
        }))?,
        OutputFormat::Csv => {
            if let Some(err) = &process_error {
                eprintln!("{} process gaps unavailable: {err}", "warning:".yellow().bold());
            }
            print_gaps_csv(&topics, &process);
        }
        OutputFormat::Table => print_gaps_table(&topics, &process, process_error.as_deref()),
    }
    Ok(())
}

fn print_gaps_table(topics: &[TopicGap], process: &[ProcessGap], process_error: Option<&str>) {
    println!("{}", "Coverage Gaps by Topic".bold().cyan());
    println!("{}", "=".repeat(50));
    if topics.is_empty() {
        println!("  {}", "Every cluster is fully covered.".green());
    }
    for gap in topics.iter().take(20) {
        println!("  {:<36} {:>6}", truncate(&gap.topic, 36), gap.count);
    }
    println!();

    println!("{}", "Process Gaps".bold().cyan());
    println!("{}", "=".repeat(50));
    if let Some(err) = process_error {
        println!("  {}", format!("unavailable: {err}").dimmed());
    }
    for gap in process {
        println!("  {} {}", gap.topic.bold(), format!("({})", gap.count).dimmed());
        for example in gap.example_preview() {
            println!("    {} {}", "·".dimmed(), truncate(example, 70));
        }
    }
}

fn print_gaps_csv(topics: &[TopicGap], process: &[ProcessGap]) {
    println!("kind,topic,count");
    for gap in topics {
        println!("coverage,{},{}", csv_field(&gap.topic), gap.count);
    }
    for gap in process {
        println!("process,{},{}", csv_field(&gap.topic), gap.count);
    }
}

// ---------------------------------------------------------------------------
// clusterboard timeline
// ---------------------------------------------------------------------------

/// Show daily message sentiment, optionally split per author.
pub fn run_timeline(by_author: bool, format: OutputFormat) -> Result<()> {
    let (cfg, client) = connect()?;
    let dash = load_dashboard(&cfg, &client, true)?;
    let timeline = aggregate::sentiment_timeline(dash.messages(), by_author);

    match format {
        OutputFormat::Json => print_json(&timeline)?,
        OutputFormat::Csv => print_timeline_csv(&timeline),
        OutputFormat::Table => print_timeline_table(&timeline, by_author),
    }
    Ok(())
}

fn print_timeline_table(timeline: &SentimentTimeline, by_author: bool) {
    if timeline.buckets.is_empty() {
        println!("{}", "No dated messages.".yellow());
    } else {
        println!("{}", "Message Sentiment Over Time".bold().cyan());
        println!("{}", "=".repeat(60));
        if by_author {
            println!(
                "  {:<12} {:<18} {:>8} {:>8} {:>8} {:>6}",
                "Date", "Author", "Positive", "Neutral", "Negative", "Total"
            );
        } else {
            println!(
                "  {:<12} {:>8} {:>8} {:>8} {:>6}",
                "Date", "Positive", "Neutral", "Negative", "Total"
            );
        }
        println!("  {}", "-".repeat(58));

        for b in &timeline.buckets {
            let author = match (&b.author, by_author) {
                (Some(a), true) => format!("{:<18} ", truncate(a, 18)),
                _ => String::new(),
            };
            println!(
                "  {:<12} {}{:>8} {:>8} {:>8} {:>6}",
                b.date.to_string(),
                author,
                b.counts.positive.to_string().green(),
                b.counts.neutral,
                b.counts.negative.to_string().red(),
                b.counts.total(),
            );
        }
    }

    if timeline.undated > 0 {
        println!();
        println!(
            "  {}",
            format!("{} message(s) without a timestamp", timeline.undated).dimmed()
        );
    }
}

fn print_timeline_csv(timeline: &SentimentTimeline) {
    println!("date,author,positive,neutral,negative");
    for b in &timeline.buckets {
        println!(
            "{},{},{},{},{}",
            b.date,
            csv_field(b.author.as_deref().unwrap_or_default()),
            b.counts.positive,
            b.counts.neutral,
            b.counts.negative,
        );
    }
}

// ---------------------------------------------------------------------------
// clusterboard suggestions
// ---------------------------------------------------------------------------

/// Show FAQ entries the evaluator suggested writing or rewriting.
pub fn run_suggestions(format: OutputFormat) -> Result<()> {
    let (cfg, client) = connect()?;
    let dash = load_dashboard(&cfg, &client, false)?;
    let candidates = aggregate::faq_candidates(dash.clusters());

    match format {
        OutputFormat::Json => print_json(&candidates)?,
        OutputFormat::Csv => print_suggestions_csv(&candidates),
        OutputFormat::Table => print_suggestions_table(&candidates),
    }
    Ok(())
}

fn print_suggestions_table(candidates: &[FaqCandidate]) {
    if candidates.is_empty() {
        println!("{}", "No FAQ suggestions.".green());
        return;
    }

    println!("{}", "Suggested FAQ Improvements".bold().cyan());
    println!("{}", "=".repeat(60));
    for c in candidates {
        println!();
        println!(
            "  {} {} {}",
            format!("#{}", c.cluster_id).bold(),
            colorize_coverage(c.coverage),
            c.resolution_score
                .map(|s| format!("score {s}/5"))
                .unwrap_or_default()
                .dimmed()
        );
        println!("  {} {}", "Q:".bold(), c.question);
        println!("  {} {}", "A:".bold(), truncate(&c.answer, 200));
        if let Some(matched) = &c.matched_faq {
            println!("  {} {}", "Replaces:".dimmed(), matched.question().dimmed());
        }
        if !c.reason.is_empty() {
            println!("  {} {}", "Why:".dimmed(), c.reason.dimmed());
        }
    }
}

fn print_suggestions_csv(candidates: &[FaqCandidate]) {
    println!("cluster_id,coverage,resolution_score,question,answer,reason");
    for c in candidates {
        println!(
            "{},{},{},{},{},{}",
            csv_field(c.cluster_id.as_str()),
            c.coverage,
            c.resolution_score.map(|s| s.to_string()).unwrap_or_default(),
            csv_field(&c.question),
            csv_field(&c.answer),
            csv_field(&c.reason),
        );
    }
}

// ---------------------------------------------------------------------------
// clusterboard leaderboard
// ---------------------------------------------------------------------------

/// Show this week's trending keywords.
pub fn run_leaderboard(format: OutputFormat) -> Result<()> {
    let (_, client) = connect()?;
    let entries = client.leaderboard()?;

    if entries.is_empty() && format == OutputFormat::Table {
        println!("{}", "No trending data found for this week.".yellow());
        return Ok(());
    }

    match format {
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Csv => print_leaderboard_csv(&entries),
        OutputFormat::Table => print_leaderboard_table(&entries),
    }
    Ok(())
}

fn print_leaderboard_table(entries: &[LeaderboardEntry]) {
    println!("{}", "Trending Keywords".bold().cyan());
    println!("{}", "=".repeat(60));
    println!(
        "  {:<24} {:>6} {:>6} {:>7} {:<9} {:>5}",
        "Keyword", "Count", "Prev", "Change", "Sentiment", "Msgs"
    );
    println!("  {}", "-".repeat(62));

    for e in entries {
        let change = format!("{:>7}", e.change_display());
        let change = match e.direction() {
            Direction::Up => change.green(),
            Direction::Down => change.red(),
            Direction::Flat => change.normal(),
        };
        let verdict = e.verdict();
        let pad = " ".repeat(9usize.saturating_sub(verdict.label().len()));
        println!(
            "  {:<24} {:>6} {:>6} {} {}{} {:>5}",
            truncate(&e.keyword, 24),
            e.count,
            e.previous_count,
            change,
            colorize_sentiment(verdict),
            pad,
            e.messages.len(),
        );
    }
}

fn print_leaderboard_csv(entries: &[LeaderboardEntry]) {
    println!("keyword,count,previous_count,change,positive,neutral,negative,verdict");
    for e in entries {
        println!(
            "{},{},{},{},{},{},{},{}",
            csv_field(&e.keyword),
            e.count,
            e.previous_count,
            e.change,
            e.sentiment.positive,
            e.sentiment.neutral,
            e.sentiment.negative,
            e.verdict(),
        );
    }
}

// ---------------------------------------------------------------------------
// clusterboard deflection
// ---------------------------------------------------------------------------

/// Show how often each FAQ deflected a ticket, week by week.
pub fn run_deflection(format: OutputFormat) -> Result<()> {
    let (_, client) = connect()?;
    let faqs = client.deflection_metrics()?;

    match format {
        OutputFormat::Json => print_json(&faqs)?,
        OutputFormat::Csv => print_deflection_csv(&faqs),
        OutputFormat::Table => print_deflection_table(&faqs),
    }
    Ok(())
}

fn print_deflection_table(faqs: &[FaqPerformance]) {
    if faqs.is_empty() {
        println!("{}", "No deflection data yet.".yellow());
        return;
    }

    println!("{}", "FAQ Deflection".bold().cyan());
    println!("{}", "=".repeat(60));
    println!(
        "  {:<44} {:>8} {:>10} {:>6}",
        "FAQ", "Total", "Last week", "Score"
    );
    println!("  {}", "-".repeat(72));

    for faq in faqs {
        let latest = faq.latest();
        println!(
            "  {:<44} {:>8} {:>10} {:>6}",
            truncate(&faq.question, 44),
            format_number(faq.total_deflections() as usize),
            latest.map(|t| t.week.as_str()).unwrap_or("-"),
            latest
                .and_then(|t| t.avg_resolution_score)
                .map(|s| format!("{s:.2}"))
                .unwrap_or_else(|| "-".to_string()),
        );
    }
}

fn print_deflection_csv(faqs: &[FaqPerformance]) {
    println!("question,week,deflection_count,avg_resolution_score");
    for faq in faqs {
        for point in &faq.trend {
            println!(
                "{},{},{},{}",
                csv_field(&faq.question),
                csv_field(&point.week),
                point.deflection_count,
                point
                    .avg_resolution_score
                    .map(|s| format!("{s:.2}"))
                    .unwrap_or_default(),
            );
        }
    }
}
