use super::Command;
use anyhow::{Context, Result, bail};
use taxwatch::core::{
    AnalysisDetail, AnalysisSummary, CrawlLog, NewsArticle, NewsStats, WeeklyStats,
};
use taxwatch::query::PageSource;
use taxwatch::{FeedDisplay, FeedView, TaxWatch};

/// Run a one-shot command and print its result to stdout.
pub async fn run(watch: &TaxWatch, command: Command) -> Result<()> {
    match command {
        Command::News { page, priority } => {
            let feed = watch
                .news_feed()
                .with_filter(taxwatch::api::keys::PRIORITY, priority);
            let display = load_page(feed, page).await?;
            for article in display.items() {
                println!("{}", article_line(article));
            }
            println!("{}", pagination_text(&display));
        }
        Command::Article { id } => {
            let article = watch
                .news_detail(&id)
                .await
                .with_context(|| format!("failed to load article {}", id))?;
            println!("{}", article_text(&article));
        }
        Command::Analyses { page, week } => {
            let display = load_page(watch.analyses_feed(week), page).await?;
            for analysis in display.items() {
                println!("{}", analysis_line(analysis));
            }
            println!("{}", pagination_text(&display));
        }
        Command::Analysis { id } => {
            let detail = watch
                .analysis_detail(&id)
                .await
                .with_context(|| format!("failed to load analysis {}", id))?;
            println!("{}", analysis_text(&detail));
        }
        Command::Stats { week } => {
            let stats = watch
                .fetch_weekly_stats(week)
                .await
                .context("failed to load weekly stats")?;
            println!("{}", weekly_stats_text(&stats));
        }
        Command::NewsStats => {
            let stats = watch
                .fetch_news_stats()
                .await
                .context("failed to load news stats")?;
            println!("{}", news_stats_text(&stats));
        }
        Command::History => {
            let history = watch
                .fetch_crawl_history()
                .await
                .context("failed to load crawl history")?;
            if history.is_empty() {
                println!("No crawls yet");
            }
            for log in history.iter() {
                println!("{}", crawl_line(log));
            }
        }
        Command::Crawl => {
            let result = watch.trigger_crawl().await.context("crawl failed")?;
            println!("Crawl finished: {} documents saved", result.saved);
        }
        Command::CrawlNews => {
            let result = watch
                .trigger_news_crawl()
                .await
                .context("news crawl failed")?;
            println!(
                "News crawl finished: {} of {} articles saved",
                result.saved, result.total
            );
        }
        Command::PostNews => {
            let result = watch.trigger_news_post().await.context("news post failed")?;
            println!("Posted {} articles", result.posted);
        }
        Command::Dashboard { .. } => bail!("the dashboard is not a one-shot command"),
    }
    Ok(())
}

async fn load_page<S: PageSource>(mut feed: FeedView<S>, page: usize) -> Result<FeedDisplay<S::Item>> {
    if page < 1 {
        bail!("pages start at 1");
    }
    feed.go_to(page)?;
    feed.open()?;
    let display = feed.settled().await?;
    if let Some(err) = display.error.clone() {
        return Err(err).with_context(|| format!("failed to load {}", display.key));
    }
    Ok(display)
}

pub fn pagination_text<T>(display: &FeedDisplay<T>) -> String {
    match (&display.pagination, display.total()) {
        (Some(pagination), _) if pagination.is_past_end() => format!(
            "Page {} is past the last page ({} results on {} pages)",
            pagination.current_page(),
            pagination.total_items(),
            pagination.total_pages()
        ),
        (Some(pagination), _) => format!(
            "{} (page {} of {})",
            pagination,
            pagination.current_page(),
            pagination.total_pages()
        ),
        (None, Some(0)) | (None, None) => "No results".to_string(),
        (None, Some(total)) if display.items().is_empty() => {
            format!("Nothing on this page ({} results in total)", total)
        }
        (None, Some(total)) => format!("{} result{}", total, if total == 1 { "" } else { "s" }),
    }
}

pub fn article_line(article: &NewsArticle) -> String {
    format!(
        "{:<6} {}  {}  ({}, {})",
        article.priority,
        article.published_at.format("%Y-%m-%d"),
        article.title,
        article.source_name,
        article.id
    )
}

pub fn article_text(article: &NewsArticle) -> String {
    let mut out = vec![
        format!("{} [{}]", article.title, article.priority),
        format!(
            "{} | published {}",
            article.source_name,
            article.published_at.format("%Y-%m-%d %H:%M")
        ),
        article.source_url.clone(),
    ];
    if !article.tax_types.is_empty() {
        out.push(format!("Tax types: {}", article.tax_types.join(", ")));
    }
    if !article.affected_industries.is_empty() {
        out.push(format!("Industries: {}", article.affected_industries.join(", ")));
    }
    out.push(String::new());
    out.push(article.summary.clone());

    if let Some(analysis) = &article.detailed_analysis {
        out.push(String::new());
        out.push(format!("Legal hotspots: {}", analysis.signals.legal_hotspots));
        out.push(format!("Hidden impacts: {}", analysis.signals.hidden_impacts));
        for item in &analysis.action_checklist {
            out.push(format!("  [ ] {}", item));
        }
    }
    out.join("\n")
}

pub fn analysis_line(analysis: &AnalysisSummary) -> String {
    let kind = if analysis.old_document.is_some() {
        "revised"
    } else {
        "new"
    };
    format!(
        "{} {:<8} {} changes ({} high)  {}  ({})",
        analysis.new_document.document_number,
        kind,
        analysis.total_changes,
        analysis.high_priority_count,
        analysis.new_document.title,
        analysis.id
    )
}

pub fn analysis_text(detail: &AnalysisDetail) -> String {
    let mut out = vec![
        format!(
            "{} {}",
            detail.new_document.document_number, detail.new_document.title
        ),
        format!(
            "Week {} | {} changes, {} high priority",
            detail.week_number, detail.total_changes, detail.high_priority_count
        ),
    ];
    if let Some(old) = &detail.old_document {
        out.push(format!("Replaces {} {}", old.document_number, old.title));
    }
    out.push(String::new());
    out.push(detail.analysis.summary.clone());

    for change in &detail.analysis.changes {
        out.push(String::new());
        out.push(format!("[{}] {}: {}", change.priority, change.category, change.title));
        if let Some(old) = &change.old_provision {
            out.push(format!("  - {}: {}", old.article, old.text));
        }
        out.push(format!(
            "  + {}: {}",
            change.new_provision.article, change.new_provision.text
        ));
        out.push(format!("  {:?}: {}", change.impact.kind, change.impact.description));
    }
    out.join("\n")
}

pub fn weekly_stats_text(stats: &WeeklyStats) -> String {
    let mut out = vec![
        format!("Week {} (from {})", stats.week_number, stats.week_start_date),
        format!(
            "Documents: {} total, {} new, {} revised",
            stats.total_documents, stats.new_documents, stats.revised_documents
        ),
        format!(
            "Changes: {} total, {} high priority",
            stats.total_changes, stats.high_priority_changes
        ),
    ];
    if !stats.tax_type_breakdown.is_empty() {
        let breakdown: Vec<String> = stats
            .tax_type_breakdown
            .iter()
            .map(|(tax, count)| format!("{} {}", tax, count))
            .collect();
        out.push(format!("By tax type: {}", breakdown.join(", ")));
    }
    out.join("\n")
}

pub fn news_stats_text(stats: &NewsStats) -> String {
    format!(
        "Posted today: {}\nRemaining slots: {}\nTotal articles: {}",
        stats.posted_today, stats.remaining_slots, stats.total_articles
    )
}

pub fn crawl_line(log: &CrawlLog) -> String {
    let duration = log
        .duration()
        .map(|d| format!("{:.1}s", d.num_milliseconds() as f64 / 1000.0))
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!(
        "{}  {:<7} found {:>4} saved {:>4}  {}",
        log.started_at.format("%Y-%m-%d %H:%M:%S"),
        log.status,
        log.documents_found,
        log.documents_saved,
        duration
    );
    if let Some(error) = &log.error {
        line.push_str("  ");
        line.push_str(error);
    }
    line
}
