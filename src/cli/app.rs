use super::ui;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::{Backend, CrosstermBackend},
};
use std::io;
use std::time::{Duration, Instant};
use taxwatch::api::keys;
use taxwatch::core::{
    AnalysisSummary, CrawlLog, NewsArticle, NewsStats, Priority, WeekId, WeeklyStats,
};
use taxwatch::{AnalysisFeed, FeedDisplay, FeedView, NewsFeed, QueryState, TaxWatch};
use tokio::sync::mpsc;

const TICK: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Analyses,
    News,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Crawl,
    NewsCrawl,
    NewsPost,
}

impl Job {
    pub fn label(&self) -> &'static str {
        match self {
            Job::Crawl => "Document crawl",
            Job::NewsCrawl => "News crawl",
            Job::NewsPost => "News post",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub is_error: bool,
}

struct JobDone {
    job: Job,
    outcome: taxwatch::Result<String>,
}

/// Everything one frame draws, read from the cache without fetching.
pub struct Dashboard {
    pub week: Option<WeekId>,
    pub focus: Focus,
    pub priority: Option<Priority>,
    pub weekly_stats: QueryState<WeeklyStats>,
    pub news_stats: QueryState<NewsStats>,
    pub history: QueryState<Vec<CrawlLog>>,
    pub analyses: FeedDisplay<AnalysisSummary>,
    pub news: FeedDisplay<NewsArticle>,
    pub running: Option<Job>,
    pub notice: Option<Notice>,
}

pub struct App {
    watch: TaxWatch,
    week: Option<WeekId>,
    focus: Focus,
    analyses: FeedView<AnalysisFeed>,
    news: FeedView<NewsFeed>,
    running: Option<Job>,
    notice: Option<Notice>,
    jobs_tx: mpsc::UnboundedSender<JobDone>,
    jobs_rx: mpsc::UnboundedReceiver<JobDone>,
    last_poll: Instant,
    exit: bool,
}

impl App {
    pub fn new(watch: TaxWatch, week: Option<WeekId>) -> Self {
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        Self {
            analyses: watch.analyses_feed(week),
            news: watch.news_feed(),
            watch,
            week,
            focus: Focus::Analyses,
            running: None,
            notice: None,
            jobs_tx,
            jobs_rx,
            last_poll: Instant::now(),
            exit: false,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let res = self.run_loop(&mut terminal).await;

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        res
    }

    async fn run_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        self.mount()?;
        loop {
            self.collect_jobs()?;
            self.poll_history()?;

            let dashboard = self.snapshot()?;
            terminal.draw(|f| ui::draw(f, &dashboard))?;

            if event::poll(TICK)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code)?;
                    }
                }
            }
            if self.exit {
                return Ok(());
            }
        }
    }

    fn mount(&mut self) -> taxwatch::Result<()> {
        self.analyses.open()?;
        self.news.open()?;
        self.request_panels()
    }

    /// Ask the cache for every non-feed panel; stale keys refetch.
    fn request_panels(&self) -> taxwatch::Result<()> {
        self.watch.weekly_stats(self.week)?;
        self.watch.news_stats()?;
        self.watch.crawl_history()?;
        Ok(())
    }

    fn snapshot(&self) -> taxwatch::Result<Dashboard> {
        let cache = self.watch.cache();
        Ok(Dashboard {
            week: self.week,
            focus: self.focus,
            priority: self.priority(),
            weekly_stats: cache.peek(&keys::weekly_stats(self.week))?,
            news_stats: cache.peek(&keys::news_stats())?,
            history: cache.peek(&keys::crawl_history())?,
            analyses: self.analyses.display()?,
            news: self.news.display()?,
            running: self.running,
            notice: self.notice.clone(),
        })
    }

    fn priority(&self) -> Option<Priority> {
        self.news
            .filter(keys::PRIORITY)
            .and_then(|raw| raw.parse().ok())
    }

    fn handle_key(&mut self, code: KeyCode) -> taxwatch::Result<()> {
        match code {
            KeyCode::Esc | KeyCode::Char('q') => self.exit = true,
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Analyses => Focus::News,
                    Focus::News => Focus::Analyses,
                };
            }
            KeyCode::Left | KeyCode::Char('h') => {
                match self.focus {
                    Focus::Analyses => self.analyses.prev_page()?,
                    Focus::News => self.news.prev_page()?,
                };
            }
            KeyCode::Right | KeyCode::Char('l') => {
                match self.focus {
                    Focus::Analyses => self.analyses.next_page()?,
                    Focus::News => self.news.next_page()?,
                };
            }
            KeyCode::Char(digit @ '1'..='9') => {
                let page = digit.to_digit(10).map_or(1, |d| d as usize);
                self.go_to(page)?;
            }
            KeyCode::Char('[') => {
                let week = self.week.unwrap_or_else(WeekId::current).prev();
                self.set_week(Some(week))?;
            }
            KeyCode::Char(']') => {
                let week = self.week.unwrap_or_else(WeekId::current).next();
                self.set_week(Some(week))?;
            }
            KeyCode::Char('w') => self.set_week(None)?,
            KeyCode::Char('f') => self.cycle_priority()?,
            KeyCode::Char('r') => self.reload()?,
            KeyCode::Char('c') => self.start_job(Job::Crawl),
            KeyCode::Char('n') => self.start_job(Job::NewsCrawl),
            KeyCode::Char('p') => self.start_job(Job::NewsPost),
            _ => {}
        }
        Ok(())
    }

    /// Jump straight to a page number, only if the focused feed has it.
    fn go_to(&mut self, page: usize) -> taxwatch::Result<()> {
        let change = match self.focus {
            Focus::Analyses => self.analyses.control(),
            Focus::News => self.news.control(),
        }
        .and_then(|control| control.select(page));

        if let Some(change) = change {
            match self.focus {
                Focus::Analyses => self.analyses.apply(change)?,
                Focus::News => self.news.apply(change)?,
            };
        }
        Ok(())
    }

    fn set_week(&mut self, week: Option<WeekId>) -> taxwatch::Result<()> {
        self.week = week;
        self.analyses
            .set_filter(keys::WEEK, week.map(|w| w.to_string()))?;
        self.watch.weekly_stats(week)?;
        Ok(())
    }

    fn cycle_priority(&mut self) -> taxwatch::Result<()> {
        let next = match self.priority() {
            None => Some(Priority::High),
            Some(Priority::High) => Some(Priority::Medium),
            Some(Priority::Medium) => Some(Priority::Low),
            Some(Priority::Low) => None,
        };
        self.news
            .set_filter(keys::PRIORITY, next.map(|p| p.to_string()))?;
        Ok(())
    }

    fn reload(&mut self) -> taxwatch::Result<()> {
        let cache = self.watch.cache();
        cache.invalidate(&keys::weekly_stats(self.week))?;
        cache.invalidate(&keys::news_stats())?;
        cache.invalidate(&keys::crawl_history())?;
        self.analyses.reload()?;
        self.news.reload()?;
        self.request_panels()
    }

    fn poll_history(&mut self) -> taxwatch::Result<()> {
        if self.last_poll.elapsed() < self.watch.config().history_poll_interval {
            return Ok(());
        }
        self.last_poll = Instant::now();
        self.watch.cache().invalidate(&keys::crawl_history())?;
        self.watch.crawl_history()?;
        Ok(())
    }

    fn start_job(&mut self, job: Job) {
        if let Some(running) = self.running {
            self.notice = Some(Notice {
                text: format!("{} is still running", running.label()),
                is_error: true,
            });
            return;
        }
        self.running = Some(job);
        self.notice = Some(Notice {
            text: format!("{} started", job.label()),
            is_error: false,
        });

        let watch = self.watch.clone();
        let tx = self.jobs_tx.clone();
        tokio::spawn(async move {
            let outcome = match job {
                Job::Crawl => watch
                    .trigger_crawl()
                    .await
                    .map(|r| format!("Crawl finished: {} documents saved", r.saved)),
                Job::NewsCrawl => watch.trigger_news_crawl().await.map(|r| {
                    format!("News crawl finished: {} of {} articles saved", r.saved, r.total)
                }),
                Job::NewsPost => watch
                    .trigger_news_post()
                    .await
                    .map(|r| format!("Posted {} articles", r.posted)),
            };
            // The receiver only goes away when the dashboard exits.
            let _ = tx.send(JobDone { job, outcome });
        });
    }

    fn collect_jobs(&mut self) -> taxwatch::Result<()> {
        while let Ok(done) = self.jobs_rx.try_recv() {
            self.running = None;
            match done.outcome {
                Ok(text) => {
                    self.notice = Some(Notice {
                        text,
                        is_error: false,
                    });
                    // Refetch whatever the job invalidated for the keys on
                    // screen.
                    self.analyses.refresh()?;
                    self.news.refresh()?;
                    self.request_panels()?;
                }
                Err(err) => {
                    self.notice = Some(Notice {
                        text: format!("{} failed: {}", done.job.label(), err),
                        is_error: true,
                    });
                }
            }
        }
        Ok(())
    }
}
