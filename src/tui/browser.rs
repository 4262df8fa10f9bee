//! State of the interactive stage browser, free of any terminal handling.
//!
//! The browser walks down from recent runs to a run's stages, into composite stages,
//! and finally into a stage's log. [`Browser::apply`] turns an [`Action`] into state
//! changes and, when something has to be fetched, a [`Command`] for the event loop.

use log::debug;

use crate::commands::stages::{arrange, Row, SortKey, View};
use crate::jenkins::{Job, Stage, StageLog};

use super::input::{Action, Mode};

/// Work the event loop has to do on behalf of the browser.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Quit,
    /// Fetch the run description of this build and show its stages
    LoadJob(String),
    /// Fetch whatever this stage leads to: children or a log
    OpenStage(Stage),
}

/// What opening a stage turned up.
#[derive(Debug, Clone, PartialEq)]
pub enum Opened {
    Children(Stage),
    Log { title: String, log: StageLog },
    /// Neither children nor a log link; carries the stage name
    Empty(String),
}

/// Scrollable view of a stage log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogView {
    pub title: String,
    pub lines: Vec<String>,
    pub scroll: usize,
    /// Jenkins cut the log short
    pub truncated: bool,
}

impl LogView {
    fn new(title: String, log: &StageLog) -> Self {
        Self {
            title,
            lines: log.text.lines().map(str::to_string).collect(),
            scroll: 0,
            truncated: log.has_more,
        }
    }

    fn max_scroll(&self, page: usize) -> usize {
        self.lines.len().saturating_sub(page)
    }

    /// How far through the log the bottom of the viewport is, in percent.
    pub fn percent(&self, page: usize) -> usize {
        if self.lines.len() <= page {
            return 100;
        }
        ((self.scroll + page) * 100 / self.lines.len()).min(100)
    }
}

pub struct Browser {
    pipeline: String,
    jobs: Vec<Job>,
    job: Option<Job>,
    /// Composite stages entered below the job, innermost last
    trail: Vec<Stage>,
    log: Option<LogView>,
    sort: SortKey,
    ascending: bool,
    filter: String,
    /// Filter value from before the input was opened
    editing: Option<String>,
    selected: usize,
    page: usize,
    message: Option<String>,
}

impl Browser {
    pub fn new(pipeline: &str, jobs: Vec<Job>, view: &View) -> Self {
        Self {
            pipeline: pipeline.to_string(),
            jobs,
            job: None,
            trail: Vec::new(),
            log: None,
            sort: view.sort,
            ascending: view.ascending,
            filter: view.filter.clone().unwrap_or_default(),
            editing: None,
            selected: 0,
            page: 10,
            message: None,
        }
    }

    pub fn mode(&self) -> Mode {
        if self.log.is_some() {
            Mode::Log
        } else if self.editing.is_some() {
            Mode::Filter
        } else {
            Mode::Table
        }
    }

    pub fn view(&self) -> View {
        View {
            sort: self.sort,
            ascending: self.ascending,
            filter: (!self.filter.is_empty()).then(|| self.filter.clone()),
        }
    }

    /// Rows of the current level, filtered and sorted.
    pub fn rows(&self) -> Vec<Row> {
        let rows = match (&self.job, self.trail.last()) {
            (_, Some(stage)) => stage.children.iter().map(Row::from).collect(),
            (Some(job), None) => job.stages.iter().map(Row::from).collect(),
            (None, None) => self.jobs.iter().map(Row::from).collect(),
        };
        arrange(rows, &self.view())
    }

    pub fn heading(&self) -> String {
        let Some(job) = &self.job else {
            return format!("Recent runs of {}", self.pipeline);
        };
        let mut heading = format!("Stages for: {} [{}]", job.name, job.status);
        for stage in &self.trail {
            heading.push_str(" > ");
            heading.push_str(&stage.name);
        }
        heading
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn log(&self) -> Option<&LogView> {
        self.log.as_ref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Rows that fit in the viewport; paging and log scrolling move by this much.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
        if let Some(log) = &mut self.log {
            log.scroll = log.scroll.min(log.max_scroll(self.page));
        }
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn show_job(&mut self, job: Job) {
        debug!("Showing [{}] stages of run [{}]", job.stages.len(), job.id);
        self.job = Some(job);
        self.trail.clear();
        self.selected = 0;
    }

    pub fn show(&mut self, opened: Opened) {
        match opened {
            Opened::Children(stage) => {
                debug!("Entering stage [{}] with [{}] children", stage.name, stage.children.len());
                self.trail.push(stage);
                self.selected = 0;
            }
            Opened::Log { title, log } => self.log = Some(LogView::new(title, &log)),
            Opened::Empty(name) => self.set_message(format!("Stage [{name}] has no log")),
        }
    }

    pub fn apply(&mut self, action: Action) -> Option<Command> {
        if action != Action::None {
            self.message = None;
        }
        match action {
            Action::None => None,
            Action::Quit => Some(Command::Quit),
            Action::Up => self.move_by(-1),
            Action::Down => self.move_by(1),
            Action::PageUp => self.move_by(-self.page_step()),
            Action::PageDown => self.move_by(self.page_step()),
            Action::Top => self.move_by(isize::MIN),
            Action::Bottom => self.move_by(isize::MAX),
            Action::Open => self.open(),
            Action::Back => {
                self.back();
                None
            }
            Action::Sort(key) => {
                self.cycle_sort(key);
                None
            }
            Action::StartFilter => {
                self.editing = Some(self.filter.clone());
                None
            }
            Action::ClearFilter => {
                self.filter.clear();
                self.selected = 0;
                None
            }
            Action::FilterInput(c) => {
                self.filter.push(c);
                self.selected = 0;
                None
            }
            Action::FilterBackspace => {
                self.filter.pop();
                self.selected = 0;
                None
            }
            Action::FilterAccept => {
                self.editing = None;
                None
            }
            Action::FilterCancel => {
                if let Some(previous) = self.editing.take() {
                    self.filter = previous;
                }
                self.selected = 0;
                None
            }
        }
    }

    fn page_step(&self) -> isize {
        isize::try_from(self.page).unwrap_or(isize::MAX)
    }

    fn move_by(&mut self, delta: isize) -> Option<Command> {
        if let Some(log) = &mut self.log {
            let max = log.max_scroll(self.page);
            log.scroll = log.scroll.saturating_add_signed(delta).min(max);
            return None;
        }
        let last = self.rows().len().saturating_sub(1);
        self.selected = self.selected.saturating_add_signed(delta).min(last);
        None
    }

    /// Same column flips ascending to descending, then back to start order.
    fn cycle_sort(&mut self, key: SortKey) {
        if self.sort != key {
            self.sort = key;
            self.ascending = true;
        } else if self.ascending {
            self.ascending = false;
        } else {
            self.sort = SortKey::Start;
        }
        self.selected = 0;
    }

    fn open(&mut self) -> Option<Command> {
        let row = self.rows().into_iter().nth(self.selected)?;
        let stages = match (&self.job, self.trail.last()) {
            (_, Some(stage)) => &stage.children,
            (Some(job), None) => &job.stages,
            (None, None) => return Some(Command::LoadJob(row.id)),
        };
        stages
            .iter()
            .find(|stage| stage.id == row.id)
            .cloned()
            .map(Command::OpenStage)
    }

    fn back(&mut self) {
        if self.log.take().is_some() {
            return;
        }
        if self.trail.pop().is_none() {
            self.job = None;
        }
        self.selected = 0;
    }
}
