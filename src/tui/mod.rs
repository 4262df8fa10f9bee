//! Interactive browser over recent runs, their stages and stage logs.

mod browser;
mod events;
mod input;
mod render;

pub use browser::{Browser, Opened};

use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use log::{debug, warn};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::time::Duration;

use crate::error::Result;
use crate::jenkins::{JenkinsClient, Stage};

use browser::Command;
use events::{EventHandler, TermEvent};

const TICK_RATE: Duration = Duration::from_millis(250);

/// Fetch what `stage` leads to.
///
/// Stages from a run description carry no log link, so their detail is fetched first.
/// Composite stages open as a list of children, anything else as its log.
pub async fn open_stage(client: &JenkinsClient, stage: Stage) -> Result<Opened> {
    let stage = match (stage.links.log_href(), stage.links.self_href()) {
        (None, Some(href)) => client.stage(href).await?,
        _ => stage,
    };
    if !stage.children.is_empty() {
        return Ok(Opened::Children(stage));
    }
    match stage.links.log_href() {
        Some(href) => {
            let log = client.stage_log(href).await?;
            Ok(Opened::Log {
                title: stage.name,
                log,
            })
        }
        None => Ok(Opened::Empty(stage.name)),
    }
}

/// Take over the terminal until the user quits.
pub async fn run(client: &JenkinsClient, mut browser: Browser) -> Result<()> {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        if let Err(e) = terminal::disable_raw_mode() {
            eprintln!("Failed to disable raw mode during panic: {e}");
        }
        if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen) {
            eprintln!("Failed to leave alternate screen during panic: {e}");
        }
        original_hook(panic_info);
    }));

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;

    let result = event_loop(&mut terminal, client, &mut browser).await;

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    client: &JenkinsClient,
    browser: &mut Browser,
) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);
    let result = loop {
        let size = terminal.size()?;
        browser.set_page(usize::from(size.height.saturating_sub(render::TABLE_CHROME)));
        terminal.draw(|f| render::render(f, browser))?;

        let Some(event) = events.next().await else {
            break Ok(());
        };
        let key = match event {
            TermEvent::Key(key) => key,
            TermEvent::Tick => continue,
            TermEvent::Error(e) => break Err(e.into()),
        };

        match browser.apply(input::map_key(key, browser.mode())) {
            None => {}
            Some(Command::Quit) => break Ok(()),
            Some(Command::LoadJob(build_id)) => {
                debug!("Loading stages of run [{build_id}]");
                match client.job_details(&build_id).await {
                    Ok(job) => browser.show_job(job),
                    Err(e) => {
                        warn!("Failed to load run [{build_id}]: {e}");
                        browser.set_message(e.to_string());
                    }
                }
            }
            Some(Command::OpenStage(stage)) => {
                debug!("Opening stage [{}][{}]", stage.id, stage.name);
                match open_stage(client, stage).await {
                    Ok(opened) => browser.show(opened),
                    Err(e) => {
                        warn!("Failed to open stage: {e}");
                        browser.set_message(e.to_string());
                    }
                }
            }
        }
    };
    events.stop();
    result
}
