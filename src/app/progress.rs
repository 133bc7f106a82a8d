use std::io::{IsTerminal, Write};
use std::time::Duration;

use crossterm::{
    cursor, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::ProgressSettings;
use crate::metrics::OutcomeCounter;

const PROGRESS_TICK: Duration = Duration::from_millis(250);
const BAR_WIDTH: usize = 40;

/// Request counter drawn on stderr while a run is in flight.
pub(crate) struct ProgressBar {
    counter: OutcomeCounter,
    done: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ProgressBar {
    /// Starts redrawing every 250ms against `goal` requests. Returns `None`
    /// when progress is disabled or stderr is not a terminal.
    pub(crate) fn start(goal: u64, settings: ProgressSettings) -> Option<Self> {
        if !settings.enabled || !std::io::stderr().is_terminal() {
            return None;
        }
        let counter = OutcomeCounter::default();
        let (done, mut done_rx) = oneshot::channel::<()>();
        let style = ProgressStyle::new(BAR_WIDTH);
        let no_color = settings.no_color;
        let watched = counter.clone();

        let task = tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(PROGRESS_TICK);
            loop {
                tokio::select! {
                    _ = &mut done_rx => {
                        let elapsed_ms = started.elapsed().as_millis();
                        if render_progress_line(&style, watched.get(), goal, elapsed_ms, no_color)
                            .and_then(|()| finish_progress_line())
                            .is_err()
                        {
                            debug!("Progress bar could not draw its final line");
                        }
                        break;
                    }
                    _ = ticker.tick() => {
                        let elapsed_ms = started.elapsed().as_millis();
                        if render_progress_line(&style, watched.get(), goal, elapsed_ms, no_color)
                            .is_err()
                        {
                            break;
                        }
                    }
                }
            }
        });

        Some(Self {
            counter,
            done,
            task,
        })
    }

    /// Counter to hand to the aggregator.
    pub(crate) fn counter(&self) -> OutcomeCounter {
        self.counter.clone()
    }

    /// Draws the final state and ends the line.
    pub(crate) async fn finish(self) {
        if self.done.send(()).is_err() {
            debug!("Progress bar stopped before the run finished");
        }
        if let Err(err) = self.task.await {
            warn!("Progress bar task failed: {}", err);
        }
    }
}

fn render_progress_line(
    style: &ProgressStyle,
    current: u64,
    goal: u64,
    elapsed_ms: u128,
    no_color: bool,
) -> Result<(), std::io::Error> {
    let line = build_progress_line(style, current, goal, elapsed_ms, no_color);

    let mut out = std::io::stderr();
    queue!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine))?;
    for segment in line {
        match segment.color {
            Some(color) if !no_color => queue!(
                out,
                SetForegroundColor(color),
                Print(&segment.text),
                ResetColor
            )?,
            Some(_) | None => queue!(out, Print(&segment.text))?,
        }
    }
    out.flush()
}

fn finish_progress_line() -> Result<(), std::io::Error> {
    let mut out = std::io::stderr();
    out.write_all(b"\n")?;
    out.flush()
}

/// `[####----] 50.00% 5/10 requests | 1.2s | 4 requests/s`
pub(super) fn build_progress_line(
    style: &ProgressStyle,
    current: u64,
    goal: u64,
    elapsed_ms: u128,
    no_color: bool,
) -> Vec<ProgressSegment> {
    let size = style.size.max(1);
    let shown = current.min(goal);

    let shown_u128 = u128::from(shown);
    let goal_u128 = u128::from(goal.max(1));
    let size_u128 = u128::from(u64::try_from(size).unwrap_or(u64::MAX));

    let complete_size = if goal == 0 {
        size
    } else {
        let scaled = shown_u128
            .saturating_mul(size_u128)
            .checked_div(goal_u128)
            .unwrap_or(0);
        usize::try_from(scaled).unwrap_or(size).min(size)
    };
    let incomplete_size = size.saturating_sub(complete_size);

    let percent_x100 = if goal == 0 {
        10_000
    } else {
        shown_u128
            .saturating_mul(10_000)
            .checked_div(goal_u128)
            .unwrap_or(0)
    };
    let percent_whole = percent_x100.checked_div(100).unwrap_or(0);
    let percent_frac = percent_x100.checked_rem(100).unwrap_or(0);
    let percent_text = format!(" {}.{:02}%", percent_whole, percent_frac);
    let count_text = format!(" {}/{} requests", current, goal);

    let elapsed_tenths = elapsed_ms.checked_div(100).unwrap_or(0);
    let secs = elapsed_tenths.checked_div(10).unwrap_or(0);
    let tenths = elapsed_tenths.checked_rem(10).unwrap_or(0);
    let per_second = u128::from(current)
        .saturating_mul(1000)
        .checked_div(elapsed_ms)
        .unwrap_or(0);
    let time_text = format!(" | {}.{}s | {} requests/s", secs, tenths, per_second);

    let progress_bar = format!(
        "{}{}{}{}",
        style.begin,
        style.fill.repeat(complete_size),
        style.empty.repeat(incomplete_size),
        style.end
    );

    if no_color {
        vec![
            ProgressSegment::plain(progress_bar),
            ProgressSegment::plain(percent_text),
            ProgressSegment::plain(count_text),
            ProgressSegment::plain(time_text),
        ]
    } else {
        vec![
            ProgressSegment::plain(progress_bar),
            ProgressSegment::colored(percent_text, Color::Cyan),
            ProgressSegment::plain(count_text),
            ProgressSegment::colored(time_text, Color::Yellow),
        ]
    }
}

pub(super) struct ProgressStyle {
    size: usize,
    begin: String,
    end: String,
    fill: String,
    empty: String,
}

impl ProgressStyle {
    pub(super) fn new(size: usize) -> Self {
        Self {
            size,
            begin: "[".to_owned(),
            end: "]".to_owned(),
            fill: "#".to_owned(),
            empty: "-".to_owned(),
        }
    }
}

pub(super) struct ProgressSegment {
    pub(super) text: String,
    pub(super) color: Option<Color>,
}

impl ProgressSegment {
    const fn plain(text: String) -> Self {
        Self { text, color: None }
    }

    const fn colored(text: String, color: Color) -> Self {
        Self {
            text,
            color: Some(color),
        }
    }
}
