use std::cell::Cell;
use std::rc::Rc;

use chrono::Local;
use clap::Subcommand;
use pomotimer_core::duration::SECONDS;
use pomotimer_core::{
    parse_timer, PomodoroConfig, PomodoroPhase, PomodoroTimer, Settings, SimulatedClock,
    TimerEvent, TimerEventKind, TokioClock,
};
use tokio::sync::Notify;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run the timer in the foreground until the phase ends or Ctrl-C
    Run {
        /// Phase to start (focus, short-break, long-break). Defaults to the configured initial phase
        #[arg(long)]
        phase: Option<PomodoroPhase>,
        /// Stop after this many completed phases (with --auto-advance)
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
        phases: Option<u32>,
        /// Start the next phase automatically when one ends
        #[arg(long)]
        auto_advance: bool,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Print the phases that follow the configured initial phase
    Sequence {
        /// Number of phases to print
        #[arg(long, default_value = "8")]
        count: usize,
    },
    /// Print a millisecond count as a clock reading
    Format {
        milliseconds: u64,
        /// Include the millisecond part
        #[arg(long)]
        millis: bool,
    },
}

struct RunArgs {
    phase: Option<PomodoroPhase>,
    phases: Option<u32>,
    auto_advance: bool,
    json: bool,
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TimerAction::Run {
            phase,
            phases,
            auto_advance,
            json,
        } => {
            let settings = Settings::load()?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let local = tokio::task::LocalSet::new();
            local.block_on(
                &runtime,
                run_foreground(
                    settings,
                    RunArgs {
                        phase,
                        phases,
                        auto_advance,
                        json,
                    },
                ),
            )?;
        }
        TimerAction::Sequence { count } => {
            let settings = Settings::load()?;
            let timer = PomodoroTimer::with_options(
                settings.pomodoro,
                SimulatedClock::new(),
                settings.timer_options(),
            )?;
            for n in 1..=count {
                let phase = timer.next_phase();
                timer.start(phase);
                println!(
                    "{n:>3}. {} ({} min)",
                    phase.label(),
                    settings.pomodoro.phase_minutes(phase)
                );
            }
            timer.reset();
        }
        TimerAction::Format {
            milliseconds,
            millis,
        } => {
            println!("{}", parse_timer(milliseconds).format(millis));
        }
    }
    Ok(())
}

async fn run_foreground(settings: Settings, args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let timer = PomodoroTimer::with_options(
        settings.pomodoro,
        TokioClock::new(),
        settings.timer_options(),
    )?;
    let finished = Rc::new(Notify::new());

    if args.json {
        print_json(&timer);
    } else {
        print_human(&timer, settings.pomodoro, settings.show_milliseconds);
    }

    let limit = if args.auto_advance { args.phases } else { Some(1) };
    follow_phases(&timer, limit, Rc::clone(&finished));

    timer.start(args.phase.unwrap_or(settings.initial_phase));

    tokio::select! {
        _ = finished.notified() => {}
        signal = tokio::signal::ctrl_c() => {
            signal?;
            timer.reset();
            if !args.json {
                println!("stopped");
            }
        }
    }
    Ok(())
}

/// Count completed phases. Once `limit` is reached, signal `finished` and
/// leave the timer stopped; until then start the next phase. `None` never
/// stops.
fn follow_phases(timer: &PomodoroTimer, limit: Option<u32>, finished: Rc<Notify>) {
    let weak = timer.downgrade();
    let completed = Cell::new(0u32);
    timer
        .events()
        .subscribe(TimerEventKind::PhaseEnded, move |ev| {
            let TimerEvent::PhaseEnded { next, .. } = ev else {
                return;
            };
            completed.set(completed.get() + 1);
            if limit.is_some_and(|n| completed.get() >= n) {
                tracing::debug!(completed = completed.get(), "phase limit reached");
                finished.notify_one();
            } else if let Some(timer) = weak.upgrade() {
                timer.start(*next);
            }
        });
}

/// Ticks arrive every cadence; only print when the whole-second reading
/// changes.
fn second_changed(last: &Cell<Option<u64>>, milliseconds_left: u64) -> bool {
    let second = milliseconds_left / SECONDS;
    if last.get() == Some(second) {
        return false;
    }
    last.set(Some(second));
    true
}

fn print_json(timer: &PomodoroTimer) {
    let last_second = Rc::new(Cell::new(None));
    for kind in TimerEventKind::ALL {
        let last_second = Rc::clone(&last_second);
        timer.events().subscribe(kind, move |ev| {
            match ev {
                TimerEvent::Tick { milliseconds_left } => {
                    if !second_changed(&last_second, *milliseconds_left) {
                        return;
                    }
                }
                TimerEvent::Started { .. } => last_second.set(None),
                _ => {}
            }
            match serde_json::to_string(ev) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "failed to serialize timer event"),
            }
        });
    }
}

fn print_human(timer: &PomodoroTimer, config: PomodoroConfig, show_milliseconds: bool) {
    let last_second = Rc::new(Cell::new(None));
    for kind in TimerEventKind::ALL {
        let last_second = Rc::clone(&last_second);
        timer.events().subscribe(kind, move |ev| {
            let now = Local::now().format("%H:%M:%S");
            match ev {
                TimerEvent::Started { phase } => {
                    last_second.set(None);
                    let length = parse_timer(config.phase_milliseconds(*phase));
                    println!("[{now}] {} started ({length})", phase.label());
                }
                TimerEvent::Paused { milliseconds_left } => {
                    println!("[{now}] paused, {} left", parse_timer(*milliseconds_left));
                }
                TimerEvent::Resumed { milliseconds_left } => {
                    println!("[{now}] resumed, {} left", parse_timer(*milliseconds_left));
                }
                TimerEvent::Tick { milliseconds_left } => {
                    if second_changed(&last_second, *milliseconds_left) {
                        println!(
                            "  {}",
                            parse_timer(*milliseconds_left).format(show_milliseconds)
                        );
                    }
                }
                TimerEvent::PhaseEnded { prev, next } => {
                    println!(
                        "[{now}] {} finished, next up: {}",
                        prev.label(),
                        next.label()
                    );
                }
            }
        });
    }
}
