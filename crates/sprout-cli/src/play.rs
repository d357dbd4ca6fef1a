//! Real-time play over stdin and stdout.
//!
//! Each stdin line is one JSON `SceneInput`; each stdout line is one JSON
//! `SceneSignal`. Timers fire on the wall clock between inputs. The session
//! ends when input closes, on Ctrl-C, or once the scene exits to navigation.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use sprout_core::clock::{Clock, SystemClock};
use sprout_scene::application::engine::SceneEngine;
use sprout_scene::domain::inputs::SceneInput;
use sprout_scene::domain::signals::SceneSignal;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::time::Instant;

use crate::driver::Driver;
use crate::error::CliError;

/// Plays the driver's scene on a single-threaded runtime until stdin closes.
///
/// # Errors
///
/// Fails if the runtime cannot start, the scene cannot be opened, or stdout
/// cannot be written.
pub fn play(driver: &Driver, out: &mut impl Write) -> Result<(), CliError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let shutdown = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(%error, "could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    runtime.block_on(play_loop(
        driver,
        Arc::new(SystemClock),
        tokio::io::stdin(),
        shutdown,
        out,
    ))
}

/// The play loop over any line source.
///
/// # Errors
///
/// See [`play`].
pub async fn play_loop<R, F, W>(
    driver: &Driver,
    clock: Arc<dyn Clock>,
    input: R,
    shutdown: F,
    out: &mut W,
) -> Result<(), CliError>
where
    R: AsyncRead + Unpin,
    F: Future<Output = ()>,
    W: Write,
{
    let mut engine = driver.open(clock.clone())?;
    let mut lines = BufReader::new(input).lines();
    tokio::pin!(shutdown);

    let mut exited = emit(&mut engine, out)?;
    while !exited {
        let deadline = engine.next_deadline();
        let wake = Instant::now()
            + deadline.map_or(Duration::ZERO, |deadline| {
                clock.until(deadline).to_std().unwrap_or(Duration::ZERO)
            });
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::info!("input closed");
                    break;
                };
                apply_line(&mut engine, &line);
            }
            () = tokio::time::sleep_until(wake), if deadline.is_some() => {
                engine.pump();
            }
            () = &mut shutdown => {
                tracing::info!("interrupted");
                break;
            }
        }
        exited = emit(&mut engine, out)?;
    }

    engine.teardown();
    emit(&mut engine, out)?;
    Ok(())
}

fn apply_line(engine: &mut SceneEngine, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    match serde_json::from_str::<SceneInput>(line) {
        Ok(input) => engine.handle(input),
        Err(error) => tracing::warn!(%error, line, "input line ignored"),
    }
}

/// Writes pending signals as JSON lines. Returns whether one was an exit.
fn emit(engine: &mut SceneEngine, out: &mut impl Write) -> Result<bool, CliError> {
    let mut exited = false;
    for signal in engine.take_signals() {
        exited |= matches!(signal, SceneSignal::ExitScene(_));
        writeln!(out, "{}", serde_json::to_string(&signal)?)?;
    }
    out.flush()?;
    Ok(exited)
}
