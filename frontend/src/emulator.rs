use anyhow::{Context, Result};
use slog::{Logger, debug, info};
use spectra_core::controller::{ControllerEvent, FrameStats, MachineController};
use spectra_core::core::TerminationReason;
use spectra_core::debug::Breakpoint;

use crate::config::Settings;

/// Outcome of a headless run.
#[derive(Debug)]
pub struct RunSummary {
    pub frames: u64,
    pub stats: FrameStats,
    pub reason: Option<TerminationReason>,
    pub pc: u16,
    pub contention_total: u64,
}

/// Run until `settings.frames` whole frames have completed, or until a
/// breakpoint stops a debug run, and leave the controller paused.
pub fn run(controller: &mut MachineController, settings: &Settings, logger: &Logger) -> Result<RunSummary> {
    let target = settings.frames;
    let cancel = controller.cancel_handle();
    controller.subscribe(move |event| {
        if let ControllerEvent::FrameCompleted { normal: true, machine } = event
            && machine.frame_count() >= target
        {
            cancel.cancel();
        }
    });

    for &address in &settings.breakpoints {
        controller.debug().add_breakpoint(Breakpoint::execution(address));
    }
    if let Some(machine) = controller.machine_mut() {
        machine.set_clock_multiplier(settings.clock_multiplier);
    }

    let debug_run = settings.debug || !settings.breakpoints.is_empty();
    info!(logger, "running"; "frames" => target, "debug" => debug_run);
    if debug_run {
        controller.start_debug()?;
    } else {
        controller.start()?;
    }
    controller.wait_for_pause()?;

    let reason = controller.last_termination_reason();
    let stats = controller.stats();
    debug!(logger, "run finished"; "reason" => ?reason, "state" => ?controller.state());
    let machine = controller
        .machine()
        .context("machine unavailable after the run")?;

    Ok(RunSummary {
        frames: machine.frame_count(),
        stats,
        reason,
        pc: machine.cpu().regs.pc,
        contention_total: machine.contention_total(),
    })
}
