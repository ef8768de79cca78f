//! Scripted performance: two lanes dragged into a 3:2 polyrhythm

use std::thread;
use std::time::Duration;

use pendulum_core::{TrackId, TrackParam};
use pendulum_services::{HostError, HostEvent, HostHandle};
use tracing::info;

const DRAG_STEPS: u32 = 5;
const STEP_GAP: Duration = Duration::from_millis(20);

/// Press on `track`, sweep `dx` pixels and let go
fn drag(handle: &HostHandle, track: TrackId, pointer_id: u64, x: f64, dx: f64) -> Result<(), HostError> {
    handle.send(HostEvent::PointerDown {
        track,
        event: handle.pointer(pointer_id, x, 0.0),
    })?;
    for step in 1..=DRAG_STEPS {
        thread::sleep(STEP_GAP);
        let x = x + dx * f64::from(step) / f64::from(DRAG_STEPS);
        handle.send(HostEvent::PointerMove(handle.pointer(pointer_id, x, 0.0)))?;
    }
    thread::sleep(STEP_GAP);
    handle.send(HostEvent::PointerUp(handle.pointer(pointer_id, x + dx, 0.0)))
}

pub(crate) fn perform(handle: &HostHandle) -> Result<(), HostError> {
    handle.update_param(TrackId(0), TrackParam::TimeSignature(2))?;
    handle.update_param(TrackId(1), TrackParam::TimeSignature(3))?;
    handle.send(HostEvent::SelectTrack(Some(TrackId(0))))?;

    drag(handle, TrackId(0), 1, 120.0, 220.0)?;
    drag(handle, TrackId(1), 2, 480.0, -220.0)?;

    // Release speed depends on the flick; pin both lanes to one tempo
    for id in [TrackId(0), TrackId(1)] {
        handle.update_param(id, TrackParam::Speed(1.0))?;
    }

    thread::sleep(Duration::from_secs(6));
    let tracks = handle.snapshot()?;
    for track in tracks.iter().filter(|t| t.oscillating) {
        info!(
            track = track.id.0,
            time_signature = track.time_signature,
            amplitude = track.amplitude,
            "Lane swinging"
        );
    }

    handle.send(HostEvent::SetBpm(180.0))?;
    thread::sleep(Duration::from_secs(3));
    handle.shutdown()
}
