use std::time::Duration;

/// Time left until the next frame is due, given how long processing the current one took.
///
/// Returns `None` when processing was already slower than the source frame rate.
pub fn frame_delay(elapsed: Duration, fps: f64) -> anyhow::Result<Option<Duration>> {
    anyhow::ensure!(
        fps.is_finite() && fps > 0.0,
        "Video source reports an invalid frame rate: {fps}"
    );
    let frame_time = Duration::try_from_secs_f64(1.0 / fps)?;
    Ok(frame_time.checked_sub(elapsed).filter(|d| !d.is_zero()))
}
