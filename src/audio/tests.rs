use super::sink::clamp_start;
use super::types::PlaybackInfo;
use std::time::Duration;

#[test]
fn position_is_hidden_until_latest_epoch_is_applied() {
    let info = PlaybackInfo {
        epoch: 3,
        loaded: true,
        playing: true,
        position: Duration::from_millis(12_500),
    };
    assert_eq!(info.position_for(3), Some(12.5));
    assert_eq!(info.position_for(4), None);
}

#[test]
fn position_needs_a_sink() {
    let info = PlaybackInfo {
        epoch: 1,
        ..PlaybackInfo::default()
    };
    assert_eq!(info.position_for(1), None);
}

#[test]
fn start_is_kept_inside_the_file() {
    let total = Some(Duration::from_secs(143));
    assert_eq!(
        clamp_start(Duration::from_secs(200), total),
        Duration::from_secs(143)
    );
    assert_eq!(
        clamp_start(Duration::from_secs(20), total),
        Duration::from_secs(20)
    );
    assert_eq!(
        clamp_start(Duration::from_secs(200), None),
        Duration::from_secs(200)
    );
}
