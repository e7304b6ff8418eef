use crate::app::App;
use crate::engine::PlaybackBackend;
use crate::mpris::MprisHandle;

/// Push the transport's current state into the MPRIS properties.
pub fn update_mpris<B: PlaybackBackend>(mpris: &MprisHandle, app: &App<B>) {
    mpris.set_track(app.active_index(), app.active_track());
    mpris.set_status(app.transport.state());
    mpris.set_position(app.transport.position());
    mpris.set_volume(app.transport.volume());
}
