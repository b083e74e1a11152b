//! Inline video player with a synchronized frequency overlay.
//!
//! [`PlayerView`] renders a `<video>` element whose source is a `data:` URL
//! plus a small script. The overlay labels are built here from
//! [`FrequencySeries::overlay_labels`]; on every `timeupdate` the script only
//! computes the bucket index for the current playback time and shows that
//! label, or [`END_OF_DATA`] past the last bucket. On `loadedmetadata` the
//! container is resized to the video's height.

use crate::{
    data_url::DataUrl,
    error::VehicountError,
    frequency::{END_OF_DATA, FrequencySeries},
    template::{Markup, Template, Value, script_json},
};

const PLAYER_TEMPLATE: Template =
    Template::new("player.html", include_str!("../templates/player.html"));

/// The embedded player for one processed video.
#[derive(Debug, Clone)]
pub struct PlayerView {
    video: DataUrl,
    series: FrequencySeries,
}

impl PlayerView {
    /// Build a player from an encoded video and its frequency series.
    pub fn new(video: DataUrl, series: FrequencySeries) -> Self {
        Self { video, series }
    }

    /// The embedded video.
    pub fn video(&self) -> &DataUrl {
        &self.video
    }

    /// The overlay's frequency series.
    pub fn series(&self) -> &FrequencySeries {
        &self.series
    }

    /// Render the player markup.
    ///
    /// # Errors
    ///
    /// Returns [`VehicountError::TemplateError`] if the template cannot be
    /// filled.
    pub fn render(&self) -> Result<Markup, VehicountError> {
        let overlay_labels = script_json(&self.series.overlay_labels())?;
        let bucket_seconds = Markup::trusted(self.series.bucket_seconds().to_string());
        let end_of_data = script_json(END_OF_DATA)?;

        PLAYER_TEMPLATE.render(&[
            ("video_src", Value::Text(self.video.as_str())),
            ("video_mime", Value::Text(self.video.mime_type())),
            ("overlay_labels", Value::Markup(&overlay_labels)),
            ("bucket_seconds", Value::Markup(&bucket_seconds)),
            ("end_of_data", Value::Markup(&end_of_data)),
        ])
    }
}
