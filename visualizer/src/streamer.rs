use std::fmt;

/// Kind of source a streamer reads frames from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Image,
    Dir,
    Camera,
    Video,
}

impl MediaType {
    /// Only video files have a playback rate worth matching.
    pub fn is_video(self) -> bool {
        matches!(self, MediaType::Video)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaType::Image => "IMAGE",
            MediaType::Dir => "DIR",
            MediaType::Camera => "CAMERA",
            MediaType::Video => "VIDEO",
        };
        f.write_str(name)
    }
}

/// Metadata the visualizer needs from whatever produces frames.
pub trait Streamer {
    fn media_type(&self) -> MediaType;

    /// Frames per second of the source.
    fn fps(&self) -> f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_video_is_video() {
        assert!(MediaType::Video.is_video());
        for kind in [MediaType::Image, MediaType::Dir, MediaType::Camera] {
            assert!(!kind.is_video());
        }
        assert_eq!(MediaType::Video.to_string(), "VIDEO");
        assert_eq!(MediaType::Camera.to_string(), "CAMERA");
    }
}
