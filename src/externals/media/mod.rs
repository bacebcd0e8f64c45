use self::adapters::{FfmpegVideoSource, ImageCrateDecoder};

pub mod adapters;

pub struct MediaModule {
    pub image_adapter: ImageCrateDecoder,
    pub video_adapter: FfmpegVideoSource,
}

impl MediaModule {
    pub fn initialize() -> Self {
        Self {
            image_adapter: ImageCrateDecoder,
            video_adapter: FfmpegVideoSource::default(),
        }
    }
}
